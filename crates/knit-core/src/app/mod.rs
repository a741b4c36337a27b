//! App - the layer hosts talk to
//!
//! - **AppBuilder / App**: factory registration and launching
//! - **RuntimeApp**: live objects, start pass, reverse-order teardown
//! - **AppStatus**: serializable snapshot of a RuntimeApp

pub mod builder;
pub mod runtime;
pub mod status;

pub use self::builder::{App, AppBuilder, BuildError};
pub use self::runtime::RuntimeApp;
pub use self::status::AppStatus;
