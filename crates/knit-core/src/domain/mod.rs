//! Domain model (ids, application graph, values, documents, errors).

pub mod application;
pub mod document;
pub mod errors;
pub mod ids;
pub mod value;

pub use application::{Application, Block, Connector, Constant, Link, LinkKind, Method, Spot};
pub use document::{Document, DocumentError, ResolveOptions};
pub use errors::{CloseFailure, ResolveError, ResolveErrorKind, RunError, Step, TeardownError};
pub use ids::{BlockId, RunId};
pub use value::{FromValue, LiteralError, Value, ValueError, ValueType};
