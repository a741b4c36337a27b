//! Resolution: turning an `Application` into live, wired objects.

pub mod assemble;
pub mod conns;
pub mod object;
pub mod plan;
pub mod resolvables;
pub mod resolver;

pub use self::conns::{Conn, Conns};
pub use self::object::{ObjectState, ResolvableObject};
pub use self::resolvables::Resolvables;
pub use self::resolver::Resolver;
