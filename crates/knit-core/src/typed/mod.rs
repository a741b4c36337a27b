//! Typed - factory thunks standing in for reflective invocation
//!
//! Every block names a `(factory, method)` pair. Instead of looking the pair up
//! reflectively at call time, hosts register one thunk per pair up front; the
//! resolver resolves each pair once and fails with a typed error when it is
//! missing.

pub mod component;
pub mod factory;
pub mod registry;

pub use self::component::{AsAny, BoxError, Close, Component, ComponentError, Instance, Start};
pub use self::factory::{
    Args, DynFactory, Factory, FactoryKey, FnFactory, ParamKind, ParamSpec, TypedFactory,
};
pub use self::registry::{FactoryRegistry, RegistryError};
