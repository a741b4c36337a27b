//! Factory traits - how blocks produce values
//!
//! Two layers, same shape as any typed-to-dyn registry:
//! - **Typed**: `Factory` with an associated `Output: Component`
//! - **Dyn**: `DynFactory`, object-safe, stored in `FactoryRegistry`
//!
//! `TypedFactory<F>` erases a `Factory` into a `DynFactory`. `FnFactory` wraps a
//! closure for factories that return plain values.

use std::fmt;
use std::sync::Arc;

use crate::domain::application::Method;
use crate::domain::ids::BlockId;
use crate::domain::value::{FromValue, Value, ValueType};
use crate::typed::component::{Component, ComponentError, Instance};

/// `(factory type name, method)` pair a block refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactoryKey {
    pub factory: String,
    pub method: Method,
}

impl FactoryKey {
    pub fn new(factory: impl Into<String>, method: Method) -> Self {
        Self {
            factory: factory.into(),
            method,
        }
    }

    pub fn constructor(factory: impl Into<String>) -> Self {
        Self::new(factory, Method::Constructor)
    }

    pub fn method(factory: impl Into<String>, method: impl Into<String>) -> Self {
        Self::new(factory, Method::Named(method.into()))
    }
}

impl fmt::Display for FactoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.factory, self.method)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Scalar,
    /// Variadic / array parameter; elements are addressed by connector index.
    Vector,
}

/// One formal parameter of a factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    /// Type of the parameter, or of each element for a vector.
    pub ty: ValueType,
    pub kind: ParamKind,
    /// Unwired required parameters fail resolution instead of receiving `ty.zero()`.
    pub required: bool,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            name: name.into(),
            ty,
            kind: ParamKind::Scalar,
            required: false,
        }
    }

    pub fn vector(name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            kind: ParamKind::Vector,
            ..Self::new(name, ty)
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn is_vector(&self) -> bool {
        self.kind == ParamKind::Vector
    }
}

/// Assembled argument list handed to a factory, one entry per `ParamSpec`.
/// Vector parameters arrive as `Value::Vector`.
#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    block: BlockId,
    values: Vec<Value>,
}

impl Args {
    pub fn new(block: BlockId, values: Vec<Value>) -> Self {
        Self { block, values }
    }

    pub fn block(&self) -> BlockId {
        self.block
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.values
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.values
    }

    pub fn value(&self, index: usize) -> Result<&Value, ComponentError> {
        self.values.get(index).ok_or_else(|| {
            ComponentError::new(format!(
                "block {}: no argument at position {index} (have {})",
                self.block,
                self.values.len()
            ))
        })
    }

    pub fn get<T: FromValue>(&self, index: usize) -> Result<T, ComponentError> {
        let value = self.value(index)?;
        T::from_value(value).map_err(|e| {
            ComponentError::with_source(
                format!("block {}: argument {index}", self.block),
                e,
            )
        })
    }

    /// Elements of a vector parameter.
    pub fn vector(&self, index: usize) -> Result<&[Value], ComponentError> {
        match self.value(index)? {
            Value::Vector(items) => Ok(items),
            other => Err(ComponentError::new(format!(
                "block {}: argument {index} is {}, not a vector",
                self.block,
                other.kind()
            ))),
        }
    }

    /// Concrete component behind an object argument.
    pub fn object<T: Component + 'static>(&self, index: usize) -> Result<Arc<T>, ComponentError> {
        let instance: Instance = self.get(index)?;
        instance.downcast::<T>().ok_or_else(|| {
            ComponentError::new(format!(
                "block {}: argument {index} is a {}, not a {}",
                self.block,
                instance.component().type_name(),
                std::any::type_name::<T>()
            ))
        })
    }
}

/// Typed factory producing one component type.
///
/// # Example
/// ```ignore
/// struct ServerFactory;
///
/// impl Factory for ServerFactory {
///     type Output = Server;
///     fn key(&self) -> FactoryKey { FactoryKey::constructor("net.Server") }
///     fn params(&self) -> Vec<ParamSpec> { vec![ParamSpec::new("port", ValueType::Int)] }
///     fn create(&self, args: &Args) -> Result<Server, ComponentError> {
///         Ok(Server::bind(args.get(0)?))
///     }
/// }
/// ```
pub trait Factory: Send + Sync {
    type Output: Component + 'static;

    fn key(&self) -> FactoryKey;
    fn params(&self) -> Vec<ParamSpec>;
    fn create(&self, args: &Args) -> Result<Self::Output, ComponentError>;
}

/// Object-safe factory thunk stored in the registry.
pub trait DynFactory: Send + Sync {
    fn key(&self) -> &FactoryKey;
    fn params(&self) -> &[ParamSpec];
    fn invoke(&self, args: Args) -> Result<Value, ComponentError>;
}

/// Erases a `Factory` into a `DynFactory`. Key and params are read once.
pub struct TypedFactory<F: Factory> {
    factory: F,
    key: FactoryKey,
    params: Vec<ParamSpec>,
}

impl<F: Factory> TypedFactory<F> {
    pub fn new(factory: F) -> Self {
        let key = factory.key();
        let params = factory.params();
        Self {
            factory,
            key,
            params,
        }
    }
}

impl<F: Factory> DynFactory for TypedFactory<F> {
    fn key(&self) -> &FactoryKey {
        &self.key
    }

    fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    fn invoke(&self, args: Args) -> Result<Value, ComponentError> {
        let output = self.factory.create(&args)?;
        Ok(Value::Object(Instance::new(output)))
    }
}

type Thunk = dyn Fn(Args) -> Result<Value, ComponentError> + Send + Sync;

/// Closure-backed factory; may return any `Value`.
pub struct FnFactory {
    key: FactoryKey,
    params: Vec<ParamSpec>,
    thunk: Box<Thunk>,
}

impl FnFactory {
    pub fn new<F>(key: FactoryKey, params: Vec<ParamSpec>, thunk: F) -> Self
    where
        F: Fn(Args) -> Result<Value, ComponentError> + Send + Sync + 'static,
    {
        Self {
            key,
            params,
            thunk: Box::new(thunk),
        }
    }
}

impl DynFactory for FnFactory {
    fn key(&self) -> &FactoryKey {
        &self.key
    }

    fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    fn invoke(&self, args: Args) -> Result<Value, ComponentError> {
        (self.thunk)(args)
    }
}
