//! Component - objects produced by blocks
//!
//! A block's factory returns a `Component`. The resolver only needs to know
//! three things about it:
//! - can it be started (`startable`)
//! - must it be closed (`closeable`)
//! - how it exposes named outputs and accepts value-edge deliveries
//!
//! Capabilities are exposed as accessor methods returning trait objects, so
//! `Arc<dyn Component>` stays object-safe.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::domain::value::Value;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error raised by factories, `start`, `close` and `accept`.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ComponentError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl ComponentError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Post-resolution start capability.
pub trait Start {
    fn start(&self) -> Result<(), ComponentError>;
}

/// Teardown capability.
pub trait Close {
    fn close(&self) -> Result<(), ComponentError>;
}

/// Upcast helper so `Instance::downcast` works without trait upcasting.
pub trait AsAny: Send + Sync {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Object produced by a block.
///
/// # Example
/// ```ignore
/// struct Server { /* ... */ }
///
/// impl Component for Server {
///     fn startable(&self) -> Option<&dyn Start> { Some(self) }
///     fn closeable(&self) -> Option<&dyn Close> { Some(self) }
/// }
/// ```
pub trait Component: AsAny {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn startable(&self) -> Option<&dyn Start> {
        None
    }

    fn closeable(&self) -> Option<&dyn Close> {
        None
    }

    /// Named output read by links whose source spot is not `*`.
    fn output(&self, _spot: &str) -> Option<Value> {
        None
    }

    /// Receive a value along a value edge.
    fn accept(&self, spot: &str, _index: Option<usize>, _value: Value) -> Result<(), ComponentError> {
        Err(ComponentError::new(format!(
            "{} does not accept values (spot `{spot}`)",
            self.type_name()
        )))
    }
}

/// Shared handle to a live component. Compares by identity.
#[derive(Clone)]
pub struct Instance(Arc<dyn Component>);

impl Instance {
    pub fn new<C: Component + 'static>(component: C) -> Self {
        Self(Arc::new(component))
    }

    pub fn from_arc(component: Arc<dyn Component>) -> Self {
        Self(component)
    }

    pub fn component(&self) -> &dyn Component {
        self.0.as_ref()
    }

    pub fn as_arc(&self) -> &Arc<dyn Component> {
        &self.0
    }

    /// Concrete handle, if the component is a `T`.
    pub fn downcast<T: Component + 'static>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.0).into_any().downcast::<T>().ok()
    }

    pub fn is_startable(&self) -> bool {
        self.0.startable().is_some()
    }

    pub fn is_closeable(&self) -> bool {
        self.0.closeable().is_some()
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Instance").field(&self.0.type_name()).finish()
    }
}

impl<C: Component + 'static> From<Arc<C>> for Instance {
    fn from(component: Arc<C>) -> Self {
        Self(component)
    }
}
