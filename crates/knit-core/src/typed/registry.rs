//! FactoryRegistry - `(factory, method)` -> factory thunk
//!
//! Built during initialization (mutable), then shared read-only by resolvers.

use std::collections::HashMap;
use std::sync::Arc;

use super::factory::{Args, DynFactory, Factory, FactoryKey, FnFactory, ParamSpec, TypedFactory};
use super::component::ComponentError;
use crate::domain::value::Value;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("factory '{0}' is already registered")]
    AlreadyRegistered(FactoryKey),
}

/// # Example
/// ```ignore
/// let mut registry = FactoryRegistry::new();
/// registry.register(ServerFactory)?;
/// registry.register_fn(
///     FactoryKey::method("net.Port", "of"),
///     vec![ParamSpec::new("port", ValueType::Int).required()],
///     |args| Ok(Value::Int(args.get(0)?)),
/// )?;
/// assert!(registry.contains(&FactoryKey::constructor("net.Server")));
/// ```
#[derive(Default)]
pub struct FactoryRegistry {
    factories: HashMap<FactoryKey, Arc<dyn DynFactory>>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a typed factory.
    pub fn register<F: Factory + 'static>(&mut self, factory: F) -> Result<(), RegistryError> {
        self.insert(Arc::new(TypedFactory::new(factory)))
    }

    /// Register a closure.
    pub fn register_fn<T>(
        &mut self,
        key: FactoryKey,
        params: Vec<ParamSpec>,
        thunk: T,
    ) -> Result<(), RegistryError>
    where
        T: Fn(Args) -> Result<Value, ComponentError> + Send + Sync + 'static,
    {
        self.insert(Arc::new(FnFactory::new(key, params, thunk)))
    }

    /// Register an already erased factory.
    pub fn insert(&mut self, factory: Arc<dyn DynFactory>) -> Result<(), RegistryError> {
        let key = factory.key().clone();
        if self.factories.contains_key(&key) {
            return Err(RegistryError::AlreadyRegistered(key));
        }
        self.factories.insert(key, factory);
        Ok(())
    }

    pub fn get(&self, key: &FactoryKey) -> Option<Arc<dyn DynFactory>> {
        self.factories.get(key).cloned()
    }

    pub fn contains(&self, key: &FactoryKey) -> bool {
        self.factories.contains_key(key)
    }

    /// Registered keys, sorted.
    pub fn registered_keys(&self) -> Vec<FactoryKey> {
        let mut keys: Vec<FactoryKey> = self.factories.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
