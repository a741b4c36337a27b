//! AppBuilder - register factories, check expectations, build an `App`
//!
//! Fail-fast: `expect_factories` declares the `(factory, method)` pairs the
//! host relies on; `build` refuses to produce an `App` if any is missing.

use crate::app::runtime::RuntimeApp;
use crate::domain::{Application, Document, ResolveError, ResolveOptions};
use crate::resolve::Resolver;
use crate::typed::{Args, ComponentError, Factory, FactoryKey, FactoryRegistry, ParamSpec, RegistryError};
use crate::domain::Value;

/// # Example
/// ```ignore
/// let app = AppBuilder::new()
///     .register(ServerFactory)?
///     .expect_factories(&[FactoryKey::constructor("net.Server")])
///     .build()?;
/// let mut runtime = app.launch(&application)?;
/// runtime.run()?;
/// ```
pub struct AppBuilder {
    registry: FactoryRegistry,
    options: ResolveOptions,
    expected: Option<Vec<FactoryKey>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing factories: {0:?}. These were expected but not registered.")]
    MissingFactories(Vec<String>),
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            registry: FactoryRegistry::new(),
            options: ResolveOptions::default(),
            expected: None,
        }
    }

    pub fn register<F: Factory + 'static>(mut self, factory: F) -> Result<Self, RegistryError> {
        self.registry.register(factory)?;
        Ok(self)
    }

    pub fn register_fn<T>(
        mut self,
        key: FactoryKey,
        params: Vec<ParamSpec>,
        thunk: T,
    ) -> Result<Self, RegistryError>
    where
        T: Fn(Args) -> Result<Value, ComponentError> + Send + Sync + 'static,
    {
        self.registry.register_fn(key, params, thunk)?;
        Ok(self)
    }

    /// Use an already populated registry (replaces anything registered so far).
    pub fn with_registry(mut self, registry: FactoryRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn expect_factories(mut self, keys: &[FactoryKey]) -> Self {
        self.expected = Some(keys.to_vec());
        self
    }

    pub fn build(self) -> Result<App, BuildError> {
        if let Some(expected) = &self.expected {
            let missing: Vec<String> = expected
                .iter()
                .filter(|key| !self.registry.contains(key))
                .map(|key| key.to_string())
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingFactories(missing));
            }
        }
        Ok(App {
            registry: self.registry,
            options: self.options,
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry plus resolver settings; launches applications.
pub struct App {
    pub registry: FactoryRegistry,
    pub options: ResolveOptions,
}

impl App {
    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.registry).with_options(self.options.clone())
    }

    pub fn launch(&self, application: &Application) -> Result<RuntimeApp, ResolveError> {
        self.resolver().resolve(application)
    }

    /// Launch a document with its own options.
    pub fn launch_document(&self, document: &Document) -> Result<RuntimeApp, ResolveError> {
        Resolver::new(&self.registry)
            .with_options(document.options.clone())
            .resolve(&document.application)
    }
}
