//! knit-core
//!
//! Turns a declarative `Application` (constants, factory blocks, links) into a
//! `RuntimeApp` of live, wired objects with deterministic teardown.
//!
//! # Modules
//! - **domain**: application model, values, documents, errors
//! - **typed**: `Component`, `Factory` and the `FactoryRegistry`
//! - **resolve**: planning, dependency walk, argument assembly
//! - **app**: `AppBuilder`, `RuntimeApp`, status snapshots

pub mod app;
pub mod domain;
pub mod resolve;
pub mod typed;

pub use app::{App, AppBuilder, AppStatus, RuntimeApp};
pub use domain::{Application, Document, ResolveError, ResolveOptions, Value};
pub use resolve::Resolver;
pub use typed::{Component, Factory, FactoryKey, FactoryRegistry};
