//! Resolver - `Application` -> `RuntimeApp`
//!
//! 1. plan (structural checks, factory lookup; nothing is created)
//! 2. walk argument edges depth-first, constructing each node after its sources
//! 3. push closeables onto the runtime the moment they exist
//! 4. deliver value edges as soon as both endpoints exist
//!
//! Any failure unwinds what was built through `RuntimeApp`'s close path.

use tracing::{debug, info, info_span, warn};

use super::assemble::assemble;
use super::conns::Conn;
use super::object::ResolvableObject;
use super::plan::{NodeKind, Plan, PlanNode, Walk};
use crate::app::runtime::RuntimeApp;
use crate::domain::{
    Application, BlockId, Connector, ResolveError, ResolveErrorKind, ResolveOptions, RunId, Spot,
    Step, Value,
};
use crate::typed::{FactoryKey, FactoryRegistry};

/// Resolves applications against one registry.
///
/// # Example
/// ```ignore
/// let resolver = Resolver::new(&registry).with_options(ResolveOptions {
///     max_depth: 64,
///     ..ResolveOptions::default()
/// });
/// println!("{:?}", resolver.plan_order(&application)?);
/// let runtime = resolver.resolve(&application)?;
/// runtime.close()?;
/// ```
pub struct Resolver<'r> {
    registry: &'r FactoryRegistry,
    options: ResolveOptions,
}

impl<'r> Resolver<'r> {
    pub fn new(registry: &'r FactoryRegistry) -> Self {
        Self {
            registry,
            options: ResolveOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Build every constant and block of `app`.
    pub fn resolve(&self, app: &Application) -> Result<RuntimeApp, ResolveError> {
        let run_id = RunId::generate();
        let span = info_span!("resolve", app = app.id(), run = %run_id);
        let _enter = span.enter();

        let plan = Plan::build(app, self.registry)?;
        let mut runtime = RuntimeApp::new(run_id, app.id());
        let max_vector_len = self.options.max_vector_len;

        let outcome = Walk::new(&plan, self.options.max_depth)
            .run(&mut |id, node| construct(&mut runtime, id, node, max_vector_len));

        match outcome {
            Ok(()) => {
                info!(objects = runtime.len(), "application resolved");
                Ok(runtime)
            }
            Err(err) => {
                warn!(error = %err, "resolution failed, unwinding");
                let teardown = runtime.unwind();
                Err(err.with_teardown(teardown))
            }
        }
    }

    /// Creation order `resolve` would use, without constructing anything.
    pub fn plan_order(&self, app: &Application) -> Result<Vec<BlockId>, ResolveError> {
        let plan = Plan::build(app, self.registry)?;
        let mut order = Vec::with_capacity(plan.len());
        Walk::new(&plan, self.options.max_depth).run(&mut |id, _| {
            order.push(id);
            Ok(())
        })?;
        Ok(order)
    }
}

fn construct(
    runtime: &mut RuntimeApp,
    id: BlockId,
    node: &PlanNode<'_>,
    max_vector_len: usize,
) -> Result<(), ResolveError> {
    let value = match &node.kind {
        NodeKind::Constant { constant, ty } => ty.parse_literal(&constant.value).map_err(|source| {
            ResolveError::at(Step::Construct, id, ResolveErrorKind::LiteralParse { id, source })
        })?,
        NodeKind::Block {
            factory, arguments, ..
        } => {
            let mut wired = Vec::with_capacity(arguments.len());
            for link in arguments {
                let value = source_value(runtime, &link.source)
                    .map_err(|kind| ResolveError::at(Step::Construct, id, kind))?;
                wired.push((&link.target, value));
            }
            let args = assemble(id, factory.key(), factory.params(), wired, max_vector_len)
                .map_err(|kind| ResolveError::at(Step::Construct, id, kind))?;
            invoke(factory.key(), id, || factory.invoke(args))?
        }
    };

    debug!(block = %id, kind = value.kind(), "created");
    runtime.insert(ResolvableObject::new(id, value, node.conns.clone()));

    for conn in node.conns.iter() {
        if runtime.contains(conn.dependent) {
            deliver(runtime, conn)?;
        }
    }
    for conn in &node.inbound {
        if conn.source.block != id && runtime.contains(conn.source.block) {
            deliver(runtime, conn)?;
        }
    }
    Ok(())
}

fn invoke(
    key: &FactoryKey,
    id: BlockId,
    call: impl FnOnce() -> Result<Value, crate::typed::ComponentError>,
) -> Result<Value, ResolveError> {
    call().map_err(|source| {
        debug!(block = %id, factory = %key, error = %source, "factory failed");
        ResolveError::at(Step::Construct, id, ResolveErrorKind::Construction(source))
    })
}

/// Value a connector reads from an already resolved node.
fn source_value(runtime: &RuntimeApp, source: &Connector) -> Result<Value, ResolveErrorKind> {
    let produced = runtime
        .get(source.block)
        .ok_or_else(|| ResolveErrorKind::DanglingReference {
            id: source.block,
            link: source.to_string(),
        })?;

    let value = match &source.spot {
        Spot::Whole => produced.clone(),
        Spot::Named(spot) => produced
            .as_object()
            .and_then(|instance| instance.component().output(spot))
            .ok_or_else(|| ResolveErrorKind::NoSuchOutput {
                id: source.block,
                spot: spot.clone(),
            })?,
    };

    match source.index {
        None => Ok(value),
        Some(index) => match value {
            Value::Vector(mut items) if index < items.len() => Ok(items.swap_remove(index)),
            _ => Err(ResolveErrorKind::NoSuchOutput {
                id: source.block,
                spot: format!("{}[{index}]", source.spot),
            }),
        },
    }
}

fn deliver(runtime: &RuntimeApp, conn: &Conn) -> Result<(), ResolveError> {
    let dependent = conn.dependent;
    let fail = |kind| ResolveError::at(Step::Deliver, dependent, kind);

    let value = source_value(runtime, &conn.source).map_err(fail)?;
    let target = runtime
        .get(dependent)
        .and_then(Value::as_object)
        .ok_or_else(|| {
            fail(ResolveErrorKind::NotAnObject {
                id: dependent,
                kind: runtime.get(dependent).map(Value::kind).unwrap_or("nothing"),
            })
        })?;

    target
        .component()
        .accept(conn.target.spot.as_str(), conn.target.index, value)
        .map_err(|source| {
            fail(ResolveErrorKind::Delivery {
                link: conn.describe(),
                source,
            })
        })?;
    debug!(link = %conn.describe(), "delivered");
    Ok(())
}
