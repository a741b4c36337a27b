use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use knit_core::domain::{
    Application, Block, BlockId, Connector, Constant, Document, Link, Method, ResolveErrorKind,
    RunError, Step, Value, ValueType,
};
use knit_core::resolve::ObjectState;
use knit_core::typed::{Args, Close, Component, ComponentError, FactoryKey, ParamSpec, Start};
use knit_core::{AppBuilder, FactoryRegistry, Resolver};

type Journal = Arc<Mutex<Vec<String>>>;

fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

/// Start/close-capable component that writes to a shared journal.
struct Probe {
    name: String,
    journal: Journal,
    fail_start: bool,
    fail_close: bool,
    received: Mutex<Vec<(String, Value)>>,
}

impl Start for Probe {
    fn start(&self) -> Result<(), ComponentError> {
        self.journal.lock().unwrap().push(format!("start {}", self.name));
        if self.fail_start {
            return Err(ComponentError::new(format!("{} refused to start", self.name)));
        }
        Ok(())
    }
}

impl Close for Probe {
    fn close(&self) -> Result<(), ComponentError> {
        self.journal.lock().unwrap().push(format!("close {}", self.name));
        if self.fail_close {
            return Err(ComponentError::new(format!("{} refused to close", self.name)));
        }
        Ok(())
    }
}

impl Component for Probe {
    fn startable(&self) -> Option<&dyn Start> {
        Some(self)
    }

    fn closeable(&self) -> Option<&dyn Close> {
        Some(self)
    }

    fn output(&self, spot: &str) -> Option<Value> {
        (spot == "name").then(|| Value::Str(self.name.clone()))
    }

    fn accept(&self, spot: &str, _index: Option<usize>, value: Value) -> Result<(), ComponentError> {
        self.journal
            .lock()
            .unwrap()
            .push(format!("{} <- {spot}", self.name));
        self.received.lock().unwrap().push((spot.to_string(), value));
        Ok(())
    }
}

/// Registers `test.Probe::new(name: string, a: any, b: any)`.
fn probe_registry(journal: &Journal) -> FactoryRegistry {
    let mut registry = FactoryRegistry::new();
    let j = Arc::clone(journal);
    registry
        .register_fn(
            FactoryKey::constructor("test.Probe"),
            vec![
                ParamSpec::new("name", ValueType::Str).required(),
                ParamSpec::new("a", ValueType::Any),
                ParamSpec::new("b", ValueType::Any),
            ],
            move |args| {
                let name: String = args.get(0)?;
                j.lock().unwrap().push(format!("create {name}"));
                Ok(Value::Object(knit_core::typed::Instance::new(Probe {
                    name,
                    journal: Arc::clone(&j),
                    fail_start: false,
                    fail_close: false,
                    received: Mutex::new(Vec::new()),
                })))
            },
        )
        .unwrap();
    let j = Arc::clone(journal);
    registry
        .register_fn(
            FactoryKey::method("test.Probe", "stubborn"),
            vec![ParamSpec::new("name", ValueType::Str).required()],
            move |args| {
                let name: String = args.get(0)?;
                j.lock().unwrap().push(format!("create {name}"));
                Ok(Value::Object(knit_core::typed::Instance::new(Probe {
                    name,
                    journal: Arc::clone(&j),
                    fail_start: false,
                    fail_close: true,
                    received: Mutex::new(Vec::new()),
                })))
            },
        )
        .unwrap();
    let j = Arc::clone(journal);
    registry
        .register_fn(
            FactoryKey::method("test.Probe", "fussy"),
            vec![ParamSpec::new("name", ValueType::Str).required()],
            move |args| {
                let name: String = args.get(0)?;
                j.lock().unwrap().push(format!("create {name}"));
                Ok(Value::Object(knit_core::typed::Instance::new(Probe {
                    name,
                    journal: Arc::clone(&j),
                    fail_start: true,
                    fail_close: false,
                    received: Mutex::new(Vec::new()),
                })))
            },
        )
        .unwrap();
    registry
        .register_fn(
            FactoryKey::method("test.Probe", "broken"),
            vec![ParamSpec::new("a", ValueType::Any)],
            |_| Err(ComponentError::new("factory exploded")),
        )
        .unwrap();
    registry
}

/// Block `id` built by `test.Probe::new` named by the string constant `name_id`.
fn probe(app: Application, id: u32, name_id: u32, name: &str) -> Application {
    app.with_constant(Constant::new(name_id, "string", name))
        .with_block(Block::constructor(id, "test.Probe"))
        .with_link(Link::argument(
            Connector::whole(name_id),
            Connector::spot(id, "name"),
        ))
}

#[test]
fn independent_blocks_resolve_start_once_and_close_in_reverse() {
    let journal = Journal::default();
    let registry = probe_registry(&journal);

    let mut app = Application::new("independent")
        .with_constant(Constant::new(90, "int", "1"))
        .with_constant(Constant::new(91, "long", "2"));
    app = probe(app, 1, 101, "one");
    app = probe(app, 2, 102, "two");
    app = probe(app, 3, 103, "three");

    let mut runtime = Resolver::new(&registry).resolve(&app).unwrap();
    // 2 plain constants + 3 name constants + 3 blocks
    assert_eq!(runtime.len(), 8);
    assert_eq!(
        runtime.teardown_order(),
        vec![BlockId::new(3), BlockId::new(2), BlockId::new(1)]
    );

    runtime.run().unwrap();
    runtime.close().unwrap();

    assert_eq!(
        entries(&journal),
        vec![
            "create one",
            "create two",
            "create three",
            "start one",
            "start two",
            "start three",
            "close three",
            "close two",
            "close one",
        ]
    );
}

#[test]
fn argument_cycle_fails_and_tears_down_prerequisites() {
    let journal = Journal::default();
    let registry = probe_registry(&journal);

    // 1 is a plain prerequisite of 2; 2 and 3 need each other.
    let mut app = Application::new("cycle");
    app = probe(app, 1, 101, "pre");
    app = probe(app, 2, 102, "a");
    app = probe(app, 3, 103, "b");
    let app = app
        .with_link(Link::argument(Connector::whole(1), Connector::spot(2, "a")))
        .with_link(Link::argument(Connector::whole(3), Connector::spot(2, "b")))
        .with_link(Link::argument(Connector::whole(2), Connector::spot(3, "a")));

    let err = Resolver::new(&registry).resolve(&app).err().unwrap();

    assert!(matches!(err.kind(), ResolveErrorKind::Cycle(_)));
    assert_eq!(
        err.cycle().unwrap(),
        &[BlockId::new(2), BlockId::new(3), BlockId::new(2)]
    );
    assert_eq!(entries(&journal), vec!["create pre", "close pre"]);
    assert!(err.teardown().is_none());
}

#[test]
fn assembled_arguments_match_wired_positions() {
    let mut registry = FactoryRegistry::new();
    let any = |n: usize| -> Vec<ParamSpec> {
        (0..n)
            .map(|i| ParamSpec::new(format!("arg{i}"), ValueType::Any))
            .collect()
    };
    registry
        .register_fn(FactoryKey::method("test.Calls", "five"), any(5), |args: Args| {
            Ok(Value::Vector(args.into_vec()))
        })
        .unwrap();
    registry
        .register_fn(FactoryKey::constructor("test.Three"), any(3), |args: Args| {
            Ok(Value::Vector(args.into_vec()))
        })
        .unwrap();

    let app = Application::new("args")
        .with_constant(Constant::new(1, "int", "12"))
        .with_constant(Constant::new(2, "long", "234"))
        .with_constant(Constant::new(3, "uri", "http://localhost:80"))
        .with_constant(Constant::new(4, "decimal", "1.2"))
        .with_block(Block::new(10, "test.Calls", Method::Named("five".into())))
        .with_block(Block::constructor(20, "test.Three"))
        .with_link(Link::argument(Connector::whole(1), Connector::spot(10, "1")))
        .with_link(Link::argument(Connector::whole(2), Connector::spot(10, "3")))
        .with_link(Link::argument(Connector::whole(3), Connector::spot(10, "4")))
        .with_link(Link::argument(Connector::whole(4), Connector::spot(20, "2")));

    let runtime = Resolver::new(&registry).resolve(&app).unwrap();

    assert_eq!(
        runtime.get(BlockId::new(10)),
        Some(&Value::Vector(vec![
            Value::Null,
            Value::Int(12),
            Value::Null,
            Value::Long(234),
            Value::Uri(url::Url::parse("http://localhost:80").unwrap()),
        ]))
    );
    assert_eq!(
        runtime.get(BlockId::new(20)),
        Some(&Value::Vector(vec![
            Value::Null,
            Value::Null,
            Value::Decimal(rust_decimal::Decimal::from_str("1.2").unwrap()),
        ]))
    );
}

struct Switch {
    started: AtomicBool,
    closed: AtomicBool,
}

impl Start for Switch {
    fn start(&self) -> Result<(), ComponentError> {
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl Close for Switch {
    fn close(&self) -> Result<(), ComponentError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl Component for Switch {
    fn startable(&self) -> Option<&dyn Start> {
        Some(self)
    }

    fn closeable(&self) -> Option<&dyn Close> {
        Some(self)
    }
}

#[test]
fn dependency_free_block_is_started_then_closed() {
    let app = AppBuilder::new()
        .register_fn(FactoryKey::constructor("test.Switch"), vec![], |_| {
            Ok(Value::Object(knit_core::typed::Instance::new(Switch {
                started: AtomicBool::new(false),
                closed: AtomicBool::new(false),
            })))
        })
        .unwrap()
        .build()
        .unwrap();

    let application = Application::new("switch").with_block(Block::constructor(0, "test.Switch"));
    let mut runtime = app.launch(&application).unwrap();
    let switch = runtime
        .get(BlockId::new(0))
        .and_then(Value::as_object)
        .and_then(|i| i.downcast::<Switch>())
        .unwrap();

    assert!(!switch.started.load(Ordering::SeqCst));
    runtime.run().unwrap();
    assert!(switch.started.load(Ordering::SeqCst));
    assert_eq!(
        runtime.object(BlockId::new(0)).unwrap().state,
        ObjectState::Started
    );

    runtime.close().unwrap();
    assert!(switch.closed.load(Ordering::SeqCst));
}

#[test]
fn construction_failure_unwinds_everything_built_so_far() {
    let journal = Journal::default();
    let registry = probe_registry(&journal);

    let mut app = Application::new("broken");
    app = probe(app, 1, 101, "first");
    app = probe(app, 2, 102, "second");
    let app = app
        .with_block(Block::new(3, "test.Probe", Method::Named("broken".into())))
        .with_link(Link::argument(Connector::whole(2), Connector::spot(3, "a")));

    let err = Resolver::new(&registry).resolve(&app).err().unwrap();

    assert_eq!(err.step(), Step::Construct);
    assert_eq!(err.block(), Some(BlockId::new(3)));
    assert!(err.to_string().contains("factory exploded"));
    assert_eq!(
        entries(&journal),
        vec!["create first", "create second", "close second", "close first"]
    );
}

#[test]
fn unwind_failures_travel_with_the_cause() {
    let journal = Journal::default();
    let registry = probe_registry(&journal);

    let app = Application::new("stuck")
        .with_constant(Constant::new(100, "string", "stuck"))
        .with_block(Block::new(1, "test.Probe", Method::Named("stubborn".into())))
        .with_link(Link::argument(Connector::whole(100), Connector::spot(1, "name")))
        .with_block(Block::new(2, "test.Probe", Method::Named("broken".into())));

    let err = Resolver::new(&registry).resolve(&app).err().unwrap();

    let teardown = err.teardown().unwrap();
    assert_eq!(teardown.suppressed().len(), 1);
    assert_eq!(teardown.suppressed()[0].block, BlockId::new(1));
    assert!(matches!(err.kind(), ResolveErrorKind::Construction(_)));
}

#[test]
fn malformed_literal_names_constant_and_text() {
    let registry = FactoryRegistry::new();
    let app = Application::new("literal").with_constant(Constant::new(23, "int", "forty-five"));

    let err = Resolver::new(&registry).resolve(&app).err().unwrap();

    assert!(matches!(
        err.kind(),
        ResolveErrorKind::LiteralParse { id, .. } if *id == BlockId::new(23)
    ));
    let msg = err.to_string();
    assert!(msg.contains("#23"));
    assert!(msg.contains("forty-five"));
}

#[test]
fn structural_errors_are_raised_before_anything_is_built() {
    let journal = Journal::default();
    let registry = probe_registry(&journal);

    let mut app = Application::new("dangling");
    app = probe(app, 1, 101, "never");
    let app = app.with_link(Link::value(Connector::whole(1), Connector::spot(77, "x")));

    let err = Resolver::new(&registry).resolve(&app).err().unwrap();

    assert_eq!(err.step(), Step::Plan);
    assert!(matches!(err.kind(), ResolveErrorKind::DanglingReference { id, .. } if *id == BlockId::new(77)));
    assert!(entries(&journal).is_empty());
}

#[test]
fn value_edges_are_delivered_once_both_ends_exist() {
    let journal = Journal::default();
    let registry = probe_registry(&journal);

    // 1 <-> 2 through value edges; constant 50 feeds 2; 2's name output feeds 1.
    let mut app = Application::new("values").with_constant(Constant::new(50, "int", "7"));
    app = probe(app, 1, 101, "left");
    app = probe(app, 2, 102, "right");
    let app = app
        .with_link(Link::value(Connector::whole(1), Connector::spot(2, "peer")))
        .with_link(Link::value(Connector::whole(2), Connector::spot(1, "peer")))
        .with_link(Link::value(Connector::whole(50), Connector::spot(2, "count")))
        .with_link(Link::value(Connector::spot(2, "name"), Connector::spot(1, "label")));

    let runtime = Resolver::new(&registry).resolve(&app).unwrap();

    let left = runtime
        .get(BlockId::new(1))
        .and_then(Value::as_object)
        .and_then(|i| i.downcast::<Probe>())
        .unwrap();
    let right = runtime
        .get(BlockId::new(2))
        .and_then(Value::as_object)
        .and_then(|i| i.downcast::<Probe>())
        .unwrap();

    let left_got = left.received.lock().unwrap().clone();
    let right_got = right.received.lock().unwrap().clone();
    assert_eq!(left_got.len(), 2);
    assert_eq!(right_got.len(), 2);
    assert!(left_got.contains(&("label".to_string(), Value::Str("right".into()))));
    assert!(right_got.contains(&("count".to_string(), Value::Int(7))));
    assert_eq!(right_got.iter().filter(|(spot, _)| spot == "peer").count(), 1);

    runtime.close().unwrap();
}

#[test]
fn named_outputs_feed_arguments() {
    let journal = Journal::default();
    let mut registry = probe_registry(&journal);
    registry
        .register_fn(
            FactoryKey::method("test.Echo", "of"),
            vec![ParamSpec::new("text", ValueType::Str).required()],
            |args| args.value(0).cloned(),
        )
        .unwrap();

    let mut app = Application::new("outputs");
    app = probe(app, 1, 101, "source");
    let app = app
        .with_block(Block::new(2, "test.Echo", Method::Named("of".into())))
        .with_link(Link::argument(Connector::spot(1, "name"), Connector::spot(2, "text")));

    let runtime = Resolver::new(&registry).resolve(&app).unwrap();
    assert_eq!(runtime.get(BlockId::new(2)), Some(&Value::Str("source".into())));
    runtime.close().unwrap();
}

#[test]
fn plan_order_matches_creation_order() {
    let journal = Journal::default();
    let registry = probe_registry(&journal);

    let mut app = Application::new("order");
    app = probe(app, 3, 103, "c");
    app = probe(app, 1, 101, "a");
    let app = app.with_link(Link::argument(Connector::whole(1), Connector::spot(3, "a")));

    let resolver = Resolver::new(&registry);
    let planned = resolver.plan_order(&app).unwrap();
    assert!(entries(&journal).is_empty());

    let runtime = resolver.resolve(&app).unwrap();
    assert_eq!(planned, runtime.creation_order());
    assert_eq!(entries(&journal), vec!["create a", "create c"]);
    runtime.close().unwrap();
}

#[test]
fn document_end_to_end() {
    let journal = Journal::default();
    let app = AppBuilder::new()
        .with_registry(probe_registry(&journal))
        .expect_factories(&[FactoryKey::constructor("test.Probe")])
        .build()
        .unwrap();

    let document = Document::parse(
        r#"{
          "id": "doc",
          "options": { "max_depth": 16 },
          "constants": [
            { "id": "10", "factory": "string", "value": "db" },
            { "id": "11", "factory": "string", "value": "api" }
          ],
          "blocks": [
            { "id": "1", "factory": "test.Probe", "method": "new",
              "params": [ { "name": "name", "index": "-1", "ref": "10", "spot": "*" } ] },
            { "id": "2", "factory": "test.Probe",
              "params": [ { "name": "name", "ref": "11" }, { "name": "a", "ref": "1" } ] }
          ],
          "links": [
            { "source": { "block": "2" }, "target": { "block": "1", "spot": "client" } }
          ]
        }"#,
    )
    .unwrap();

    let mut runtime = app.launch_document(&document).unwrap();
    runtime.run().unwrap();
    runtime.close().unwrap();

    assert_eq!(
        entries(&journal),
        vec![
            "create db",
            "create api",
            "db <- client",
            "start db",
            "start api",
            "close api",
            "close db",
        ]
    );
}

#[test]
fn failed_start_stops_the_pass_and_app_still_closes() {
    let journal = Journal::default();
    let registry = probe_registry(&journal);

    let mut app = Application::new("fussy");
    app = probe(app, 1, 101, "a");
    let mut app = app
        .with_constant(Constant::new(102, "string", "b"))
        .with_block(Block::new(2, "test.Probe", Method::Named("fussy".into())))
        .with_link(Link::argument(Connector::whole(102), Connector::spot(2, "name")));
    app = probe(app, 3, 103, "c");

    let mut runtime = Resolver::new(&registry).resolve(&app).unwrap();
    let err = runtime.run().unwrap_err();

    assert!(matches!(err, RunError::Start { block, .. } if block == BlockId::new(2)));
    assert_eq!(
        runtime.object(BlockId::new(1)).unwrap().state,
        ObjectState::Started
    );
    assert_eq!(
        runtime.object(BlockId::new(3)).unwrap().state,
        ObjectState::Resolved
    );
    assert!(matches!(runtime.run(), Err(RunError::AlreadyStarted)));

    runtime.close().unwrap();
    assert_eq!(
        entries(&journal),
        vec![
            "create a",
            "create b",
            "create c",
            "start a",
            "start b",
            "close c",
            "close b",
            "close a",
        ]
    );
}

#[test]
fn delivery_to_a_plain_value_unwinds_the_producer() {
    let journal = Journal::default();
    let mut registry = probe_registry(&journal);
    registry
        .register_fn(FactoryKey::method("test.Number", "of"), vec![], |_| {
            Ok(Value::Int(3))
        })
        .unwrap();

    let mut app = Application::new("plain");
    app = probe(app, 1, 101, "producer");
    let app = app
        .with_block(Block::new(2, "test.Number", Method::Named("of".into())))
        .with_link(Link::value(Connector::whole(1), Connector::spot(2, "x")));

    let err = Resolver::new(&registry).resolve(&app).err().unwrap();

    assert_eq!(err.step(), Step::Deliver);
    assert_eq!(err.block(), Some(BlockId::new(2)));
    assert!(matches!(
        err.kind(),
        ResolveErrorKind::NotAnObject { kind: "int", .. }
    ));
    assert_eq!(entries(&journal), vec!["create producer", "close producer"]);
}

#[test]
fn refused_delivery_unwinds_everything_built() {
    let journal = Journal::default();
    let mut registry = probe_registry(&journal);
    registry
        .register_fn(FactoryKey::constructor("test.Switch"), vec![], |_| {
            Ok(Value::Object(knit_core::typed::Instance::new(Switch {
                started: AtomicBool::new(false),
                closed: AtomicBool::new(false),
            })))
        })
        .unwrap();

    let mut app = Application::new("refused");
    app = probe(app, 1, 101, "first");
    let app = app
        .with_block(Block::constructor(2, "test.Switch"))
        .with_link(Link::value(Connector::spot(1, "name"), Connector::spot(2, "label")));

    let err = Resolver::new(&registry).resolve(&app).err().unwrap();

    assert_eq!(err.step(), Step::Deliver);
    assert!(matches!(err.kind(), ResolveErrorKind::Delivery { .. }));
    assert!(err.to_string().contains("does not accept values"));
    assert_eq!(entries(&journal), vec!["create first", "close first"]);
}

#[test]
fn oversized_vector_index_in_a_document_is_an_error() {
    let mut registry = FactoryRegistry::new();
    registry
        .register_fn(
            FactoryKey::constructor("test.Vec"),
            vec![ParamSpec::vector("xs", ValueType::Int)],
            |args: Args| args.value(0).cloned(),
        )
        .unwrap();
    let app = AppBuilder::new().with_registry(registry).build().unwrap();

    let document = Document::parse(
        r#"{
          "id": "huge",
          "constants": [ { "id": "0", "factory": "int", "value": "1" } ],
          "blocks": [
            { "id": "1", "factory": "test.Vec",
              "params": [ { "name": "xs", "index": "9223372036854775806", "ref": "0" } ] }
          ]
        }"#,
    )
    .unwrap();

    let err = app.launch_document(&document).err().unwrap();
    assert_eq!(err.block(), Some(BlockId::new(1)));
    assert!(matches!(
        err.kind(),
        ResolveErrorKind::SlotMismatch { param, .. } if param == "xs"
    ));
}
