//! Components the `knit` binary can wire out of the box.
//!
//! - `demo.Greeter::new(name)`: greets on start, says goodbye on close
//! - `demo.Ticker::new(period_ms, label)`: background thread ticking until closed
//! - `demo.Collector::new(tags...)`: receives values over value links

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use knit_core::domain::{Value, ValueType};
use knit_core::typed::{
    Args, Close, Component, ComponentError, Factory, FactoryKey, FactoryRegistry, Instance,
    ParamSpec, RegistryError, Start,
};
use tracing::{debug, info};

pub struct Greeter {
    name: String,
}

impl Start for Greeter {
    fn start(&self) -> Result<(), ComponentError> {
        println!("Hello, {}!", self.name);
        Ok(())
    }
}

impl Close for Greeter {
    fn close(&self) -> Result<(), ComponentError> {
        println!("Goodbye, {}!", self.name);
        Ok(())
    }
}

impl Component for Greeter {
    fn startable(&self) -> Option<&dyn Start> {
        Some(self)
    }

    fn closeable(&self) -> Option<&dyn Close> {
        Some(self)
    }

    fn output(&self, spot: &str) -> Option<Value> {
        (spot == "name").then(|| Value::Str(self.name.clone()))
    }
}

struct GreeterFactory;

impl Factory for GreeterFactory {
    type Output = Greeter;

    fn key(&self) -> FactoryKey {
        FactoryKey::constructor("demo.Greeter")
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::new("name", ValueType::Str).required()]
    }

    fn create(&self, args: &Args) -> Result<Greeter, ComponentError> {
        Ok(Greeter { name: args.get(0)? })
    }
}

pub struct Ticker {
    label: String,
    period: Duration,
    ticks: Arc<AtomicU64>,
    stop: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Start for Ticker {
    fn start(&self) -> Result<(), ComponentError> {
        let mut worker = self
            .worker
            .lock()
            .map_err(|_| ComponentError::new("ticker lock poisoned"))?;
        if worker.is_some() {
            return Err(ComponentError::new(format!("ticker {} already running", self.label)));
        }

        let (label, period) = (self.label.clone(), self.period);
        let (ticks, stop) = (Arc::clone(&self.ticks), Arc::clone(&self.stop));
        let handle = std::thread::Builder::new()
            .name(format!("ticker-{label}"))
            .spawn(move || {
                while !stop.load(Ordering::Acquire) {
                    std::thread::sleep(period);
                    let n = ticks.fetch_add(1, Ordering::Relaxed) + 1;
                    info!(ticker = %label, tick = n, "tick");
                }
            })
            .map_err(|e| ComponentError::with_source("cannot spawn ticker thread", e))?;
        *worker = Some(handle);
        Ok(())
    }
}

impl Close for Ticker {
    fn close(&self) -> Result<(), ComponentError> {
        self.stop.store(true, Ordering::Release);
        let handle = self
            .worker
            .lock()
            .map_err(|_| ComponentError::new("ticker lock poisoned"))?
            .take();
        if let Some(handle) = handle {
            handle
                .join()
                .map_err(|_| ComponentError::new(format!("ticker {} panicked", self.label)))?;
        }
        debug!(ticker = %self.label, ticks = self.ticks.load(Ordering::Relaxed), "ticker stopped");
        Ok(())
    }
}

impl Component for Ticker {
    fn startable(&self) -> Option<&dyn Start> {
        Some(self)
    }

    fn closeable(&self) -> Option<&dyn Close> {
        Some(self)
    }

    fn output(&self, spot: &str) -> Option<Value> {
        match spot {
            "label" => Some(Value::Str(self.label.clone())),
            "ticks" => Some(Value::Long(self.ticks.load(Ordering::Relaxed) as i64)),
            _ => None,
        }
    }
}

fn ticker(args: Args) -> Result<Value, ComponentError> {
    let period_ms: i64 = args.get(0)?;
    let period_ms = u64::try_from(period_ms)
        .ok()
        .filter(|ms| *ms > 0)
        .ok_or_else(|| ComponentError::new(format!("period_ms must be positive, got {period_ms}")))?;
    let label = match args.value(1)? {
        Value::Null => format!("ticker{}", args.block()),
        _ => args.get(1)?,
    };
    Ok(Instance::new(Ticker {
        label,
        period: Duration::from_millis(period_ms),
        ticks: Arc::new(AtomicU64::new(0)),
        stop: Arc::new(AtomicBool::new(false)),
        worker: Mutex::new(None),
    })
    .into())
}

pub struct Collector {
    tags: Vec<String>,
    received: Mutex<Vec<(String, Value)>>,
}

impl Collector {
    pub fn received(&self) -> Vec<(String, Value)> {
        self.received
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl Component for Collector {
    fn output(&self, spot: &str) -> Option<Value> {
        match spot {
            "count" => Some(Value::Int(self.received().len() as i32)),
            "tags" => Some(Value::Vector(
                self.tags.iter().cloned().map(Value::Str).collect(),
            )),
            _ => None,
        }
    }

    fn accept(&self, spot: &str, index: Option<usize>, value: Value) -> Result<(), ComponentError> {
        info!(spot, ?index, kind = value.kind(), tags = ?self.tags, "collected");
        self.received
            .lock()
            .map_err(|_| ComponentError::new("collector lock poisoned"))?
            .push((spot.to_string(), value));
        Ok(())
    }
}

fn collector(args: Args) -> Result<Value, ComponentError> {
    let tags = args
        .vector(0)?
        .iter()
        .filter(|v| !v.is_null())
        .map(|v| match v {
            Value::Str(s) => Ok(s.clone()),
            other => Err(ComponentError::new(format!("tag must be a string, got {}", other.kind()))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Instance::new(Collector {
        tags,
        received: Mutex::new(Vec::new()),
    })
    .into())
}

/// Registry with every demo factory.
pub fn registry() -> Result<FactoryRegistry, RegistryError> {
    let mut registry = FactoryRegistry::new();
    registry.register(GreeterFactory)?;
    registry.register_fn(
        FactoryKey::constructor("demo.Ticker"),
        vec![
            ParamSpec::new("period_ms", ValueType::Long).required(),
            ParamSpec::new("label", ValueType::Str),
        ],
        ticker,
    )?;
    registry.register_fn(
        FactoryKey::constructor("demo.Collector"),
        vec![ParamSpec::vector("tags", ValueType::Str)],
        collector,
    )?;
    Ok(registry)
}
