//! RuntimeApp - the live instantiation of an `Application`
//!
//! Owns every resolved object and the teardown list. Closeable resources are
//! pushed on the front of a singly linked list as they are created, so walking
//! the list front to back closes them in exact reverse creation order.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::status::AppStatus;
use crate::domain::{BlockId, CloseFailure, RunError, RunId, TeardownError, Value};
use crate::resolve::object::{ObjectState, ResolvableObject};
use crate::resolve::resolvables::Resolvables;
use crate::typed::Instance;

struct CloseNode {
    block: BlockId,
    instance: Instance,
    next: Option<Box<CloseNode>>,
}

pub struct RuntimeApp {
    run_id: RunId,
    application: String,
    objects: Resolvables<ResolvableObject>,
    creation_order: Vec<BlockId>,
    start_order: Vec<BlockId>,
    closeables: Option<Box<CloseNode>>,
    started: bool,
    closed: bool,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
}

impl RuntimeApp {
    pub(crate) fn new(run_id: RunId, application: &str) -> Self {
        Self {
            run_id,
            application: application.to_string(),
            objects: Resolvables::new(),
            creation_order: Vec::new(),
            start_order: Vec::new(),
            closeables: None,
            started: false,
            closed: false,
            created_at: Utc::now(),
            started_at: None,
        }
    }

    /// Take ownership of a freshly created object.
    pub(crate) fn insert(&mut self, object: ResolvableObject) {
        let id = object.id;
        if object.is_closeable() {
            if let Value::Object(instance) = &object.value {
                self.add_closeable(id, instance.clone());
            }
        }
        if object.is_startable() {
            self.start_order.push(id);
        }
        self.creation_order.push(id);
        self.objects.put(id, object);
    }

    /// Push one resource on the front of the teardown list.
    pub fn add_closeable(&mut self, block: BlockId, instance: Instance) {
        let next = self.closeables.take();
        self.closeables = Some(Box::new(CloseNode {
            block,
            instance,
            next,
        }));
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn application(&self) -> &str {
        &self.application
    }

    pub fn get(&self, id: BlockId) -> Option<&Value> {
        self.objects.get(id).map(|o| &o.value)
    }

    pub fn object(&self, id: BlockId) -> Option<&ResolvableObject> {
        self.objects.get(id)
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.objects.contains(id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn creation_order(&self) -> &[BlockId] {
        &self.creation_order
    }

    /// Ids on the teardown list, in the order `close` visits them.
    pub fn teardown_order(&self) -> Vec<BlockId> {
        let mut ids = Vec::new();
        let mut cursor = self.closeables.as_deref();
        while let Some(node) = cursor {
            ids.push(node.block);
            cursor = node.next.as_deref();
        }
        ids
    }

    /// Start every start-capable object in creation order. Runs once.
    pub fn run(&mut self) -> Result<(), RunError> {
        if self.started {
            return Err(RunError::AlreadyStarted);
        }
        self.started = true;
        self.started_at = Some(Utc::now());

        for &id in &self.start_order {
            let Some(object) = self.objects.get_mut(id) else {
                continue;
            };
            if let Some(start) = object.value.as_object().and_then(|i| i.component().startable()) {
                start
                    .start()
                    .map_err(|source| RunError::Start { block: id, source })?;
            }
            object.state = ObjectState::Started;
            info!(block = %id, "started");
        }
        Ok(())
    }

    /// Close every resource in reverse creation order.
    pub fn close(mut self) -> Result<(), TeardownError> {
        match self.close_all() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Teardown after a failed resolution.
    pub(crate) fn unwind(mut self) -> Option<TeardownError> {
        self.close_all()
    }

    fn close_all(&mut self) -> Option<TeardownError> {
        self.closed = true;
        let mut failures = Vec::new();
        let mut cursor = self.closeables.take();
        while let Some(mut node) = cursor {
            cursor = node.next.take();
            let result = match node.instance.component().closeable() {
                Some(close) => close.close(),
                None => Ok(()),
            };
            match result {
                Ok(()) => debug!(block = %node.block, "closed"),
                Err(source) => {
                    warn!(block = %node.block, error = %source, "close failed");
                    failures.push(CloseFailure {
                        block: node.block,
                        source,
                    });
                }
            }
            if let Some(object) = self.objects.get_mut(node.block) {
                object.state = ObjectState::Closed;
            }
        }
        TeardownError::from_failures(failures)
    }

    pub fn status(&self) -> AppStatus {
        let mut status = AppStatus::new(self.run_id, &self.application, self.created_at);
        status.started_at = self.started_at;
        for (_, object) in self.objects.iter() {
            status.count(object.state);
        }
        status.pending_close = self.teardown_order().len();
        status
    }
}

impl Drop for RuntimeApp {
    fn drop(&mut self) {
        if self.closed || self.closeables.is_none() {
            return;
        }
        warn!(run = %self.run_id, "runtime app dropped without close, closing now");
        if let Some(err) = self.close_all() {
            for failure in err.suppressed() {
                warn!(error = %failure, "close failed during drop");
            }
        }
    }
}
