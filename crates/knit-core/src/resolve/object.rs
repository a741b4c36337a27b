//! A resolved node and its lifecycle state.

use serde::Serialize;

use super::conns::Conns;
use crate::domain::{BlockId, Value};

/// Lifecycle of one node.
///
/// `Unresolved`, `InProgress` and `Failed` are tracked by the dependency walk
/// (`Walk::state`); a `RuntimeApp` only holds objects from `Resolved` on.
///
/// ```text
/// Unresolved -> InProgress -> Resolved -> Started
///                    |            \________\
///                    v                      v
///                  Failed                 Closed   (close-capable only)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectState {
    Unresolved,
    InProgress,
    Resolved,
    Failed,
    Started,
    Closed,
}

impl ObjectState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ObjectState::Failed | ObjectState::Closed)
    }
}

#[derive(Debug)]
pub struct ResolvableObject {
    pub id: BlockId,
    pub value: Value,
    /// Value edges leaving this node.
    pub conns: Conns,
    pub state: ObjectState,
    startable: bool,
    closeable: bool,
}

impl ResolvableObject {
    pub fn new(id: BlockId, value: Value, conns: Conns) -> Self {
        let (startable, closeable) = match &value {
            Value::Object(instance) => (instance.is_startable(), instance.is_closeable()),
            _ => (false, false),
        };
        Self {
            id,
            value,
            conns,
            state: ObjectState::Resolved,
            startable,
            closeable,
        }
    }

    pub fn is_startable(&self) -> bool {
        self.startable
    }

    pub fn is_closeable(&self) -> bool {
        self.closeable
    }
}
