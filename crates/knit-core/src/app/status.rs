use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::RunId;
use crate::resolve::object::ObjectState;

/// Snapshot of a `RuntimeApp`.
#[derive(Debug, Clone, Serialize)]
pub struct AppStatus {
    pub run_id: String,
    pub application: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub resolved: usize,
    pub started: usize,
    pub closed: usize,
    /// Resources still on the teardown list.
    pub pending_close: usize,
}

impl AppStatus {
    pub(crate) fn new(run_id: RunId, application: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            run_id: run_id.to_string(),
            application: application.to_string(),
            created_at,
            started_at: None,
            resolved: 0,
            started: 0,
            closed: 0,
            pending_close: 0,
        }
    }

    pub(crate) fn count(&mut self, state: ObjectState) {
        match state {
            ObjectState::Resolved => self.resolved += 1,
            ObjectState::Started => self.started += 1,
            ObjectState::Closed => self.closed += 1,
            // walk-only states
            ObjectState::Unresolved | ObjectState::InProgress | ObjectState::Failed => {}
        }
    }
}
