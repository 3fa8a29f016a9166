//! Import session state machine
//!
//! An import progresses through seven states:
//! UPLOADED → DOWNLOADING → PARSING → CONVERTING → REPLACING →
//! RECONCILING → COMPLETED, with FAILED reachable from any non-terminal
//! state. REPLACING is the only state with all-or-nothing semantics;
//! every other state propagates errors best-effort.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Import workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ImportState {
    /// Request accepted, document reference resolved
    Uploaded,
    /// Fetching document bytes from the file store
    Downloading,
    /// External parsing service call in flight
    Parsing,
    /// Normalizing the parser payload into WBS records
    Converting,
    /// Atomic delete+reinsert of the project schedule
    Replacing,
    /// Linking orphaned hour entries to imported tasks
    Reconciling,
    /// Import finished successfully
    Completed,
    /// Import failed; diagnostic trail carries the cause
    Failed,
}

/// State transition event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub session_id: Uuid,
    pub old_state: ImportState,
    pub new_state: ImportState,
    pub transitioned_at: DateTime<Utc>,
}

/// One import request's in-memory session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSession {
    /// Unique session identifier
    pub session_id: Uuid,

    /// Target project
    pub project_id: String,

    /// Imported document
    pub document_id: String,

    /// Current workflow state
    pub state: ImportState,

    /// Session start time
    pub started_at: DateTime<Utc>,

    /// Session end time (if completed/failed)
    pub ended_at: Option<DateTime<Utc>>,
}

impl ImportSession {
    /// Create new import session in the UPLOADED state
    pub fn new(project_id: impl Into<String>, document_id: impl Into<String>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            project_id: project_id.into(),
            document_id: document_id.into(),
            state: ImportState::Uploaded,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Transition to new state
    pub fn transition_to(&mut self, new_state: ImportState) -> StateTransition {
        let transition = StateTransition {
            session_id: self.session_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;

        // Set end time for terminal states
        if matches!(new_state, ImportState::Completed | ImportState::Failed) {
            self.ended_at = Some(Utc::now());
        }

        tracing::debug!(
            session_id = %transition.session_id,
            old_state = ?transition.old_state,
            new_state = ?transition.new_state,
            "Import state transition"
        );

        transition
    }

    /// Check if session is terminal (finished)
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, ImportState::Completed | ImportState::Failed)
    }
}
