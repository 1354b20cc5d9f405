//! Session state and the reducers that transform it.
//!
//! `SessionState` is the aggregate root: the phase-tracking `Session`, the
//! `ArtifactStore`, the `MetricsAggregator` and the `SessionLog`. Every
//! inbound event and every command produces a new state from the old one;
//! reducers take the state by value and hand it back, so nothing else holds
//! a mutable alias to it.
//!
//! | Reducer                 | Input                                  |
//! |-------------------------|----------------------------------------|
//! | `router::route`         | one text frame from the event stream   |
//! | `reduce_connection`     | connection lifecycle change            |
//! | `reduce_report`         | outcome of the report fetch            |
//! | `CommandDispatcher`     | user intents (before the send)         |

pub mod log;
pub mod state_machine;

use tracing::{info, warn};
use uuid::Uuid;

use crate::artifacts::{ArtifactStore, VerificationReport};
use crate::errors::{ConnectionError, FetchError, SessionError};
use crate::metrics::MetricsAggregator;
use crate::phase::{Phase, RestartRule};

pub use log::{LogEntry, Sender, SessionLog};

/// Phase tracking for one workflow instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Identifies this workflow instance in traces. Replaced on reset.
    pub id: Uuid,
    /// At most one phase runs at a time.
    pub active_phase: Option<Phase>,
    /// Phases whose latest run finished, in first-seen order, no duplicates.
    pub completed_phases: Vec<Phase>,
    pub connected: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            active_phase: None,
            completed_phases: Vec::new(),
            connected: false,
        }
    }
}

impl Session {
    pub fn is_completed(&self, phase: Phase) -> bool {
        self.completed_phases.contains(&phase)
    }

    /// Idempotent add that keeps first-seen order.
    pub fn mark_completed(&mut self, phase: Phase) {
        if !self.is_completed(phase) {
            self.completed_phases.push(phase);
        }
    }
}

/// Connection lifecycle changes fed into [`reduce_connection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Opened,
    /// Text frame from the agent.
    Message(String),
    /// Closed by the remote end or the network.
    Closed,
    TransportError(String),
}

/// Everything the UI renders from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub session: Session,
    pub artifacts: ArtifactStore,
    pub metrics: MetricsAggregator,
    pub log: SessionLog,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_log(&mut self, sender: Sender, text: impl Into<String>) {
        self.log.push(sender, text);
    }

    /// Record an error as its single user-visible log entry.
    pub fn push_error(&mut self, err: &SessionError) {
        warn!(session = %self.session.id, error = %err, "session error");
        self.log.push(Sender::Error, err.log_text());
    }

    /// Apply a restart rule: keep only retained completions and drop the
    /// listed artifacts.
    pub fn apply_restart(&mut self, rule: &RestartRule) {
        self.session
            .completed_phases
            .retain(|phase| rule.retains(*phase));
        for kind in rule.cleared {
            self.artifacts.clear(*kind);
        }
    }

    /// Clear the workflow. The connection flag reflects the transport, which
    /// a reset does not touch, so it carries over.
    pub fn reset(&mut self) {
        self.session = Session {
            connected: self.session.connected,
            ..Session::default()
        };
        self.artifacts.clear_all();
        self.metrics.clear();
        self.log.clear();
    }
}

/// Fold a connection lifecycle change into the state.
///
/// Text frames are routed through [`crate::router::route`]; close and
/// transport errors only flip the connection flag and log, phase state is
/// left as is. A new connection starts with no phase in flight: the agent
/// on the other end does not resume work from the previous socket.
pub fn reduce_connection(mut state: SessionState, event: ConnectionEvent) -> SessionState {
    match event {
        ConnectionEvent::Opened => {
            state.session.id = Uuid::new_v4();
            info!(session = %state.session.id, "connected to agent");
            if let Some(phase) = state.session.active_phase.take() {
                warn!(%phase, "dropping phase left running by the previous connection");
            }
            state.session.connected = true;
            state.push_log(Sender::System, "Connected to testing agent");
            state
        }
        ConnectionEvent::Message(text) => crate::router::route(state, &text),
        ConnectionEvent::Closed => {
            state.session.connected = false;
            warn!(session = %state.session.id, "agent connection closed");
            state.push_log(Sender::System, ConnectionError::ClosedUnexpectedly.to_string());
            state
        }
        ConnectionEvent::TransportError(message) => {
            let err = SessionError::from(ConnectionError::Transport(message));
            state.push_error(&err);
            state
        }
    }
}

/// Fold the outcome of a report fetch into the state. A failure keeps the
/// previous report.
pub fn reduce_report(
    mut state: SessionState,
    outcome: Result<VerificationReport, FetchError>,
) -> SessionState {
    match outcome {
        Ok(report) => {
            info!(screenshots = report.screenshots.len(), "verification report loaded");
            state.push_log(
                Sender::System,
                format!(
                    "Loaded verification report with {} screenshots",
                    report.screenshots.len()
                ),
            );
            state.artifacts.report = Some(report);
        }
        Err(err) => state.push_error(&SessionError::from(err)),
    }
    state
}
