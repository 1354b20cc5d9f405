//! Session runtime: owns the state, the connection and the report client,
//! and serializes every change through one event queue.
//!
//! Connection frames and report outcomes arrive on the same unbounded
//! channel and are applied one at a time by [`SessionRuntime::next_event`],
//! so reducers never race. Intents run synchronously against the current
//! state in [`SessionRuntime::dispatch`].

use tokio::sync::mpsc;
use tracing::debug;

use crate::artifacts::VerificationReport;
use crate::connection::ConnectionManager;
use crate::dispatcher::{CommandDispatcher, Dispatch, Intent};
use crate::errors::{FetchError, SessionError};
use crate::report::ReportClient;
use crate::session::{ConnectionEvent, SessionState, reduce_connection, reduce_report};

/// One queued change.
#[derive(Debug)]
pub enum RuntimeEvent {
    Connection(ConnectionEvent),
    Report(Result<VerificationReport, FetchError>),
}

impl From<ConnectionEvent> for RuntimeEvent {
    fn from(event: ConnectionEvent) -> Self {
        RuntimeEvent::Connection(event)
    }
}

pub struct SessionRuntime {
    state: SessionState,
    connection: ConnectionManager,
    reports: ReportClient,
    endpoint: String,
    events_tx: mpsc::UnboundedSender<RuntimeEvent>,
    events_rx: mpsc::UnboundedReceiver<RuntimeEvent>,
}

impl SessionRuntime {
    pub fn new(endpoint: impl Into<String>, reports: ReportClient) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            state: SessionState::new(),
            connection: ConnectionManager::new(),
            reports,
            endpoint: endpoint.into(),
            events_tx,
            events_rx,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_ready()
    }

    /// Open the event stream. A failure becomes one error entry in the log
    /// and leaves the session disconnected.
    pub async fn connect(&mut self) -> bool {
        match self
            .connection
            .connect(&self.endpoint, self.events_tx.clone())
            .await
        {
            Ok(()) => true,
            Err(err) => {
                self.state.push_error(&SessionError::from(err));
                false
            }
        }
    }

    /// Wait for the next queued event and apply it.
    pub async fn next_event(&mut self) {
        // The runtime holds a sender, so the queue never reports closed.
        if let Some(event) = self.events_rx.recv().await {
            self.apply(event);
        }
    }

    /// Apply everything already queued without waiting. Returns how many
    /// events were applied.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    pub fn apply(&mut self, event: RuntimeEvent) {
        let state = std::mem::take(&mut self.state);
        self.state = match event {
            RuntimeEvent::Connection(event) => reduce_connection(state, event),
            RuntimeEvent::Report(outcome) => reduce_report(state, outcome),
        };
    }

    pub fn dispatch(&mut self, intent: Intent) -> Dispatch {
        let state = std::mem::take(&mut self.state);
        let (state, outcome) = CommandDispatcher::new(&self.connection).dispatch(state, intent);
        self.state = state;
        outcome
    }

    /// Fetch the verification report in the background. The outcome is
    /// applied by a later [`next_event`](Self::next_event).
    pub fn fetch_report(&self) {
        let client = self.reports.clone();
        let events = self.events_tx.clone();
        debug!(url = client.report_url(), "spawning report fetch");
        tokio::spawn(async move {
            let outcome = client.fetch_report().await;
            let _ = events.send(RuntimeEvent::Report(outcome));
        });
    }

    pub fn close(&mut self) {
        self.connection.close();
        self.state.session.connected = false;
    }
}
