//! User intents turned into outbound commands.
//!
//! Each operation logs the intent, applies the phase-ordering side effects
//! from [`restart_rule`], then hands the envelope to a [`CommandSink`].

use tracing::{info, warn};

use crate::errors::{PreconditionError, SessionError};
use crate::phase::{Phase, restart_rule};
use crate::protocol::Command;
use crate::session::{Sender, SessionState};

/// Where commands go. Implemented by the connection manager and by test
/// doubles.
pub trait CommandSink {
    fn is_ready(&self) -> bool;

    /// Enqueue `command`. Returns false instead of failing when not ready.
    fn send(&self, command: &Command) -> bool;
}

/// What happened to a dispatched intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Handed to the sink.
    Sent,
    /// The sink was not ready; local side effects were still applied.
    Dropped,
    /// Rejected locally before any side effect or send.
    Rejected,
}

/// A user intent, as entered in the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Explore { url: String },
    Design,
    Generate,
    Verify,
    Refine { feedback: String },
    RefineCode { issue: String },
    Chat { message: String },
    Reset,
}

/// Builds and sends commands against one sink.
pub struct CommandDispatcher<'a, S: CommandSink + ?Sized> {
    sink: &'a S,
}

impl<'a, S: CommandSink + ?Sized> CommandDispatcher<'a, S> {
    pub fn new(sink: &'a S) -> Self {
        Self { sink }
    }

    /// Run `intent` against `state`.
    pub fn dispatch(&self, state: SessionState, intent: Intent) -> (SessionState, Dispatch) {
        match intent {
            Intent::Explore { url } => self.explore(state, url),
            Intent::Design => self.design(state),
            Intent::Generate => self.generate(state),
            Intent::Verify => self.verify(state),
            Intent::Refine { feedback } => self.refine(state, feedback),
            Intent::RefineCode { issue } => self.refine_code(state, issue),
            Intent::Chat { message } => self.chat(state, message),
            Intent::Reset => self.reset(state),
        }
    }

    pub fn explore(&self, state: SessionState, url: String) -> (SessionState, Dispatch) {
        let intent = format!("Explore {url}");
        self.start_phase(state, Phase::Exploration, intent, Command::Explore { url })
    }

    pub fn design(&self, state: SessionState) -> (SessionState, Dispatch) {
        self.start_phase(state, Phase::Design, "Design test cases", Command::Design {})
    }

    pub fn generate(&self, state: SessionState) -> (SessionState, Dispatch) {
        self.start_phase(
            state,
            Phase::Generation,
            "Generate test code",
            Command::Generate {},
        )
    }

    pub fn verify(&self, mut state: SessionState) -> (SessionState, Dispatch) {
        state.push_log(Sender::User, "Verify tests");
        self.send(state, Command::Verify {})
    }

    /// Ask the agent to revise the current test cases.
    pub fn refine(&self, mut state: SessionState, feedback: String) -> (SessionState, Dispatch) {
        let Some(cases) = state.artifacts.test_cases.as_ref() else {
            state.push_error(&SessionError::from(PreconditionError::NoTestCases));
            return (state, Dispatch::Rejected);
        };
        let command = Command::Refine {
            feedback: feedback.clone(),
            current_cases: cases.to_payload(),
        };
        state.push_log(Sender::User, format!("Refine test cases: {feedback}"));
        self.send(state, command)
    }

    /// Ask the agent to fix the generated code.
    pub fn refine_code(&self, mut state: SessionState, issue: String) -> (SessionState, Dispatch) {
        let Some(code) = state.artifacts.generated_code.as_ref() else {
            state.push_error(&SessionError::from(PreconditionError::NoGeneratedCode));
            return (state, Dispatch::Rejected);
        };
        let command = Command::RefineCode {
            issue: issue.clone(),
            current_code: code.source.clone(),
        };
        state.push_log(Sender::User, format!("Fix generated code: {issue}"));
        self.send(state, command)
    }

    pub fn chat(&self, mut state: SessionState, message: String) -> (SessionState, Dispatch) {
        state.push_log(Sender::User, message.clone());
        self.send(state, Command::Chat { message })
    }

    /// Clear everything locally and tell the agent to do the same. The agent
    /// does not acknowledge; events already in flight land on the cleared
    /// state.
    pub fn reset(&self, mut state: SessionState) -> (SessionState, Dispatch) {
        let previous = state.session.id;
        state.reset();
        info!(%previous, session = %state.session.id, "session reset");
        state.push_log(Sender::System, "Session reset. Ready for a new workflow.");
        self.send(state, Command::Reset {})
    }

    fn start_phase(
        &self,
        mut state: SessionState,
        phase: Phase,
        intent: impl Into<String>,
        command: Command,
    ) -> (SessionState, Dispatch) {
        state.push_log(Sender::User, intent);
        if let Some(rule) = restart_rule(phase) {
            state.apply_restart(&rule);
        }
        self.send(state, command)
    }

    fn send(&self, state: SessionState, command: Command) -> (SessionState, Dispatch) {
        if self.sink.is_ready() && self.sink.send(&command) {
            info!(session = %state.session.id, command = command.name(), "command sent");
            (state, Dispatch::Sent)
        } else {
            warn!(
                session = %state.session.id,
                command = command.name(),
                "not connected; command dropped"
            );
            (state, Dispatch::Dropped)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{GeneratedCode, PageKnowledge, TestCaseSet, VerificationResult};
    use crate::metrics::PhaseMetrics;
    use std::cell::{Cell, RefCell};

    /// Records every command it is given.
    struct RecordingSink {
        ready: Cell<bool>,
        sent: RefCell<Vec<Command>>,
    }

    impl RecordingSink {
        fn ready() -> Self {
            Self {
                ready: Cell::new(true),
                sent: RefCell::new(Vec::new()),
            }
        }
    }

    impl CommandSink for RecordingSink {
        fn is_ready(&self) -> bool {
            self.ready.get()
        }

        fn send(&self, command: &Command) -> bool {
            if !self.ready.get() {
                return false;
            }
            self.sent.borrow_mut().push(command.clone());
            true
        }
    }

    fn full_state() -> SessionState {
        let mut state = SessionState::new();
        for phase in [
            Phase::Exploration,
            Phase::Design,
            Phase::Generation,
            Phase::Verification,
        ] {
            state.session.mark_completed(phase);
            state.metrics.record(phase, PhaseMetrics::default());
        }
        state.artifacts.page_knowledge = Some(PageKnowledge::default());
        state.artifacts.test_cases = Some(TestCaseSet::default());
        state.artifacts.generated_code = Some(GeneratedCode {
            source: "def test_login(): ...".into(),
        });
        state.artifacts.verification = Some(VerificationResult::default());
        state
    }

    #[test]
    fn test_explore_starts_new_workflow() {
        let sink = RecordingSink::ready();
        let (state, outcome) =
            CommandDispatcher::new(&sink).explore(full_state(), "https://example.com".into());
        assert_eq!(outcome, Dispatch::Sent);
        assert!(state.session.completed_phases.is_empty());
        assert!(state.artifacts.page_knowledge.is_none());
        assert!(state.artifacts.verification.is_none());
        assert_eq!(state.log.last().unwrap().sender, Sender::User);
        assert_eq!(
            sink.sent.borrow()[0],
            Command::Explore {
                url: "https://example.com".into()
            }
        );
    }

    #[test]
    fn test_design_after_generation_keeps_only_exploration() {
        let sink = RecordingSink::ready();
        let (state, _) = CommandDispatcher::new(&sink).design(full_state());
        assert_eq!(state.session.completed_phases, vec![Phase::Exploration]);
        assert!(state.artifacts.page_knowledge.is_some());
        assert!(state.artifacts.test_cases.is_none());
        assert!(state.artifacts.generated_code.is_none());
        assert!(state.artifacts.verification.is_none());
    }

    #[test]
    fn test_generate_keeps_exploration_and_design() {
        let sink = RecordingSink::ready();
        let (state, _) = CommandDispatcher::new(&sink).generate(full_state());
        assert_eq!(
            state.session.completed_phases,
            vec![Phase::Exploration, Phase::Design]
        );
        assert!(state.artifacts.test_cases.is_some());
        assert!(state.artifacts.generated_code.is_none());
        assert!(state.artifacts.verification.is_none());
    }

    #[test]
    fn test_verify_has_no_structural_side_effects() {
        let sink = RecordingSink::ready();
        let before = full_state();
        let (state, outcome) = CommandDispatcher::new(&sink).verify(before.clone());
        assert_eq!(outcome, Dispatch::Sent);
        assert_eq!(state.session, before.session);
        assert_eq!(state.artifacts, before.artifacts);
        assert_eq!(sink.sent.borrow()[0], Command::Verify {});
    }

    #[test]
    fn test_refine_without_cases_is_rejected() {
        let sink = RecordingSink::ready();
        let (state, outcome) =
            CommandDispatcher::new(&sink).refine(SessionState::new(), "more edge cases".into());
        assert_eq!(outcome, Dispatch::Rejected);
        assert_eq!(state.log.len(), 1);
        assert_eq!(state.log.count(Sender::Error), 1);
        assert!(sink.sent.borrow().is_empty());
    }

    #[test]
    fn test_refine_code_without_code_is_rejected() {
        let sink = RecordingSink::ready();
        let (state, outcome) =
            CommandDispatcher::new(&sink).refine_code(SessionState::new(), "flaky".into());
        assert_eq!(outcome, Dispatch::Rejected);
        assert_eq!(state.log.count(Sender::Error), 1);
        assert!(sink.sent.borrow().is_empty());
    }

    #[test]
    fn test_refine_code_sends_current_code() {
        let sink = RecordingSink::ready();
        let (state, outcome) =
            CommandDispatcher::new(&sink).refine_code(full_state(), "timeout on login".into());
        assert_eq!(outcome, Dispatch::Sent);
        assert_eq!(state.session.completed_phases.len(), 4);
        match &sink.sent.borrow()[0] {
            Command::RefineCode {
                issue,
                current_code,
            } => {
                assert_eq!(issue, "timeout on login");
                assert_eq!(current_code, "def test_login(): ...");
            }
            other => panic!("Expected RefineCode, got {other:?}"),
        }
    }

    #[test]
    fn test_not_ready_drops_but_applies_side_effects() {
        let sink = RecordingSink::ready();
        sink.ready.set(false);
        let (state, outcome) = CommandDispatcher::new(&sink).design(full_state());
        assert_eq!(outcome, Dispatch::Dropped);
        assert_eq!(state.session.completed_phases, vec![Phase::Exploration]);
        assert_eq!(state.log.count(Sender::Error), 0);
        assert!(sink.sent.borrow().is_empty());
    }

    /// Would queue anything it is handed, but reports itself as not ready.
    struct QueueingSink {
        calls: Cell<usize>,
    }

    impl CommandSink for QueueingSink {
        fn is_ready(&self) -> bool {
            false
        }

        fn send(&self, _command: &Command) -> bool {
            self.calls.set(self.calls.get() + 1);
            true
        }
    }

    #[test]
    fn test_sink_not_ready_is_never_handed_a_command() {
        let sink = QueueingSink {
            calls: Cell::new(0),
        };
        let (state, outcome) = CommandDispatcher::new(&sink).generate(full_state());
        assert_eq!(outcome, Dispatch::Dropped);
        assert_eq!(sink.calls.get(), 0);
        assert_eq!(
            state.session.completed_phases,
            vec![Phase::Exploration, Phase::Design]
        );
        assert_eq!(state.log.last().unwrap().text, "Generate test code");
    }

    #[test]
    fn test_reset_restores_initial_state_plus_one_system_entry() {
        let sink = RecordingSink::ready();
        let mut dirty = full_state();
        dirty.session.active_phase = Some(Phase::Verification);
        dirty.push_log(Sender::Agent, "working");
        let (state, outcome) = CommandDispatcher::new(&sink).reset(dirty);

        let fresh = SessionState::new();
        assert_eq!(outcome, Dispatch::Sent);
        assert_eq!(state.session.active_phase, fresh.session.active_phase);
        assert_eq!(state.session.completed_phases, fresh.session.completed_phases);
        assert_eq!(state.artifacts, fresh.artifacts);
        assert_eq!(state.metrics, fresh.metrics);
        assert_eq!(state.log.len(), 1);
        assert_eq!(state.log.entries()[0].sender, Sender::System);
        assert_eq!(sink.sent.borrow()[0], Command::Reset {});
    }

    #[test]
    fn test_dispatch_routes_intents() {
        let sink = RecordingSink::ready();
        let dispatcher = CommandDispatcher::new(&sink);
        let (state, _) = dispatcher.dispatch(
            SessionState::new(),
            Intent::Chat {
                message: "hello".into(),
            },
        );
        let (_, _) = dispatcher.dispatch(state, Intent::Generate);
        let names: Vec<&str> = sink.sent.borrow().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["chat", "generate"]);
    }
}
