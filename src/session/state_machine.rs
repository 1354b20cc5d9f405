//! `phase_complete` handling: metrics, artifact extraction, completion mark.

use tracing::{debug, warn};

use super::{Sender, SessionState};
use crate::artifacts::{GeneratedCode, PageKnowledge, TestCaseSet, VerificationResult};
use crate::errors::{ProtocolError, SessionError};
use crate::metrics::PhaseMetrics;
use crate::phase::Phase;
use crate::protocol::payload::decode;
use crate::protocol::{
    GenerationData, InboundEvent, PageKnowledgeData, TestCaseData, VerificationData,
};

/// Decoded artifact of a completed phase, before it is stored.
enum Completion {
    Explored(PageKnowledge),
    Designed(TestCaseSet),
    DesignRefined(TestCaseSet),
    Generated(GeneratedCode, Option<VerificationResult>),
    GenerationRefined(GeneratedCode),
    Verified(VerificationResult),
}

fn decode_completion(phase: Phase, event: &InboundEvent) -> Result<Completion, ProtocolError> {
    let data = event.data.as_ref();
    Ok(match phase {
        Phase::Exploration => {
            Completion::Explored(decode::<PageKnowledgeData>(phase, data)?.into())
        }
        Phase::Design => Completion::Designed(decode::<TestCaseData>(phase, data)?.into()),
        Phase::DesignRefinement => {
            Completion::DesignRefined(decode::<TestCaseData>(phase, data)?.into())
        }
        Phase::Generation => {
            let generation = decode::<GenerationData>(phase, data)?;
            let code = GeneratedCode::from(&generation);
            Completion::Generated(code, generation.verification.map(Into::into))
        }
        Phase::GenerationRefinement => {
            let generation = decode::<GenerationData>(phase, data)?;
            Completion::GenerationRefined(GeneratedCode::from(&generation))
        }
        Phase::Verification => {
            Completion::Verified(decode::<VerificationData>(phase, data)?.into())
        }
    })
}

fn counts_line(result: &VerificationResult) -> String {
    format!(
        "Tests completed: {} passed, {} failed",
        result.passed, result.failed
    )
}

/// Apply a `phase_complete` event for `phase`.
///
/// Order: metrics recorded, success entry, artifact stored with its agent
/// entry, active phase cleared, phase marked complete. A `data` object that
/// does not match the phase's schema produces one error entry; the active
/// phase is still cleared but nothing is stored or marked complete.
pub fn complete_phase(mut state: SessionState, phase: Phase, event: &InboundEvent) -> SessionState {
    // The agent did the work even when its data is unusable.
    if let Some(wire) = event.metrics.as_ref() {
        state.metrics.record(phase, PhaseMetrics::from(wire));
    }

    let completion = match decode_completion(phase, event) {
        Ok(completion) => completion,
        Err(err) => {
            warn!(%phase, error = %err, "discarding malformed phase_complete data");
            state.push_error(&SessionError::from(err));
            state.session.active_phase = None;
            return state;
        }
    };

    state.push_log(Sender::Success, format!("{phase} phase completed!"));

    let artifacts = &mut state.artifacts;
    let note = match completion {
        Completion::Explored(knowledge) => {
            let note = format!("Found {} testable elements", knowledge.elements.len());
            artifacts.page_knowledge = Some(knowledge);
            note
        }
        Completion::Designed(cases) => {
            let note = format!("Designed {} test cases", cases.cases.len());
            artifacts.test_cases = Some(cases);
            note
        }
        Completion::DesignRefined(cases) => {
            artifacts.test_cases = Some(cases);
            "Test cases refined successfully".to_string()
        }
        Completion::Generated(code, verification) => {
            artifacts.generated_code = Some(code);
            match verification {
                Some(result) => {
                    let note = counts_line(&result);
                    artifacts.verification = Some(result);
                    note
                }
                None => "Test code generated successfully".to_string(),
            }
        }
        Completion::GenerationRefined(code) => {
            artifacts.generated_code = Some(code);
            "Test code refined successfully".to_string()
        }
        Completion::Verified(result) => {
            let note = counts_line(&result);
            artifacts.verification = Some(result);
            note
        }
    };
    state.push_log(Sender::Agent, note);

    state.session.active_phase = None;
    state.session.mark_completed(phase);
    debug!(
        session = %state.session.id,
        %phase,
        completed = ?state.session.completed_phases,
        "phase completed"
    );
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parse_event;

    fn complete(state: SessionState, text: &str) -> SessionState {
        let event = parse_event(text).unwrap();
        let phase = event.parsed_phase().unwrap();
        complete_phase(state, phase, &event)
    }

    #[test]
    fn test_exploration_stores_knowledge_and_logs_count() {
        let state = complete(
            SessionState::new(),
            r#"{"type":"phase_complete","phase":"exploration","data":{"elements":[{},{},{}]},"metrics":{"total_tokens":40,"avg_response_time":2.0}}"#,
        );
        assert_eq!(state.artifacts.page_knowledge.as_ref().unwrap().elements.len(), 3);
        assert_eq!(state.session.completed_phases, vec![Phase::Exploration]);
        assert_eq!(state.session.active_phase, None);
        assert_eq!(state.log.count(Sender::Success), 1);
        assert_eq!(state.log.entries()[0].text, "exploration phase completed!");
        assert_eq!(state.log.entries()[1].text, "Found 3 testable elements");
        assert_eq!(state.metrics.get(Phase::Exploration).unwrap().total_tokens, 40);
    }

    #[test]
    fn test_exploration_without_elements_counts_zero() {
        let state = complete(
            SessionState::new(),
            r#"{"type":"phase_complete","phase":"exploration","data":{}}"#,
        );
        assert_eq!(state.log.last().unwrap().text, "Found 0 testable elements");
        assert!(state.metrics.is_empty());
    }

    #[test]
    fn test_generation_with_verification_stores_both() {
        let state = complete(
            SessionState::new(),
            r#"{"type":"phase_complete","phase":"generation","data":{"code":"def test(): pass","verification":{"passed":4,"failed":1}}}"#,
        );
        assert_eq!(
            state.artifacts.generated_code.as_ref().unwrap().source,
            "def test(): pass"
        );
        let verification = state.artifacts.verification.as_ref().unwrap();
        assert_eq!((verification.passed, verification.failed), (4, 1));
        assert_eq!(state.log.last().unwrap().text, "Tests completed: 4 passed, 1 failed");
    }

    #[test]
    fn test_design_refinement_overwrites_cases() {
        let state = complete(
            SessionState::new(),
            r#"{"type":"phase_complete","phase":"design","data":{"test_cases":[{"id":"TC001"}]}}"#,
        );
        let state = complete(
            state,
            r#"{"type":"phase_complete","phase":"design_refinement","data":{"test_cases":[{"id":"TC001"},{"id":"TC002"}]}}"#,
        );
        assert_eq!(state.artifacts.test_cases.as_ref().unwrap().cases.len(), 2);
        assert_eq!(
            state.session.completed_phases,
            vec![Phase::Design, Phase::DesignRefinement]
        );
        assert_eq!(state.log.last().unwrap().text, "Test cases refined successfully");
    }

    #[test]
    fn test_repeated_completion_is_recorded_once() {
        let text = r#"{"type":"phase_complete","phase":"verification","data":{"passed":1,"failed":0}}"#;
        let state = complete(SessionState::new(), text);
        let state = complete(state, text);
        assert_eq!(state.session.completed_phases, vec![Phase::Verification]);
        assert_eq!(state.log.count(Sender::Success), 2);
    }

    #[test]
    fn test_malformed_data_logs_error_without_completion() {
        let mut state = SessionState::new();
        state.session.active_phase = Some(Phase::Generation);
        let state = complete(
            state,
            r#"{"type":"phase_complete","phase":"generation","data":"done","metrics":{"total_tokens":90,"avg_response_time":1.5}}"#,
        );
        assert_eq!(state.log.count(Sender::Error), 1);
        assert_eq!(state.log.count(Sender::Success), 0);
        assert!(state.session.completed_phases.is_empty());
        assert!(state.artifacts.generated_code.is_none());
        assert_eq!(state.session.active_phase, None);
        assert_eq!(state.metrics.get(Phase::Generation).unwrap().total_tokens, 90);
    }

    #[test]
    fn test_mistyped_field_still_completes_phase() {
        let state = complete(
            SessionState::new(),
            r#"{"type":"phase_complete","phase":"exploration","data":{"elements":[1,2,3],"interactions":{"click":2}},"metrics":{"total_tokens":12}}"#,
        );
        let knowledge = state.artifacts.page_knowledge.as_ref().unwrap();
        assert_eq!(knowledge.elements.len(), 3);
        assert!(knowledge.interactions.is_empty());
        assert_eq!(state.session.completed_phases, vec![Phase::Exploration]);
        assert_eq!(state.log.count(Sender::Success), 1);
        assert_eq!(state.log.count(Sender::Error), 0);
        assert_eq!(state.metrics.get(Phase::Exploration).unwrap().total_tokens, 12);
    }
}
