//! Inbound event routing.
//!
//! Every text frame goes through [`route`]: parse, the zero-token quota
//! check, then dispatch on the event tag.
//!
//! | Tag              | Effect                                         |
//! |------------------|------------------------------------------------|
//! | `phase_start`    | active phase set, agent entry                  |
//! | `progress`       | agent entry                                    |
//! | `phase_complete` | [`complete_phase`]                             |
//! | `error`          | error entry, no phase/artifact change          |
//! | `info`           | agent entry                                    |
//! | `chat_response`  | agent entry                                    |
//! | anything else    | ignored (debug trace only)                     |

use tracing::{debug, trace};

use crate::errors::SessionError;
use crate::protocol::{EventKind, InboundEvent, parse_event};
use crate::session::state_machine::complete_phase;
use crate::session::{Sender, SessionState};

/// Fold one raw frame into the state. Never fails: anything the router
/// cannot interpret becomes an error entry or a debug trace.
pub fn route(mut state: SessionState, text: &str) -> SessionState {
    match parse_event(text) {
        Ok(event) => route_event(state, event),
        Err(err) => {
            state.push_error(&SessionError::from(err));
            state
        }
    }
}

/// Fold one parsed event into the state.
pub fn route_event(mut state: SessionState, event: InboundEvent) -> SessionState {
    trace!(session = %state.session.id, tag = %event.tag, "inbound event");

    if event.reports_zero_tokens() {
        state.push_error(&SessionError::Quota);
    }

    match event.kind {
        EventKind::PhaseStart => match event.parsed_phase() {
            Ok(phase) => {
                state.session.active_phase = Some(phase);
                state.push_log(Sender::Agent, event.message_text());
            }
            Err(err) => state.push_error(&SessionError::from(err)),
        },
        EventKind::PhaseComplete => match event.parsed_phase() {
            Ok(phase) => state = complete_phase(state, phase, &event),
            Err(err) => state.push_error(&SessionError::from(err)),
        },
        EventKind::Error => state.push_log(Sender::Error, event.message_text()),
        EventKind::Progress | EventKind::Info | EventKind::ChatResponse => {
            state.push_log(Sender::Agent, event.message_text());
        }
        EventKind::Unknown => {
            debug!(tag = %event.tag, "ignoring event with unknown type");
        }
    }
    state
}
