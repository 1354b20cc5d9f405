//! Wire envelopes exchanged with the remote testing agent.
//!
//! Inbound events arrive as `{type, phase?, message?, data?, metrics?}`.
//! Outbound commands leave as `{command, payload}`.

pub mod payload;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ProtocolError;
use crate::phase::Phase;

pub use payload::{GenerationData, PageKnowledgeData, TestCaseData, VerificationData};

/// Discriminant of an inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PhaseStart,
    Progress,
    PhaseComplete,
    Error,
    Info,
    ChatResponse,
    /// Any tag this client does not understand.
    #[serde(other)]
    Unknown,
}

/// Per-phase metrics as the agent reports them. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_response_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_per_iteration: Option<f64>,
}

/// One event from the agent's stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Raw tag text, kept for diagnostics on unknown events.
    #[serde(skip)]
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<WireMetrics>,
}

impl InboundEvent {
    /// Message text, empty when the agent sent none.
    pub fn message_text(&self) -> &str {
        self.message.as_deref().unwrap_or_default()
    }

    /// Parse the `phase` field into a [`Phase`].
    pub fn parsed_phase(&self) -> Result<Phase, ProtocolError> {
        match self.phase.as_deref() {
            Some(name) => name.parse(),
            None => Err(ProtocolError::MissingPhase {
                tag: self.tag.clone(),
            }),
        }
    }

    /// True when the event carries `metrics.total_tokens == 0`.
    pub fn reports_zero_tokens(&self) -> bool {
        self.metrics
            .as_ref()
            .and_then(|m| m.total_tokens)
            .is_some_and(|tokens| tokens == 0)
    }
}

/// Parse one text frame from the event stream.
pub fn parse_event(text: &str) -> Result<InboundEvent, ProtocolError> {
    let raw: Value = serde_json::from_str(text)?;
    let tag = raw
        .get("type")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let mut event: InboundEvent = serde_json::from_value(raw)?;
    event.tag = tag;
    Ok(event)
}

/// A command sent to the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "payload", rename_all = "snake_case")]
pub enum Command {
    Explore {
        url: String,
    },
    Design {},
    Generate {},
    Verify {},
    Refine {
        feedback: String,
        current_cases: Value,
    },
    RefineCode {
        issue: String,
        current_code: String,
    },
    Chat {
        message: String,
    },
    Reset {},
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Explore { .. } => "explore",
            Command::Design {} => "design",
            Command::Generate {} => "generate",
            Command::Verify {} => "verify",
            Command::Refine { .. } => "refine",
            Command::RefineCode { .. } => "refine_code",
            Command::Chat { .. } => "chat",
            Command::Reset {} => "reset",
        }
    }

    /// Serialize to the `{command, payload}` text frame.
    pub fn to_frame(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
