//! Typed schemas for the `data` object of `phase_complete` events.
//!
//! Every field is optional on the wire. Absence is kept explicit here and
//! resolved to a defined default when the artifact is built. Agents relay
//! LLM output into these objects, so a field of the wrong type reads as
//! absent instead of failing the whole object.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::ProtocolError;
use crate::phase::Phase;

/// Exploration output: what the agent learned about the page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageKnowledgeData {
    #[serde(default, deserialize_with = "lenient")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub elements: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient")]
    pub interactions: Option<Vec<Value>>,
}

/// Design (and design refinement) output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestCaseData {
    #[serde(default, deserialize_with = "lenient")]
    pub test_cases: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient")]
    pub coverage: Option<Value>,
}

/// Generation (and generation refinement) output.
///
/// Generation may already have run the tests once, in which case the
/// verification outcome rides along.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationData {
    #[serde(default, deserialize_with = "lenient")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub verification: Option<VerificationData>,
}

/// Verification output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationData {
    #[serde(default, deserialize_with = "lenient")]
    pub passed: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub failed: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub errors: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub success: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub execution_time: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub output: Option<String>,
}

/// Field-level fallback: a value that does not fit `T` becomes `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Decode `data` for `phase`. A missing `data` object decodes as all-absent;
/// anything other than an object is rejected.
pub fn decode<T>(phase: Phase, data: Option<&Value>) -> Result<T, ProtocolError>
where
    T: Default + DeserializeOwned,
{
    match data {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) if !value.is_object() => Err(ProtocolError::InvalidData {
            phase: phase.to_string(),
            message: "expected an object".to_string(),
        }),
        Some(value) => {
            serde_json::from_value(value.clone()).map_err(|e| ProtocolError::InvalidData {
                phase: phase.to_string(),
                message: e.to_string(),
            })
        }
    }
}
