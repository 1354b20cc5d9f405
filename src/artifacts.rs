//! Workflow artifacts and the store that holds them.
//!
//! Each artifact is absent until the phase that produces it completes. The
//! verification report is fetched separately over HTTP and lives alongside
//! the four phase artifacts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::phase::ArtifactKind;
use crate::protocol::{GenerationData, PageKnowledgeData, TestCaseData, VerificationData};

/// What exploration learned about the page under test.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageKnowledge {
    pub url: Option<String>,
    pub title: Option<String>,
    pub elements: Vec<Value>,
    pub interactions: Vec<Value>,
}

impl From<PageKnowledgeData> for PageKnowledge {
    fn from(data: PageKnowledgeData) -> Self {
        Self {
            url: data.url,
            title: data.title,
            elements: data.elements.unwrap_or_default(),
            interactions: data.interactions.unwrap_or_default(),
        }
    }
}

/// A single designed test case. Fields the agent adds beyond the known ones
/// are preserved in `extra` so they survive a refine round-trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub steps: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TestCase {
    fn from_value(value: Value) -> Self {
        match serde_json::from_value::<TestCase>(value.clone()) {
            Ok(case) => case,
            // Not an object: keep the text so nothing is silently dropped.
            Err(_) => TestCase {
                name: Some(match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                }),
                ..TestCase::default()
            },
        }
    }
}

/// The designed test cases plus the agent's coverage analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestCaseSet {
    pub cases: Vec<TestCase>,
    pub coverage: Option<Value>,
}

impl TestCaseSet {
    /// The `current_cases` payload sent back with a refine command.
    pub fn to_payload(&self) -> Value {
        json!({
            "test_cases": self.cases,
            "coverage": self.coverage.clone().unwrap_or_else(|| json!({})),
        })
    }
}

impl From<TestCaseData> for TestCaseSet {
    fn from(data: TestCaseData) -> Self {
        Self {
            cases: data
                .test_cases
                .unwrap_or_default()
                .into_iter()
                .map(TestCase::from_value)
                .collect(),
            coverage: data.coverage,
        }
    }
}

/// Generated test source code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedCode {
    pub source: String,
}

impl From<&GenerationData> for GeneratedCode {
    fn from(data: &GenerationData) -> Self {
        Self {
            source: data.code.clone().unwrap_or_default(),
        }
    }
}

/// Outcome of running the generated tests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub passed: u32,
    pub failed: u32,
    pub errors: Option<u32>,
    pub success: Option<bool>,
    pub execution_time_seconds: f64,
    pub output: String,
}

impl From<VerificationData> for VerificationResult {
    fn from(data: VerificationData) -> Self {
        Self {
            passed: data.passed.unwrap_or(0),
            failed: data.failed.unwrap_or(0),
            errors: data.errors,
            success: data.success,
            execution_time_seconds: data.execution_time.unwrap_or(0.0),
            output: data.output.unwrap_or_default(),
        }
    }
}

/// One screenshot in a verification report.
///
/// Agents have used three different field names for the image; all three
/// are accepted and [`Screenshot::image`] picks the first one present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Screenshot {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

impl Screenshot {
    pub fn image(&self) -> Option<&str> {
        self.image_base64
            .as_deref()
            .or(self.screenshot_base64.as_deref())
            .or(self.screenshot.as_deref())
    }
}

/// Body of the report endpoint: `{result: {screenshots: [...]}}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportEnvelope {
    #[serde(default)]
    pub result: ReportBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportBody {
    #[serde(default)]
    pub screenshots: Vec<Screenshot>,
    #[serde(default)]
    pub passed: Option<u32>,
    #[serde(default)]
    pub failed: Option<u32>,
}

/// A fetched verification report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationReport {
    pub screenshots: Vec<Screenshot>,
    pub passed: Option<u32>,
    pub failed: Option<u32>,
    pub fetched_at: DateTime<Utc>,
}

impl From<ReportEnvelope> for VerificationReport {
    fn from(envelope: ReportEnvelope) -> Self {
        Self {
            screenshots: envelope.result.screenshots,
            passed: envelope.result.passed,
            failed: envelope.result.failed,
            fetched_at: Utc::now(),
        }
    }
}

/// Holds the four workflow artifacts and the fetched report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtifactStore {
    pub page_knowledge: Option<PageKnowledge>,
    pub test_cases: Option<TestCaseSet>,
    pub generated_code: Option<GeneratedCode>,
    pub verification: Option<VerificationResult>,
    pub report: Option<VerificationReport>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, kind: ArtifactKind) -> bool {
        match kind {
            ArtifactKind::PageKnowledge => self.page_knowledge.is_some(),
            ArtifactKind::TestCases => self.test_cases.is_some(),
            ArtifactKind::GeneratedCode => self.generated_code.is_some(),
            ArtifactKind::Verification => self.verification.is_some(),
        }
    }

    pub fn clear(&mut self, kind: ArtifactKind) {
        match kind {
            ArtifactKind::PageKnowledge => self.page_knowledge = None,
            ArtifactKind::TestCases => self.test_cases = None,
            ArtifactKind::GeneratedCode => self.generated_code = None,
            ArtifactKind::Verification => self.verification = None,
        }
    }

    /// Drop the phase artifacts and the report.
    pub fn clear_all(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        ArtifactKind::ALL.iter().all(|kind| !self.has(*kind)) && self.report.is_none()
    }
}
