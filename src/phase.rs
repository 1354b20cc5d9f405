//! Workflow phases and the restart (invalidation) table.
//!
//! This module provides:
//! - `Phase`, the six wire-level phases of a testing workflow
//! - `ArtifactKind`, the four artifacts a phase can produce
//! - `restart_rule`, the one table that says what a phase-initiating
//!   command keeps and what it clears

use serde::{Deserialize, Serialize};

use crate::errors::ProtocolError;

/// One stage of the testing workflow.
///
/// Ordering follows precedence: exploration < design(_refinement) <
/// generation(_refinement) < verification. Refinements sort directly after
/// the phase they refine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Exploration,
    Design,
    DesignRefinement,
    Generation,
    GenerationRefinement,
    Verification,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::Exploration,
        Phase::Design,
        Phase::DesignRefinement,
        Phase::Generation,
        Phase::GenerationRefinement,
        Phase::Verification,
    ];

    /// Precedence rank; a refinement shares the rank of the phase it refines.
    pub fn precedence(self) -> u8 {
        match self {
            Phase::Exploration => 0,
            Phase::Design | Phase::DesignRefinement => 1,
            Phase::Generation | Phase::GenerationRefinement => 2,
            Phase::Verification => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Exploration => "exploration",
            Phase::Design => "design",
            Phase::DesignRefinement => "design_refinement",
            Phase::Generation => "generation",
            Phase::GenerationRefinement => "generation_refinement",
            Phase::Verification => "verification",
        }
    }

    /// The artifact this phase writes on completion.
    pub fn artifact(self) -> ArtifactKind {
        match self {
            Phase::Exploration => ArtifactKind::PageKnowledge,
            Phase::Design | Phase::DesignRefinement => ArtifactKind::TestCases,
            Phase::Generation | Phase::GenerationRefinement => ArtifactKind::GeneratedCode,
            Phase::Verification => ArtifactKind::Verification,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownPhase(s.to_string()))
    }
}

/// The four workflow artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    PageKnowledge,
    TestCases,
    GeneratedCode,
    Verification,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::PageKnowledge,
        ArtifactKind::TestCases,
        ArtifactKind::GeneratedCode,
        ArtifactKind::Verification,
    ];
}

/// What a phase-initiating command keeps and clears before it is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartRule {
    /// Completed phases that survive the restart, in no particular order.
    pub retained: &'static [Phase],
    /// Artifacts dropped before the new run starts.
    pub cleared: &'static [ArtifactKind],
}

impl RestartRule {
    pub fn retains(&self, phase: Phase) -> bool {
        self.retained.contains(&phase)
    }
}

const EXPLORATION_RULE: RestartRule = RestartRule {
    retained: &[],
    cleared: &ArtifactKind::ALL,
};

const DESIGN_RULE: RestartRule = RestartRule {
    retained: &[Phase::Exploration],
    cleared: &[
        ArtifactKind::TestCases,
        ArtifactKind::GeneratedCode,
        ArtifactKind::Verification,
    ],
};

const GENERATION_RULE: RestartRule = RestartRule {
    retained: &[Phase::Exploration, Phase::Design],
    cleared: &[ArtifactKind::GeneratedCode, ArtifactKind::Verification],
};

/// Invalidation applied when `phase` is (re)started by the user.
///
/// Only exploration, design and generation restart a workflow segment.
/// Verification and the refinements mutate the current state in place once
/// their completion event arrives, so they have no rule.
pub fn restart_rule(phase: Phase) -> Option<RestartRule> {
    match phase {
        Phase::Exploration => Some(EXPLORATION_RULE),
        Phase::Design => Some(DESIGN_RULE),
        Phase::Generation => Some(GENERATION_RULE),
        Phase::DesignRefinement | Phase::GenerationRefinement | Phase::Verification => None,
    }
}
