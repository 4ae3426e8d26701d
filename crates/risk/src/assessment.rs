//! Assessment types produced by the scorer: individual factors, the capped
//! aggregate score, and the level derived from configured thresholds.

use std::fmt;

use castellan_config::LevelThresholds;
use serde::{Deserialize, Serialize};

/// Highest score an assessment can carry. Factor sums are capped here.
pub const MAX_SCORE: u32 = 100;

// ── Risk level ──────────────────────────────────────────────────────────────

/// Coarse classification of an assessment, derived from the total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Classify a score against the configured boundaries. Scores below
    /// `medium` are low, `medium..high` are medium, `high` and above are high.
    #[must_use]
    pub fn from_score(score: u32, thresholds: &LevelThresholds) -> Self {
        if score >= thresholds.high {
            Self::High
        } else if score >= thresholds.medium {
            Self::Medium
        } else {
            Self::Low
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Factors and assessment ──────────────────────────────────────────────────

/// One named contribution to the score, with the evidence that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub factor_name: String,
    pub points: u32,
    pub evidence: String,
}

impl RiskFactor {
    #[must_use]
    pub fn new(factor_name: impl Into<String>, points: u32, evidence: impl Into<String>) -> Self {
        Self {
            factor_name: factor_name.into(),
            points: points.min(MAX_SCORE),
            evidence: evidence.into(),
        }
    }
}

/// Scorer output for one authentication attempt.
///
/// `factors` holds only the factors that triggered, in evaluation order.
/// `total_score` is their sum capped at [`MAX_SCORE`], and `level` is that
/// score classified against the configured thresholds. `degradations` lists
/// signals that could not be evaluated and were treated as non-triggering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub factors: Vec<RiskFactor>,
    pub total_score: u32,
    pub level: RiskLevel,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degradations: Vec<String>,
}

impl RiskAssessment {
    /// Assemble an assessment from triggered factors, deriving the capped
    /// total and the level.
    #[must_use]
    pub fn from_factors(
        factors: Vec<RiskFactor>,
        thresholds: &LevelThresholds,
        degradations: Vec<String>,
    ) -> Self {
        let total: u32 = factors.iter().map(|f| f.points).sum();
        let total_score = total.min(MAX_SCORE);
        Self {
            factors,
            total_score,
            level: RiskLevel::from_score(total_score, thresholds),
            degradations,
        }
    }

    /// Names of the triggered factors, in evaluation order.
    #[must_use]
    pub fn factor_names(&self) -> Vec<String> {
        self.factors.iter().map(|f| f.factor_name.clone()).collect()
    }

    /// Whether a factor with the given name triggered.
    #[must_use]
    pub fn triggered(&self, factor_name: &str) -> bool {
        self.factors.iter().any(|f| f.factor_name == factor_name)
    }

    /// Whether any input signal was missing or unusable during scoring.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }

    /// Redacted view for external callers: score, level, and which factors
    /// fired. Evidence details stay server-side.
    #[must_use]
    pub fn summary(&self) -> AssessmentSummary {
        AssessmentSummary {
            score: self.total_score,
            level: self.level,
            triggered_factors: self.factor_names(),
        }
    }
}

/// Caller-facing summary of an assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentSummary {
    pub score: u32,
    pub level: RiskLevel,
    pub triggered_factors: Vec<String>,
}
