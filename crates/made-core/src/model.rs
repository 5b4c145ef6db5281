//! Data model: cognitive records, task records, and the small closed-world
//! enums the engine passes between components instead of raw strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which branch of the two-phase forgetting curve a retention value falls in.
///
/// Modeled as a tag, not a string — the human-readable label (`"Phase 1
/// (Fast)"` / `"Phase 2 (Slow)"`) is only produced at serialization
/// boundaries via [`Phase::label`] / [`std::fmt::Display`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Fast,
    Slow,
}

impl Phase {
    /// The exact label string the linguistic register rules compare
    /// against when choosing a register.
    pub fn label(self) -> &'static str {
        match self {
            Phase::Fast => "Phase 1 (Fast)",
            Phase::Slow => "Phase 2 (Slow)",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Coarse confidence label assigned to a noised retention draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
    VeryLow,
    Confused,
}

impl ConfidenceBand {
    pub fn label(self) -> &'static str {
        match self {
            ConfidenceBand::High => "High Confidence",
            ConfidenceBand::Medium => "Medium Confidence",
            ConfidenceBand::Low => "Low Confidence",
            ConfidenceBand::VeryLow => "Very Low Confidence",
            ConfidenceBand::Confused => "Confused",
        }
    }

    /// Assign a band from a noised confidence score using the fixed
    /// thresholds `[0.80, 0.60, 0.40, 0.30]`.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.80 {
            ConfidenceBand::High
        } else if score >= 0.60 {
            ConfidenceBand::Medium
        } else if score >= 0.40 {
            ConfidenceBand::Low
        } else if score >= 0.30 {
            ConfidenceBand::VeryLow
        } else {
            ConfidenceBand::Confused
        }
    }
}

impl std::fmt::Display for ConfidenceBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Coarse reconstruction label — same numerical shape as [`ConfidenceBand`]
/// but an independent draw, with its own label text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconstructionBand {
    High,
    Medium,
    Low,
    VeryLow,
    Confused,
}

impl ReconstructionBand {
    pub fn label(self) -> &'static str {
        match self {
            ReconstructionBand::High => "High Reconstruction",
            ReconstructionBand::Medium => "Medium Reconstruction",
            ReconstructionBand::Low => "Low Reconstruction",
            ReconstructionBand::VeryLow => "Very Low Reconstruction",
            ReconstructionBand::Confused => "Confused",
        }
    }

    pub fn from_score(score: f64) -> Self {
        if score >= 0.80 {
            ReconstructionBand::High
        } else if score >= 0.60 {
            ReconstructionBand::Medium
        } else if score >= 0.40 {
            ReconstructionBand::Low
        } else if score >= 0.30 {
            ReconstructionBand::VeryLow
        } else {
            ReconstructionBand::Confused
        }
    }
}

impl std::fmt::Display for ReconstructionBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// The five OCEAN personality dimensions, normalized to `[0, 1]`.
///
/// Missing dimensions default to `0.5` (neutral), matching the original
/// source's `normalized_scores.get(dim, 0.5)` behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OceanNormalized {
    pub openness: f64,
    pub conscientiousness: f64,
    pub extraversion: f64,
    pub agreeableness: f64,
    pub neuroticism: f64,
}

impl Default for OceanNormalized {
    fn default() -> Self {
        Self {
            openness: 0.5,
            conscientiousness: 0.5,
            extraversion: 0.5,
            agreeableness: 0.5,
            neuroticism: 0.5,
        }
    }
}

/// The five OCEAN dimensions in the questionnaire's original (raw) scale.
/// Informational only — never consulted by [`crate::personality::project`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct OceanRaw {
    pub openness: i64,
    pub conscientiousness: i64,
    pub extraversion: i64,
    pub agreeableness: i64,
    pub neuroticism: i64,
}

/// One persisted personality-assessment snapshot and its most recent
/// linguistic regeneration, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CognitiveRecord {
    /// Internal primary key, assigned by the store on `put`.
    pub id: String,
    /// Opaque identifier, externally supplied, unique per assessment.
    pub report_id: String,
    /// Absolute wall-clock instant of first persistence. Immutable.
    pub created_at: DateTime<Utc>,
    pub ocean_raw: OceanRaw,
    pub ocean_normalized: OceanNormalized,
    /// Scalar in `[0.5, 1.5]`, derived from `ocean_normalized`. Immutable
    /// after creation.
    pub p_factor: f64,
    pub last_utterance: Option<String>,
    pub last_utterance_retention: Option<f64>,
    pub last_utterance_confidence_score: Option<f64>,
    pub last_utterance_confidence_band: Option<ConfidenceBand>,
    pub last_utterance_phase: Option<Phase>,
    pub last_utterance_at: Option<DateTime<Utc>>,
}

impl CognitiveRecord {
    /// Construct a freshly-created record with no utterance history yet.
    ///
    /// `p_factor` is clamped to `[0.5, 1.5]` here so the invariant holds
    /// regardless of how the caller computed it.
    pub fn new(
        report_id: impl Into<String>,
        created_at: DateTime<Utc>,
        ocean_raw: OceanRaw,
        ocean_normalized: OceanNormalized,
        p_factor: f64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            report_id: report_id.into(),
            created_at,
            ocean_raw,
            ocean_normalized,
            p_factor: p_factor.clamp(0.5, 1.5),
            last_utterance: None,
            last_utterance_retention: None,
            last_utterance_confidence_score: None,
            last_utterance_confidence_band: None,
            last_utterance_phase: None,
            last_utterance_at: None,
        }
    }
}

/// A task assigned to the agent behind a given `report_id`.
///
/// Append-only: the store exposes no update operation for existing tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub task_id: String,
    /// Foreign reference to a `CognitiveRecord`. A task whose `report_id`
    /// has no extant record is still accepted but orphaned.
    pub report_id: String,
    pub task_name: String,
    /// `Kk`, in `[0, 1]`.
    pub importance: f64,
    /// `TRk`, non-negative game-time units.
    pub required_time: f64,
    /// `TAk`, non-negative game-time units.
    pub available_time: f64,
    pub created_at: DateTime<Utc>,
}

impl TaskRecord {
    pub fn new(
        report_id: impl Into<String>,
        task_name: impl Into<String>,
        importance: f64,
        required_time: f64,
        available_time: f64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id: uuid::Uuid::new_v4().to_string(),
            report_id: report_id.into(),
            task_name: task_name.into(),
            importance: importance.clamp(0.0, 1.0),
            required_time: required_time.max(0.0),
            available_time: available_time.max(0.0),
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_band_thresholds_are_inclusive_at_each_boundary() {
        assert_eq!(ConfidenceBand::from_score(0.80), ConfidenceBand::High);
        assert_eq!(ConfidenceBand::from_score(0.79999), ConfidenceBand::Medium);
        assert_eq!(ConfidenceBand::from_score(0.60), ConfidenceBand::Medium);
        assert_eq!(ConfidenceBand::from_score(0.40), ConfidenceBand::Low);
        assert_eq!(ConfidenceBand::from_score(0.30), ConfidenceBand::VeryLow);
        assert_eq!(ConfidenceBand::from_score(0.0), ConfidenceBand::Confused);
    }

    #[test]
    fn phase_label_strings_are_stable() {
        assert_eq!(Phase::Fast.label(), "Phase 1 (Fast)");
        assert_eq!(Phase::Slow.label(), "Phase 2 (Slow)");
    }

    #[test]
    fn p_factor_is_clamped_on_construction() {
        let rec = CognitiveRecord::new(
            "r1",
            Utc::now(),
            OceanRaw::default(),
            OceanNormalized::default(),
            9.0,
        );
        assert_eq!(rec.p_factor, 1.5);
    }
}
