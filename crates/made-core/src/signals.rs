//! Derived-Signal Functions (C3)
//!
//! Confidence, reconstruction, task priority, and urgency — all derived
//! from a retention value or task scalars, plus the optional priority-
//! modulated retention kernel offered for prioritization studies.

use rand::Rng;

use crate::model::{ConfidenceBand, ReconstructionBand};

/// Noise range applied to both confidence and reconstruction draws.
const NOISE_RANGE: f64 = 0.15;

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Draw a noised confidence score from a retention value.
///
/// Non-deterministic by design — every call is a fresh draw from `rng`.
/// The score always lies in `[max(0, R-0.15), min(1, R+0.15)]`.
pub fn confidence(retention: f64, rng: &mut impl Rng) -> (f64, ConfidenceBand) {
    let noise = rng.gen_range(-NOISE_RANGE..=NOISE_RANGE);
    let score = (retention + noise).clamp(0.0, 1.0);
    (round4(score), ConfidenceBand::from_score(score))
}

/// Draw a noised reconstruction score from a retention value. Same
/// numerical shape as [`confidence`] but an independent draw, with its own
/// band labels.
pub fn reconstruction(retention: f64, rng: &mut impl Rng) -> (f64, ReconstructionBand) {
    let noise = rng.gen_range(-NOISE_RANGE..=NOISE_RANGE);
    let score = (retention + noise).clamp(0.0, 1.0);
    (round4(score), ReconstructionBand::from_score(score))
}

/// Task priority `Vk = Kk · TRk / TAk`, with time-expired tasks forced to
/// the maximum critical priority.
pub fn priority(importance_kk: f64, required_time_trk: f64, available_time_tak: f64) -> (f64, String) {
    if available_time_tak <= 0.0 {
        return (10.0, "Critical Priority (Time Expired)".to_string());
    }
    let v = round4(importance_kk * (required_time_trk / available_time_tak));
    (v, format!("Priority Vk: {v}"))
}

/// Scheduling urgency of a task, independent of memory retention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrgencyStatus {
    Overdue,
    Completed,
    Urgent,
    Moderate,
    Comfortable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrgencyLevel {
    Critical,
    None,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Urgency {
    pub status: UrgencyStatus,
    pub level: UrgencyLevel,
    /// `TRk / TAk`; `f64::INFINITY` when `TAk <= 0`.
    pub ratio: f64,
}

/// Classify a task's time budget into an urgency band.
pub fn urgency(available_time_tak: f64, required_time_trk: f64) -> Urgency {
    if available_time_tak <= 0.0 {
        return Urgency {
            status: UrgencyStatus::Overdue,
            level: UrgencyLevel::Critical,
            ratio: f64::INFINITY,
        };
    }
    if required_time_trk <= 0.0 {
        return Urgency {
            status: UrgencyStatus::Completed,
            level: UrgencyLevel::None,
            ratio: 0.0,
        };
    }

    let ratio = required_time_trk / available_time_tak;
    let (status, level) = if ratio >= 0.9 {
        (UrgencyStatus::Urgent, UrgencyLevel::High)
    } else if ratio >= 0.5 {
        (UrgencyStatus::Moderate, UrgencyLevel::Medium)
    } else {
        (UrgencyStatus::Comfortable, UrgencyLevel::Low)
    };

    Urgency { status, level, ratio }
}

/// Default scaling factor for the priority-modulated kernel below.
pub const DEFAULT_ALPHA: f64 = 0.5;

/// Priority multiplier `Vk = clamp(0.5, 1.5, 1 + (importance - 0.5) · α)`,
/// ported from the original's `calculate_priority_multiplier`
/// (`test_priority.py`). Centered so medium importance (0.5) is neutral.
pub fn priority_multiplier(importance: f64, alpha: f64) -> f64 {
    let importance = importance.clamp(0.0, 1.0);
    (1.0 + (importance - 0.5) * alpha).clamp(0.5, 1.5)
}

/// Alternate, priority-modulated retention kernel:
/// `R_pri(t) = exp(-t / (S · P · Vk))`.
///
/// Offered for prioritization studies; the degradation monitor does not
/// consult this unless explicitly enabled.
pub fn retention_with_priority(
    base_stability: f64,
    p_factor: f64,
    importance: f64,
    time_elapsed: f64,
    alpha: f64,
) -> f64 {
    let vk = priority_multiplier(importance, alpha);
    let effective_stability = base_stability * p_factor * vk;
    if effective_stability <= 0.0 {
        0.0
    } else {
        round4((-time_elapsed / effective_stability).exp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn confidence_score_is_bounded_by_retention_and_noise_range() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let retention = 0.5;
            let (score, band) = confidence(retention, &mut rng);
            assert!(score >= (retention - NOISE_RANGE).max(0.0) - 1e-9);
            assert!(score <= (retention + NOISE_RANGE).min(1.0) + 1e-9);
            assert_eq!(band, ConfidenceBand::from_score(score));
        }
    }

    #[test]
    fn priority_expiry_always_returns_critical() {
        let (v, msg) = priority(0.8, 2.0, 0.0);
        assert_eq!(v, 10.0);
        assert!(msg.contains("Critical"));
    }

    #[test]
    fn priority_normal_case() {
        let (v, msg) = priority(0.8, 2.0, 5.0);
        assert!((v - 0.32).abs() < 1e-9);
        assert!(msg.contains("0.32"));
    }

    #[test]
    fn urgency_bands_cover_every_ratio_threshold() {
        assert_eq!(urgency(10.0, 3.0).status, UrgencyStatus::Comfortable);
        assert_eq!(urgency(10.0, 6.0).status, UrgencyStatus::Moderate);
        assert_eq!(urgency(10.0, 9.0).status, UrgencyStatus::Urgent);
        assert_eq!(urgency(0.0, 5.0).status, UrgencyStatus::Overdue);
        assert_eq!(urgency(10.0, 0.0).status, UrgencyStatus::Completed);
    }

    #[test]
    fn priority_multiplier_is_neutral_at_medium_importance() {
        assert!((priority_multiplier(0.5, DEFAULT_ALPHA) - 1.0).abs() < 1e-9);
    }
}
