//! Retention Kernel (C2)
//!
//! Pure, deterministic closed-form two-phase forgetting curve. Phase 1 is
//! fast exponential decay from `p_factor` down to the transition threshold
//! `0.40`; Phase 2 continues from the *exact* transition point at a slower
//! rate, floored at the reconstruction threshold `0.30`.
//!
//! Nothing in this module touches a clock — [`retention_from_instant`] is
//! the only function that converts wall-clock time to game-days, and it
//! still just calls [`retention`] with the result.

use chrono::{DateTime, Utc};

use crate::model::Phase;

/// Time constant (game-days) of the fast phase.
pub const S_FAST: f64 = 1.47;
/// Time constant (game-days) of the slow phase.
pub const S_SLOW: f64 = 4.07;
/// Retention value at which the curve switches from fast to slow decay.
pub const TRANSITION_THRESHOLD: f64 = 0.40;
/// Floor below which retention never decays further — the reconstruction
/// threshold the degradation monitor halts on.
pub const RECONSTRUCTION_THRESHOLD: f64 = 0.30;

/// Result of evaluating the retention kernel at a point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetentionResult {
    /// Retention, rounded to four decimal places.
    pub r: f64,
    pub phase: Phase,
    /// Elapsed time within the slow phase; `0.0` while in Phase 1.
    pub time_in_slow: f64,
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Evaluate the two-phase forgetting curve for `p_factor` at `days` elapsed.
///
/// Inputs are clamped: `p_factor` to `[0.5, 1.5]`, `days` to `≥ 0`.
pub fn retention(p_factor: f64, days: f64) -> RetentionResult {
    let p_factor = p_factor.clamp(0.5, 1.5);
    let days = days.max(0.0);

    let r_fast = p_factor * (-days / S_FAST).exp();
    if r_fast >= TRANSITION_THRESHOLD {
        return RetentionResult {
            r: round4(r_fast),
            phase: Phase::Fast,
            time_in_slow: days,
        };
    }

    // Exact transition day: the point at which Phase 1 would have reached
    // the transition threshold, regardless of where `days` actually lands.
    let t_transition = -S_FAST * (TRANSITION_THRESHOLD / p_factor).ln();
    let time_in_slow = days - t_transition;
    let r_slow = TRANSITION_THRESHOLD * (-time_in_slow / S_SLOW).exp();

    RetentionResult {
        r: round4(r_slow.max(RECONSTRUCTION_THRESHOLD)),
        phase: Phase::Slow,
        time_in_slow,
    }
}

/// Diagnostics for a clock-converted retention evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetentionDiagnostics {
    pub game_days: f64,
    pub real_seconds: i64,
    pub phase: Phase,
    pub time_in_slow: f64,
}

/// Convert wall-clock elapsed time since `created_at` into game-days and
/// evaluate the retention kernel.
///
/// `scale_seconds_per_day` is real seconds per simulated day (default 60:
/// one real minute per game-day).
pub fn retention_from_instant(
    p_factor: f64,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
    scale_seconds_per_day: f64,
) -> (RetentionResult, RetentionDiagnostics) {
    let real_seconds = (now - created_at).num_milliseconds() as f64 / 1000.0;
    let game_days = real_seconds / scale_seconds_per_day;

    let result = retention(p_factor, game_days);
    let diag = RetentionDiagnostics {
        game_days: round4(game_days),
        real_seconds: real_seconds as i64,
        phase: result.phase,
        time_in_slow: if result.phase == Phase::Slow {
            round4(result.time_in_slow)
        } else {
            0.0
        },
    };
    (result, diag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn optimal_personality_at_day_zero_equals_p_factor() {
        let result = retention(1.3506, 0.0);
        assert_eq!(result.phase, Phase::Fast);
        assert!((result.r - 1.3506).abs() < 1e-6);
    }

    #[test]
    fn transition_point_boundary_goes_to_phase_one() {
        // p_factor = 1.0, t* ~= 1.3468
        let t_star = -S_FAST * (TRANSITION_THRESHOLD / 1.0_f64).ln();
        let at_transition = retention(1.0, t_star);
        assert_eq!(at_transition.phase, Phase::Fast);
        assert!((at_transition.r - 0.40).abs() < 1e-3);

        let just_after = retention(1.0, t_star + 1e-6);
        assert_eq!(just_after.phase, Phase::Slow);
        assert!((just_after.r - 0.40).abs() < 1e-3);
    }

    #[test]
    fn deep_slow_phase_floors_at_reconstruction_threshold() {
        let t_star = -S_FAST * (TRANSITION_THRESHOLD / 1.0_f64).ln();
        let result = retention(1.0, t_star + S_SLOW);
        assert_eq!(result.phase, Phase::Slow);
        assert_eq!(result.r, RECONSTRUCTION_THRESHOLD);
    }

    #[test]
    fn retention_never_drops_below_floor() {
        for days in [10.0, 50.0, 1000.0] {
            let result = retention(0.5, days);
            assert!(result.r >= RECONSTRUCTION_THRESHOLD);
        }
    }

    #[test]
    fn curve_is_continuous_at_transition_for_any_p_factor() {
        for p in [0.5, 0.75, 1.0, 1.25, 1.5] {
            let t_star = -S_FAST * (TRANSITION_THRESHOLD / p).ln();
            let before = retention(p, t_star - 1e-6).r;
            let after = retention(p, t_star + 1e-6).r;
            assert!((before - 0.40).abs() < 1e-3);
            assert!((after - 0.40).abs() < 1e-3);
        }
    }

    #[test]
    fn monitor_halt_day_for_below_average_stability() {
        let p_factor = 0.9_f64;
        let t_star = -S_FAST * (TRANSITION_THRESHOLD / p_factor).ln();
        let halt_day = t_star + S_SLOW * (TRANSITION_THRESHOLD / RECONSTRUCTION_THRESHOLD).ln();
        assert!((halt_day - 2.363).abs() < 0.01, "got {halt_day}");

        let just_before = retention(p_factor, halt_day - 0.05);
        let just_after = retention(p_factor, halt_day + 0.05);
        assert!(just_before.r > RECONSTRUCTION_THRESHOLD);
        assert!(just_after.r <= RECONSTRUCTION_THRESHOLD + 1e-6);
    }

    #[test]
    fn retention_from_instant_converts_scale_correctly() {
        let created = Utc::now() - Duration::seconds(120);
        let now = Utc::now();
        let (result, diag) = retention_from_instant(1.0, created, now, 60.0);
        assert!((diag.game_days - 2.0).abs() < 0.05);
        assert_eq!(result.phase, Phase::Slow);
    }
}
