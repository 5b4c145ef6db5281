//! Degradation Monitor (C5)
//!
//! Converts wall-clock ticks into game-days against a single
//! `CognitiveRecord`'s `p_factor`, debounces to one event per simulated-day
//! boundary crossed, and halts once retention reaches the reconstruction
//! threshold. Driven by `tokio::time::interval` rather than a bare sleep
//! so tick drift doesn't accumulate.

use std::future::Future;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::{interval, Duration};
use tracing::info;

use crate::model::Phase;
use crate::retention::{retention_from_instant, RetentionResult, RECONSTRUCTION_THRESHOLD};

/// One tick's worth of diagnostics, emitted whenever a new game-day boundary
/// is crossed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayBoundaryEvent {
    pub day: i64,
    pub retention: RetentionResult,
}

/// How often the monitor samples the retention kernel. Distinct from the
/// day boundary it debounces against.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Drives the tick loop until retention reaches [`RECONSTRUCTION_THRESHOLD`]
/// or `cancel` is signalled. `on_day_boundary` fires at most once per
/// simulated day crossed, strictly after day 0 — it is awaited in place,
/// so the linguistic dispatch and the store's group-write both complete
/// before the next tick is considered.
pub async fn run<F>(
    p_factor: f64,
    created_at: DateTime<Utc>,
    scale_seconds_per_day: f64,
    mut cancel: watch::Receiver<bool>,
    mut on_day_boundary: impl FnMut(DayBoundaryEvent) -> F + Send,
) where
    F: Future<Output = ()> + Send,
{
    let mut ticker = interval(DEFAULT_POLL_INTERVAL);
    let mut last_day_announced: i64 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = cancel.changed() => {
                if *cancel.borrow() {
                    info!("degradation monitor cancelled");
                    return;
                }
            }
        }

        let now = Utc::now();
        let (result, diag) = retention_from_instant(p_factor, created_at, now, scale_seconds_per_day);
        let day = diag.game_days.floor() as i64;

        if day > last_day_announced {
            last_day_announced = day;
            info!(
                day,
                real_seconds = diag.real_seconds,
                retention = result.r,
                phase = %result.phase,
                "degradation monitor day boundary"
            );
            on_day_boundary(DayBoundaryEvent { day, retention: result }).await;
        }

        if result.r <= RECONSTRUCTION_THRESHOLD {
            info!(day, retention = result.r, "degradation monitor halted at reconstruction threshold");
            return;
        }
    }
}

/// Coarse status band reported by [`status_for`], independent of
/// [`ConfidenceBand`](crate::model::ConfidenceBand) — this describes the
/// *monitor's* read on the underlying retention value, not a noised draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionStatus {
    Clear,
    Uncertain,
    Reconstruction,
}

/// Classify a retention value into the monitor's status band.
pub fn status_for(result: &RetentionResult) -> RetentionStatus {
    if result.r <= RECONSTRUCTION_THRESHOLD {
        RetentionStatus::Reconstruction
    } else if result.phase == Phase::Slow {
        RetentionStatus::Uncertain
    } else {
        RetentionStatus::Clear
    }
}
