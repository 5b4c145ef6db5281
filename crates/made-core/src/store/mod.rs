//! Cognitive Record Store (C4)
//!
//! SQLite-backed persistence for `CognitiveRecord`/`TaskRecord`: a
//! `thiserror` error enum, a reader/writer connection pair behind
//! `Mutex`es so `Store` is `Send + Sync`, and an embedded migrations
//! module.
//!
//! The `mongodb://...`-style document-store URL accepted at boot is an
//! external collaborator out of scope for this core — this module honors
//! the same collection/field shape (`bigfive.ocean_scores`,
//! `bigfive.tasks`) against an embedded SQLite file instead.

mod migrations;
mod sqlite;

pub use sqlite::{Store, StorageError};

pub type Result<T> = std::result::Result<T, StorageError>;

/// Group-write payload for [`Store::update_utterance_fields`] — written
/// atomically so no reader ever observes a record with three fields from
/// generation N and the fourth from N-1.
#[derive(Debug, Clone)]
pub struct UtteranceUpdate {
    pub last_utterance: String,
    pub last_utterance_retention: f64,
    pub last_utterance_confidence_score: f64,
    pub last_utterance_confidence_band: crate::model::ConfidenceBand,
    pub last_utterance_phase: crate::model::Phase,
    pub last_utterance_at: chrono::DateTime<chrono::Utc>,
}
