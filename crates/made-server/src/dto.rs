//! Request/response bodies for the HTTP facade. JSON via `serde`; every
//! response is wrapped in a `{success, ...}` envelope.

use chrono::{DateTime, Utc};
use made_core::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(flatten)]
    pub body: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(body: T) -> Self {
        Self { success: true, body }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self { success: false, error: message.into() }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCognitiveRecordRequest {
    pub report_id: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    pub ocean_raw: OceanRaw,
    pub ocean_normalized: OceanNormalized,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCognitiveRecordResponse {
    pub store_id: String,
    pub report_id: String,
    pub p_factor: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateRetentionRequest {
    pub p_factor: f64,
    pub days: f64,
    /// Accepted for interface parity, never consulted by the kernel —
    /// reserved for a future retention model.
    #[serde(default = "default_strength")]
    pub strength: f64,
}

fn default_strength() -> f64 {
    2.8
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateRetentionResponse {
    pub retention: f64,
    pub phase: String,
    pub time_in_slow: f64,
    pub confidence_score: f64,
    pub confidence_band: String,
}

#[derive(Debug, Serialize)]
pub struct CognitiveRecordResponse {
    #[serde(flatten)]
    pub record: CognitiveRecord,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CognitiveRecordListResponse {
    pub records: Vec<CognitiveRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub report_id: String,
    pub task_name: String,
    pub importance: f64,
    pub required_time: f64,
    pub available_time: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskResponse {
    pub task_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListResponse {
    pub tasks: Vec<TaskRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateUtteranceRequest {
    #[serde(default)]
    pub base_memory: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateUtteranceResponse {
    pub text: String,
    pub confidence_band: String,
    pub confidence_score: f64,
    pub retention: f64,
    pub phase: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub store_reachable: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStartedResponse {
    pub report_id: String,
}
