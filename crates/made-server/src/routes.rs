//! Engine Facade (C7) — maps the external request surface onto C1-C6.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use made_core::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::result::Result;
use tokio::sync::{watch, Mutex};
use tracing::{error, info};

use crate::config::Config;
use crate::dto::*;

struct MonitorHandle {
    cancel: watch::Sender<bool>,
    generation: u64,
}

pub struct AppState {
    pub store: Arc<Store>,
    pub linguistic: Arc<dyn LinguisticClient>,
    pub config: Config,
    monitors: Mutex<HashMap<String, MonitorHandle>>,
    next_monitor_generation: std::sync::atomic::AtomicU64,
}

impl AppState {
    pub fn new(store: Arc<Store>, linguistic: Arc<dyn LinguisticClient>, config: Config) -> Self {
        Self {
            store,
            linguistic,
            config,
            monitors: Mutex::new(HashMap::new()),
            next_monitor_generation: std::sync::atomic::AtomicU64::new(0),
        }
    }
}

/// Maps engine errors onto the façade's response envelope and HTTP status.
struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            EngineError::Store(_) | EngineError::Cancelled => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error!(error = %self.0, "request failed");
        (status, Json(ErrorBody::new(self.0.to_string()))).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/ocean-scores", post(create_cognitive_record))
        .route("/api/ocean-scores", get(list_cognitive_records))
        .route("/api/ocean-scores/{report_id}", get(get_cognitive_record))
        .route("/api/ocean-scores/{report_id}", delete(delete_cognitive_record))
        .route("/api/simulate-memory", post(simulate_retention))
        .route("/api/tasks", post(create_task))
        .route("/api/tasks/{report_id}", get(list_tasks))
        .route("/api/npc-response/{report_id}", post(generate_utterance))
        .route("/api/monitor/{report_id}/start", post(start_monitor))
        .route("/api/monitor/{report_id}/stop", post(stop_monitor))
        .route("/health", get(health))
        .with_state(state)
}

async fn create_cognitive_record(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCognitiveRecordRequest>,
) -> Result<Json<Envelope<CreateCognitiveRecordResponse>>, ApiError> {
    let p_factor = project(&req.ocean_normalized);
    let mut record = CognitiveRecord::new(req.report_id, req.timestamp, req.ocean_raw, req.ocean_normalized, p_factor);
    let store_id = state.store.put(&record).map_err(EngineError::from)?;
    record.id = store_id.clone();

    let mut rng = StdRng::from_entropy();
    let (result, _) = retention_from_instant(p_factor, record.created_at, record.created_at, state.config.game_time_scale_seconds_per_day);
    let (confidence_score, confidence_band) = confidence(result.r, &mut rng);
    let text = utter(
        state.linguistic.as_ref(),
        "a freshly encoded memory",
        confidence_band,
        result.phase,
        result.r,
        &mut rng,
    )
    .await;
    let update = UtteranceUpdate {
        last_utterance: text,
        last_utterance_retention: result.r,
        last_utterance_confidence_score: confidence_score,
        last_utterance_confidence_band: confidence_band,
        last_utterance_phase: result.phase,
        last_utterance_at: record.created_at,
    };
    state
        .store
        .update_utterance_fields(&store_id, &update)
        .map_err(EngineError::from)?;

    Ok(Json(Envelope::ok(CreateCognitiveRecordResponse {
        store_id,
        report_id: record.report_id,
        p_factor,
    })))
}

async fn simulate_retention(
    Json(req): Json<SimulateRetentionRequest>,
) -> Json<Envelope<SimulateRetentionResponse>> {
    // `strength` is accepted for interface parity and logged for visibility;
    // the kernel itself never consults it.
    info!(strength = req.strength, "simulate-memory request received");
    let result = retention(req.p_factor, req.days);
    let mut rng = StdRng::from_entropy();
    let (confidence_score, confidence_band) = confidence(result.r, &mut rng);

    Json(Envelope::ok(SimulateRetentionResponse {
        retention: result.r,
        phase: result.phase.label().to_string(),
        time_in_slow: result.time_in_slow,
        confidence_score,
        confidence_band: confidence_band.label().to_string(),
    }))
}

async fn get_cognitive_record(
    State(state): State<Arc<AppState>>,
    Path(report_id): Path<String>,
) -> Result<Json<Envelope<CognitiveRecordResponse>>, ApiError> {
    let record = state.store.get_by_report(&report_id).map_err(EngineError::from)?;
    Ok(Json(Envelope::ok(CognitiveRecordResponse { record })))
}

async fn list_cognitive_records(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Envelope<CognitiveRecordListResponse>>, ApiError> {
    let records = state.store.list_all().map_err(EngineError::from)?;
    Ok(Json(Envelope::ok(CognitiveRecordListResponse { records })))
}

async fn delete_cognitive_record(
    State(state): State<Arc<AppState>>,
    Path(report_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_by_report(&report_id).map_err(EngineError::from)?;
    Ok(StatusCode::OK)
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<Json<Envelope<CreateTaskResponse>>, ApiError> {
    let task = TaskRecord::new(req.report_id, req.task_name, req.importance, req.required_time, req.available_time, chrono::Utc::now());
    let task_id = state.store.put_task(&task).map_err(EngineError::from)?;
    Ok(Json(Envelope::ok(CreateTaskResponse { task_id })))
}

async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Path(report_id): Path<String>,
) -> Result<Json<Envelope<TaskListResponse>>, ApiError> {
    let tasks = state.store.list_tasks(&report_id).map_err(EngineError::from)?;
    Ok(Json(Envelope::ok(TaskListResponse { tasks })))
}

async fn generate_utterance(
    State(state): State<Arc<AppState>>,
    Path(report_id): Path<String>,
    Json(req): Json<GenerateUtteranceRequest>,
) -> Result<Json<Envelope<GenerateUtteranceResponse>>, ApiError> {
    let record = state.store.get_by_report(&report_id).map_err(EngineError::from)?;
    let now = chrono::Utc::now();
    let (result, _) = retention_from_instant(record.p_factor, record.created_at, now, state.config.game_time_scale_seconds_per_day);

    let mut rng = StdRng::from_entropy();
    let (confidence_score, confidence_band) = confidence(result.r, &mut rng);
    let base_memory = req.base_memory.unwrap_or_else(|| "the encoded event".to_string());

    let text = utter(state.linguistic.as_ref(), &base_memory, confidence_band, result.phase, result.r, &mut rng).await;

    let update = UtteranceUpdate {
        last_utterance: text.clone(),
        last_utterance_retention: result.r,
        last_utterance_confidence_score: confidence_score,
        last_utterance_confidence_band: confidence_band,
        last_utterance_phase: result.phase,
        last_utterance_at: now,
    };
    state.store.update_utterance_fields(&record.id, &update).map_err(EngineError::from)?;

    Ok(Json(Envelope::ok(GenerateUtteranceResponse {
        text,
        confidence_band: confidence_band.label().to_string(),
        confidence_score,
        retention: result.r,
        phase: result.phase.label().to_string(),
    })))
}

async fn start_monitor(
    State(state): State<Arc<AppState>>,
    Path(report_id): Path<String>,
) -> Result<Json<Envelope<MonitorStartedResponse>>, ApiError> {
    let record = state.store.get_by_report(&report_id).map_err(EngineError::from)?;

    let mut monitors = state.monitors.lock().await;
    if monitors.contains_key(&report_id) {
        return Err(EngineError::Validation(format!(
            "a monitor session is already running for {report_id}"
        ))
        .into());
    }

    let (cancel_tx, cancel_rx) = watch::channel(false);
    let generation = state.next_monitor_generation.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    let store = state.store.clone();
    let linguistic = state.linguistic.clone();
    let scale = state.config.game_time_scale_seconds_per_day;
    let p_factor = record.p_factor;
    let created_at = record.created_at;
    let id = record.id.clone();
    let report_id_for_task = report_id.clone();
    let report_id_for_cleanup = report_id.clone();
    let state_for_task = state.clone();

    tokio::spawn(async move {
        made_core::monitor::run(p_factor, created_at, scale, cancel_rx, move |event| {
            let store = store.clone();
            let linguistic = linguistic.clone();
            let id = id.clone();
            let report_id = report_id_for_task.clone();
            async move {
                info!(
                    report_id = %report_id,
                    day = event.day,
                    retention = event.retention.r,
                    "day boundary event"
                );
                let mut rng = StdRng::from_entropy();
                let (confidence_score, confidence_band) = confidence(event.retention.r, &mut rng);
                let text = utter(
                    linguistic.as_ref(),
                    "the encoded event",
                    confidence_band,
                    event.retention.phase,
                    event.retention.r,
                    &mut rng,
                )
                .await;
                let update = UtteranceUpdate {
                    last_utterance: text,
                    last_utterance_retention: event.retention.r,
                    last_utterance_confidence_score: confidence_score,
                    last_utterance_confidence_band: confidence_band,
                    last_utterance_phase: event.retention.phase,
                    last_utterance_at: chrono::Utc::now(),
                };
                if let Err(e) = store.update_utterance_fields(&id, &update) {
                    error!(report_id = %report_id, error = %e, "failed to persist day-boundary utterance");
                }
            }
        })
        .await;

        // The loop above only returns when it halted on its own (an
        // explicit stop never reaches this point because stop_monitor
        // already removed the map entry). Clear it here so a halted
        // report can be monitored again, and so /stop correctly reports
        // not-found instead of acting on a dead task.
        let mut monitors = state_for_task.monitors.lock().await;
        if let Some(handle) = monitors.get(&report_id_for_cleanup)
            && handle.generation == generation
        {
            monitors.remove(&report_id_for_cleanup);
        }
    });

    monitors.insert(report_id.clone(), MonitorHandle { cancel: cancel_tx, generation });
    Ok(Json(Envelope::ok(MonitorStartedResponse { report_id })))
}

async fn stop_monitor(
    State(state): State<Arc<AppState>>,
    Path(report_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut monitors = state.monitors.lock().await;
    match monitors.remove(&report_id) {
        Some(handle) => {
            let _ = handle.cancel.send(true);
            Ok(StatusCode::OK)
        }
        None => Err(ApiError(EngineError::NotFound(report_id))),
    }
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Envelope<HealthResponse>> {
    let store_reachable = state.store.list_all().is_ok();
    Json(Envelope::ok(HealthResponse { store_reachable }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use made_core::store::Store;
    use tower::ServiceExt;

    fn test_state() -> Arc<AppState> {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let linguistic: Arc<dyn LinguisticClient> = Arc::new(made_core::linguistic::NullClient);
        let config = Config::from_env();
        Arc::new(AppState::new(store, linguistic, config))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_store_reachable() {
        let app = router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["storeReachable"], true);
    }

    #[tokio::test]
    async fn create_then_get_cognitive_record_round_trips() {
        let app = router(test_state());

        let create_body = serde_json::json!({
            "reportId": "r1",
            "oceanRaw": {"openness": 4, "conscientiousness": 4, "extraversion": 3, "agreeableness": 3, "neuroticism": 2},
            "oceanNormalized": {"openness": 0.8, "conscientiousness": 0.8, "extraversion": 0.6, "agreeableness": 0.6, "neuroticism": 0.4},
        });
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/ocean-scores")
                    .header("content-type", "application/json")
                    .body(Body::from(create_body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let created = body_json(response).await;
        assert_eq!(created["success"], true);
        assert!(created["pFactor"].as_f64().unwrap() >= 0.5);

        let response = app
            .oneshot(Request::builder().uri("/api/ocean-scores/r1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let fetched = body_json(response).await;
        assert_eq!(fetched["success"], true);
        assert_eq!(fetched["reportId"], "r1");
        assert!(fetched["lastUtterance"].is_string());
    }

    #[tokio::test]
    async fn get_missing_cognitive_record_is_404() {
        let app = router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/api/ocean-scores/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn simulate_retention_matches_kernel_output() {
        let app = router(test_state());
        let body = serde_json::json!({"pFactor": 1.0, "days": 0.0});
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/simulate-memory")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["retention"], 1.0);
        assert_eq!(json["phase"], "Phase 1 (Fast)");
    }

    #[tokio::test]
    async fn create_and_list_tasks() {
        let app = router(test_state());
        let body = serde_json::json!({
            "reportId": "r2",
            "taskName": "patrol sector 7",
            "importance": 0.8,
            "requiredTime": 2.0,
            "availableTime": 5.0,
        });
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/tasks")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::builder().uri("/api/tasks/r2").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["tasks"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stop_monitor_without_start_is_not_found() {
        let app = router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/monitor/no-such-report/stop")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
