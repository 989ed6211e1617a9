use crate::state::{wall_clock_now, AppState};
use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::{
        sse::{Event, Sse},
        Json,
    },
    routing::{get, post},
    Router,
};
use line_core::{
    EventEnvelope, HandoffError, Timestamp, Vin, Worker, WorkerId, ZoneId, MAINTENANCE_ZONE,
};
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[cfg(test)]
pub fn make_router(state: AppState) -> Router {
    make_router_with_cors(state, "http://localhost:5173")
}

pub fn make_router_with_cors(state: AppState, cors_origin: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(cors_origin.parse::<axum::http::HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/stations", get(stations_handler))
        .route("/api/v1/system", get(system_handler))
        .route("/api/v1/system/toggle", post(toggle_handler))
        .route("/api/v1/zones/reset", post(reset_zones_handler))
        .route("/api/v1/statistics/reset", post(reset_statistics_handler))
        .route("/api/v1/handoff/start", post(start_work_handler))
        .route("/api/v1/handoff/complete", post(complete_work_handler))
        .route("/api/v1/handoff/maintenance", post(maintenance_handler))
        .route("/api/v1/stream", get(stream_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct ToggleRequest {
    pub on: bool,
    pub actor: Option<String>,
}

#[derive(Deserialize)]
pub struct StartWorkRequest {
    pub zone_id: u32,
    pub vin: String,
    pub model: String,
    pub color: String,
    pub worker_id: Option<String>,
    pub worker_name: Option<String>,
    #[serde(default)]
    pub from_flying_car: bool,
}

#[derive(Deserialize)]
pub struct CompleteWorkRequest {
    pub zone_id: u32,
    pub vin: String,
}

#[derive(Deserialize)]
pub struct MaintenanceRequest {
    pub zone_id: u32,
    pub vin: String,
    pub worker_id: Option<String>,
    pub worker_name: Option<String>,
}

fn worker_from(id: Option<String>, name: Option<String>, now: Timestamp) -> Option<Worker> {
    id.map(|id| Worker {
        display_name: name.unwrap_or_else(|| id.clone()),
        id: WorkerId(id),
        checked_in_at: now,
    })
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn handoff_error_response(err: &HandoffError) -> (StatusCode, Json<serde_json::Value>) {
    let status = match err {
        HandoffError::Occupied { .. } => StatusCode::CONFLICT,
        HandoffError::ZoneNotFound(_) | HandoffError::NoCar { .. } => StatusCode::NOT_FOUND,
        HandoffError::VinMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        HandoffError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(serde_json::json!({ "error": err.to_string() })))
}

fn store_error_response(err: &line_core::StoreError) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(serde_json::json!({ "error": err.to_string() })),
    )
}

fn broadcast(state: &AppState, events: Vec<EventEnvelope>) {
    if !events.is_empty() {
        let _ = state.event_tx.send(events);
    }
}

// ---------------------------------------------------------------------------
// Read handlers
// ---------------------------------------------------------------------------

pub async fn stations_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.line.list_stations() {
        Ok(stations) => {
            let (maintenance, line): (Vec<_>, Vec<_>) = stations
                .into_iter()
                .partition(|s| s.zone_id == MAINTENANCE_ZONE);
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "line": line,
                    "maintenance": maintenance.first(),
                })),
            )
        }
        Err(err) => store_error_response(&err),
    }
}

pub async fn system_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.line.get_system_state() {
        Ok(system) => (StatusCode::OK, Json(serde_json::json!(system))),
        Err(err) => store_error_response(&err),
    }
}

// ---------------------------------------------------------------------------
// Mutation handlers
// ---------------------------------------------------------------------------

pub async fn toggle_handler(
    State(state): State<AppState>,
    Json(req): Json<ToggleRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let actor = req.actor.map(WorkerId);
    match state.line.toggle_system(req.on, actor, wall_clock_now()) {
        Ok((system, events)) => {
            broadcast(&state, events);
            (StatusCode::OK, Json(serde_json::json!(system)))
        }
        Err(err) => store_error_response(&err),
    }
}

pub async fn reset_zones_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.line.reset_all_zones(wall_clock_now()) {
        Ok(events) => {
            broadcast(&state, events);
            (StatusCode::OK, Json(serde_json::json!({ "reset": "zones" })))
        }
        Err(err) => store_error_response(&err),
    }
}

pub async fn reset_statistics_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.line.reset_statistics(wall_clock_now()) {
        Ok(events) => {
            broadcast(&state, events);
            (
                StatusCode::OK,
                Json(serde_json::json!({ "reset": "statistics" })),
            )
        }
        Err(err) => store_error_response(&err),
    }
}

pub async fn start_work_handler(
    State(state): State<AppState>,
    Json(req): Json<StartWorkRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let now = wall_clock_now();
    let worker = worker_from(req.worker_id, req.worker_name, now);
    match state.line.start_work(
        ZoneId(req.zone_id),
        Vin(req.vin),
        req.model,
        req.color,
        worker,
        req.from_flying_car,
        now,
    ) {
        Ok(events) => {
            broadcast(&state, events);
            (StatusCode::OK, Json(serde_json::json!({ "started": true })))
        }
        Err(err) => handoff_error_response(&err),
    }
}

pub async fn complete_work_handler(
    State(state): State<AppState>,
    Json(req): Json<CompleteWorkRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state
        .line
        .complete_work(ZoneId(req.zone_id), &Vin(req.vin), wall_clock_now())
    {
        Ok(events) => {
            broadcast(&state, events);
            (
                StatusCode::OK,
                Json(serde_json::json!({ "completed": true })),
            )
        }
        Err(err) => handoff_error_response(&err),
    }
}

pub async fn maintenance_handler(
    State(state): State<AppState>,
    Json(req): Json<MaintenanceRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let now = wall_clock_now();
    let worker = worker_from(req.worker_id, req.worker_name, now);
    match state
        .line
        .move_to_maintenance(ZoneId(req.zone_id), &Vin(req.vin), worker, now)
    {
        Ok(events) => {
            broadcast(&state, events);
            (StatusCode::OK, Json(serde_json::json!({ "moved": true })))
        }
        Err(err) => handoff_error_response(&err),
    }
}

// ---------------------------------------------------------------------------
// Event stream
// ---------------------------------------------------------------------------

pub async fn stream_handler(
    State(state): State<AppState>,
) -> Sse<impl futures_core::Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.event_tx.subscribe();
    let line = state.line.clone();

    let stream = async_stream::stream! {
        let mut heartbeat = tokio::time::interval(Duration::from_secs(5));
        heartbeat.tick().await; // discard the immediate first tick
        let mut flush = tokio::time::interval(Duration::from_millis(200));
        flush.tick().await; // discard the immediate first tick
        let mut pending: Vec<EventEnvelope> = Vec::new();
        loop {
            tokio::select! {
                result = rx.recv() => {
                    match result {
                        Ok(events) => pending.extend(events),
                        Err(broadcast::error::RecvError::Lagged(_)) => {}
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = flush.tick() => {
                    if !pending.is_empty() {
                        let data = serde_json::to_string(&pending).unwrap_or_default();
                        pending.clear();
                        yield Ok(Event::default().data(data));
                    }
                }
                _ = heartbeat.tick() => {
                    let is_on = line.get_system_state().map(|s| s.is_on).unwrap_or(false);
                    let hb = serde_json::json!({"heartbeat": true, "is_on": is_on});
                    yield Ok(Event::default().data(hb.to_string()));
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}
