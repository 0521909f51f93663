use super::state::{AppState, SessionEntry};
use crate::device::CaptureMode;
use crate::error::{SessionError, SessionResult};
use crate::session::CaptureSession;
use crate::upload::{OwnerRecord, RemoteReference, UploadBinding};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    /// Capture mode (defaults to the configured mode)
    pub mode: Option<CaptureMode>,

    /// Question context the recording answers
    pub context: Option<String>,

    /// Record to attach the upload to
    pub owner: Option<OwnerRecord>,

    /// Reopen a recording stored by an earlier session
    pub storage_key: Option<String>,

    /// Length of the stored recording, if known
    pub duration_seconds: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    pub mode: CaptureMode,
}

#[derive(Debug, Deserialize)]
pub struct SeekRequest {
    /// Relative jump, e.g. -10 or +10
    pub delta_seconds: Option<f64>,

    /// Absolute position as a fraction of the duration
    pub fraction: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub detail: String,
}

// ============================================================================
// Helpers
// ============================================================================

fn error_response(err: &SessionError) -> Response {
    let status = match err {
        SessionError::InvalidTransition { .. } => StatusCode::CONFLICT,
        SessionError::Device(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SessionError::Capture(_) => StatusCode::INTERNAL_SERVER_ERROR,
        SessionError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        SessionError::UploadFailed(_)
        | SessionError::DeleteFailed(_)
        | SessionError::Playback(_) => StatusCode::BAD_GATEWAY,
    };

    (
        status,
        Json(ErrorResponse {
            error: err.user_message(),
            detail: err.to_string(),
        }),
    )
        .into_response()
}

fn not_found(session_id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("Session {} not found", session_id),
            detail: "unknown session".to_string(),
        }),
    )
        .into_response()
}

/// Run `op` against a session and answer with its fresh snapshot
async fn run<F>(state: &AppState, session_id: &str, op: F) -> Response
where
    F: for<'a> FnOnce(&'a mut CaptureSession) -> BoxFuture<'a, SessionResult<()>>,
{
    let Some(entry) = state.session(session_id).await else {
        return not_found(session_id);
    };

    let mut session = entry.session.lock().await;
    match op(&mut session).await {
        Ok(()) => (StatusCode::OK, Json(session.snapshot())).into_response(),
        Err(e) => {
            error!("Session {}: {}", session_id, e);
            error_response(&e)
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /sessions
/// Create a new capture session, optionally reopening a stored recording
pub async fn create_session(
    State(state): State<AppState>,
    body: Option<Json<CreateSessionRequest>>,
) -> Response {
    let req = body.map(|Json(req)| req).unwrap_or_default();

    let binding = UploadBinding {
        context: req.context.unwrap_or_default(),
        owner: req.owner,
    };
    let config = state.capture.session_config(req.mode, binding.clone());
    let session_id = config.session_id.clone();

    let mut session = CaptureSession::new(config, state.collaborators.clone());
    if let Some(storage_key) = req.storage_key.filter(|key| !key.is_empty()) {
        let reference = RemoteReference {
            storage_key,
            binding,
            duration_seconds: req.duration_seconds,
        };
        if let Err(e) = session.restore(reference) {
            error!("Session {}: {}", session_id, e);
            return error_response(&e);
        }
    }
    let snapshot = session.snapshot();
    let entry = SessionEntry {
        status: session.subscribe(),
        session: Arc::new(Mutex::new(session)),
    };

    {
        let mut sessions = state.sessions.write().await;
        sessions.insert(session_id.clone(), entry);
    }

    info!("Session {} created", session_id);

    (StatusCode::CREATED, Json(snapshot)).into_response()
}

/// GET /sessions/:session_id
/// Current snapshot; falls back to the last published one while the session is busy
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let Some(entry) = state.session(&session_id).await else {
        return not_found(&session_id);
    };

    let snapshot = match entry.session.try_lock() {
        Ok(mut session) => session.snapshot(),
        Err(_) => entry.status.borrow().clone(),
    };

    (StatusCode::OK, Json(snapshot)).into_response()
}

/// POST /sessions/:session_id/preview
pub async fn preview(State(state): State<AppState>, Path(session_id): Path<String>) -> Response {
    run(&state, &session_id, |s| Box::pin(s.preview())).await
}

/// POST /sessions/:session_id/retry
pub async fn retry(State(state): State<AppState>, Path(session_id): Path<String>) -> Response {
    run(&state, &session_id, |s| Box::pin(s.retry())).await
}

/// POST /sessions/:session_id/mode
pub async fn set_mode(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<ModeRequest>,
) -> Response {
    run(&state, &session_id, move |s| Box::pin(s.set_mode(req.mode))).await
}

/// POST /sessions/:session_id/record/start
pub async fn start_recording(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    run(&state, &session_id, |s| Box::pin(s.start_recording())).await
}

/// POST /sessions/:session_id/record/stop
pub async fn stop_recording(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    run(&state, &session_id, |s| Box::pin(s.stop_recording())).await
}

/// POST /sessions/:session_id/record/cancel
pub async fn cancel_recording(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    run(&state, &session_id, |s| Box::pin(s.cancel())).await
}

/// POST /sessions/:session_id/rerecord
pub async fn rerecord(State(state): State<AppState>, Path(session_id): Path<String>) -> Response {
    run(&state, &session_id, |s| Box::pin(s.rerecord())).await
}

/// POST /sessions/:session_id/upload
pub async fn upload(State(state): State<AppState>, Path(session_id): Path<String>) -> Response {
    run(&state, &session_id, |s| {
        Box::pin(async move { s.upload().await.map(|_| ()) })
    })
    .await
}

/// POST /sessions/:session_id/playback/toggle
pub async fn toggle_playback(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    run(&state, &session_id, |s| Box::pin(s.toggle_play())).await
}

/// POST /sessions/:session_id/playback/seek
pub async fn seek(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<SeekRequest>,
) -> Response {
    if req.delta_seconds.is_none() && req.fraction.is_none() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Provide delta_seconds or fraction".to_string(),
                detail: "empty seek request".to_string(),
            }),
        )
            .into_response();
    }

    run(&state, &session_id, move |s| {
        Box::pin(async move {
            if let Some(delta) = req.delta_seconds {
                s.seek_relative(delta);
            }
            if let Some(fraction) = req.fraction {
                s.seek_to_fraction(fraction);
            }
            Ok(())
        })
    })
    .await
}

/// DELETE /sessions/:session_id/recording
/// Delete the stored recording
pub async fn delete_recording(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    run(&state, &session_id, |s| Box::pin(s.delete_recording())).await
}

/// DELETE /sessions/:session_id
/// Tear the session down, releasing devices and timers
pub async fn close_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Response {
    let entry = {
        let mut sessions = state.sessions.write().await;
        sessions.remove(&session_id)
    };

    match entry {
        Some(entry) => {
            let mut session = entry.session.lock().await;
            session.shutdown().await;
            info!("Session {} closed", session_id);
            (StatusCode::OK, Json(session.snapshot())).into_response()
        }
        None => not_found(&session_id),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
