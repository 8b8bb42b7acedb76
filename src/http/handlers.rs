use super::state::AppState;
use crate::bridge::{CallContext, StreamBridge};
use crate::dispatcher::{CallStatus, DispatchError, StatusDetails};
use crate::providers::{stream_twiml, StoreError};
use axum::{
    extract::{Path, State, WebSocketUpgrade},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    Form,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct LoadQueueResponse {
    pub loaded: usize,
}

#[derive(Debug, Serialize)]
pub struct ControlResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Status callback posted by the telephony provider.
#[derive(Debug, Deserialize)]
pub struct StatusCallback {
    #[serde(rename = "CallSid")]
    pub call_sid: String,
    #[serde(rename = "CallStatus")]
    pub call_status: String,
    #[serde(rename = "CallDuration")]
    pub call_duration: Option<String>,
    #[serde(rename = "AnsweredBy")]
    pub answered_by: Option<String>,
}

/// Async machine-detection callback.
#[derive(Debug, Deserialize)]
pub struct AmdCallback {
    #[serde(rename = "CallSid")]
    pub call_sid: String,
    #[serde(rename = "AnsweredBy")]
    pub answered_by: String,
}

/// Voice webhook request; the provider asks for call instructions here.
#[derive(Debug, Deserialize)]
pub struct VoiceWebhook {
    #[serde(rename = "CallSid")]
    pub call_sid: String,
}

// ============================================================================
// Queue control
// ============================================================================

/// POST /api/calls/queue/load
pub async fn load_queue(State(state): State<AppState>) -> impl IntoResponse {
    match state.dispatcher.load_pending().await {
        Ok(loaded) => (StatusCode::OK, Json(LoadQueueResponse { loaded })).into_response(),
        Err(DispatchError::Store(StoreError::Unavailable(e))) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: format!("Candidate store unavailable: {}", e),
            }),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

/// POST /api/calls/queue/start
pub async fn start_queue(State(state): State<AppState>) -> impl IntoResponse {
    match state.dispatcher.start().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ControlResponse {
                success: true,
                message: "Queue started".to_string(),
            }),
        )
            .into_response(),
        Err(e @ DispatchError::AlreadyRunning) => (
            StatusCode::CONFLICT,
            Json(ControlResponse {
                success: false,
                message: e.to_string(),
            }),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

/// POST /api/calls/queue/pause
pub async fn pause_queue(State(state): State<AppState>) -> impl IntoResponse {
    state.dispatcher.pause().await;
    Json(ControlResponse {
        success: true,
        message: "Queue paused".to_string(),
    })
}

/// POST /api/calls/queue/resume
pub async fn resume_queue(State(state): State<AppState>) -> impl IntoResponse {
    match state.dispatcher.resume().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ControlResponse {
                success: true,
                message: "Queue resumed".to_string(),
            }),
        )
            .into_response(),
        Err(e) => (
            StatusCode::CONFLICT,
            Json(ControlResponse {
                success: false,
                message: e.to_string(),
            }),
        )
            .into_response(),
    }
}

/// POST /api/calls/queue/stop
pub async fn stop_queue(State(state): State<AppState>) -> impl IntoResponse {
    state.dispatcher.stop().await;
    Json(ControlResponse {
        success: true,
        message: "Queue stopped".to_string(),
    })
}

/// GET /api/calls/queue/status
pub async fn queue_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.dispatcher.status().await)
}

/// GET /api/calls/:call_sid
///
/// Checks the dispatcher's own records first, then asks the provider for
/// calls the queue never tracked.
pub async fn get_call(
    State(state): State<AppState>,
    Path(call_sid): Path<String>,
) -> impl IntoResponse {
    if let Some(session) = state.dispatcher.get_call(&call_sid).await {
        return (StatusCode::OK, Json(session)).into_response();
    }

    match state.dispatcher.fetch_remote_call(&call_sid).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => {
            warn!(call_sid = %call_sid, "Call lookup failed: {}", e);
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: format!("Call {} not found", call_sid),
                }),
            )
                .into_response()
        }
    }
}

// ============================================================================
// Provider webhooks
// ============================================================================

/// POST /api/webhooks/twilio/voice
///
/// Returns call instructions that bridge the answered call into the media
/// WebSocket, tagging the stream with the candidate's name.
pub async fn twilio_voice(
    State(state): State<AppState>,
    Form(webhook): Form<VoiceWebhook>,
) -> Response {
    let candidate_name = state
        .dispatcher
        .get_call(&webhook.call_sid)
        .await
        .map(|session| session.candidate.name)
        .unwrap_or_default();

    let twiml = stream_twiml(&state.config.media_ws_url(), &candidate_name);
    ([(header::CONTENT_TYPE, "text/xml")], twiml).into_response()
}

/// POST /api/webhooks/twilio/status
pub async fn twilio_status(
    State(state): State<AppState>,
    Form(callback): Form<StatusCallback>,
) -> StatusCode {
    let Some(status) = CallStatus::parse(&callback.call_status) else {
        warn!(
            call_sid = %callback.call_sid,
            status = %callback.call_status,
            "Ignoring unknown call status"
        );
        return StatusCode::OK;
    };

    info!(call_sid = %callback.call_sid, ?status, "Call status update");

    let details = StatusDetails {
        answered_by: callback.answered_by,
        duration_secs: callback.call_duration.and_then(|d| d.parse().ok()),
    };
    state
        .dispatcher
        .handle_provider_status(&callback.call_sid, status, details)
        .await;

    StatusCode::OK
}

/// POST /api/webhooks/twilio/amd
pub async fn twilio_amd(
    State(state): State<AppState>,
    Form(callback): Form<AmdCallback>,
) -> StatusCode {
    info!(
        call_sid = %callback.call_sid,
        answered_by = %callback.answered_by,
        "Machine detection result"
    );
    state
        .dispatcher
        .set_answered_by(&callback.call_sid, &callback.answered_by)
        .await;
    StatusCode::OK
}

/// GET /api/webhooks/twilio/media
///
/// Upgrades to the telephony media WebSocket and runs a stream bridge for
/// the call's lifetime.
pub async fn media_stream(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let context = CallContext {
        agent_name: state.config.agent.agent_name.clone(),
        company_name: state.config.agent.company_name.clone(),
        ..CallContext::default()
    };
    let bridge = StreamBridge::new(
        state.dispatcher.clone(),
        state.config.ai.clone(),
        context,
    );

    ws.on_upgrade(move |socket| bridge.run(socket))
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
