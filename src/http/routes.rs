use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Queue control
        .route("/api/calls/queue/load", post(handlers::load_queue))
        .route("/api/calls/queue/start", post(handlers::start_queue))
        .route("/api/calls/queue/pause", post(handlers::pause_queue))
        .route("/api/calls/queue/resume", post(handlers::resume_queue))
        .route("/api/calls/queue/stop", post(handlers::stop_queue))
        .route("/api/calls/queue/status", get(handlers::queue_status))
        // Call queries
        .route("/api/calls/:call_sid", get(handlers::get_call))
        // Provider webhooks
        .route("/api/webhooks/twilio/voice", post(handlers::twilio_voice))
        .route("/api/webhooks/twilio/status", post(handlers::twilio_status))
        .route("/api/webhooks/twilio/amd", post(handlers::twilio_amd))
        // Telephony media stream (WebSocket)
        .route("/api/webhooks/twilio/media", get(handlers::media_stream))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
