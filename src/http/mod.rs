//! HTTP API server: queue control, call queries, and provider webhooks
//!
//! - POST /api/calls/queue/load — load pending candidates into the queue
//! - POST /api/calls/queue/{start,pause,resume,stop} — queue control
//! - GET  /api/calls/queue/status — queue snapshot
//! - GET  /api/calls/:call_sid — look up one call
//! - POST /api/webhooks/twilio/{voice,status,amd} — provider callbacks
//! - GET  /api/webhooks/twilio/media — media stream WebSocket
//! - GET  /health — health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
