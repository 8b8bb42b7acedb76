//! Boundary contracts with the external collaborators: the telephony
//! call-control API and the candidate store. The dispatcher only ever sees
//! these traits; concrete clients live in the submodules.

mod store;
mod twilio;

pub use store::JsonFileStore;
pub use twilio::{stream_twiml, TwilioClient};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dispatcher::Candidate;

/// Telephony transport or API failure.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("telephony transport error: {0}")]
    Transport(String),
    #[error("telephony provider rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Candidate store failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("candidate store unavailable: {0}")]
    Unavailable(String),
    #[error("candidate record {0} not found")]
    NotFound(u32),
}

/// Options for placing one outbound call.
#[derive(Debug, Clone)]
pub struct PlaceCallOptions {
    /// Webhook returning call instructions (connects the media stream).
    pub voice_webhook_url: String,
    /// Webhook receiving call status callbacks.
    pub status_webhook_url: String,
    /// Wait for the end of a voicemail greeting before reporting the
    /// detection result (detection itself always runs).
    pub detect_answering_machine: bool,
    /// Run machine detection asynchronously so the call connects while it
    /// completes.
    pub async_detection: bool,
    pub detection_callback_url: Option<String>,
}

/// Provider response to a successfully placed call.
#[derive(Debug, Clone)]
pub struct PlacedCall {
    pub call_sid: String,
    pub status: String,
    pub to: String,
    pub from: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Summary returned when querying an existing call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSummary {
    #[serde(rename = "sid")]
    pub call_sid: String,
    pub status: String,
    pub to: String,
    pub from: String,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub answered_by: Option<String>,
}

/// Telephony call-control collaborator.
#[async_trait]
pub trait CallProvider: Send + Sync {
    async fn place_call(
        &self,
        to: &str,
        options: &PlaceCallOptions,
    ) -> Result<PlacedCall, ProviderError>;

    async fn fetch_call(&self, call_sid: &str) -> Result<CallSummary, ProviderError>;
}

/// Outcome written back to a candidate record after a terminal call.
#[derive(Debug, Clone, Serialize)]
pub struct StatusUpdate {
    pub status: String,
    pub outcome: String,
    pub last_called_at: DateTime<Utc>,
    pub attempts: u32,
}

/// Candidate store collaborator.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// All candidates still eligible for calling.
    async fn list_pending(&self) -> Result<Vec<Candidate>, StoreError>;

    /// Record the outcome of an attempt against a candidate record.
    async fn update_status(&self, row: u32, update: &StatusUpdate) -> Result<(), StoreError>;
}
