use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::outcome::Outcome;

/// One person to call, loaded from the candidate store.
///
/// Candidates are never deleted; the store marks them terminal instead. The
/// only field mutated in-process is the attempt counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub notes: String,
    /// Number of call attempts made so far.
    #[serde(default)]
    pub attempts: u32,
    /// Record locator in the candidate store.
    pub row: u32,
}

/// Provider-reported call status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallStatus {
    Queued,
    Initiated,
    Ringing,
    InProgress,
    Completed,
    Busy,
    NoAnswer,
    Canceled,
    Failed,
}

impl CallStatus {
    /// Parse a provider status string; unknown strings yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "initiated" => Some(Self::Initiated),
            "ringing" => Some(Self::Ringing),
            "in-progress" | "answered" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "busy" => Some(Self::Busy),
            "no-answer" => Some(Self::NoAnswer),
            "canceled" => Some(Self::Canceled),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Whether this status ends the call (the fixed closed set).
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Busy | Self::NoAnswer | Self::Canceled | Self::Failed
        )
    }
}

/// Who said a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeakerRole {
    Agent,
    User,
}

/// A single line of conversation, append-only.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptEntry {
    pub role: SpeakerRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl TranscriptEntry {
    pub fn new(role: SpeakerRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// One attempt to reach one candidate.
///
/// Owned by the dispatcher while active; moved to the append-only completed
/// log on termination and never mutated after.
#[derive(Debug, Clone, Serialize)]
pub struct CallSession {
    pub call_sid: String,
    pub candidate: Candidate,
    pub status: CallStatus,
    /// Attempt number this session represents (candidate attempts after
    /// increment).
    pub attempts: u32,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub answered_by: Option<String>,
    pub duration_secs: Option<u32>,
    pub transcript: Vec<TranscriptEntry>,
    pub outcome: Option<Outcome>,
}

/// Dispatcher run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Stopped,
    Running,
    Paused,
}

/// Per-call summary included in status snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveCallSummary {
    pub call_sid: String,
    pub candidate_name: String,
    pub status: CallStatus,
    pub started_at: DateTime<Utc>,
}

/// Snapshot of the queue returned by `CallDispatcher::status`.
#[derive(Debug, Clone, Serialize)]
pub struct QueueStatus {
    pub run_state: RunState,
    pub queue_size: usize,
    pub active_calls: usize,
    pub completed_calls: usize,
    pub active_call_details: Vec<ActiveCallSummary>,
    pub is_within_calling_hours: bool,
    pub calling_hours: CallingHours,
}

/// Configured daily allowed-hours window.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CallingHours {
    pub start: u32,
    pub end: u32,
}
