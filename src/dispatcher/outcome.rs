//! Call outcome classification.
//!
//! A deliberate keyword heuristic, not NLP: case-insensitive substring
//! matching against the joined transcript, negative signals first, then
//! callback requests, then positive signals. First match wins.

use serde::Serialize;

use super::types::{CallStatus, TranscriptEntry};

const NEGATIVE_KEYWORDS: &[&str] = &[
    "not interested",
    "no thanks",
    "remove me",
    "don't call",
    "busy",
    "wrong number",
];

const CALLBACK_KEYWORDS: &[&str] = &[
    "call back",
    "callback",
    "later",
    "another time",
    "busy right now",
];

const POSITIVE_KEYWORDS: &[&str] = &[
    "interested",
    "yes",
    "sure",
    "sounds good",
    "tell me more",
    "schedule",
    "available",
];

/// Classification tag for a finished call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutcomeKind {
    Interested,
    NotInterested,
    CallbackRequested,
    Voicemail,
    NoAnswer,
    Failed,
    /// Completed without any keyword signal.
    Completed,
    Unknown,
}

impl OutcomeKind {
    /// Human-readable label persisted to the candidate store.
    pub fn label(self) -> &'static str {
        match self {
            Self::Interested => "Interested",
            Self::NotInterested => "Not Interested",
            Self::CallbackRequested => "Callback Requested",
            Self::Voicemail => "Voicemail",
            Self::NoAnswer => "No Answer",
            Self::Failed => "Failed",
            Self::Completed => "Completed",
            Self::Unknown => "Unknown",
        }
    }
}

/// Final classification plus retry eligibility, derived once and immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub kind: OutcomeKind,
    pub retry_eligible: bool,
}

impl Outcome {
    const fn retry(kind: OutcomeKind) -> Self {
        Self {
            kind,
            retry_eligible: true,
        }
    }

    const fn no_retry(kind: OutcomeKind) -> Self {
        Self {
            kind,
            retry_eligible: false,
        }
    }
}

/// Classify a terminal call from its final status, the provider's
/// answered-by flag, and the accumulated transcript.
pub fn classify(
    status: CallStatus,
    answered_by: Option<&str>,
    transcript: &[TranscriptEntry],
) -> Outcome {
    match status {
        CallStatus::NoAnswer | CallStatus::Busy => return Outcome::retry(OutcomeKind::NoAnswer),
        CallStatus::Failed | CallStatus::Canceled => return Outcome::retry(OutcomeKind::Failed),
        _ => {}
    }

    // Single machine-detection signal path: the provider's answered-by flag.
    if answered_by.is_some_and(|a| a.contains("machine")) {
        return Outcome::retry(OutcomeKind::Voicemail);
    }

    if status == CallStatus::Completed {
        return Outcome::no_retry(analyze_transcript(transcript));
    }

    Outcome::no_retry(OutcomeKind::Unknown)
}

/// Keyword scan over the joined lowercase transcript text.
fn analyze_transcript(transcript: &[TranscriptEntry]) -> OutcomeKind {
    if transcript.is_empty() {
        return OutcomeKind::Completed;
    }

    let text = transcript
        .iter()
        .map(|t| t.text.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    if NEGATIVE_KEYWORDS.iter().any(|k| text.contains(k)) {
        return OutcomeKind::NotInterested;
    }
    if CALLBACK_KEYWORDS.iter().any(|k| text.contains(k)) {
        return OutcomeKind::CallbackRequested;
    }
    if POSITIVE_KEYWORDS.iter().any(|k| text.contains(k)) {
        return OutcomeKind::Interested;
    }

    OutcomeKind::Completed
}
