use serde::Serialize;

use super::outcome::OutcomeKind;
use super::types::CallStatus;

/// Lifecycle notifications broadcast by the dispatcher.
///
/// Advisory for dashboards and logging; not part of the correctness
/// contract. Delivered on a `tokio::sync::broadcast` channel, so slow
/// subscribers may lag and lose events.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum DispatcherEvent {
    QueueLoaded {
        count: usize,
    },
    Started,
    Paused,
    Resumed,
    Stopped,
    QueueEmpty,
    OutsideCallingHours,
    CallStarted {
        call_sid: String,
        candidate: String,
    },
    CallError {
        candidate: String,
        error: String,
    },
    CallStatusUpdated {
        call_sid: String,
        status: CallStatus,
    },
    CallCompleted {
        call_sid: String,
        outcome: OutcomeKind,
    },
    CallScheduledForRetry {
        call_sid: String,
        candidate: String,
        attempts: u32,
    },
}
