//! Call-lifecycle scheduling
//!
//! This module provides the `CallDispatcher`, the stateful scheduler that:
//! - Holds the pending candidate queue and the in-flight call map
//! - Enforces the calling-hours window and the concurrency cap
//! - Places outbound calls through the telephony collaborator
//! - Consumes provider status callbacks and classifies call outcomes
//! - Re-enqueues retry-eligible candidates under the attempt budget

mod events;
mod outcome;
mod queue;
mod types;

pub use events::DispatcherEvent;
pub use outcome::{classify, Outcome, OutcomeKind};
pub use queue::{CallDispatcher, DispatchError, DispatcherConfig, StatusDetails};
pub use types::{
    ActiveCallSummary, CallSession, CallStatus, CallingHours, Candidate, QueueStatus, RunState,
    SpeakerRole, TranscriptEntry,
};
