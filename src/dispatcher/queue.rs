use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Timelike, Utc};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex, Notify};
use tracing::{error, info, warn};

use super::events::DispatcherEvent;
use super::outcome::{classify, OutcomeKind};
use super::types::{
    ActiveCallSummary, CallSession, CallStatus, CallingHours, Candidate, QueueStatus, RunState,
    SpeakerRole, TranscriptEntry,
};
use crate::config::Config;
use crate::providers::{
    CallProvider, CandidateStore, PlaceCallOptions, ProviderError, StatusUpdate, StoreError,
};

/// Re-check interval while outside the allowed-hours window.
const OUTSIDE_HOURS_RECHECK: Duration = Duration::from_secs(60);

/// Re-check interval while at the concurrency cap.
const CAPACITY_RECHECK: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("queue is already running")]
    AlreadyRunning,
    #[error("queue is not running")]
    NotRunning,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Scheduling policy for the dispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub calling_hours_start: u32,
    pub calling_hours_end: u32,
    pub max_retry_attempts: u32,
    pub concurrent_calls: usize,
    pub call_delay: Duration,
    pub voice_webhook_url: String,
    pub status_webhook_url: String,
    pub amd_webhook_url: String,
}

impl DispatcherConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            calling_hours_start: config.compliance.calling_hours_start,
            calling_hours_end: config.compliance.calling_hours_end,
            max_retry_attempts: config.compliance.max_retry_attempts,
            concurrent_calls: config.queue.concurrent_calls,
            call_delay: Duration::from_secs(config.queue.call_delay_secs),
            voice_webhook_url: config.voice_webhook_url(),
            status_webhook_url: config.status_webhook_url(),
            amd_webhook_url: config.amd_webhook_url(),
        }
    }
}

/// Extra fields carried on a provider status callback.
#[derive(Debug, Clone, Default)]
pub struct StatusDetails {
    pub answered_by: Option<String>,
    pub duration_secs: Option<u32>,
}

struct QueueState {
    pending: VecDeque<Candidate>,
    active: HashMap<String, CallSession>,
    completed: Vec<CallSession>,
    run_state: RunState,
}

impl Default for QueueState {
    fn default() -> Self {
        Self {
            pending: VecDeque::new(),
            active: HashMap::new(),
            completed: Vec::new(),
            run_state: RunState::Stopped,
        }
    }
}

/// The call-lifecycle scheduler.
///
/// Holds the pending queue, the map of in-flight calls, and the completed
/// log. One instance per process, shared by handle; all state lives behind
/// a single mutex so the loop and the public operations act as one logical
/// owner. A candidate is in at most one of {pending, active} at any time.
pub struct CallDispatcher {
    provider: Arc<dyn CallProvider>,
    store: Arc<dyn CandidateStore>,
    config: DispatcherConfig,
    state: Mutex<QueueState>,
    events: broadcast::Sender<DispatcherEvent>,
    // Wakes the loop out of a pause wait on resume/stop.
    wake: Notify,
}

impl CallDispatcher {
    pub fn new(
        provider: Arc<dyn CallProvider>,
        store: Arc<dyn CandidateStore>,
        config: DispatcherConfig,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            provider,
            store,
            config,
            state: Mutex::new(QueueState::default()),
            events,
            wake: Notify::new(),
        })
    }

    /// Subscribe to lifecycle notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<DispatcherEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: DispatcherEvent) {
        let _ = self.events.send(event);
    }

    /// Replace the pending queue with store candidates still under the
    /// attempt budget. The queue is left untouched if the store fails.
    pub async fn load_pending(&self) -> Result<usize, DispatchError> {
        let candidates = self.store.list_pending().await?;

        let eligible: VecDeque<Candidate> = candidates
            .into_iter()
            .filter(|c| c.attempts < self.config.max_retry_attempts)
            .collect();
        let count = eligible.len();

        let mut state = self.state.lock().await;
        state.pending = eligible;
        drop(state);

        info!(count, "Queue loaded");
        self.emit(DispatcherEvent::QueueLoaded { count });
        Ok(count)
    }

    /// Begin processing. Returns immediately; the loop runs as its own
    /// task until stopped or the queue drains.
    pub async fn start(self: &Arc<Self>) -> Result<(), DispatchError> {
        {
            let mut state = self.state.lock().await;
            if state.run_state != RunState::Stopped {
                return Err(DispatchError::AlreadyRunning);
            }
            state.run_state = RunState::Running;
        }

        self.emit(DispatcherEvent::Started);

        let dispatcher = Arc::clone(self);
        tokio::spawn(async move { dispatcher.run_loop().await });

        Ok(())
    }

    /// Stop dequeuing new candidates; active calls run to completion.
    pub async fn pause(&self) {
        let mut state = self.state.lock().await;
        if state.run_state == RunState::Running {
            state.run_state = RunState::Paused;
            drop(state);
            self.emit(DispatcherEvent::Paused);
        }
    }

    /// Resume a paused queue.
    pub async fn resume(&self) -> Result<(), DispatchError> {
        let mut state = self.state.lock().await;
        match state.run_state {
            RunState::Paused => {
                state.run_state = RunState::Running;
                drop(state);
                self.emit(DispatcherEvent::Resumed);
                self.wake.notify_one();
                Ok(())
            }
            RunState::Running => Ok(()),
            RunState::Stopped => Err(DispatchError::NotRunning),
        }
    }

    /// Stop the queue. The loop observes this on its next iteration;
    /// in-flight calls still finish via status callbacks.
    pub async fn stop(&self) {
        {
            let mut state = self.state.lock().await;
            state.run_state = RunState::Stopped;
        }
        self.emit(DispatcherEvent::Stopped);
        self.wake.notify_one();
    }

    /// Snapshot of queue, active calls, and the calling-hours window.
    pub async fn status(&self) -> QueueStatus {
        let state = self.state.lock().await;
        QueueStatus {
            run_state: state.run_state,
            queue_size: state.pending.len(),
            active_calls: state.active.len(),
            completed_calls: state.completed.len(),
            active_call_details: state
                .active
                .values()
                .map(|s| ActiveCallSummary {
                    call_sid: s.call_sid.clone(),
                    candidate_name: s.candidate.name.clone(),
                    status: s.status,
                    started_at: s.started_at,
                })
                .collect(),
            is_within_calling_hours: self.is_within_calling_hours(),
            calling_hours: CallingHours {
                start: self.config.calling_hours_start,
                end: self.config.calling_hours_end,
            },
        }
    }

    /// Look up a call in the active map, falling back to the completed log.
    pub async fn get_call(&self, call_sid: &str) -> Option<CallSession> {
        let state = self.state.lock().await;
        state
            .active
            .get(call_sid)
            .cloned()
            .or_else(|| state.completed.iter().rev().find(|s| s.call_sid == call_sid).cloned())
    }

    /// Ask the telephony provider for a call the dispatcher never tracked
    /// (e.g. one placed manually outside the queue).
    pub async fn fetch_remote_call(
        &self,
        call_sid: &str,
    ) -> Result<crate::providers::CallSummary, ProviderError> {
        self.provider.fetch_call(call_sid).await
    }

    /// Append a transcript line to an active call (bridge hand-off path).
    pub async fn add_transcript(&self, call_sid: &str, role: SpeakerRole, text: &str) {
        let mut state = self.state.lock().await;
        if let Some(session) = state.active.get_mut(call_sid) {
            session.transcript.push(TranscriptEntry::new(role, text));
        }
    }

    /// Record the machine-detection result for an active call.
    pub async fn set_answered_by(&self, call_sid: &str, answered_by: &str) {
        let mut state = self.state.lock().await;
        if let Some(session) = state.active.get_mut(call_sid) {
            session.answered_by = Some(answered_by.to_string());
        }
    }

    /// Apply a provider status callback.
    ///
    /// Idempotent: callbacks for unknown or already-completed sessions are
    /// ignored. A terminal status classifies the outcome, persists it,
    /// moves the session to the completed log, and re-enqueues the
    /// candidate when the outcome is retry-eligible and the attempt budget
    /// allows.
    pub async fn handle_provider_status(
        &self,
        call_sid: &str,
        status: CallStatus,
        details: StatusDetails,
    ) {
        let mut state = self.state.lock().await;

        {
            let Some(session) = state.active.get_mut(call_sid) else {
                // Callbacks can race sessions we never tracked (e.g. a
                // manually placed test call).
                return;
            };
            session.status = status;
            if let Some(answered_by) = details.answered_by {
                session.answered_by = Some(answered_by);
            }
            if let Some(duration) = details.duration_secs {
                session.duration_secs = Some(duration);
            }
        }

        self.emit(DispatcherEvent::CallStatusUpdated {
            call_sid: call_sid.to_string(),
            status,
        });

        if !status.is_terminal() {
            return;
        }

        let Some(mut session) = state.active.remove(call_sid) else {
            return;
        };
        session.ended_at = Some(Utc::now());

        let outcome = classify(status, session.answered_by.as_deref(), &session.transcript);
        session.outcome = Some(outcome);

        let should_retry =
            outcome.retry_eligible && session.candidate.attempts < self.config.max_retry_attempts;
        if should_retry {
            state.pending.push_back(session.candidate.clone());
        }

        let update = StatusUpdate {
            status: status_label(outcome.kind).to_string(),
            outcome: outcome.kind.label().to_string(),
            last_called_at: session.ended_at.unwrap_or_else(Utc::now),
            attempts: session.attempts,
        };
        let row = session.candidate.row;
        let candidate_name = session.candidate.name.clone();
        let attempts = session.attempts;

        info!(
            call_sid,
            outcome = outcome.kind.label(),
            retry = should_retry,
            "Call completed"
        );
        state.completed.push(session);
        drop(state);

        if let Err(e) = self.store.update_status(row, &update).await {
            error!(call_sid, "Failed to persist call outcome: {}", e);
        }

        self.emit(DispatcherEvent::CallCompleted {
            call_sid: call_sid.to_string(),
            outcome: outcome.kind,
        });
        if should_retry {
            self.emit(DispatcherEvent::CallScheduledForRetry {
                call_sid: call_sid.to_string(),
                candidate: candidate_name,
                attempts,
            });
        }
    }

    pub fn is_within_calling_hours(&self) -> bool {
        within_hours(
            chrono::Local::now().hour(),
            self.config.calling_hours_start,
            self.config.calling_hours_end,
        )
    }

    async fn run_loop(self: Arc<Self>) {
        info!("Dispatcher loop started");

        loop {
            {
                let state = self.state.lock().await;
                match state.run_state {
                    RunState::Stopped => break,
                    RunState::Paused => {
                        drop(state);
                        self.wake.notified().await;
                        continue;
                    }
                    RunState::Running => {}
                }
            }

            if !self.is_within_calling_hours() {
                info!("Outside calling hours, waiting");
                self.emit(DispatcherEvent::OutsideCallingHours);
                tokio::time::sleep(OUTSIDE_HOURS_RECHECK).await;
                continue;
            }

            let at_capacity = {
                let state = self.state.lock().await;
                state.active.len() >= self.config.concurrent_calls
            };
            if at_capacity {
                tokio::time::sleep(CAPACITY_RECHECK).await;
                continue;
            }

            let candidate = {
                let mut state = self.state.lock().await;
                match state.pending.pop_front() {
                    Some(candidate) => candidate,
                    None => {
                        info!("Queue empty");
                        state.run_state = RunState::Stopped;
                        drop(state);
                        self.emit(DispatcherEvent::QueueEmpty);
                        break;
                    }
                }
            };

            if let Err(e) = self.place_call(&candidate).await {
                warn!(candidate = %candidate.name, "Call error: {}", e);
                self.emit(DispatcherEvent::CallError {
                    candidate: candidate.name.clone(),
                    error: e.to_string(),
                });
            }

            tokio::time::sleep(self.config.call_delay).await;
        }

        info!("Dispatcher loop exited");
    }

    async fn place_call(&self, candidate: &Candidate) -> Result<(), DispatchError> {
        if candidate.phone.is_empty() {
            warn!(candidate = %candidate.name, "Skipping candidate with no phone number");
            return Ok(());
        }

        info!(candidate = %candidate.name, phone = %candidate.phone, "Placing call");

        let options = PlaceCallOptions {
            voice_webhook_url: self.config.voice_webhook_url.clone(),
            status_webhook_url: self.config.status_webhook_url.clone(),
            detect_answering_machine: true,
            async_detection: true,
            detection_callback_url: Some(self.config.amd_webhook_url.clone()),
        };

        let placed = self.provider.place_call(&candidate.phone, &options).await?;

        let mut tracked = candidate.clone();
        tracked.attempts += 1;

        let session = CallSession {
            call_sid: placed.call_sid.clone(),
            attempts: tracked.attempts,
            status: CallStatus::parse(&placed.status).unwrap_or(CallStatus::Queued),
            candidate: tracked,
            started_at: Utc::now(),
            ended_at: None,
            answered_by: None,
            duration_secs: None,
            transcript: Vec::new(),
            outcome: None,
        };
        let candidate_name = session.candidate.name.clone();

        {
            let mut state = self.state.lock().await;
            state.active.insert(placed.call_sid.clone(), session);
        }

        self.emit(DispatcherEvent::CallStarted {
            call_sid: placed.call_sid,
            candidate: candidate_name,
        });

        Ok(())
    }
}

/// Whether `hour` falls inside the `[start, end)` daily window.
fn within_hours(hour: u32, start: u32, end: u32) -> bool {
    hour >= start && hour < end
}

fn status_label(kind: OutcomeKind) -> &'static str {
    // The store's status column groups all conversation outcomes under
    // "Completed"; the outcome column keeps the specific tag.
    match kind {
        OutcomeKind::Interested
        | OutcomeKind::NotInterested
        | OutcomeKind::CallbackRequested
        | OutcomeKind::Completed => "Completed",
        other => other.label(),
    }
}
