pub mod audio;
pub mod bridge;
pub mod config;
pub mod dispatcher;
pub mod http;
pub mod providers;

pub use bridge::{CallContext, StreamBridge};
pub use config::Config;
pub use dispatcher::{
    CallDispatcher, CallSession, CallStatus, Candidate, DispatchError, DispatcherConfig,
    DispatcherEvent, Outcome, OutcomeKind, QueueStatus, RunState, SpeakerRole, StatusDetails,
    TranscriptEntry,
};
pub use http::{create_router, AppState};
pub use providers::{
    CallProvider, CandidateStore, JsonFileStore, PlaceCallOptions, PlacedCall, ProviderError,
    StatusUpdate, StoreError, TwilioClient,
};
