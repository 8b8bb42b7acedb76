//! Real-time audio relay between the telephony media stream and the AI
//! conversation transport
//!
//! One `StreamBridge` per active call: it owns both WebSocket peers,
//! transcodes audio in each direction, and hands transcript lines off to
//! the dispatcher for outcome classification.

pub mod messages;
mod prompt;
mod session;

pub use prompt::{build_first_message, build_prompt, CallContext};
pub use session::StreamBridge;
