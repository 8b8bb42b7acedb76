//! Wire messages for the two streaming peers.
//!
//! Telephony-side frames are JSON envelopes tagged by `event`; AI-side
//! frames are tagged by `type`. Audio payloads are base64 in both
//! directions. Unknown message kinds deserialize to catch-all variants and
//! are ignored by the bridge.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::dispatcher::SpeakerRole;

// ============================================================================
// Telephony media transport
// ============================================================================

/// Inbound events on the telephony media WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyMessage {
    Connected,
    Start { start: StreamStart },
    Media { media: MediaPayload },
    Stop,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStart {
    pub stream_sid: String,
    pub call_sid: String,
    #[serde(default)]
    pub custom_parameters: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct MediaPayload {
    /// Base64-encoded mu-law audio.
    pub payload: String,
}

/// Outbound media envelope carrying audio back to the telephony peer.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMedia {
    pub event: &'static str,
    pub stream_sid: String,
    pub media: OutboundMediaPayload,
}

#[derive(Debug, Serialize)]
pub struct OutboundMediaPayload {
    pub payload: String,
}

impl OutboundMedia {
    pub fn new(stream_sid: &str, payload_base64: String) -> Self {
        Self {
            event: "media",
            stream_sid: stream_sid.to_string(),
            media: OutboundMediaPayload {
                payload: payload_base64,
            },
        }
    }
}

// ============================================================================
// AI conversation transport
// ============================================================================

/// Inbound events on the AI conversation WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AiMessage {
    Audio {
        /// Base64-encoded PCM16 audio.
        audio: String,
    },
    Transcript {
        role: SpeakerRole,
        text: String,
    },
    Interruption,
    ConversationInitiationMetadata {
        #[serde(default)]
        conversation_id: Option<String>,
    },
    Error {
        #[serde(default)]
        message: String,
    },
    Ping,
    #[serde(other)]
    Other,
}

/// Outbound messages to the AI peer.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AiClientMessage {
    ConversationInitiationClientData {
        conversation_config_override: ConversationOverride,
    },
    Audio {
        audio: String,
    },
    Interrupt,
    End,
    Pong,
}

#[derive(Debug, Serialize)]
pub struct ConversationOverride {
    pub agent: AgentOverride,
}

#[derive(Debug, Serialize)]
pub struct AgentOverride {
    pub prompt: PromptOverride,
    pub first_message: String,
}

#[derive(Debug, Serialize)]
pub struct PromptOverride {
    pub prompt: String,
}

impl AiClientMessage {
    /// Session-initiation message carrying the scripted prompt and opening
    /// line.
    pub fn initiation(prompt: String, first_message: String) -> Self {
        Self::ConversationInitiationClientData {
            conversation_config_override: ConversationOverride {
                agent: AgentOverride {
                    prompt: PromptOverride { prompt },
                    first_message,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn telephony_start_event_deserializes() {
        let json = r#"{
            "event": "start",
            "start": {
                "streamSid": "MZ123",
                "callSid": "CA456",
                "customParameters": {"candidateName": "Ada"}
            }
        }"#;

        let msg: TelephonyMessage = serde_json::from_str(json).unwrap();
        match msg {
            TelephonyMessage::Start { start } => {
                assert_eq!(start.stream_sid, "MZ123");
                assert_eq!(start.call_sid, "CA456");
                assert_eq!(
                    start.custom_parameters.get("candidateName").unwrap(),
                    "Ada"
                );
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn telephony_media_event_deserializes() {
        let json = r#"{"event": "media", "media": {"payload": "AAAA"}}"#;
        let msg: TelephonyMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(
            msg,
            TelephonyMessage::Media { media } if media.payload == "AAAA"
        ));
    }

    #[test]
    fn unknown_telephony_event_is_other() {
        let json = r#"{"event": "mark", "mark": {"name": "x"}}"#;
        let msg: TelephonyMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, TelephonyMessage::Other));
    }

    #[test]
    fn outbound_media_envelope_shape() {
        let envelope = OutboundMedia::new("MZ123", "QUJD".to_string());
        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.contains(r#""event":"media""#));
        assert!(json.contains(r#""streamSid":"MZ123""#));
        assert!(json.contains(r#""payload":"QUJD""#));
    }

    #[test]
    fn ai_transcript_deserializes() {
        let json = r#"{"type": "transcript", "role": "agent", "text": "Hi there"}"#;
        let msg: AiMessage = serde_json::from_str(json).unwrap();
        match msg {
            AiMessage::Transcript { role, text } => {
                assert_eq!(role, SpeakerRole::Agent);
                assert_eq!(text, "Hi there");
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn ai_ping_and_unknown_events() {
        let ping: AiMessage = serde_json::from_str(r#"{"type": "ping"}"#).unwrap();
        assert!(matches!(ping, AiMessage::Ping));

        let unknown: AiMessage =
            serde_json::from_str(r#"{"type": "agent_response_correction"}"#).unwrap();
        assert!(matches!(unknown, AiMessage::Other));
    }

    #[test]
    fn initiation_message_serializes_with_override() {
        let msg = AiClientMessage::initiation("You are...".to_string(), "Hi!".to_string());
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"conversation_initiation_client_data""#));
        assert!(json.contains(r#""first_message":"Hi!""#));
        assert!(json.contains(r#""prompt":{"prompt":"You are...""#));
    }

    #[test]
    fn pong_serializes_flat() {
        let json = serde_json::to_string(&AiClientMessage::Pong).unwrap();
        assert_eq!(json, r#"{"type":"pong"}"#);
    }

    #[test]
    fn interruption_ack_serializes_flat() {
        let ack: AiMessage = serde_json::from_str(r#"{"type": "interruption"}"#).unwrap();
        assert!(matches!(ack, AiMessage::Interruption));

        let json = serde_json::to_string(&AiClientMessage::Interrupt).unwrap();
        assert_eq!(json, r#"{"type":"interrupt"}"#);
    }
}
