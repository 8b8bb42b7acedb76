use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::ws::{Message as TelephonyWsMessage, WebSocket};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures::stream::{SplitSink, StreamExt};
use futures::SinkExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message as AiWsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::messages::{AiClientMessage, AiMessage, OutboundMedia, TelephonyMessage};
use super::prompt::{build_first_message, build_prompt, CallContext};
use crate::audio;
use crate::config::AiConfig;
use crate::dispatcher::CallDispatcher;

type AiSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type AiSink = SplitSink<AiSocket, AiWsMessage>;
type TelephonySink = SplitSink<WebSocket, TelephonyWsMessage>;

/// Relays audio between one telephony media stream and one AI conversation
/// session.
///
/// One instance per active call, owning both peer connections for the
/// call's lifetime. Inbound telephony frames are upsampled to the AI
/// format; AI audio comes back down to mu-law. Frames for a peer that is
/// not ready (no stream id yet, or already closed) are silently dropped,
/// matching full-duplex audio semantics.
pub struct StreamBridge {
    /// Log-correlation id; the call sid is unknown until the start frame.
    session_id: String,
    dispatcher: Arc<CallDispatcher>,
    ai_config: AiConfig,
    context: CallContext,
    stream_sid: Option<String>,
    call_sid: Option<String>,
    ai_ready: bool,
    closed: bool,
}

impl StreamBridge {
    pub fn new(dispatcher: Arc<CallDispatcher>, ai_config: AiConfig, context: CallContext) -> Self {
        Self {
            session_id: format!("bridge-{}", uuid::Uuid::new_v4()),
            dispatcher,
            ai_config,
            context,
            stream_sid: None,
            call_sid: None,
            ai_ready: false,
            closed: false,
        }
    }

    /// Drive the bridge until either peer terminates the session.
    pub async fn run(mut self, telephony: WebSocket) {
        if let Err(e) = self.run_inner(telephony).await {
            warn!("Stream bridge ended with error: {:#}", e);
        }
    }

    async fn run_inner(&mut self, telephony: WebSocket) -> Result<()> {
        // Dial the AI side immediately; the telephony start event may not
        // have arrived yet.
        let mut request = self
            .ai_config
            .conversation_url()
            .into_client_request()
            .context("Invalid AI conversation URL")?;
        request.headers_mut().insert(
            "xi-api-key",
            HeaderValue::from_str(&self.ai_config.api_key).context("Invalid AI API key")?,
        );

        let (ai_socket, _) = tokio_tungstenite::connect_async(request)
            .await
            .context("Failed to connect to AI conversation transport")?;
        info!(session_id = %self.session_id, "Connected to AI conversation transport");
        self.ai_ready = true;

        let (mut ai_tx, mut ai_rx) = ai_socket.split();
        let (mut telephony_tx, mut telephony_rx) = telephony.split();

        // Session initiation with the scripted prompt and opening line.
        let init = AiClientMessage::initiation(
            build_prompt(&self.context),
            build_first_message(&self.context),
        );
        send_ai(&mut ai_tx, &init).await?;

        loop {
            tokio::select! {
                message = telephony_rx.next() => match message {
                    Some(Ok(TelephonyWsMessage::Text(text))) => {
                        if self.handle_telephony_text(&text, &mut ai_tx).await {
                            break;
                        }
                    }
                    Some(Ok(TelephonyWsMessage::Close(_))) | None => {
                        info!("Telephony connection closed");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("Telephony socket error: {}", e);
                        break;
                    }
                },
                message = ai_rx.next(), if self.ai_ready => match message {
                    Some(Ok(AiWsMessage::Text(text))) => {
                        self.handle_ai_text(&text, &mut ai_tx, &mut telephony_tx).await;
                    }
                    Some(Ok(AiWsMessage::Close(_))) | None => {
                        info!("AI connection closed");
                        self.ai_ready = false;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("AI socket error: {}", e);
                        self.ai_ready = false;
                    }
                },
            }
        }

        self.cleanup(&mut ai_tx).await;
        Ok(())
    }

    /// Handle one telephony text frame. Returns true when the stream is
    /// over.
    async fn handle_telephony_text(&mut self, text: &str, ai_tx: &mut AiSink) -> bool {
        let message: TelephonyMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping malformed telephony message: {}", e);
                return false;
            }
        };

        match message {
            TelephonyMessage::Connected => {
                debug!("Telephony media stream connected");
            }
            TelephonyMessage::Start { start } => {
                info!(
                    session_id = %self.session_id,
                    stream_sid = %start.stream_sid,
                    call_sid = %start.call_sid,
                    "Media stream started"
                );
                if let Some(name) = start.custom_parameters.get("candidateName") {
                    self.context.candidate_name = name.clone();
                }
                self.stream_sid = Some(start.stream_sid);
                self.call_sid = Some(start.call_sid);
            }
            TelephonyMessage::Media { media } => {
                if !self.ai_ready {
                    return false;
                }
                let mulaw = match BASE64.decode(&media.payload) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!("Dropping undecodable media payload: {}", e);
                        return false;
                    }
                };
                let wideband = audio::telephony_to_wideband(&mulaw);
                let payload = BASE64.encode(audio::samples_to_pcm_bytes(&wideband));
                if send_ai(ai_tx, &AiClientMessage::Audio { audio: payload })
                    .await
                    .is_err()
                {
                    self.ai_ready = false;
                }
            }
            TelephonyMessage::Stop => {
                info!("Media stream stopped");
                return true;
            }
            TelephonyMessage::Other => {}
        }

        false
    }

    /// Handle one AI text frame.
    async fn handle_ai_text(
        &mut self,
        text: &str,
        ai_tx: &mut AiSink,
        telephony_tx: &mut TelephonySink,
    ) {
        let message: AiMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping malformed AI message: {}", e);
                return;
            }
        };

        match message {
            AiMessage::Audio { audio: payload } => {
                // Dropped until the telephony peer has reported a stream id.
                let Some(stream_sid) = self.stream_sid.clone() else {
                    return;
                };
                let pcm_bytes = match BASE64.decode(&payload) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!("Dropping undecodable AI audio payload: {}", e);
                        return;
                    }
                };
                let samples = audio::pcm_bytes_to_samples(&pcm_bytes);
                let mulaw = audio::wideband_to_telephony(&samples);
                let envelope = OutboundMedia::new(&stream_sid, BASE64.encode(mulaw));
                let Ok(json) = serde_json::to_string(&envelope) else {
                    return;
                };
                if telephony_tx
                    .send(TelephonyWsMessage::Text(json))
                    .await
                    .is_err()
                {
                    debug!("Telephony peer gone, dropping outbound frame");
                }
            }
            AiMessage::Transcript { role, text } => {
                info!("[{:?}] {}", role, text);
                if let Some(call_sid) = &self.call_sid {
                    self.dispatcher.add_transcript(call_sid, role, &text).await;
                }
            }
            AiMessage::Interruption => {
                // Acknowledge so the agent stops streaming the cut-off reply.
                debug!("Caller interrupted the agent");
                if send_ai(ai_tx, &AiClientMessage::Interrupt).await.is_err() {
                    self.ai_ready = false;
                }
            }
            AiMessage::ConversationInitiationMetadata { conversation_id } => {
                info!(?conversation_id, "Conversation initialized");
            }
            AiMessage::Error { message } => {
                warn!("AI conversation error: {}", message);
            }
            AiMessage::Ping => {
                if send_ai(ai_tx, &AiClientMessage::Pong).await.is_err() {
                    self.ai_ready = false;
                }
            }
            AiMessage::Other => {}
        }
    }

    /// Signal end-of-session to the AI peer and close it. Safe to invoke
    /// twice; both peers closing near-simultaneously must not raise.
    async fn cleanup(&mut self, ai_tx: &mut AiSink) {
        if self.closed {
            return;
        }
        self.closed = true;

        if self.ai_ready {
            let _ = send_ai(ai_tx, &AiClientMessage::End).await;
            let _ = ai_tx.send(AiWsMessage::Close(None)).await;
            self.ai_ready = false;
        }
    }
}

async fn send_ai(ai_tx: &mut AiSink, message: &AiClientMessage) -> Result<()> {
    let json = serde_json::to_string(message)?;
    ai_tx.send(AiWsMessage::Text(json)).await?;
    Ok(())
}
