//! Twilio call-control client (REST, form-encoded).

use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use tracing::info;

use super::{CallProvider, CallSummary, PlaceCallOptions, PlacedCall, ProviderError};

const API_BASE: &str = "https://api.twilio.com/2010-04-01";

pub struct TwilioClient {
    http: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

#[derive(Debug, Deserialize)]
struct CallResource {
    sid: String,
    status: String,
    to: String,
    from: String,
    #[serde(default)]
    date_created: Option<String>,
}

impl TwilioClient {
    pub fn new(account_sid: &str, auth_token: &str, from_number: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            from_number: from_number.to_string(),
        }
    }

    fn calls_url(&self) -> String {
        format!("{}/Accounts/{}/Calls.json", API_BASE, self.account_sid)
    }
}

#[async_trait]
impl CallProvider for TwilioClient {
    async fn place_call(
        &self,
        to: &str,
        options: &PlaceCallOptions,
    ) -> Result<PlacedCall, ProviderError> {
        // Detection always runs; the flag picks whether to wait for the
        // voicemail greeting to finish before reporting.
        let machine_detection = if options.detect_answering_machine {
            "DetectMessageEnd"
        } else {
            "Enable"
        };

        let mut params: Vec<(&str, String)> = vec![
            ("To", to.to_string()),
            ("From", self.from_number.clone()),
            ("Url", options.voice_webhook_url.clone()),
            ("StatusCallback", options.status_webhook_url.clone()),
            ("StatusCallbackMethod", "POST".to_string()),
            ("MachineDetection", machine_detection.to_string()),
            ("MachineDetectionTimeout", "30".to_string()),
            ("Timeout", "30".to_string()),
        ];
        for event in ["initiated", "ringing", "answered", "completed"] {
            params.push(("StatusCallbackEvent", event.to_string()));
        }
        if options.async_detection {
            params.push(("AsyncAmd", "true".to_string()));
            if let Some(url) = &options.detection_callback_url {
                params.push(("AsyncAmdStatusCallback", url.clone()));
                params.push(("AsyncAmdStatusCallbackMethod", "POST".to_string()));
            }
        }

        let response = self
            .http
            .post(self.calls_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Rejected { status, body });
        }

        let call: CallResource = response
            .json()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        info!(call_sid = %call.sid, to = %call.to, "Placed outbound call");

        Ok(PlacedCall {
            call_sid: call.sid,
            status: call.status,
            to: call.to,
            from: call.from,
            created_at: call
                .date_created
                .as_deref()
                .and_then(|d| DateTime::parse_from_rfc2822(d).ok())
                .map(|d| d.to_utc()),
        })
    }

    async fn fetch_call(&self, call_sid: &str) -> Result<CallSummary, ProviderError> {
        let url = format!(
            "{}/Accounts/{}/Calls/{}.json",
            API_BASE, self.account_sid, call_sid
        );

        let response = self
            .http
            .get(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Rejected { status, body });
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))
    }
}

/// TwiML that bridges the answered call into the media WebSocket, tagging
/// the stream with the candidate's name as a custom parameter.
pub fn stream_twiml(media_ws_url: &str, candidate_name: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            "<Response>",
            r#"<Say voice="alice">Please hold while we connect you.</Say>"#,
            "<Connect>",
            r#"<Stream url="{url}" name="agent-stream">"#,
            r#"<Parameter name="candidateName" value="{name}"/>"#,
            "</Stream>",
            "</Connect>",
            "</Response>"
        ),
        url = xml_escape(media_ws_url),
        name = xml_escape(candidate_name),
    )
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
