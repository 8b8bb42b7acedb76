use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub twilio: TwilioConfig,
    pub ai: AiConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub compliance: ComplianceConfig,
    #[serde(default)]
    pub queue: QueueConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Externally reachable base URL for provider webhooks.
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    pub api_key: String,
    pub agent_id: String,
    #[serde(default = "default_ai_ws_url")]
    pub ws_url: String,
}

impl AiConfig {
    /// Full conversation WebSocket URL for this agent.
    pub fn conversation_url(&self) -> String {
        format!("{}?agent_id={}", self.ws_url, self.agent_id)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentConfig {
    /// Persona name the agent introduces itself with.
    #[serde(default)]
    pub agent_name: String,
    #[serde(default)]
    pub company_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComplianceConfig {
    #[serde(default = "default_hours_start")]
    pub calling_hours_start: u32,
    #[serde(default = "default_hours_end")]
    pub calling_hours_end: u32,
    #[serde(default = "default_max_attempts")]
    pub max_retry_attempts: u32,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            calling_hours_start: default_hours_start(),
            calling_hours_end: default_hours_end(),
            max_retry_attempts: default_max_attempts(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_concurrent_calls")]
    pub concurrent_calls: usize,
    /// Delay between consecutive outbound calls, in seconds.
    #[serde(default = "default_call_delay_secs")]
    pub call_delay_secs: u64,
    #[serde(default = "default_store_path")]
    pub store_path: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrent_calls: default_concurrent_calls(),
            call_delay_secs: default_call_delay_secs(),
            store_path: default_store_path(),
        }
    }
}

fn default_ai_ws_url() -> String {
    "wss://api.elevenlabs.io/v1/convai/conversation".to_string()
}

fn default_hours_start() -> u32 {
    8
}

fn default_hours_end() -> u32 {
    21
}

fn default_max_attempts() -> u32 {
    3
}

fn default_concurrent_calls() -> usize {
    1
}

fn default_call_delay_secs() -> u64 {
    5
}

fn default_store_path() -> String {
    "data/candidates.json".to_string()
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("OUTDIAL").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn voice_webhook_url(&self) -> String {
        format!("{}/api/webhooks/twilio/voice", self.server.base_url)
    }

    pub fn status_webhook_url(&self) -> String {
        format!("{}/api/webhooks/twilio/status", self.server.base_url)
    }

    pub fn amd_webhook_url(&self) -> String {
        format!("{}/api/webhooks/twilio/amd", self.server.base_url)
    }

    /// Media stream URL for call instructions, derived from the base URL
    /// with the matching WebSocket scheme.
    pub fn media_ws_url(&self) -> String {
        let ws_base = if let Some(rest) = self.server.base_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.server.base_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            self.server.base_url.clone()
        };
        format!("{}/api/webhooks/twilio/media", ws_base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                base_url: "https://dialer.example.com".to_string(),
            },
            twilio: TwilioConfig {
                account_sid: "AC1".to_string(),
                auth_token: "tok".to_string(),
                phone_number: "+15550000".to_string(),
            },
            ai: AiConfig {
                api_key: "key".to_string(),
                agent_id: "agent1".to_string(),
                ws_url: default_ai_ws_url(),
            },
            agent: AgentConfig::default(),
            compliance: ComplianceConfig::default(),
            queue: QueueConfig::default(),
        }
    }

    #[test]
    fn webhook_urls_derive_from_base() {
        let cfg = test_config();
        assert_eq!(
            cfg.status_webhook_url(),
            "https://dialer.example.com/api/webhooks/twilio/status"
        );
        assert_eq!(
            cfg.media_ws_url(),
            "wss://dialer.example.com/api/webhooks/twilio/media"
        );
        assert!(cfg.ai.conversation_url().ends_with("?agent_id=agent1"));
    }

    #[test]
    fn compliance_defaults_match_policy() {
        let compliance = ComplianceConfig::default();
        assert_eq!(compliance.calling_hours_start, 8);
        assert_eq!(compliance.calling_hours_end, 21);
        assert_eq!(compliance.max_retry_attempts, 3);
    }
}
