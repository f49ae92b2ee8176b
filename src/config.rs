use serde::{Deserialize, Serialize};

/// Complete configuration for the gym server and the rollout client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GymConfig {
    pub server: ServerConfig,
    pub agent: AgentConfig,
    pub tools: ToolConfig,
    pub rollout: RolloutConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (default: "0.0.0.0").
    pub host: String,
    /// Port to bind to (default: 12000).
    pub port: u16,
    /// Upper bound on tasks running at the same time (default: 32).
    pub max_concurrent_tasks: usize,
}

/// Agent loop limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Default turn budget when a request does not carry one (default: 16).
    pub max_turns: usize,
    /// Default tool call budget when a request does not carry one (default: 20).
    pub max_tool_calls: usize,
    /// Wall-clock budget for a whole task in seconds (default: 600).
    pub timeout_secs: u64,
    /// Timeout for a single model query in seconds (default: 120).
    pub model_timeout_secs: u64,
}

/// Tool executor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Timeout for shell commands in seconds (default: 120).
    pub command_timeout_secs: u64,
    /// Outputs longer than this many characters are truncated (default: 30000).
    pub max_output_length: usize,
    /// Timeout for web requests in seconds (default: 30).
    pub web_timeout_secs: u64,
    /// SerpAPI endpoint used by `web_search`.
    pub search_endpoint: String,
    /// SerpAPI key; filled from `SEARCH_API_KEY` when empty.
    pub search_api_key: String,
}

/// Rollout client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RolloutConfig {
    /// Base URL of the gym server (default: "http://localhost:12000").
    pub gym_url: String,
    /// Base URL of the inference router the gym should query.
    pub sglang_url: String,
    /// Samples generated per task record (default: 4).
    pub n_samples_per_prompt: usize,
    /// Maximum gym requests in flight (default: 8).
    pub concurrency: usize,
    /// Turn budget forwarded to the gym (default: 16).
    pub max_turns: usize,
    /// Tool call budget forwarded to the gym (default: 20).
    pub max_tool_calls: usize,
    /// Sampling temperature (default: 1.0).
    pub temperature: f64,
    /// Nucleus sampling threshold (default: 1.0).
    pub top_p: f64,
    /// Generation length limit per model query (default: 1024).
    pub max_new_tokens: usize,
    /// Timeout for one gym request in seconds (default: 900).
    pub request_timeout_secs: u64,
}

impl RolloutConfig {
    /// Sampling parameters in the shape the inference server expects.
    pub fn sampling_params(&self) -> serde_json::Value {
        serde_json::json!({
            "temperature": self.temperature,
            "top_p": self.top_p,
            "max_new_tokens": self.max_new_tokens,
        })
    }
}

impl GymConfig {
    /// Fill unset secrets and endpoints from environment variables.
    pub fn apply_env(&mut self) {
        if self.tools.search_api_key.is_empty() {
            if let Ok(key) = std::env::var("SEARCH_API_KEY") {
                self.tools.search_api_key = key;
            }
        }
        if let Ok(url) = std::env::var("CLAUDE_CODE_GYM_URL") {
            if !url.is_empty() {
                self.rollout.gym_url = url;
            }
        }
    }
}

impl Default for GymConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            agent: AgentConfig::default(),
            tools: ToolConfig::default(),
            rollout: RolloutConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 12000,
            max_concurrent_tasks: 32,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: 16,
            max_tool_calls: 20,
            timeout_secs: 600,
            model_timeout_secs: 120,
        }
    }
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: 120,
            max_output_length: 30_000,
            web_timeout_secs: 30,
            search_endpoint: "https://serpapi.com/search".into(),
            search_api_key: String::new(),
        }
    }
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            gym_url: "http://localhost:12000".into(),
            sglang_url: "http://127.0.0.1:30000".into(),
            n_samples_per_prompt: 4,
            concurrency: 8,
            max_turns: 16,
            max_tool_calls: 20,
            temperature: 1.0,
            top_p: 1.0,
            max_new_tokens: 1024,
            request_timeout_secs: 900,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: GymConfig =
            serde_json::from_str(r#"{"server": {"port": 13000}, "agent": {"max_turns": 4}}"#)
                .unwrap();
        assert_eq!(config.server.port, 13000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.agent.max_turns, 4);
        assert_eq!(config.agent.max_tool_calls, 20);
        assert_eq!(config.tools.max_output_length, 30_000);
    }

    #[test]
    fn test_sampling_params_shape() {
        let params = RolloutConfig::default().sampling_params();
        assert_eq!(params["max_new_tokens"], 1024);
        assert_eq!(params["temperature"], 1.0);
    }
}
