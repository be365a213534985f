//! Explicit configuration objects passed into pipeline constructors.
//!
//! Nothing here is global: every pipeline run receives its configuration by
//! value, so two runs with different settings can coexist in one process.

use std::time::Duration;

/// Settings for the chat-completions collaborator.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub temperature: f64,
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "meta-llama/llama-4-scout-17b-16e-instruct".to_string(),
            temperature: 0.3,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Reads `GROQ_API_KEY` from the environment. Convenience for binaries;
    /// libraries should construct the config explicitly.
    pub fn from_env() -> Option<Self> {
        std::env::var("GROQ_API_KEY").ok().map(Self::new)
    }
}

/// Batch-runner pacing: sleep `delay` after every `interval` pipelines to
/// stay under the LLM service's rate limit. Not a correctness mechanism.
#[derive(Debug, Clone, Copy)]
pub struct BatchPacing {
    pub delay: Duration,
    pub interval: usize,
}

impl Default for BatchPacing {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(30),
            interval: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_config_builder() {
        let config = LlmConfig::new("key").with_model("llama-3.3-70b-versatile");
        assert_eq!(config.api_key, "key");
        assert_eq!(config.model, "llama-3.3-70b-versatile");
        assert_eq!(config.temperature, 0.3);
    }

    #[test]
    fn test_default_pacing() {
        let pacing = BatchPacing::default();
        assert_eq!(pacing.delay, Duration::from_secs(30));
        assert_eq!(pacing.interval, 2);
    }
}
