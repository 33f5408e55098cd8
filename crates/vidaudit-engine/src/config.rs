use std::env;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-09-2025";
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled after every retryable reply.
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Backoff taken after the `retry`-th retryable reply (zero-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.initial_delay
            .saturating_mul(2u32.saturating_pow(retry))
    }
}

/// Everything the transport needs, resolved once and injected at
/// construction; nothing is read from the environment mid-call.
#[derive(Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub request_timeout: Option<Duration>,
    pub retry: RetryPolicy,
}

impl TransportConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// The credential may legitimately be empty; the hosting environment is
    /// expected to supply it and the service reports a bad key itself.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::new(
            read("GEMINI_API_KEY")
                .or_else(|| read("GOOGLE_API_KEY"))
                .unwrap_or_default(),
        );
        if let Some(api_base) = read("GEMINI_API_BASE") {
            config = config.with_api_base(&api_base);
        }
        if let Some(model) = read("VIDAUDIT_MODEL") {
            config.model = model;
        }
        config.request_timeout = read("VIDAUDIT_REQUEST_TIMEOUT")
            .and_then(|raw| raw.parse::<u64>().ok())
            .map(|secs| Duration::from_secs(secs.clamp(15, 600)));
        config
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        let trimmed = api_base.trim().trim_end_matches('/');
        if !trimmed.is_empty() {
            self.api_base = trimmed.to_string();
        }
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        if !model.trim().is_empty() {
            self.model = model.trim().to_string();
        }
        self
    }

    pub fn endpoint(&self) -> String {
        let trimmed = self.model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }
}

impl fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportConfig")
            .field(
                "api_key",
                &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" },
            )
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("request_timeout", &self.request_timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::{RetryPolicy, TransportConfig, DEFAULT_API_BASE, DEFAULT_MODEL};

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<String, String>>();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = TransportConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config.api_key, "");
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.request_timeout, None);
        assert_eq!(config.retry, RetryPolicy::default());
    }

    #[test]
    fn environment_overrides_are_trimmed() {
        let config = TransportConfig::from_lookup(lookup_from(&[
            ("GEMINI_API_KEY", "  "),
            ("GOOGLE_API_KEY", " google-key "),
            ("GEMINI_API_BASE", "https://proxy.test/v1/"),
            ("VIDAUDIT_MODEL", "gemini-2.5-pro"),
            ("VIDAUDIT_REQUEST_TIMEOUT", "5"),
        ]));
        assert_eq!(config.api_key, "google-key");
        assert_eq!(config.api_base, "https://proxy.test/v1");
        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.request_timeout, Some(Duration::from_secs(15)));
        assert_eq!(
            config.endpoint(),
            "https://proxy.test/v1/models/gemini-2.5-pro:generateContent"
        );
    }

    #[test]
    fn endpoint_keeps_existing_models_prefix() {
        let config = TransportConfig::new("k").with_model("models/gemini-x");
        assert_eq!(
            config.endpoint(),
            format!("{DEFAULT_API_BASE}/models/gemini-x:generateContent")
        );
    }

    #[test]
    fn retry_delays_double() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(8000));
    }

    #[test]
    fn debug_output_redacts_the_credential() {
        let rendered = format!("{:?}", TransportConfig::new("secret-key"));
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("<redacted>"));
    }
}
