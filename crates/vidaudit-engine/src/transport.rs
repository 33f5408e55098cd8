use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client as HttpClient;
use serde_json::Value;
use tracing::{debug, info, warn};
use vidaudit_contracts::analysis::AnalysisRequest;
use vidaudit_contracts::errors::AnalysisError;
use vidaudit_contracts::events::{EventLog, SessionEvent};

use crate::config::TransportConfig;

const CONFIGURATION_FALLBACK_MESSAGE: &str = "API configuration error.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A single POST. Connectivity problems come back as `Err`; any HTTP status,
/// success or not, comes back as `Ok`.
pub trait HttpExchange {
    fn post_json(&self, endpoint: &str, api_key: &str, payload: &Value) -> Result<HttpReply>;
}

pub trait Sleeper {
    fn sleep(&self, delay: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, delay: Duration) {
        thread::sleep(delay);
    }
}

/// Anything that can turn a request into the service's raw reply text.
pub trait AnalysisTransport {
    fn send(&self, request: &AnalysisRequest) -> Result<String, AnalysisError>;
}

pub struct ReqwestExchange {
    http: HttpClient,
}

impl ReqwestExchange {
    pub fn new(request_timeout: Option<Duration>) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(request_timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http })
    }
}

impl HttpExchange for ReqwestExchange {
    fn post_json(&self, endpoint: &str, api_key: &str, payload: &Value) -> Result<HttpReply> {
        let response = self
            .http
            .post(endpoint)
            .query(&[("key", api_key)])
            .json(payload)
            .send()
            .with_context(|| format!("analysis request failed ({endpoint})"))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .context("analysis response body read failed")?;
        Ok(HttpReply { status, body })
    }
}

pub struct RetryingTransport<E = ReqwestExchange, S = ThreadSleeper> {
    config: TransportConfig,
    exchange: E,
    sleeper: S,
    events: Option<EventLog>,
}

impl RetryingTransport {
    pub fn from_config(config: TransportConfig) -> Result<Self> {
        let exchange = ReqwestExchange::new(config.request_timeout)?;
        Ok(Self::with_exchange(config, exchange, ThreadSleeper))
    }
}

impl<E: HttpExchange, S: Sleeper> RetryingTransport<E, S> {
    pub fn with_exchange(config: TransportConfig, exchange: E, sleeper: S) -> Self {
        Self {
            config,
            exchange,
            sleeper,
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventLog) -> Self {
        self.events = Some(events);
        self
    }

    pub fn exchange(&self) -> &E {
        &self.exchange
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    fn note_retry(&self, attempt: u32, reason: &str, delay: Duration) {
        let Some(events) = &self.events else {
            return;
        };
        let event = SessionEvent::TransportRetry {
            attempt,
            reason: reason.to_string(),
            delay_ms: millis(delay),
        };
        if let Err(err) = events.record(event) {
            warn!(error = %err, "failed to record transport retry event");
        }
    }
}

impl<E: HttpExchange, S: Sleeper> AnalysisTransport for RetryingTransport<E, S> {
    fn send(&self, request: &AnalysisRequest) -> Result<String, AnalysisError> {
        let endpoint = self.config.endpoint();
        let payload = request.payload();
        let max_attempts = self.config.retry.max_attempts.max(1);
        let mut retries = 0u32;
        let mut last_status = 0u16;

        for attempt in 1..=max_attempts {
            let is_final = attempt == max_attempts;
            debug!(attempt, max_attempts, model = %self.config.model, "sending analysis request");

            let reply = match self
                .exchange
                .post_json(&endpoint, &self.config.api_key, &payload)
            {
                Ok(reply) => reply,
                Err(err) => {
                    let message = error_chain_text(&err, 400);
                    if is_final {
                        return Err(AnalysisError::Transport(message));
                    }
                    warn!(attempt, error = %message, "transport failure, trying again");
                    self.note_retry(attempt, &message, Duration::ZERO);
                    continue;
                }
            };

            match classify_reply(reply) {
                Ok(body) => {
                    info!(attempt, "analysis request succeeded");
                    return Ok(body);
                }
                Err(AnalysisError::Transient { status }) => {
                    last_status = status;
                    if is_final {
                        break;
                    }
                    let delay = self.config.retry.delay_for(retries);
                    retries += 1;
                    warn!(
                        attempt,
                        status,
                        delay_ms = millis(delay),
                        "service busy, backing off"
                    );
                    self.note_retry(attempt, &format!("status {status}"), delay);
                    self.sleeper.sleep(delay);
                }
                Err(err) => return Err(err),
            }
        }

        Err(AnalysisError::RetriesExhausted {
            attempts: max_attempts,
            status: last_status,
        })
    }
}

fn millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

/// 2xx passes the body through; 429 and 5xx are transient; everything else is
/// a configuration problem that retrying won't fix.
pub fn classify_reply(reply: HttpReply) -> Result<String, AnalysisError> {
    if reply.is_success() {
        return Ok(reply.body);
    }
    if reply.status == 429 || reply.status >= 500 {
        return Err(AnalysisError::Transient {
            status: reply.status,
        });
    }
    Err(AnalysisError::Configuration {
        status: reply.status,
        message: service_error_message(&reply.body)
            .unwrap_or_else(|| CONFIGURATION_FALLBACK_MESSAGE.to_string()),
    })
}

fn service_error_message(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    parsed
        .get("error")
        .and_then(|error| error.get("message"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}

fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() || parts.last().map(String::as_str) == Some(trimmed) {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    if parts.is_empty() {
        return truncate_text(&err.to_string(), max_chars);
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}


#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use vidaudit_contracts::analysis::AnalysisRequest;
    use vidaudit_contracts::errors::AnalysisError;
    use vidaudit_contracts::events::{read_events, EventLog, SessionEvent};

    use super::testing::{envelope, RecordingSleeper, Scripted, ScriptedExchange};
    use super::{classify_reply, error_chain_text, AnalysisTransport, HttpReply, RetryingTransport};
    use crate::config::TransportConfig;

    fn request() -> AnalysisRequest {
        AnalysisRequest::new(Some("https://youtu.be/abc".to_string()), Vec::new(), "directive")
    }

    fn transport(
        script: Vec<Scripted>,
    ) -> RetryingTransport<ScriptedExchange, RecordingSleeper> {
        RetryingTransport::with_exchange(
            TransportConfig::new("test-key"),
            ScriptedExchange::new(script),
            RecordingSleeper::default(),
        )
    }

    fn reply(status: u16, body: &str) -> Scripted {
        Scripted::Reply(status, body.to_string())
    }

    #[test]
    fn rate_limited_twice_then_success_doubles_backoff() {
        let ok_body = envelope("{}");
        let transport = transport(vec![
            reply(429, "{}"),
            reply(429, "{}"),
            reply(200, &ok_body),
        ]);

        let body = transport.send(&request());
        assert_eq!(body, Ok(ok_body));
        assert_eq!(transport.exchange().call_count(), 3);
        assert_eq!(
            *transport.sleeper().delays.borrow(),
            vec![Duration::from_millis(1000), Duration::from_millis(2000)]
        );
    }

    #[test]
    fn forbidden_fails_immediately_with_service_message() {
        let transport = transport(vec![reply(
            403,
            r#"{"error": {"code": 403, "message": "API key not valid. Please pass a valid API key."}}"#,
        )]);

        let err = transport.send(&request());
        assert_eq!(
            err,
            Err(AnalysisError::Configuration {
                status: 403,
                message: "API key not valid. Please pass a valid API key.".to_string(),
            })
        );
        assert_eq!(transport.exchange().call_count(), 1);
        assert!(transport.sleeper().delays.borrow().is_empty());
    }

    #[test]
    fn server_errors_exhaust_all_attempts() {
        let transport = transport(vec![
            reply(500, ""),
            reply(502, ""),
            reply(503, ""),
            reply(500, ""),
            reply(503, ""),
        ]);

        let err = transport.send(&request());
        assert_eq!(
            err,
            Err(AnalysisError::RetriesExhausted {
                attempts: 5,
                status: 503
            })
        );
        assert_eq!(transport.exchange().call_count(), 5);
        let delays = transport.sleeper().delays.borrow().clone();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(1000),
                Duration::from_millis(2000),
                Duration::from_millis(4000),
                Duration::from_millis(8000),
            ]
        );
    }

    #[test]
    fn transport_failures_retry_without_delay_until_the_last_attempt() {
        let ok_body = envelope("{}");
        let recovered = transport(vec![
            Scripted::Fail("connection refused"),
            reply(200, &ok_body),
        ]);
        assert_eq!(recovered.send(&request()), Ok(ok_body));
        assert_eq!(recovered.exchange().call_count(), 2);
        assert!(recovered.sleeper().delays.borrow().is_empty());

        let failing = transport(vec![
            Scripted::Fail("connection refused"),
            Scripted::Fail("connection refused"),
            Scripted::Fail("connection refused"),
            Scripted::Fail("connection refused"),
            Scripted::Fail("dns lookup failed"),
        ]);
        assert_eq!(
            failing.send(&request()),
            Err(AnalysisError::Transport("dns lookup failed".to_string()))
        );
        assert_eq!(failing.exchange().call_count(), 5);
    }

    #[test]
    fn requests_carry_endpoint_credential_and_payload() {
        let transport = transport(vec![reply(200, "{}")]);
        transport.send(&request()).expect("success");

        let calls = transport.exchange().calls.borrow();
        let (endpoint, key, payload) = &calls[0];
        assert_eq!(
            endpoint,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-preview-09-2025:generateContent"
        );
        assert_eq!(key, "test-key");
        assert_eq!(
            payload["generationConfig"]["responseMimeType"],
            json!("application/json")
        );
    }

    #[test]
    fn retries_are_recorded_in_the_event_log() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("events.jsonl");
        let transport = transport(vec![reply(503, ""), reply(200, "{}")])
            .with_events(EventLog::open(&path, "session-1")?);
        transport.send(&request()).expect("second attempt succeeds");

        let events = read_events(&path)?;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].session_id, "session-1");
        assert_eq!(
            events[0].event,
            SessionEvent::TransportRetry {
                attempt: 1,
                reason: "status 503".to_string(),
                delay_ms: 1000,
            }
        );
        Ok(())
    }

    #[test]
    fn classification_covers_status_families() {
        let reply = |status: u16, body: &str| HttpReply {
            status,
            body: body.to_string(),
        };
        assert_eq!(classify_reply(reply(204, "x")), Ok("x".to_string()));
        assert_eq!(
            classify_reply(reply(429, "")),
            Err(AnalysisError::Transient { status: 429 })
        );
        assert_eq!(
            classify_reply(reply(599, "")),
            Err(AnalysisError::Transient { status: 599 })
        );
        assert_eq!(
            classify_reply(reply(400, "<html>bad request</html>")),
            Err(AnalysisError::Configuration {
                status: 400,
                message: "API configuration error.".to_string(),
            })
        );
    }

    #[test]
    fn error_chain_text_preserves_nested_contexts() {
        let err = anyhow::anyhow!("socket closed")
            .context("analysis request failed (https://example.test)");
        let rendered = error_chain_text(&err, 400);
        assert!(rendered.contains("analysis request failed"));
        assert!(rendered.contains("socket closed"));
        assert!(error_chain_text(&err, 10).ends_with('…'));
    }
}
