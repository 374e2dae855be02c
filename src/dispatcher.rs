use crate::config::{PollConfig, TelegramConfig};
use crate::error::TransportError;
use crate::models::OwnerId;
use async_trait::async_trait;
use log::{error, info, warn};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Messaging transport seam. One call is one delivery attempt; retry
/// policy lives in [`Dispatcher`], not in implementations.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_message(&self, recipient: OwnerId, text: &str) -> Result<(), TransportError>;
}

/// Telegram Bot API transport. Sends HTML-formatted messages with link
/// previews disabled (notifications carry two explorer links each).
pub struct TelegramTransport {
    client: Client,
    api_base: String,
    bot_token: String,
    disable_link_preview: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

impl TelegramTransport {
    pub fn from_config(config: &TelegramConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            bot_token: config.bot_token.clone(),
            disable_link_preview: config.disable_link_preview,
        })
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_message(&self, recipient: OwnerId, text: &str) -> Result<(), TransportError> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "chat_id": recipient,
                "text": text,
                "parse_mode": "HTML",
                "disable_web_page_preview": self.disable_link_preview,
            }))
            .send()
            .await?;

        let status = response.status().as_u16();
        let body: ApiResponse = response.json().await?;

        if body.ok {
            return Ok(());
        }

        if status == 429 || body.error_code == Some(429) {
            let retry_after = body.parameters.and_then(|p| p.retry_after);
            return Err(TransportError::RateLimited { retry_after });
        }

        Err(TransportError::Rejected(
            body.description
                .unwrap_or_else(|| format!("HTTP {}", status)),
        ))
    }
}

/// Typed per-delivery result. An abandoned delivery is logged and
/// forgotten; it never blocks other recipients or the next cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { attempts: u32 },
    Abandoned { attempts: u32 },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

/// Bounded-retry delivery over a [`Transport`]. Rate limits sleep for the
/// transport-specified cooldown (or the configured default) and retry up
/// to the attempt cap; any other error abandons the delivery immediately.
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    max_attempts: u32,
    default_cooldown: Duration,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>, config: &PollConfig) -> Self {
        Self {
            transport,
            max_attempts: config.max_send_attempts,
            default_cooldown: Duration::from_secs(config.rate_limit_cooldown_seconds),
        }
    }

    pub async fn send(&self, recipient: OwnerId, text: &str) -> DeliveryOutcome {
        for attempt in 1..=self.max_attempts {
            match self.transport.send_message(recipient, text).await {
                Ok(()) => {
                    if attempt > 1 {
                        info!("delivered to {} on attempt {}", recipient, attempt);
                    }
                    return DeliveryOutcome::Delivered { attempts: attempt };
                }
                Err(TransportError::RateLimited { retry_after }) => {
                    if attempt == self.max_attempts {
                        warn!(
                            "rate limited on final attempt {} for {}, abandoning delivery",
                            attempt, recipient
                        );
                        break;
                    }
                    let cooldown = retry_after
                        .map(Duration::from_secs)
                        .unwrap_or(self.default_cooldown);
                    warn!(
                        "rate limited sending to {}, retrying in {}s (attempt {}/{})",
                        recipient,
                        cooldown.as_secs(),
                        attempt,
                        self.max_attempts
                    );
                    sleep(cooldown).await;
                }
                Err(e) => {
                    error!("delivery to {} failed, not retrying: {}", recipient, e);
                    return DeliveryOutcome::Abandoned { attempts: attempt };
                }
            }
        }
        DeliveryOutcome::Abandoned {
            attempts: self.max_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Scripted transport: pops one result per attempt and records when
    /// each attempt happened (in virtual time).
    struct ScriptedTransport {
        script: Mutex<Vec<Result<(), TransportError>>>,
        attempt_times: Mutex<Vec<Instant>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<(), TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script),
                attempt_times: Mutex::new(Vec::new()),
            })
        }

        fn attempts(&self) -> Vec<Instant> {
            self.attempt_times.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send_message(&self, _recipient: OwnerId, _text: &str) -> Result<(), TransportError> {
            self.attempt_times.lock().unwrap().push(Instant::now());
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                Ok(())
            } else {
                script.remove(0)
            }
        }
    }

    fn poll_config(max_attempts: u32) -> PollConfig {
        PollConfig {
            interval_seconds: 10,
            max_send_attempts: max_attempts,
            rate_limit_cooldown_seconds: 60,
        }
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let transport = ScriptedTransport::new(vec![Ok(())]);
        let dispatcher = Dispatcher::new(transport.clone(), &poll_config(3));

        let outcome = dispatcher.send(1, "hello").await;
        assert_eq!(outcome, DeliveryOutcome::Delivered { attempts: 1 });
        assert_eq!(transport.attempts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_waits_server_cooldown_then_succeeds() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportError::RateLimited {
                retry_after: Some(5),
            }),
            Ok(()),
        ]);
        let dispatcher = Dispatcher::new(transport.clone(), &poll_config(3));

        let outcome = dispatcher.send(1, "hello").await;
        assert_eq!(outcome, DeliveryOutcome::Delivered { attempts: 2 });

        let attempts = transport.attempts();
        assert_eq!(attempts.len(), 2);
        assert!(attempts[1] - attempts[0] >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_without_retry_after_uses_default_cooldown() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportError::RateLimited { retry_after: None }),
            Ok(()),
        ]);
        let dispatcher = Dispatcher::new(transport.clone(), &poll_config(3));

        dispatcher.send(1, "hello").await;

        let attempts = transport.attempts();
        assert!(attempts[1] - attempts[0] >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_rate_limit_abandons_at_cap() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportError::RateLimited { retry_after: Some(1) }),
            Err(TransportError::RateLimited { retry_after: Some(1) }),
            Err(TransportError::RateLimited { retry_after: Some(1) }),
        ]);
        let dispatcher = Dispatcher::new(transport.clone(), &poll_config(3));

        let outcome = dispatcher.send(1, "hello").await;
        assert_eq!(outcome, DeliveryOutcome::Abandoned { attempts: 3 });
        assert_eq!(transport.attempts().len(), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_abandons_immediately() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportError::Rejected("chat not found".to_string())),
            Ok(()),
        ]);
        let dispatcher = Dispatcher::new(transport.clone(), &poll_config(3));

        let outcome = dispatcher.send(1, "hello").await;
        assert_eq!(outcome, DeliveryOutcome::Abandoned { attempts: 1 });
        assert_eq!(transport.attempts().len(), 1);
    }
}
