//! Outbound email. Delivery is pluggable; the default transport writes
//! messages to the log.

mod templates;

pub use templates::welcome;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::MailerConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("mail delivery failed: {0}")]
    Delivery(String),

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: Box<MailerError> },
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &Message) -> Result<(), MailerError>;
}

/// Development transport: every message becomes an `info` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &Message) -> Result<(), MailerError> {
        info!(
            from = %message.from,
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "outbound email"
        );
        Ok(())
    }
}

/// Retries a transport with exponential backoff.
pub struct RetryingMailer<M> {
    inner: M,
    max_attempts: u32,
    initial_backoff: Duration,
}

impl<M: Mailer> RetryingMailer<M> {
    pub fn new(inner: M, config: &MailerConfig) -> Self {
        Self {
            inner,
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
        }
    }
}

#[async_trait]
impl<M: Mailer> Mailer for RetryingMailer<M> {
    async fn send(&self, message: &Message) -> Result<(), MailerError> {
        let mut backoff = self.initial_backoff;
        let mut attempt = 1;
        loop {
            match self.inner.send(message).await {
                Ok(()) => return Ok(()),
                Err(err) if attempt >= self.max_attempts => {
                    return Err(MailerError::Exhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    })
                }
                Err(err) => {
                    warn!(attempt, to = %message.to, error = %err, retry_in = ?backoff, "mail delivery failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    /// Fails the first `failures` sends.
    struct Flaky {
        failures: u32,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Mailer for Flaky {
        async fn send(&self, _: &Message) -> Result<(), MailerError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(MailerError::Delivery("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn config() -> MailerConfig {
        MailerConfig {
            sender: "Reel <no-reply@reel.local>".to_string(),
            max_attempts: 3,
            initial_backoff_ms: 500,
        }
    }

    fn message() -> Message {
        welcome(
            "Reel <no-reply@reel.local>",
            "alice@example.com",
            1,
            "ABCDEFGHIJKLMNOPQRSTUVWXYZ",
            chrono::Utc::now(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn retries_with_exponential_backoff() {
        let calls = Arc::new(AtomicU32::new(0));
        let mailer = RetryingMailer::new(Flaky { failures: 2, calls: calls.clone() }, &config());

        let started = Instant::now();
        mailer.send(&message()).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 500ms then 1s
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(1500), "{waited:?}");
        assert!(waited < Duration::from_millis(1600), "{waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let mailer = RetryingMailer::new(Flaky { failures: 10, calls: calls.clone() }, &config());

        let err = mailer.send(&message()).await.unwrap_err();
        assert!(matches!(err, MailerError::Exhausted { attempts: 3, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
