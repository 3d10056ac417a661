//! Chat notifications.
//!
//! A rendered document is split into size-bounded [`Message`]s which are
//! then handed, one after another, to every configured [`Transport`].

mod batch;
mod discord;

pub use batch::*;
pub use discord::*;

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Notification error types.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("webhook rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// A destination for chat messages.
pub trait Transport {
    /// Short description used in logs.
    fn describe(&self) -> String;

    /// Deliver one message. The transport owns its own timeout.
    fn send(&self, message: &Message) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

/// Outcome of a notification round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendReport {
    pub sent: usize,
    pub failed: usize,
}

/// Sends messages to every transport, pacing consecutive messages.
pub struct Notifier<T> {
    transports: Vec<T>,
    delay: Duration,
}

impl<T: Transport> Notifier<T> {
    pub fn new(transports: Vec<T>, delay: Duration) -> Self {
        Self { transports, delay }
    }

    /// Send all messages in order. Failures are logged and counted; they
    /// never stop the remaining sends.
    pub async fn send_all(&self, messages: &[Message]) -> SendReport {
        let mut report = SendReport::default();

        for (i, message) in messages.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            for transport in &self.transports {
                match transport.send(message).await {
                    Ok(()) => report.sent += 1,
                    Err(e) => {
                        tracing::error!(
                            "Notifier: Failed to send message {}/{} to {}: {}",
                            i + 1,
                            messages.len(),
                            transport.describe(),
                            e
                        );
                        report.failed += 1;
                    }
                }
            }
        }

        tracing::info!(
            "Notifier: Sent {} message(s), {} failure(s)",
            report.sent,
            report.failed
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::HeartbeatStatus;
    use std::sync::Mutex;

    /// Records bodies and fails on the bodies listed in `fail_on`.
    struct Recorder {
        fail_on: Vec<String>,
        seen: Mutex<Vec<String>>,
    }

    impl Transport for Recorder {
        fn describe(&self) -> String {
            "recorder".to_string()
        }

        async fn send(&self, message: &Message) -> Result<(), NotifyError> {
            self.seen.lock().unwrap().push(message.body.clone());
            if self.fail_on.contains(&message.body) {
                Err(NotifyError::Rejected {
                    status: 429,
                    body: "rate limited".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn message(body: &str) -> Message {
        Message {
            body: body.to_string(),
            worst: HeartbeatStatus::KO,
        }
    }

    #[test]
    fn test_failure_does_not_stop_batch() {
        let notifier = Notifier::new(
            vec![Recorder {
                fail_on: vec!["two".to_string()],
                seen: Mutex::new(Vec::new()),
            }],
            Duration::ZERO,
        );
        let messages = vec![message("one"), message("two"), message("three")];

        let report = tokio_test::block_on(notifier.send_all(&messages));

        assert_eq!(report, SendReport { sent: 2, failed: 1 });
        let seen = notifier.transports[0].seen.lock().unwrap().clone();
        assert_eq!(seen, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_every_transport_gets_every_message() {
        let recorder = || Recorder {
            fail_on: Vec::new(),
            seen: Mutex::new(Vec::new()),
        };
        let notifier = Notifier::new(vec![recorder(), recorder()], Duration::from_millis(1));

        let report = notifier.send_all(&[message("a"), message("b")]).await;

        assert_eq!(report, SendReport { sent: 4, failed: 0 });
        for transport in &notifier.transports {
            assert_eq!(transport.seen.lock().unwrap().len(), 2);
        }
    }
}
