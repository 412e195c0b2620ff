//! Fan-out of notices to every configured recipient
//!
//! Each (notice, recipient) pair is one independent send. A failed send is
//! logged and the next recipient is still attempted. Nothing is retried.

use std::sync::Arc;
use tracing::{debug, error};

use crate::event::Notice;
use crate::traits::Notifier;

/// Outcome counts of one dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

impl DispatchReport {
    fn merge(&mut self, other: DispatchReport) {
        self.delivered += other.delivered;
        self.failed += other.failed;
    }
}

/// Sends notices through a [`Notifier`] to a fixed recipient set
#[derive(Clone)]
pub struct Dispatcher {
    notifier: Arc<dyn Notifier>,
    recipients: Arc<[String]>,
}

impl Dispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, recipients: Vec<String>) -> Self {
        Self {
            notifier,
            recipients: recipients.into(),
        }
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    /// Send one text to every recipient
    pub async fn broadcast(&self, text: &str) -> DispatchReport {
        let mut report = DispatchReport::default();

        for recipient in self.recipients.iter() {
            match self.notifier.send_message(recipient, text).await {
                Ok(()) => {
                    debug!(notifier = self.notifier.name(), recipient = %recipient, "Message delivered");
                    report.delivered += 1;
                }
                Err(e) => {
                    error!(
                        notifier = self.notifier.name(),
                        recipient = %recipient,
                        "Failed to deliver message: {}",
                        e
                    );
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Send every notice, in order, to every recipient
    pub async fn dispatch(&self, notices: &[Notice]) -> DispatchReport {
        let mut report = DispatchReport::default();
        for notice in notices {
            debug!(kind = %notice.kind, "Dispatching notice");
            report.merge(self.broadcast(&notice.message).await);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Fails for recipient "bad", records everything else
    struct FlakyNotifier {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Notifier for FlakyNotifier {
        async fn send_message(&self, recipient: &str, text: &str) -> crate::Result<()> {
            if recipient == "bad" {
                return Err(crate::Error::notification("chat not found"));
            }
            self.sent
                .lock()
                .unwrap()
                .push((recipient.to_string(), text.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_other_recipients() {
        let notifier = Arc::new(FlakyNotifier {
            sent: Mutex::new(Vec::new()),
        });
        let dispatcher = Dispatcher::new(
            notifier.clone(),
            vec!["1".to_string(), "bad".to_string(), "2".to_string()],
        );

        let notices = vec![
            Notice {
                message: "LINK DOWN".to_string(),
                kind: EventKind::InterfaceDown,
            },
            Notice {
                message: "LINK UP".to_string(),
                kind: EventKind::InterfaceUp,
            },
        ];

        let report = dispatcher.dispatch(&notices).await;
        assert_eq!(report, DispatchReport { delivered: 4, failed: 2 });

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent[0], ("1".to_string(), "LINK DOWN".to_string()));
        assert_eq!(sent[1], ("2".to_string(), "LINK DOWN".to_string()));
        assert_eq!(sent[3], ("2".to_string(), "LINK UP".to_string()));
    }
}
