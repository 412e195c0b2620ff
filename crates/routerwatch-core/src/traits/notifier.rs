// # Notifier Trait
//
// Defines the send-message primitive used for fan-out.
//
// A notifier knows how to deliver one text to one recipient. Iterating over
// the recipient set and tolerating per-recipient failures is the job of
// [`Dispatcher`](crate::notify::Dispatcher).

use async_trait::async_trait;

/// Trait for notifier implementations
///
/// # Trust Level: Untrusted (Plugin)
///
/// ## Allowed Capabilities
/// - ✅ Perform network I/O against a chat API
///
/// ## Forbidden Capabilities
/// - ❌ Retry internally (failures are logged by the dispatcher and dropped)
/// - ❌ Decide who receives a message
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a plain-text message to one recipient
    ///
    /// # Parameters
    ///
    /// - `recipient`: Chat or user id understood by the transport
    /// - `text`: Message body
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The transport accepted the message
    /// - `Err(Error)`: Delivery failed
    async fn send_message(&self, recipient: &str, text: &str) -> Result<(), crate::Error>;

    /// Notifier name for logs
    fn name(&self) -> &str {
        "notifier"
    }
}

/// Helper trait for constructing notifiers from configuration
pub trait NotifierFactory: Send + Sync {
    /// Create a Notifier instance from configuration
    fn create(
        &self,
        config: &crate::config::NotifierConfig,
    ) -> Result<Box<dyn Notifier>, crate::Error>;
}
