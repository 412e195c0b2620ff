// # Telegram Notifier
//
// Delivers notices through the Telegram Bot API.
//
// ## API Reference
//
// - Send Message: POST `/bot<token>/sendMessage` with `{"chat_id", "text"}`
// - Every answer carries `ok`; failures add `error_code` and `description`
//
// ## Trust Level: Untrusted (Plugin)
//
// One request per message. No retries: the dispatcher logs a failed
// recipient and moves on.
//
// ## Security
//
// - Bot token NEVER appears in logs, errors or `Debug` output
// - reqwest errors are stripped of their URL, which embeds the token

use async_trait::async_trait;
use routerwatch_core::config::NotifierConfig;
use routerwatch_core::registry::ComponentRegistry;
use routerwatch_core::traits::{Notifier, NotifierFactory};
use routerwatch_core::{Error, Result};
use serde::Deserialize;
use std::time::Duration;

/// Default HTTP timeout for API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

const NOTIFIER_NAME: &str = "telegram";

/// Envelope of every Bot API answer
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram Bot API notifier
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, messages are logged and reported as delivered
/// without contacting Telegram. An empty token is accepted in this mode.
pub struct TelegramNotifier {
    /// ⚠️ NEVER log this value
    bot_token: String,

    /// API base URL without trailing slash
    api_base: String,

    client: reqwest::Client,

    dry_run: bool,
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("bot_token", &"<REDACTED>")
            .field("api_base", &self.api_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl TelegramNotifier {
    /// Create a notifier
    ///
    /// # Errors
    ///
    /// `Error::Config` when the token is empty outside dry-run mode or the
    /// HTTP client cannot be built.
    pub fn new(
        bot_token: impl Into<String>,
        api_base: impl Into<String>,
        dry_run: bool,
    ) -> Result<Self> {
        let bot_token = bot_token.into();
        if bot_token.is_empty() && !dry_run {
            return Err(Error::config("Telegram bot token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            bot_token,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            client,
            dry_run,
        })
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_message(&self, recipient: &str, text: &str) -> Result<()> {
        if self.dry_run {
            tracing::info!(chat_id = %recipient, "[DRY-RUN] Would send message:\n{}", text);
            return Ok(());
        }

        let payload = serde_json::json!({
            "chat_id": recipient,
            "text": text,
        });

        let response = self
            .client
            .post(self.send_message_url())
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                Error::transport(NOTIFIER_NAME, format!("Request failed: {}", e.without_url()))
            })?;

        let status = response.status();
        let body: Option<ApiResponse> = response.json().await.ok();

        match body {
            Some(ApiResponse { ok: true, .. }) if status.is_success() => {
                tracing::debug!(chat_id = %recipient, "Message accepted");
                Ok(())
            }
            Some(ApiResponse {
                error_code,
                description,
                ..
            }) => {
                let code = error_code.unwrap_or(status.as_u16());
                let description = description.unwrap_or_else(|| "no description".to_string());
                match code {
                    401 | 404 => Err(Error::auth(format!(
                        "Bot token rejected: {} - {}",
                        code, description
                    ))),
                    429 => Err(Error::notification(format!(
                        "Rate limit exceeded for chat {}: {}",
                        recipient, description
                    ))),
                    _ => Err(Error::notification(format!(
                        "Telegram refused message for chat {}: {} - {}",
                        recipient, code, description
                    ))),
                }
            }
            None => Err(Error::http(format!(
                "Unexpected Telegram response: {}",
                status
            ))),
        }
    }

    fn name(&self) -> &str {
        NOTIFIER_NAME
    }
}

/// Factory for creating Telegram notifiers
pub struct TelegramNotifierFactory;

impl NotifierFactory for TelegramNotifierFactory {
    fn create(&self, config: &NotifierConfig) -> Result<Box<dyn Notifier>> {
        match config {
            NotifierConfig::Telegram {
                bot_token,
                api_base,
                dry_run,
            } => {
                config.validate()?;

                if *dry_run {
                    tracing::warn!("Telegram notifier running in DRY-RUN mode - no messages will be sent");
                }

                Ok(Box::new(TelegramNotifier::new(
                    bot_token.clone(),
                    api_base.clone(),
                    *dry_run,
                )?))
            }
            _ => Err(Error::config("Invalid config for Telegram notifier")),
        }
    }
}

/// Register the Telegram notifier with a registry
pub fn register(registry: &ComponentRegistry) {
    registry.register_notifier(NOTIFIER_NAME, Box::new(TelegramNotifierFactory));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token: &str, dry_run: bool) -> NotifierConfig {
        NotifierConfig::Telegram {
            bot_token: token.to_string(),
            api_base: "https://api.telegram.org".to_string(),
            dry_run,
        }
    }

    #[test]
    fn test_factory_creation() {
        let factory = TelegramNotifierFactory;
        let notifier = factory.create(&config("123:abc", false)).unwrap();
        assert_eq!(notifier.name(), "telegram");
    }

    #[test]
    fn test_factory_missing_token() {
        let factory = TelegramNotifierFactory;
        assert!(factory.create(&config("", false)).is_err());
        assert!(factory.create(&config("", true)).is_ok());
    }

    #[test]
    fn test_empty_token_rejected_outside_dry_run() {
        assert!(matches!(
            TelegramNotifier::new("", "https://api.telegram.org", false),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_url_trims_trailing_slash() {
        let notifier = TelegramNotifier::new("123:abc", "https://api.telegram.org/", false).unwrap();
        assert_eq!(
            notifier.send_message_url(),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn test_bot_token_not_exposed_in_debug() {
        let notifier =
            TelegramNotifier::new("987654:secret-token", "https://api.telegram.org", false).unwrap();
        let debug_str = format!("{:?}", notifier);
        assert!(!debug_str.contains("secret-token"));
        assert!(debug_str.contains("TelegramNotifier"));
    }

    #[tokio::test]
    async fn test_dry_run_sends_nothing() {
        let notifier = TelegramNotifier::new("", "http://127.0.0.1:9", true).unwrap();
        assert!(notifier.is_dry_run());
        notifier.send_message("1001", "LINK DOWN").await.unwrap();
    }

    #[test]
    fn test_register() {
        let registry = ComponentRegistry::new();
        register(&registry);
        assert!(registry.has_notifier("telegram"));
    }
}
