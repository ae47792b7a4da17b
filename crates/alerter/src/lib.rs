use crate::error::AlerterError;
use async_trait::async_trait;
use configuration::{AlertsConfig, DiscordConfig, TelegramConfig};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
pub mod error;

/// Outbound delivery of a plain-text alert.
///
/// Delivery is best-effort. Callers log a returned error and move on; nothing
/// is ever retried.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<(), AlerterError>;
}

/// Sends `message` and swallows any failure after logging it.
pub async fn notify_best_effort(notifier: &dyn Notifier, message: &str) {
    if let Err(e) = notifier.notify(message).await {
        tracing::error!(error = %e, "Failed to deliver notification.");
    }
}

/// The JSON payload for a Discord webhook.
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
}

/// Posts alerts to a Discord channel webhook.
pub struct DiscordNotifier {
    client: Client,
    webhook_url: String,
}

impl DiscordNotifier {
    /// Returns `None` if no webhook URL is configured.
    pub fn new(client: Client, config: &DiscordConfig) -> Option<Self> {
        if config.webhook_url.is_empty() {
            return None;
        }
        Some(Self {
            client,
            webhook_url: config.webhook_url.clone(),
        })
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, message: &str) -> Result<(), AlerterError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&WebhookPayload { content: message })
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to decode error response".to_string());
            return Err(AlerterError::ApiError {
                service: "Discord",
                message: error_text,
            });
        }
        Ok(())
    }
}

/// The JSON payload for the Telegram `sendMessage` endpoint.
#[derive(Debug, Serialize)]
struct SendMessagePayload<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

/// A client for sending messages to the Telegram Bot API.
pub struct TelegramAlerter {
    client: Client,
    token: String,
    chat_id: String,
}

impl TelegramAlerter {
    /// Creates a new `TelegramAlerter`.
    ///
    /// Returns `None` if the token or chat_id is missing from the configuration,
    /// allowing the system to gracefully disable this channel.
    pub fn new(client: Client, config: &TelegramConfig) -> Option<Self> {
        if config.token.is_empty() || config.chat_id.is_empty() {
            return None;
        }
        Some(Self {
            client,
            token: config.token.clone(),
            chat_id: config.chat_id.clone(),
        })
    }
}

#[async_trait]
impl Notifier for TelegramAlerter {
    async fn notify(&self, message: &str) -> Result<(), AlerterError> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.token);
        let text = to_markdown_v2(message);

        let payload = SendMessagePayload {
            chat_id: &self.chat_id,
            text: &text,
            parse_mode: "MarkdownV2",
        };

        let response = self.client.post(&url).json(&payload).send().await?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to decode error response".to_string());
            return Err(AlerterError::ApiError {
                service: "Telegram",
                message: error_text,
            });
        }
        Ok(())
    }
}

/// Writes alerts to the log only. Used when no delivery channel is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) -> Result<(), AlerterError> {
        tracing::info!(alert = message, "Notification (no delivery channel configured)");
        Ok(())
    }
}

/// Delivers each alert to every configured channel.
pub struct FanoutNotifier {
    channels: Vec<Box<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new(channels: Vec<Box<dyn Notifier>>) -> Self {
        Self { channels }
    }

    /// Builds the notifier set from configuration, falling back to `LogNotifier`.
    pub fn from_config(config: &AlertsConfig, timeout: Duration) -> Result<Self, AlerterError> {
        let client = Client::builder().timeout(timeout).build()?;
        let mut channels: Vec<Box<dyn Notifier>> = Vec::new();

        if let Some(discord) = DiscordNotifier::new(client.clone(), &config.discord) {
            channels.push(Box::new(discord));
        }
        if let Some(telegram) = TelegramAlerter::new(client, &config.telegram) {
            channels.push(Box::new(telegram));
        }
        if channels.is_empty() {
            tracing::warn!("No alert channel is configured (Discord or Telegram). Alerts go to the log only.");
            channels.push(Box::new(LogNotifier));
        }

        Ok(Self { channels })
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[async_trait]
impl Notifier for FanoutNotifier {
    async fn notify(&self, message: &str) -> Result<(), AlerterError> {
        let mut failed = 0;
        for channel in &self.channels {
            if let Err(e) = channel.notify(message).await {
                tracing::warn!(error = %e, "Alert channel failed.");
                failed += 1;
            }
        }
        if failed > 0 {
            return Err(AlerterError::Partial(failed));
        }
        Ok(())
    }
}

/// A helper function to escape characters that have special meaning in Telegram's MarkdownV2.
fn escape_markdown(text: &str) -> String {
    let special_chars = r"\_*[]()~`>#+-=|{}.!";
    special_chars
        .chars()
        .fold(text.to_string(), |s, c| s.replace(c, &format!("\\{}", c)))
}

/// Converts alert text using `**bold**` and `` `code` `` spans into MarkdownV2.
///
/// Span contents are escaped, the markers are translated, and unmatched
/// markers are sent as literal characters.
fn to_markdown_v2(message: &str) -> String {
    let mut out = String::with_capacity(message.len() + 16);
    let mut rest = message;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("**")
            && let Some(end) = after.find("**")
        {
            out.push('*');
            out.push_str(&escape_markdown(&after[..end]));
            out.push('*');
            rest = &after[end + 2..];
            continue;
        }
        if let Some(after) = rest.strip_prefix('`')
            && let Some(end) = after.find('`')
        {
            out.push('`');
            out.push_str(&after[..end].replace('\\', r"\\"));
            out.push('`');
            rest = &after[end + 1..];
            continue;
        }

        let next = rest.find(['*', '`']).filter(|&i| i > 0).unwrap_or_else(|| {
            rest.char_indices().nth(1).map_or(rest.len(), |(i, _)| i)
        });
        out.push_str(&escape_markdown(&rest[..next]));
        rest = &rest[next..];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for Counting {
        async fn notify(&self, _message: &str) -> Result<(), AlerterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(AlerterError::ApiError {
                    service: "test",
                    message: "boom".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn escapes_markdown_specials() {
        assert_eq!(escape_markdown("BTC/USDT @ 1.5 (tp1)"), r"BTC/USDT @ 1\.5 \(tp1\)");
        assert_eq!(escape_markdown(r"a\b"), r"a\\b");
    }

    #[test]
    fn alert_markup_becomes_markdown_v2() {
        assert_eq!(
            to_markdown_v2("🚀 **NEW LONG** BTC/USDT @ `101.5000`"),
            r"🚀 *NEW LONG* BTC/USDT @ `101.5000`"
        );
        assert_eq!(
            to_markdown_v2("✅ **TP1 hit** ETH @ `0.05` (+3.75)"),
            r"✅ *TP1 hit* ETH @ `0.05` \(\+3\.75\)"
        );
    }

    #[test]
    fn unmatched_markers_are_sent_literally() {
        assert_eq!(to_markdown_v2("a ** b"), r"a \*\* b");
        assert_eq!(to_markdown_v2("price `1.5"), r"price \`1\.5");
        assert_eq!(to_markdown_v2("**bold.**"), r"*bold\.*");
    }

    #[test]
    fn missing_credentials_disable_channels() {
        let client = Client::new();
        assert!(DiscordNotifier::new(client.clone(), &DiscordConfig::default()).is_none());
        assert!(TelegramAlerter::new(client, &TelegramConfig::default()).is_none());

        let fanout = FanoutNotifier::from_config(&AlertsConfig::default(), Duration::from_secs(5)).unwrap();
        assert_eq!(fanout.len(), 1);
    }

    #[tokio::test]
    async fn fanout_reaches_every_channel_even_when_one_fails() {
        let calls = Arc::new(AtomicUsize::new(0));
        let channels: Vec<Box<dyn Notifier>> = vec![
            Box::new(Counting { calls: calls.clone(), fail: true }),
            Box::new(Counting { calls: calls.clone(), fail: false }),
        ];
        let fanout = FanoutNotifier::new(channels);

        let result = fanout.notify("hello").await;
        assert!(matches!(result, Err(AlerterError::Partial(1))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // Best-effort delivery never surfaces the error.
        notify_best_effort(&fanout, "hello again").await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
