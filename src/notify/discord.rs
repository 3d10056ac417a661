//! Discord webhook transport.

use super::{Message, NotifyError, Transport};
use reqwest::Url;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    embeds: [Embed<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Embed<'a> {
    description: &'a str,
    color: u32,
}

/// Posts messages as embeds to a Discord webhook.
#[derive(Debug, Clone)]
pub struct DiscordWebhook {
    client: reqwest::Client,
    url: Url,
}

impl DiscordWebhook {
    pub fn new(client: reqwest::Client, url: Url) -> Self {
        Self { client, url }
    }

    /// Resolve a webhook target.
    ///
    /// Accepts a plain `http(s)://` webhook URL or the `discord://token@id`
    /// shorthand.
    pub fn parse_target(raw: &str) -> Result<Url, String> {
        let url = Url::parse(raw.trim()).map_err(|e| format!("{}: {}", raw, e))?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            "discord" => {
                let token = url.username();
                let id = url.host_str().unwrap_or_default();
                if token.is_empty() || id.is_empty() {
                    return Err(format!("{}: expected discord://token@id", raw));
                }
                let expanded = format!("https://discord.com/api/webhooks/{}/{}", id, token);
                Url::parse(&expanded).map_err(|e| format!("{}: {}", raw, e))
            }
            other => Err(format!("{}: unsupported scheme {}", raw, other)),
        }
    }
}

impl Transport for DiscordWebhook {
    fn describe(&self) -> String {
        // The path carries the webhook token.
        format!(
            "discord webhook on {}",
            self.url.host_str().unwrap_or("unknown host")
        )
    }

    async fn send(&self, message: &Message) -> Result<(), NotifyError> {
        let payload = WebhookPayload {
            embeds: [Embed {
                description: &message.body,
                color: message.accent(),
            }],
        };

        let response = self
            .client
            .post(self.url.clone())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
