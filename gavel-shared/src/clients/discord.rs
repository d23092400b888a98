use reqwest::Client;
use serde::Serialize;

/// Posts alert messages to a Discord webhook.
#[derive(Clone)]
pub struct DiscordClient {
    client: Client,
    webhook_url: String,
}

#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    content: &'a str,
}

impl DiscordClient {
    pub fn new(webhook_url: &str) -> Self {
        Self {
            client: Client::new(),
            webhook_url: webhook_url.to_string(),
        }
    }

    pub async fn send(&self, content: &str) -> Result<(), String> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&WebhookMessage { content })
            .send()
            .await
            .map_err(|e| format!("webhook send failed: {e}"))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("webhook error: {body}"));
        }
        Ok(())
    }
}
