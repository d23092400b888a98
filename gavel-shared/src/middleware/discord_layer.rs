use std::fmt;

use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::clients::discord::DiscordClient;

const ALERT_QUEUE_DEPTH: usize = 256;

/// Forwards ERROR-level events to a Discord webhook.
///
/// Delivery happens on a background task fed through a bounded channel;
/// when the channel is full the alert is dropped rather than blocking
/// the dispatch loop.
pub struct DiscordAlertLayer {
    tx: mpsc::Sender<String>,
}

/// Build the layer and spawn its delivery task. Must be called from
/// within a tokio runtime.
pub fn discord_alert_layer(webhook_url: &str) -> DiscordAlertLayer {
    let (tx, mut rx) = mpsc::channel::<String>(ALERT_QUEUE_DEPTH);
    let client = DiscordClient::new(webhook_url);

    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = client.send(&message).await {
                // Not tracing::error - that would feed back into this layer.
                tracing::debug!(error = %e, "failed to deliver alert");
            }
        }
    });

    DiscordAlertLayer { tx }
}

impl<S: Subscriber> Layer<S> for DiscordAlertLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::ERROR {
            return;
        }
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let content = format!("[{}] {}", event.metadata().target(), visitor.message);
        let _ = self.tx.try_send(content);
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }
}
