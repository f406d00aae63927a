use reqwest::{Client, Response};
use serde_json::json;
use std::fmt;
use tokio::sync::mpsc;
use tracing::{Event, Level, Subscriber};

// Discord rejects webhook content longer than this
const MAX_CONTENT_LENGTH: usize = 2000;

#[derive(Clone)]
pub struct DiscordSubscriber {
    sender: mpsc::UnboundedSender<(String, Level)>,
}

fn format_message(message: &str, level: Level) -> String {
    let message = message.replace('`', "'");
    let prefix = format!("**{}**: `", level.as_str());
    let budget = MAX_CONTENT_LENGTH - prefix.len() - 1;

    let body: String = if message.chars().count() > budget {
        message.chars().take(budget - 1).chain(['…']).collect()
    } else {
        message
    };
    format!("{prefix}{body}`")
}

async fn send_message(
    client: &Client,
    webhook_url: &str,
    message: String,
    level: Level,
) -> anyhow::Result<Response> {
    let payload = json!({ "content": format_message(&message, level) });
    Ok(client.post(webhook_url).json(&payload).send().await?)
}

async fn sender_task(
    mut reader: mpsc::UnboundedReceiver<(String, Level)>,
    client: Client,
    webhook_url: String,
) {
    while let Some((message, level)) = reader.recv().await {
        match send_message(&client, &webhook_url, message, level).await {
            Ok(response) if response.status().is_success() => {}
            // We use eprintln! here because logging would feed the failure back into the webhook
            Ok(response) => eprintln!(
                "Failed to send message: Received HTTP {}:",
                response.status()
            ),
            Err(e) => eprintln!("Failed to send message: {}", e),
        }
    }
}

impl DiscordSubscriber {
    /// Must be called inside a tokio runtime.
    pub fn new(webhook_url: String) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(sender_task(receiver, Client::new(), webhook_url));
        Self { sender }
    }

    pub fn send_to_discord(&self, message: &str, level: &Level) {
        let _ = self.sender.send((message.to_string(), *level));
    }
}

impl<S: Subscriber> tracing_subscriber::Layer<S> for DiscordSubscriber {
    fn on_event(&self, event: &Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        // Operators only get pinged for warnings and errors
        let level = event.metadata().level();
        if level <= &Level::WARN {
            self.send_to_discord(&visitor.to_string(), level);
        }
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl fmt::Display for MessageVisitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_is_wrapped_with_level() {
        assert_eq!(
            format_message("Failed to load `team`", Level::ERROR),
            "**ERROR**: `Failed to load 'team'`"
        );
    }

    #[test]
    fn long_messages_fit_discord_limit() {
        let message = "x".repeat(5000);
        let formatted = format_message(&message, Level::WARN);

        assert_eq!(formatted.chars().count(), MAX_CONTENT_LENGTH);
        assert!(formatted.ends_with("…`"));
    }
}
