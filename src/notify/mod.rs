//! Notification dispatcher
//!
//! Fire-and-forget backer emails over the Resend HTTP API. Failures are
//! logged and never block the state transition that triggered them. Without
//! an API key the dispatcher degrades to a no-op, which is also what the
//! test environment relies on.

use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// Backer-facing state change events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationEvent {
    DepositConfirmed,
    ProjectLocked,
    ProjectRefunded,
}

pub struct Notifier {
    client: Client,
    api_key: Option<String>,
    from: String,
    base_url: String,
}

impl Notifier {
    pub fn new(api_key: Option<String>, from: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key,
            from,
            base_url: "https://api.resend.com".to_string(),
        }
    }

    /// Send a backer email for a state change. Never returns an error.
    pub async fn notify(
        &self,
        event: NotificationEvent,
        recipient: &str,
        recipient_name: Option<&str>,
        campaign_title: &str,
        amount: Option<i64>,
    ) {
        let api_key = match &self.api_key {
            Some(key) => key,
            None => {
                tracing::debug!(?event, recipient, "No email API key configured, skipping");
                return;
            }
        };

        let name = recipient_name.unwrap_or("there");
        let (subject, html) = render(event, name, campaign_title, amount);

        let body = json!({
            "from": self.from,
            "to": [recipient],
            "subject": subject,
            "html": html,
        });

        let result = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(?event, recipient, "Notification sent");
            }
            Ok(response) => {
                tracing::warn!(
                    ?event,
                    recipient,
                    status = %response.status(),
                    "Notification rejected by email provider"
                );
            }
            Err(e) => {
                tracing::warn!(?event, recipient, error = %e, "Failed to send notification");
            }
        }
    }
}

fn render(
    event: NotificationEvent,
    name: &str,
    campaign_title: &str,
    amount: Option<i64>,
) -> (String, String) {
    match event {
        NotificationEvent::DepositConfirmed => (
            format!("Deposit confirmed for {}", campaign_title),
            format!(
                "<h1>Your deposit is confirmed!</h1>\
                 <p>Hi {},</p>\
                 <p>Thank you for reserving <strong>{}</strong>.</p>\
                 <p><strong>Deposit amount:</strong> {}</p>\
                 <p>Your deposit is held in escrow. If the project doesn't reach its goal \
                 by the deadline, you'll be automatically refunded.</p>",
                name,
                campaign_title,
                format_amount(amount)
            ),
        ),
        NotificationEvent::ProjectLocked => (
            format!("{} reached its goal!", campaign_title),
            format!(
                "<h1>Production is starting!</h1>\
                 <p>Hi {},</p>\
                 <p>Great news! <strong>{}</strong> has reached its funding goal.</p>\
                 <p>The design is now locked and we're moving to production.</p>",
                name, campaign_title
            ),
        ),
        NotificationEvent::ProjectRefunded => (
            format!("Refund processed for {}", campaign_title),
            format!(
                "<h1>Your deposit has been refunded</h1>\
                 <p>Hi {},</p>\
                 <p>Unfortunately, <strong>{}</strong> did not reach its funding goal \
                 by the deadline.</p>\
                 <p>Your deposit of {} has been automatically refunded to your original \
                 payment method.</p>",
                name,
                campaign_title,
                format_amount(amount)
            ),
        ),
    }
}

/// Format minor units as a dollar string for email copy
fn format_amount(amount: Option<i64>) -> String {
    match amount {
        Some(minor) => format!("${}.{:02}", minor / 100, minor % 100),
        None => "your deposit".to_string(),
    }
}
