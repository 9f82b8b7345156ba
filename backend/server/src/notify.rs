use std::sync::Arc;

use ledger::notify::{Confirmation, LogNotifier, Notifier};
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::Config;

/// Posts each confirmation as JSON to a mail relay. Delivery happens on a
/// spawned task, failures are only logged.
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

impl Notifier for WebhookNotifier {
    fn registration_confirmed(&self, confirmation: Confirmation) {
        let client = self.client.clone();
        let url = self.url.clone();

        tokio::spawn(async move {
            let sent = client
                .post(&url)
                .json(&confirmation)
                .send()
                .await
                .and_then(|response| response.error_for_status());

            match sent {
                Ok(_) => debug!(to = %confirmation.email, "Confirmation delivered"),
                Err(e) => warn!(to = %confirmation.email, "Confirmation delivery failed: {e}"),
            }
        });
    }
}

pub fn init_notifier(config: &Config) -> Arc<dyn Notifier> {
    match &config.notify_webhook_url {
        Some(url) => {
            info!("Sending confirmations to {url}");
            Arc::new(WebhookNotifier::new(url.as_str()))
        }
        None => {
            info!("NOTIFY_WEBHOOK_URL not set, confirmations are only logged");
            Arc::new(LogNotifier)
        }
    }
}
