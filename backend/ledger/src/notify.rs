use serde::Serialize;
use tracing::info;

pub const SUBJECT: &str = "Your Oke Raffle Registration is Confirmed!";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub full_name: String,
    pub email: String,
    pub subject: String,
    pub body: String,
}

impl Confirmation {
    pub fn for_registration(full_name: &str, email: &str) -> Self {
        Self {
            full_name: full_name.to_string(),
            email: email.to_string(),
            subject: SUBJECT.to_string(),
            body: format!(
                "Hi {full_name}, thank you for registering for our event. Good luck!"
            ),
        }
    }
}

/// Fire and forget. Implementations must not block the caller on delivery.
pub trait Notifier: Send + Sync {
    fn registration_confirmed(&self, confirmation: Confirmation);
}

pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn registration_confirmed(&self, confirmation: Confirmation) {
        info!(
            to = %confirmation.email,
            subject = %confirmation.subject,
            "Confirmation email sent (simulated): {}",
            confirmation.body
        );
    }
}
