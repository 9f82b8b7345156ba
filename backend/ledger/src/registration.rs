use tracing::info;

use crate::{
    Ledger,
    error::LedgerError,
    notify::{Confirmation, Notifier},
    validation::RegistrationForm,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registered {
    New { full_name: String },
    /// Already on the list. Carries the stored name, not the submitted one.
    Existing { full_name: String },
}

impl Registered {
    pub fn full_name(&self) -> &str {
        match self {
            Registered::New { full_name } | Registered::Existing { full_name } => full_name,
        }
    }

    pub fn is_existing(&self) -> bool {
        matches!(self, Registered::Existing { .. })
    }
}

/// Accepts a registration while the gate is open. Registering the same
/// email twice changes nothing and reports the existing entry. Only a new
/// registration triggers a confirmation notice.
pub async fn register(
    ledger: &Ledger,
    notifier: &dyn Notifier,
    form: &RegistrationForm,
) -> Result<Registered, LedgerError> {
    if !ledger.registration_status().await?.is_open {
        return Err(LedgerError::RegistrationClosed);
    }

    let form = RegistrationForm::new(form.full_name.trim(), form.email.trim());
    form.validate().map_err(LedgerError::validation)?;

    let full_name = form.full_name.as_str();
    let email = form.email.as_str();

    if let Some(existing) = ledger.registration(email).await? {
        info!(email, "Registration already exists");
        return Ok(Registered::Existing {
            full_name: existing.full_name,
        });
    }

    ledger.add_registration(full_name, email).await?;
    info!(email, "Registration accepted");

    notifier.registration_confirmed(Confirmation::for_registration(full_name, email));

    Ok(Registered::New {
        full_name: full_name.to_string(),
    })
}
