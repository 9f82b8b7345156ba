#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use ledger::{
    Ledger,
    diagnostics::{DiagnosticObserver, PermissionDiagnostic},
    notify::{Confirmation, Notifier},
    store::memory::MemoryStore,
    validation::RaffleItemDraft,
};

pub fn ledger() -> (Arc<MemoryStore>, Ledger) {
    let store = Arc::new(MemoryStore::new());
    (store.clone(), Ledger::new(store))
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Confirmation>>,
}

impl Notifier for RecordingNotifier {
    fn registration_confirmed(&self, confirmation: Confirmation) {
        self.sent.lock().unwrap().push(confirmation);
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    pub seen: Mutex<Vec<PermissionDiagnostic>>,
}

impl DiagnosticObserver for RecordingObserver {
    fn permission_denied(&self, diagnostic: &PermissionDiagnostic) {
        self.seen.lock().unwrap().push(diagnostic.clone());
    }
}

pub fn draft(id: &str, name: &str, prize_type: &str) -> RaffleItemDraft {
    RaffleItemDraft {
        id: id.to_string(),
        name: name.to_string(),
        description: format!("{name} for a lucky winner"),
        prize_type: prize_type.to_string(),
    }
}

pub async fn register_all(ledger: &Ledger, emails: &[&str]) {
    for email in emails {
        ledger.add_registration(&email.to_uppercase(), email).await.unwrap();
    }
}

pub async fn stock(ledger: &Ledger, items: &[(&str, &str, &str)]) {
    for (id, name, prize_type) in items {
        let item = draft(id, name, prize_type).validate().unwrap();
        ledger.add_raffle_item(&item).await.unwrap();
    }
}
