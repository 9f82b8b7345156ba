use std::sync::Arc;

use ledger::{Ledger, notify::Notifier, raffle::RaffleSession};
use tokio::sync::Mutex;

use super::{config::Config, database::init_store, notify::init_notifier};

pub struct AppState {
    pub config: Config,
    pub ledger: Ledger,
    /// The one raffle round in progress. Holding the lock serialises admin
    /// raffle requests.
    pub raffle: Mutex<RaffleSession>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Arc<Self>> {
        let config = Config::load()?;

        let ledger = Ledger::new(init_store(&config).await?);
        let notifier = init_notifier(&config);

        Ok(Self::with_parts(config, ledger, notifier))
    }

    pub fn with_parts(config: Config, ledger: Ledger, notifier: Arc<dyn Notifier>) -> Arc<Self> {
        Arc::new(Self {
            config,
            ledger,
            raffle: Mutex::new(RaffleSession::new()),
            notifier,
        })
    }
}
