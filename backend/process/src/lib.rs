//! # Operator Commands
//!
//! One-off jobs run against the same Redis store as the server.
//!
//! - `import <file>`: bulk load prizes from a CSV file, rows whose id already
//!   exists are skipped and listed
//! - `registration <open|closed>`: flip the public registration gate
//! - `winners`: print every confirmed winner, newest first
use std::{path::Path, sync::Arc};

use anyhow::Context;
use ledger::{
    Ledger, LedgerError,
    import::{ImportReport, import_csv},
    models::Winner,
    store::database::RedisStore,
};
use tracing::{info, warn};

pub async fn connect(redis_url: &str, prefix: &str) -> anyhow::Result<Ledger> {
    let store = RedisStore::connect(redis_url, prefix)
        .await
        .with_context(|| format!("Could not reach Redis at {redis_url}"))?;

    Ok(Ledger::new(Arc::new(store)))
}

pub async fn import_file(ledger: &Ledger, path: &Path) -> anyhow::Result<ImportReport> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Could not read {}", path.display()))?;

    let report = match import_csv(ledger, &text).await {
        Ok(report) => report,
        Err(LedgerError::InvalidBatch { message, errors }) => {
            for error in &errors {
                warn!("{error}");
            }
            anyhow::bail!("{message}");
        }
        Err(e) => return Err(e.into()),
    };

    info!("{} Inserted {} item(s)", report.message, report.inserted_count);
    for error in &report.errors {
        warn!("{error}");
    }

    Ok(report)
}

pub async fn set_registration(ledger: &Ledger, is_open: bool) -> anyhow::Result<()> {
    ledger.set_registration_status(is_open).await?;
    info!(
        "Registration is now {}.",
        if is_open { "open" } else { "closed" }
    );
    Ok(())
}

pub fn winner_line(winner: &Winner) -> String {
    format!(
        "round {:>3}  {:<28} {:<28} {} ({})",
        winner.round, winner.full_name, winner.prize_name, winner.prize_type, winner.prize_id
    )
}

pub async fn winners(ledger: &Ledger) -> anyhow::Result<Vec<Winner>> {
    let winners = ledger.winners().await?;

    info!("{} winner(s)", winners.len());
    for winner in &winners {
        info!("{}", winner_line(winner));
    }

    Ok(winners)
}
