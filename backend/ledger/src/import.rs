use std::collections::HashMap;

use serde::Serialize;
use tracing::info;

use crate::{
    Ledger,
    csv::{self, CsvRow},
    error::LedgerError,
    models::RaffleItem,
};

pub const UPLOAD_COMPLETE: &str = "Upload complete.";
pub const NOTHING_IMPORTED: &str = "No new items were imported.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub message: String,
    pub inserted_count: usize,
    /// Rows skipped because their id was already in the catalog.
    pub errors: Vec<String>,
}

impl ImportReport {
    /// Nothing written and something to explain, not a hard error.
    pub fn is_soft_failure(&self) -> bool {
        self.inserted_count == 0 && !self.errors.is_empty()
    }
}

/// Valid items paired with the file line they were read from.
type Numbered = Vec<(usize, RaffleItem)>;

fn validate_rows(rows: &[CsvRow]) -> Result<Numbered, LedgerError> {
    let mut items = Vec::with_capacity(rows.len());
    let mut errors = Vec::new();

    for row in rows {
        match row.draft.validate() {
            Ok(item) => items.push((row.line, item)),
            Err(fields) => errors.extend(
                fields
                    .iter()
                    .map(|(_, message)| format!("Row {}: {message}", row.line)),
            ),
        }
    }

    if !errors.is_empty() {
        return Err(LedgerError::InvalidBatch {
            message: "CSV data is invalid. Please check the format.".to_string(),
            errors,
        });
    }

    Ok(items)
}

/// Every row whose id occurs more than once, first occurrence included.
fn reject_duplicates(items: &[(usize, RaffleItem)]) -> Result<(), LedgerError> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for (_, item) in items {
        *counts.entry(item.id.as_str()).or_default() += 1;
    }

    let errors: Vec<String> = items
        .iter()
        .filter(|(_, item)| counts[item.id.as_str()] > 1)
        .map(|(line, item)| format!("Row {line}: Duplicate Item ID \"{}\" found in CSV.", item.id))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(LedgerError::InvalidBatch {
            message: "CSV contains duplicate Item IDs.".to_string(),
            errors,
        })
    }
}

/// Validates every row, refuses the whole batch on any schema failure or
/// repeated id, then writes the rows whose id is new in one batch. Rows
/// whose id already exists are skipped and reported, never overwritten.
pub async fn bulk_import(
    ledger: &Ledger,
    rows: &[CsvRow],
) -> Result<ImportReport, LedgerError> {
    if rows.is_empty() {
        return Err(LedgerError::InvalidBatch {
            message: "Please select a valid CSV file.".to_string(),
            errors: Vec::new(),
        });
    }

    let items = validate_rows(rows)?;
    reject_duplicates(&items)?;

    let ids: Vec<String> = items.iter().map(|(_, item)| item.id.clone()).collect();
    let existing = ledger.existing_item_ids(&ids).await?;

    let mut errors = Vec::new();
    let mut fresh = Vec::with_capacity(items.len());
    for (line, item) in items {
        if existing.contains(&item.id) {
            errors.push(format!(
                "Row {line}: Item ID \"{}\" already exists in the database.",
                item.id
            ));
        } else {
            fresh.push(item);
        }
    }

    if !fresh.is_empty() {
        ledger.add_raffle_items(&fresh).await?;
    }

    info!(
        inserted = fresh.len(),
        skipped = errors.len(),
        "Bulk import finished"
    );

    let message = if fresh.is_empty() {
        NOTHING_IMPORTED
    } else {
        UPLOAD_COMPLETE
    };

    Ok(ImportReport {
        message: message.to_string(),
        inserted_count: fresh.len(),
        errors,
    })
}

/// [`csv::parse_items`] followed by [`bulk_import`].
pub async fn import_csv(ledger: &Ledger, text: &str) -> Result<ImportReport, LedgerError> {
    let rows = csv::parse_items(text)?;
    bulk_import(ledger, &rows).await
}
