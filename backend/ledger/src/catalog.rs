//! Prize catalog writes. Ids are chosen by the admin and never change once
//! an item exists.
use tracing::info;

use crate::{
    Ledger,
    error::{LedgerError, REVIEW_ENTRIES},
    models::{RaffleItem, RaffleItemPatch},
    validation::{FieldErrors, RaffleItemDraft},
    views::{PrizeFilter, filter_items},
};

pub const ITEM_SAVED: &str = "Item saved successfully.";
pub const ITEM_DELETED: &str = "Item deleted successfully.";

fn item_path(id: &str) -> String {
    format!("raffleItems/{id}")
}

pub async fn list_items(
    ledger: &Ledger,
    filter: PrizeFilter,
) -> Result<Vec<RaffleItem>, LedgerError> {
    Ok(filter_items(ledger.raffle_items().await?, filter))
}

/// Refuses an id that is already taken instead of overwriting it.
pub async fn create_item(
    ledger: &Ledger,
    draft: &RaffleItemDraft,
) -> Result<RaffleItem, LedgerError> {
    let item = draft.validate().map_err(LedgerError::validation)?;

    if ledger.raffle_item(&item.id).await?.is_some() {
        return Err(LedgerError::Conflict {
            message: "This Item ID is already in use.".to_string(),
            errors: FieldErrors::single("id", "This Item ID must be unique."),
        });
    }

    ledger.add_raffle_item(&item).await?;
    info!(id = %item.id, "Raffle item created");

    Ok(item)
}

/// Full edit of an existing item. The id in the path wins over any id in
/// the body.
pub async fn replace_item(
    ledger: &Ledger,
    id: &str,
    draft: &RaffleItemDraft,
) -> Result<RaffleItem, LedgerError> {
    let draft = RaffleItemDraft {
        id: id.to_string(),
        ..draft.clone()
    };
    let item = draft.validate().map_err(LedgerError::validation)?;

    update_item(ledger, id, &RaffleItemPatch::from(item)).await
}

/// Changes only the fields present in `patch`.
pub async fn update_item(
    ledger: &Ledger,
    id: &str,
    patch: &RaffleItemPatch,
) -> Result<RaffleItem, LedgerError> {
    patch.validate().map_err(LedgerError::validation)?;
    if patch.is_empty() {
        return Err(LedgerError::Validation {
            message: REVIEW_ENTRIES.to_string(),
            errors: FieldErrors::single("form", "Nothing to update."),
        });
    }

    if ledger.raffle_item(id).await?.is_none() {
        return Err(LedgerError::NotFound(item_path(id)));
    }

    ledger.update_raffle_item(id, patch).await?;
    info!(id, "Raffle item updated");

    ledger
        .raffle_item(id)
        .await?
        .ok_or_else(|| LedgerError::NotFound(item_path(id)))
}

/// Unconditional. Winners keep their own copy of the prize name and type.
pub async fn delete_item(ledger: &Ledger, id: &str) -> Result<(), LedgerError> {
    ledger.delete_raffle_item(id).await?;
    info!(id, "Raffle item deleted");
    Ok(())
}
