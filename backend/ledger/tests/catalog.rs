mod common;

use common::{draft, ledger, stock};
use ledger::{
    ErrorKind, LedgerError,
    catalog::{create_item, delete_item, list_items, replace_item, update_item},
    models::{PrizeType, RaffleItem, RaffleItemPatch},
    views::PrizeFilter,
};

#[tokio::test]
async fn create_refuses_a_taken_id() {
    let (_, ledger) = ledger();
    create_item(&ledger, &draft("P1", "Toy car", "minor"))
        .await
        .unwrap();

    let err = create_item(&ledger, &draft("P1", "Bicycle", "major"))
        .await
        .unwrap_err();

    match err {
        LedgerError::Conflict { message, errors } => {
            assert_eq!(message, "This Item ID is already in use.");
            assert_eq!(
                errors.get("id"),
                Some(&["This Item ID must be unique.".to_string()][..])
            );
        }
        other => panic!("expected conflict, got {other:?}"),
    }

    let stored = ledger.raffle_item("P1").await.unwrap().unwrap();
    assert_eq!(stored.name, "Toy car");
}

#[tokio::test]
async fn padded_id_collides_with_the_stored_one() {
    let (_, ledger) = ledger();
    let created = create_item(&ledger, &draft(" P1 ", "Toy car", "minor"))
        .await
        .unwrap();
    assert_eq!(created.id, "P1");

    let err = create_item(&ledger, &draft("P1", "Bicycle", "major"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn create_validates_before_writing() {
    let (store, ledger) = ledger();

    let err = create_item(&ledger, &draft("", "TV", "mega"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(store.commit_count(), 0);
}

#[tokio::test]
async fn patch_changes_only_given_fields() {
    let (_, ledger) = ledger();
    stock(&ledger, &[("P1", "Toy car", "minor")]).await;

    let patch = RaffleItemPatch {
        prize_type: Some(PrizeType::Grand),
        ..Default::default()
    };
    let updated = update_item(&ledger, "P1", &patch).await.unwrap();

    assert_eq!(updated.id, "P1");
    assert_eq!(updated.name, "Toy car");
    assert_eq!(updated.prize_type, PrizeType::Grand);
}

#[tokio::test]
async fn replace_keeps_the_path_id() {
    let (_, ledger) = ledger();
    stock(&ledger, &[("P1", "Toy car", "minor")]).await;

    let updated = replace_item(&ledger, "P1", &draft("P9", "Race car", "major"))
        .await
        .unwrap();

    assert_eq!(updated.id, "P1");
    assert_eq!(updated.name, "Race car");
    assert!(ledger.raffle_item("P9").await.unwrap().is_none());
}

#[tokio::test]
async fn update_requires_an_existing_item() {
    let (_, ledger) = ledger();

    let patch = RaffleItemPatch {
        name: Some("Robot".to_string()),
        ..Default::default()
    };
    let err = update_item(&ledger, "P404", &patch).await.unwrap_err();

    assert!(matches!(err, LedgerError::NotFound(path) if path == "raffleItems/P404"));
}

#[tokio::test]
async fn delete_is_unconditional() {
    let (_, ledger) = ledger();
    stock(&ledger, &[("P1", "Toy car", "minor")]).await;

    delete_item(&ledger, "P1").await.unwrap();
    delete_item(&ledger, "P1").await.unwrap();

    assert!(ledger.raffle_items().await.unwrap().is_empty());
}

#[tokio::test]
async fn list_is_sorted_by_name_and_filtered() {
    let (_, ledger) = ledger();
    stock(
        &ledger,
        &[
            ("P1", "Toaster", "minor"),
            ("P2", "Bicycle", "major"),
            ("P3", "Car", "grand"),
            ("P4", "Apron", "minor"),
        ],
    )
    .await;

    let names = |items: Vec<RaffleItem>| {
        items.into_iter().map(|item| item.name).collect::<Vec<_>>()
    };

    assert_eq!(
        names(list_items(&ledger, PrizeFilter::All).await.unwrap()),
        ["Apron", "Bicycle", "Car", "Toaster"]
    );
    assert_eq!(
        names(list_items(&ledger, PrizeFilter::Minor).await.unwrap()),
        ["Apron", "Toaster"]
    );
}
