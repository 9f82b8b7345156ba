use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
};
use ledger::{
    catalog::{self, ITEM_DELETED, ITEM_SAVED},
    import::{ImportReport, import_csv},
    models::{RaffleItem, RaffleItemPatch, Registration, RegistrationStatus, Winner},
    raffle::{Draft, RoundOverview},
    registration::register,
    validation::{RaffleItemDraft, RegistrationForm},
    views::{
        BoardEntry, DashboardStats, ListQuery, Page, PrizeFilter, RegistrationSort, WinnerSort,
        dashboard, participants, registration_page, winner_page,
    },
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::{
    error::AppError,
    extract::{self, Form, Query},
    state::AppState,
};

#[derive(Serialize)]
struct SuccessQuery<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    existing: Option<bool>,
}

pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<RegistrationForm>,
) -> Result<Redirect, AppError> {
    let registered = register(&state.ledger, state.notifier.as_ref(), &form).await?;

    let query = serde_urlencoded::to_string(SuccessQuery {
        name: registered.full_name(),
        existing: registered.is_existing().then_some(true),
    })
    .map_err(|e| AppError::InternalError(Box::new(e)))?;

    Ok(Redirect::to(&format!("/success?{query}")))
}

pub async fn registration_status_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RegistrationStatus>, AppError> {
    Ok(Json(state.ledger.registration_status().await?))
}

pub async fn set_registration_status_handler(
    State(state): State<Arc<AppState>>,
    extract::Json(status): extract::Json<RegistrationStatus>,
) -> Result<Json<Value>, AppError> {
    state.ledger.set_registration_status(status.is_open).await?;

    let word = if status.is_open { "open" } else { "closed" };
    info!("Registration is now {word}");

    Ok(Json(json!({
        "success": true,
        "message": format!("Registration is now {word}."),
    })))
}

pub async fn participants_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<BoardEntry>>, AppError> {
    Ok(Json(participants(&state.ledger).await?))
}

pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardStats>, AppError> {
    Ok(Json(dashboard(&state.ledger).await?))
}

pub async fn registrations_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery<RegistrationSort>>,
) -> Result<Json<Page<Registration>>, AppError> {
    let registrations = state.ledger.registrations().await?;
    Ok(Json(registration_page(registrations, &query)))
}

pub async fn winners_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery<WinnerSort>>,
) -> Result<Json<Page<Winner>>, AppError> {
    let winners = state.ledger.winners().await?;
    Ok(Json(winner_page(winners, &query)))
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct PrizeQuery {
    #[serde(rename = "type")]
    prize_type: PrizeFilter,
}

pub async fn items_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PrizeQuery>,
) -> Result<Json<Vec<RaffleItem>>, AppError> {
    Ok(Json(
        catalog::list_items(&state.ledger, query.prize_type).await?,
    ))
}

pub async fn create_item_handler(
    State(state): State<Arc<AppState>>,
    extract::Json(draft): extract::Json<RaffleItemDraft>,
) -> Result<impl IntoResponse, AppError> {
    let item = catalog::create_item(&state.ledger, &draft).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": ITEM_SAVED, "item": item })),
    ))
}

pub async fn replace_item_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    extract::Json(draft): extract::Json<RaffleItemDraft>,
) -> Result<Json<Value>, AppError> {
    let item = catalog::replace_item(&state.ledger, &id, &draft).await?;
    Ok(Json(json!({ "message": ITEM_SAVED, "item": item })))
}

pub async fn patch_item_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    extract::Json(patch): extract::Json<RaffleItemPatch>,
) -> Result<Json<Value>, AppError> {
    let item = catalog::update_item(&state.ledger, &id, &patch).await?;
    Ok(Json(json!({ "message": ITEM_SAVED, "item": item })))
}

pub async fn delete_item_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    catalog::delete_item(&state.ledger, &id).await?;
    Ok(Json(json!({ "message": ITEM_DELETED })))
}

/// Body is the CSV text itself.
pub async fn import_handler(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<Json<ImportReport>, AppError> {
    Ok(Json(import_csv(&state.ledger, &body).await?))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RaffleView {
    #[serde(flatten)]
    overview: RoundOverview,
    remaining_participants: usize,
    next_round: u32,
}

pub async fn raffle_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RaffleView>, AppError> {
    let session = state.raffle.lock().await;
    let snapshot = state.ledger.snapshot().await?;

    Ok(Json(RaffleView {
        overview: session.overview(),
        remaining_participants: snapshot.undrafted().len(),
        next_round: snapshot.next_round(),
    }))
}

#[derive(Deserialize)]
pub struct DraftRequest {
    count: usize,
}

pub async fn draft_handler(
    State(state): State<Arc<AppState>>,
    extract::Json(request): extract::Json<DraftRequest>,
) -> Result<Json<Draft>, AppError> {
    let mut session = state.raffle.lock().await;
    Ok(Json(session.draft(&state.ledger, request.count).await?))
}

pub async fn prizes_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PrizeQuery>,
) -> Result<Json<Vec<RaffleItem>>, AppError> {
    let session = state.raffle.lock().await;
    Ok(Json(
        session
            .available_prizes(&state.ledger, query.prize_type)
            .await?,
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    registration_id: String,
    #[serde(default)]
    prize_id: Option<String>,
}

pub async fn assign_handler(
    State(state): State<Arc<AppState>>,
    extract::Json(request): extract::Json<AssignRequest>,
) -> Result<Json<Draft>, AppError> {
    let mut session = state.raffle.lock().await;
    let draft = session
        .assign(
            &state.ledger,
            &request.registration_id,
            request.prize_id.as_deref(),
        )
        .await?;

    Ok(Json(draft))
}

pub async fn reset_handler(State(state): State<Arc<AppState>>) -> Json<RoundOverview> {
    let mut session = state.raffle.lock().await;
    session.reset();
    Json(session.overview())
}

pub async fn confirm_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let mut session = state.raffle.lock().await;
    let confirmed = session.confirm(&state.ledger).await?;

    Ok(Json(json!({
        "message": format!("Round {} winners have been saved.", confirmed.round),
        "round": confirmed.round,
        "winners": confirmed.winners,
    })))
}
