//! Read-only views: admin search, sort and pagination, prize filters, the
//! public participants board and the dashboard numbers.
use std::{cmp::Ordering, collections::HashMap};

use serde::{Deserialize, Serialize};

use crate::{
    Ledger,
    error::LedgerError,
    models::{PrizeType, RaffleItem, Registration, Winner},
    store::Direction,
};

pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrizeFilter {
    #[default]
    All,
    Grand,
    Major,
    Minor,
}

impl PrizeFilter {
    pub fn matches(&self, prize_type: PrizeType) -> bool {
        match self {
            PrizeFilter::All => true,
            PrizeFilter::Grand => prize_type == PrizeType::Grand,
            PrizeFilter::Major => prize_type == PrizeType::Major,
            PrizeFilter::Minor => prize_type == PrizeType::Minor,
        }
    }
}

pub fn filter_items(items: Vec<RaffleItem>, filter: PrizeFilter) -> Vec<RaffleItem> {
    items
        .into_iter()
        .filter(|item| filter.matches(item.prize_type))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RegistrationSort {
    FullName,
    Email,
    #[default]
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WinnerSort {
    FullName,
    PrizeName,
    PrizeType,
    Round,
    #[default]
    ConfirmedAt,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListQuery<S> {
    pub search: Option<String>,
    pub sort: S,
    pub direction: Direction,
    pub page: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
}

/// Pages are 1-based, out of range requests land on the nearest page.
pub fn paginate<T>(items: Vec<T>, page: usize) -> Page<T> {
    let total = items.len();
    let total_pages = total.div_ceil(PAGE_SIZE).max(1);
    let page = page.clamp(1, total_pages);

    let items = items
        .into_iter()
        .skip((page - 1) * PAGE_SIZE)
        .take(PAGE_SIZE)
        .collect();

    Page {
        items,
        page,
        total_pages,
        total,
    }
}

fn matches_search(search: Option<&str>, fields: &[&str]) -> bool {
    match search.map(str::trim).filter(|s| !s.is_empty()) {
        None => true,
        Some(search) => {
            let needle = search.to_lowercase();
            fields
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        }
    }
}

/// Case-insensitive first so `"ana"` sorts before `"Carlo"`.
fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn directed(ordering: Ordering, direction: Direction) -> Ordering {
    match direction {
        Direction::Asc => ordering,
        Direction::Desc => ordering.reverse(),
    }
}

pub fn registration_page(
    registrations: Vec<Registration>,
    query: &ListQuery<RegistrationSort>,
) -> Page<Registration> {
    let mut matched: Vec<Registration> = registrations
        .into_iter()
        .filter(|r| matches_search(query.search.as_deref(), &[&r.full_name, &r.email]))
        .collect();

    matched.sort_by(|a, b| {
        let ordering = match query.sort {
            RegistrationSort::FullName => compare_text(&a.full_name, &b.full_name),
            RegistrationSort::Email => compare_text(&a.email, &b.email),
            RegistrationSort::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        directed(ordering, query.direction)
    });

    paginate(matched, query.page.unwrap_or(1))
}

pub fn winner_page(winners: Vec<Winner>, query: &ListQuery<WinnerSort>) -> Page<Winner> {
    let mut matched: Vec<Winner> = winners
        .into_iter()
        .filter(|w| matches_search(query.search.as_deref(), &[&w.full_name, &w.prize_name]))
        .collect();

    matched.sort_by(|a, b| {
        let ordering = match query.sort {
            WinnerSort::FullName => compare_text(&a.full_name, &b.full_name),
            WinnerSort::PrizeName => compare_text(&a.prize_name, &b.prize_name),
            WinnerSort::PrizeType => a.prize_type.as_str().cmp(b.prize_type.as_str()),
            WinnerSort::Round => a.round.cmp(&b.round),
            WinnerSort::ConfirmedAt => a.confirmed_at.cmp(&b.confirmed_at),
        };
        directed(ordering, query.direction)
    });

    paginate(matched, query.page.unwrap_or(1))
}

/// One square of the public participants board. Emails stay private.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardEntry {
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prize_type: Option<PrizeType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prize_name: Option<String>,
}

/// Every registrant by name, winners marked with what they won.
pub fn participant_board(registrations: Vec<Registration>, winners: &[Winner]) -> Vec<BoardEntry> {
    let won: HashMap<&str, &Winner> = winners
        .iter()
        .map(|winner| (winner.registration_id.as_str(), winner))
        .collect();

    let mut board: Vec<BoardEntry> = registrations
        .into_iter()
        .map(|registration| {
            let winner = won.get(registration.id.as_str());
            BoardEntry {
                prize_type: winner.map(|w| w.prize_type),
                prize_name: winner.map(|w| w.prize_name.clone()),
                full_name: registration.full_name,
            }
        })
        .collect();

    board.sort_by(|a, b| compare_text(&a.full_name, &b.full_name));
    board
}

pub async fn participants(ledger: &Ledger) -> Result<Vec<BoardEntry>, LedgerError> {
    let (registrations, winners) = tokio::try_join!(ledger.registrations(), ledger.winners())?;
    Ok(participant_board(registrations, &winners))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_registrations: usize,
    pub registration_open: bool,
    pub total_winners: usize,
    pub remaining_participants: usize,
    pub next_round: u32,
    pub catalog_size: usize,
    pub unawarded_prizes: usize,
}

pub async fn dashboard(ledger: &Ledger) -> Result<DashboardStats, LedgerError> {
    let (snapshot, status) = tokio::try_join!(ledger.snapshot(), ledger.registration_status())?;

    Ok(DashboardStats {
        total_registrations: snapshot.registrations.len(),
        registration_open: status.is_open,
        total_winners: snapshot.winners.len(),
        remaining_participants: snapshot.undrafted().len(),
        next_round: snapshot.next_round(),
        catalog_size: snapshot.items.len(),
        unawarded_prizes: snapshot.unawarded_items().len(),
    })
}
