//! Raffle rounds.
//!
//! A round starts by drafting `k` participants at random from everyone who
//! has not won before, lets the operator hand each of them a prize, and ends
//! when the assignments are written as winners in one batch. The round
//! number is fixed when the draft is taken.
//!
//! [`RaffleSession`] owns the in-progress round. Nothing about it is stored,
//! a restart forgets an unconfirmed draft.
use std::collections::{BTreeMap, HashSet};

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    Ledger,
    error::LedgerError,
    models::{NewWinner, RaffleItem, Registration, Winner},
    views::PrizeFilter,
};

/// Everything a round needs, fetched in one go.
#[derive(Debug, Clone, Default)]
pub struct RaffleSnapshot {
    pub registrations: Vec<Registration>,
    pub items: Vec<RaffleItem>,
    pub winners: Vec<Winner>,
}

impl RaffleSnapshot {
    pub fn undrafted(&self) -> Vec<Registration> {
        undrafted(&self.registrations, &self.winners)
    }

    pub fn next_round(&self) -> u32 {
        next_round(&self.winners)
    }

    pub fn awarded_prize_ids(&self) -> HashSet<&str> {
        awarded_prize_ids(&self.winners)
    }

    pub fn unawarded_items(&self) -> Vec<&RaffleItem> {
        let awarded = self.awarded_prize_ids();
        self.items
            .iter()
            .filter(|item| !awarded.contains(item.id.as_str()))
            .collect()
    }
}

/// Registrations that never appear in a winner record.
pub fn undrafted(registrations: &[Registration], winners: &[Winner]) -> Vec<Registration> {
    let won: HashSet<&str> = winners
        .iter()
        .map(|winner| winner.registration_id.as_str())
        .collect();

    registrations
        .iter()
        .filter(|registration| !won.contains(registration.id.as_str()))
        .cloned()
        .collect()
}

pub fn next_round(winners: &[Winner]) -> u32 {
    winners.iter().map(|winner| winner.round).max().unwrap_or(0) + 1
}

fn awarded_prize_ids(winners: &[Winner]) -> HashSet<&str> {
    winners
        .iter()
        .map(|winner| winner.prize_id.as_str())
        .collect()
}

/// Fisher-Yates, walking down from the last index.
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

/// The first `count` of a shuffled pool.
pub fn draft_from<R: Rng + ?Sized>(
    mut pool: Vec<Registration>,
    count: usize,
    rng: &mut R,
) -> Vec<Registration> {
    shuffle(&mut pool, rng);
    pool.truncate(count);
    pool
}

/// Catalog items not won in an earlier round and not held by anyone in the
/// current one, narrowed by `filter`.
pub fn available_prizes(
    items: &[RaffleItem],
    winners: &[Winner],
    assignments: &BTreeMap<String, String>,
    filter: PrizeFilter,
) -> Vec<RaffleItem> {
    let awarded = awarded_prize_ids(winners);
    let assigned: HashSet<&str> = assignments.values().map(String::as_str).collect();

    items
        .iter()
        .filter(|item| !awarded.contains(item.id.as_str()))
        .filter(|item| !assigned.contains(item.id.as_str()))
        .filter(|item| filter.matches(item.prize_type))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub round: u32,
    pub participants: Vec<Registration>,
    /// Registration id to prize id.
    pub assignments: BTreeMap<String, String>,
}

impl Draft {
    fn participant(&self, registration_id: &str) -> Option<&Registration> {
        self.participants
            .iter()
            .find(|participant| participant.id == registration_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RoundState {
    #[default]
    Idle,
    Drafted(Draft),
    /// The winner batch is on its way to the store.
    Confirming(Draft),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Drafted,
    Confirming,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundOverview {
    pub phase: Phase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<Draft>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedRound {
    pub round: u32,
    pub winners: Vec<NewWinner>,
}

fn round_in_progress() -> LedgerError {
    LedgerError::rejected("A round is already in progress. Confirm or reset it first.")
}

fn no_round() -> LedgerError {
    LedgerError::rejected("No round in progress. Draft participants first.")
}

fn confirming() -> LedgerError {
    LedgerError::rejected("Winners for this round are being confirmed.")
}

pub struct RaffleSession {
    state: RoundState,
    rng: StdRng,
}

impl Default for RaffleSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RaffleSession {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self {
            state: RoundState::Idle,
            rng,
        }
    }

    pub fn state(&self) -> &RoundState {
        &self.state
    }

    pub fn overview(&self) -> RoundOverview {
        match &self.state {
            RoundState::Idle => RoundOverview {
                phase: Phase::Idle,
                draft: None,
            },
            RoundState::Drafted(draft) => RoundOverview {
                phase: Phase::Drafted,
                draft: Some(draft.clone()),
            },
            RoundState::Confirming(draft) => RoundOverview {
                phase: Phase::Confirming,
                draft: Some(draft.clone()),
            },
        }
    }

    fn drafted(&self) -> Result<&Draft, LedgerError> {
        match &self.state {
            RoundState::Drafted(draft) => Ok(draft),
            RoundState::Idle => Err(no_round()),
            RoundState::Confirming(_) => Err(confirming()),
        }
    }

    /// Samples `count` participants from the current undrafted pool and
    /// fixes the round number. Refused while another round is open.
    pub async fn draft(&mut self, ledger: &Ledger, count: usize) -> Result<Draft, LedgerError> {
        match self.state {
            RoundState::Idle => {}
            RoundState::Drafted(_) => return Err(round_in_progress()),
            RoundState::Confirming(_) => return Err(confirming()),
        }
        if count == 0 {
            return Err(LedgerError::rejected("Draw at least one winner."));
        }

        let snapshot = ledger.snapshot().await?;
        let pool = snapshot.undrafted();
        if count > pool.len() {
            return Err(LedgerError::rejected(format!(
                "Not enough participants. You can only draw up to {} winner(s).",
                pool.len()
            )));
        }

        let draft = Draft {
            round: snapshot.next_round(),
            participants: draft_from(pool, count, &mut self.rng),
            assignments: BTreeMap::new(),
        };
        info!(round = draft.round, drafted = count, "Round drafted");

        self.state = RoundState::Drafted(draft.clone());
        Ok(draft)
    }

    /// Prizes that can still go to someone in this round.
    pub async fn available_prizes(
        &self,
        ledger: &Ledger,
        filter: PrizeFilter,
    ) -> Result<Vec<RaffleItem>, LedgerError> {
        let (items, winners) = tokio::try_join!(ledger.raffle_items(), ledger.winners())?;

        let empty = BTreeMap::new();
        let assignments = match &self.state {
            RoundState::Idle => &empty,
            RoundState::Drafted(draft) | RoundState::Confirming(draft) => &draft.assignments,
        };

        Ok(available_prizes(&items, &winners, assignments, filter))
    }

    /// Gives `prize_id` to a drafted participant. A prize held by someone
    /// else in this round moves over. `None` or an empty id clears the
    /// participant's assignment.
    pub async fn assign(
        &mut self,
        ledger: &Ledger,
        registration_id: &str,
        prize_id: Option<&str>,
    ) -> Result<Draft, LedgerError> {
        let draft = self.drafted()?;
        if draft.participant(registration_id).is_none() {
            return Err(LedgerError::rejected(format!(
                "{registration_id} is not in the current draft."
            )));
        }

        let prize_id = prize_id.map(str::trim).filter(|id| !id.is_empty());
        if let Some(prize_id) = prize_id {
            let (item, winners) =
                tokio::try_join!(ledger.raffle_item(prize_id), ledger.winners())?;
            if item.is_none() || awarded_prize_ids(&winners).contains(prize_id) {
                return Err(LedgerError::rejected(format!(
                    "Prize {prize_id} is not available."
                )));
            }
        }

        let RoundState::Drafted(draft) = &mut self.state else {
            return Err(no_round());
        };

        match prize_id {
            Some(prize_id) => {
                draft.assignments.retain(|_, held| held != prize_id);
                draft
                    .assignments
                    .insert(registration_id.to_string(), prize_id.to_string());
                info!(round = draft.round, registration_id, prize_id, "Prize assigned");
            }
            None => {
                draft.assignments.remove(registration_id);
                info!(round = draft.round, registration_id, "Assignment cleared");
            }
        }

        Ok(draft.clone())
    }

    /// Drops the drafted pool and its assignments.
    pub fn reset(&mut self) {
        match std::mem::take(&mut self.state) {
            RoundState::Idle => {}
            RoundState::Drafted(draft) => info!(round = draft.round, "Round reset"),
            RoundState::Confirming(draft) => {
                warn!(round = draft.round, "Round reset while confirming")
            }
        }
    }

    /// Writes one winner per assignment in a single batch. On failure the
    /// draft stays as it was so the operator can try again.
    pub async fn confirm(&mut self, ledger: &Ledger) -> Result<ConfirmedRound, LedgerError> {
        let draft = self.drafted()?;
        if draft.assignments.is_empty() {
            return Err(LedgerError::rejected("No prizes assigned."));
        }

        let (items, winners) = tokio::try_join!(ledger.raffle_items(), ledger.winners())?;
        let awarded = awarded_prize_ids(&winners);
        let won: HashSet<&str> = winners
            .iter()
            .map(|winner| winner.registration_id.as_str())
            .collect();

        let mut new_winners = Vec::with_capacity(draft.assignments.len());
        for (registration_id, prize_id) in &draft.assignments {
            let Some(participant) = draft.participant(registration_id) else {
                return Err(no_round());
            };
            if won.contains(registration_id.as_str()) {
                return Err(LedgerError::rejected(format!(
                    "{} has already won a prize.",
                    participant.full_name
                )));
            }
            let prize = items
                .iter()
                .find(|item| &item.id == prize_id)
                .filter(|item| !awarded.contains(item.id.as_str()))
                .ok_or_else(|| {
                    LedgerError::rejected(format!("Prize {prize_id} is not available."))
                })?;

            new_winners.push(NewWinner {
                registration_id: registration_id.clone(),
                full_name: participant.full_name.clone(),
                prize_id: prize.id.clone(),
                prize_name: prize.name.clone(),
                prize_type: prize.prize_type,
                round: draft.round,
            });
        }
        let round = draft.round;

        if let RoundState::Drafted(draft) = std::mem::take(&mut self.state) {
            self.state = RoundState::Confirming(draft);
        }

        let result = ledger.add_winners(&new_winners).await;

        self.state = match (std::mem::take(&mut self.state), &result) {
            (RoundState::Confirming(_), Ok(())) => RoundState::Idle,
            (RoundState::Confirming(draft), Err(_)) => RoundState::Drafted(draft),
            (other, _) => other,
        };

        match result {
            Ok(()) => {
                info!(round, winners = new_winners.len(), "Round confirmed");
                Ok(ConfirmedRound {
                    round,
                    winners: new_winners,
                })
            }
            Err(e) => {
                warn!(round, "Round confirmation failed: {e}");
                Err(e)
            }
        }
    }
}
