//! # Ledger
//!
//! Everything the raffle knows about lives here: registrations, the prize
//! catalog, confirmed winners and the registration-open flag.
//!
//!
//!
//! ## Collections
//!
//! - `registrations`: keyed by email, `{ fullName, email, createdAt }`
//! - `raffleItems`: keyed by the organizer supplied id, `{ name, description, prizeType }`
//! - `winners`: keyed by `<round>-<registrationId>`, denormalized prize snapshot plus `confirmedAt`
//! - `settings`: singleton `registration` document holding `{ isOpen }`
//!
//! Timestamps are server assigned on commit, stored as epoch milliseconds.
//!
//!
//!
//! ## Layers
//!
//! - [`store`]: the document store seam, with an in-memory backend and a Redis backend
//! - [`Ledger`]: typed reads and writes over the store, every failure classified once
//! - [`registration`], [`catalog`], [`import`], [`raffle`]: the business rules
//! - [`views`]: admin list search/sort/pagination and dashboard numbers
//!
//!
//!
//! ## Raffle Rounds
//!
//! - Undrafted pool is recomputed from persisted winners at every round start
//! - Drafting is a Fisher-Yates shuffle of the pool, first `k` taken
//! - Prizes are assigned by hand, at most one holder per prize at any instant
//! - Confirming writes every winner of the round in one atomic batch
//! - Only one operator session is assumed, nothing guards two sessions racing

pub mod catalog;
pub mod csv;
pub mod data;
pub mod diagnostics;
pub mod error;
pub mod import;
pub mod models;
pub mod notify;
pub mod raffle;
pub mod registration;
pub mod store;
pub mod validation;
pub mod views;

pub use data::Ledger;
pub use error::{ErrorKind, LedgerError};
