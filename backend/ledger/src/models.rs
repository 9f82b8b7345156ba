use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrizeType {
    Minor,
    Major,
    Grand,
}

impl PrizeType {
    pub const ALL: [PrizeType; 3] = [PrizeType::Minor, PrizeType::Major, PrizeType::Grand];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrizeType::Minor => "minor",
            PrizeType::Major => "major",
            PrizeType::Grand => "grand",
        }
    }
}

impl fmt::Display for PrizeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown prize type: {0}")]
pub struct UnknownPrizeType(pub String);

impl FromStr for PrizeType {
    type Err = UnknownPrizeType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minor" => Ok(PrizeType::Minor),
            "major" => Ok(PrizeType::Major),
            "grand" => Ok(PrizeType::Grand),
            other => Err(UnknownPrizeType(other.to_string())),
        }
    }
}

/// An attendee. The id is the email address, so one email registers once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: String,
    pub full_name: String,
    pub email: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaffleItem {
    pub id: String,
    pub name: String,
    pub description: String,
    pub prize_type: PrizeType,
}

/// Field changes for an existing item. The id never changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RaffleItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prize_type: Option<PrizeType>,
}

impl RaffleItemPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.prize_type.is_none()
    }
}

impl From<RaffleItem> for RaffleItemPatch {
    fn from(item: RaffleItem) -> Self {
        Self {
            name: Some(item.name),
            description: Some(item.description),
            prize_type: Some(item.prize_type),
        }
    }
}

/// A confirmed award. Prize name and type are copied at confirmation time,
/// later catalog edits or deletions do not touch them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Winner {
    pub id: String,
    pub registration_id: String,
    pub full_name: String,
    pub prize_id: String,
    pub prize_name: String,
    pub prize_type: PrizeType,
    pub round: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub confirmed_at: DateTime<Utc>,
}

/// A winner that has not been committed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWinner {
    pub registration_id: String,
    pub full_name: String,
    pub prize_id: String,
    pub prize_name: String,
    pub prize_type: PrizeType,
    pub round: u32,
}

impl NewWinner {
    pub fn id(&self) -> String {
        format!("{}-{}", self.round, self.registration_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationStatus {
    pub is_open: bool,
}

impl Default for RegistrationStatus {
    fn default() -> Self {
        Self { is_open: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prize_type_round_trips_through_text() {
        for prize_type in PrizeType::ALL {
            assert_eq!(prize_type.as_str().parse::<PrizeType>(), Ok(prize_type));
        }
        assert_eq!(
            "Grand".parse::<PrizeType>(),
            Err(UnknownPrizeType("Grand".to_string()))
        );
    }

    #[test]
    fn winner_id_joins_round_and_registration() {
        let winner = NewWinner {
            registration_id: "ana@example.com".to_string(),
            full_name: "Ana".to_string(),
            prize_id: "P1".to_string(),
            prize_name: "Toy".to_string(),
            prize_type: PrizeType::Minor,
            round: 3,
        };

        assert_eq!(winner.id(), "3-ana@example.com");
    }

    #[test]
    fn registration_status_defaults_open() {
        assert!(RegistrationStatus::default().is_open);
    }
}
