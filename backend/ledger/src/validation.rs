use std::{collections::BTreeMap, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{PrizeType, RaffleItem, RaffleItemPatch};

pub const MIN_FULL_NAME: usize = 2;
pub const MIN_ITEM_ID: usize = 1;
pub const MIN_ITEM_NAME: usize = 3;
pub const MIN_DESCRIPTION: usize = 3;

// no lookarounds in `regex`, leading and doubled dots are checked by hand
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_'+\-.]*[A-Za-z0-9_+\-]@([A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$")
        .expect("email pattern compiles")
});

pub fn is_valid_email(email: &str) -> bool {
    !email.starts_with('.') && !email.contains("..") && EMAIL.is_match(email)
}

/// Messages keyed by the camelCase field they belong to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().flat_map(|(field, messages)| {
            messages
                .iter()
                .map(move |message| (field.as_str(), message.as_str()))
        })
    }

    fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

fn too_short(value: &str, min: usize) -> bool {
    value.trim().chars().count() < min
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrationForm {
    pub full_name: String,
    pub email: String,
}

impl RegistrationForm {
    pub fn new(full_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            email: email.into(),
        }
    }

    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        if too_short(&self.full_name, MIN_FULL_NAME) {
            errors.add("fullName", "Full name must be at least 2 characters.");
        }
        if !is_valid_email(&self.email) {
            errors.add("email", "Please enter a valid email address.");
        }

        errors.into_result()
    }
}

/// Raw item fields as typed into the admin form or read from a CSV row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RaffleItemDraft {
    pub id: String,
    pub name: String,
    pub description: String,
    pub prize_type: String,
}

impl RaffleItemDraft {
    pub fn validate(&self) -> Result<RaffleItem, FieldErrors> {
        let mut errors = FieldErrors::new();

        if too_short(&self.id, MIN_ITEM_ID) {
            errors.add("id", "Item ID is required.");
        }
        check_name(&self.name, &mut errors);
        check_description(&self.description, &mut errors);
        let prize_type = parse_prize_type(&self.prize_type, &mut errors);

        match prize_type {
            Some(prize_type) if errors.is_empty() => Ok(RaffleItem {
                id: self.id.trim().to_string(),
                name: self.name.trim().to_string(),
                description: self.description.trim().to_string(),
                prize_type,
            }),
            _ => Err(errors),
        }
    }
}

impl RaffleItemPatch {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        if let Some(name) = &self.name {
            check_name(name, &mut errors);
        }
        if let Some(description) = &self.description {
            check_description(description, &mut errors);
        }

        errors.into_result()
    }
}

fn check_name(name: &str, errors: &mut FieldErrors) {
    if too_short(name, MIN_ITEM_NAME) {
        errors.add("name", "Item name must be at least 3 characters.");
    }
}

fn check_description(description: &str, errors: &mut FieldErrors) {
    if too_short(description, MIN_DESCRIPTION) {
        errors.add("description", "Description must be at least 3 characters.");
    }
}

fn parse_prize_type(raw: &str, errors: &mut FieldErrors) -> Option<PrizeType> {
    let raw = raw.trim();
    if raw.is_empty() {
        errors.add("prizeType", "Prize type is required.");
        return None;
    }

    raw.parse()
        .map_err(|_| {
            errors.add(
                "prizeType",
                "Prize type must be one of minor, major, or grand.",
            )
        })
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(id: &str, name: &str, description: &str, prize_type: &str) -> RaffleItemDraft {
        RaffleItemDraft {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            prize_type: prize_type.to_string(),
        }
    }

    #[test]
    fn test_emails() {
        assert!(is_valid_email("ana@example.com"));
        assert!(is_valid_email("first.last+tag@mail.example.org"));
        assert!(!is_valid_email("ana@"));
        assert!(!is_valid_email("ana.example.com"));
        assert!(!is_valid_email(".ana@example.com"));
        assert!(!is_valid_email("ana..b@example.com"));
        assert!(!is_valid_email("ana@example.c"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_registration_form() {
        assert!(RegistrationForm::new("Al", "al@example.com").validate().is_ok());

        let errors = RegistrationForm::new("A", "nope").validate().unwrap_err();
        assert_eq!(
            errors.get("fullName"),
            Some(&["Full name must be at least 2 characters.".to_string()][..])
        );
        assert_eq!(
            errors.get("email"),
            Some(&["Please enter a valid email address.".to_string()][..])
        );
    }

    #[test]
    fn test_item_draft() {
        let item = draft("P1", "Toy", "A toy", "minor").validate().unwrap();
        assert_eq!(item.prize_type, PrizeType::Minor);

        let errors = draft("", "To", "ab", "").validate().unwrap_err();
        assert_eq!(errors.iter().count(), 4);

        let errors = draft("P1", "Toy", "A toy", "huge").validate().unwrap_err();
        assert_eq!(
            errors.get("prizeType"),
            Some(&["Prize type must be one of minor, major, or grand.".to_string()][..])
        );
    }

    #[test]
    fn test_item_draft_is_trimmed() {
        let item = draft(" P1 ", "  Toy ", "A toy ", " minor").validate().unwrap();
        assert_eq!(item.id, "P1");
        assert_eq!(item.name, "Toy");
        assert_eq!(item.description, "A toy");

        let errors = draft("   ", "Toy", "A toy", "minor").validate().unwrap_err();
        assert!(errors.get("id").is_some());
    }

    #[test]
    fn test_patch_only_checks_present_fields() {
        assert!(RaffleItemPatch::default().validate().is_ok());

        let patch = RaffleItemPatch {
            name: Some("TV".to_string()),
            ..Default::default()
        };
        let errors = patch.validate().unwrap_err();
        assert!(errors.get("name").is_some());
        assert!(errors.get("description").is_none());
    }
}
