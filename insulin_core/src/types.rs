//! Core domain types for the insulin tracker.
//!
//! This module defines the fundamental types used throughout the system:
//! - Entry types and blood-sugar readings
//! - Dosage recommendations
//! - Submitted (persisted) entries
//! - The user profile

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::IntErrorKind;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Entry Types
// ============================================================================

/// Meal or context category of a blood-sugar reading
#[derive(
    Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub enum EntryType {
    Breakfast,
    Lunch,
    Dinner,
    #[default]
    Daily,
}

impl EntryType {
    /// All entry types in display order
    pub const ALL: [EntryType; 4] = [
        EntryType::Breakfast,
        EntryType::Lunch,
        EntryType::Dinner,
        EntryType::Daily,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Breakfast => "Breakfast",
            EntryType::Lunch => "Lunch",
            EntryType::Dinner => "Dinner",
            EntryType::Daily => "Daily",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = crate::Error;

    /// Case-insensitive. "Other" is not accepted; the canonical name is "Daily".
    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "breakfast" => Ok(EntryType::Breakfast),
            "lunch" => Ok(EntryType::Lunch),
            "dinner" => Ok(EntryType::Dinner),
            "daily" => Ok(EntryType::Daily),
            _ => Err(crate::Error::UnknownEntryType(s.to_string())),
        }
    }
}

// ============================================================================
// Blood Sugar Reading
// ============================================================================

/// A blood-sugar reading in mg/dL, entered as digits-only text
///
/// Persisted as a string of digits to match the record shape the entry
/// form produces. Digit strings too large for a `u32` saturate at
/// `u32::MAX`, which lands in the top range like any other high reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BloodSugarReading(pub u32);

impl BloodSugarReading {
    pub fn value(self) -> u32 {
        self.0
    }

    /// Drop every non-digit character, as the reading field does on each keystroke.
    pub fn sanitize(input: &str) -> String {
        input.chars().filter(|c| c.is_ascii_digit()).collect()
    }
}

impl From<u32> for BloodSugarReading {
    fn from(value: u32) -> Self {
        BloodSugarReading(value)
    }
}

impl FromStr for BloodSugarReading {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(crate::Error::InvalidReading(s.to_string()));
        }
        match s.parse::<u32>() {
            Ok(value) => Ok(BloodSugarReading(value)),
            Err(e) if *e.kind() == IntErrorKind::PosOverflow => Ok(BloodSugarReading(u32::MAX)),
            Err(_) => Err(crate::Error::InvalidReading(s.to_string())),
        }
    }
}

impl TryFrom<String> for BloodSugarReading {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        value.parse()
    }
}

impl From<BloodSugarReading> for String {
    fn from(reading: BloodSugarReading) -> Self {
        reading.0.to_string()
    }
}

impl fmt::Display for BloodSugarReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Dosage Recommendation
// ============================================================================

/// Drug (or refusal) message paired with a dose in units
///
/// Computed on demand and never persisted.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub struct DosageRecommendation {
    pub message: &'static str,
    pub units: u32,
}

impl DosageRecommendation {
    /// Fallback returned when the dose table has no matching row
    pub const NOT_FOUND: DosageRecommendation = DosageRecommendation {
        message: "No dosage found",
        units: 0,
    };

    pub const fn new(message: &'static str, units: u32) -> Self {
        Self { message, units }
    }

    pub fn is_not_found(&self) -> bool {
        *self == Self::NOT_FOUND
    }
}

impl fmt::Display for DosageRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.units > 0 {
            write!(f, "{} {}", self.message, self.units)
        } else {
            f.write_str(self.message)
        }
    }
}

// ============================================================================
// Submitted Entry
// ============================================================================

/// A logged reading, as appended to the entry store
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedEntry {
    pub id: Uuid,
    pub reading: BloodSugarReading,
    pub administering_party: String,
    pub entry_type: EntryType,
    /// Time the reading was taken, as chosen by the operator
    pub entry_time: DateTime<Utc>,
    pub submitted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

// ============================================================================
// Profile
// ============================================================================

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl FromStr for Gender {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            _ => Err(crate::Error::Validation(format!("Unknown gender: {}", s))),
        }
    }
}

/// The operator's profile, as edited on the settings screen
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct UserProfile {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub gender: Option<Gender>,
}

impl UserProfile {
    /// "First Last", or `None` when both names are blank
    pub fn display_name(&self) -> Option<String> {
        let name = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let name = name.trim();
        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_type_parse_is_case_insensitive() {
        assert_eq!("breakfast".parse::<EntryType>().unwrap(), EntryType::Breakfast);
        assert_eq!("LUNCH".parse::<EntryType>().unwrap(), EntryType::Lunch);
        assert_eq!(" Dinner ".parse::<EntryType>().unwrap(), EntryType::Dinner);
        assert_eq!("daily".parse::<EntryType>().unwrap(), EntryType::Daily);
    }

    #[test]
    fn test_entry_type_other_is_not_an_alias() {
        let err = "Other".parse::<EntryType>().unwrap_err();
        assert!(matches!(err, crate::Error::UnknownEntryType(ref s) if s == "Other"));
    }

    #[test]
    fn test_reading_parse() {
        assert_eq!("0".parse::<BloodSugarReading>().unwrap().value(), 0);
        assert_eq!("150".parse::<BloodSugarReading>().unwrap().value(), 150);
        assert!("".parse::<BloodSugarReading>().is_err());
        assert!("12a".parse::<BloodSugarReading>().is_err());
        assert!("-5".parse::<BloodSugarReading>().is_err());
        assert!(" 90".parse::<BloodSugarReading>().is_err());
    }

    #[test]
    fn test_huge_reading_saturates() {
        let reading = "5000000000".parse::<BloodSugarReading>().unwrap();
        assert_eq!(reading.value(), u32::MAX);
        assert_eq!(
            "4294967295".parse::<BloodSugarReading>().unwrap().value(),
            u32::MAX
        );
        assert_eq!(
            crate::advisor::recommend(EntryType::Dinner, reading),
            DosageRecommendation::new("Humalog", 10)
        );
        assert!(crate::advisor::recommend(EntryType::Lunch, reading).is_not_found());
    }

    #[test]
    fn test_reading_sanitize_keeps_digits_only() {
        assert_eq!(BloodSugarReading::sanitize("1a2.3-"), "123");
        assert_eq!(BloodSugarReading::sanitize("abc"), "");
        assert_eq!(BloodSugarReading::sanitize("١٢٣"), "");
    }

    #[test]
    fn test_display_rule() {
        assert_eq!(DosageRecommendation::new("Humalog", 8).to_string(), "Humalog 8");
        assert_eq!(
            DosageRecommendation::new("No insulin required", 0).to_string(),
            "No insulin required"
        );
        assert_eq!(DosageRecommendation::NOT_FOUND.to_string(), "No dosage found");
    }

    #[test]
    fn test_submitted_entry_record_shape() {
        let entry = SubmittedEntry {
            id: Uuid::new_v4(),
            reading: BloodSugarReading(142),
            administering_party: "Self".into(),
            entry_type: EntryType::Lunch,
            entry_time: Utc::now(),
            submitted_at: Utc::now(),
            note: None,
        };

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["reading"], "142");
        assert_eq!(value["administeringParty"], "Self");
        assert_eq!(value["entryType"], "Lunch");
        assert!(value["submittedAt"].is_string());
        assert!(value.get("note").is_none());
    }

    #[test]
    fn test_submitted_entry_rejects_bad_reading() {
        let json = r#"{"id":"6f1c1a8e-6a34-4b0e-9a8e-0c2a4c1f0d11","reading":"12x",
            "administeringParty":"Self","entryType":"Daily",
            "entryTime":"2024-01-01T08:00:00Z","submittedAt":"2024-01-01T08:00:00Z"}"#;
        assert!(serde_json::from_str::<SubmittedEntry>(json).is_err());
    }

    #[test]
    fn test_profile_display_name() {
        let mut profile = UserProfile::default();
        assert_eq!(profile.display_name(), None);

        profile.first_name = "Ada".into();
        assert_eq!(profile.display_name(), Some("Ada".into()));

        profile.last_name = " Lovelace ".into();
        assert_eq!(profile.display_name(), Some("Ada Lovelace".into()));
    }
}
