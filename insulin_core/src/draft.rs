//! An entry being filled in, before it is submitted.

use crate::advisor;
use crate::config::{EntryDefaults, DEFAULT_ADMINISTERED_BY};
use crate::{BloodSugarReading, DosageRecommendation, EntryType, Error, Result, SubmittedEntry};
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq)]
pub struct EntryDraft {
    pub entry_type: EntryType,
    reading: String,
    pub entry_time: DateTime<Utc>,
    pub administered_by: String,
    pub note: Option<String>,
}

impl EntryDraft {
    pub fn new(defaults: &EntryDefaults, now: DateTime<Utc>) -> Self {
        Self {
            entry_type: defaults.entry_type,
            reading: String::new(),
            entry_time: now,
            administered_by: defaults
                .administered_by
                .clone()
                .unwrap_or_else(|| DEFAULT_ADMINISTERED_BY.to_string()),
            note: None,
        }
    }

    /// Current reading text, digits only
    pub fn reading(&self) -> &str {
        &self.reading
    }

    /// Set the reading text, dropping any non-digit characters
    pub fn set_reading(&mut self, input: &str) {
        self.reading = BloodSugarReading::sanitize(input);
    }

    pub fn can_calculate(&self) -> bool {
        !self.reading.is_empty()
    }

    pub fn can_submit(&self) -> bool {
        self.can_calculate() && !self.administered_by.trim().is_empty()
    }

    fn parsed_reading(&self) -> Result<BloodSugarReading> {
        if !self.can_calculate() {
            return Err(Error::Validation("a blood sugar reading is required".into()));
        }
        self.reading.parse()
    }

    /// Recommend a dose for the current entry type and reading
    pub fn calculate(&self) -> Result<DosageRecommendation> {
        let reading = self.parsed_reading()?;
        Ok(advisor::recommend(self.entry_type, reading))
    }

    /// Turn the draft into a record ready for the entry store
    pub fn submit(&self, now: DateTime<Utc>) -> Result<SubmittedEntry> {
        let reading = self.parsed_reading()?;
        if !self.can_submit() {
            return Err(Error::Validation("administering party is required".into()));
        }

        Ok(SubmittedEntry {
            id: Uuid::new_v4(),
            reading,
            administering_party: self.administered_by.trim().to_string(),
            entry_type: self.entry_type,
            entry_time: self.entry_time,
            submitted_at: now,
            note: self
                .note
                .as_ref()
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn draft() -> EntryDraft {
        EntryDraft::new(&EntryDefaults::default(), Utc::now())
    }

    #[test]
    fn test_new_draft_uses_defaults() {
        let d = draft();
        assert_eq!(d.entry_type, EntryType::Daily);
        assert_eq!(d.administered_by, "Self");
        assert_eq!(d.reading(), "");
        assert!(!d.can_calculate());
        assert!(!d.can_submit());
    }

    #[test]
    fn test_set_reading_filters_non_digits() {
        let mut d = draft();
        d.set_reading("1x4-2");
        assert_eq!(d.reading(), "142");
        assert!(d.can_calculate());
    }

    #[test]
    fn test_calculate_requires_reading() {
        let d = draft();
        assert!(matches!(d.calculate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_calculate_uses_advisor() {
        let mut d = draft();
        d.entry_type = EntryType::Dinner;
        d.set_reading("175");
        assert_eq!(d.calculate().unwrap(), DosageRecommendation::new("Humalog", 6));
    }

    #[test]
    fn test_submit_requires_administering_party() {
        let mut d = draft();
        d.set_reading("100");
        d.administered_by = "  ".into();
        assert!(!d.can_submit());
        assert!(matches!(d.submit(Utc::now()), Err(Error::Validation(_))));
    }

    #[test]
    fn test_submit_builds_entry() {
        let now = Utc::now();
        let mut d = draft();
        d.entry_type = EntryType::Breakfast;
        d.set_reading("95");
        d.entry_time = now - Duration::minutes(30);
        d.note = Some("  ".into());

        let entry = d.submit(now).unwrap();
        assert_eq!(entry.reading, BloodSugarReading(95));
        assert_eq!(entry.entry_type, EntryType::Breakfast);
        assert_eq!(entry.administering_party, "Self");
        assert_eq!(entry.entry_time, now - Duration::minutes(30));
        assert_eq!(entry.submitted_at, now);
        assert_eq!(entry.note, None);

        let again = d.submit(now).unwrap();
        assert_ne!(entry.id, again.id);
    }
}
