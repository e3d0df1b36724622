//! Dosage recommendation.
//!
//! A reading is first bucketed into a clinical range whose boundaries depend
//! on the entry type, then `(entry type, bucket)` is looked up in a static
//! dose table. Breakfast and Lunch have no row above 250 mg/dL; those
//! readings get [`DosageRecommendation::NOT_FOUND`] rather than an
//! extrapolated dose.

use crate::types::{BloodSugarReading, DosageRecommendation, EntryType};
use crate::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Clinical range a reading falls into
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Bucket {
    Below80,
    From81To120,
    From121To150,
    From151To200,
    From121To160,
    From161To200,
    From201To250,
    Above250,
    /// Daily entries ignore the reading
    Any,
}

impl Bucket {
    pub fn label(&self) -> &'static str {
        match self {
            Bucket::Below80 => "<80",
            Bucket::From81To120 => "81:120",
            Bucket::From121To150 => "121:150",
            Bucket::From151To200 => "151:200",
            Bucket::From121To160 => "121:160",
            Bucket::From161To200 => "161:200",
            Bucket::From201To250 => "201:250",
            Bucket::Above250 => ">250",
            Bucket::Any => "any",
        }
    }
}

/// Bucket label used for entry types the table does not know
pub const UNKNOWN_BUCKET: &str = "NA";

/// One row of the dose table, for display
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DoseRow {
    pub entry_type: EntryType,
    pub bucket: Bucket,
    pub recommendation: DosageRecommendation,
}

const NO_INSULIN: &str = "No insulin required";
const HUMALOG: &str = "Humalog";
const LANTUS: &str = "Lantus";

/// Table rows in display order
const DOSE_ROWS: &[(EntryType, Bucket, &str, u32)] = &[
    (EntryType::Breakfast, Bucket::Below80, NO_INSULIN, 0),
    (EntryType::Breakfast, Bucket::From81To120, HUMALOG, 8),
    (EntryType::Breakfast, Bucket::From121To150, HUMALOG, 10),
    (EntryType::Breakfast, Bucket::From151To200, HUMALOG, 14),
    (EntryType::Breakfast, Bucket::From201To250, HUMALOG, 16),
    (EntryType::Lunch, Bucket::Below80, NO_INSULIN, 0),
    (EntryType::Lunch, Bucket::From81To120, HUMALOG, 8),
    (EntryType::Lunch, Bucket::From121To150, HUMALOG, 10),
    (EntryType::Lunch, Bucket::From151To200, HUMALOG, 14),
    (EntryType::Lunch, Bucket::From201To250, HUMALOG, 16),
    (EntryType::Dinner, Bucket::Below80, NO_INSULIN, 0),
    (EntryType::Dinner, Bucket::From81To120, HUMALOG, 4),
    (EntryType::Dinner, Bucket::From121To160, HUMALOG, 5),
    (EntryType::Dinner, Bucket::From161To200, HUMALOG, 6),
    (EntryType::Dinner, Bucket::From201To250, HUMALOG, 8),
    (EntryType::Dinner, Bucket::Above250, HUMALOG, 10),
    (EntryType::Daily, Bucket::Any, LANTUS, 16),
];

static DOSE_TABLE: Lazy<HashMap<(EntryType, Bucket), DosageRecommendation>> = Lazy::new(|| {
    DOSE_ROWS
        .iter()
        .map(|&(entry_type, bucket, message, units)| {
            ((entry_type, bucket), DosageRecommendation::new(message, units))
        })
        .collect()
});

/// Classify a reading into the range used for dose lookup
pub fn bucket_for(entry_type: EntryType, reading: BloodSugarReading) -> Bucket {
    let r = reading.value();
    match entry_type {
        EntryType::Breakfast | EntryType::Lunch => match r {
            0..=79 => Bucket::Below80,
            80..=120 => Bucket::From81To120,
            121..=150 => Bucket::From121To150,
            151..=200 => Bucket::From151To200,
            201..=250 => Bucket::From201To250,
            _ => Bucket::Above250,
        },
        EntryType::Dinner => match r {
            0..=79 => Bucket::Below80,
            80..=120 => Bucket::From81To120,
            121..=160 => Bucket::From121To160,
            161..=200 => Bucket::From161To200,
            201..=250 => Bucket::From201To250,
            _ => Bucket::Above250,
        },
        EntryType::Daily => Bucket::Any,
    }
}

/// Look up the dose for a reading, falling back to
/// [`DosageRecommendation::NOT_FOUND`] when the table has no row.
pub fn recommend(entry_type: EntryType, reading: BloodSugarReading) -> DosageRecommendation {
    try_recommend(entry_type, reading).unwrap_or(DosageRecommendation::NOT_FOUND)
}

/// Like [`recommend`], but reports a missing table row as an error.
pub fn try_recommend(
    entry_type: EntryType,
    reading: BloodSugarReading,
) -> Result<DosageRecommendation> {
    let bucket = bucket_for(entry_type, reading);
    DOSE_TABLE
        .get(&(entry_type, bucket))
        .copied()
        .ok_or_else(|| Error::NoRecommendationForRange {
            entry_type,
            bucket: bucket.label(),
        })
}

/// Recommend from entry-type text. Unrecognized text gets the fallback.
pub fn recommend_for_label(label: &str, reading: BloodSugarReading) -> DosageRecommendation {
    try_recommend_for_label(label, reading).unwrap_or(DosageRecommendation::NOT_FOUND)
}

/// Recommend from entry-type text, distinguishing an unknown entry type
/// from a missing table row.
pub fn try_recommend_for_label(
    label: &str,
    reading: BloodSugarReading,
) -> Result<DosageRecommendation> {
    let entry_type: EntryType = label.parse()?;
    try_recommend(entry_type, reading)
}

/// Bucket label for entry-type text, "NA" when the entry type is unknown
pub fn bucket_label_for(label: &str, reading: BloodSugarReading) -> &'static str {
    match label.parse::<EntryType>() {
        Ok(entry_type) => bucket_for(entry_type, reading).label(),
        Err(_) => UNKNOWN_BUCKET,
    }
}

/// All rows of the dose table in a stable order
pub fn dose_table() -> Vec<DoseRow> {
    DOSE_ROWS
        .iter()
        .map(|&(entry_type, bucket, message, units)| DoseRow {
            entry_type,
            bucket,
            recommendation: DosageRecommendation::new(message, units),
        })
        .collect()
}
