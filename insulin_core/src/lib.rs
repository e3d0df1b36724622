#![forbid(unsafe_code)]

//! Core domain model and business logic for the insulin tracker.
//!
//! This crate provides:
//! - Domain types (entry types, readings, recommendations, entries)
//! - The dosage advisor
//! - Entry drafts with submit validation
//! - Persistence (JSONL entry log, CSV archive, profile)
//! - Entry history

pub mod types;
pub mod error;
pub mod advisor;
pub mod draft;
pub mod config;
pub mod logging;
pub mod store;
pub mod csv_rollup;
pub mod history;
pub mod profile;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use advisor::{recommend, recommend_for_label, try_recommend, try_recommend_for_label};
pub use draft::EntryDraft;
pub use config::Config;
pub use store::{EntrySink, JsonlStore};
pub use history::load_recent_entries;
