use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use insulin_core::advisor::{self, DoseRow};
use insulin_core::config::{EntryDefaults, DEFAULT_ADMINISTERED_BY, MAX_HISTORY_DAYS};
use insulin_core::history::find_last_entry_by_type;
use insulin_core::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "itrack")]
#[command(about = "Insulin dosage log and recommendation tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the dose table (default)
    Table,

    /// Recommend a dose without logging anything
    Recommend {
        /// Entry type (breakfast, lunch, dinner, daily)
        #[arg(long = "type")]
        entry_type: String,

        /// Blood sugar reading in mg/dL, digits only
        #[arg(long)]
        reading: String,
    },

    /// Recommend a dose and log the entry
    Log {
        /// Entry type (breakfast, lunch, dinner, daily)
        #[arg(long = "type")]
        entry_type: String,

        /// Blood sugar reading in mg/dL, digits only
        #[arg(long)]
        reading: String,

        /// Who administered the dose
        #[arg(long)]
        by: Option<String>,

        /// Time the reading was taken (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<String>,

        /// Free-text note
        #[arg(long)]
        note: Option<String>,

        /// Dry run - show recommendation without logging
        #[arg(long)]
        dry_run: bool,
    },

    /// List recent entries
    History {
        /// How many days back to look
        #[arg(long)]
        days: Option<i64>,

        /// Only show the most recent entry of this type
        #[arg(long)]
        last: Option<String>,
    },

    /// Roll up the entry log to CSV
    Rollup {
        /// Clean up processed logs after rollup
        #[arg(long)]
        cleanup: bool,
    },

    /// Show or edit the user profile
    Profile {
        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        /// male, female or other
        #[arg(long)]
        gender: Option<String>,
    },

    /// Show the effective configuration
    Config {
        /// Write it to the config file, which must not exist yet
        #[arg(long)]
        init: bool,
    },
}

/// File locations under the data directory
struct DataPaths {
    log_dir: PathBuf,
    log: PathBuf,
    csv: PathBuf,
    profile: PathBuf,
}

impl DataPaths {
    fn new(data_dir: &Path) -> Self {
        let log_dir = data_dir.join("log");
        Self {
            log: log_dir.join("entries.jsonl"),
            log_dir,
            csv: data_dir.join("entries.csv"),
            profile: data_dir.join("profile.json"),
        }
    }
}

fn main() -> Result<()> {
    insulin_core::logging::init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(data_dir) = cli.data_dir {
        config.data.data_dir = data_dir;
    }
    let paths = DataPaths::new(&config.data.data_dir);

    match cli.command {
        Some(Commands::Table) | None => cmd_table(),
        Some(Commands::Recommend {
            entry_type,
            reading,
        }) => cmd_recommend(&entry_type, &reading),
        Some(Commands::Log {
            entry_type,
            reading,
            by,
            at,
            note,
            dry_run,
        }) => cmd_log(
            &paths,
            &config,
            LogArgs {
                entry_type,
                reading,
                by,
                at,
                note,
                dry_run,
            },
        ),
        Some(Commands::History { days, last }) => cmd_history(
            &paths,
            days.unwrap_or(config.history.days),
            last.as_deref(),
        ),
        Some(Commands::Rollup { cleanup }) => cmd_rollup(&paths, cleanup),
        Some(Commands::Profile {
            first_name,
            last_name,
            gender,
        }) => cmd_profile(&paths, first_name, last_name, gender),
        Some(Commands::Config { init }) => cmd_config(&config, init),
    }
}

fn cmd_table() -> Result<()> {
    println!("\n  {:<10} {:<8} Recommendation", "Entry", "Range");
    println!("  ─────────────────────────────────────────");
    for DoseRow {
        entry_type,
        bucket,
        recommendation,
    } in advisor::dose_table()
    {
        println!(
            "  {:<10} {:<8} {}",
            entry_type.as_str(),
            bucket.label(),
            recommendation
        );
    }
    println!();
    println!("  Readings with no row get \"{}\".", DosageRecommendation::NOT_FOUND);
    Ok(())
}

fn cmd_recommend(entry_type: &str, reading: &str) -> Result<()> {
    let reading: BloodSugarReading = reading.parse()?;

    if entry_type.parse::<EntryType>().is_err() {
        eprintln!("Unknown entry type: {}. No dosage can be recommended.", entry_type);
    }

    let recommendation = recommend_for_label(entry_type, reading);
    display_recommendation(
        entry_type,
        reading,
        advisor::bucket_label_for(entry_type, reading),
        &recommendation,
    );
    Ok(())
}

struct LogArgs {
    entry_type: String,
    reading: String,
    by: Option<String>,
    at: Option<String>,
    note: Option<String>,
    dry_run: bool,
}

fn cmd_log(paths: &DataPaths, config: &Config, args: LogArgs) -> Result<()> {
    let entry_type: EntryType = args.entry_type.parse()?;
    let reading: BloodSugarReading = args.reading.parse()?;
    let now = Utc::now();

    let administered_by = match args.by {
        Some(by) => by,
        None => resolve_default_party(paths, config)?,
    };
    let defaults = EntryDefaults {
        entry_type: config.defaults.entry_type,
        administered_by: Some(administered_by),
    };

    let mut draft = EntryDraft::new(&defaults, now);
    draft.entry_type = entry_type;
    draft.set_reading(&reading.to_string());
    draft.note = args.note;
    if let Some(at) = args.at {
        draft.entry_time = DateTime::parse_from_rfc3339(&at)
            .map_err(|e| Error::Validation(format!("Invalid --at time {:?}: {}", at, e)))?
            .with_timezone(&Utc);
    }

    let recommendation = draft.calculate()?;
    if recommendation.is_not_found() {
        tracing::warn!(
            "No dose table row for {} at {} mg/dL",
            entry_type,
            reading
        );
    }
    display_recommendation(
        entry_type.as_str(),
        reading,
        advisor::bucket_for(entry_type, reading).label(),
        &recommendation,
    );

    if args.dry_run {
        println!("[Dry run - not logging entry]");
        return Ok(());
    }

    let entry = draft.submit(now)?;
    let mut store = JsonlStore::new(&paths.log);
    store.append(&entry)?;

    tracing::info!(
        "Logged {} entry {} to {:?}",
        entry.entry_type,
        entry.id,
        store.path()
    );
    println!("✓ Entry logged! ({})", entry.id);
    Ok(())
}

/// Configured default, then the profile name, then "Self"
fn resolve_default_party(paths: &DataPaths, config: &Config) -> Result<String> {
    if let Some(name) = &config.defaults.administered_by {
        return Ok(name.clone());
    }
    let profile = UserProfile::load(&paths.profile)?;
    Ok(profile
        .display_name()
        .unwrap_or_else(|| DEFAULT_ADMINISTERED_BY.to_string()))
}

fn cmd_history(paths: &DataPaths, days: i64, last: Option<&str>) -> Result<()> {
    if !(1..=MAX_HISTORY_DAYS).contains(&days) {
        return Err(Error::Validation(format!(
            "--days must be between 1 and {}, got {}",
            MAX_HISTORY_DAYS, days
        )));
    }
    let last = last.map(|t| t.parse::<EntryType>()).transpose()?;

    let entries = load_recent_entries(&paths.log, &paths.csv, days)?;

    if let Some(entry_type) = last {
        match find_last_entry_by_type(&entries, entry_type) {
            Some(entry) => {
                println!();
                print_entry(entry);
                println!();
            }
            None => println!("No {} entries in the last {} days.", entry_type, days),
        }
        return Ok(());
    }

    if entries.is_empty() {
        println!("No entries in the last {} days.", days);
        return Ok(());
    }

    println!("\n  Entries from the last {} days\n", days);
    for entry in &entries {
        print_entry(entry);
    }
    println!("\n  {} entries", entries.len());
    Ok(())
}

fn print_entry(entry: &SubmittedEntry) {
    let when = entry.entry_time.with_timezone(&Local);
    println!(
        "  {}  {:<10} {:>4} mg/dL  by {}",
        when.format("%Y-%m-%d %H:%M"),
        entry.entry_type.as_str(),
        entry.reading.value(),
        entry.administering_party
    );
    if let Some(note) = &entry.note {
        println!("      {}", note);
    }
}

fn cmd_rollup(paths: &DataPaths, cleanup: bool) -> Result<()> {
    if !paths.log.exists() {
        println!("No entry log found - nothing to roll up.");
        return Ok(());
    }

    let count = insulin_core::csv_rollup::wal_to_csv_and_archive(&paths.log, &paths.csv)?;

    println!("✓ Rolled up {} entries to CSV", count);
    println!("  CSV: {}", paths.csv.display());

    if cleanup {
        let cleaned = insulin_core::csv_rollup::cleanup_processed_logs(&paths.log_dir)?;
        if cleaned > 0 {
            println!("✓ Cleaned up {} processed logs", cleaned);
        }
    }

    Ok(())
}

fn cmd_profile(
    paths: &DataPaths,
    first_name: Option<String>,
    last_name: Option<String>,
    gender: Option<String>,
) -> Result<()> {
    let gender = gender.map(|g| g.parse::<Gender>()).transpose()?;

    let profile = if first_name.is_none() && last_name.is_none() && gender.is_none() {
        UserProfile::load(&paths.profile)?
    } else {
        let profile = UserProfile::update(&paths.profile, |p| {
            if let Some(first) = first_name {
                p.first_name = first;
            }
            if let Some(last) = last_name {
                p.last_name = last;
            }
            if gender.is_some() {
                p.gender = gender;
            }
            Ok(())
        })?;
        println!("✓ Profile saved");
        profile
    };

    println!("  Name:   {}", profile.display_name().unwrap_or_else(|| "(not set)".into()));
    match profile.gender {
        Some(g) => println!("  Gender: {:?}", g),
        None => println!("  Gender: (not set)"),
    }
    Ok(())
}

fn cmd_config(config: &Config, init: bool) -> Result<()> {
    let path = Config::config_path();

    if init {
        if path.exists() {
            return Err(Error::Config(format!(
                "Config file {:?} already exists",
                path
            )));
        }
        config.save()?;
        println!("✓ Wrote config to {}", path.display());
        return Ok(());
    }

    let status = if path.exists() { "" } else { " (not found, using defaults)" };
    println!("  Config file:    {}{}", path.display(), status);
    println!("  Data dir:       {}", config.data.data_dir.display());
    println!("  Entry type:     {}", config.defaults.entry_type);
    println!(
        "  Administered by: {}",
        config
            .defaults
            .administered_by
            .as_deref()
            .unwrap_or("(profile name, then Self)")
    );
    println!("  History days:   {}", config.history.days);
    Ok(())
}

fn display_recommendation(
    entry_type: &str,
    reading: BloodSugarReading,
    range: &str,
    recommendation: &DosageRecommendation,
) {
    println!();
    println!("  {} reading: {} mg/dL (range {})", entry_type, reading, range);
    println!("  → {}", recommendation);
    println!();
}
