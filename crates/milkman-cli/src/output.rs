//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)
//!
//! Sync status goes to stderr so it never mixes with command output.

use chrono::{DateTime, Local, Utc};

use milkman_core::ledger::RECENT_LIMIT;
use milkman_core::sync::{LoadOutcome, StatusLevel, StatusReporter, SyncEvent, TracingReporter};
use milkman_core::{HistoryRecord, Ledger, RecordKind};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
    /// Stock at or below this count is flagged as low
    pub low_threshold: u32,
}

impl Output {
    pub fn new(format: OutputFormat, low_threshold: u32) -> Self {
        Self {
            format,
            low_threshold,
        }
    }

    /// Print the stock count and the most recent history
    pub fn print_ledger(&self, ledger: &Ledger, sync: &str) {
        let recent: Vec<&HistoryRecord> = ledger.recent(RECENT_LIMIT).collect();
        let low = ledger.is_low(self.low_threshold);

        match self.format {
            OutputFormat::Human => {
                println!("Milk in stock: {}", ledger.current_count());
                if low {
                    println!("⚠ Running low ({} or fewer left)", self.low_threshold);
                }
                println!();
                if recent.is_empty() {
                    println!("No history yet.");
                } else {
                    println!("Recent:");
                    for record in &recent {
                        println!("  {}", format_record(record));
                    }
                }
                if ledger.can_undo() {
                    println!("(`milkman undo` reverts the last change)");
                }
                println!();
                println!("Sync: {}", sync);
            }
            OutputFormat::Json => {
                println!("{}", self.ledger_json(ledger, sync));
            }
            OutputFormat::Quiet => {
                println!("{}", ledger.current_count());
            }
        }
    }

    fn ledger_json(&self, ledger: &Ledger, sync: &str) -> serde_json::Value {
        let recent: Vec<&HistoryRecord> = ledger.recent(RECENT_LIMIT).collect();
        serde_json::json!({
            "count": ledger.current_count(),
            "low": ledger.is_low(self.low_threshold),
            "version": ledger.version(),
            "recent": recent,
            "can_undo": ledger.can_undo(),
            "sync": sync
        })
    }

    /// Print the outcome of a stock change
    pub fn print_change(&self, message: &str, ledger: &Ledger) {
        let low = ledger.is_low(self.low_threshold);

        match self.format {
            OutputFormat::Human => {
                println!("✓ {} ({} in stock)", message, ledger.current_count());
                if low {
                    println!("⚠ Running low ({} or fewer left)", self.low_threshold);
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "status": "success",
                        "message": message,
                        "count": ledger.current_count(),
                        "low": low,
                        "version": ledger.version()
                    })
                );
            }
            OutputFormat::Quiet => {
                println!("{}", ledger.current_count());
            }
        }
    }

    /// Print history records, newest first
    pub fn print_history<'a>(&self, records: impl Iterator<Item = &'a HistoryRecord>) {
        let records: Vec<&HistoryRecord> = records.collect();

        match self.format {
            OutputFormat::Human => {
                if records.is_empty() {
                    println!("No history yet.");
                    return;
                }
                for record in &records {
                    println!("{}", format_record(record));
                }
                println!("\n{} record(s)", records.len());
            }
            OutputFormat::Json => {
                println!("{}", serde_json::json!(records));
            }
            OutputFormat::Quiet => {
                for record in &records {
                    println!("{}", describe(record));
                }
            }
        }
    }

    /// Print a sync status event
    pub fn print_event(&self, event: &SyncEvent) {
        match self.format {
            OutputFormat::Human => match event.level() {
                StatusLevel::Success => eprintln!("✓ {}", event),
                StatusLevel::Info => eprintln!("{}", event),
                StatusLevel::Warning | StatusLevel::Error => eprintln!("⚠ {}", event),
            },
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "event": event.to_string(),
                        "level": level_name(event.level())
                    })
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Status reporter for one-shot commands
///
/// Everything goes to the log. Successes, warnings and errors are also
/// shown in human mode; routine info is not.
pub struct OutputReporter {
    format: OutputFormat,
    /// Whether a credential is configured
    online: bool,
}

impl OutputReporter {
    pub fn new(format: OutputFormat, online: bool) -> Self {
        Self { format, online }
    }

    fn should_show(&self, event: &SyncEvent) -> bool {
        if self.format != OutputFormat::Human || !event.is_noteworthy() {
            return false;
        }
        match event {
            // Offline users always run on local data
            SyncEvent::Loaded(LoadOutcome::LocalFallback) => self.online,
            _ => event.level() != StatusLevel::Info,
        }
    }
}

impl StatusReporter for OutputReporter {
    fn report(&self, event: &SyncEvent) {
        TracingReporter.report(event);
        if self.should_show(event) {
            Output::new(self.format, 0).print_event(event);
        }
    }
}

fn level_name(level: StatusLevel) -> &'static str {
    match level {
        StatusLevel::Info => "info",
        StatusLevel::Success => "success",
        StatusLevel::Warning => "warning",
        StatusLevel::Error => "error",
    }
}

/// Signed amount and verb, e.g. `+2 added`
fn describe(record: &HistoryRecord) -> String {
    match record.kind {
        RecordKind::Add => format!("+{} added", record.amount),
        RecordKind::Drink => format!("-{} drank", record.amount),
    }
}

/// One history line with local time
fn format_record(record: &HistoryRecord) -> String {
    format!("{:<12} {}", describe(record), format_time(record.time))
}

fn format_time(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}
