use std::path::PathBuf;

use clap::{Parser, Subcommand};

use argus_core::Environment;

/// Rule-driven anomaly detection over security audit events.
///
/// Loads a YAML catalog of detection rules and alerts, evaluates rules
/// against an event log, persists scored detections, and ticks alert
/// conditions over them.
#[derive(Parser, Debug)]
#[command(name = "argus", about = "Rule-driven anomaly detection over security audit events")]
pub struct CliArgs {
    /// Catalog directory with detection and alert YAML (overrides ARGUS_RULES_DIR)
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Target environment: dev, test, or prod
    #[arg(long, global = true, default_value = "prod")]
    pub environment: Environment,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate every catalog document and report errors and warnings
    Validate,

    /// List loaded rules and alerts for the environment
    List {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Evaluate detection rules over an event log and persist the results
    Evaluate {
        /// Rule ids to evaluate (repeatable; defaults to every active rule)
        #[arg(long)]
        rule: Vec<String>,

        /// JSONL event log to read (overrides ARGUS_EVENTS_PATH)
        #[arg(long)]
        events: Option<PathBuf>,

        /// Evaluation instant, RFC 3339 (defaults to now)
        #[arg(long)]
        at: Option<String>,

        /// Detection store to append to (overrides ARGUS_DETECTIONS_PATH)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Print the audit trail of each rule after the run
        #[arg(long)]
        show_audit: bool,
    },

    /// Tick alert conditions against persisted detections
    Tick {
        /// Alert ids to tick (repeatable; defaults to alerts due per their cron)
        #[arg(long)]
        alert: Vec<String>,

        /// Detection store to read (overrides ARGUS_DETECTIONS_PATH)
        #[arg(long)]
        detections: Option<PathBuf>,

        /// Evaluation instant, RFC 3339 (defaults to now)
        #[arg(long)]
        at: Option<String>,

        /// Log notifications instead of delivering them
        #[arg(long)]
        dry_run: bool,

        /// Print the audit trail of each alert after the run
        #[arg(long)]
        show_audit: bool,
    },
}
