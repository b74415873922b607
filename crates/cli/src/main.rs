mod cli;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;

use argus_alerts::{build_dispatcher, channel_key, AlertController, AlertScheduler, TickOutcome};
use argus_core::{load_dotenv, AuditLog, AuditQuery, EngineConfig, Environment};
use argus_detect::{
    DetectionStore, JsonlDetectionStore, JsonlEventSource, RuleRunner, RunnerConfig,
};
use argus_notify::{Dispatcher, Notification, Notifier, NotifyError};
use argus_rules::{validate_catalog, CatalogLoader, LoadStatus, RuleConfigStore};

use crate::cli::{CliArgs, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    load_dotenv();
    let args = CliArgs::parse();

    let mut config = EngineConfig::from_env();
    if let Some(dir) = args.catalog.clone() {
        config.catalog.dir = dir;
    }
    config.log_summary();

    // Every command starts from a loaded catalog.
    let store = Arc::new(RuleConfigStore::new());
    let loader = CatalogLoader::new(config.catalog.dir.clone(), Arc::clone(&store));
    let load_results = loader
        .load_all()
        .context("failed to scan catalog directory")?;

    match args.command {
        Command::Validate => cmd_validate(&store, &load_results),
        Command::List { json } => cmd_list(&store, args.environment, json),
        Command::Evaluate {
            rule,
            events,
            at,
            out,
            show_audit,
        } => {
            cmd_evaluate(
                store,
                &config,
                args.environment,
                rule,
                events,
                at,
                out,
                show_audit,
            )
            .await
        }
        Command::Tick {
            alert,
            detections,
            at,
            dry_run,
            show_audit,
        } => {
            cmd_tick(
                store,
                &config,
                args.environment,
                alert,
                detections,
                at,
                dry_run,
                show_audit,
            )
            .await
        }
    }
}

// ── validate ──────────────────────────────────────────────────

fn cmd_validate(
    store: &RuleConfigStore,
    load_results: &[argus_rules::LoadResult],
) -> Result<()> {
    let mut file_failures = 0;
    for result in load_results {
        match &result.status {
            LoadStatus::Loaded { ids } => {
                println!("ok       {} ({} documents)", result.path.display(), ids.len());
            }
            LoadStatus::Skipped { reason } => {
                println!("skipped  {} ({})", result.path.display(), reason);
            }
            LoadStatus::Failed { error } => {
                file_failures += 1;
                println!("FAILED   {}: {}", result.path.display(), error);
            }
        }
    }

    let report = validate_catalog(store);
    for warning in &report.warnings {
        println!("warning  {}: {}", warning.path, warning.message);
    }
    for error in &report.errors {
        println!("error    {}: {}", error.path, error.message);
    }

    println!(
        "{} rules, {} alerts loaded; {} file failures, {} errors, {} warnings",
        store.rule_count(),
        store.alert_count(),
        file_failures,
        report.errors.len(),
        report.warnings.len()
    );

    if file_failures > 0 || !report.valid {
        anyhow::bail!("catalog validation failed");
    }
    Ok(())
}

// ── list ──────────────────────────────────────────────────────

fn cmd_list(store: &RuleConfigStore, environment: Environment, json: bool) -> Result<()> {
    let rules = store.list_active(environment);
    let alerts = store.list_alerts(environment);

    if json {
        let doc = serde_json::json!({
            "environment": environment,
            "rules": rules,
            "alerts": alerts,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("rules ({environment}):");
    if rules.is_empty() {
        println!("  (none active)");
    }
    for rule in &rules {
        println!(
            "  {:<32} {:<22} severity={:<8} window={}h",
            rule.rule_id,
            rule.family().to_string(),
            rule.severity.as_str(),
            rule.window_hours(),
        );
    }

    println!("alerts ({environment}):");
    if alerts.is_empty() {
        println!("  (none)");
    }
    for alert in &alerts {
        println!(
            "  {:<32} {} {} over {}h, cron \"{}\"{}",
            alert.alert_id,
            alert.comparison,
            alert.threshold,
            alert.period_hours,
            alert.schedule.cron,
            if alert.paused { " [paused]" } else { "" },
        );
    }
    Ok(())
}

// ── evaluate ──────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
async fn cmd_evaluate(
    store: Arc<RuleConfigStore>,
    config: &EngineConfig,
    environment: Environment,
    rules: Vec<String>,
    events: Option<PathBuf>,
    at: Option<String>,
    out: Option<PathBuf>,
    show_audit: bool,
) -> Result<()> {
    let now = parse_at(at)?;
    let events_path = events.unwrap_or_else(|| config.source.events_path.clone());
    let sink_path = out.unwrap_or_else(|| config.detections.path.clone());

    let source = Arc::new(JsonlEventSource::new(&events_path));
    let sink = Arc::new(
        JsonlDetectionStore::new(&sink_path)
            .with_context(|| format!("failed to open detection store {}", sink_path.display()))?,
    );
    let audit = Arc::new(AuditLog::new());
    let runner = RuleRunner::new(
        store,
        source,
        sink,
        Arc::clone(&audit),
        RunnerConfig {
            fetch_timeout: Duration::from_secs(config.source.fetch_timeout_secs),
        },
    );

    let outcomes = if rules.is_empty() {
        runner.evaluate_all(environment, now).await
    } else {
        runner.evaluate_rules(&rules, environment, now).await
    };

    if outcomes.is_empty() {
        println!("no active rules for {environment}");
        return Ok(());
    }

    let mut failed = 0;
    for (rule_id, result) in &outcomes {
        match result {
            Ok(report) => println!(
                "{:<32} window {} | {} events, {} entities, {} detections in {}ms",
                rule_id,
                report.window,
                report.events_seen,
                report.entities_aggregated,
                report.records_emitted,
                report.elapsed_ms,
            ),
            Err(e) => {
                failed += 1;
                println!("{rule_id:<32} FAILED: {e}");
            }
        }
    }

    if show_audit {
        for (rule_id, _) in &outcomes {
            print_audit(&audit, rule_id);
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} rule evaluations failed", outcomes.len());
    }
    Ok(())
}

// ── tick ──────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
async fn cmd_tick(
    store: Arc<RuleConfigStore>,
    config: &EngineConfig,
    environment: Environment,
    alerts: Vec<String>,
    detections: Option<PathBuf>,
    at: Option<String>,
    dry_run: bool,
    show_audit: bool,
) -> Result<()> {
    let now = parse_at(at)?;
    let path = detections.unwrap_or_else(|| config.detections.path.clone());
    let sink: Arc<dyn DetectionStore> = Arc::new(
        JsonlDetectionStore::new(&path)
            .with_context(|| format!("failed to open detection store {}", path.display()))?,
    );

    let alert_defs = store.list_alerts(environment);
    let dispatcher = if dry_run {
        let mut d = Dispatcher::new();
        for def in &alert_defs {
            d.set_alert_channels(
                channel_key(&def.alert_id, def.environment),
                vec![Box::new(LogNotifier) as Box<dyn Notifier>],
            );
        }
        d
    } else {
        build_dispatcher(&alert_defs, config)
    };

    let audit = Arc::new(AuditLog::new());
    let controller = AlertController::new(store, sink, Arc::new(dispatcher), Arc::clone(&audit));

    // Explicit --alert ticks unconditionally; otherwise only alerts whose
    // cron schedule is due at `now` run.
    let targets: Vec<String> = if alerts.is_empty() {
        let scheduler = AlertScheduler::new();
        for err in scheduler.sync_alerts(&alert_defs) {
            tracing::warn!(error = %err, "skipping alert with bad schedule");
        }
        let due = scheduler.due_alerts(now);
        if due.is_empty() {
            println!("no alerts due at {now}");
            return Ok(());
        }
        due.into_iter().map(|(id, _)| id).collect()
    } else {
        alerts
    };

    let mut failed = 0;
    for alert_id in &targets {
        match controller.tick(alert_id, environment, now).await {
            Ok(outcome) => println!("{:<32} {}", alert_id, describe_outcome(&outcome)),
            Err(e) => {
                failed += 1;
                println!("{alert_id:<32} FAILED: {e}");
            }
        }
    }

    if show_audit {
        for alert_id in &targets {
            print_audit(&audit, alert_id);
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} alert ticks failed", targets.len());
    }
    Ok(())
}

fn describe_outcome(outcome: &TickOutcome) -> String {
    match outcome {
        TickOutcome::Paused => "paused".to_string(),
        TickOutcome::Unknown => "unknown (no detection data)".to_string(),
        TickOutcome::Quiet { value } => format!("quiet (value {})", fmt_value(*value)),
        TickOutcome::Triggered { value, notified } => format!(
            "TRIGGERED (value {}, {})",
            fmt_value(*value),
            if *notified { "notified" } else { "no channels" },
        ),
        TickOutcome::Suppressed {
            value,
            remaining_secs,
        } => format!(
            "triggered, suppressed (value {}, {remaining_secs}s until retrigger)",
            fmt_value(*value),
        ),
        TickOutcome::Recovered { value, notified } => format!(
            "recovered (value {}{})",
            fmt_value(*value),
            if *notified { ", notified" } else { "" },
        ),
    }
}

fn fmt_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v}"),
        None => "null".to_string(),
    }
}

fn parse_at(at: Option<String>) -> Result<DateTime<Utc>> {
    match at {
        Some(s) => s
            .parse::<DateTime<Utc>>()
            .with_context(|| format!("invalid --at timestamp: {s}")),
        None => Ok(Utc::now()),
    }
}

fn print_audit(audit: &AuditLog, target_id: &str) {
    let entries = audit.query(target_id, &AuditQuery::default());
    if entries.is_empty() {
        return;
    }
    println!("audit trail for {target_id}:");
    // Query returns newest-first; print oldest-first.
    for entry in entries.iter().rev() {
        println!(
            "  {} {:<7} {:<12} {}",
            entry.timestamp.format("%H:%M:%S%.3f"),
            format!("{:?}", entry.level).to_lowercase(),
            format!("{:?}", entry.phase),
            entry.message,
        );
    }
}

/// Prints notifications to stdout instead of delivering them.
struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        println!("--- notification (dry run) ---");
        println!("subject: {}", notification.subject);
        println!("{}", notification.body);
        println!("------------------------------");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "log"
    }
}
