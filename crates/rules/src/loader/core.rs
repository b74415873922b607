//! Core [`CatalogLoader`] struct: filesystem-backed catalog loading with
//! optional hot-reload.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use tracing::{info, warn};

use crate::alert::AlertDefinition;
use crate::definition::RuleDefinition;
use crate::schema::{CatalogDocument, CatalogEnvelope};
use crate::store::RuleConfigStore;
use crate::validation::{validate_alert, validate_rule};

use super::error::{CatalogError, LoadResult, LoadStatus, Result};
use super::watcher::handle_fs_event;

/// Minimum gap between watcher-driven reloads.
const RELOAD_DEBOUNCE: Duration = Duration::from_millis(500);

/// Filesystem-backed catalog loader with optional hot-reload.
///
/// Scans a directory (non-recursively, in filename order) for `*.yml` /
/// `*.yaml` files, each holding one or more catalog documents, and resolves
/// them into the shared [`RuleConfigStore`]. Every load is a full rebuild:
/// the store contents are atomically replaced, so deleting a file removes
/// its documents on the next reload.
pub struct CatalogLoader {
    /// Directory containing catalog YAML files.
    catalog_dir: PathBuf,
    /// Store the resolved definitions land in.
    store: Arc<RuleConfigStore>,
    /// Running filesystem watcher; dropping it would stop hot-reload.
    _watcher: Option<RecommendedWatcher>,
}

impl CatalogLoader {
    /// Build a loader for `catalog_dir`, creating the directory tree if
    /// it is missing.
    pub fn new(catalog_dir: PathBuf, store: Arc<RuleConfigStore>) -> Self {
        if !catalog_dir.exists() {
            if let Err(e) = fs::create_dir_all(&catalog_dir) {
                warn!(path = %catalog_dir.display(), error = %e, "failed to create catalog directory");
            }
        }
        Self {
            catalog_dir,
            store,
            _watcher: None,
        }
    }

    /// Scan the catalog directory and atomically replace the store contents.
    ///
    /// Parse and validation errors are reported per-file and leave that file's
    /// documents out of the new catalog; they do not abort the scan.
    pub fn load_all(&self) -> Result<Vec<LoadResult>> {
        scan_into_store(&self.catalog_dir, &self.store)
    }

    /// Start a filesystem watcher with a 500ms reload debounce.
    ///
    /// Any create/modify/remove of a YAML file triggers a full rescan that
    /// atomically replaces the store contents. If the rescan fails entirely,
    /// the previous catalog stays in place.
    pub fn watch(&mut self) -> Result<()> {
        let catalog_dir = self.catalog_dir.clone();
        let store = Arc::clone(&self.store);
        let last_reload: Arc<Mutex<Option<Instant>>> = Arc::new(Mutex::new(None));

        let mut watcher = notify::recommended_watcher(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    handle_fs_event(&event, &catalog_dir, &store, &last_reload, RELOAD_DEBOUNCE)
                }
                Err(e) => warn!(error = %e, "catalog watcher delivered an error"),
            },
        )?;

        watcher.watch(&self.catalog_dir, RecursiveMode::NonRecursive)?;
        let _ = watcher
            .configure(notify::Config::default().with_poll_interval(Duration::from_millis(500)));

        info!(path = %self.catalog_dir.display(), "watching catalog directory for changes");
        self._watcher = Some(watcher);
        Ok(())
    }

    /// Get the catalog directory path.
    pub fn catalog_dir(&self) -> &Path {
        &self.catalog_dir
    }

    /// Get the shared configuration store.
    pub fn store(&self) -> Arc<RuleConfigStore> {
        Arc::clone(&self.store)
    }
}

/// Full scan + atomic store replace. Shared by `load_all` and the watcher.
pub(super) fn scan_into_store(
    catalog_dir: &Path,
    store: &RuleConfigStore,
) -> Result<Vec<LoadResult>> {
    let mut results = Vec::new();
    let mut rules: Vec<RuleDefinition> = Vec::new();
    let mut alerts: Vec<AlertDefinition> = Vec::new();

    let mut paths: Vec<PathBuf> = Vec::new();
    let entries = match fs::read_dir(catalog_dir) {
        Ok(e) => e,
        Err(e) => {
            warn!(path = %catalog_dir.display(), error = %e, "failed to read catalog directory");
            return Err(CatalogError::Io(e));
        }
    };
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            continue;
        }
        paths.push(path);
    }
    // Filename order keeps last-wins duplicate resolution deterministic.
    paths.sort();

    let now = Utc::now();
    for path in paths {
        // Skip dotfiles
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.starts_with('.') {
                results.push(LoadResult {
                    path,
                    status: LoadStatus::Skipped {
                        reason: "dotfile".to_string(),
                    },
                });
                continue;
            }
        }

        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e == "yml" || e == "yaml")
            .unwrap_or(false);
        if !is_yaml {
            results.push(LoadResult {
                path,
                status: LoadStatus::Skipped {
                    reason: "not a YAML file".to_string(),
                },
            });
            continue;
        }

        match load_file(&path, now) {
            Ok((file_rules, file_alerts)) => {
                let mut ids: Vec<String> =
                    file_rules.iter().map(|r| r.rule_id.clone()).collect();
                ids.extend(file_alerts.iter().map(|a| a.alert_id.clone()));
                info!(path = %path.display(), count = ids.len(), "loaded catalog file");
                rules.extend(file_rules);
                alerts.extend(file_alerts);
                results.push(LoadResult {
                    path,
                    status: LoadStatus::Loaded { ids },
                });
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load catalog file");
                results.push(LoadResult {
                    path,
                    status: LoadStatus::Failed {
                        error: e.to_string(),
                    },
                });
            }
        }
    }

    for key in duplicate_keys(&rules.iter().map(|r| r.key()).collect::<Vec<_>>()) {
        warn!(rule_id = %key.0, environment = %key.1, "duplicate rule definition, last one wins");
    }
    for key in duplicate_keys(&alerts.iter().map(|a| a.key()).collect::<Vec<_>>()) {
        warn!(alert_id = %key.0, environment = %key.1, "duplicate alert definition, last one wins");
    }

    store.replace_all(rules, alerts);
    Ok(results)
}

fn duplicate_keys(
    keys: &[(String, argus_core::Environment)],
) -> Vec<(String, argus_core::Environment)> {
    let mut seen = std::collections::HashSet::new();
    let mut dups = Vec::new();
    for key in keys {
        if !seen.insert(key.clone()) {
            dups.push(key.clone());
        }
    }
    dups
}

/// Parse and validate a single catalog file.
///
/// A file is all-or-nothing: any bad document fails the whole file so a
/// half-loaded multi-document file can never reach the store.
fn load_file(
    path: &Path,
    now: chrono::DateTime<Utc>,
) -> Result<(Vec<RuleDefinition>, Vec<AlertDefinition>)> {
    let contents = fs::read_to_string(path)?;
    let docs = parse_documents(&contents)?;

    let mut rules = Vec::new();
    let mut alerts = Vec::new();
    for doc in &docs {
        match doc {
            CatalogDocument::Detection(detection) => {
                let def = detection
                    .resolve(now)
                    .map_err(CatalogError::Validation)?;
                let report = validate_rule(&def);
                for w in &report.warnings {
                    warn!(rule_id = %def.rule_id, path = %w.path, "{}", w.message);
                }
                if !report.valid {
                    return Err(CatalogError::Validation(report.describe_errors()));
                }
                rules.push(def);
            }
            CatalogDocument::Alert(alert) => {
                let def = alert.resolve(now);
                let report = validate_alert(&def);
                for w in &report.warnings {
                    warn!(alert_id = %def.alert_id, path = %w.path, "{}", w.message);
                }
                if !report.valid {
                    return Err(CatalogError::Validation(report.describe_errors()));
                }
                alerts.push(def);
            }
        }
    }
    Ok((rules, alerts))
}

/// Parse a (possibly multi-document) YAML string into catalog documents.
///
/// Two-pass per document: first the [`CatalogEnvelope`] header to read the
/// `kind`, then the kind-specific type. Empty documents (stray `---`) are
/// skipped.
pub fn parse_documents(contents: &str) -> Result<Vec<CatalogDocument>> {
    let mut docs = Vec::new();
    for (idx, de) in serde_yaml::Deserializer::from_str(contents).enumerate() {
        let value = serde_yaml::Value::deserialize(de)?;
        if value.is_null() {
            continue;
        }

        let envelope: CatalogEnvelope = serde_yaml::from_value(value)
            .map_err(|e| CatalogError::Validation(format!("document {}: {}", idx, e)))?;
        if envelope.metadata.id.is_empty() {
            return Err(CatalogError::Validation(format!(
                "document {}: metadata.id must not be empty",
                idx
            )));
        }

        let doc = envelope.parse_full().map_err(|e| {
            CatalogError::Validation(format!(
                "document {} ('{}'): {}",
                idx, envelope.metadata.id, e
            ))
        })?;
        docs.push(doc);
    }
    Ok(docs)
}
