//! Hot-reload: reacting to filesystem events on the catalog directory.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use notify::{Event, EventKind};
use tracing::{info, warn};

use crate::store::RuleConfigStore;

use super::core::scan_into_store;

/// React to one filesystem event on the catalog directory.
///
/// Any create/modify/remove touching a YAML file triggers a full debounced
/// rescan. The rescan replaces the store atomically; files that fail to parse
/// contribute nothing, and if the directory itself is unreadable the previous
/// catalog stays in place.
pub(super) fn handle_fs_event(
    event: &Event,
    catalog_dir: &Path,
    store: &Arc<RuleConfigStore>,
    last_reload: &Arc<Mutex<Option<Instant>>>,
    debounce: Duration,
) {
    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return;
    }

    let touches_yaml = event.paths.iter().any(|path| {
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e == "yml" || e == "yaml")
            .unwrap_or(false);
        let is_dotfile = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with('.'))
            .unwrap_or(false);
        is_yaml && !is_dotfile
    });
    if !touches_yaml {
        return;
    }

    // Editors fire bursts of events per save; collapse them.
    {
        let mut guard = last_reload.lock().expect("reload debounce lock poisoned");
        if let Some(last) = *guard {
            if last.elapsed() < debounce {
                return;
            }
        }
        *guard = Some(Instant::now());
    }

    match scan_into_store(catalog_dir, store) {
        Ok(results) => {
            let loaded = results
                .iter()
                .filter(|r| matches!(r.status, super::error::LoadStatus::Loaded { .. }))
                .count();
            let failed = results
                .iter()
                .filter(|r| matches!(r.status, super::error::LoadStatus::Failed { .. }))
                .count();
            info!(loaded, failed, "hot-reloaded catalog");
        }
        Err(e) => {
            warn!(error = %e, "catalog rescan failed, keeping previous catalog");
        }
    }
}
