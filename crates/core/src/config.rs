use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load a `.env` file if one exists; a missing file is not an error.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_u16(key: &str, default: u16) -> u16 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env_opt(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

// ── Engine config ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub catalog: CatalogConfig,
    pub detections: DetectionsConfig,
    pub source: SourceConfig,
    pub smtp: SmtpConfig,
    pub webhook: WebhookConfig,
}

impl EngineConfig {
    /// Read config from environment variables; run [`load_dotenv`] beforehand
    /// so a `.env` file is picked up.
    pub fn from_env() -> Self {
        Self {
            catalog: CatalogConfig::from_env(),
            detections: DetectionsConfig::from_env(),
            source: SourceConfig::from_env(),
            smtp: SmtpConfig::from_env(),
            webhook: WebhookConfig::from_env(),
        }
    }

    /// Log the effective config at startup, with secrets left out.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  catalog:     dir={}", self.catalog.dir.display());
        tracing::info!("  detections:  path={}", self.detections.path.display());
        tracing::info!(
            "  source:      events={}, fetch_timeout={}s",
            self.source.events_path.display(),
            self.source.fetch_timeout_secs
        );
        tracing::info!(
            "  smtp:        host={}, from={}, configured={}",
            self.smtp.host,
            self.smtp.from,
            self.smtp.is_configured()
        );
        tracing::info!("  webhook:     configured={}", self.webhook.is_configured());
    }
}

// ── Rule catalog ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub dir: PathBuf,
}

impl CatalogConfig {
    fn from_env() -> Self {
        Self {
            dir: PathBuf::from(env_or("ARGUS_RULES_DIR", "data/rules")),
        }
    }
}

// ── Detection sink ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionsConfig {
    pub path: PathBuf,
}

impl DetectionsConfig {
    fn from_env() -> Self {
        Self {
            path: PathBuf::from(env_or("ARGUS_DETECTIONS_PATH", "data/detections.jsonl")),
        }
    }
}

// ── Event source ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub events_path: PathBuf,
    pub fetch_timeout_secs: u64,
}

impl SourceConfig {
    fn from_env() -> Self {
        Self {
            events_path: PathBuf::from(env_or("ARGUS_EVENTS_PATH", "data/events.jsonl")),
            fetch_timeout_secs: env_u64("ARGUS_FETCH_TIMEOUT_SECS", 30),
        }
    }
}

// ── SMTP ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// STARTTLS on ports other than 465; 465 always uses implicit TLS.
    pub tls: bool,
    pub from: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl SmtpConfig {
    fn from_env() -> Self {
        Self {
            host: env_or("SMTP_HOST", "localhost"),
            port: env_u16("SMTP_PORT", 587),
            tls: env_bool("SMTP_TLS", true),
            from: env_or("SMTP_FROM", "argus@localhost"),
            username: env_opt("SMTP_USERNAME"),
            password: env_opt("SMTP_PASSWORD"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.host != "localhost" || self.username.is_some()
    }
}

// ── Webhook ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: Option<String>,
}

impl WebhookConfig {
    fn from_env() -> Self {
        Self {
            url: env_opt("ARGUS_WEBHOOK_URL"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }
}
