//! HTTP webhook channel.
//!
//! Posts the rendered notification as JSON to one configured endpoint.
//! Secrets stay out of catalog files: `${VAR}` references in the URL and
//! header values are pulled from the process environment when the
//! notifier is built, and a missing variable fails construction rather
//! than the first delivery.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::traits::{Notification, Notifier, NotifyError};

#[derive(Debug)]
pub struct WebhookNotifier {
    url: String,
    method: reqwest::Method,
    /// Extra headers, names and values validated up front.
    headers: HeaderMap,
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// Build a notifier for `url`. `method` falls back to POST. Header
    /// names must be valid HTTP tokens; values go through `${VAR}`
    /// resolution first.
    pub fn new(
        url: String,
        method: Option<reqwest::Method>,
        headers: std::collections::HashMap<String, String>,
    ) -> Result<Self, NotifyError> {
        let mut header_map = HeaderMap::new();
        for (name, value) in &headers {
            let parsed_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| NotifyError::Config(format!("invalid header name '{name}'")))?;
            let resolved = resolve_env_vars(value)?;
            let parsed_value = HeaderValue::from_str(&resolved)
                .map_err(|_| NotifyError::Config(format!("invalid value for header '{name}'")))?;
            header_map.insert(parsed_name, parsed_value);
        }

        Ok(Self {
            url: resolve_env_vars(&url)?,
            method: method.unwrap_or(reqwest::Method::POST),
            headers: header_map,
            client: reqwest::Client::new(),
        })
    }

    /// Build from catalog-level strings. The method name is parsed
    /// case-insensitively; an unrecognized one is a configuration error.
    pub fn from_config(
        url: String,
        method: Option<String>,
        headers: Option<std::collections::HashMap<String, String>>,
    ) -> Result<Self, NotifyError> {
        let method = match method.as_deref() {
            None => reqwest::Method::POST,
            Some(m) => m
                .to_uppercase()
                .parse()
                .map_err(|_| NotifyError::Config(format!("unsupported HTTP method '{m}'")))?,
        };
        Self::new(url, Some(method), headers.unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let response = self
            .client
            .request(self.method.clone(), &self.url)
            .headers(self.headers.clone())
            .json(notification)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(url = %self.url, %status, "webhook delivered");
            return Ok(());
        }

        let detail = response.text().await.unwrap_or_default();
        tracing::warn!(url = %self.url, %status, %detail, "webhook rejected notification");
        Err(NotifyError::Config(format!(
            "webhook returned {status}: {detail}"
        )))
    }

    fn channel_name(&self) -> &str {
        "webhook"
    }
}

/// Substitute every `${VAR}` in `input` with the variable's value.
/// Unset variables and unterminated references are errors.
fn resolve_env_vars(input: &str) -> Result<String, NotifyError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            return Err(NotifyError::Config(format!(
                "unterminated ${{...}} reference in '{input}'"
            )));
        };
        let name = &after[..end];
        match std::env::var(name) {
            Ok(value) => out.push_str(&value),
            Err(_) => {
                return Err(NotifyError::Config(format!("env var not found: {name}")));
            }
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);

    Ok(out)
}
