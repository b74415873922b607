//! Minijinja rendering for alert subjects and bodies.
//!
//! A template sees three things: the alert that fired (`alert.*`), the
//! aggregate value the tick measured (`result.value`), and the event
//! kind plus timestamp. The built-in trigger and recovery templates
//! below cover alerts without custom templates.

use crate::traits::NotifyError;

/// Subject used for trigger notifications when no custom template is set.
pub const DEFAULT_TRIGGER_SUBJECT: &str =
    "[{{ alert.environment | upper }}] Alert triggered: {{ alert.display_name }}";

/// Body used for trigger notifications when no custom template is set.
pub const DEFAULT_TRIGGER_BODY: &str = "\
Alert '{{ alert.display_name }}' ({{ alert.id }}) triggered at {{ now }}.

Detections for rule {{ alert.rule_id }} over the last {{ alert.period_hours }}h: \
{% if result.value is none %}no data{% else %}{{ result.value | round }}{% endif %} \
({{ alert.comparison }} {{ alert.threshold }}).
";

/// Subject used for recovery notifications.
pub const DEFAULT_RECOVERY_SUBJECT: &str =
    "[{{ alert.environment | upper }}] Alert recovered: {{ alert.display_name }}";

/// Body used for recovery notifications.
pub const DEFAULT_RECOVERY_BODY: &str = "\
Alert '{{ alert.display_name }}' ({{ alert.id }}) returned to normal at {{ now }}.

Detections for rule {{ alert.rule_id }} over the last {{ alert.period_hours }}h: \
{% if result.value is none %}no data{% else %}{{ result.value | round }}{% endif %} \
({{ alert.comparison }} {{ alert.threshold }} no longer holds).
";

/// Everything a notification template can reference.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TemplateContext {
    /// The alert definition that fired.
    pub alert: AlertContext,
    /// The aggregate query result driving the tick.
    pub result: ResultContext,
    /// Event kind: `"trigger"` or `"recovery"`.
    pub event: String,
    /// Tick timestamp in ISO 8601 format.
    pub now: String,
}

/// Alert definition fields exposed to templates.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AlertContext {
    pub id: String,
    pub display_name: String,
    pub environment: String,
    /// Rule id the alert's detection scope watches.
    pub rule_id: String,
    /// Optional detection-type narrowing of the scope.
    pub detection_type: Option<String>,
    pub comparison: String,
    pub threshold: f64,
    pub period_hours: u32,
}

/// Aggregate query result exposed to templates.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ResultContext {
    /// The detection count; `None` when the store held no rows at all
    /// and the alert's empty-result policy forced the transition.
    pub value: Option<f64>,
}

/// Renders template strings against a [`TemplateContext`].
///
/// The minijinja environment is assembled once and reused; templates
/// themselves are dynamic strings rendered via `render_str`, never
/// pre-registered.
#[derive(Debug)]
pub struct TemplateRenderer {
    env: minijinja::Environment<'static>,
}

impl TemplateRenderer {
    pub fn new() -> Self {
        let mut env = minijinja::Environment::new();
        // Overrides the builtin round filter: integers render bare
        // ("6", not "6.0") and a precision argument is honored.
        env.add_filter("round", round_filter);
        env.add_function("env", env_function);
        Self { env }
    }

    /// Render `template_str` with `ctx`. Parse and runtime failures both
    /// surface as [`NotifyError::Template`].
    pub fn render(&self, template_str: &str, ctx: &TemplateContext) -> Result<String, NotifyError> {
        self.env
            .render_str(template_str, ctx)
            .map_err(|e| NotifyError::Template(e.to_string()))
    }

    /// Syntax-check a template without evaluating it.
    pub fn validate(&self, template_str: &str) -> Result<(), NotifyError> {
        self.env
            .template_from_str(template_str)
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        Ok(())
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn round_filter(value: f64, decimals: Option<u32>) -> String {
    format!("{:.*}", decimals.unwrap_or(0) as usize, value)
}

/// Template-callable environment variable lookup. Unset variables render
/// as an empty string so a template never fails on missing context, but
/// the miss is logged.
fn env_function(name: String) -> String {
    std::env::var(&name).unwrap_or_else(|_| {
        tracing::warn!(var = %name, "template referenced an unset environment variable");
        String::new()
    })
}
