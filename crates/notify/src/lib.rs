//! Notification delivery for Argus alerts.
//!
//! This crate provides:
//! - A [`Notifier`] trait abstracting delivery channels
//! - Email delivery over SMTP ([`EmailNotifier`])
//! - Generic HTTP webhook delivery ([`WebhookNotifier`])
//! - MiniJinja templating for subjects and bodies ([`TemplateRenderer`])
//! - A [`Dispatcher`] that fans a notification out to the channels
//!   registered for an alert and reports per-channel outcomes

pub mod dispatcher;
pub mod email;
pub mod templating;
pub mod traits;
pub mod webhook;

pub use dispatcher::Dispatcher;
pub use email::EmailNotifier;
pub use templating::{
    AlertContext, ResultContext, TemplateContext, TemplateRenderer, DEFAULT_RECOVERY_BODY,
    DEFAULT_RECOVERY_SUBJECT, DEFAULT_TRIGGER_BODY, DEFAULT_TRIGGER_SUBJECT,
};
pub use traits::{any_success, DispatchResult, Notification, Notifier, NotifyError};
pub use webhook::WebhookNotifier;
