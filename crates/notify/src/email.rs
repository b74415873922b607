//! SMTP email channel built on `lettre`.
//!
//! One notifier per alert: the recipient list comes from the alert
//! definition, the server settings from the engine's SMTP config.

use argus_core::SmtpConfig;
use lettre::{
    message::Mailbox, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};

use crate::traits::{Notification, Notifier, NotifyError};

/// Sends notifications as plain-text email over SMTP.
#[derive(Debug)]
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl EmailNotifier {
    /// Assemble a notifier from the engine SMTP settings plus the
    /// alert's recipient addresses. Fails on an unparseable address or
    /// an empty recipient list.
    pub fn from_config(smtp: &SmtpConfig, to: &[String]) -> Result<Self, NotifyError> {
        if to.is_empty() {
            return Err(NotifyError::Config(
                "recipient list must not be empty".to_string(),
            ));
        }

        Ok(Self {
            transport: transport_for(smtp)?,
            from: mailbox(&smtp.from)?,
            to: to.iter().map(|a| mailbox(a)).collect::<Result<_, _>>()?,
        })
    }
}

fn mailbox(addr: &str) -> Result<Mailbox, NotifyError> {
    addr.parse()
        .map_err(|e| NotifyError::Config(format!("invalid mailbox '{addr}': {e}")))
}

/// Pick the connection mode from port and TLS flag. Port 465 is implicit
/// TLS from the first byte and never STARTTLS, whatever the flag says.
fn transport_for(smtp: &SmtpConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>, NotifyError> {
    let mut builder = match (smtp.port, smtp.tls) {
        (465, _) => AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
            .map_err(|e| NotifyError::Config(e.to_string()))?,
        (_, true) => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
            .map_err(|e| NotifyError::Config(e.to_string()))?,
        (_, false) => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&smtp.host),
    }
    .port(smtp.port);

    if let (Some(user), Some(pass)) = (&smtp.username, &smtp.password) {
        builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
    }

    Ok(builder.build())
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(&notification.subject);
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }
        let message = builder
            .body(notification.body.clone())
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;

        tracing::info!(
            channel = "email",
            recipients = self.to.len(),
            subject = %notification.subject,
            "email dispatched"
        );
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "email"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp(port: u16, tls: bool) -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".to_string(),
            port,
            tls,
            from: "alerts@example.com".to_string(),
            username: None,
            password: None,
        }
    }

    fn one_recipient() -> Vec<String> {
        vec!["admin@example.com".to_string()]
    }

    #[test]
    fn mailbox_accepts_display_names() {
        assert!(mailbox("secops@example.com").is_ok());
        let mb = mailbox("SecOps <secops@example.com>").unwrap();
        assert_eq!(mb.email.to_string(), "secops@example.com");
    }

    #[test]
    fn builds_for_starttls_implicit_tls_and_plaintext() {
        for (port, tls) in [(587, true), (465, true), (465, false), (25, false)] {
            let n = EmailNotifier::from_config(&smtp(port, tls), &one_recipient());
            assert!(n.is_ok(), "port {port} tls {tls}");
        }
        assert_eq!(
            EmailNotifier::from_config(&smtp(587, true), &one_recipient())
                .unwrap()
                .channel_name(),
            "email"
        );
    }

    #[test]
    fn bad_sender_is_a_config_error() {
        let mut config = smtp(587, true);
        config.from = "bad-address".to_string();
        let err = EmailNotifier::from_config(&config, &one_recipient())
            .unwrap_err()
            .to_string();
        assert!(err.contains("channel configuration error"), "got: {err}");
        assert!(err.contains("bad-address"), "got: {err}");
    }

    #[test]
    fn bad_recipient_is_rejected() {
        let result = EmailNotifier::from_config(&smtp(587, true), &["not-valid".to_string()]);
        assert!(result.is_err());
    }

    #[test]
    fn empty_recipient_list_is_rejected() {
        let err = EmailNotifier::from_config(&smtp(587, true), &[])
            .unwrap_err()
            .to_string();
        assert!(err.contains("must not be empty"), "got: {err}");
    }
}
