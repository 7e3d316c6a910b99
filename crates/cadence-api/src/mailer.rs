//! Outgoing mail. Without SMTP credentials the message is written to the log,
//! which is how local setups pick up reset links.

use anyhow::Context;
use cadence_types::api::DeliveryStatus;
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{error, info};

/// Port used for implicit TLS. Any other port upgrades with STARTTLS.
const SMTPS_PORT: u16 = 465;

#[derive(Debug, Clone)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// `Name <address>` or a bare address.
    pub from: String,
}

#[derive(Clone)]
pub enum Mailer {
    Log,
    Smtp {
        transport: AsyncSmtpTransport<Tokio1Executor>,
        from: Mailbox,
    },
}

impl Mailer {
    pub fn smtp(settings: &SmtpSettings) -> anyhow::Result<Self> {
        let from: Mailbox = settings
            .from
            .parse()
            .with_context(|| format!("invalid sender address '{}'", settings.from))?;

        let builder = if settings.port == SMTPS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
        };
        let transport = builder
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .build();

        info!("SMTP mail via {}:{}", settings.host, settings.port);
        Ok(Self::Smtp { transport, from })
    }

    pub async fn send(&self, mail: &Mail) -> DeliveryStatus {
        match self {
            Self::Log => {
                info!("Mail to {} ({}):\n{}", mail.to, mail.subject, mail.text);
                DeliveryStatus::Logged
            }
            Self::Smtp { transport, from } => {
                let message = match compose(from, mail) {
                    Ok(message) => message,
                    Err(e) => {
                        error!("Could not compose '{}' for {}: {:#}", mail.subject, mail.to, e);
                        return DeliveryStatus::Failed;
                    }
                };
                match transport.send(message).await {
                    Ok(_) => {
                        info!("Mail '{}' sent to {}", mail.subject, mail.to);
                        DeliveryStatus::Sent
                    }
                    Err(e) => {
                        error!("SMTP rejected '{}' for {}: {}", mail.subject, mail.to, e);
                        DeliveryStatus::Failed
                    }
                }
            }
        }
    }
}

fn compose(from: &Mailbox, mail: &Mail) -> anyhow::Result<Message> {
    let to: Mailbox = mail.to.parse()?;
    let message = Message::builder()
        .from(from.clone())
        .to(to)
        .subject(mail.subject.as_str())
        .header(ContentType::TEXT_PLAIN)
        .body(mail.text.clone())?;
    Ok(message)
}

pub fn password_reset(to: &str, full_name: &str, link: &str) -> Mail {
    Mail {
        to: to.to_string(),
        subject: "Reset your Cadence password".to_string(),
        text: format!(
            "Hi {full_name},\n\n\
             Someone asked to reset the password for this account. The link below\n\
             is valid for one hour:\n\n{link}\n\n\
             If it wasn't you, ignore this email."
        ),
    }
}

pub fn welcome(to: &str, full_name: &str, client_url: &str) -> Mail {
    Mail {
        to: to.to_string(),
        subject: "Welcome to Cadence".to_string(),
        text: format!(
            "Hi {full_name},\n\nYour account is ready. Sign in at {client_url} to start planning."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(port: u16) -> SmtpSettings {
        SmtpSettings {
            host: "smtp.example.com".into(),
            port,
            username: "mailer".into(),
            password: "hunter2".into(),
            from: "Cadence <no-reply@example.com>".into(),
        }
    }

    #[test]
    fn compose_plain_text_message() {
        let from: Mailbox = "Cadence <no-reply@example.com>".parse().unwrap();
        let mail = password_reset("alice@example.com", "Alice", "http://x/reset-password?token=t");
        let raw = String::from_utf8(compose(&from, &mail).unwrap().formatted()).unwrap();
        assert!(raw.contains("To: alice@example.com"));
        assert!(raw.contains("Subject: Reset your Cadence password"));
        assert!(raw.contains("text/plain"));
    }

    #[test]
    fn compose_rejects_bad_recipient() {
        let from: Mailbox = "no-reply@example.com".parse().unwrap();
        let mail = welcome("not an address", "Alice", "http://x");
        assert!(compose(&from, &mail).is_err());
    }

    #[tokio::test]
    async fn smtp_mailer_builds_for_both_tls_modes() {
        assert!(matches!(Mailer::smtp(&settings(587)), Ok(Mailer::Smtp { .. })));
        assert!(matches!(Mailer::smtp(&settings(465)), Ok(Mailer::Smtp { .. })));

        let bad_sender = SmtpSettings { from: "nobody".into(), ..settings(587) };
        assert!(Mailer::smtp(&bad_sender).is_err());
    }

    #[tokio::test]
    async fn log_mailer_reports_logged() {
        let mail = welcome("alice@example.com", "Alice", "http://x");
        assert_eq!(Mailer::Log.send(&mail).await, DeliveryStatus::Logged);
    }
}
