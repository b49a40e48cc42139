use std::{fmt::Display, str::FromStr};

use jobmail_notify::{MailSender, NotificationKind, SendMailError};
use lettre::{
    Message, SmtpTransport, Transport,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use log::debug;

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 465;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// Implicit TLS, usually port 465.
    Tls,
    /// STARTTLS upgrade, usually port 587.
    StartTls,
    /// No encryption, for local relays such as Mailpit.
    Plain,
}

impl FromStr for SmtpSecurity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tls" => Ok(SmtpSecurity::Tls),
            "starttls" => Ok(SmtpSecurity::StartTls),
            "plain" | "none" => Ok(SmtpSecurity::Plain),
            other => Err(format!("unknown SMTP security mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    /// Falls back to the sender address.
    pub username: Option<String>,
    pub password: Option<String>,
    pub security: SmtpSecurity,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_SMTP_HOST.to_string(),
            port: DEFAULT_SMTP_PORT,
            username: None,
            password: None,
            security: SmtpSecurity::Tls,
        }
    }
}

pub struct LettreMailSender<T: Transport = SmtpTransport> {
    transport: T,
    from: Mailbox,
}

impl LettreMailSender<SmtpTransport> {
    /// Opens an SMTP transport authenticated as `sender`, unless the
    /// settings name another user.
    pub fn connect(sender: &str, settings: &SmtpSettings) -> Result<Self, SendMailError> {
        let builder = match settings.security {
            SmtpSecurity::Tls => SmtpTransport::relay(&settings.host),
            SmtpSecurity::StartTls => SmtpTransport::starttls_relay(&settings.host),
            SmtpSecurity::Plain => Ok(SmtpTransport::builder_dangerous(&settings.host)),
        }
        .map_err(|e| SendMailError::Transport(format!("Failed to create SMTP transport: {}", e)))?;
        let builder = builder.port(settings.port);
        let builder = match &settings.password {
            Some(password) => {
                let user = settings.username.clone().unwrap_or_else(|| sender.to_string());
                builder.credentials(Credentials::new(user, password.clone()))
            }
            None => builder,
        };
        debug!(
            "SMTP transport to {}:{} ({:?})",
            settings.host, settings.port, settings.security
        );
        Self::with_transport(sender, builder.build())
    }
}

impl<T: Transport> LettreMailSender<T> {
    pub fn with_transport(sender: &str, transport: T) -> Result<Self, SendMailError> {
        let from = parse_mailbox(sender)?;
        Ok(Self { transport, from })
    }

    pub fn sender_mailbox(&self) -> &Mailbox {
        &self.from
    }
}

impl<T> MailSender for LettreMailSender<T>
where
    T: Transport,
    T::Error: Display,
{
    fn send(
        &self,
        recipient: &str,
        kind: NotificationKind,
        contents: &[String],
    ) -> Result<(), SendMailError> {
        let email = build_message(&self.from, recipient, kind, contents)?;
        self.transport
            .send(&email)
            .map_err(|e| SendMailError::Transport(e.to_string()))?;
        debug!("Sent {} mail to {}", kind, recipient);
        Ok(())
    }
}

/// Plain-text message with one body line per content entry.
pub fn build_message(
    from: &Mailbox,
    to: &str,
    kind: NotificationKind,
    contents: &[String],
) -> Result<Message, SendMailError> {
    Message::builder()
        .from(from.clone())
        .to(parse_mailbox(to)?)
        .subject(kind.as_str())
        .header(ContentType::TEXT_PLAIN)
        .body(contents.join("\n"))
        .map_err(|e| SendMailError::Build(e.to_string()))
}

fn parse_mailbox(address: &str) -> Result<Mailbox, SendMailError> {
    Mailbox::from_str(address)
        .map_err(|e| SendMailError::InvalidAddress(format!("{}: {}", address, e)))
}
