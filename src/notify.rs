//! Alert delivery for unauthorized device sightings.

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use serde::{Deserialize, Serialize};

use crate::monitor::UnauthorizedEvent;

/// SMTP settings handed to the notifier at construction.
///
/// Supplied by the configuration layer; the core never embeds server
/// addresses or credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub sender_email: String,
    pub sender_password: String,
    pub recipient_email: String,
}

/// Errors from alert delivery. Never fatal to the monitor loop.
#[derive(Debug)]
pub enum NotifyError {
    /// A configured address could not be parsed.
    Config(String),
    /// The message could not be assembled.
    Build(String),
    /// The SMTP transport failed.
    Send(String),
}

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyError::Config(e) => write!(f, "notifier configuration error: {e}"),
            NotifyError::Build(e) => write!(f, "could not build alert message: {e}"),
            NotifyError::Send(e) => write!(f, "could not send alert: {e}"),
        }
    }
}

impl std::error::Error for NotifyError {}

/// Delivers an alert for an unauthorized sighting.
pub trait Notifier {
    fn notify(&self, event: &UnauthorizedEvent) -> Result<(), NotifyError>;
}

/// Email notifier backed by a blocking STARTTLS SMTP transport.
pub struct EmailNotifier {
    config: EmailConfig,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, event: &UnauthorizedEvent) -> Result<Message, NotifyError> {
        let from: Mailbox = self
            .config
            .sender_email
            .parse()
            .map_err(|e| NotifyError::Config(format!("invalid sender address: {e}")))?;
        let to: Mailbox = self
            .config
            .recipient_email
            .parse()
            .map_err(|e| NotifyError::Config(format!("invalid recipient address: {e}")))?;

        let body = format!(
            "Security alert: an unauthorized USB device was connected.\n\
             \n\
             Vendor ID:  {}\n\
             Product ID: {}\n\
             Device:     {}\n\
             Detected:   {}\n\
             Host:       {}\n\
             User:       {}\n\
             \n\
             Please investigate this incident.\n\
             \n\
             -- usb-sentry\n",
            event.vendor_id,
            event.product_id,
            event.device_name,
            event.timestamp,
            event.host,
            event.observer,
        );

        Message::builder()
            .from(from)
            .to(to)
            .subject("SECURITY ALERT: Unauthorized USB Device Detected")
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| NotifyError::Build(e.to_string()))
    }
}

impl Notifier for EmailNotifier {
    fn notify(&self, event: &UnauthorizedEvent) -> Result<(), NotifyError> {
        let email = self.build_message(event)?;

        let credentials = Credentials::new(
            self.config.sender_email.clone(),
            self.config.sender_password.clone(),
        );
        let mailer = SmtpTransport::starttls_relay(&self.config.smtp_server)
            .map_err(|e| NotifyError::Send(e.to_string()))?
            .port(self.config.smtp_port)
            .credentials(credentials)
            .build();

        mailer
            .send(&email)
            .map_err(|e| NotifyError::Send(e.to_string()))?;
        Ok(())
    }
}
