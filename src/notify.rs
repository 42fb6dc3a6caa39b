//! Best-effort email notifications.
//!
//! Notifications are dispatched on a detached task after the store write has
//! committed. Failures are logged and never reach the HTTP caller.

use crate::config::MailConfig;
use crate::errors::NotificationError;
use async_trait::async_trait;
use lettre::message::{Mailbox, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;
use tracing::{error, info, warn};

const SENDER_NAME: &str = "Fuel Up Website";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub html: String,
}

impl Notification {
    pub fn new_member(email: &str, count: u64, source: &str) -> Self {
        Self {
            subject: "New Tribe Member Joined!".to_string(),
            html: format!(
                "<h2>New Tribe Member Alert!</h2>\
                 <p><strong>Email:</strong> {email}</p>\
                 <p><strong>Time:</strong> {time}</p>\
                 <p><strong>Total Tribe Members:</strong> {count}</p>\
                 <p><strong>Source:</strong> {source}</p>",
                time = now_label(),
            ),
        }
    }

    pub fn contact(name: &str, email: &str, message: &str) -> Self {
        Self {
            subject: "New Contact Form Submission".to_string(),
            html: format!(
                "<h2>New Contact Form Submission</h2>\
                 <p><strong>Name:</strong> {name}</p>\
                 <p><strong>Email:</strong> {email}</p>\
                 <p><strong>Message:</strong></p>\
                 <p>{message}</p>\
                 <p><strong>Time:</strong> {time}</p>",
                time = now_label(),
            ),
        }
    }
}

fn now_label() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError>;
}

/// Used when no mail credentials are configured.
#[derive(Debug, Default)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        warn!(
            subject = %notification.subject,
            "skipping email notification: mail transport not configured"
        );
        Ok(())
    }
}

/// Sends over authenticated SMTP (STARTTLS/TLS relay) with the mail credentials.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, NotificationError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?
            .credentials(Credentials::new(config.user.clone(), config.password.clone()))
            .build();

        Ok(Self {
            transport,
            from: Mailbox::new(Some(SENDER_NAME.to_string()), config.user.parse()?),
            to: Mailbox::new(None, config.recipient.parse()?),
        })
    }

    pub fn build_message(&self, notification: &Notification) -> Result<Message, NotificationError> {
        Ok(Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(notification.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(notification.html.clone())?)
    }
}

#[async_trait]
impl Notifier for SmtpMailer {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        let message = self.build_message(notification)?;
        self.transport.send(message).await?;
        Ok(())
    }
}

pub fn from_config(mail: Option<MailConfig>) -> Arc<dyn Notifier> {
    let Some(config) = mail else {
        warn!(
            "Email sending is disabled. Set EMAIL_USER and EMAIL_PASS to enable email notifications."
        );
        return Arc::new(DisabledNotifier);
    };

    match SmtpMailer::new(&config) {
        Ok(mailer) => {
            info!("email notifications enabled via {}", config.smtp_host);
            Arc::new(mailer)
        }
        Err(err) => {
            error!("email notifications disabled, mail config rejected: {err}");
            Arc::new(DisabledNotifier)
        }
    }
}

/// Queues `notification` on a detached task.
pub fn dispatch(notifier: Arc<dyn Notifier>, notification: Notification) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(err) = notifier.send(&notification).await {
            error!(subject = %notification.subject, "email sending failed: {err}");
        }
    })
}
