use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use uuid::Uuid;

use super::{
    Delivery, MailConfig, MailError, MailResult, Notifier, SmtpSettings, VERIFICATION_SUBJECT,
    render_verification_email, verification_link,
};

/// Notifier delivering through an authenticated SMTP relay
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
    frontend_url: String,
}

impl SmtpNotifier {
    /// Build a notifier from mail configuration.
    ///
    /// # Errors
    ///
    /// Returns `MailError::NotConfigured` if SMTP is disabled, or an address /
    /// transport error if the settings are unusable.
    pub fn from_config(config: &MailConfig) -> MailResult<Self> {
        let settings = config.smtp.as_ref().ok_or(MailError::NotConfigured)?;
        let sender = Mailbox::new(
            Some(config.sender_name.clone()),
            settings.from.parse::<Address>()?,
        );

        Ok(Self {
            transport: build_transport(settings)?,
            sender,
            frontend_url: config.frontend_url.clone(),
        })
    }
}

fn build_transport(settings: &SmtpSettings) -> MailResult<AsyncSmtpTransport<Tokio1Executor>> {
    let builder = if settings.secure {
        AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)?
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
    };

    Ok(builder
        .port(settings.port)
        .credentials(Credentials::new(
            settings.user.clone(),
            settings.pass.clone(),
        ))
        .build())
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_verification_email(
        &self,
        to: &str,
        token: &str,
        display_name: Option<&str>,
    ) -> MailResult<Delivery> {
        let link = verification_link(&self.frontend_url, token);
        let recipient = Mailbox::new(display_name.map(str::to_string), to.parse::<Address>()?);
        let message_id = format!("<{}@{}>", Uuid::new_v4(), self.sender.email.domain());

        let message = Message::builder()
            .from(self.sender.clone())
            .to(recipient)
            .subject(VERIFICATION_SUBJECT)
            .message_id(Some(message_id.clone()))
            .header(ContentType::TEXT_HTML)
            .body(render_verification_email(&link, display_name))?;

        let response = self.transport.send(message).await?;
        let success = response.is_positive();
        if !success {
            log::warn!(
                "SMTP relay rejected verification email with code {}",
                response.code()
            );
        }

        Ok(Delivery {
            success,
            message_id: success.then_some(message_id),
        })
    }
}
