use async_trait::async_trait;

use super::{Delivery, MailResult, Notifier};

/// Notifier that only logs the recipient. Selected with `MAIL_MODE=log`.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_verification_email(
        &self,
        to: &str,
        _token: &str,
        _display_name: Option<&str>,
    ) -> MailResult<Delivery> {
        log::info!("Email delivery disabled; skipping verification email to {to}");
        Ok(Delivery {
            success: true,
            message_id: None,
        })
    }
}
