//! Outbound notifications for the registration flow.
//!
//! [`SmtpNotifier`] delivers through an SMTP relay. [`LogNotifier`] only
//! records that a message would have been sent and is selected explicitly
//! with `MAIL_MODE=log`. Without either, [`UnconfiguredNotifier`] makes every
//! registration fail.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub mod logger;
pub mod smtp;

pub use logger::LogNotifier;
pub use smtp::SmtpNotifier;

use crate::auth::config::positive_env_or;

/// Default frontend base URL used to build verification links
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";

/// Mail errors
#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("SMTP is not configured")]
    NotConfigured,
}

pub type MailResult<T> = Result<T, MailError>;

/// Outcome reported by a notifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub success: bool,
    pub message_id: Option<String>,
}

/// Sends the verification email of a pending registration
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a verification email containing a link built from `token`.
    ///
    /// # Arguments
    ///
    /// * `to` - Recipient address
    /// * `token` - Email verification token
    /// * `display_name` - Optional greeting name
    ///
    /// # Errors
    ///
    /// Returns `MailError` if the message cannot be built or the transport fails
    async fn send_verification_email(
        &self,
        to: &str,
        token: &str,
        display_name: Option<&str>,
    ) -> MailResult<Delivery>;
}

/// Notifier that refuses every message. Stands in when SMTP is missing.
#[derive(Debug, Default, Clone)]
pub struct UnconfiguredNotifier;

#[async_trait]
impl Notifier for UnconfiguredNotifier {
    async fn send_verification_email(
        &self,
        to: &str,
        _token: &str,
        _display_name: Option<&str>,
    ) -> MailResult<Delivery> {
        log::error!("Cannot send verification email to {to}: SMTP is not configured");
        Err(MailError::NotConfigured)
    }
}

/// How verification emails leave the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MailMode {
    /// Deliver through the configured SMTP relay
    #[default]
    Smtp,
    /// Log the recipient and report success without sending
    Log,
}

impl MailMode {
    /// Parse `MAIL_MODE`; only `log` selects [`MailMode::Log`]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "log" => MailMode::Log,
            _ => MailMode::Smtp,
        }
    }
}

/// Pick the notifier for `config`.
///
/// - [`MailMode::Log`]: [`LogNotifier`]
/// - [`MailMode::Smtp`] with settings: [`SmtpNotifier`]
/// - [`MailMode::Smtp`] without settings: [`UnconfiguredNotifier`]
///
/// # Errors
///
/// Returns `MailError` if the SMTP settings are present but unusable
pub fn build_notifier(config: &MailConfig) -> MailResult<Arc<dyn Notifier>> {
    match (config.mode, &config.smtp) {
        (MailMode::Log, _) => {
            log::warn!("MAIL_MODE=log: verification emails are logged, not sent");
            Ok(Arc::new(LogNotifier::new()))
        }
        (MailMode::Smtp, Some(_)) => Ok(Arc::new(SmtpNotifier::from_config(config)?)),
        (MailMode::Smtp, None) => {
            log::error!("SMTP is not configured; registrations will fail until it is");
            Ok(Arc::new(UnconfiguredNotifier))
        }
    }
}

/// SMTP relay settings
#[derive(Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    /// Implicit TLS; otherwise STARTTLS is required
    pub secure: bool,
    pub user: String,
    pub pass: String,
    pub from: String,
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secure", &self.secure)
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .field("from", &self.from)
            .finish()
    }
}

/// Mail configuration
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub frontend_url: String,
    /// Display name on the `From` header
    pub sender_name: String,
    /// `None` when SMTP delivery is disabled
    pub smtp: Option<SmtpSettings>,
    pub mode: MailMode,
}

impl MailConfig {
    /// Load mail configuration from environment variables
    ///
    /// Reads `FRONTEND_URL`, `APP_NAME`, `MAIL_MODE` and the `SMTP_*` family. SMTP is
    /// disabled unless both `SMTP_USER` and `SMTP_PASS` are set and either
    /// `SMTP_SERVICE=gmail` or `SMTP_HOST` names a relay.
    pub fn from_env() -> Self {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        let frontend_url = var("FRONTEND_URL").unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string());
        let sender_name = var("APP_NAME").unwrap_or_else(|| "User Auth".to_string());

        let smtp = match (var("SMTP_USER"), var("SMTP_PASS")) {
            (Some(user), Some(pass)) => {
                let from = var("SMTP_FROM").unwrap_or_else(|| user.clone());
                let port = positive_env_or("SMTP_PORT", 587).min(u16::MAX as u64) as u16;
                let secure_flag = var("SMTP_SECURE")
                    .map(|s| s == "true" || s == "1")
                    .unwrap_or(false);
                smtp_settings(
                    var("SMTP_SERVICE").as_deref(),
                    var("SMTP_HOST"),
                    port,
                    secure_flag,
                    user,
                    pass,
                    from,
                )
            }
            _ => {
                log::warn!("SMTP_USER/SMTP_PASS missing; email sending disabled");
                None
            }
        };

        Self {
            frontend_url,
            sender_name,
            smtp,
            mode: MailMode::parse(var("MAIL_MODE").as_deref()),
        }
    }

    /// Log-only configuration without SMTP, for development and tests
    pub fn development() -> Self {
        Self {
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            sender_name: "User Auth".to_string(),
            smtp: None,
            mode: MailMode::Log,
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self::development()
    }
}

fn smtp_settings(
    service: Option<&str>,
    host: Option<String>,
    port: u16,
    secure_flag: bool,
    user: String,
    pass: String,
    from: String,
) -> Option<SmtpSettings> {
    if service == Some("gmail") {
        return Some(SmtpSettings {
            host: "smtp.gmail.com".to_string(),
            port: 465,
            secure: true,
            user,
            pass,
            from,
        });
    }

    match host {
        Some(host) => Some(SmtpSettings {
            host,
            port,
            secure: secure_flag || port == 465,
            user,
            pass,
            from,
        }),
        None => {
            log::warn!("SMTP_SERVICE and SMTP_HOST missing; email sending disabled");
            None
        }
    }
}

/// Link the user follows to verify their email
pub fn verification_link(frontend_url: &str, token: &str) -> String {
    format!(
        "{}/verify-email?token={}",
        frontend_url.trim_end_matches('/'),
        token
    )
}

/// Subject line of the verification email
pub const VERIFICATION_SUBJECT: &str = "Verify your email address";

/// HTML body of the verification email
pub fn render_verification_email(link: &str, display_name: Option<&str>) -> String {
    let greeting = display_name
        .filter(|name| !name.trim().is_empty())
        .map(|name| format!("<p>Hello <strong>{}</strong>,</p>", escape_html(name)))
        .unwrap_or_default();
    let link = escape_html(link);

    format!(
        r#"<div style="font-family:Arial,sans-serif;line-height:1.6">
  <h3>Confirm your registration</h3>
  {greeting}
  <p>Click the button below to verify your email address:</p>
  <p><a href="{link}" style="display:inline-block;background:#1a73e8;color:#fff;padding:10px 16px;border-radius:6px;text-decoration:none">Verify email</a></p>
  <p>If the button does not work, copy this link into your browser:</p>
  <p style="word-break:break-all;background:#f2f4f7;padding:8px 10px;border-radius:4px">{link}</p>
  <p style="color:#667085;font-size:12px">The link is valid for 1 hour.</p>
</div>"#
    )
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
