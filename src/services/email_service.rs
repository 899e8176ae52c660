//! Servicio de email
//!
//! Plain-text notifications over SMTP. Without `SMTP_HOST` the mails are only
//! logged, which keeps local development and tests free of a mail server.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::config::environment::SmtpConfig;
use crate::utils::errors::{AppError, AppResult};

/// Rendered email ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Email {
    pub fn welcome(to: &str, full_name: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Welcome to EV Service Center".to_string(),
            body: format!(
                "Hello {},\n\nYour account has been created. You can now book maintenance \
                 appointments for your vehicles.\n\nEV Service Center",
                full_name
            ),
        }
    }

    pub fn password_reset_otp(to: &str, otp: &str, valid_minutes: u64) -> Self {
        Self {
            to: to.to_string(),
            subject: "Your password reset code".to_string(),
            body: format!(
                "Your password reset code is {}.\n\nIt expires in {} minutes. If you did not \
                 request a reset, ignore this email.\n\nEV Service Center",
                otp, valid_minutes
            ),
        }
    }

    pub fn appointment_booked(to: &str, scheduled_at: DateTime<Utc>, services: &[String]) -> Self {
        Self {
            to: to.to_string(),
            subject: "Appointment received".to_string(),
            body: format!(
                "We received your appointment for {} (UTC).\nServices: {}\n\nOur staff will \
                 confirm it shortly.\n\nEV Service Center",
                scheduled_at.format("%Y-%m-%d %H:%M"),
                services.join(", ")
            ),
        }
    }

    pub fn payment_receipt(to: &str, invoice_number: &str, amount: Decimal, outstanding: Decimal) -> Self {
        let status_line = if outstanding.is_zero() {
            "The invoice is now fully paid.".to_string()
        } else {
            format!("Remaining balance: {} VND.", outstanding)
        };
        Self {
            to: to.to_string(),
            subject: format!("Payment received for {}", invoice_number),
            body: format!(
                "We received {} VND for invoice {}.\n{}\n\nEV Service Center",
                amount, invoice_number, status_line
            ),
        }
    }
}

pub struct EmailService {
    mailer: Option<(AsyncSmtpTransport<Tokio1Executor>, Mailbox)>,
}

impl EmailService {
    pub fn new(config: Option<&SmtpConfig>) -> anyhow::Result<Self> {
        let Some(config) = config else {
            info!("SMTP not configured, emails will be logged only");
            return Ok(Self::disabled());
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port);
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }
        let from: Mailbox = config.from.parse()?;

        Ok(Self {
            mailer: Some((builder.build(), from)),
        })
    }

    pub fn disabled() -> Self {
        Self { mailer: None }
    }

    pub async fn send(&self, email: &Email) -> AppResult<()> {
        let Some((transport, from)) = &self.mailer else {
            info!(to = %email.to, subject = %email.subject, "Email (not sent, SMTP disabled)");
            return Ok(());
        };

        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| AppError::BadRequest(format!("Invalid recipient '{}': {}", email.to, e)))?;
        let message = Message::builder()
            .from(from.clone())
            .to(to)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|e| AppError::Internal(format!("Error building email: {}", e)))?;

        transport
            .send(message)
            .await
            .map_err(|e| AppError::ExternalApi(format!("SMTP error: {}", e)))?;
        info!(to = %email.to, subject = %email.subject, "Email sent");
        Ok(())
    }

    /// Fire and forget; failures are logged.
    pub fn dispatch(self: &Arc<Self>, email: Email) {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = service.send(&email).await {
                warn!(to = %email.to, "Email delivery failed: {}", e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_template() {
        let email = Email::password_reset_otp("a@b.vn", "123456", 5);
        assert!(email.body.contains("123456"));
        assert!(email.body.contains("5 minutes"));
    }

    #[test]
    fn test_receipt_mentions_balance() {
        let partial = Email::payment_receipt("a@b.vn", "INV-1", Decimal::from(100), Decimal::from(50));
        assert!(partial.body.contains("Remaining balance: 50"));
        let full = Email::payment_receipt("a@b.vn", "INV-1", Decimal::from(100), Decimal::ZERO);
        assert!(full.body.contains("fully paid"));
    }

    #[tokio::test]
    async fn test_disabled_service_logs_only() {
        let service = EmailService::disabled();
        assert!(service.send(&Email::welcome("a@b.vn", "An")).await.is_ok());
    }
}
