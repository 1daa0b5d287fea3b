//! Outbound email: transport abstraction plus the verification helper used by
//! sign-up.

mod resend;
mod templates;

pub use resend::ResendTransport;
pub use templates::{RenderedEmail, VerificationEmail};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("email provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("email provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// A fully addressed message.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub from: String,
    pub to: String,
    pub content: RenderedEmail,
}

#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), EmailError>;
}

/// Local dev transport: logs instead of delivering.
#[derive(Clone, Debug, Default)]
pub struct LogTransport;

#[async_trait]
impl EmailTransport for LogTransport {
    async fn send(&self, email: &OutboundEmail) -> Result<(), EmailError> {
        info!(
            to = %email.to,
            subject = %email.content.subject,
            body = %email.content.text,
            "email send stub"
        );
        Ok(())
    }
}

/// Result of a dispatch attempt, reported back to the caller as data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub success: bool,
    pub message: String,
}

/// Renders and sends the one-time code. Never retries; failure is reported in
/// the outcome and logged.
pub async fn send_verification_email(
    transport: &dyn EmailTransport,
    from: &str,
    email: &str,
    display_name: &str,
    code: &str,
) -> DispatchOutcome {
    let message = OutboundEmail {
        from: from.to_string(),
        to: email.to_string(),
        content: VerificationEmail { display_name, code }.render(),
    };

    match transport.send(&message).await {
        Ok(()) => {
            info!(to = %email, "verification email sent");
            DispatchOutcome {
                success: true,
                message: "Verification email sent successfully".into(),
            }
        }
        Err(e) => {
            error!(error = %e, to = %email, "error sending verification email");
            DispatchOutcome {
                success: false,
                message: "Failed to send verification email".into(),
            }
        }
    }
}
