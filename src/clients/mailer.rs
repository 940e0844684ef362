use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::info;

use crate::config::{MailConfig, ServerConfig};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid mail address: {0}")]
    Address(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("Mail transport error: {0}")]
    Transport(String),
}

/// Transactional email sender.
///
/// Injected as a trait object so issuance tests can observe sends without
/// a live SMTP relay.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Certificate-earned notification with the verification link.
    async fn send_certificate_issued(
        &self,
        to: &str,
        student_name: &str,
        event_name: &str,
        certificate_id: &str,
    ) -> Result<(), MailError>;

    /// Faculty account invite with a claim link.
    async fn send_faculty_invite(&self, to: &str, token: &str) -> Result<(), MailError>;

    /// Student roster-activation link.
    async fn send_student_activation(&self, to: &str, token: &str) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    public_base_url: String,
}

impl SmtpMailer {
    pub fn new(mail: &MailConfig, server: &ServerConfig) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&mail.smtp_host)?
            .port(mail.smtp_port)
            .credentials(Credentials::new(
                mail.username.clone(),
                mail.password.clone(),
            ))
            .build();

        let from: Mailbox = format!("{} <{}>", mail.from_name, mail.from_address)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid from address: {e}"))?;

        Ok(Self {
            transport,
            from,
            public_base_url: server.public_base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn send_html(&self, to: &str, subject: &str, html: String) -> Result<(), MailError> {
        let to: Mailbox = to
            .parse()
            .map_err(|e| MailError::Address(format!("{to}: {e}")))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html)
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_certificate_issued(
        &self,
        to: &str,
        student_name: &str,
        event_name: &str,
        certificate_id: &str,
    ) -> Result<(), MailError> {
        let verify_link = format!("{}/verify/{certificate_id}", self.public_base_url);

        let html = format!(
            r#"<div style="font-family: Arial, sans-serif; padding: 20px; color: #333;">
    <h2 style="color: #2563eb;">Congratulations, {student_name}!</h2>
    <p>You have successfully earned a new verifiable credential for <strong>{event_name}</strong>.</p>
    <div style="background-color: #f1f5f9; padding: 15px; border-radius: 5px; margin: 20px 0;">
        <p style="margin: 0; font-size: 14px; color: #64748b;">Certificate ID:</p>
        <p style="margin: 5px 0 0 0; font-family: monospace; font-size: 16px;">{certificate_id}</p>
    </div>
    <p>This certificate has been secured on the blockchain as a permanent record.</p>
    <a href="{verify_link}" style="display: inline-block; padding: 12px 24px; background-color: #16a34a; color: white; text-decoration: none; border-radius: 5px; font-weight: bold;">
        View &amp; Verify Certificate
    </a>
    <p style="margin-top: 20px; font-size: 12px; color: #888;">
        You can also view this in your student dashboard or your wallet.
    </p>
</div>"#,
        );

        self.send_html(
            to,
            &format!("New Certificate Earned for {event_name}"),
            html,
        )
        .await?;

        info!("Certificate email sent to {to}");
        Ok(())
    }

    async fn send_faculty_invite(&self, to: &str, token: &str) -> Result<(), MailError> {
        let invite_link = format!("{}/claim-invite/{token}", self.public_base_url);

        let html = format!(
            r#"<h1>Welcome!</h1>
<p>You have been invited to join the platform as Faculty.</p>
<p>Please click the link below to set up your account. This link is valid for 24 hours.</p>
<a href="{invite_link}" style="padding: 10px 15px; background-color: #007bff; color: white; text-decoration: none; border-radius: 5px;">
    Click Here to Activate Your Account
</a>
<p>If you did not request this, please ignore this email.</p>"#,
        );

        self.send_html(to, "You have been invited to CredChain", html)
            .await?;

        info!("Invite email sent to {to}");
        Ok(())
    }

    async fn send_student_activation(&self, to: &str, token: &str) -> Result<(), MailError> {
        let activation_link = format!("{}/activate-account/{token}", self.public_base_url);

        let html = format!(
            r#"<h1>Welcome, Student!</h1>
<p>Your account is ready to be activated. Please click the link below to set your password.</p>
<p>This link is valid for 24 hours.</p>
<a href="{activation_link}" style="padding: 10px 15px; background-color: #007bff; color: white; text-decoration: none; border-radius: 5px;">
    Click Here to Set Your Password
</a>
<p>If you did not request this, please ignore this email.</p>"#,
        );

        self.send_html(to, "Activate Your CredChain Account", html)
            .await?;

        info!("Activation email sent to {to}");
        Ok(())
    }
}
