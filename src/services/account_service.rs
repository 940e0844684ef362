//! Domain service for accounts: login, invites, roster activation,
//! wallet binding and password changes.

use thiserror::Error;

use crate::clients::mailer::MailError;
use crate::db::UserRecord;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// Unknown, expired or already-consumed invite token.
    #[error("This invite link is invalid or has expired.")]
    InvalidToken,

    /// Invite/activation mail could not be sent; the operation is aborted
    /// so the admin knows the invitee was never reached.
    #[error("Could not send email: {0}")]
    Mail(#[from] MailError),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<anyhow::Error> for AccountError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

#[async_trait::async_trait]
pub trait AccountService: Send + Sync {
    /// Verifies credentials and returns the account.
    async fn login(&self, email: &str, password: &str) -> Result<UserRecord, AccountError>;

    /// Creates a Faculty invite and mails the claim link. Fails when the
    /// email already belongs to an account or the mail cannot be sent.
    async fn invite_faculty(
        &self,
        name: &str,
        email: &str,
        department: Option<&str>,
    ) -> Result<(), AccountError>;

    /// Consumes a Faculty invite token and creates the account.
    async fn claim_invite(&self, token: &str, password: &str)
    -> Result<UserRecord, AccountError>;

    /// Mails an activation link to a student present on the pending
    /// roster, identified by email + USN.
    async fn request_student_activation(
        &self,
        email: &str,
        usn: &str,
    ) -> Result<(), AccountError>;

    /// Consumes a student activation token: creates the Student account
    /// from the roster row and deletes the consumed row.
    async fn activate_student(
        &self,
        token: &str,
        password: &str,
    ) -> Result<UserRecord, AccountError>;

    /// Changes a password after verifying the current one.
    async fn change_password(
        &self,
        user_id: i32,
        email: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AccountError>;

    /// Binds an external wallet address to the account. Certificate
    /// issuance requires this.
    async fn bind_wallet(&self, user_id: i32, wallet_address: &str)
    -> Result<(), AccountError>;
}
