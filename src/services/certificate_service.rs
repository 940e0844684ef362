//! Domain service for the certificate issuance, verification and
//! revocation workflow.

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::clients::ledger::LedgerError;
use crate::constants::{CERT_ID_LEN, CERT_ID_PREFIX};
use crate::entities::certificates;

#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("Missing required fields: {0}")]
    Validation(String),

    #[error("Student account not found.")]
    StudentNotFound,

    /// The student exists but never bound a wallet; nothing can be minted
    /// for them. Carries the student's display name for batch reports.
    #[error("Student ({0}) has not connected their wallet.")]
    WalletNotBound(String),

    #[error("Certificate already exists.")]
    AlreadyIssued,

    #[error("Event not found")]
    EventNotFound,

    #[error("Certificate not found or invalid.")]
    CertificateNotFound,

    #[error("Blockchain transaction failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<anyhow::Error> for CertificateError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Input for a one-off issuance.
#[derive(Debug, Clone)]
pub struct IssueRequest {
    pub event_name: String,
    pub event_date: String,
    pub student_name: String,
    pub student_email: String,
}

/// Outcome of an event-wide issuance pass. The batch never fails as a
/// whole; per-student problems are collected here.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkIssueReport {
    pub issued: u32,
    pub skipped: u32,
    pub errors: Vec<String>,
}

/// Live ledger state for a locally known certificate. Transport failures
/// are surfaced distinctly instead of being folded into "not on chain".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainStatus {
    Verified,
    Revoked,
    Unavailable(String),
}

/// Local snapshot composed with the live chain check.
#[derive(Debug, Clone)]
pub struct VerifiedCertificate {
    pub record: certificates::Model,
    pub issued_by_name: String,
    pub chain_status: ChainStatus,
}

#[async_trait::async_trait]
pub trait CertificateService: Send + Sync {
    /// Issues one certificate: hashes the (student, event, date) triple,
    /// mints it on the ledger, persists the snapshot and sends the
    /// notification (notification failures are logged, not surfaced).
    async fn issue_single(
        &self,
        request: IssueRequest,
        issuer_id: i32,
    ) -> Result<certificates::Model, CertificateError>;

    /// Applies the single-issuance logic to every participant of the
    /// event, then marks the event issued regardless of the outcome.
    async fn issue_for_event(
        &self,
        event_id: i32,
        issuer_id: i32,
    ) -> Result<BulkIssueReport, CertificateError>;

    /// Public verification: local lookup first (absent locally is
    /// NotFound no matter what the ledger says), then the chain check.
    async fn verify(&self, certificate_id: &str)
    -> Result<VerifiedCertificate, CertificateError>;

    /// Forwards the stored hash to the ledger revoke operation. No local
    /// state changes; verification re-derives revocation from the chain.
    async fn revoke(&self, certificate_id: &str) -> Result<String, CertificateError>;

    async fn list_for_student(
        &self,
        email: &str,
    ) -> Result<Vec<certificates::Model>, CertificateError>;
}

/// Deterministic content hash: SHA-256 over lowercased email + event date
/// + event name, hex-encoded. The preimage concatenates the strings
/// exactly as issued, so the same triple always re-derives the same hash.
#[must_use]
pub fn certificate_hash(student_email: &str, event_date: &str, event_name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(student_email.to_lowercase().as_bytes());
    hasher.update(event_date.as_bytes());
    hasher.update(event_name.as_bytes());
    hex::encode(hasher.finalize())
}

/// Short public identifier: `CERT-` + 10 random alphanumeric chars.
#[must_use]
pub fn generate_certificate_id() -> String {
    use rand::Rng;
    use rand::distr::Alphanumeric;

    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(CERT_ID_LEN)
        .map(char::from)
        .collect();

    format!("{CERT_ID_PREFIX}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic_and_case_normalized() {
        let a = certificate_hash("Jane@Example.com", "2026-03-14", "Rust Workshop");
        let b = certificate_hash("jane@example.com", "2026-03-14", "Rust Workshop");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_changes_with_any_component() {
        let base = certificate_hash("jane@example.com", "2026-03-14", "Rust Workshop");
        assert_ne!(
            base,
            certificate_hash("john@example.com", "2026-03-14", "Rust Workshop")
        );
        assert_ne!(
            base,
            certificate_hash("jane@example.com", "2026-03-15", "Rust Workshop")
        );
        assert_ne!(
            base,
            certificate_hash("jane@example.com", "2026-03-14", "Go Workshop")
        );
    }

    #[test]
    fn certificate_ids_match_the_public_pattern() {
        let id = generate_certificate_id();
        assert!(id.starts_with(CERT_ID_PREFIX));
        assert_eq!(id.len(), CERT_ID_PREFIX.len() + CERT_ID_LEN);
        assert!(
            id[CERT_ID_PREFIX.len()..]
                .chars()
                .all(|c| c.is_ascii_alphanumeric())
        );
        assert_ne!(id, generate_certificate_id());
    }
}
