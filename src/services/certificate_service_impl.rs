//! `SeaORM` implementation of the `CertificateService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::clients::ledger::LedgerClient;
use crate::clients::mailer::Mailer;
use crate::db::{NewCertificate, Store};
use crate::entities::certificates;
use crate::services::certificate_service::{
    BulkIssueReport, CertificateError, CertificateService, ChainStatus, IssueRequest,
    VerifiedCertificate, certificate_hash, generate_certificate_id,
};

pub struct SeaOrmCertificateService {
    store: Store,
    ledger: Arc<dyn LedgerClient>,
    mailer: Arc<dyn Mailer>,
}

impl SeaOrmCertificateService {
    #[must_use]
    pub fn new(store: Store, ledger: Arc<dyn LedgerClient>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            store,
            ledger,
            mailer,
        }
    }

    /// Shared per-student issuance path: wallet precondition, duplicate
    /// check, mint, persist, notify. The mint only happens once both local
    /// checks pass, and the row is only written after the mint succeeds.
    async fn issue_to_student(
        &self,
        event_name: &str,
        event_date: &str,
        student_name: &str,
        student_email: &str,
        issuer_id: i32,
    ) -> Result<certificates::Model, CertificateError> {
        let normalized_email = student_email.to_lowercase();

        let student = self
            .store
            .user_by_email(&normalized_email)
            .await?
            .ok_or(CertificateError::StudentNotFound)?;

        let wallet = student
            .wallet_address
            .filter(|w| !w.is_empty())
            .ok_or_else(|| CertificateError::WalletNotBound(student.name.clone()))?;

        if self
            .store
            .certificate_by_pair(event_name, &normalized_email)
            .await?
            .is_some()
        {
            return Err(CertificateError::AlreadyIssued);
        }

        let hash = certificate_hash(&normalized_email, event_date, event_name);

        let receipt = self.ledger.mint(&wallet, &hash).await?;

        let record = self
            .store
            .insert_certificate(NewCertificate {
                certificate_id: generate_certificate_id(),
                token_id: receipt.token_id,
                certificate_hash: hash,
                transaction_hash: receipt.transaction_hash,
                student_name: student_name.to_string(),
                student_email: normalized_email.clone(),
                event_name: event_name.to_string(),
                event_date: event_date.to_string(),
                issued_by: issuer_id,
            })
            .await?
            // A concurrent issuance won the insert; same outcome as the
            // pre-mint existence check firing.
            .ok_or(CertificateError::AlreadyIssued)?;

        if let Err(e) = self
            .mailer
            .send_certificate_issued(
                &normalized_email,
                student_name,
                event_name,
                &record.certificate_id,
            )
            .await
        {
            // Notification is best-effort; the certificate is already
            // minted and persisted.
            warn!("Failed to send certificate email to {normalized_email}: {e}");
        }

        info!(
            "Issued {} to {} for '{}'",
            record.certificate_id, normalized_email, event_name
        );

        Ok(record)
    }
}

#[async_trait]
impl CertificateService for SeaOrmCertificateService {
    async fn issue_single(
        &self,
        request: IssueRequest,
        issuer_id: i32,
    ) -> Result<certificates::Model, CertificateError> {
        let mut missing = Vec::new();
        if request.event_name.trim().is_empty() {
            missing.push("eventName");
        }
        if request.event_date.trim().is_empty() {
            missing.push("eventDate");
        }
        if request.student_name.trim().is_empty() {
            missing.push("studentName");
        }
        if request.student_email.trim().is_empty() {
            missing.push("studentEmail");
        }
        if !missing.is_empty() {
            return Err(CertificateError::Validation(missing.join(", ")));
        }

        self.issue_to_student(
            &request.event_name,
            &request.event_date,
            &request.student_name,
            &request.student_email,
            issuer_id,
        )
        .await
    }

    async fn issue_for_event(
        &self,
        event_id: i32,
        issuer_id: i32,
    ) -> Result<BulkIssueReport, CertificateError> {
        let event = self
            .store
            .get_event(event_id)
            .await?
            .ok_or(CertificateError::EventNotFound)?;

        let participants = self.store.event_participants(event_id).await?;

        let mut report = BulkIssueReport::default();

        for participant in participants {
            match self
                .issue_to_student(
                    &event.name,
                    &event.date,
                    &participant.name,
                    &participant.email,
                    issuer_id,
                )
                .await
            {
                Ok(_) => report.issued += 1,
                Err(
                    CertificateError::StudentNotFound | CertificateError::WalletNotBound(_),
                ) => {
                    report
                        .errors
                        .push(format!("Skipped {}: Wallet not connected.", participant.name));
                    report.skipped += 1;
                }
                Err(CertificateError::AlreadyIssued) => {
                    report.skipped += 1;
                }
                Err(e) => {
                    report
                        .errors
                        .push(format!("Failed {}: {e}", participant.name));
                    report.skipped += 1;
                }
            }
        }

        // The event is considered processed even when every participant
        // was skipped or failed.
        self.store.mark_event_certificates_issued(event_id).await?;

        info!(
            "Bulk issuance for event {} complete: {} issued, {} skipped",
            event_id, report.issued, report.skipped
        );

        Ok(report)
    }

    async fn verify(
        &self,
        certificate_id: &str,
    ) -> Result<VerifiedCertificate, CertificateError> {
        let record = self
            .store
            .certificate_by_public_id(certificate_id)
            .await?
            .ok_or(CertificateError::CertificateNotFound)?;

        let issued_by_name = self
            .store
            .user_by_id(record.issued_by)
            .await?
            .map_or_else(|| "Unknown".to_string(), |u| u.name);

        let chain_status = match self.ledger.validity(&record.certificate_hash).await {
            Ok(true) => ChainStatus::Verified,
            Ok(false) => ChainStatus::Revoked,
            Err(e) => {
                warn!(
                    "Ledger check failed for {}: {e}",
                    record.certificate_id
                );
                ChainStatus::Unavailable(e.to_string())
            }
        };

        Ok(VerifiedCertificate {
            record,
            issued_by_name,
            chain_status,
        })
    }

    async fn revoke(&self, certificate_id: &str) -> Result<String, CertificateError> {
        let record = self
            .store
            .certificate_by_public_id(certificate_id)
            .await?
            .ok_or(CertificateError::CertificateNotFound)?;

        let tx_hash = self
            .ledger
            .revoke_by_hash(&record.certificate_hash)
            .await?;

        info!("Revoked {} (tx {tx_hash})", record.certificate_id);

        Ok(tx_hash)
    }

    async fn list_for_student(
        &self,
        email: &str,
    ) -> Result<Vec<certificates::Model>, CertificateError> {
        Ok(self.store.certificates_for_student(email).await?)
    }
}
