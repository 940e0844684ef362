use serde::{Deserialize, Serialize};

use crate::db::UserRecord;
use crate::entities::users::Role;
use crate::entities::{certificates, event_participants, events};
use crate::services::{ChainStatus, VerifiedCertificate};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub usn: Option<String>,
    pub role: Role,
    pub wallet_address: Option<String>,
    pub department: Option<String>,
    pub year: Option<i32>,
    pub semester: Option<String>,
    pub created_at: String,
}

impl From<UserRecord> for UserDto {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            usn: user.usn,
            role: user.role,
            wallet_address: user.wallet_address,
            department: user.department,
            year: user.year,
            semester: user.semester,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserDto,
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct EventDto {
    pub id: i32,
    pub name: String,
    pub date: String,
    pub description: String,
    pub created_by: String,
    pub certificates_issued: bool,
    pub participant_count: usize,
}

#[derive(Debug, Serialize)]
pub struct ParticipantDto {
    pub name: String,
    pub email: String,
    pub registered_at: String,
}

impl From<event_participants::Model> for ParticipantDto {
    fn from(p: event_participants::Model) -> Self {
        Self {
            name: p.name,
            email: p.email,
            registered_at: p.registered_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub name: String,
    pub date: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub certificate_style: Option<events::CertificateStyle>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct CertificateDto {
    pub certificate_id: String,
    pub token_id: String,
    pub certificate_hash: String,
    pub transaction_hash: String,
    pub student_name: String,
    pub student_email: String,
    pub event_name: String,
    pub event_date: String,
    pub issued_on: String,
    pub verification_url: String,
}

impl CertificateDto {
    #[must_use]
    pub fn from_model(model: certificates::Model) -> Self {
        let verification_url = format!("/verify/{}", model.certificate_id);
        Self {
            certificate_id: model.certificate_id,
            token_id: model.token_id,
            certificate_hash: model.certificate_hash,
            transaction_hash: model.transaction_hash,
            student_name: model.student_name,
            student_email: model.student_email,
            event_name: model.event_name,
            event_date: model.event_date,
            issued_on: model.created_at,
            verification_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IssueSingleRequest {
    #[serde(rename = "eventName")]
    pub event_name: String,
    #[serde(rename = "eventDate")]
    pub event_date: String,
    #[serde(rename = "studentName")]
    pub student_name: String,
    #[serde(rename = "studentEmail")]
    pub student_email: String,
}

#[derive(Debug, Deserialize)]
pub struct RevokeRequest {
    #[serde(rename = "certificateId")]
    pub certificate_id: String,
}

#[derive(Debug, Serialize)]
pub struct VerificationDto {
    pub certificate_id: String,
    pub student_name: String,
    pub event_name: String,
    pub event_date: String,
    pub issued_by: String,
    pub issued_on: String,
    pub certificate_hash: String,
    pub transaction_hash: String,
    /// Anchored on the ledger and not revoked.
    pub is_chain_verified: bool,
    pub is_revoked: bool,
    /// "verified" | "revoked" | "unavailable". Transport failures are
    /// reported distinctly, never folded into "not on chain".
    pub chain_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_error: Option<String>,
}

impl From<VerifiedCertificate> for VerificationDto {
    fn from(verified: VerifiedCertificate) -> Self {
        let (is_chain_verified, is_revoked, chain_status, chain_error) =
            match verified.chain_status {
                ChainStatus::Verified => (true, false, "verified", None),
                ChainStatus::Revoked => (true, true, "revoked", None),
                ChainStatus::Unavailable(reason) => {
                    (false, false, "unavailable", Some(reason))
                }
            };

        let record = verified.record;

        Self {
            certificate_id: record.certificate_id,
            student_name: record.student_name,
            event_name: record.event_name,
            event_date: record.event_date,
            issued_by: verified.issued_by_name,
            issued_on: record.created_at,
            certificate_hash: record.certificate_hash,
            transaction_hash: record.transaction_hash,
            is_chain_verified,
            is_revoked,
            chain_status: chain_status.to_string(),
            chain_error,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyticsDto {
    pub total_students: u64,
    pub total_events: u64,
    pub total_certificates: u64,
    pub certificates_by_department: Vec<DepartmentCountDto>,
    pub students_by_department: Vec<DepartmentCountDto>,
}

#[derive(Debug, Serialize)]
pub struct DepartmentCountDto {
    pub name: String,
    pub count: i64,
}
