use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::{Capability, authorize, current_user};
use super::{
    ApiError, ApiResponse, AppState, CertificateDto, IssueSingleRequest, RevokeRequest,
    VerificationDto,
};
use crate::render::{CertificateDocument, render_certificate};
use crate::services::{BulkIssueReport, IssueRequest};

/// POST /certificates/issue
pub async fn issue_single(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Json(payload): Json<IssueSingleRequest>,
) -> Result<Json<ApiResponse<CertificateDto>>, ApiError> {
    let user = current_user(&state, &session, &headers).await?;
    authorize(&user, Capability::IssueCertificates)?;

    let record = state
        .certificates()
        .issue_single(
            IssueRequest {
                event_name: payload.event_name,
                event_date: payload.event_date,
                student_name: payload.student_name,
                student_email: payload.student_email,
            },
            user.id,
        )
        .await?;

    Ok(Json(ApiResponse::success(CertificateDto::from_model(
        record,
    ))))
}

/// POST /events/{id}/certificates: event-wide batch issuance.
pub async fn issue_for_event(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Path(event_id): Path<i32>,
) -> Result<Json<ApiResponse<BulkIssueReport>>, ApiError> {
    let user = current_user(&state, &session, &headers).await?;
    authorize(&user, Capability::IssueCertificates)?;

    let report = state
        .certificates()
        .issue_for_event(event_id, user.id)
        .await?;

    Ok(Json(ApiResponse::success(report)))
}

/// GET /certificates/verify/{cert_id} (public)
pub async fn verify_certificate(
    State(state): State<Arc<AppState>>,
    Path(cert_id): Path<String>,
) -> Result<Json<ApiResponse<VerificationDto>>, ApiError> {
    let verified = state.certificates().verify(&cert_id).await?;
    Ok(Json(ApiResponse::success(VerificationDto::from(verified))))
}

/// POST /certificates/revoke
pub async fn revoke(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Json(payload): Json<RevokeRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let user = current_user(&state, &session, &headers).await?;
    authorize(&user, Capability::IssueCertificates)?;

    let tx_hash = state
        .certificates()
        .revoke(&payload.certificate_id)
        .await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "message": "Certificate successfully revoked on the ledger.",
        "transactionHash": tx_hash,
    }))))
}

/// GET /certificates/mine: the caller's own certificates.
pub async fn my_certificates(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<CertificateDto>>>, ApiError> {
    let user = current_user(&state, &session, &headers).await?;

    let records = state.certificates().list_for_student(&user.email).await?;

    Ok(Json(ApiResponse::success(
        records.into_iter().map(CertificateDto::from_model).collect(),
    )))
}

/// GET /certificates/{cert_id}/download (public): the rendered document.
pub async fn download_certificate(
    State(state): State<Arc<AppState>>,
    Path(cert_id): Path<String>,
) -> Result<Response, ApiError> {
    let record = state
        .store()
        .certificate_by_public_id(&cert_id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::NotFound("Certificate not found".to_string()))?;

    let style = state
        .store()
        .certificate_style_for_event(&record.event_name)
        .await
        .map_err(ApiError::from)?
        .unwrap_or_default();

    // The holder may have been deleted since issuance; the snapshot still
    // renders with placeholder academic details.
    let student = state
        .store()
        .user_by_email(&record.student_email)
        .await
        .map_err(ApiError::from)?;

    let public_base_url = {
        let config = state.config().read().await;
        config.server.public_base_url.trim_end_matches('/').to_string()
    };

    let document = CertificateDocument {
        verify_url: format!("{public_base_url}/verify/{}", record.certificate_id),
        certificate_id: record.certificate_id,
        student_name: record.student_name.clone(),
        student_department: student
            .as_ref()
            .and_then(|s| s.department.clone())
            .unwrap_or_else(|| "N/A".to_string()),
        student_semester: student
            .as_ref()
            .and_then(|s| s.semester.clone())
            .unwrap_or_else(|| "___".to_string()),
        event_name: record.event_name,
        event_date: record.event_date,
        style,
    };

    let bytes = render_certificate(&document)
        .map_err(|e| ApiError::internal(format!("PDF generation failed: {e}")))?;

    let filename = format!(
        "{}-Certificate.pdf",
        record.student_name.replace(|c: char| !c.is_alphanumeric(), "_")
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={filename}"),
            ),
        ],
        bytes,
    )
        .into_response())
}
