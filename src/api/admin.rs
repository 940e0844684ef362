use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::HeaderMap,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::{Capability, authorize, current_user};
use super::validation::{validate_email, validate_required};
use super::{
    AnalyticsDto, ApiError, ApiResponse, AppState, DepartmentCountDto, MessageResponse, UserDto,
};
use crate::constants::MAX_ROSTER_UPLOAD_BYTES;
use crate::entities::users::Role;
use crate::services::ImportReport;

#[derive(Deserialize)]
pub struct InviteFacultyRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub department: Option<String>,
}

/// POST /admin/invites
pub async fn invite_faculty(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Json(payload): Json<InviteFacultyRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let user = current_user(&state, &session, &headers).await?;
    authorize(&user, Capability::AdministerUsers)?;

    let name = validate_required(&payload.name, "name")?.to_string();
    let email = validate_email(&payload.email)?.to_lowercase();

    state
        .accounts()
        .invite_faculty(&name, &email, payload.department.as_deref())
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: format!("Invite sent successfully to {email}."),
    })))
}

/// POST /admin/roster/import: multipart CSV upload.
pub async fn import_roster(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<ImportReport>>, ApiError> {
    let user = current_user(&state, &session, &headers).await?;
    authorize(&user, Capability::AdministerUsers)?;

    let mut file_bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Malformed upload: {e}")))?
    {
        if field.name() == Some("file") || file_bytes.is_none() {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::validation(format!("Failed to read upload: {e}")))?;
            file_bytes = Some(bytes.to_vec());
        }
    }

    let bytes = file_bytes.ok_or_else(|| ApiError::validation("No file uploaded."))?;

    if bytes.len() > MAX_ROSTER_UPLOAD_BYTES {
        return Err(ApiError::validation(format!(
            "Upload exceeds the {MAX_ROSTER_UPLOAD_BYTES} byte limit"
        )));
    }

    let report = state.roster().import(&bytes).await?;

    Ok(Json(ApiResponse::success(report)))
}

/// GET /admin/students
pub async fn list_students(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<UserDto>>>, ApiError> {
    let user = current_user(&state, &session, &headers).await?;
    authorize(&user, Capability::AdministerUsers)?;

    let students = state.store().list_students().await.map_err(ApiError::from)?;

    Ok(Json(ApiResponse::success(
        students.into_iter().map(UserDto::from).collect(),
    )))
}

/// DELETE /admin/students/{id}
pub async fn delete_student(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let user = current_user(&state, &session, &headers).await?;
    authorize(&user, Capability::AdministerUsers)?;

    let deleted = state
        .store()
        .delete_student(id)
        .await
        .map_err(ApiError::from)?;

    if !deleted {
        return Err(ApiError::not_found("Student", id));
    }

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Student removed".to_string(),
    })))
}

/// GET /admin/analytics: aggregate counts and department groupings.
pub async fn get_analytics(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<AnalyticsDto>>, ApiError> {
    let user = current_user(&state, &session, &headers).await?;
    authorize(&user, Capability::AdministerUsers)?;

    let store = state.store();

    let total_students = store
        .count_users_with_role(Role::Student)
        .await
        .map_err(ApiError::from)?;
    let total_events = store.count_events().await.map_err(ApiError::from)?;
    let total_certificates = store.count_certificates().await.map_err(ApiError::from)?;

    let certificates_by_department = store
        .certificates_by_department()
        .await
        .map_err(ApiError::from)?
        .into_iter()
        .map(|row| DepartmentCountDto {
            name: row.name.unwrap_or_else(|| "Unassigned".to_string()),
            count: row.count,
        })
        .collect();

    let students_by_department = store
        .students_by_department()
        .await
        .map_err(ApiError::from)?
        .into_iter()
        .map(|row| DepartmentCountDto {
            name: row.name.unwrap_or_else(|| "Unassigned".to_string()),
            count: row.count,
        })
        .collect();

    Ok(Json(ApiResponse::success(AnalyticsDto {
        total_students,
        total_events,
        total_certificates,
        certificates_by_department,
        students_by_department,
    })))
}
