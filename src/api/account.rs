use axum::{
    Json,
    extract::State,
    http::HeaderMap,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::current_user;
use super::validation::{validate_email, validate_required};
use super::{ApiError, ApiResponse, AppState, MessageResponse, UserDto};

#[derive(Deserialize)]
pub struct ClaimInviteRequest {
    pub token: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RequestActivationRequest {
    pub email: String,
    pub usn: String,
}

#[derive(Deserialize)]
pub struct ActivateRequest {
    pub token: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct BindWalletRequest {
    pub wallet_address: String,
}

/// POST /account/claim-invite (public): faculty invite token + password.
pub async fn claim_invite(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ClaimInviteRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let token = validate_required(&payload.token, "token")?;

    let user = state
        .accounts()
        .claim_invite(token, &payload.password)
        .await?;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// POST /account/request-activation (public): mails the roster student an
/// activation link.
pub async fn request_activation(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RequestActivationRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let email = validate_email(&payload.email)?.to_lowercase();
    let usn = validate_required(&payload.usn, "usn")?.to_lowercase();

    state
        .accounts()
        .request_student_activation(&email, &usn)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: format!("Activation email sent to {email}."),
    })))
}

/// POST /account/activate (public): consumes the activation token.
pub async fn activate(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ActivateRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let token = validate_required(&payload.token, "token")?;

    let user = state
        .accounts()
        .activate_student(token, &payload.password)
        .await?;

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// PUT /account/wallet: binds the caller's wallet address. Required
/// before any certificate can be issued to them.
pub async fn bind_wallet(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Json(payload): Json<BindWalletRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let user = current_user(&state, &session, &headers).await?;

    state
        .accounts()
        .bind_wallet(user.id, payload.wallet_address.trim())
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Wallet connected".to_string(),
    })))
}
