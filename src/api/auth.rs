use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, ApiResponse, LoginResponse, MessageResponse, UserDto};
use crate::db::UserRecord;
use crate::entities::users::Role;

const SESSION_USER_KEY: &str = "user_id";

// ============================================================================
// Capabilities
// ============================================================================

/// The closed set of privileged operations. Every protected route asks
/// this one question instead of matching on role strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Create events and inspect their registration lists.
    ManageEvents,

    /// Issue and revoke certificates.
    IssueCertificates,

    /// Invites, roster imports, student management, analytics.
    AdministerUsers,
}

impl Capability {
    #[must_use]
    pub const fn allowed_for(self, role: Role) -> bool {
        match self {
            Self::ManageEvents | Self::IssueCertificates => {
                matches!(role, Role::Faculty | Role::SuperAdmin)
            }
            Self::AdministerUsers => matches!(role, Role::SuperAdmin),
        }
    }
}

/// Single capability check used by every protected handler.
pub fn authorize(user: &UserRecord, capability: Capability) -> Result<(), ApiError> {
    if capability.allowed_for(user.role) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "Your role does not permit this operation".to_string(),
        ))
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

// ============================================================================
// Middleware
// ============================================================================

/// Authentication middleware that checks:
/// 1. Session cookie (from login)
/// 2. `X-Api-Key` header
/// 3. `Authorization: Bearer <api_key>` header
pub async fn auth_middleware(
    State(state): State<Arc<super::AppState>>,
    headers: HeaderMap,
    session: Session,
    request: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    if let Ok(Some(user_id)) = session.get::<i32>(SESSION_USER_KEY).await {
        tracing::Span::current().record("user_id", user_id);
        return Ok(next.run(request).await);
    }

    if let Some(key) = extract_api_key(&headers)
        && let Ok(Some(user)) = state.store().user_by_api_key(&key).await
    {
        tracing::Span::current().record("user_id", user.id);
        return Ok(next.run(request).await);
    }

    let response = (StatusCode::UNAUTHORIZED, "Unauthorized");
    Ok(response.into_response())
}

fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    if let Some(api_key) = headers.get("X-Api-Key")
        && let Ok(key_str) = api_key.to_str()
    {
        return Some(key_str.to_string());
    }

    if let Some(auth_header) = headers.get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    None
}

/// Resolves the caller's account from the session or an API key. Handlers
/// needing identity (issuer id, role, email) go through this.
pub async fn current_user(
    state: &super::AppState,
    session: &Session,
    headers: &HeaderMap,
) -> Result<UserRecord, ApiError> {
    if let Ok(Some(user_id)) = session.get::<i32>(SESSION_USER_KEY).await {
        return state
            .store()
            .user_by_id(user_id)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to load user: {e}")))?
            .ok_or_else(|| ApiError::Unauthorized("Session user no longer exists".to_string()));
    }

    if let Some(key) = extract_api_key(headers) {
        if let Some(user) = state
            .store()
            .user_by_api_key(&key)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to load user: {e}")))?
        {
            return Ok(user);
        }
    }

    Err(ApiError::Unauthorized("Unauthorized".to_string()))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<super::AppState>>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    if payload.email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let user = state
        .accounts()
        .login(&payload.email, &payload.password)
        .await?;

    if let Err(e) = session.insert(SESSION_USER_KEY, user.id).await {
        return Err(ApiError::internal(format!("Failed to create session: {e}")));
    }

    let api_key = user.api_key.clone();

    Ok(Json(ApiResponse::success(LoginResponse {
        user: UserDto::from(user),
        api_key,
    })))
}

/// POST /auth/logout
pub async fn logout(session: Session) -> impl IntoResponse {
    let _ = session.flush().await;
    (StatusCode::OK, "Logged out")
}

/// GET /auth/me
pub async fn get_current_user(
    State(state): State<Arc<super::AppState>>,
    session: Session,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = current_user(&state, &session, &headers).await?;
    Ok(Json(ApiResponse::success(UserDto::from(user))))
}

/// PUT /auth/password
pub async fn change_password(
    State(state): State<Arc<super::AppState>>,
    session: Session,
    headers: HeaderMap,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let user = current_user(&state, &session, &headers).await?;

    state
        .accounts()
        .change_password(
            user.id,
            &user.email,
            &payload.current_password,
            &payload.new_password,
        )
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Password updated".to_string(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_matrix() {
        assert!(Capability::ManageEvents.allowed_for(Role::Faculty));
        assert!(Capability::ManageEvents.allowed_for(Role::SuperAdmin));
        assert!(!Capability::ManageEvents.allowed_for(Role::Student));

        assert!(Capability::IssueCertificates.allowed_for(Role::Faculty));
        assert!(!Capability::IssueCertificates.allowed_for(Role::Student));

        assert!(Capability::AdministerUsers.allowed_for(Role::SuperAdmin));
        assert!(!Capability::AdministerUsers.allowed_for(Role::Faculty));
        assert!(!Capability::AdministerUsers.allowed_for(Role::Student));
    }
}
