use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use std::collections::HashMap;
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::{Capability, authorize, current_user};
use super::validation::{validate_email, validate_event_date, validate_required};
use super::{
    ApiError, ApiResponse, AppState, CreateEventRequest, EventDto, MessageResponse,
    ParticipantDto, RegisterRequest,
};
use crate::db::NewEvent;
use crate::entities::events;

/// Resolves creator display names for a batch of events in one pass.
async fn creator_names(
    state: &AppState,
    events: &[events::Model],
) -> Result<HashMap<i32, String>, ApiError> {
    let mut names = HashMap::new();

    for event in events {
        if names.contains_key(&event.created_by) {
            continue;
        }
        let name = state
            .store()
            .user_by_id(event.created_by)
            .await
            .map_err(ApiError::from)?
            .map_or_else(|| "Unknown".to_string(), |u| u.name);
        names.insert(event.created_by, name);
    }

    Ok(names)
}

async fn to_dto(
    state: &AppState,
    event: events::Model,
    creator: String,
) -> Result<EventDto, ApiError> {
    let participant_count = state
        .store()
        .event_participants(event.id)
        .await
        .map_err(ApiError::from)?
        .len();

    Ok(EventDto {
        id: event.id,
        name: event.name,
        date: event.date,
        description: event.description,
        created_by: creator,
        certificates_issued: event.certificates_issued,
        participant_count,
    })
}

/// POST /events
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Json(payload): Json<CreateEventRequest>,
) -> Result<Json<ApiResponse<EventDto>>, ApiError> {
    let user = current_user(&state, &session, &headers).await?;
    authorize(&user, Capability::ManageEvents)?;

    let name = validate_required(&payload.name, "name")?.to_string();
    let date = validate_event_date(&payload.date)?.to_string();

    let event = state
        .store()
        .create_event(NewEvent {
            name,
            date,
            description: payload.description,
            created_by: user.id,
            certificate_style: payload.certificate_style,
        })
        .await
        .map_err(ApiError::from)?;

    let dto = to_dto(&state, event, user.name).await?;
    Ok(Json(ApiResponse::success(dto)))
}

/// GET /events (faculty/admin panel listing)
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<EventDto>>>, ApiError> {
    let user = current_user(&state, &session, &headers).await?;
    authorize(&user, Capability::ManageEvents)?;

    let events = state.store().list_events().await.map_err(ApiError::from)?;
    let names = creator_names(&state, &events).await?;

    let mut dtos = Vec::with_capacity(events.len());
    for event in events {
        let creator = names.get(&event.created_by).cloned().unwrap_or_default();
        dtos.push(to_dto(&state, event, creator).await?);
    }

    Ok(Json(ApiResponse::success(dtos)))
}

/// GET /events/public
pub async fn list_public_events(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<EventDto>>>, ApiError> {
    let events = state
        .store()
        .list_public_events()
        .await
        .map_err(ApiError::from)?;
    let names = creator_names(&state, &events).await?;

    let mut dtos = Vec::with_capacity(events.len());
    for event in events {
        let creator = names.get(&event.created_by).cloned().unwrap_or_default();
        dtos.push(to_dto(&state, event, creator).await?);
    }

    Ok(Json(ApiResponse::success(dtos)))
}

/// GET /events/{id}
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<EventDto>>, ApiError> {
    let event = state
        .store()
        .get_event(id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::not_found("Event", id))?;

    let creator = state
        .store()
        .user_by_id(event.created_by)
        .await
        .map_err(ApiError::from)?
        .map_or_else(|| "Unknown".to_string(), |u| u.name);

    let dto = to_dto(&state, event, creator).await?;
    Ok(Json(ApiResponse::success(dto)))
}

/// GET /events/{id}/participants
pub async fn list_participants(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<ParticipantDto>>>, ApiError> {
    let user = current_user(&state, &session, &headers).await?;
    authorize(&user, Capability::ManageEvents)?;

    if state
        .store()
        .get_event(id)
        .await
        .map_err(ApiError::from)?
        .is_none()
    {
        return Err(ApiError::not_found("Event", id));
    }

    let participants = state
        .store()
        .event_participants(id)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(ApiResponse::success(
        participants.into_iter().map(ParticipantDto::from).collect(),
    )))
}

/// POST /events/{id}/register (public)
pub async fn register(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let name = validate_required(&payload.name, "name")?.to_string();
    let email = validate_email(&payload.email)?.to_lowercase();

    register_participant(&state, id, &name, &email).await
}

/// POST /events/{id}/register-me (logged-in student)
pub async fn register_me(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let user = current_user(&state, &session, &headers).await?;

    register_participant(&state, id, &user.name, &user.email).await
}

async fn register_participant(
    state: &AppState,
    event_id: i32,
    name: &str,
    email: &str,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    if state
        .store()
        .get_event(event_id)
        .await
        .map_err(ApiError::from)?
        .is_none()
    {
        return Err(ApiError::not_found("Event", event_id));
    }

    let added = state
        .store()
        .add_event_participant(event_id, name, email)
        .await
        .map_err(ApiError::from)?;

    if !added {
        return Err(ApiError::Conflict(
            "Email already registered for this event".to_string(),
        ));
    }

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Successfully registered for the event".to_string(),
    })))
}
