use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::clients::ledger::LedgerClient;
use crate::clients::mailer::Mailer;
use crate::config::Config;
use crate::state::SharedState;

mod account;
mod admin;
pub mod auth;
mod certificates;
mod error;
mod events;
mod observability;
mod types;
mod validation;

pub use error::ApiError;
pub use types::*;

use metrics_exporter_prometheus::PrometheusHandle;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn certificates(&self) -> &Arc<dyn crate::services::CertificateService> {
        &self.shared.certificate_service
    }

    #[must_use]
    pub fn accounts(&self) -> &Arc<dyn crate::services::AccountService> {
        &self.shared.account_service
    }

    #[must_use]
    pub fn roster(&self) -> &Arc<dyn crate::services::RosterService> {
        &self.shared.roster_service
    }
}

pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

/// Test-double entry point: identical wiring, caller-provided clients.
pub async fn create_app_state_with_clients(
    config: Config,
    ledger: Arc<dyn LedgerClient>,
    mailer: Arc<dyn Mailer>,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::with_clients(config, ledger, mailer).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub async fn router(state: Arc<AppState>) -> Router {
    let (cors_origins, session_minutes) = {
        let config = state.config().read().await;
        (
            config.server.cors_allowed_origins.clone(),
            config.server.session_minutes,
        )
    };

    let protected_routes = create_protected_router(state.clone());

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            session_minutes,
        )));

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/health/live", get(observability::health_live))
        .route("/health/ready", get(observability::health_ready))
        .route("/events/public", get(events::list_public_events))
        .route("/events/{id}", get(events::get_event))
        .route("/events/{id}/register", post(events::register))
        .route(
            "/certificates/verify/{cert_id}",
            get(certificates::verify_certificate),
        )
        .route(
            "/certificates/{cert_id}/download",
            get(certificates::download_certificate),
        )
        .route("/account/claim-invite", post(account::claim_invite))
        .route(
            "/account/request-activation",
            post(account::request_activation),
        )
        .route("/account/activate", post(account::activate))
        .layer(session_layer)
        .with_state(state.clone());

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/me", get(auth::get_current_user))
        .route("/auth/password", put(auth::change_password))
        .route("/account/wallet", put(account::bind_wallet))
        .route("/events", post(events::create_event))
        .route("/events", get(events::list_events))
        .route("/events/{id}/participants", get(events::list_participants))
        .route("/events/{id}/register-me", post(events::register_me))
        .route(
            "/events/{id}/certificates",
            post(certificates::issue_for_event),
        )
        .route("/certificates/issue", post(certificates::issue_single))
        .route("/certificates/revoke", post(certificates::revoke))
        .route("/certificates/mine", get(certificates::my_certificates))
        .route("/admin/invites", post(admin::invite_faculty))
        .route("/admin/roster/import", post(admin::import_roster))
        .route("/admin/students", get(admin::list_students))
        .route("/admin/students/{id}", delete(admin::delete_student))
        .route("/admin/analytics", get(admin::get_analytics))
        .route("/metrics", get(observability::get_metrics))
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
