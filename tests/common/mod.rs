//! Shared test harness: an in-memory app with ledger and mailer doubles.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use http_body_util::BodyExt;
use tower::ServiceExt;

use credchain::api::AppState;
use credchain::clients::ledger::{LedgerClient, LedgerError, MintReceipt};
use credchain::clients::mailer::{MailError, Mailer};
use credchain::config::Config;
use credchain::db::NewUser;
use credchain::entities::users::Role;

/// Default API key seeded by the initial migration.
pub const DEFAULT_API_KEY: &str = "credchain_default_api_key_please_regenerate";

pub const DEFAULT_ADMIN_EMAIL: &str = "admin@credchain.local";

// ============================================================================
// Ledger double
// ============================================================================

/// How the mock answers `validity` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainBehavior {
    Valid,
    Revoked,
    Unreachable,
}

pub struct MockLedger {
    pub mint_calls: AtomicU32,
    pub revoke_calls: AtomicU32,
    pub fail_mint: AtomicBool,
    chain: std::sync::Mutex<ChainBehavior>,
    next_token: AtomicU32,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            mint_calls: AtomicU32::new(0),
            revoke_calls: AtomicU32::new(0),
            fail_mint: AtomicBool::new(false),
            chain: std::sync::Mutex::new(ChainBehavior::Valid),
            next_token: AtomicU32::new(1),
        }
    }

    pub fn set_chain(&self, behavior: ChainBehavior) {
        *self.chain.lock().unwrap() = behavior;
    }

    pub fn mints(&self) -> u32 {
        self.mint_calls.load(Ordering::SeqCst)
    }

    pub fn revokes(&self) -> u32 {
        self.revoke_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn mint(
        &self,
        _wallet: &str,
        certificate_hash: &str,
    ) -> Result<MintReceipt, LedgerError> {
        self.mint_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_mint.load(Ordering::SeqCst) {
            return Err(LedgerError::Rpc("out of gas".to_string()));
        }

        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        Ok(MintReceipt {
            transaction_hash: format!("0xtx{token}_{}", &certificate_hash[..8]),
            token_id: token.to_string(),
        })
    }

    async fn revoke_by_hash(&self, certificate_hash: &str) -> Result<String, LedgerError> {
        self.revoke_calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("0xrevoke_{}", &certificate_hash[..8]))
    }

    async fn validity(&self, _certificate_hash: &str) -> Result<bool, LedgerError> {
        match *self.chain.lock().unwrap() {
            ChainBehavior::Valid => Ok(true),
            ChainBehavior::Revoked => Ok(false),
            ChainBehavior::Unreachable => {
                Err(LedgerError::Transport("connection refused".to_string()))
            }
        }
    }
}

// ============================================================================
// Mailer double
// ============================================================================

pub struct MockMailer {
    pub certificate_mails: AtomicU32,
    pub invite_mails: AtomicU32,
    pub activation_mails: AtomicU32,
    pub fail_certificate_mail: AtomicBool,
    pub fail_all: AtomicBool,
    last_invite_token: std::sync::Mutex<Option<String>>,
    last_activation_token: std::sync::Mutex<Option<String>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self {
            certificate_mails: AtomicU32::new(0),
            invite_mails: AtomicU32::new(0),
            activation_mails: AtomicU32::new(0),
            fail_certificate_mail: AtomicBool::new(false),
            fail_all: AtomicBool::new(false),
            last_invite_token: std::sync::Mutex::new(None),
            last_activation_token: std::sync::Mutex::new(None),
        }
    }

    pub fn invite_token(&self) -> Option<String> {
        self.last_invite_token.lock().unwrap().clone()
    }

    pub fn activation_token(&self) -> Option<String> {
        self.last_activation_token.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send_certificate_issued(
        &self,
        _to: &str,
        _student_name: &str,
        _event_name: &str,
        _certificate_id: &str,
    ) -> Result<(), MailError> {
        if self.fail_all.load(Ordering::SeqCst) || self.fail_certificate_mail.load(Ordering::SeqCst)
        {
            return Err(MailError::Transport("relay down".to_string()));
        }
        self.certificate_mails.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send_faculty_invite(&self, _to: &str, token: &str) -> Result<(), MailError> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(MailError::Transport("relay down".to_string()));
        }
        self.invite_mails.fetch_add(1, Ordering::SeqCst);
        *self.last_invite_token.lock().unwrap() = Some(token.to_string());
        Ok(())
    }

    async fn send_student_activation(&self, _to: &str, token: &str) -> Result<(), MailError> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(MailError::Transport("relay down".to_string()));
        }
        self.activation_mails.fetch_add(1, Ordering::SeqCst);
        *self.last_activation_token.lock().unwrap() = Some(token.to_string());
        Ok(())
    }
}

// ============================================================================
// App bootstrap
// ============================================================================

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub ledger: Arc<MockLedger>,
    pub mailer: Arc<MockMailer>,
}

pub async fn spawn_app() -> TestApp {
    let mut config = Config::default();
    config.general.database_url = "sqlite::memory:".to_string();
    // A single pooled connection keeps every query on the same in-memory DB.
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;

    let ledger = Arc::new(MockLedger::new());
    let mailer = Arc::new(MockMailer::new());

    let state = credchain::api::create_app_state_with_clients(
        config,
        ledger.clone(),
        mailer.clone(),
        None,
    )
    .await
    .expect("Failed to create app state");

    let router = credchain::api::router(state.clone()).await;

    TestApp {
        router,
        state,
        ledger,
        mailer,
    }
}

impl TestApp {
    /// Seeds a Student account directly through the store, optionally with
    /// a bound wallet.
    pub async fn seed_student(&self, name: &str, email: &str, wallet: Option<&str>) -> i32 {
        let user = self
            .state
            .store()
            .create_user(
                NewUser {
                    name: name.to_string(),
                    email: email.to_string(),
                    usn: None,
                    password: "student-pass-123".to_string(),
                    role: Role::Student,
                    department: Some("MCA".to_string()),
                    year: Some(2024),
                    semester: Some("3rd".to_string()),
                },
                None,
            )
            .await
            .expect("Failed to seed student");

        if let Some(wallet) = wallet {
            self.state
                .store()
                .set_wallet_address(user.id, wallet)
                .await
                .expect("Failed to bind wallet");
        }

        user.id
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .header("X-Api-Key", DEFAULT_API_KEY)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    pub async fn get_public(&self, uri: &str) -> Response<Body> {
        self.router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> Response<Body> {
        self.send_json("POST", uri, body, Some(DEFAULT_API_KEY)).await
    }

    pub async fn post_json_public(&self, uri: &str, body: serde_json::Value) -> Response<Body> {
        self.send_json("POST", uri, body, None).await
    }

    pub async fn post_json_as(
        &self,
        uri: &str,
        body: serde_json::Value,
        api_key: &str,
    ) -> Response<Body> {
        self.send_json("POST", uri, body, Some(api_key)).await
    }

    pub async fn put_json(&self, uri: &str, body: serde_json::Value) -> Response<Body> {
        self.send_json("PUT", uri, body, Some(DEFAULT_API_KEY)).await
    }

    async fn send_json(
        &self,
        method: &str,
        uri: &str,
        body: serde_json::Value,
        api_key: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json");

        if let Some(key) = api_key {
            builder = builder.header("X-Api-Key", key);
        }

        self.router
            .clone()
            .oneshot(builder.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap()
    }

    /// Multipart roster upload with the given CSV content.
    pub async fn upload_roster(&self, csv: &str) -> Response<Body> {
        let boundary = "credchain-test-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"roster.csv\"\r\n\
             Content-Type: text/csv\r\n\r\n\
             {csv}\r\n\
             --{boundary}--\r\n"
        );

        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/admin/roster/import")
                    .header("X-Api-Key", DEFAULT_API_KEY)
                    .header(
                        "Content-Type",
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap()
    }
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

/// A plausible wallet address for seeded students.
pub fn wallet(n: u8) -> String {
    format!("0x{:040x}", u128::from(n) + 0xabcd)
}
