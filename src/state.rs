use std::sync::Arc;

use tokio::sync::RwLock;

use crate::clients::ledger::{EvmLedger, LedgerClient};
use crate::clients::mailer::{Mailer, SmtpMailer};
use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AccountService, CertificateService, RosterService, SeaOrmAccountService,
    SeaOrmCertificateService, SeaOrmRosterService,
};

/// Long-lived handles shared by every request: the database pool, the
/// ledger and mail clients, and the domain services built on top of them.
///
/// Clients are constructed here, once, and injected into the services;
/// tests swap in doubles via [`SharedState::with_clients`].
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub ledger: Arc<dyn LedgerClient>,

    pub mailer: Arc<dyn Mailer>,

    pub certificate_service: Arc<dyn CertificateService>,

    pub account_service: Arc<dyn AccountService>,

    pub roster_service: Arc<dyn RosterService>,
}

impl SharedState {
    /// Production wiring: JSON-RPC ledger client and SMTP mailer from
    /// config.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let ledger: Arc<dyn LedgerClient> = Arc::new(EvmLedger::new(&config.ledger)?);
        let mailer: Arc<dyn Mailer> = Arc::new(SmtpMailer::new(&config.mail, &config.server)?);

        Self::with_clients(config, ledger, mailer).await
    }

    /// Wiring with caller-provided clients (test doubles, alternate
    /// transports).
    pub async fn with_clients(
        config: Config,
        ledger: Arc<dyn LedgerClient>,
        mailer: Arc<dyn Mailer>,
    ) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_url,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let certificate_service = Arc::new(SeaOrmCertificateService::new(
            store.clone(),
            ledger.clone(),
            mailer.clone(),
        )) as Arc<dyn CertificateService>;

        let account_service = Arc::new(SeaOrmAccountService::new(
            store.clone(),
            mailer.clone(),
            config.security.clone(),
        )) as Arc<dyn AccountService>;

        let roster_service =
            Arc::new(SeaOrmRosterService::new(store.clone())) as Arc<dyn RosterService>;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            ledger,
            mailer,
            certificate_service,
            account_service,
            roster_service,
        })
    }
}
