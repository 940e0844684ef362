use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

const CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub ledger: LedgerConfig,

    pub mail: MailConfig,

    #[serde(default)]
    pub security: SecurityConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_url: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:data/credchain.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Base URL of the public frontend, used for verification links in
    /// emails and on rendered certificates.
    pub public_base_url: String,

    /// Session inactivity expiry in minutes.
    pub session_minutes: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 5001,
            cors_allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
            public_base_url: "http://localhost:5173".to_string(),
            session_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint of the node hosting the credential contract.
    pub rpc_url: String,

    /// Address of the pre-deployed credential contract.
    pub contract_address: String,

    /// Account the node signs transactions with. Empty means "use the
    /// node's first unlocked account" (dev-node setups).
    pub sender_address: String,

    pub request_timeout_seconds: u64,

    /// How many times to poll for a transaction receipt before giving up.
    pub receipt_poll_attempts: u32,

    pub receipt_poll_interval_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: String::new(),
            contract_address: String::new(),
            sender_address: String::new(),
            request_timeout_seconds: 30,
            receipt_poll_attempts: 30,
            receipt_poll_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub smtp_host: String,

    pub smtp_port: u16,

    pub username: String,

    pub password: String,

    pub from_name: String,

    pub from_address: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: String::new(),
            smtp_port: 587,
            username: String::new(),
            password: String::new(),
            from_name: "CredChain".to_string(),
            from_address: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            ledger: LedgerConfig::default(),
            mail: MailConfig::default(),
            security: SecurityConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Config {
    /// Loads `config.toml` when present, then applies environment overrides
    /// (a `.env` file is honored via dotenvy). Secrets are expected to come
    /// from the environment in deployments.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = if Path::new(CONFIG_PATH).exists() {
            let raw = std::fs::read_to_string(CONFIG_PATH)
                .with_context(|| format!("Failed to read {CONFIG_PATH}"))?;
            toml::from_str(&raw).with_context(|| format!("Failed to parse {CONFIG_PATH}"))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        let overrides: [(&str, &mut String); 8] = [
            ("CREDCHAIN_DATABASE_URL", &mut self.general.database_url),
            ("LEDGER_RPC_URL", &mut self.ledger.rpc_url),
            ("LEDGER_CONTRACT_ADDRESS", &mut self.ledger.contract_address),
            ("LEDGER_SENDER_ADDRESS", &mut self.ledger.sender_address),
            ("SMTP_HOST", &mut self.mail.smtp_host),
            ("SMTP_USERNAME", &mut self.mail.username),
            ("SMTP_PASSWORD", &mut self.mail.password),
            ("PUBLIC_BASE_URL", &mut self.server.public_base_url),
        ];

        for (key, slot) in overrides {
            if let Ok(value) = std::env::var(key)
                && !value.is_empty()
            {
                *slot = value;
            }
        }

        if let Ok(port) = std::env::var("CREDCHAIN_PORT")
            && let Ok(port) = port.parse()
        {
            self.server.port = port;
        }

        if let Ok(port) = std::env::var("SMTP_PORT")
            && let Ok(port) = port.parse()
        {
            self.mail.smtp_port = port;
        }
    }

    /// Startup gate: the service refuses to run without its external
    /// collaborators configured. Every missing key is reported at once.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();

        if self.ledger.rpc_url.is_empty() {
            missing.push("ledger.rpc_url (LEDGER_RPC_URL)");
        }
        if self.ledger.contract_address.is_empty() {
            missing.push("ledger.contract_address (LEDGER_CONTRACT_ADDRESS)");
        }
        if self.mail.smtp_host.is_empty() {
            missing.push("mail.smtp_host (SMTP_HOST)");
        }
        if self.mail.username.is_empty() {
            missing.push("mail.username (SMTP_USERNAME)");
        }
        if self.mail.password.is_empty() {
            missing.push("mail.password (SMTP_PASSWORD)");
        }
        if self.mail.from_address.is_empty() {
            missing.push("mail.from_address");
        }

        if !missing.is_empty() {
            bail!(
                "Missing required configuration: {}. Set the values in {CONFIG_PATH} or the environment.",
                missing.join(", ")
            );
        }

        if !self.ledger.contract_address.starts_with("0x")
            || self.ledger.contract_address.len() != 42
        {
            bail!(
                "ledger.contract_address must be a 0x-prefixed 20-byte address, got '{}'",
                self.ledger.contract_address
            );
        }

        Ok(())
    }

    pub fn create_default_if_missing() -> Result<()> {
        if Path::new(CONFIG_PATH).exists() {
            info!("{CONFIG_PATH} already exists, leaving it untouched");
            return Ok(());
        }

        let rendered = toml::to_string_pretty(&Self::default())
            .context("Failed to serialize default config")?;
        std::fs::write(CONFIG_PATH, rendered)
            .with_context(|| format!("Failed to write {CONFIG_PATH}"))?;

        Ok(())
    }
}
