//! # Infrastructure Layer
//!
//! Concrete implementations of the storage traits defined in `sso_core`,
//! plus the process-level plumbing the token services need at startup.
//!
//! ## Architecture
//!
//! - **Database**: PostgreSQL connection pool, migrations and the token,
//!   client and user stores, all on SQLx
//! - **Telemetry**: global `tracing` subscriber set up from [`LoggingConfig`]
//! - **Key tooling**: the `pem_keys` binary that writes a fresh RSA key pair

use std::sync::Arc;

use sso_core::errors::CryptoError;
use sso_core::repositories::{SecurityEventSink, TracingSecurityEventSink};
use sso_core::services::token::{CryptoCodec, RsaKeyPair, TokenServiceConfig};
use sso_core::services::AuthService;
use sso_shared::config::{AppConfig, LoggingConfig};

/// Database module - PostgreSQL implementations using SQLx
pub mod database;

/// Key pair files
pub mod keys;

/// Tracing subscriber setup
pub mod telemetry;

pub use database::{DatabasePool, PgClientResolver, PgTokenStore, PgUserStore};
pub use keys::KeyFiles;
pub use telemetry::init_tracing;

/// Auth service wired to the PostgreSQL stores
pub type PgAuthService = AuthService<PgTokenStore, PgClientResolver, PgUserStore>;

/// Infrastructure service container
#[derive(Clone)]
pub struct InfrastructureServices {
    pub pool: DatabasePool,
    pub tokens: Arc<PgTokenStore>,
    pub clients: Arc<PgClientResolver>,
    pub users: Arc<PgUserStore>,
    pub codec: Arc<CryptoCodec>,
    /// Where replay and concurrent-rotation incidents are reported
    pub events: Arc<dyn SecurityEventSink>,
    pub config: AppConfig,
}

impl InfrastructureServices {
    /// Auth service over this container's stores and key pair
    pub fn auth_service(&self) -> PgAuthService {
        AuthService::new(
            self.tokens.clone(),
            self.clients.clone(),
            self.users.clone(),
            self.codec.clone(),
            TokenServiceConfig::from(&self.config.token),
        )
        .with_event_sink(self.events.clone())
    }
}

/// Sink used by [`initialize`]: incidents go to the `security` tracing target
pub fn security_event_sink() -> Arc<dyn SecurityEventSink> {
    Arc::new(TracingSecurityEventSink::new())
}

/// Initialize infrastructure services from the environment
///
/// This function sets up:
/// - the tracing subscriber
/// - the database connection pool, running migrations when enabled
/// - the RSA key pair used for refresh tokens
pub async fn initialize() -> Result<InfrastructureServices, InfrastructureError> {
    let config = load_config()?;
    init_logging_once(&config.logging);
    initialize_with(config).await
}

/// Initialize infrastructure services from an already loaded configuration
pub async fn initialize_with(config: AppConfig) -> Result<InfrastructureServices, InfrastructureError> {
    tracing::info!(environment = %config.environment, "Initializing infrastructure services");

    let keys = RsaKeyPair::from_config(&config.token).map_err(InfrastructureError::Crypto)?;
    tracing::info!(
        bits = keys.bits(),
        public_key = %keys.public_key_path().display(),
        "Loaded refresh token key pair"
    );

    let pool = DatabasePool::new(config.database.clone()).await?;
    if config.database.run_migrations {
        pool.run_migrations().await?;
    }

    let tables = &config.database.tables;
    let services = InfrastructureServices {
        tokens: Arc::new(PgTokenStore::new(pool.get_pool().clone(), tables)),
        clients: Arc::new(PgClientResolver::new(pool.get_pool().clone(), tables)),
        users: Arc::new(PgUserStore::new(pool.get_pool().clone(), tables)),
        codec: Arc::new(CryptoCodec::new(Arc::new(keys))),
        events: security_event_sink(),
        pool,
        config,
    };

    tracing::info!("Infrastructure services initialized successfully");
    Ok(services)
}

/// Load and validate configuration from the environment
fn load_config() -> Result<AppConfig, InfrastructureError> {
    let config = AppConfig::from_env().map_err(InfrastructureError::Config)?;
    config.validate().map_err(InfrastructureError::Config)?;
    Ok(config)
}

/// Install the global subscriber for `logging`, ignoring an existing one
pub fn init_logging_once(logging: &LoggingConfig) {
    if let Err(e) = init_tracing(logging) {
        tracing::debug!(error = %e, "tracing subscriber already installed");
    }
}

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Database connection error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Key file read or write error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Key loading or encoding error
    #[error("Crypto error: {0}")]
    Crypto(CryptoError),
}
