pub mod modules;
mod schema;
pub mod shared;

use std::sync::Arc;

use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use modules::api::ApiState;
use modules::archival::{ArchivalRepository, ArchivalWorker, HttpStorageTarget, StorageTarget};
use modules::discovery::{DiscoveryConfig, DiscoveryService};
use modules::mal::MalClient;
use modules::mapping::MappingRepository;
use modules::proxy::ProxyState;
use modules::streaming::StreamingService;
use shared::config::AppConfig;
use shared::database::Database;
use shared::errors::AppError;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Everything a binary needs to stand up its own slice of the system.
/// Each of the three processes (`api`, `worker`, `proxy`) calls
/// [`Services::bootstrap`] once and then asks for the state it cares about;
/// pieces it doesn't touch (e.g. the proxy never needs `MalClient`) are
/// simply left unused rather than split across three separate constructors.
pub struct Services {
    pub config: AppConfig,
    pub database: Arc<Database>,
    pub mapping_repo: Arc<MappingRepository>,
    pub mal: Arc<MalClient>,
    pub discovery: Arc<DiscoveryService>,
    pub archival_repo: Arc<ArchivalRepository>,
    pub streaming: Arc<StreamingService>,
    pub storage_targets: Vec<Arc<dyn StorageTarget>>,
}

impl Services {
    /// Loads `.env`, initialises structured logging, reads `AppConfig`,
    /// opens the database pool and wires every long-lived service. Exits
    /// the process on any failure here, mirroring the teacher's own
    /// fail-fast startup in `Database::new`.
    pub fn bootstrap() -> Self {
        dotenvy::dotenv().ok();
        shared::utils::logger::init_logger();

        let config = AppConfig::from_env().unwrap_or_else(|e| {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        });

        let database = Database::new().unwrap_or_else(|e| {
            eprintln!("Failed to initialize database connection: {}", e);
            eprintln!("Please check your DATABASE_URL environment variable and database connection.");
            std::process::exit(1);
        });
        let database = Arc::new(database);

        let mapping_repo = Arc::new(MappingRepository::new(Arc::clone(&database)));
        let mal = Arc::new(MalClient::new(config.mal_throttle));
        let discovery = Arc::new(DiscoveryService::new(
            Arc::clone(&mapping_repo),
            Arc::clone(&mal),
            DiscoveryConfig {
                phash_threshold: config.phash_threshold,
                title_similarity_threshold: config.title_similarity_threshold,
                episode_tolerance: config.episode_tolerance,
            },
        ));

        let archival_repo = Arc::new(ArchivalRepository::new(Arc::clone(&database)));
        let streaming = Arc::new(StreamingService::new(
            config.scrape_cache_ttl,
            Arc::clone(&archival_repo),
            config.worker_base_url.clone(),
            config.proxy_base_url.clone(),
            config.archival_salt.clone(),
        ));

        let storage_targets: Vec<Arc<dyn StorageTarget>> = config
            .storage_targets
            .iter()
            .enumerate()
            .map(|(i, base_url)| {
                Arc::new(HttpStorageTarget::new(format!("store-{}", i), base_url.clone()))
                    as Arc<dyn StorageTarget>
            })
            .collect();

        Self {
            config,
            database,
            mapping_repo,
            mal,
            discovery,
            archival_repo,
            streaming,
            storage_targets,
        }
    }

    /// Run once, from the API binary only — the worker and proxy processes
    /// assume the schema is already current.
    pub fn run_migrations(&self) -> Result<(), AppError> {
        let mut conn = self.database.get_connection()?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| AppError::DatabaseError(format!("failed to run migrations: {}", e)))?;
        Ok(())
    }

    pub fn api_state(&self) -> Arc<ApiState> {
        Arc::new(ApiState {
            mapping_repo: Arc::clone(&self.mapping_repo),
            mal: Arc::clone(&self.mal),
            discovery: Arc::clone(&self.discovery),
            streaming: Arc::clone(&self.streaming),
            archival_salt: self.config.archival_salt.clone(),
        })
    }

    pub fn proxy_state(&self) -> Arc<ProxyState> {
        Arc::new(ProxyState::new(
            self.config.proxy_base_url.clone(),
            &self.config.storage_targets,
        ))
    }

    pub fn archival_worker(&self) -> Arc<ArchivalWorker> {
        Arc::new(ArchivalWorker::new(
            Arc::clone(&self.archival_repo),
            self.storage_targets.clone(),
            self.config.archival_salt.clone(),
            self.config.api_base_url.clone(),
            self.config.proxy_base_url.clone(),
        ))
    }
}
