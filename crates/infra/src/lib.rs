mod config;
mod geo;
mod queue;
mod repos;
mod services;
mod system;

pub use config::Config;
pub use geo::{IGeoIndex, InMemoryGeoIndex, PostgresGeoIndex};
pub use queue::{
    DeliveryLease, IDeliveryQueue, InMemoryDeliveryQueue, NackOutcome, PostgresDeliveryQueue,
    QueueSettings,
};
use repos::Repos;
pub use repos::{DeleteResult, EventSearchQuery, NearFilter};
pub use services::*;
use sqlx::migrate::MigrateError;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
pub use system::ISys;
use system::RealSys;
use tracing::info;

#[derive(Clone)]
pub struct VicinityContext {
    pub repos: Repos,
    pub config: Config,
    pub sys: Arc<dyn ISys>,
    pub geo_index: Arc<dyn IGeoIndex>,
    pub queue: Arc<dyn IDeliveryQueue>,
    pub geocoder: Arc<dyn IGeocoder>,
    pub notifier: Arc<dyn INotifier>,
}

struct ContextParams {
    pub postgres_connection_string: String,
}

impl VicinityContext {
    async fn create(params: ContextParams) -> Self {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&params.postgres_connection_string)
            .await
            .expect("Postgres credentials must be set and valid");
        sqlx::migrate!()
            .run(&pool)
            .await
            .expect("Database migrations to succeed");

        let config = Config::new();
        let sys: Arc<dyn ISys> = Arc::new(RealSys {});
        let queue_settings = QueueSettings::from_config(&config);

        Self {
            repos: Repos::create_postgres(pool.clone()),
            geo_index: Arc::new(PostgresGeoIndex::new(pool.clone())),
            queue: Arc::new(PostgresDeliveryQueue::new(
                pool,
                sys.clone(),
                queue_settings,
            )),
            geocoder: create_geocoder(&config),
            notifier: create_notifier(&config),
            config,
            sys,
        }
    }

    pub fn create_inmemory() -> Self {
        let config = Config::new();
        let sys: Arc<dyn ISys> = Arc::new(RealSys {});
        let queue_settings = QueueSettings::from_config(&config);

        Self {
            repos: Repos::create_inmemory(),
            geo_index: Arc::new(InMemoryGeoIndex::new()),
            queue: Arc::new(InMemoryDeliveryQueue::new(sys.clone(), queue_settings)),
            geocoder: Arc::new(InMemoryGeocoder::new()),
            notifier: Arc::new(LogNotifier::new()),
            config,
            sys,
        }
    }
}

fn create_geocoder(config: &Config) -> Arc<dyn IGeocoder> {
    match std::env::var("GOOGLE_MAPS_API_KEY") {
        Ok(api_key) => Arc::new(GoogleMapsGeocoder::new(
            api_key,
            Duration::from_millis(config.geocoder_timeout_millis as u64),
        )),
        Err(_) => {
            info!("Did not find GOOGLE_MAPS_API_KEY environment variable. Address lookups will only resolve locally registered addresses.");
            Arc::new(InMemoryGeocoder::new())
        }
    }
}

fn create_notifier(config: &Config) -> Arc<dyn INotifier> {
    match std::env::var("NOTIFIER_URL") {
        Ok(url) => {
            let key = std::env::var("NOTIFIER_KEY").ok();
            Arc::new(HttpRelayNotifier::new(
                url,
                key,
                Duration::from_millis(config.notifier_timeout_millis as u64),
            ))
        }
        Err(_) => {
            info!("Did not find NOTIFIER_URL environment variable. Notifications will be written to the log.");
            Arc::new(LogNotifier::new())
        }
    }
}

/// Will setup the infrastructure context given the environment
pub async fn setup_context() -> VicinityContext {
    VicinityContext::create(ContextParams {
        postgres_connection_string: get_psql_connection_string(),
    })
    .await
}

fn get_psql_connection_string() -> String {
    const PSQL_CONNECTION_STRING: &str = "DATABASE_URL";

    std::env::var(PSQL_CONNECTION_STRING)
        .unwrap_or_else(|_| panic!("{} env var to be present.", PSQL_CONNECTION_STRING))
}

pub async fn run_migration() -> Result<(), MigrateError> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&get_psql_connection_string())
        .await
        .expect("TO CONNECT TO POSTGRES");

    sqlx::migrate!().run(&pool).await
}
