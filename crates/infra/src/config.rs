use tracing::{info, log::warn};
use vicinity_utils::create_random_secret;

#[derive(Debug, Clone)]
pub struct Config {
    /// Secret code used to create new `Account`s
    pub create_account_secret_code: String,
    /// Port for the application to run on
    pub port: usize,
    /// How far away from an event a user can be, in meters, and still get
    /// notified about it
    pub notify_radius_meters: f64,
    /// Default radius in meters for event search queries that give a
    /// position but no radius
    pub search_radius_meters: f64,
    /// Two events with identical title, start time and category count as
    /// the same event when their locations are within this many meters
    pub duplicate_distance_meters: f64,
    /// Maximum number of notifications a single user can be scheduled for
    /// within the trailing rate limit window
    pub rate_limit_max_notifications: i64,
    /// Length of the trailing rate limit window in millis
    pub rate_limit_window_millis: i64,
    /// How long after planning a notification becomes deliverable, in
    /// millis. Zero means deliver as soon as a worker picks it up.
    pub delivery_delay_millis: i64,
    /// Number of delivery workers consuming the queue
    pub delivery_workers: usize,
    /// How many times a queue entry may be redelivered before it is moved
    /// to the dead letter store
    pub max_redeliveries: i64,
    /// How long a dequeued entry stays invisible to other consumers before
    /// it becomes claimable again, in millis
    pub visibility_timeout_millis: i64,
    /// Base delay before a nacked entry becomes visible again, in millis.
    /// Doubles per redelivery.
    pub delivery_retry_backoff_millis: i64,
    /// Upper bound for the delivery retry backoff, in millis
    pub delivery_retry_backoff_max_millis: i64,
    /// How often the postgres queue polls for claimable entries, in millis
    pub queue_poll_interval_millis: i64,
    /// Timeout for a single notifier send, in millis
    pub notifier_timeout_millis: i64,
    /// Timeout for a single geocoding lookup, in millis
    pub geocoder_timeout_millis: i64,
    /// How many times planning is retried when the geo index is unavailable
    pub plan_retry_attempts: u32,
    /// Base delay between planning retries, in millis. Doubles per attempt.
    pub plan_retry_backoff_millis: i64,
    /// How often unreported dead letters are collected and pushed to
    /// account webhooks, in millis
    pub dead_letter_report_interval_millis: i64,
    /// Inclusive rating scale bounds
    pub rating_scale_min: i64,
    pub rating_scale_max: i64,
}

impl Config {
    pub fn new() -> Self {
        let create_account_secret_code = match std::env::var("CREATE_ACCOUNT_SECRET_CODE") {
            Ok(code) => code,
            Err(_) => {
                info!("Did not find CREATE_ACCOUNT_SECRET_CODE environment variable. Going to create one.");
                let code = create_random_secret(16);
                info!(
                    "Secret code for creating accounts was generated and set to: {}",
                    code
                );
                code
            }
        };
        let default_port = "5000";
        let port = std::env::var("PORT").unwrap_or(default_port.into());
        let port = match port.parse::<usize>() {
            Ok(port) => port,
            Err(_) => {
                warn!(
                    "The given PORT: {} is not valid, falling back to the default port: {}.",
                    port, default_port
                );
                default_port.parse::<usize>().unwrap()
            }
        };
        Self {
            create_account_secret_code,
            port,
            notify_radius_meters: env_number("NOTIFY_RADIUS_METERS", 50_000) as f64,
            search_radius_meters: env_number("SEARCH_RADIUS_METERS", 5_000) as f64,
            duplicate_distance_meters: env_number("DUPLICATE_DISTANCE_METERS", 50) as f64,
            rate_limit_max_notifications: env_number("RATE_LIMIT_MAX_NOTIFICATIONS", 5),
            rate_limit_window_millis: env_number("RATE_LIMIT_WINDOW_MILLIS", 1000 * 60 * 60),
            delivery_delay_millis: env_number("DELIVERY_DELAY_MILLIS", 0),
            delivery_workers: env_number("DELIVERY_WORKERS", 2) as usize,
            max_redeliveries: env_number("MAX_REDELIVERIES", 5),
            visibility_timeout_millis: env_number("VISIBILITY_TIMEOUT_MILLIS", 30 * 1000),
            delivery_retry_backoff_millis: env_number("DELIVERY_RETRY_BACKOFF_MILLIS", 5 * 1000),
            delivery_retry_backoff_max_millis: env_number(
                "DELIVERY_RETRY_BACKOFF_MAX_MILLIS",
                5 * 60 * 1000,
            ),
            queue_poll_interval_millis: env_number("QUEUE_POLL_INTERVAL_MILLIS", 500),
            notifier_timeout_millis: env_number("NOTIFIER_TIMEOUT_MILLIS", 10 * 1000),
            geocoder_timeout_millis: env_number("GEOCODER_TIMEOUT_MILLIS", 10 * 1000),
            plan_retry_attempts: env_number("PLAN_RETRY_ATTEMPTS", 4) as u32,
            plan_retry_backoff_millis: env_number("PLAN_RETRY_BACKOFF_MILLIS", 250),
            dead_letter_report_interval_millis: env_number(
                "DEAD_LETTER_REPORT_INTERVAL_MILLIS",
                60 * 1000,
            ),
            rating_scale_min: env_number("RATING_SCALE_MIN", 1),
            rating_scale_max: env_number("RATING_SCALE_MAX", 5),
        }
    }
}

fn env_number(name: &str, default: i64) -> i64 {
    match std::env::var(name) {
        Ok(value) => match value.parse::<i64>() {
            Ok(value) => value,
            Err(_) => {
                warn!(
                    "The given {}: {} is not valid, falling back to the default: {}.",
                    name, value, default
                );
                default
            }
        },
        Err(_) => default,
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
