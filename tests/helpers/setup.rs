use std::sync::Arc;
use vicinity_api::Application;
use vicinity_infra::{Config, InMemoryGeocoder, VicinityContext};

pub struct TestApp {
    pub config: Config,
    /// Handle to the state behind the server, for steering test doubles
    /// and watching the delivery pipeline from the outside.
    pub ctx: VicinityContext,
    /// The geocoder the server resolves addresses with. Register addresses
    /// here before sending them.
    pub geocoder: Arc<InMemoryGeocoder>,
    pub address: String,
    pub api: reqwest::Client,
}

// Launch the application as a background task
pub async fn spawn_app() -> TestApp {
    let mut ctx = VicinityContext::create_inmemory();
    ctx.config.port = 0; // Random port
    let geocoder = Arc::new(InMemoryGeocoder::new());
    ctx.geocoder = geocoder.clone();

    let config = ctx.config.clone();
    let application = Application::new(ctx.clone())
        .await
        .expect("Failed to build application.");
    let address = format!("http://localhost:{}/api/v1", application.port());

    actix_web::rt::spawn(async move {
        application
            .start()
            .await
            .expect("Expected application to start");
    });

    TestApp {
        config,
        ctx,
        geocoder,
        address,
        api: reqwest::Client::new(),
    }
}
