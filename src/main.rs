use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reviewgen::provider::{GeminiClient, GenerateReviewer};
use reviewgen::{config, db, handlers, state};

#[tokio::main]
async fn main() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "reviewgen=debug,tower_http=debug".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let config = Arc::new(config::Config::load());

  let pool = db::init_db(&config.database_path).expect("Failed to initialize database");

  let provider: Arc<dyn GenerateReviewer> = Arc::new(GeminiClient::new(&config));
  let app_state = state::AppState::new(pool, provider, config.clone());

  let app = handlers::router(app_state).layer(TraceLayer::new_for_http());

  let listener = tokio::net::TcpListener::bind(&config.bind_addr)
    .await
    .unwrap_or_else(|_| panic!("Failed to bind to {}", config.bind_addr));

  tracing::info!("Server running on http://{}", config.bind_addr);

  axum::serve(listener, app)
    .await
    .expect("Server failed to start");
}
