//! services/dashboard/src/bin/dashboard.rs

use dashboard_lib::{
    adapters::{MemoryBackend, PgBackend, StaticSession},
    config::Config,
    error::ApiError,
    web::{self, rest::ApiDoc, state::AppState},
};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tasktime_core::domain::{Project, Task, TaskStatus};
use tasktime_core::ports::TimeTrackingBackend;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting dashboard...");

    // --- 2. Connect to the Platform ---
    let backend: Arc<dyn TimeTrackingBackend> = match &config.database_url {
        Some(database_url) => {
            info!("Connecting to the platform database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(config.remote_timeout)
                .connect(database_url)
                .await?;
            let pg_backend = PgBackend::new(db_pool);
            if config.run_migrations {
                info!("Running development migrations...");
                pg_backend.run_migrations().await?;
                info!("Migrations complete.");
            }
            Arc::new(pg_backend)
        }
        None => {
            warn!("DATABASE_URL is not set; running against the in-memory demo backend.");
            Arc::new(demo_backend())
        }
    };

    // --- 3. Build the Shared AppState ---
    let session = Arc::new(StaticSession::new(config.user_id));
    let app_state = AppState::new(config.clone(), backend, session);

    if let Some(user_id) = config.user_id {
        let (tasks, projects) = tokio::join!(
            app_state.tasks.refresh(user_id),
            app_state.projects.refresh(user_id)
        );
        if tasks.is_err() || projects.is_err() {
            warn!("Initial cache load incomplete; surfaces can retry via /caches/refresh");
        }
    } else {
        warn!("No DASHBOARD_USER_ID configured; protected routes answer 401.");
    }

    let allowed_origin = config.allowed_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid ALLOWED_ORIGIN '{}': {}", config.allowed_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 4. Create the Web Router ---
    let app = Router::new()
        .merge(web::router(app_state.clone()).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    app_state.dispose();
    info!("Dashboard stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested.");
}

/// A small catalog so the surfaces have something to track in demo mode.
fn demo_backend() -> MemoryBackend {
    let project = Project {
        id: Uuid::new_v4(),
        workspace_id: Uuid::new_v4(),
        name: "Demo project".to_string(),
        budget_hours: Some(40.0),
    };
    let tasks = ["Write report", "Review designs", "Client call"]
        .into_iter()
        .map(|title| Task {
            id: Uuid::new_v4(),
            project_id: project.id,
            title: title.to_string(),
            status: TaskStatus::Todo,
        })
        .collect();
    MemoryBackend::with_catalog(vec![project], tasks)
}
