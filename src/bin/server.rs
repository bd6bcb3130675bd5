//! Serves the skeleton deployment: compose settings, register resources,
//! freeze, provision the schema, and listen.

use axum::Router;
use relief_rest::{
    common_routes_with_ready, create_name_indexes, create_tables, deploy, rest_routes, AppState,
    BasicRenderer, MessageCatalog, PermitAll, ResourceRegistry, SettingsRegistry,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("relief_rest=info".parse()?),
        )
        .init();

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/relief".into());
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    let mut settings = SettingsRegistry::new();
    deploy::register_templates(&mut settings);
    let template = std::env::var("RELIEF_TEMPLATE").unwrap_or_else(|_| "Skeleton".into());
    settings.append_template(&template)?;
    settings.freeze();

    let mut registry = ResourceRegistry::new();
    deploy::register_resources(&mut registry)?;
    registry.freeze();

    create_tables(&pool, &registry).await?;
    create_name_indexes(&pool, &registry).await?;

    let languages: Vec<String> = settings
        .get_list("L10n.languages")
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();
    let mut catalog = MessageCatalog::new(languages);
    if let Ok(dir) = std::env::var("RELIEF_LANGUAGES_DIR") {
        catalog.refresh_from_dir(std::path::Path::new(&dir))?;
    }

    let state = AppState {
        pool,
        settings: Arc::new(settings),
        registry: Arc::new(registry),
        policy: Arc::new(PermitAll),
        renderer: Arc::new(BasicRenderer),
        catalog: Arc::new(catalog),
    };

    let app = Router::new()
        .merge(common_routes_with_ready(state.clone()))
        .merge(rest_routes(state))
        .layer(RequestBodyLimitLayer::new(2 * 1024 * 1024))
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind("0.0.0.0:3000").await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
