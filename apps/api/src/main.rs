mod config;
mod errors;
mod generation;
mod layout;
mod llm_client;
mod models;
mod pipeline;
mod render;
mod routes;
mod sources;
mod state;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::generation::{IllustrationSynthesizer, NarrativeSynthesizer};
use crate::layout::default_page_metrics;
use crate::llm_client::GeminiClient;
use crate::pipeline::Session;
use crate::routes::build_router;
use crate::sources::RedditSource;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Storyweave API v{}", env!("CARGO_PKG_VERSION"));

    // Page metrics (A4, 20 mm margins, base-14 fonts)
    let page_metrics = default_page_metrics();
    page_metrics.validate()?;
    info!(
        "Page metrics: {}x{} mm, margin {} mm",
        page_metrics.page_width_mm, page_metrics.page_height_mm, page_metrics.margin_mm
    );

    // Initialize Gemini client (serves both text and image generation)
    let gemini = Arc::new(GeminiClient::new(config.gemini_api_key.clone()));
    info!(
        "Gemini client initialized (text: {}, image: {})",
        llm_client::TEXT_MODEL,
        llm_client::IMAGE_MODEL
    );

    // Initialize content source
    let source = Arc::new(RedditSource::new(config.source_url.clone()));
    info!("Content source: {}", config.source_url);

    let mut session = Session::new(
        source,
        NarrativeSynthesizer::new(gemini.clone()),
        IllustrationSynthesizer::new(gemini),
        page_metrics,
    );
    if let Some(dir) = &config.export_dir {
        info!("Exports will also be written to {}", dir.display());
        session = session.with_export_dir(dir.clone());
    }

    // Build app state
    let state = AppState {
        session: Arc::new(session),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
