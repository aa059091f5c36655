//! Web module - Dashboard server, HTML pages and JSON API

mod api;
mod error;
mod pages;
mod params;

use crate::config::DashboardConfig;
use crate::data::Dataset;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tera::Tera;
use tokio::net::TcpListener;
use tracing::{info, warn};

const TEMPLATES: [(&str, &str); 4] = [
    ("base.html", include_str!("../../templates/base.html")),
    ("page.html", include_str!("../../templates/page.html")),
    ("insights.html", include_str!("../../templates/insights.html")),
    ("not_found.html", include_str!("../../templates/not_found.html")),
];

/// Shared, read-only state of every request handler.
pub struct AppState {
    pub dataset: Arc<Dataset>,
    pub config: DashboardConfig,
    pub templates: Tera,
}

impl AppState {
    pub fn new(dataset: Arc<Dataset>, config: DashboardConfig) -> Result<Self, tera::Error> {
        let mut templates = Tera::default();
        templates.add_raw_templates(TEMPLATES)?;
        Ok(Self {
            dataset,
            config,
            templates,
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(pages::overview))
        .route("/funnel", get(pages::funnel))
        .route("/engagement", get(pages::engagement))
        .route("/devices", get(pages::devices))
        .route("/geography", get(pages::geography))
        .route("/insights", get(pages::insights))
        .route("/explore", get(pages::explore))
        .route("/api/summary", get(api::summary))
        .route("/api/charts", get(api::chart_names))
        .route("/api/charts/{name}", get(api::chart))
        .route("/api/charts/{name}/svg", get(api::chart_svg))
        .route("/api/health", get(api::health))
        .fallback(pages::not_found)
        .with_state(state)
}

/// Serve the dashboard until Ctrl-C.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Dashboard listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, stopping server"),
        Err(e) => {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
