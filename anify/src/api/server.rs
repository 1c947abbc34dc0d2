use crate::config::{CorsConfig, ServerConfig};
use crate::search::SearchPipeline;
use crate::Result;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::routes;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<SearchPipeline>,
    pub metrics: Option<PrometheusHandle>,
}

pub struct ApiServer {
    pipeline: Arc<SearchPipeline>,
    cors_config: CorsConfig,
    max_body_size: usize,
    metrics: Option<PrometheusHandle>,
}

impl ApiServer {
    pub fn new(pipeline: Arc<SearchPipeline>) -> Self {
        Self::with_config(pipeline, &ServerConfig::default())
    }

    pub fn with_config(pipeline: Arc<SearchPipeline>, config: &ServerConfig) -> Self {
        Self {
            pipeline,
            cors_config: config.cors.clone(),
            max_body_size: config.max_body_size,
            metrics: None,
        }
    }

    /// Expose the recorder at GET /metrics
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build CORS layer from configuration
    fn build_cors_layer(&self) -> CorsLayer {
        if !self.cors_config.enabled {
            return CorsLayer::new();
        }

        let origins: Vec<HeaderValue> = self
            .cors_config
            .origins
            .iter()
            .filter(|o| o.as_str() != "*")
            .filter_map(|o| o.parse().ok())
            .collect();

        let has_wildcard = self.cors_config.origins.iter().any(|o| o == "*");

        let cors = if has_wildcard {
            CorsLayer::new().allow_origin(tower_http::cors::Any)
        } else if origins.is_empty() {
            CorsLayer::new()
        } else {
            CorsLayer::new().allow_origin(origins)
        };

        cors.allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(tower_http::cors::Any)
    }

    pub fn router(&self) -> Router {
        let state = AppState {
            pipeline: self.pipeline.clone(),
            metrics: self.metrics.clone(),
        };

        let mut router = Router::new()
            .route("/api/search", post(routes::search))
            .route("/health", get(routes::health));

        if self.metrics.is_some() {
            router = router.route("/metrics", get(routes::metrics));
        }

        router
            .with_state(state)
            .layer(DefaultBodyLimit::max(self.max_body_size))
            .layer(self.build_cors_layer())
            .layer(TraceLayer::new_for_http())
    }

    pub async fn serve(self, addr: &str) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}
