//! REST exposure of the platform
//!
//! Every resource route is nested under `/api`. Health checks stay at the
//! root so load balancers can reach them without credentials or rate limits.

pub mod notifications;

use super::super::host::ServerHost;
use super::super::rate_limit::{RateLimiter, rate_limit};
use anyhow::Result;
use axum::http::{HeaderName, HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub struct RestExposure;

impl RestExposure {
    /// Build the full HTTP router from a host
    ///
    /// Custom routes are nested under `/api` along with the resources.
    pub fn build_router(host: Arc<ServerHost>, custom_routes: Vec<Router>) -> Result<Router> {
        let mut api = host
            .entity_registry
            .build_routes()
            .merge(Self::notification_routes(&host));
        for custom_router in custom_routes {
            api = api.merge(custom_router);
        }

        let limiter = Arc::new(RateLimiter::new(host.state.config.rate_limit.clone()));
        let cors = Self::cors(&host.state.config.server.cors_origins)?;

        Ok(Self::health_routes()
            .nest("/api", api)
            .layer(from_fn_with_state(limiter, rate_limit))
            .layer(cors)
            .layer(TraceLayer::new_for_http()))
    }

    fn notification_routes(host: &ServerHost) -> Router {
        Router::new()
            .route("/notifications/stream", get(notifications::notification_stream))
            .with_state(host.state.clone())
    }

    /// Configured origins, or any origin when none are configured
    fn cors(origins: &[String]) -> Result<CorsLayer> {
        let layer = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([
                axum::http::header::CONTENT_TYPE,
                HeaderName::from_static("x-user-id"),
                HeaderName::from_static("x-user-role"),
                HeaderName::from_static("x-webhook-secret"),
            ]);
        if origins.is_empty() {
            return Ok(layer.allow_origin(Any));
        }
        let origins = origins
            .iter()
            .map(|o| HeaderValue::from_str(o))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(layer.allow_origin(AllowOrigin::list(origins)))
    }

    fn health_routes() -> Router {
        Router::new()
            .route("/health", get(Self::health_check))
            .route("/healthz", get(Self::health_check))
    }

    async fn health_check() -> Json<Value> {
        Json(json!({
            "status": "ok",
            "service": "derlg-api",
            "version": env!("CARGO_PKG_VERSION"),
        }))
    }
}
