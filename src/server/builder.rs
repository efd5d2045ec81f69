//! ServerBuilder for fluent API to build HTTP servers

use super::entity_registry::EntityRegistry;
use super::exposure::RestExposure;
use super::host::ServerHost;
use crate::app::AppState;
use crate::core::module::Module;
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Builder for the platform HTTP server
///
/// # Example
///
/// ```ignore
/// let state = AppState::in_memory(AppConfig::default());
/// ServerBuilder::new(state.clone())
///     .register_module(PlatformModule::new(state))
///     .serve("0.0.0.0:5000")
///     .await?;
/// ```
pub struct ServerBuilder {
    state: AppState,
    entity_registry: EntityRegistry,
    modules: Vec<Arc<dyn Module>>,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            entity_registry: EntityRegistry::new(),
            modules: Vec::new(),
            custom_routes: Vec::new(),
        }
    }

    /// Add routes outside any module; they are nested under `/api` too
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Register a module and every entity descriptor it declares
    pub fn register_module(mut self, module: impl Module + 'static) -> Self {
        let module = Arc::new(module);
        module.register_entities(&mut self.entity_registry);
        tracing::debug!(
            module = module.name(),
            version = module.version(),
            entities = module.entity_types().len(),
            "module registered"
        );
        self.modules.push(module);
        self
    }

    pub fn build_host(self) -> ServerHost {
        ServerHost::new(self.state, self.entity_registry)
    }

    /// Build the final REST router
    pub fn build(mut self) -> Result<Router> {
        let custom_routes = std::mem::take(&mut self.custom_routes);
        let host = Arc::new(self.build_host());
        RestExposure::build_router(host, custom_routes)
    }

    /// Serve the application with graceful shutdown
    ///
    /// Stops accepting connections on SIGTERM or Ctrl+C and lets in-flight
    /// requests finish.
    pub async fn serve(self, addr: &str) -> Result<()> {
        self.serve_until(addr, shutdown_signal()).await
    }

    /// Serve until `shutdown` resolves
    pub async fn serve_until(
        self,
        addr: &str,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
pub async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
