//! HTTP dispatcher for the baby language playground
//!
//! A thin axum layer over [`baby_core::CodeRunner`]: validate the inbound
//! `{ "code": ... }` body, hand the submission to the pipeline on its own task,
//! and serialize the resulting `CompileResult`. Running the pipeline on a
//! spawned task means an abandoned connection still lets the (deadline-bounded)
//! pipeline finish and clean up its workspace.

pub mod error;
pub mod response;

pub use error::{Result, ServerError};
pub use response::{CompileBody, CompileResponse};

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, options, post};
use axum::{middleware, Router};
use baby_core::{CodeRunner, CompileRequest, PlaygroundConfig};
use serde::Serialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

/// Configuration for the playground server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Enable CORS
    pub enable_cors: bool,
    /// CORS allowed origins (if None, allows any origin)
    pub cors_origins: Option<Vec<String>>,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
    /// Maximum size of the submitted source in bytes
    pub max_source_bytes: usize,
    /// Enable request logging
    pub enable_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
            enable_cors: true,
            cors_origins: None,
            max_body_size: 1024 * 1024, // 1MB
            max_source_bytes: 256 * 1024,
            enable_logging: true,
        }
    }
}

impl ServerConfig {
    /// Create a new server configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the HTTP settings from a loaded playground configuration.
    pub fn from_playground(config: &PlaygroundConfig) -> Result<Self> {
        Self::new()
            .with_bind_addr_str(&config.server.bind_addr)
            .map(|server| {
                server
                    .with_cors(config.server.enable_cors)
                    .with_max_body_size(config.server.max_body_size)
                    .with_max_source_bytes(config.limits.max_source_bytes)
            })
            .map(|server| match &config.server.cors_origins {
                Some(origins) => server.with_cors_origins(origins.clone()),
                None => server,
            })
    }

    /// Set the bind address.
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Parse and set the bind address from a string.
    pub fn with_bind_addr_str(self, addr: &str) -> Result<Self> {
        let parsed: SocketAddr = addr
            .parse()
            .map_err(|e| ServerError::config_error(format!("Invalid bind address '{}': {}", addr, e)))?;
        Ok(self.with_bind_addr(parsed))
    }

    /// Enable or disable CORS.
    pub fn with_cors(mut self, enable: bool) -> Self {
        self.enable_cors = enable;
        self
    }

    /// Set allowed CORS origins.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Set maximum request body size.
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Set maximum submitted source size.
    pub fn with_max_source_bytes(mut self, size: usize) -> Self {
        self.max_source_bytes = size;
        self
    }

    /// Enable or disable request logging.
    pub fn with_logging(mut self, enable: bool) -> Self {
        self.enable_logging = enable;
        self
    }
}

/// Shared application state containing the runner and configuration.
#[derive(Clone)]
pub struct AppState<T: CodeRunner + Clone> {
    pub runner: T,
    pub config: ServerConfig,
}

/// Handler for the /compile POST endpoint.
async fn compile_handler<T: CodeRunner + Clone + 'static>(
    State(app_state): State<AppState<T>>,
    payload: std::result::Result<Json<CompileBody>, JsonRejection>,
) -> Result<Json<CompileResponse>> {
    let Json(body) = payload.map_err(|rejection| {
        log::warn!("Rejected compile request: {}", rejection.body_text());
        ServerError::invalid_request(rejection.body_text())
    })?;

    let code = body.code.ok_or_else(|| {
        log::warn!("Rejected compile request without code");
        ServerError::missing_field("code")
    })?;

    if code.len() > app_state.config.max_source_bytes {
        log::warn!(
            "Rejected compile request with {} bytes of source (limit {})",
            code.len(),
            app_state.config.max_source_bytes
        );
        return Err(ServerError::invalid_request(format!(
            "code exceeds {} bytes",
            app_state.config.max_source_bytes
        )));
    }

    log::info!("Received compile request ({} bytes)", code.len());

    let runner = app_state.runner.clone();
    let request = CompileRequest::new(code);
    let result = tokio::spawn(async move { runner.compile_and_run(request).await })
        .await
        .map_err(|e| ServerError::internal(format!("pipeline task failed: {}", e)))?;

    Ok(Json(CompileResponse::from(result)))
}

/// The playground HTTP server.
pub struct PlaygroundServer<T: CodeRunner + Clone> {
    runner: T,
    config: ServerConfig,
}

impl<T: CodeRunner + Clone + Send + Sync + 'static> PlaygroundServer<T> {
    /// Create a new server with the given runner and default configuration.
    pub fn new(runner: T) -> Self {
        Self {
            runner,
            config: ServerConfig::default(),
        }
    }

    /// Create a new server with custom configuration.
    pub fn with_config(runner: T, config: ServerConfig) -> Self {
        Self { runner, config }
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the Axum router with all routes and middleware.
    pub fn build_router(&self) -> Router {
        let state = AppState {
            runner: self.runner.clone(),
            config: self.config.clone(),
        };

        let mut router = Router::new()
            .route("/health", get(|| async {
                Json(HealthResponse {
                    status: "healthy".to_string(),
                    timestamp: chrono::Utc::now(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                })
            }))
            .route("/compile", post(compile_handler::<T>))
            // CORS preflight
            .route("/compile", options(|| async { StatusCode::OK }))
            .layer(DefaultBodyLimit::max(self.config.max_body_size))
            .with_state(state);

        if self.config.enable_logging {
            router = router.layer(middleware::from_fn(
                |request: axum::http::Request<axum::body::Body>,
                 next: axum::middleware::Next| async {
                    let request_id = uuid::Uuid::new_v4().to_string();
                    let method = request.method().clone();
                    let uri = request.uri().clone();

                    if uri.path() == "/health" {
                        log::debug!("Request {} {} {}", request_id, method, uri);
                    } else {
                        log::info!("Request {} {} {}", request_id, method, uri);
                    }

                    let start = std::time::Instant::now();
                    let response = next.run(request).await;
                    log::info!(
                        "Response {} {} completed in {:?}",
                        request_id,
                        response.status(),
                        start.elapsed()
                    );

                    response
                },
            ));
        }

        router = router.layer(TraceLayer::new_for_http());

        if self.config.enable_cors {
            let cors_layer = if let Some(ref origins) = self.config.cors_origins {
                let origins: std::result::Result<Vec<_>, _> =
                    origins.iter().map(|s| s.parse()).collect();
                match origins {
                    Ok(origins) => CorsLayer::new()
                        .allow_origin(origins)
                        .allow_methods(Any)
                        .allow_headers(Any),
                    Err(_) => {
                        log::warn!("Invalid CORS origin configured; falling back to permissive CORS");
                        CorsLayer::permissive()
                    }
                }
            } else {
                CorsLayer::permissive()
            };
            router = router.layer(cors_layer);
        }

        router
    }

    async fn bind(&self) -> Result<TcpListener> {
        TcpListener::bind(self.config.bind_addr).await.map_err(|e| {
            ServerError::config_error(format!(
                "Failed to bind to {}: {}",
                self.config.bind_addr, e
            ))
        })
    }

    /// Start the server and listen for connections.
    ///
    /// This method will block until the server is shut down.
    pub async fn serve(self) -> Result<()> {
        let router = self.build_router();
        let listener = self.bind().await?;

        log::info!("Playground server starting on {}", self.config.bind_addr);
        log::info!("Health check: http://{}/health", self.config.bind_addr);
        log::info!("Compile endpoint: http://{}/compile", self.config.bind_addr);

        axum::serve(listener, router)
            .await
            .map_err(|e| ServerError::internal(format!("Server error: {}", e)))
    }

    /// Start the server with graceful shutdown support.
    ///
    /// The server will shut down when the provided shutdown signal is received.
    pub async fn serve_with_shutdown<F>(self, shutdown_signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let router = self.build_router();
        let listener = self.bind().await?;

        log::info!(
            "Playground server starting on {} with graceful shutdown",
            self.config.bind_addr
        );
        log::info!("Compile endpoint: http://{}/compile", self.config.bind_addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::internal(format!("Server error: {}", e)))?;

        log::info!("Playground server shut down gracefully");
        Ok(())
    }
}

/// Utility function to create a shutdown signal from Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log::info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            log::info!("Received SIGTERM, shutting down...");
        },
    }
}
