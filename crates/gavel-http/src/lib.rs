//! HTTP surface of the judge
//!
//! Exposes `POST /judge/run` and `POST /judge/submit` on top of a
//! [`gavel_core::Judge`], plus `GET /health` and `GET /languages`. Errors are
//! returned as `{ error, details, timestamp }` with a status derived from the
//! failure: validation 400, unknown question 404, sandbox failure 503.

pub mod api;
pub mod error;
pub mod handlers;

pub use api::{LanguageInfo, RunRequest, RunResponse, SubmitRequest, SubmitResponse};
pub use error::{Result, ServerError};

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{middleware, Router};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use gavel_core::{Judge, Language, SandboxConfig, ServerSettings, TestCaseRepository};

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub enable_cors: bool,
    /// CORS allowed origins (if None, allows any origin)
    pub cors_origins: Option<Vec<String>>,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
    pub enable_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 4000)),
            enable_cors: true,
            cors_origins: None,
            max_body_size: 1024 * 1024,
            enable_logging: true,
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `server` section of the YAML configuration.
    pub fn from_settings(settings: &ServerSettings) -> Result<Self> {
        let config = Self::new()
            .with_bind_addr_str(&settings.bind_addr)?
            .with_cors(settings.enable_cors)
            .with_max_body_size(settings.max_body_size)
            .with_logging(settings.enable_logging);

        Ok(match &settings.cors_origins {
            Some(origins) => config.with_cors_origins(origins.clone()),
            None => config,
        })
    }

    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Parse and set the bind address from a string.
    pub fn with_bind_addr_str(mut self, addr: &str) -> Result<Self> {
        self.bind_addr = addr
            .parse()
            .map_err(|e| ServerError::config_error(format!("Invalid bind address: {}", e)))?;
        Ok(self)
    }

    pub fn with_cors(mut self, enable: bool) -> Self {
        self.enable_cors = enable;
        self
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    pub fn with_logging(mut self, enable: bool) -> Self {
        self.enable_logging = enable;
        self
    }
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub judge: Judge,
    pub repository: Option<Arc<dyn TestCaseRepository>>,
    pub languages: Arc<Vec<LanguageInfo>>,
    /// Memory ceiling reported with accepted submissions.
    pub memory_mb: u64,
}

pub struct JudgeServer {
    judge: Judge,
    repository: Option<Arc<dyn TestCaseRepository>>,
    images: HashMap<Language, String>,
    memory_mb: u64,
    config: ServerConfig,
}

impl JudgeServer {
    pub fn new(judge: Judge) -> Self {
        Self {
            judge,
            repository: None,
            images: HashMap::new(),
            memory_mb: SandboxConfig::default().memory_mb,
            config: ServerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_repository(mut self, repository: Arc<dyn TestCaseRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn with_language_image(mut self, language: Language, image: impl Into<String>) -> Self {
        self.images.insert(language, image.into());
        self
    }

    pub fn with_memory_mb(mut self, memory_mb: u64) -> Self {
        self.memory_mb = memory_mb;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    fn languages(&self) -> Vec<LanguageInfo> {
        Language::ALL
            .iter()
            .map(|lang| {
                let image = self
                    .images
                    .get(lang)
                    .cloned()
                    .unwrap_or_else(|| lang.default_image().to_string());
                LanguageInfo::new(*lang, image)
            })
            .collect()
    }

    /// Build the Axum router with all routes and middleware.
    pub fn build_router(&self) -> Router {
        let state = AppState {
            judge: self.judge.clone(),
            repository: self.repository.clone(),
            languages: Arc::new(self.languages()),
            memory_mb: self.memory_mb,
        };

        let mut router = Router::new()
            .route("/health", get(handlers::health_handler))
            .route("/languages", get(handlers::languages_handler))
            .route("/judge/run", post(handlers::run_handler))
            .route("/judge/submit", post(handlers::submit_handler))
            .layer(DefaultBodyLimit::max(self.config.max_body_size))
            .with_state(state);

        if self.config.enable_logging {
            router = router.layer(middleware::from_fn(
                |request: axum::http::Request<axum::body::Body>,
                 next: axum::middleware::Next| async {
                    let request_id = uuid::Uuid::new_v4().to_string();
                    let method = request.method().clone();
                    let uri = request.uri().clone();

                    // Health probes are frequent; keep them out of info logs.
                    let quiet = uri.path() == "/health";
                    if quiet {
                        log::debug!("Request {} {} {}", request_id, method, uri);
                    } else {
                        log::info!("Request {} {} {}", request_id, method, uri);
                    }

                    let start = std::time::Instant::now();
                    let response = next.run(request).await;
                    let duration = start.elapsed();

                    if quiet {
                        log::debug!("Response {} completed in {:?}", request_id, duration);
                    } else {
                        log::info!(
                            "Response {} {} completed in {:?}",
                            request_id,
                            response.status(),
                            duration
                        );
                    }

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
                        log::warn!("Invalid CORS origin configured, allowing any origin");
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

    fn log_endpoints(&self) {
        let addr = self.config.bind_addr;
        log::info!("Health check: http://{}/health", addr);
        log::info!("Languages: http://{}/languages", addr);
        log::info!("Run endpoint: http://{}/judge/run", addr);
        log::info!("Submit endpoint: http://{}/judge/submit", addr);
    }

    /// Start the server and listen for connections until it fails.
    pub async fn serve(self) -> Result<()> {
        let router = self.build_router();
        let listener = self.bind().await?;

        log::info!("judge server starting on {}", self.config.bind_addr);
        self.log_endpoints();

        axum::serve(listener, router).await?;
        Ok(())
    }

    /// Start the server and stop accepting connections once `shutdown_signal`
    /// resolves. In-flight requests are allowed to finish.
    pub async fn serve_with_shutdown<F>(self, shutdown_signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let router = self.build_router();
        let listener = self.bind().await?;

        log::info!(
            "judge server starting on {} with graceful shutdown",
            self.config.bind_addr
        );
        self.log_endpoints();

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await?;

        log::info!("judge server shut down gracefully");
        Ok(())
    }
}

/// Resolves on Ctrl+C or SIGTERM.
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

#[cfg(test)]
mod tests;
