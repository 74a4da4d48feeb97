//! `RollcallServer` builder and serve loop.
//!
//! This is the entry point for running the attendance service. It ties
//! the layers together: HTTP routes → session store → tick + protocol.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use rollcall_protocol::SvgQrEncoder;
use rollcall_session::{
    AttendanceVerifier, Authenticator, RandomTokenSource, SessionConfig, SessionStore,
};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::{ConfigError, ServerConfig};
use crate::{RollcallError, handler, middleware};

/// Shared state handed to every request handler.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The store
/// handle is itself a channel sender, so no lock is needed here.
pub(crate) struct AppState<A: Authenticator> {
    pub(crate) store: SessionStore,
    pub(crate) verifier: AttendanceVerifier,
    pub(crate) auth: A,
}

/// Builder for configuring and starting a Rollcall server.
///
/// # Example
///
/// ```rust,no_run
/// use rollcall::prelude::*;
///
/// # async fn run() -> Result<(), RollcallError> {
/// let server = RollcallServer::builder()
///     .bind("0.0.0.0:4000".parse().expect("valid address"))
///     .client_url("http://localhost:5173")
///     .build(OpenAccess)
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct RollcallServerBuilder {
    bind_addr: SocketAddr,
    session_config: SessionConfig,
    client_url: String,
}

impl RollcallServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::from_config(&ServerConfig::default())
    }

    /// Starts from a loaded [`ServerConfig`].
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            bind_addr: config.bind_address,
            session_config: config.session.clone(),
            client_url: config.client_url.clone(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Sets the session lifetime and rotation settings.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Sets the browser origin allowed by CORS.
    pub fn client_url(mut self, url: impl Into<String>) -> Self {
        self.client_url = url.into();
        self
    }

    /// Spawns the session store and returns the application router
    /// without binding a socket.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn into_router<A: Authenticator>(self, auth: A) -> Result<Router, RollcallError> {
        let (router, _store) = self.assemble(auth)?;
        Ok(router)
    }

    /// Spawns the session store and binds the listener.
    pub async fn build<A: Authenticator>(self, auth: A) -> Result<RollcallServer, RollcallError> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        let (router, store) = self.assemble(auth)?;
        Ok(RollcallServer {
            listener,
            router,
            store,
        })
    }

    fn assemble<A: Authenticator>(
        self,
        auth: A,
    ) -> Result<(Router, SessionStore), RollcallError> {
        let origin = self
            .client_url
            .parse::<HeaderValue>()
            .map_err(|e| ConfigError::InvalidValue("CLIENT_URL".into(), e.to_string()))?;

        let store = SessionStore::spawn(
            self.session_config,
            RandomTokenSource,
            SvgQrEncoder::default(),
        )?;
        let state = Arc::new(AppState {
            verifier: AttendanceVerifier::new(store.clone()),
            store: store.clone(),
            auth,
        });

        Ok((routes(state, origin), store))
    }
}

impl Default for RollcallServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn routes<A: Authenticator>(state: Arc<AppState<A>>, origin: HeaderValue) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    let teacher_routes = Router::new()
        .route("/start", post(handler::start_session::<A>))
        .route("/stop", post(handler::stop_session::<A>))
        .route_layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state),
            middleware::require_teacher::<A>,
        ));

    let public_routes = Router::new()
        .route("/active", get(handler::active_session::<A>))
        .route("/verify", post(handler::verify_scan::<A>));

    Router::new()
        .route("/", get(handler::health))
        .nest("/api/qr", teacher_routes.merge(public_routes))
        .fallback(handler::not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A bound Rollcall server.
///
/// Call [`run()`](Self::run) to start serving requests.
pub struct RollcallServer {
    listener: TcpListener,
    router: Router,
    store: SessionStore,
}

impl RollcallServer {
    /// Creates a new builder.
    pub fn builder() -> RollcallServerBuilder {
        RollcallServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves until Ctrl-C.
    pub async fn run(self) -> Result<(), RollcallError> {
        self.run_until(shutdown_signal()).await
    }

    /// Serves until `shutdown` resolves, then stops the session store.
    ///
    /// Any active session is discarded; nothing is persisted.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), RollcallError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!(addr = ?self.listener.local_addr().ok(), "Rollcall server running");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        if let Err(e) = self.store.shutdown().await {
            tracing::debug!(error = %e, "session store already stopped");
        }
        tracing::info!("Rollcall server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
