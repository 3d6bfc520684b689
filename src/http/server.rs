//! HTTP server setup and request pipeline.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, admission)
//! - Bind server to listener, spawn the sweeper and admin API
//! - Run each proxied request through auth, body limit, session gate,
//!   dispatch and the response-time observer

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::admin::{setup_admin_router, AdminState};
use crate::config::validation::validate_config;
use crate::config::{ConfigError, GatewayConfig};
use crate::http::request::{client_instance, request_id, x_request_id, MakeGatewayRequestId};
use crate::http::response::{hold_until_complete, GatewayError};
use crate::lifecycle::Shutdown;
use crate::observability::{LogPolicy, ObservedRequest, ResponseTimeObserver};
use crate::proxy::ProxyDispatcher;
use crate::resilience::with_deadline;
use crate::routing::RouteTable;
use crate::security::admission::admission_middleware;
use crate::security::{AdmissionController, Authenticator, StaticTokenAuthenticator};
use crate::session::{spawn_sweeper, SessionDecision, SessionExclusivityManager, SessionStore};
use crate::voice::{self, SettingsError, SettingsProvider, VoiceConfigResolver, VoiceState};

pub const SERVICE_NAME: &str = "session-gateway";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("settings client: {0}")]
    Settings(#[from] SettingsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub dispatcher: ProxyDispatcher,
    pub sessions: SessionExclusivityManager,
    pub authenticator: Arc<dyn Authenticator>,
    pub observer: ResponseTimeObserver,
    pub client_instance_header: String,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    config: GatewayConfig,
    routes: Arc<RouteTable>,
    admission: Arc<AdmissionController>,
    sessions: SessionExclusivityManager,
    authenticator: Arc<dyn Authenticator>,
    settings: Arc<dyn SettingsProvider>,
    started_at: Instant,
}

impl HttpServer {
    /// Validate `config` and build every subsystem from it.
    pub fn new(config: GatewayConfig) -> Result<Self, ServerError> {
        validate_config(&config).map_err(ConfigError::Validation)?;
        let routes = RouteTable::from_config(&config.routes).map_err(ConfigError::Validation)?;

        let admission = AdmissionController::new(config.admission.max_concurrent);
        let sessions =
            SessionExclusivityManager::new(Duration::from_secs(config.sessions.inactivity_secs));
        let authenticator = Arc::new(StaticTokenAuthenticator::from_config(&config.auth));
        let settings = VoiceConfigResolver::provider_from_config(&config.voice)?;

        Ok(Self {
            routes: Arc::new(routes),
            admission: Arc::new(admission),
            sessions,
            authenticator,
            settings,
            started_at: Instant::now(),
            config,
        })
    }

    /// Replace the authentication gate.
    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = authenticator;
        self
    }

    /// Replace the user settings lookup used by the voice endpoints.
    pub fn with_settings_provider(mut self, settings: Arc<dyn SettingsProvider>) -> Self {
        self.settings = settings;
        self
    }

    /// Keep session locks in `store` instead of process memory.
    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.sessions = SessionExclusivityManager::with_store(store, self.sessions.inactivity());
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionExclusivityManager {
        &self.sessions
    }

    pub fn admission(&self) -> &Arc<AdmissionController> {
        &self.admission
    }

    /// Build the Axum router with all middleware layers.
    pub fn router(&self) -> Router {
        let state = AppState {
            routes: self.routes.clone(),
            dispatcher: ProxyDispatcher::new(
                &self.config.timeouts,
                &self.config.security,
                &self.config.upstream,
            ),
            sessions: self.sessions.clone(),
            authenticator: self.authenticator.clone(),
            observer: ResponseTimeObserver::new(LogPolicy::from_config(&self.config.observability)),
            client_instance_header: self.config.sessions.client_instance_header.clone(),
        };

        let mut app = Router::new()
            .route("/health", get(health))
            .fallback(proxy_handler)
            .with_state(state);

        if self.config.voice.enabled {
            let voice_state = Arc::new(VoiceState {
                resolver: VoiceConfigResolver::new(self.settings.clone(), &self.config.voice),
                authenticator: self.authenticator.clone(),
                client_instance_header: self.config.sessions.client_instance_header.clone(),
            });
            let mount = self.config.voice.mount_path.trim_end_matches('/');
            app = app.nest(mount, voice::router(voice_state));
        }

        if self.config.admission.enabled {
            app = app.layer(middleware::from_fn_with_state(
                self.admission.clone(),
                admission_middleware,
            ));
        }

        app.layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id(), MakeGatewayRequestId))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(x_request_id())),
        )
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.routes.len(),
            max_concurrent = self.config.admission.max_concurrent,
            "HTTP server starting"
        );

        let sweeper = spawn_sweeper(
            self.sessions.clone(),
            Duration::from_secs(self.config.sessions.sweep_interval_secs),
            shutdown.subscribe(),
        );

        let admin = if self.config.admin.enabled {
            Some(self.spawn_admin(&shutdown).await?)
        } else {
            None
        };

        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();

        let mut stop = shutdown.subscribe();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
            })
            .await?;

        // Stop the background tasks as well if the server exited by itself.
        shutdown.trigger();
        let _ = sweeper.await;
        if let Some(admin) = admin {
            let _ = admin.await;
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    async fn spawn_admin(&self, shutdown: &Shutdown) -> Result<tokio::task::JoinHandle<()>, ServerError> {
        let listener = TcpListener::bind(&self.config.admin.bind_address).await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(AdminState {
            api_key: self.config.admin.api_key.clone(),
            routes: self.routes.clone(),
            admission: self.admission.clone(),
            sessions: self.sessions.clone(),
            started_at: self.started_at,
        });
        let app = setup_admin_router(state);
        let mut stop = shutdown.subscribe();

        tracing::info!(address = %addr, "Admin API listening");
        Ok(tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = stop.recv().await;
                })
                .await;
            if let Err(e) = served {
                tracing::error!(error = %e, "Admin API stopped with error");
            }
        }))
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": SERVICE_NAME }))
}

async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    match forward_request(&state, addr, request).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn forward_request(
    state: &AppState,
    addr: SocketAddr,
    request: Request<Body>,
) -> Result<Response, GatewayError> {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request_id(request.headers()).to_string();

    let route = state.routes.resolve(&path).ok_or_else(|| {
        tracing::warn!(request_id = %request_id, method = %method, path = %path, "No route matched");
        GatewayError::RouteNotFound(path.clone())
    })?;

    let principal = if route.requires_auth {
        let principal = state.authenticator.authenticate(request.headers()).map_err(|e| {
            tracing::warn!(request_id = %request_id, path = %path, error = %e, "Authentication failed");
            GatewayError::Unauthorized(e.to_string())
        })?;
        Some(principal)
    } else {
        None
    };

    let buffered = with_deadline(route.timeout, state.dispatcher.buffer(request))
        .await
        .unwrap_or(Err(GatewayError::RequestTimeout {
            timeout: route.timeout,
        }))
        .map_err(|e| {
            tracing::warn!(request_id = %request_id, path = %path, error = %e, "Rejected request body");
            e
        })?;

    let session = match route.session_resource(&method, &path) {
        Some(resource_id) => {
            let client = client_instance(&buffered.headers, &state.client_instance_header);
            let user_id = principal.as_ref().map(|p| p.user_id.as_str());
            match state.sessions.try_acquire(resource_id, client, user_id) {
                SessionDecision::Granted(guard) => Some(guard),
                SessionDecision::Conflict { .. } => {
                    return Err(GatewayError::SessionConflict(resource_id.to_string()));
                }
            }
        }
        None => None,
    };

    let observed = ObservedRequest {
        method: &method,
        path: &path,
        route: &route.name,
        request_id: &request_id,
    };
    let result = state
        .observer
        .observe(observed, state.dispatcher.forward(buffered, &route, addr))
        .await;

    match result {
        Ok(response) => Ok(match session {
            Some(guard) => hold_until_complete(response, guard),
            None => response,
        }),
        Err(failure) => Err(state.dispatcher.failure_error(&route, failure)),
    }
}
