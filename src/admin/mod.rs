//! Read-only operational API.
//!
//! Served on its own listener, behind a bearer key.

pub mod auth;
pub mod handlers;

use std::sync::Arc;
use std::time::Instant;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::routing::RouteTable;
use crate::security::AdmissionController;
use crate::session::SessionExclusivityManager;

#[derive(Debug, Clone)]
pub struct AdminState {
    pub api_key: String,
    pub routes: Arc<RouteTable>,
    pub admission: Arc<AdmissionController>,
    pub sessions: SessionExclusivityManager,
    pub started_at: Instant,
}

pub fn setup_admin_router(state: Arc<AdminState>) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/sessions", get(get_sessions))
        .route("/admin/admission", get(get_admission))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
