use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::AdminState;

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemStatus {
    pub version: String,
    pub status: String,
    pub uptime_secs: u64,
    pub routes: Vec<RouteSummary>,
    pub active_sessions: usize,
    pub tracked_clients: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RouteSummary {
    pub name: String,
    pub prefix: String,
    pub target: String,
    pub timeout_ms: u64,
    pub requires_auth: bool,
    pub session_guarded: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionView {
    pub resource_id: String,
    pub owner: String,
    pub user_id: Option<String>,
    pub is_processing: bool,
    pub idle_secs: u64,
    pub generation: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClientLoad {
    pub client: String,
    pub in_flight: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdmissionSummary {
    pub max_concurrent: usize,
    pub clients: Vec<ClientLoad>,
}

pub async fn get_status(State(state): State<Arc<AdminState>>) -> Json<SystemStatus> {
    let routes = state
        .routes
        .routes()
        .map(|r| RouteSummary {
            name: r.name.clone(),
            prefix: r.prefix().to_string(),
            target: r.target.clone(),
            timeout_ms: r.timeout.as_millis() as u64,
            requires_auth: r.requires_auth,
            session_guarded: r.session.is_some(),
        })
        .collect();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "operational".to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        routes,
        active_sessions: state.sessions.len(),
        tracked_clients: state.admission.snapshot().len(),
    })
}

pub async fn get_sessions(State(state): State<Arc<AdminState>>) -> Json<Vec<SessionView>> {
    let now = Instant::now();
    let mut sessions: Vec<SessionView> = state
        .sessions
        .snapshot()
        .into_iter()
        .map(|lock| SessionView {
            idle_secs: lock.idle_for(now).as_secs(),
            resource_id: lock.resource_id,
            owner: lock.owner,
            user_id: lock.user_id,
            is_processing: lock.is_processing,
            generation: lock.generation,
        })
        .collect();
    sessions.sort_by(|a, b| a.resource_id.cmp(&b.resource_id));
    Json(sessions)
}

pub async fn get_admission(State(state): State<Arc<AdminState>>) -> Json<AdmissionSummary> {
    let mut clients: Vec<ClientLoad> = state
        .admission
        .snapshot()
        .into_iter()
        .map(|(client, in_flight)| ClientLoad { client, in_flight })
        .collect();
    clients.sort_by(|a, b| b.in_flight.cmp(&a.in_flight).then_with(|| a.client.cmp(&b.client)));

    Json(AdmissionSummary {
        max_concurrent: state.admission.max_concurrent(),
        clients,
    })
}
