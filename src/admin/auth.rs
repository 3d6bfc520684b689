//! Bearer key check for the admin API.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::AdminState;
use crate::http::response::GatewayError;
use crate::security::auth::bearer_token;

pub async fn admin_auth_middleware(
    State(state): State<Arc<AdminState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let authorized = matches!(bearer_token(request.headers()), Some(key) if key == state.api_key);
    if !authorized {
        tracing::warn!(path = %request.uri().path(), "Rejected admin request");
        return GatewayError::Unauthorized("missing or invalid admin key".into()).into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::time::{Duration, Instant};

    use tokio::net::TcpListener;

    use super::*;
    use crate::admin::setup_admin_router;
    use crate::http::ErrorBody;
    use crate::routing::RouteTable;
    use crate::security::AdmissionController;
    use crate::session::SessionExclusivityManager;

    async fn serve_admin() -> SocketAddr {
        let state = Arc::new(AdminState {
            api_key: "admin-key".into(),
            routes: Arc::new(RouteTable::new(Vec::new()).unwrap()),
            admission: Arc::new(AdmissionController::new(10)),
            sessions: SessionExclusivityManager::new(Duration::from_secs(60)),
            started_at: Instant::now(),
        });
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = setup_admin_router(state);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        addr
    }

    #[tokio::test]
    async fn rejections_use_the_error_envelope() {
        let addr = serve_admin().await;
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        let url = format!("http://{addr}/admin/status");

        let res = client.get(&url).send().await.unwrap();
        assert_eq!(res.status(), 401);
        let body: ErrorBody = res.json().await.unwrap();
        assert_eq!(body.error, "unauthorized");

        let res = client.get(&url).bearer_auth("guess").send().await.unwrap();
        assert_eq!(res.status(), 401);
        let body: ErrorBody = res.json().await.unwrap();
        assert_eq!(body.error, "unauthorized");
        assert!(!body.message.contains("admin-key"));

        let res = client.get(&url).bearer_auth("admin-key").send().await.unwrap();
        assert_eq!(res.status(), 200);
    }
}
