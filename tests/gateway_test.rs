//! Routing, rewriting and header handling through a live gateway.

use serde_json::Value;

use session_gateway::config::{RewriteConfig, TokenConfig};
use session_gateway::http::ErrorBody;

mod common;

#[tokio::test]
async fn unknown_route_is_404_without_backend_call() {
    let (backend, log) = common::start_echo_backend().await;
    let mut config = common::test_config();
    config
        .routes
        .push(common::route("users", "/api/user-service/users", backend));
    let gw = common::start_gateway(config).await;

    let res = common::client()
        .get(gw.url("/api/unknown-service/x"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 404);
    let body: ErrorBody = res.json().await.unwrap();
    assert_eq!(body.error, "route_not_found");
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn rewrites_path_and_filters_headers() {
    let (backend, log) = common::start_echo_backend().await;
    let mut config = common::test_config();
    let mut route = common::route("chats", "/api/chat-service/chats", backend);
    route.rewrite = Some(RewriteConfig {
        from: "/api/chat-service".into(),
        to: "/api".into(),
    });
    config.routes.push(route);
    config.upstream.strip_headers = vec!["x-debug".into()];
    let gw = common::start_gateway(config).await;

    let res = common::client()
        .get(gw.url("/api/chat-service/chats/42?page=2"))
        .header("x-gateway-secret", "internal")
        .header("x-debug", "1")
        .header("x-custom", "kept")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    let gateway_request_id = res
        .headers()
        .get("x-request-id")
        .map(|v| v.to_str().unwrap().to_string())
        .expect("request id echoed");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["path"], "/api/chats/42?page=2");

    let captured = log.lock().unwrap()[0].clone();
    assert_eq!(captured.path_and_query, "/api/chats/42?page=2");
    assert!(captured.headers.get("x-gateway-secret").is_none());
    assert!(captured.headers.get("x-debug").is_none());
    assert_eq!(captured.headers.get("x-custom").unwrap(), "kept");
    assert_eq!(captured.headers.get("x-forwarded-for").unwrap(), "127.0.0.1");
    assert_eq!(
        captured.headers.get("x-forwarded-host").unwrap(),
        gw.addr.to_string().as_str()
    );
    // Host names the backend, never the gateway.
    assert_eq!(
        captured.headers.get("host").unwrap(),
        backend.to_string().as_str()
    );
    assert_eq!(
        captured.headers.get("x-request-id").unwrap(),
        gateway_request_id.as_str()
    );
}

#[tokio::test]
async fn longest_prefix_wins() {
    let (general, general_log) = common::start_echo_backend().await;
    let (auth, auth_log) = common::start_echo_backend().await;
    let mut config = common::test_config();
    config
        .routes
        .push(common::route("user-service", "/api/user-service", general));
    config
        .routes
        .push(common::route("auth", "/api/user-service/auth", auth));
    let gw = common::start_gateway(config).await;
    let client = common::client();

    let res = client
        .post(gw.url("/api/user-service/auth/login"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let res = client
        .get(gw.url("/api/user-service/authors"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    assert_eq!(auth_log.lock().unwrap().len(), 1);
    assert_eq!(general_log.lock().unwrap().len(), 1);
    assert_eq!(
        general_log.lock().unwrap()[0].path_and_query,
        "/api/user-service/authors"
    );
}

#[tokio::test]
async fn backend_errors_pass_through_unchanged() {
    let (backend, _log) = common::start_echo_backend().await;
    let mut config = common::test_config();
    config
        .routes
        .push(common::route("users", "/api/user-service/users", backend));
    let gw = common::start_gateway(config).await;

    let res = common::client()
        .post(gw.url("/api/user-service/users"))
        .header("x-test-status", "400")
        .body("{}")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["method"], "POST");
    assert_eq!(body["body_len"], 2);
}

#[tokio::test]
async fn protected_route_requires_token() {
    let (backend, log) = common::start_echo_backend().await;
    let mut config = common::test_config();
    let mut route = common::route("settings", "/api/user-service/settings", backend);
    route.requires_auth = true;
    config.routes.push(route);
    config.auth.tokens.push(TokenConfig {
        token: "good-token".into(),
        user_id: "user-1".into(),
    });
    let gw = common::start_gateway(config).await;
    let client = common::client();

    let res = client
        .get(gw.url("/api/user-service/settings"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);
    let body: ErrorBody = res.json().await.unwrap();
    assert_eq!(body.error, "unauthorized");
    assert!(log.lock().unwrap().is_empty());

    let res = client
        .get(gw.url("/api/user-service/settings"))
        .bearer_auth("good-token")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(
        log.lock().unwrap()[0].headers.get("authorization").unwrap(),
        "Bearer good-token"
    );
}

#[tokio::test]
async fn health_is_served_locally() {
    let gw = common::start_gateway(common::test_config()).await;
    let res = common::client().get(gw.url("/health")).send().await.unwrap();

    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "session-gateway");
}
