use crate::config::{AppState, ServerConfig};
use anyhow::Result;
use axum::{
    http::{header::HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use jena_mcp::protocol::{JsonRpcError, JsonRpcResponse};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

mod handlers;

/// Start the HTTP server and run until Ctrl-C or SIGTERM
pub async fn serve(config: ServerConfig) -> Result<()> {
    let state = AppState::new(&config)?;

    let sweeper = (!config.stateless).then(|| {
        tracing::info!(
            idle_secs = state.sessions.idle_timeout().as_secs(),
            max_sessions = config.max_sessions,
            "Session expiry enabled"
        );
        state.sessions.spawn_sweeper()
    });
    let app = create_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        "MCP endpoint listening on http://{}/mcp (stateless: {})",
        addr,
        config.stateless
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    served?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Create the router
fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/mcp",
            post(handlers::mcp_post)
                .get(handlers::mcp_get)
                .delete(handlers::mcp_delete),
        )
        .route("/health", get(handlers::health_check))
        // Middleware
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new())
                .on_response(DefaultOnResponse::new()),
        )
        .layer(CorsLayer::permissive().expose_headers([HeaderName::from_static(
            crate::session::MCP_SESSION_ID_HEADER,
        )]))
        .with_state(Arc::new(state))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to listen for SIGTERM: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

/// Transport-level failure, reported as a JSON-RPC error body with a null id
#[derive(Debug)]
pub struct McpHttpError {
    status: StatusCode,
    error: JsonRpcError,
}

impl McpHttpError {
    pub fn bad_request(error: JsonRpcError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error: JsonRpcError::invalid_request(message),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            error: JsonRpcError::internal_error(message),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: JsonRpcError::internal_error(message),
        }
    }
}

impl IntoResponse for McpHttpError {
    fn into_response(self) -> Response {
        tracing::debug!(status = %self.status, message = %self.error.message, "Rejected MCP request");
        (
            self.status,
            Json(JsonRpcResponse::error(serde_json::Value::Null, self.error)),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FileConfig, Overrides};
    use crate::session::MCP_SESSION_ID_HEADER;
    use axum::body::Body;
    use axum::http::{header, Request};
    use tower::ServiceExt;

    const ACCEPT_BOTH: &str = "application/json, text/event-stream";

    fn test_router(stateless: bool, json_response: bool) -> (Router, AppState) {
        router_with(Overrides {
            stateless,
            json_response,
            ..Default::default()
        })
    }

    fn router_with(overrides: Overrides) -> (Router, AppState) {
        let overrides = Overrides {
            // Port 1 is never reachable; these tests only use the templates tool.
            fuseki_url: Some("http://127.0.0.1:1".to_string()),
            dataset: Some("test".to_string()),
            ..overrides
        };
        let config = ServerConfig::resolve(overrides, FileConfig::default()).unwrap();
        let state = AppState::new(&config).unwrap();
        (create_router(state.clone()), state)
    }

    fn post_mcp(body: serde_json::Value, accept: &str, session: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/mcp")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, accept);
        if let Some(session) = session {
            builder = builder.header(MCP_SESSION_ID_HEADER, session);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn initialize_body() -> serde_json::Value {
        serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2025-03-26",
                "capabilities": {},
                "clientInfo": { "name": "test", "version": "0.0.1" }
            }
        })
    }

    fn templates_call(id: i64) -> serde_json::Value {
        serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": { "name": "sparql_query_templates", "arguments": {} }
        })
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = test_router(false, true);
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["stateless"], false);
        assert_eq!(body["dataset"], "test");
    }

    #[tokio::test]
    async fn test_stateful_initialize_issues_session() {
        let (app, state) = test_router(false, true);
        let response = app
            .oneshot(post_mcp(initialize_body(), ACCEPT_BOTH, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let session_id = response
            .headers()
            .get(MCP_SESSION_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(state.sessions.get(&session_id).await.is_some());

        let body = body_json(response).await;
        assert_eq!(body["result"]["protocolVersion"], "2025-03-26");
    }

    #[tokio::test]
    async fn test_stateful_session_round_trip() {
        let (app, _) = test_router(false, true);
        let response = app
            .clone()
            .oneshot(post_mcp(initialize_body(), ACCEPT_BOTH, None))
            .await
            .unwrap();
        let session_id = response.headers()[MCP_SESSION_ID_HEADER]
            .to_str()
            .unwrap()
            .to_string();

        let response = app
            .oneshot(post_mcp(templates_call(2), ACCEPT_BOTH, Some(session_id.as_str())))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["id"], 2);
        assert_eq!(body["result"]["structuredContent"]["status"], "success");
    }

    #[tokio::test]
    async fn test_stateful_requires_session_header() {
        let (app, _) = test_router(false, true);
        let response = app
            .oneshot(post_mcp(templates_call(2), ACCEPT_BOTH, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], JsonRpcError::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_stateful_unknown_session() {
        let (app, _) = test_router(false, true);
        let response = app
            .oneshot(post_mcp(templates_call(2), ACCEPT_BOTH, Some("no-such-session")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_stateless_issues_no_session_ids() {
        let (app, state) = test_router(true, true);

        let first = app
            .clone()
            .oneshot(post_mcp(initialize_body(), ACCEPT_BOTH, None))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert!(first.headers().get(MCP_SESSION_ID_HEADER).is_none());

        let second = app
            .oneshot(post_mcp(templates_call(2), ACCEPT_BOTH, None))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::OK);
        assert!(second.headers().get(MCP_SESSION_ID_HEADER).is_none());

        assert_eq!(state.sessions.len().await, 0);
    }

    #[tokio::test]
    async fn test_sse_response() {
        let (app, _) = test_router(true, false);
        let response = app
            .oneshot(post_mcp(templates_call(5), ACCEPT_BOTH, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream"));

        let text = body_text(response).await;
        assert!(text.contains("event: message"));
        let data = text
            .lines()
            .find_map(|line| line.strip_prefix("data: "))
            .unwrap();
        let message: serde_json::Value = serde_json::from_str(data).unwrap();
        assert_eq!(message["id"], 5);
    }

    #[tokio::test]
    async fn test_json_when_client_only_accepts_json() {
        let (app, _) = test_router(true, false);
        let response = app
            .oneshot(post_mcp(templates_call(5), "application/json", None))
            .await
            .unwrap();

        assert_eq!(
            response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_notification_accepted() {
        let (app, _) = test_router(true, true);
        let response = app
            .oneshot(post_mcp(
                serde_json::json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
                ACCEPT_BOTH,
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert!(body_text(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_client_response_accepted() {
        let (app, _) = test_router(true, true);
        let response = app
            .oneshot(post_mcp(
                serde_json::json!({"jsonrpc": "2.0", "id": 9, "result": {}}),
                ACCEPT_BOTH,
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let (app, _) = test_router(true, true);
        let request = Request::builder()
            .method("POST")
            .uri("/mcp")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], JsonRpcError::PARSE_ERROR);
        assert!(body["id"].is_null());
    }

    #[tokio::test]
    async fn test_batch_rejected() {
        let (app, _) = test_router(true, true);
        let response = app
            .oneshot(post_mcp(serde_json::json!([templates_call(1)]), ACCEPT_BOTH, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_not_allowed() {
        let (app, _) = test_router(false, true);
        let response = app
            .oneshot(Request::builder().uri("/mcp").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_delete_terminates_session() {
        let (app, state) = test_router(false, true);
        let session = state.sessions.create("2025-03-26").await.unwrap();

        let delete = || {
            Request::builder()
                .method("DELETE")
                .uri("/mcp")
                .header(MCP_SESSION_ID_HEADER, session.id.as_str())
                .body(Body::empty())
                .unwrap()
        };

        let response = app.clone().oneshot(delete()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(state.sessions.get(&session.id).await.is_none());

        let response = app.oneshot(delete()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_in_stateless_mode() {
        let (app, _) = test_router(true, true);
        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/mcp")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_initialize_beyond_session_limit() {
        let (app, state) = router_with(Overrides {
            max_sessions: Some(3),
            ..Default::default()
        });

        for _ in 0..3 {
            let response = app
                .clone()
                .oneshot(post_mcp(initialize_body(), ACCEPT_BOTH, None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .oneshot(post_mcp(initialize_body(), ACCEPT_BOTH, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.headers().get(MCP_SESSION_ID_HEADER).is_none());
        assert_eq!(state.sessions.len().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_session_expires() {
        let (app, state) = router_with(Overrides {
            session_idle_secs: Some(60),
            ..Default::default()
        });
        let session = state.sessions.create("2025-03-26").await.unwrap();

        let response = app
            .clone()
            .oneshot(post_mcp(templates_call(1), ACCEPT_BOTH, Some(session.id.as_str())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        tokio::time::advance(std::time::Duration::from_secs(61)).await;

        let response = app
            .oneshot(post_mcp(templates_call(2), ACCEPT_BOTH, Some(session.id.as_str())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(state.sessions.len().await, 0);
    }

    #[tokio::test]
    async fn test_null_id_is_answered_not_accepted() {
        let (app, _) = test_router(true, true);
        let response = app
            .oneshot(post_mcp(
                serde_json::json!({"jsonrpc": "2.0", "id": null, "method": "ping"}),
                ACCEPT_BOTH,
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], JsonRpcError::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn test_protocol_version_mismatch() {
        let (app, state) = test_router(false, true);
        let session = state.sessions.create("2025-03-26").await.unwrap();

        let mut request = post_mcp(templates_call(3), ACCEPT_BOTH, Some(session.id.as_str()));
        request
            .headers_mut()
            .insert("mcp-protocol-version", "2024-11-05".parse().unwrap());

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
