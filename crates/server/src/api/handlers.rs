use super::McpHttpError;
use crate::config::AppState;
use crate::session::MCP_SESSION_ID_HEADER;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    Json,
};
use jena_mcp::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use std::convert::Infallible;
use std::sync::Arc;

const MCP_PROTOCOL_VERSION_HEADER: &str = "mcp-protocol-version";

/// POST /mcp: one JSON-RPC message per request
pub async fn mcp_post(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, McpHttpError> {
    let payload: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!("Failed to parse JSON-RPC payload: {}", e);
        McpHttpError::bad_request(JsonRpcError::parse_error())
    })?;

    if payload.is_array() {
        return Err(McpHttpError::bad_request(JsonRpcError::invalid_request(
            "Batch requests are not supported",
        )));
    }

    let request: JsonRpcRequest = match serde_json::from_value(payload.clone()) {
        Ok(request) => request,
        // We never send requests to the client, so its responses need no routing.
        Err(_) if is_client_response(&payload) => {
            return Ok(StatusCode::ACCEPTED.into_response());
        }
        Err(_) => {
            return Err(McpHttpError::bad_request(JsonRpcError::invalid_request(
                "Body must be a JSON-RPC request, notification or response",
            )));
        }
    };

    let is_initialize = request.method == "initialize";
    if !state.stateless && !is_initialize {
        require_session(&state, &headers).await?;
    }

    let Some(response) = state.mcp.handle(request).await else {
        return Ok(StatusCode::ACCEPTED.into_response());
    };

    let new_session = if !state.stateless && is_initialize && response.error.is_none() {
        let protocol_version = response
            .result
            .as_ref()
            .and_then(|r| r.get("protocolVersion"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let session = state.sessions.create(protocol_version).await.map_err(|e| {
            McpHttpError::unavailable(format!("{}, retry after idle sessions expire", e))
        })?;
        Some(session)
    } else {
        None
    };

    let mut http_response = if wants_event_stream(&headers, state.json_response) {
        event_stream_response(&response)?
    } else {
        Json(response).into_response()
    };

    if let Some(session) = new_session {
        let value = HeaderValue::from_str(&session.id)
            .map_err(|e| McpHttpError::internal(format!("Invalid session id: {}", e)))?;
        http_response.headers_mut().insert(MCP_SESSION_ID_HEADER, value);
    }

    Ok(http_response)
}

/// GET /mcp: this server never pushes messages, so there is no stream to open
pub async fn mcp_get(State(state): State<Arc<AppState>>) -> Response {
    method_not_allowed(&state)
}

/// DELETE /mcp: terminate a session
pub async fn mcp_delete(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, McpHttpError> {
    if state.stateless {
        return Ok(method_not_allowed(&state));
    }

    let session_id = session_header(&headers)?;
    let session = state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| McpHttpError::not_found("Session not found or already terminated"))?;

    state.sessions.remove(&session.id).await;
    let age = chrono::Utc::now() - session.created_at;
    tracing::info!(session = %session.id, age_secs = age.num_seconds(), "Session terminated by client");

    Ok(StatusCode::NO_CONTENT.into_response())
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "jena-mcp",
        "version": env!("CARGO_PKG_VERSION"),
        "stateless": state.stateless,
        "dataset": state.dataset,
        "sessions": state.sessions.len().await,
    }))
}

fn method_not_allowed(state: &AppState) -> Response {
    let allow = if state.stateless { "POST" } else { "POST, DELETE" };
    (StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, allow)]).into_response()
}

fn session_header(headers: &HeaderMap) -> Result<&str, McpHttpError> {
    headers
        .get(MCP_SESSION_ID_HEADER)
        .ok_or_else(|| {
            McpHttpError::bad_request(JsonRpcError::invalid_request(
                "Mcp-Session-Id header is required",
            ))
        })?
        .to_str()
        .map_err(|_| {
            McpHttpError::bad_request(JsonRpcError::invalid_request(
                "Mcp-Session-Id header must be valid UTF-8",
            ))
        })
}

async fn require_session(state: &AppState, headers: &HeaderMap) -> Result<(), McpHttpError> {
    let session_id = session_header(headers)?;
    let session = state
        .sessions
        .touch(session_id)
        .await
        .ok_or_else(|| McpHttpError::not_found("Session not found or expired"))?;

    if let Some(requested) = headers
        .get(MCP_PROTOCOL_VERSION_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        if requested != session.protocol_version {
            return Err(McpHttpError::bad_request(JsonRpcError::invalid_request(format!(
                "Session negotiated protocol {}, but request used {}",
                session.protocol_version, requested
            ))));
        }
    }
    Ok(())
}

fn is_client_response(payload: &serde_json::Value) -> bool {
    serde_json::from_value::<JsonRpcResponse>(payload.clone())
        .map(|r| r.result.is_some() || r.error.is_some())
        .unwrap_or(false)
}

fn wants_event_stream(headers: &HeaderMap, json_response: bool) -> bool {
    if json_response {
        return false;
    }
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|accept| {
            accept
                .split(',')
                .any(|part| part.trim().starts_with("text/event-stream"))
        })
        .unwrap_or(false)
}

/// Deliver a single JSON-RPC response as a one-event SSE stream
fn event_stream_response(response: &JsonRpcResponse) -> Result<Response, McpHttpError> {
    let data = serde_json::to_string(response)
        .map_err(|e| McpHttpError::internal(format!("Failed to encode response: {}", e)))?;
    let event = Event::default().event("message").data(data);
    let stream = futures::stream::once(async move { Ok::<_, Infallible>(event) });
    Ok(Sse::new(stream).into_response())
}
