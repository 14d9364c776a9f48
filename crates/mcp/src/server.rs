// MCP server: JSON-RPC dispatch over the tool registry, independent of transport

use crate::protocol::{
    negotiate_protocol_version, CallToolParams, CallToolResult, InitializeParams,
    InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, ListToolsResult,
    ServerCapabilities, ServerInfo, ToolsCapability,
};
use crate::tools::ToolRegistry;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const SERVER_NAME: &str = "Jena MCP Connector";

const INSTRUCTIONS: &str = "Tools for an Apache Jena Fuseki SPARQL endpoint. \
Use sparql_query_templates for example queries, list_graphs to discover named graphs, \
execute_sparql_query for SELECT/ASK/CONSTRUCT/DESCRIBE and execute_sparql_update for changes.";

pub struct McpServer {
    registry: ToolRegistry,
    info: ServerInfo,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    /// Handle one JSON-RPC message. Notifications yield no response.
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id.clone() else {
            tracing::debug!(method = %request.method, "Notification received");
            return None;
        };
        if id.is_null() {
            return Some(JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request("Request id must not be null"),
            ));
        }

        let response = match self.dispatch(&request).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => {
                tracing::debug!(method = %request.method, code = error.code, "Request failed");
                JsonRpcResponse::error(id, error)
            }
        };
        Some(response)
    }

    async fn dispatch(&self, request: &JsonRpcRequest) -> Result<serde_json::Value, JsonRpcError> {
        if request.jsonrpc != "2.0" {
            return Err(JsonRpcError::invalid_request("jsonrpc must be \"2.0\""));
        }

        match request.method.as_str() {
            "initialize" => to_result(self.initialize(parse_params(request)?)),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => to_result(ListToolsResult {
                tools: self.registry.list_schemas(),
            }),
            "tools/call" => to_result(self.call_tool(parse_params(request)?).await?),
            other => Err(JsonRpcError::method_not_found(other)),
        }
    }

    fn initialize(&self, params: InitializeParams) -> InitializeResult {
        let protocol_version = negotiate_protocol_version(&params.protocol_version);
        tracing::info!(
            client = params.client_info.as_ref().map(|c| c.name.as_str()).unwrap_or("unknown"),
            requested = %params.protocol_version,
            negotiated = protocol_version,
            "Client initialized"
        );

        InitializeResult {
            protocol_version: protocol_version.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: self.info.clone(),
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }

    async fn call_tool(&self, params: CallToolParams) -> Result<CallToolResult, JsonRpcError> {
        let tool = self
            .registry
            .get(&params.name)
            .ok_or_else(|| JsonRpcError::invalid_params(format!("Unknown tool: {}", params.name)))?;

        tracing::info!(tool = %params.name, "Tool call");
        match tool.execute(params.arguments).await {
            Ok(result) => Ok(result),
            Err(e) => {
                tracing::warn!(tool = %params.name, error = %e, "Tool call rejected");
                Ok(CallToolResult::error(format!("{:#}", e)))
            }
        }
    }
}

fn parse_params<T: DeserializeOwned>(request: &JsonRpcRequest) -> Result<T, JsonRpcError> {
    let params = request
        .params
        .clone()
        .ok_or_else(|| JsonRpcError::invalid_params(format!("{} requires params", request.method)))?;
    serde_json::from_value(params)
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params for {}: {}", request.method, e)))
}

fn to_result(value: impl Serialize) -> Result<serde_json::Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal_error(e.to_string()))
}
