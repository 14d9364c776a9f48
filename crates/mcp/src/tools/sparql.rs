// SPARQL tools forwarding to a Fuseki dataset

use crate::protocol::{CallToolResult, ToolAnnotations, ToolSchema};
use crate::tools::{json_schema_object, json_schema_string, Tool};
use anyhow::{Context, Result};
use jena_fuseki::{FusekiResult, JenaClient};
use serde::Deserialize;

/// Optional per-call endpoint overrides shared by the SPARQL tools.
#[derive(Debug, Deserialize)]
struct Target {
    #[serde(default)]
    dataset: Option<String>,
    #[serde(default)]
    endpoint: Option<String>,
}

impl Target {
    fn resolve(&self, client: &JenaClient) -> FusekiResult<JenaClient> {
        client.with_overrides(self.endpoint.as_deref(), self.dataset.as_deref())
    }
}

fn target_properties() -> [(&'static str, serde_json::Value); 2] {
    [
        ("dataset", json_schema_string("Dataset name (overrides the configured dataset)")),
        ("endpoint", json_schema_string("Fuseki base URL (overrides the configured URL)")),
    ]
}

fn with_target_properties(mut properties: serde_json::Value) -> serde_json::Value {
    if let Some(map) = properties.as_object_mut() {
        for (name, schema) in target_properties() {
            map.insert(name.to_string(), schema);
        }
    }
    properties
}

/// Tool to run a read-only SPARQL query
pub struct SparqlQueryTool {
    client: JenaClient,
}

impl SparqlQueryTool {
    pub fn new(client: JenaClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct SparqlQueryArgs {
    query: String,
    #[serde(flatten)]
    target: Target,
}

#[async_trait::async_trait]
impl Tool for SparqlQueryTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "execute_sparql_query".to_string(),
            description: format!(
                "Execute a SPARQL query against the Fuseki dataset '{}' and return the SPARQL JSON results",
                self.client.config().dataset
            ),
            input_schema: json_schema_object(
                with_target_properties(serde_json::json!({
                    "query": json_schema_string("SPARQL query to execute")
                })),
                vec!["query"],
            ),
            annotations: Some(ToolAnnotations {
                title: Some("Execute SPARQL query".to_string()),
                read_only_hint: Some(true),
                ..Default::default()
            }),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: SparqlQueryArgs = serde_json::from_value(arguments)
            .context("Invalid arguments for execute_sparql_query")?;

        let result = match args.target.resolve(&self.client) {
            Ok(client) => client.execute_query(&args.query).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(data) => Ok(CallToolResult::json(serde_json::json!({
                "status": "success",
                "data": data,
            }))),
            Err(e) => {
                tracing::warn!(error = %e, "SPARQL query failed");
                Ok(CallToolResult::error(e.to_string()))
            }
        }
    }
}

/// Tool to run a SPARQL update
pub struct SparqlUpdateTool {
    client: JenaClient,
}

impl SparqlUpdateTool {
    pub fn new(client: JenaClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct SparqlUpdateArgs {
    update: String,
    #[serde(flatten)]
    target: Target,
}

#[async_trait::async_trait]
impl Tool for SparqlUpdateTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "execute_sparql_update".to_string(),
            description: format!(
                "Execute a SPARQL update (INSERT, DELETE, LOAD, CLEAR, ...) against the Fuseki dataset '{}'",
                self.client.config().dataset
            ),
            input_schema: json_schema_object(
                with_target_properties(serde_json::json!({
                    "update": json_schema_string("SPARQL update to execute")
                })),
                vec!["update"],
            ),
            annotations: Some(ToolAnnotations {
                title: Some("Execute SPARQL update".to_string()),
                read_only_hint: Some(false),
                destructive_hint: Some(true),
                ..Default::default()
            }),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: SparqlUpdateArgs = serde_json::from_value(arguments)
            .context("Invalid arguments for execute_sparql_update")?;

        let result = match args.target.resolve(&self.client) {
            Ok(client) => client.execute_update(&args.update).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(message) => Ok(CallToolResult::json(serde_json::json!({
                "status": "success",
                "message": message,
            }))),
            Err(e) => {
                tracing::warn!(error = %e, "SPARQL update failed");
                Ok(CallToolResult::error(e.to_string()))
            }
        }
    }
}

/// Tool to list the named graphs of a dataset
pub struct ListGraphsTool {
    client: JenaClient,
}

impl ListGraphsTool {
    pub fn new(client: JenaClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Tool for ListGraphsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "list_graphs".to_string(),
            description: "List the named graphs of the Fuseki dataset".to_string(),
            input_schema: json_schema_object(with_target_properties(serde_json::json!({})), vec![]),
            annotations: Some(ToolAnnotations {
                title: Some("List named graphs".to_string()),
                read_only_hint: Some(true),
                ..Default::default()
            }),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let target: Target =
            serde_json::from_value(arguments).context("Invalid arguments for list_graphs")?;

        let result = match target.resolve(&self.client) {
            Ok(client) => client.list_graphs().await,
            Err(e) => Err(e),
        };

        match result {
            Ok(graphs) => Ok(CallToolResult::json(serde_json::json!({
                "status": "success",
                "graphs": graphs,
            }))),
            Err(e) => {
                tracing::warn!(error = %e, "Listing graphs failed");
                Ok(CallToolResult::error(e.to_string()))
            }
        }
    }
}
