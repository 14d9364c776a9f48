//! HTTP client for the Fuseki SPARQL 1.1 Protocol endpoints.

use crate::config::FusekiConfig;
use crate::error::{FusekiError, FusekiResult, Operation};
use reqwest::{header, Client, RequestBuilder, Response};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Query used by [`JenaClient::list_graphs`].
pub const LIST_GRAPHS_QUERY: &str =
    "SELECT DISTINCT ?g WHERE { GRAPH ?g { ?s ?p ?o } } ORDER BY ?g";

/// Acknowledgment returned for a successful update.
pub const UPDATE_ACKNOWLEDGMENT: &str = "Update successful";

const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// Client bound to a single Fuseki dataset.
///
/// Cloning is cheap: the connection pool and configuration are shared.
#[derive(Debug, Clone)]
pub struct JenaClient {
    client: Client,
    config: Arc<FusekiConfig>,
}

impl JenaClient {
    /// Create a new client with the given configuration.
    pub fn new(config: FusekiConfig) -> FusekiResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("jena-mcp/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(FusekiError::Client)?;

        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &FusekiConfig {
        &self.config
    }

    /// A client for another endpoint and/or dataset that keeps this client's
    /// credentials, timeout and connection pool.
    ///
    /// Blank overrides fall back to the configured values.
    pub fn with_overrides(&self, endpoint: Option<&str>, dataset: Option<&str>) -> FusekiResult<Self> {
        let endpoint = endpoint.filter(|s| !s.trim().is_empty());
        let dataset = dataset.filter(|s| !s.trim().is_empty());
        if endpoint.is_none() && dataset.is_none() {
            return Ok(self.clone());
        }

        let base_url = endpoint.unwrap_or_else(|| self.config.base_url.as_str());
        let dataset = dataset.unwrap_or(&self.config.dataset);
        let config = FusekiConfig::new(base_url, dataset)?
            .with_credentials(self.config.username.clone(), self.config.password.clone())
            .with_timeout(self.config.timeout);

        Ok(Self {
            client: self.client.clone(),
            config: Arc::new(config),
        })
    }

    /// Run a read-only SPARQL query and return the result document unchanged.
    ///
    /// Bodies that are not JSON (e.g. Turtle from a CONSTRUCT) come back as a
    /// JSON string.
    pub async fn execute_query(&self, query: &str) -> FusekiResult<serde_json::Value> {
        let url = self.config.service_url("query")?;
        debug!(url = %url, "SPARQL query");

        let request = self
            .client
            .get(url)
            .query(&[("query", query)])
            .header(header::ACCEPT, SPARQL_RESULTS_JSON);

        let response = self.send(Operation::Query, request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| FusekiError::from_reqwest(Operation::Query, e))?;

        Ok(serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body)))
    }

    /// Run a SPARQL update.
    pub async fn execute_update(&self, update: &str) -> FusekiResult<String> {
        let url = self.config.service_url("update")?;
        debug!(url = %url, "SPARQL update");

        // `form` sets the x-www-form-urlencoded content type.
        let request = self.client.post(url).form(&[("update", update)]);

        self.send(Operation::Update, request).await?;
        Ok(UPDATE_ACKNOWLEDGMENT.to_string())
    }

    /// Names of all named graphs in the dataset, in ascending order.
    pub async fn list_graphs(&self) -> FusekiResult<Vec<String>> {
        let result = self.execute_query(LIST_GRAPHS_QUERY).await?;
        graph_names(result)
    }

    /// Send a request once, turning non-success statuses into errors.
    async fn send(&self, operation: Operation, request: RequestBuilder) -> FusekiResult<Response> {
        let request = match (&self.config.username, &self.config.password) {
            (None, None) => request,
            (username, password) => {
                request.basic_auth(username.as_deref().unwrap_or_default(), password.as_deref())
            }
        };

        let response = request
            .send()
            .await
            .map_err(|e| FusekiError::from_reqwest(operation, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(error = %e, %operation, "Failed to read Fuseki error body");
                format!("<unreadable response body: {}>", e)
            }
        };
        debug!(status = status.as_u16(), %operation, "Fuseki returned an error");
        Err(FusekiError::from_response(operation, status.as_u16(), &body))
    }
}

#[derive(Debug, Deserialize)]
struct SelectResults {
    results: Bindings,
}

#[derive(Debug, Deserialize)]
struct Bindings {
    bindings: Vec<HashMap<String, RdfTerm>>,
}

#[derive(Debug, Deserialize)]
struct RdfTerm {
    value: String,
}

fn graph_names(result: serde_json::Value) -> FusekiResult<Vec<String>> {
    let parsed: SelectResults =
        serde_json::from_value(result).map_err(|e| FusekiError::UnexpectedResult {
            operation: Operation::Query,
            message: e.to_string(),
        })?;

    parsed
        .results
        .bindings
        .into_iter()
        .map(|mut row| {
            row.remove("g")
                .map(|term| term.value)
                .ok_or_else(|| FusekiError::UnexpectedResult {
                    operation: Operation::Query,
                    message: "binding without ?g".to_string(),
                })
        })
        .collect()
}
