//! Endpoint configuration for the Fuseki client.

use crate::error::{FusekiError, FusekiResult};
use std::time::Duration;
use url::Url;

/// Base URL used when nothing else is configured.
pub const DEFAULT_FUSEKI_URL: &str = "http://localhost:3030";

/// Dataset used when nothing else is configured.
pub const DEFAULT_DATASET: &str = "ontoFD";

/// Per-request timeout used when nothing else is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where and how to reach a Fuseki dataset.
#[derive(Clone)]
pub struct FusekiConfig {
    /// Base URL of the Fuseki server, e.g. `http://localhost:3030`.
    pub base_url: Url,
    /// Dataset name, without leading slash.
    pub dataset: String,
    /// Basic-auth username.
    pub username: Option<String>,
    /// Basic-auth password.
    pub password: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
}

impl FusekiConfig {
    /// Create a configuration for `dataset` on the server at `base_url`.
    pub fn new(base_url: &str, dataset: &str) -> FusekiResult<Self> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            dataset: normalize_dataset(dataset)?,
            username: None,
            password: None,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Attach basic-auth credentials. Either half may be absent.
    pub fn with_credentials(mut self, username: Option<String>, password: Option<String>) -> Self {
        self.username = username.filter(|u| !u.is_empty());
        self.password = password.filter(|p| !p.is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether requests should carry an `Authorization: Basic` header.
    pub fn has_credentials(&self) -> bool {
        self.username.is_some() || self.password.is_some()
    }

    /// URL of a dataset service, e.g. `query` or `update`.
    pub fn service_url(&self, service: &str) -> FusekiResult<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{}/{}/{}", base, self.dataset, service))?)
    }
}

// Keep the password out of logs.
impl std::fmt::Debug for FusekiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FusekiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("dataset", &self.dataset)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn parse_base_url(raw: &str) -> FusekiResult<Url> {
    let url = Url::parse(raw.trim())?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(FusekiError::Config(format!(
                "Fuseki URL must use http or https, got: {}",
                other
            )))
        }
    }
    if url.host_str().is_none() {
        return Err(FusekiError::Config(format!("Fuseki URL has no host: {}", raw)));
    }
    Ok(url)
}

fn normalize_dataset(raw: &str) -> FusekiResult<String> {
    let dataset = raw.trim().trim_matches('/');
    if dataset.is_empty() {
        return Err(FusekiError::Config("Dataset name must not be empty".to_string()));
    }
    Ok(dataset.to_string())
}
