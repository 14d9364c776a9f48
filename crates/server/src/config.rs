use crate::session::SessionManager;
use anyhow::{Context, Result};
use jena_fuseki::{FusekiConfig, JenaClient, DEFAULT_DATASET, DEFAULT_FUSEKI_URL, DEFAULT_TIMEOUT};
use jena_mcp::{fuseki_registry, McpServer};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 1800;
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

/// Settings that may come from the command line or the environment.
/// Anything left unset falls back to the config file, then to defaults.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct Overrides {
    /// Base URL of the Fuseki server
    #[arg(long, env = "FUSEKI_URL")]
    pub fuseki_url: Option<String>,

    /// Dataset to query
    #[arg(long, env = "DEFAULT_DATASET")]
    pub dataset: Option<String>,

    /// Basic-auth username for Fuseki
    #[arg(long, env = "JENA_USERNAME")]
    pub username: Option<String>,

    /// Basic-auth password for Fuseki
    #[arg(long, env = "JENA_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Timeout for each Fuseki request, in seconds
    #[arg(long, env = "FUSEKI_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Host to bind to
    #[arg(long, env = "JENA_MCP_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "JENA_MCP_PORT")]
    pub port: Option<u16>,

    /// Run without sessions (no Mcp-Session-Id is issued or required)
    #[arg(long, env = "JENA_MCP_STATELESS")]
    pub stateless: bool,

    /// Always answer with application/json, never text/event-stream
    #[arg(long, env = "JENA_MCP_JSON_RESPONSE")]
    pub json_response: bool,

    /// Seconds a session may stay unused before it is dropped
    #[arg(long, env = "JENA_MCP_SESSION_IDLE_SECS")]
    pub session_idle_secs: Option<u64>,

    /// Maximum number of concurrent sessions
    #[arg(long, env = "JENA_MCP_MAX_SESSIONS")]
    pub max_sessions: Option<usize>,
}

/// On-disk configuration (TOML).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub fuseki: FusekiSection,

    #[serde(default)]
    pub server: ServerSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FusekiSection {
    pub url: Option<String>,
    pub dataset: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub stateless: Option<bool>,
    pub json_response: Option<bool>,
    pub session_idle_secs: Option<u64>,
    pub max_sessions: Option<usize>,
}

impl FileConfig {
    /// Load the config file if it exists, otherwise use defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("Configuration file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file {}", path.display()))
    }
}

/// Fully resolved launcher configuration. Immutable once built.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub stateless: bool,
    pub json_response: bool,
    pub session_idle_timeout: Duration,
    pub max_sessions: usize,
    pub fuseki: FusekiConfig,
}

impl ServerConfig {
    pub fn load(config_path: &Path, overrides: Overrides) -> Result<Self> {
        let file = FileConfig::load(config_path)?;
        Self::resolve(overrides, file)
    }

    /// Merge command line/environment over the file over defaults.
    pub fn resolve(overrides: Overrides, file: FileConfig) -> Result<Self> {
        let Overrides {
            fuseki_url,
            dataset,
            username,
            password,
            timeout_secs,
            host,
            port,
            stateless,
            json_response,
            session_idle_secs,
            max_sessions,
        } = overrides;
        let FileConfig {
            fuseki: file_fuseki,
            server: file_server,
        } = file;

        let url = fuseki_url
            .or(file_fuseki.url)
            .unwrap_or_else(|| DEFAULT_FUSEKI_URL.to_string());
        let dataset = dataset
            .or(file_fuseki.dataset)
            .unwrap_or_else(|| DEFAULT_DATASET.to_string());
        let timeout = timeout_secs
            .or(file_fuseki.timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            anyhow::bail!("Fuseki timeout must be greater than zero");
        }

        let session_idle_secs = session_idle_secs
            .or(file_server.session_idle_secs)
            .unwrap_or(DEFAULT_SESSION_IDLE_SECS);
        if session_idle_secs == 0 {
            anyhow::bail!("Session idle timeout must be greater than zero");
        }
        let max_sessions = max_sessions
            .or(file_server.max_sessions)
            .unwrap_or(DEFAULT_MAX_SESSIONS);
        if max_sessions == 0 {
            anyhow::bail!("Session limit must be greater than zero");
        }

        let fuseki = FusekiConfig::new(&url, &dataset)
            .with_context(|| format!("Invalid Fuseki endpoint {}", url))?
            .with_credentials(username.or(file_fuseki.username), password.or(file_fuseki.password))
            .with_timeout(timeout);

        Ok(Self {
            host: host
                .or(file_server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: port.or(file_server.port).unwrap_or(DEFAULT_PORT),
            stateless: stateless || file_server.stateless.unwrap_or(false),
            json_response: json_response || file_server.json_response.unwrap_or(false),
            session_idle_timeout: Duration::from_secs(session_idle_secs),
            max_sessions,
            fuseki,
        })
    }

    /// Address to bind the HTTP listener to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub mcp: Arc<McpServer>,
    pub sessions: Arc<SessionManager>,
    pub stateless: bool,
    pub json_response: bool,
    pub dataset: String,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let client = JenaClient::new(config.fuseki.clone()).context("Failed to create Fuseki client")?;
        let registry = fuseki_registry(client);
        tracing::info!("Registered {} tools", registry.len());

        Ok(Self {
            mcp: Arc::new(McpServer::new(registry)),
            sessions: Arc::new(SessionManager::new(
                config.session_idle_timeout,
                config.max_sessions,
            )),
            stateless: config.stateless,
            json_response: config.json_response,
            dataset: config.fuseki.dataset.clone(),
        })
    }
}
