//! # Jena Fuseki client
//!
//! Thin async client for the SPARQL 1.1 Protocol endpoints exposed by an
//! Apache Jena Fuseki dataset.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use jena_fuseki::{FusekiConfig, FusekiResult, JenaClient};
//!
//! #[tokio::main]
//! async fn main() -> FusekiResult<()> {
//!     let config = FusekiConfig::new("http://localhost:3030", "ontoFD")?
//!         .with_credentials(Some("admin".into()), Some("secret".into()));
//!     let client = JenaClient::new(config)?;
//!
//!     let rows = client
//!         .execute_query("SELECT ?s WHERE { ?s ?p ?o } LIMIT 1")
//!         .await?;
//!     println!("{}", rows);
//!
//!     for graph in client.list_graphs().await? {
//!         println!("graph: {}", graph);
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;

pub use client::{JenaClient, LIST_GRAPHS_QUERY, UPDATE_ACKNOWLEDGMENT};
pub use config::{FusekiConfig, DEFAULT_DATASET, DEFAULT_FUSEKI_URL, DEFAULT_TIMEOUT};
pub use error::{FusekiError, FusekiResult, Operation};
