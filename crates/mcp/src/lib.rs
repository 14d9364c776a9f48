// MCP (Model Context Protocol) tool server for Apache Jena Fuseki.
// Exposes SPARQL query/update, graph listing and query templates as tools.

pub mod protocol;
pub mod server;
pub mod tools;

pub use server::McpServer;
pub use tools::{fuseki_registry, Tool, ToolRegistry};
