pub mod sparql;
pub mod templates;
mod registry;

pub use registry::{json_schema_object, json_schema_string, Tool, ToolRegistry};
pub use sparql::{ListGraphsTool, SparqlQueryTool, SparqlUpdateTool};
pub use templates::QueryTemplatesTool;

use jena_fuseki::JenaClient;
use std::sync::Arc;

/// Registry holding the four Fuseki tools.
pub fn fuseki_registry(client: JenaClient) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(SparqlQueryTool::new(client.clone())));
    registry.register(Arc::new(SparqlUpdateTool::new(client.clone())));
    registry.register(Arc::new(ListGraphsTool::new(client)));
    registry.register(Arc::new(QueryTemplatesTool));
    registry
}
