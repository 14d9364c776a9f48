// Static SPARQL query template catalogue

use crate::protocol::{CallToolResult, ToolAnnotations, ToolSchema};
use crate::tools::{json_schema_object, Tool};
use anyhow::{Context, Result};
use serde::Deserialize;

/// A reusable example query.
#[derive(Debug, Clone, Copy)]
pub struct QueryTemplate {
    pub name: &'static str,
    pub description: &'static str,
    pub query: &'static str,
}

impl QueryTemplate {
    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "query": self.query,
        })
    }
}

const fn template(name: &'static str, description: &'static str, query: &'static str) -> QueryTemplate {
    QueryTemplate {
        name,
        description,
        query,
    }
}

const EXPLORATION: &[QueryTemplate] = &[
    template(
        "sample_triples",
        "First triples of the default graph",
        "SELECT ?s ?p ?o WHERE { ?s ?p ?o } LIMIT 25",
    ),
    template(
        "distinct_classes",
        "Classes that have at least one instance",
        "SELECT DISTINCT ?class WHERE { ?s a ?class } ORDER BY ?class",
    ),
    template(
        "distinct_predicates",
        "Predicates in use",
        "SELECT DISTINCT ?p WHERE { ?s ?p ?o } ORDER BY ?p",
    ),
    template(
        "describe_resource",
        "Outgoing and incoming statements of one resource (replace the IRI)",
        "SELECT ?direction ?p ?other WHERE {\n  { BIND(\"out\" AS ?direction) <http://example.org/resource> ?p ?other }\n  UNION\n  { BIND(\"in\" AS ?direction) ?other ?p <http://example.org/resource> }\n} LIMIT 100",
    ),
    template(
        "named_graph_triples",
        "Triples with the named graph they live in",
        "SELECT ?g ?s ?p ?o WHERE { GRAPH ?g { ?s ?p ?o } } LIMIT 25",
    ),
];

const PROPERTY_PATHS: &[QueryTemplate] = &[
    template(
        "subclass_closure",
        "All transitive superclasses of a class (replace the IRI)",
        "PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>\nSELECT ?super WHERE { <http://example.org/Class> rdfs:subClassOf+ ?super }",
    ),
    template(
        "instances_with_subclasses",
        "Instances of a class or any of its subclasses",
        "PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>\nSELECT ?s WHERE { ?s a/rdfs:subClassOf* <http://example.org/Class> } LIMIT 100",
    ),
    template(
        "direct_subclasses",
        "Direct subclasses of a class through an inverse path (replace the IRI)",
        "PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>\nSELECT ?sub WHERE { <http://example.org/Class> ^rdfs:subClassOf ?sub }",
    ),
    template(
        "alternative_labels",
        "Labels from rdfs:label or skos:prefLabel",
        "PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>\nPREFIX skos: <http://www.w3.org/2004/02/skos/core#>\nSELECT ?s ?label WHERE { ?s rdfs:label|skos:prefLabel ?label } LIMIT 100",
    ),
];

const STATISTICS: &[QueryTemplate] = &[
    template(
        "count_triples",
        "Number of triples in the default graph",
        "SELECT (COUNT(*) AS ?triples) WHERE { ?s ?p ?o }",
    ),
    template(
        "instances_per_class",
        "Instance count per class",
        "SELECT ?class (COUNT(?s) AS ?instances) WHERE { ?s a ?class } GROUP BY ?class ORDER BY DESC(?instances)",
    ),
    template(
        "predicate_usage",
        "How often each predicate is used",
        "SELECT ?p (COUNT(*) AS ?uses) WHERE { ?s ?p ?o } GROUP BY ?p ORDER BY DESC(?uses)",
    ),
    template(
        "triples_per_graph",
        "Triple count per named graph",
        "SELECT ?g (COUNT(*) AS ?triples) WHERE { GRAPH ?g { ?s ?p ?o } } GROUP BY ?g ORDER BY DESC(?triples)",
    ),
];

const VALIDATION: &[QueryTemplate] = &[
    template(
        "untyped_subjects",
        "Subjects without an rdf:type",
        "SELECT DISTINCT ?s WHERE { ?s ?p ?o FILTER NOT EXISTS { ?s a ?type } } LIMIT 100",
    ),
    template(
        "missing_labels",
        "Typed resources without an rdfs:label",
        "PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>\nSELECT ?s WHERE { ?s a ?type FILTER NOT EXISTS { ?s rdfs:label ?label } } LIMIT 100",
    ),
    template(
        "multiple_labels_same_language",
        "Resources with more than one label in the same language",
        "PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>\nSELECT ?s (LANG(?label) AS ?lang) (COUNT(?label) AS ?n) WHERE { ?s rdfs:label ?label } GROUP BY ?s (LANG(?label)) HAVING (COUNT(?label) > 1)",
    ),
    template(
        "dangling_references",
        "Object IRIs that are never used as a subject",
        "SELECT DISTINCT ?o WHERE { ?s ?p ?o FILTER(isIRI(?o)) FILTER NOT EXISTS { ?o ?any ?thing } } LIMIT 100",
    ),
];

const SCHEMA: &[QueryTemplate] = &[
    template(
        "owl_classes",
        "Declared OWL and RDFS classes",
        "PREFIX owl: <http://www.w3.org/2002/07/owl#>\nPREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>\nSELECT DISTINCT ?class WHERE { { ?class a owl:Class } UNION { ?class a rdfs:Class } } ORDER BY ?class",
    ),
    template(
        "class_hierarchy",
        "Direct subclass relations",
        "PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>\nSELECT ?sub ?super WHERE { ?sub rdfs:subClassOf ?super FILTER(isIRI(?super)) } ORDER BY ?super ?sub",
    ),
    template(
        "property_domains_ranges",
        "Properties with their declared domain and range",
        "PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>\nSELECT ?property ?domain ?range WHERE { ?property rdfs:domain|rdfs:range ?any OPTIONAL { ?property rdfs:domain ?domain } OPTIONAL { ?property rdfs:range ?range } } ORDER BY ?property",
    ),
    template(
        "object_and_datatype_properties",
        "OWL object and datatype properties",
        "PREFIX owl: <http://www.w3.org/2002/07/owl#>\nSELECT ?property ?kind WHERE { VALUES ?kind { owl:ObjectProperty owl:DatatypeProperty } ?property a ?kind } ORDER BY ?kind ?property",
    ),
];

/// Every category with its templates. Results are keyed by category name, so
/// `"all"` lists categories alphabetically rather than in this order.
pub const CATALOGUE: &[(&str, &[QueryTemplate])] = &[
    ("exploration", EXPLORATION),
    ("property-paths", PROPERTY_PATHS),
    ("statistics", STATISTICS),
    ("validation", VALIDATION),
    ("schema", SCHEMA),
];

/// Category name selecting the whole catalogue.
pub const ALL_CATEGORIES: &str = "all";

#[derive(Debug, thiserror::Error)]
#[error("Unknown category '{0}' - use exploration, property-paths, statistics, validation, schema, all")]
pub struct UnknownCategory(pub String);

/// Templates for one category (or every category for `"all"`), keyed by category.
pub fn templates_for_category(category: &str) -> Result<serde_json::Value, UnknownCategory> {
    let mut selected = serde_json::Map::new();
    for (name, templates) in CATALOGUE {
        if category == ALL_CATEGORIES || category == *name {
            let templates = templates.iter().map(QueryTemplate::to_json).collect();
            selected.insert(name.to_string(), serde_json::Value::Array(templates));
        }
    }

    if selected.is_empty() {
        return Err(UnknownCategory(category.to_string()));
    }
    Ok(serde_json::Value::Object(selected))
}

/// Tool returning the template catalogue. Never touches the network.
pub struct QueryTemplatesTool;

#[derive(Debug, Deserialize)]
struct QueryTemplatesArgs {
    #[serde(default = "default_category")]
    category: String,
}

fn default_category() -> String {
    ALL_CATEGORIES.to_string()
}

#[async_trait::async_trait]
impl Tool for QueryTemplatesTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "sparql_query_templates".to_string(),
            description: "Return example SPARQL queries grouped by category".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "category": {
                        "type": "string",
                        "description": "Template category (default: all)",
                        "enum": ["exploration", "property-paths", "statistics", "validation", "schema", "all"],
                        "default": "all"
                    }
                }),
                vec![],
            ),
            annotations: Some(ToolAnnotations {
                title: Some("SPARQL query templates".to_string()),
                read_only_hint: Some(true),
                open_world_hint: Some(false),
                ..Default::default()
            }),
        }
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<CallToolResult> {
        let args: QueryTemplatesArgs = serde_json::from_value(arguments)
            .context("Invalid arguments for sparql_query_templates")?;

        match templates_for_category(&args.category) {
            Ok(templates) => Ok(CallToolResult::json(serde_json::json!({
                "status": "success",
                "templates": templates,
            }))),
            Err(e) => Ok(CallToolResult::error(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_returns_every_category() {
        let all = templates_for_category("all").unwrap();
        let all = all.as_object().unwrap();

        assert_eq!(all.len(), CATALOGUE.len());
        for (name, templates) in CATALOGUE {
            assert_eq!(all[*name].as_array().unwrap().len(), templates.len());
        }
    }

    #[test]
    fn test_all_lists_categories_alphabetically() {
        let all = templates_for_category("all").unwrap();
        let keys: Vec<&str> = all.as_object().unwrap().keys().map(String::as_str).collect();

        assert_eq!(
            keys,
            vec!["exploration", "property-paths", "schema", "statistics", "validation"]
        );
    }

    #[test]
    fn test_single_category() {
        let stats = templates_for_category("statistics").unwrap();
        let stats = stats.as_object().unwrap();

        assert_eq!(stats.len(), 1);
        assert_eq!(stats["statistics"][0]["name"], "count_triples");
    }

    #[test]
    fn test_unknown_category() {
        let err = templates_for_category("nope").unwrap_err();
        assert!(err.to_string().contains("property-paths"));
    }

    #[test]
    fn test_template_names_unique() {
        let mut names: Vec<&str> = CATALOGUE
            .iter()
            .flat_map(|(_, templates)| templates.iter().map(|t| t.name))
            .collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();

        assert_eq!(names.len(), total);
    }

    #[tokio::test]
    async fn test_tool_defaults_to_all() {
        let result = QueryTemplatesTool.execute(serde_json::json!({})).await.unwrap();

        assert!(!result.is_error());
        let structured = result.structured_content.unwrap();
        assert_eq!(structured["status"], "success");
        assert_eq!(structured["templates"], templates_for_category("all").unwrap());
    }

    #[tokio::test]
    async fn test_tool_is_stable_across_calls() {
        let first = QueryTemplatesTool.execute(serde_json::json!({})).await.unwrap();
        let second = QueryTemplatesTool.execute(serde_json::json!({})).await.unwrap();

        assert_eq!(first.structured_content, second.structured_content);
    }

    #[tokio::test]
    async fn test_tool_unknown_category_is_error_result() {
        let result = QueryTemplatesTool
            .execute(serde_json::json!({"category": "bogus"}))
            .await
            .unwrap();

        assert!(result.is_error());
        assert!(result.content[0].as_text().starts_with("Error: Unknown category"));
    }
}
