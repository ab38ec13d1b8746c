//! Schema Catalog
//!
//! Static, read-only directory of the relational schemas the pipeline can
//! query. Loaded once at startup and shared by every request.

mod builtin;

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Canonical form of a schema name: lowercase with spaces, hyphens and
/// underscores removed. Every lookup and authorization path goes through
/// this function.
pub fn normalize_schema_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// One column, rendered as `name (attributes)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub attributes: String,
}

impl ColumnSpec {
    pub fn new(name: &str, attributes: &str) -> Self {
        Self {
            name: name.to_string(),
            attributes: attributes.to_string(),
        }
    }
}

impl fmt::Display for ColumnSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.attributes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub name: String,
    pub description: String,
    pub columns: Vec<ColumnSpec>,
}

/// A schema as exposed to principals. `key` is the short canonical name
/// permissions and stores are registered under; `name` is the display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    pub key: String,
    pub name: String,
    pub description: String,
    pub tables: Vec<TableSpec>,
}

impl SchemaDescriptor {
    /// Prompt fragment handed to the generator. The layout is what the
    /// model sees, so changes here change generation behaviour.
    pub fn describe(&self) -> String {
        let mut text = format!("Database: {}\n", self.name);
        text.push_str(&format!("Description: {}\n\n", self.description));
        text.push_str("Tables:\n");

        for table in &self.tables {
            text.push_str(&format!("\nTable: {}\n", table.name));
            text.push_str(&format!("Description: {}\n", table.description));
            text.push_str("Columns:\n");
            for column in &table.columns {
                text.push_str(&format!("  - {}\n", column));
            }
        }

        text
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct SchemaCatalog {
    schemas: Vec<SchemaDescriptor>,
    aliases: HashMap<String, usize>,
}

impl SchemaCatalog {
    pub fn new(schemas: Vec<SchemaDescriptor>) -> Result<Self> {
        let mut aliases: HashMap<String, usize> = HashMap::new();
        for (idx, schema) in schemas.iter().enumerate() {
            for alias in [normalize_schema_name(&schema.key), normalize_schema_name(&schema.name)] {
                if let Some(&other) = aliases.get(&alias) {
                    if other != idx {
                        return Err(PipelineError::Config(format!(
                            "Schema name '{}' is ambiguous between '{}' and '{}'",
                            alias, schemas[other].name, schema.name
                        )));
                    }
                }
                aliases.insert(alias, idx);
            }
        }

        Ok(Self { schemas, aliases })
    }

    /// The three sample schemas shipped with the gateway.
    pub fn builtin() -> Self {
        let schemas = builtin::schemas();
        let aliases = schemas
            .iter()
            .enumerate()
            .flat_map(|(idx, s)| {
                [
                    (normalize_schema_name(&s.key), idx),
                    (normalize_schema_name(&s.name), idx),
                ]
            })
            .collect();
        Self { schemas, aliases }
    }

    /// Load a catalog from a JSON array of schema descriptors.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let schemas: Vec<SchemaDescriptor> = serde_json::from_str(json)?;
        Self::new(schemas)
    }

    /// Resolve any accepted spelling of a schema name.
    pub fn resolve(&self, name: &str) -> Result<&SchemaDescriptor> {
        self.aliases
            .get(&normalize_schema_name(name))
            .map(|&idx| &self.schemas[idx])
            .ok_or_else(|| PipelineError::SchemaNotFound(name.to_string()))
    }

    pub fn describe(&self, name: &str) -> Result<String> {
        Ok(self.resolve(name)?.describe())
    }

    pub fn tables(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.resolve(name)?.table_names())
    }

    pub fn schemas(&self) -> &[SchemaDescriptor] {
        &self.schemas
    }

    /// Normalized alias -> canonical key, for the access evaluator.
    pub fn alias_map(&self) -> HashMap<String, String> {
        self.aliases
            .iter()
            .map(|(alias, &idx)| (alias.clone(), self.schemas[idx].key.clone()))
            .collect()
    }
}

impl Default for SchemaCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_schema_name() {
        assert_eq!(normalize_schema_name("E-Commerce"), "ecommerce");
        assert_eq!(normalize_schema_name("e-commerce"), "ecommerce");
        assert_eq!(normalize_schema_name("Hospital Management"), "hospitalmanagement");
        assert_eq!(normalize_schema_name("hospital_management"), "hospitalmanagement");
    }

    #[test]
    fn test_resolve_accepts_display_and_key() {
        let catalog = SchemaCatalog::builtin();
        assert_eq!(catalog.resolve("Hospital Management").unwrap().key, "hospital");
        assert_eq!(catalog.resolve("hospital").unwrap().key, "hospital");
        assert_eq!(catalog.resolve("SCHOOL-management").unwrap().name, "School Management");
        assert!(matches!(
            catalog.resolve("Inventory"),
            Err(PipelineError::SchemaNotFound(_))
        ));
    }

    #[test]
    fn test_describe_layout() {
        let catalog = SchemaCatalog::builtin();
        let text = catalog.describe("E-Commerce").unwrap();
        assert!(text.starts_with(
            "Database: E-Commerce\nDescription: An e-commerce database for online shopping\n\nTables:\n\nTable: customers\nDescription: Stores customer information\nColumns:\n  - customer_id (INT, PRIMARY KEY)\n"
        ));
        let customers = text.find("Table: customers").unwrap();
        let order_items = text.find("Table: order_items").unwrap();
        assert!(customers < order_items);
        assert_eq!(text, catalog.describe("ecommerce").unwrap());
    }

    #[test]
    fn test_tables_in_declared_order() {
        let catalog = SchemaCatalog::builtin();
        assert_eq!(
            catalog.tables("Hospital Management").unwrap(),
            vec!["patients", "doctors", "appointments", "prescriptions", "departments"]
        );
    }

    #[test]
    fn test_from_json_rejects_ambiguous_names() {
        let json = r#"[
            {"key": "sales", "name": "Sales", "description": "a", "tables": []},
            {"key": "sales_eu", "name": "sales", "description": "b", "tables": []}
        ]"#;
        assert!(matches!(
            SchemaCatalog::from_json_str(json),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn test_from_json_preserves_order() {
        let json = r#"[
            {"key": "crm", "name": "CRM", "description": "Contacts", "tables": [
                {"name": "z_contacts", "description": "People", "columns": [
                    {"name": "id", "attributes": "INT, PRIMARY KEY"}
                ]},
                {"name": "a_notes", "description": "Notes", "columns": []}
            ]}
        ]"#;
        let catalog = SchemaCatalog::from_json_str(json).unwrap();
        assert_eq!(catalog.tables("crm").unwrap(), vec!["z_contacts", "a_notes"]);
    }
}
