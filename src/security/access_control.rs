//! Access Control
//!
//! Schema-level authorization. Permissions live in an in-memory table keyed
//! by (role, canonical schema key), loaded at startup and swapped only by an
//! explicit reload.

use crate::catalog::{normalize_schema_name, SchemaCatalog};
use crate::error::{PipelineError, Result};
use crate::security::policy::{AccessMode, DatabasePermission, Principal, Role};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Immutable snapshot of all permission records
#[derive(Debug, Default)]
pub struct PermissionTable {
    entries: HashMap<(Role, String), DatabasePermission>,
}

impl PermissionTable {
    fn build(records: Vec<DatabasePermission>, canonical: impl Fn(&str) -> String) -> Result<Self> {
        let mut entries = HashMap::new();
        for mut record in records {
            record.schema_name = canonical(&record.schema_name);
            let key = (record.role, record.schema_name.clone());
            if entries.contains_key(&key) {
                return Err(PipelineError::Config(format!(
                    "Duplicate permission for role '{}' on schema '{}'",
                    record.role, record.schema_name
                )));
            }
            entries.insert(key, record);
        }
        Ok(Self { entries })
    }

    pub fn get(&self, role: Role, schema_key: &str) -> Option<&DatabasePermission> {
        self.entries.get(&(role, schema_key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Permission records seeded for a fresh installation
pub fn default_permissions() -> Vec<DatabasePermission> {
    let mut records = Vec::new();
    for db in ["ecommerce", "hospital", "school"] {
        records.push(DatabasePermission::new(Role::Admin, db, true, true, true));
        records.push(DatabasePermission::new(Role::Analyst, db, true, false, true));
    }
    records.push(DatabasePermission::new(Role::Viewer, "ecommerce", true, false, false));
    for db in ["ecommerce", "school"] {
        records.push(DatabasePermission::new(Role::Developer, db, true, true, true));
    }
    records
}

/// Parse permission records from a JSON array
pub fn permissions_from_json(json: &str) -> Result<Vec<DatabasePermission>> {
    Ok(serde_json::from_str(json)?)
}

/// Access controller
pub struct AccessController {
    aliases: HashMap<String, String>,
    /// (key, display name) in catalog order
    schemas: Vec<(String, String)>,
    table: RwLock<Arc<PermissionTable>>,
}

impl AccessController {
    pub fn new(catalog: &SchemaCatalog, records: Vec<DatabasePermission>) -> Result<Self> {
        let aliases = catalog.alias_map();
        let schemas = catalog
            .schemas()
            .iter()
            .map(|s| (s.key.clone(), s.name.clone()))
            .collect();
        let table = PermissionTable::build(records, |name| canonical_key(&aliases, name))?;
        info!("Loaded {} permission records", table.len());

        Ok(Self {
            aliases,
            schemas,
            table: RwLock::new(Arc::new(table)),
        })
    }

    /// Replace the permission table. In-flight requests keep the snapshot
    /// they started with.
    pub fn reload(&self, records: Vec<DatabasePermission>) -> Result<()> {
        let table = PermissionTable::build(records, |name| self.canonical_key(name))?;
        let count = table.len();
        let mut guard = self
            .table
            .write()
            .map_err(|e| PipelineError::Config(format!("Failed to acquire write lock: {}", e)))?;
        *guard = Arc::new(table);
        info!("Reloaded {} permission records", count);
        Ok(())
    }

    pub fn snapshot(&self) -> Arc<PermissionTable> {
        match self.table.read() {
            Ok(guard) => Arc::clone(&guard),
            // A poisoned lock still holds the last fully written table
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Map any accepted spelling of a schema name to its canonical key
    pub fn canonical_key(&self, schema_name: &str) -> String {
        canonical_key(&self.aliases, schema_name)
    }

    /// Display names of every schema the principal can read, in catalog order
    pub fn accessible_schemas(&self, principal: &Principal) -> Vec<String> {
        let role = match active_role(principal) {
            Some(role) => role,
            None => return Vec::new(),
        };
        let table = self.snapshot();

        self.schemas
            .iter()
            .filter(|(key, _)| {
                table
                    .get(role, key)
                    .map(|p| p.allows(AccessMode::Read))
                    .unwrap_or(false)
            })
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Fail-closed permission check
    pub fn can_access(&self, principal: &Principal, schema_name: &str, mode: AccessMode) -> bool {
        let role = match active_role(principal) {
            Some(role) => role,
            None => return false,
        };
        let key = self.canonical_key(schema_name);
        let allowed = self
            .snapshot()
            .get(role, &key)
            .map(|p| p.allows(mode))
            .unwrap_or(false);

        debug!(
            "Access check: principal={} role={} schema={} mode={:?} allowed={}",
            principal.id, role, key, mode, allowed
        );
        allowed
    }

    pub fn authorize(&self, principal: &Principal, schema_name: &str, mode: AccessMode) -> Result<()> {
        if self.can_access(principal, schema_name, mode) {
            Ok(())
        } else {
            Err(PipelineError::Unauthorized(
                "You do not have access to this database".to_string(),
            ))
        }
    }
}

fn canonical_key(aliases: &HashMap<String, String>, schema_name: &str) -> String {
    let normalized = normalize_schema_name(schema_name);
    aliases.get(&normalized).cloned().unwrap_or(normalized)
}

fn active_role(principal: &Principal) -> Option<Role> {
    if principal.is_active {
        principal.role
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> AccessController {
        AccessController::new(&SchemaCatalog::builtin(), default_permissions()).unwrap()
    }

    #[test]
    fn test_no_role_fails_closed() {
        let ac = controller();
        let nobody = Principal::new("u1", "u1@example.com", None);
        assert!(ac.accessible_schemas(&nobody).is_empty());
        for schema in ["E-Commerce", "Hospital Management", "School Management", "unknown"] {
            for mode in [AccessMode::Read, AccessMode::Write, AccessMode::Execute] {
                assert!(!ac.can_access(&nobody, schema, mode));
            }
        }
    }

    #[test]
    fn test_inactive_principal_fails_closed() {
        let ac = controller();
        let mut admin = Principal::new("a", "a@example.com", Some(Role::Admin));
        admin.is_active = false;
        assert!(ac.accessible_schemas(&admin).is_empty());
        assert!(!ac.can_access(&admin, "ecommerce", AccessMode::Read));
    }

    #[test]
    fn test_name_spellings_agree() {
        let ac = controller();
        for role in [Role::Admin, Role::Analyst, Role::Viewer, Role::Developer] {
            let p = Principal::new("p", "p@example.com", Some(role));
            let expected = ac.can_access(&p, "E-Commerce", AccessMode::Read);
            assert_eq!(ac.can_access(&p, "ecommerce", AccessMode::Read), expected);
            assert_eq!(ac.can_access(&p, "e-commerce", AccessMode::Read), expected);
            assert_eq!(
                ac.can_access(&p, "Hospital Management", AccessMode::Read),
                ac.can_access(&p, "hospital", AccessMode::Read)
            );
        }
    }

    #[test]
    fn test_viewer_scope() {
        let ac = controller();
        let viewer = Principal::new("v", "v@example.com", Some(Role::Viewer));
        assert_eq!(ac.accessible_schemas(&viewer), vec!["E-Commerce"]);
        assert!(ac.can_access(&viewer, "E-Commerce", AccessMode::Read));
        assert!(!ac.can_access(&viewer, "E-Commerce", AccessMode::Execute));
        assert!(!ac.can_access(&viewer, "Hospital Management", AccessMode::Read));
        assert!(matches!(
            ac.authorize(&viewer, "Hospital Management", AccessMode::Read),
            Err(PipelineError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_developer_and_analyst_modes() {
        let ac = controller();
        let dev = Principal::new("d", "d@example.com", Some(Role::Developer));
        assert_eq!(ac.accessible_schemas(&dev), vec!["E-Commerce", "School Management"]);
        assert!(ac.can_access(&dev, "school", AccessMode::Write));

        let analyst = Principal::new("an", "an@example.com", Some(Role::Analyst));
        assert_eq!(ac.accessible_schemas(&analyst).len(), 3);
        assert!(!ac.can_access(&analyst, "hospital", AccessMode::Write));
        assert!(ac.can_access(&analyst, "hospital", AccessMode::Execute));
    }

    #[test]
    fn test_duplicate_permission_rejected() {
        let records = vec![
            DatabasePermission::new(Role::Viewer, "ecommerce", true, false, false),
            DatabasePermission::new(Role::Viewer, "E-Commerce", false, false, false),
        ];
        assert!(matches!(
            AccessController::new(&SchemaCatalog::builtin(), records),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn test_reload_swaps_table() {
        let ac = controller();
        let viewer = Principal::new("v", "v@example.com", Some(Role::Viewer));
        let before = ac.snapshot();

        ac.reload(vec![DatabasePermission::new(Role::Viewer, "School Management", true, false, false)])
            .unwrap();

        assert_eq!(ac.accessible_schemas(&viewer), vec!["School Management"]);
        assert!(!ac.can_access(&viewer, "ecommerce", AccessMode::Read));
        // Old snapshot is untouched
        assert!(before.get(Role::Viewer, "ecommerce").is_some());
    }

    #[test]
    fn test_permissions_from_json() {
        let records = permissions_from_json(
            r#"[{"role": "analyst", "schema_name": "Hospital Management", "can_read": true}]"#,
        )
        .unwrap();
        let ac = AccessController::new(&SchemaCatalog::builtin(), records).unwrap();
        let analyst = Principal::new("an", "an@example.com", Some(Role::Analyst));
        assert!(ac.can_access(&analyst, "hospital", AccessMode::Read));
    }
}
