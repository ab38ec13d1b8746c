//! Principal Directory
//!
//! Resolves the principal a request runs as. Credentials are checked by the
//! identity layer in front of the gateway; this directory only maps an
//! already-authenticated email or id to its role.

use crate::error::{PipelineError, Result};
use crate::security::policy::{Principal, Role};
use std::collections::HashMap;

pub struct PrincipalDirectory {
    principals: HashMap<String, Principal>,
    email_to_id: HashMap<String, String>,
}

impl PrincipalDirectory {
    pub fn new(principals: Vec<Principal>) -> Result<Self> {
        let mut by_id = HashMap::new();
        let mut email_to_id = HashMap::new();

        for principal in principals {
            let email = principal.email.to_lowercase();
            if by_id.contains_key(&principal.id) {
                return Err(PipelineError::Config(format!(
                    "Principal '{}' already exists",
                    principal.id
                )));
            }
            if email_to_id.contains_key(&email) {
                return Err(PipelineError::Config(format!(
                    "Email '{}' already registered",
                    principal.email
                )));
            }
            email_to_id.insert(email, principal.id.clone());
            by_id.insert(principal.id.clone(), principal);
        }

        Ok(Self {
            principals: by_id,
            email_to_id,
        })
    }

    /// Demo principals created on a fresh installation
    pub fn with_defaults() -> Self {
        let principals = [
            ("admin", "admin@example.com", "System Administrator", Role::Admin),
            ("analyst", "analyst@example.com", "Data Analyst", Role::Analyst),
            ("viewer", "viewer@example.com", "Viewer", Role::Viewer),
        ];

        let mut by_id = HashMap::new();
        let mut email_to_id = HashMap::new();
        for (id, email, name, role) in principals {
            let mut principal = Principal::new(id, email, Some(role));
            principal.name = name.to_string();
            email_to_id.insert(email.to_string(), id.to_string());
            by_id.insert(id.to_string(), principal);
        }

        Self {
            principals: by_id,
            email_to_id,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let principals: Vec<Principal> = serde_json::from_str(json)?;
        Self::new(principals)
    }

    /// Look up an active principal by email (case-insensitive) or id
    pub fn resolve(&self, email_or_id: &str) -> Result<Principal> {
        let id = self
            .email_to_id
            .get(&email_or_id.to_lowercase())
            .map(String::as_str)
            .unwrap_or(email_or_id);

        match self.principals.get(id) {
            Some(p) if p.is_active => Ok(p.clone()),
            Some(_) => Err(PipelineError::Unauthorized(format!(
                "Account '{}' is inactive",
                email_or_id
            ))),
            None => Err(PipelineError::Unauthorized(format!(
                "Unknown principal '{}'",
                email_or_id
            ))),
        }
    }
}

impl Default for PrincipalDirectory {
    fn default() -> Self {
        Self::with_defaults()
    }
}
