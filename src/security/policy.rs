//! Security Policy Definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role assigned to a principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Analyst,
    Viewer,
    Developer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Analyst => "analyst",
            Role::Viewer => "viewer",
            Role::Developer => "developer",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Admin => "Administrator",
            Role::Analyst => "Data Analyst",
            Role::Viewer => "Viewer",
            Role::Developer => "Developer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of access requested against a schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    Read,
    Write,
    Execute,
}

/// Permission flags for one (role, schema) pair. `schema_name` is the
/// canonical schema key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabasePermission {
    pub role: Role,
    pub schema_name: String,
    #[serde(default = "default_true")]
    pub can_read: bool,
    #[serde(default)]
    pub can_write: bool,
    #[serde(default = "default_true")]
    pub can_execute: bool,
}

fn default_true() -> bool {
    true
}

impl DatabasePermission {
    pub fn new(role: Role, schema_name: &str, can_read: bool, can_write: bool, can_execute: bool) -> Self {
        Self {
            role,
            schema_name: schema_name.to_string(),
            can_read,
            can_write,
            can_execute,
        }
    }

    pub fn allows(&self, mode: AccessMode) -> bool {
        match mode {
            AccessMode::Read => self.can_read,
            AccessMode::Write => self.can_write,
            AccessMode::Execute => self.can_execute,
        }
    }
}

/// The identity a request runs as. Supplied already authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Principal {
    pub fn new(id: &str, email: &str, role: Option<Role>) -> Self {
        Self {
            id: id.to_string(),
            email: email.to_string(),
            name: id.to_string(),
            role,
            is_active: true,
        }
    }
}
