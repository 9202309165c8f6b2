//! Authorization configuration types (roles, grants, users).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Authorization configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Whether the deployment enforces authorization at all.
    #[serde(default)]
    pub enabled: bool,

    /// Role definitions, merged over the built-in presets.
    #[serde(default)]
    pub roles: HashMap<String, RoleConfig>,

    /// Known users and their session tokens.
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

/// A role: a named list of grants.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleConfig {
    #[serde(default)]
    pub grants: Vec<GrantConfig>,
}

/// A single grant. `action = "*"` expands to every action of the resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantConfig {
    pub resource: String,
    pub action: String,
    /// Environment the grant is bound to; global when absent.
    #[serde(default)]
    pub environment: Option<u64>,
}

/// A user known to the static session validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    pub name: String,
    /// Session token accepted for this user.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Environments the user is assigned to (Enterprise tenant isolation).
    #[serde(default)]
    pub environments: Vec<u64>,
}
