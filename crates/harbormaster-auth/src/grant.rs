//! Permission grants and environment scope.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::{Action, Resource};

/// Tenant / cluster-connection identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentId(pub u64);

impl fmt::Display for EnvironmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EnvironmentId {
    fn from(id: u64) -> Self {
        EnvironmentId(id)
    }
}

/// Where a grant applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantScope {
    Global,
    Environment(EnvironmentId),
}

/// (resource, action, scope) tuple held by a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub resource: Resource,
    pub action: Action,
    pub scope: GrantScope,
}

impl PermissionGrant {
    /// Grant valid in every environment.
    pub fn global(resource: Resource, action: Action) -> Self {
        Self {
            resource,
            action,
            scope: GrantScope::Global,
        }
    }

    /// Grant bound to one environment.
    pub fn in_environment(resource: Resource, action: Action, env: EnvironmentId) -> Self {
        Self {
            resource,
            action,
            scope: GrantScope::Environment(env),
        }
    }

    /// Whether this grant covers the check. A global grant covers any
    /// environment; an environment grant only covers its own id.
    pub fn matches(&self, resource: Resource, action: Action, env: Option<EnvironmentId>) -> bool {
        if self.resource != resource || self.action != action {
            return false;
        }
        match self.scope {
            GrantScope::Global => true,
            GrantScope::Environment(id) => env == Some(id),
        }
    }
}

impl fmt::Display for PermissionGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            GrantScope::Global => write!(f, "{}:{}", self.resource, self.action),
            GrantScope::Environment(env) => {
                write!(f, "{}:{}@{}", self.resource, self.action, env)
            }
        }
    }
}
