//! Role → grant mapping.

use std::collections::{HashMap, HashSet};

use harbormaster_config::{AuthConfig, RoleConfig};

use crate::catalog::{self, Action, Resource, ScopeKind, CATALOG};
use crate::error::AuthError;
use crate::grant::{EnvironmentId, GrantScope, PermissionGrant};

/// Immutable role → grant lookup.
///
/// Built once from configuration and shared behind an `Arc`; nothing in this
/// crate mutates it afterwards.
#[derive(Debug, Clone, Default)]
pub struct PermissionModel {
    roles: HashMap<String, HashSet<PermissionGrant>>,
}

impl PermissionModel {
    /// Create a builder.
    pub fn builder() -> PermissionModelBuilder {
        PermissionModelBuilder::new()
    }

    /// Built-in presets plus the roles declared in configuration.
    /// Configured roles replace presets of the same name.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let mut builder = PermissionModelBuilder::new().with_presets();
        for (name, role) in &config.roles {
            builder = builder.role_from_config(name, role)?;
        }
        Ok(builder.build())
    }

    /// Grants held by a role; empty for unknown roles.
    pub fn grants_for(&self, role: &str) -> HashSet<PermissionGrant> {
        self.roles.get(role).cloned().unwrap_or_default()
    }

    /// Role names, unordered.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(String::as_str)
    }

    /// Whether any of `roles` holds a grant for the check.
    ///
    /// Pairs outside the catalog never match. Environment-scoped actions
    /// without an id are denied; scope-optional actions without an id only
    /// match global grants.
    pub fn is_granted<S: AsRef<str>>(
        &self,
        roles: &[S],
        resource: Resource,
        action: Action,
        env: Option<EnvironmentId>,
    ) -> bool {
        let Some(kind) = catalog::scope_of(resource, action) else {
            return false;
        };

        let env = match (kind, env) {
            (ScopeKind::Global, _) => None,
            (ScopeKind::Environment, None) => return false,
            (_, env) => env,
        };

        let global = PermissionGrant::global(resource, action);
        let scoped = env.map(|id| PermissionGrant::in_environment(resource, action, id));

        roles
            .iter()
            .filter_map(|role| self.roles.get(role.as_ref()))
            .any(|grants| {
                grants.contains(&global) || scoped.is_some_and(|g| grants.contains(&g))
            })
    }
}

/// Builder for [`PermissionModel`]; validates every grant against the catalog.
#[derive(Debug, Default)]
pub struct PermissionModelBuilder {
    roles: HashMap<String, HashSet<PermissionGrant>>,
}

impl PermissionModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the `admin`, `operator` and `viewer` presets.
    pub fn with_presets(mut self) -> Self {
        let admin = CATALOG
            .iter()
            .map(|(r, a, _)| PermissionGrant::global(*r, *a))
            .collect();

        let operator_resources = [
            Resource::Containers,
            Resource::Images,
            Resource::Volumes,
            Resource::Stacks,
            Resource::Configsets,
            Resource::Schedules,
        ];
        let operator = CATALOG
            .iter()
            .filter(|(r, a, _)| {
                operator_resources.contains(r)
                    || (*r == Resource::Environments && *a == Action::View)
            })
            .map(|(r, a, _)| PermissionGrant::global(*r, *a))
            .collect();

        let viewer = CATALOG
            .iter()
            .filter(|(_, a, _)| *a == Action::View)
            .map(|(r, a, _)| PermissionGrant::global(*r, *a))
            .collect();

        self.roles.insert("admin".to_string(), admin);
        self.roles.insert("operator".to_string(), operator);
        self.roles.insert("viewer".to_string(), viewer);
        self
    }

    /// Define (or replace) a role.
    pub fn role(
        mut self,
        name: impl Into<String>,
        grants: impl IntoIterator<Item = PermissionGrant>,
    ) -> Result<Self, AuthError> {
        let name = name.into();
        let mut set = HashSet::new();
        for grant in grants {
            validate_grant(&name, &grant)?;
            set.insert(grant);
        }
        self.roles.insert(name, set);
        Ok(self)
    }

    /// Define a role from its configuration table, expanding `*` actions.
    pub fn role_from_config(self, name: &str, config: &RoleConfig) -> Result<Self, AuthError> {
        let mut grants = Vec::new();

        for grant in &config.grants {
            let resource: Resource = grant.resource.parse()?;
            let scope = match grant.environment {
                Some(id) => GrantScope::Environment(EnvironmentId(id)),
                None => GrantScope::Global,
            };

            if grant.action == "*" {
                grants.extend(catalog::actions_for(resource).filter_map(|action| {
                    // Wildcards skip global-only actions when bound to an environment.
                    let kind = catalog::scope_of(resource, action)?;
                    if kind == ScopeKind::Global && scope != GrantScope::Global {
                        return None;
                    }
                    Some(PermissionGrant {
                        resource,
                        action,
                        scope,
                    })
                }));
            } else {
                grants.push(PermissionGrant {
                    resource,
                    action: grant.action.parse()?,
                    scope,
                });
            }
        }

        self.role(name, grants)
    }

    pub fn build(self) -> PermissionModel {
        PermissionModel { roles: self.roles }
    }
}

fn validate_grant(role: &str, grant: &PermissionGrant) -> Result<(), AuthError> {
    let Some(kind) = catalog::scope_of(grant.resource, grant.action) else {
        return Err(AuthError::InvalidGrant {
            role: role.to_string(),
            reason: format!("{}:{} is not a known action", grant.resource, grant.action),
        });
    };

    if kind == ScopeKind::Global && grant.scope != GrantScope::Global {
        return Err(AuthError::InvalidGrant {
            role: role.to_string(),
            reason: format!(
                "{}:{} is deployment-wide and cannot be bound to an environment",
                grant.resource, grant.action
            ),
        });
    }

    Ok(())
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
