//! Per-operation authorization context.

use std::collections::HashSet;
use std::sync::Arc;

use harbormaster_config::{AuthConfig, LicenseConfig};
use tracing::{debug, warn};

use crate::catalog::{Action, Resource};
use crate::collaborators::{
    Actor, EnvironmentDirectory, LicenseProvider, SessionValidator, StaticEnvironmentDirectory,
    StaticLicense, StaticSessions,
};
use crate::error::{AuthError, DenialPayload};
use crate::grant::EnvironmentId;
use crate::model::PermissionModel;

/// Answers "may this actor do this here" for one inbound operation.
///
/// Holds no shared mutable state; build a fresh one per operation.
///
/// When `auth_enabled` is false every permission and environment check is
/// allowed. That is the deployment-level escape hatch, not a default: with
/// auth enabled, anything without a matching grant is denied. The Enterprise
/// gate ([`require_enterprise`](Self::require_enterprise)) applies regardless.
#[derive(Debug, Clone)]
pub struct AuthorizationContext {
    auth_enabled: bool,
    is_enterprise: bool,
    actor: Option<Actor>,
    environments: HashSet<EnvironmentId>,
    model: Arc<PermissionModel>,
}

impl AuthorizationContext {
    /// Context for a resolved actor (or none).
    pub fn for_actor(
        model: Arc<PermissionModel>,
        actor: Option<Actor>,
        auth_enabled: bool,
        is_enterprise: bool,
        environments: impl IntoIterator<Item = EnvironmentId>,
    ) -> Self {
        Self {
            auth_enabled,
            is_enterprise,
            actor,
            environments: environments.into_iter().collect(),
            model,
        }
    }

    /// Context without an actor.
    pub fn anonymous(model: Arc<PermissionModel>, auth_enabled: bool, is_enterprise: bool) -> Self {
        Self::for_actor(model, None, auth_enabled, is_enterprise, std::iter::empty())
    }

    pub fn auth_enabled(&self) -> bool {
        self.auth_enabled
    }

    pub fn is_authenticated(&self) -> bool {
        self.actor.is_some()
    }

    pub fn is_enterprise(&self) -> bool {
        self.is_enterprise
    }

    pub fn actor(&self) -> Option<&Actor> {
        self.actor.as_ref()
    }

    /// Permission check. Always true with auth disabled; false without an
    /// actor; otherwise the actor's roles are looked up in the model with the
    /// environment id passed through unchanged.
    pub fn can(&self, resource: Resource, action: Action, env: Option<EnvironmentId>) -> bool {
        if !self.auth_enabled {
            return true;
        }
        let Some(actor) = &self.actor else {
            return false;
        };
        self.model.is_granted(&actor.roles, resource, action, env)
    }

    /// String form of [`can`](Self::can); unknown names are denied.
    pub fn can_str(&self, resource: &str, action: &str, env: Option<EnvironmentId>) -> bool {
        match (resource.parse::<Resource>(), action.parse::<Action>()) {
            (Ok(resource), Ok(action)) => self.can(resource, action, env),
            _ => !self.auth_enabled,
        }
    }

    /// Enterprise tenant isolation.
    ///
    /// Outside Enterprise (single-tenant) every environment is reachable.
    /// With Enterprise the actor needs an explicit assignment to `env`.
    pub fn can_access_environment(&self, env: EnvironmentId) -> bool {
        if !self.auth_enabled || !self.is_enterprise {
            return true;
        }
        self.actor.is_some() && self.environments.contains(&env)
    }

    /// `can(audit, view)`. Callers apply the Enterprise gate separately.
    pub fn can_view_audit_log(&self) -> bool {
        self.can(Resource::AuditLog, Action::View, None)
    }

    /// Canonical payload for a feature that needs an Enterprise license.
    pub fn enterprise_required() -> DenialPayload {
        DenialPayload {
            error: "This feature requires an Enterprise license".to_string(),
            code: "enterprise_required".to_string(),
            feature: None,
        }
    }

    /// `Ok` when the actor may perform the action, `Forbidden` otherwise.
    pub fn authorize(
        &self,
        resource: Resource,
        action: Action,
        env: Option<EnvironmentId>,
    ) -> Result<(), AuthError> {
        if self.can(resource, action, env) {
            return Ok(());
        }
        if self.auth_enabled && self.actor.is_none() {
            return Err(AuthError::Unauthenticated);
        }
        debug!(
            actor = ?self.actor.as_ref().and_then(|a| a.id.as_deref()),
            %resource,
            %action,
            env = ?env,
            "Permission denied"
        );
        Err(AuthError::Forbidden {
            resource: resource.to_string(),
            action: action.to_string(),
            environment: env,
        })
    }

    /// `Ok` when the actor may reach `env`, `EnvironmentDenied` otherwise.
    pub fn authorize_environment(&self, env: EnvironmentId) -> Result<(), AuthError> {
        if self.can_access_environment(env) {
            Ok(())
        } else {
            Err(AuthError::EnvironmentDenied(env))
        }
    }

    /// Enterprise gate, independent of `auth_enabled` and of the actor.
    pub fn require_enterprise(&self, feature: &str) -> Result<(), AuthError> {
        if self.is_enterprise {
            Ok(())
        } else {
            Err(AuthError::EnterpriseRequired {
                feature: feature.to_string(),
            })
        }
    }

    /// Requires a session when auth is enabled.
    pub fn require_authenticated(&self) -> Result<(), AuthError> {
        if !self.auth_enabled || self.actor.is_some() {
            Ok(())
        } else {
            Err(AuthError::Unauthenticated)
        }
    }
}

/// Builds [`AuthorizationContext`]s from the collaborators.
#[derive(Clone)]
pub struct Authorizer {
    model: Arc<PermissionModel>,
    sessions: Arc<dyn SessionValidator>,
    directory: Arc<dyn EnvironmentDirectory>,
    license: Arc<dyn LicenseProvider>,
}

impl Authorizer {
    pub fn new(
        model: Arc<PermissionModel>,
        sessions: Arc<dyn SessionValidator>,
        directory: Arc<dyn EnvironmentDirectory>,
        license: Arc<dyn LicenseProvider>,
    ) -> Self {
        Self {
            model,
            sessions,
            directory,
            license,
        }
    }

    /// Authorizer backed entirely by configuration.
    pub fn from_config(auth: &AuthConfig, license: &LicenseConfig) -> Result<Self, AuthError> {
        Ok(Self::new(
            Arc::new(PermissionModel::from_config(auth)?),
            Arc::new(StaticSessions::from_config(auth)),
            Arc::new(StaticEnvironmentDirectory::from_config(auth)),
            Arc::new(StaticLicense::from_config(license)),
        ))
    }

    pub fn model(&self) -> &Arc<PermissionModel> {
        &self.model
    }

    /// Build the context for one operation.
    ///
    /// Collaborator failures fail closed: an unreadable auth flag counts as
    /// enabled, an unreadable session as unauthenticated, an unreadable
    /// license as non-Enterprise, unreadable assignments as none.
    pub async fn context_for(&self, token: Option<&str>) -> AuthorizationContext {
        let auth_enabled = self.sessions.is_auth_enabled().await.unwrap_or_else(|e| {
            warn!("Failed to read auth flag, enforcing authorization: {}", e);
            true
        });

        let is_enterprise = self.license.is_enterprise().await.unwrap_or_else(|e| {
            warn!("License lookup failed, treating as non-Enterprise: {}", e);
            false
        });

        let actor = match token {
            Some(token) => self.sessions.validate_session(token).await.unwrap_or_else(|e| {
                warn!("Session validation failed: {}", e);
                None
            }),
            None => None,
        };

        let mut environments = Vec::new();
        if auth_enabled && is_enterprise {
            if let Some(id) = actor.as_ref().and_then(|a| a.id.as_deref()) {
                environments = self.directory.environments_for(id).await.unwrap_or_else(|e| {
                    warn!("Environment assignment lookup failed for {}: {}", id, e);
                    Vec::new()
                });
            }
        }

        AuthorizationContext::for_actor(
            self.model.clone(),
            actor,
            auth_enabled,
            is_enterprise,
            environments,
        )
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
