//! Session, license and environment-assignment collaborators.
//!
//! The core never validates tokens or licenses itself; it asks these traits.
//! Static implementations backed by configuration ship for single-node use.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use harbormaster_config::{AuthConfig, LicenseConfig};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::grant::EnvironmentId;

/// Authenticated principal, rebuilt per request and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Identity id; `None` for the pseudo-actor used when auth is disabled.
    pub id: Option<String>,
    /// Assigned role names.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Actor {
    pub fn new(id: impl Into<String>, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            id: Some(id.into()),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Identity-less actor.
    pub fn anonymous() -> Self {
        Self {
            id: None,
            roles: Vec::new(),
        }
    }
}

/// Validates session tokens.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Resolve a token to an actor, `None` when the token is not valid.
    async fn validate_session(&self, token: &str) -> Result<Option<Actor>, AuthError>;

    /// Whether the deployment enforces authorization at all.
    async fn is_auth_enabled(&self) -> Result<bool, AuthError>;
}

/// Per-user environment assignments (Enterprise tenant isolation).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnvironmentDirectory: Send + Sync {
    async fn environments_for(&self, actor_id: &str) -> Result<Vec<EnvironmentId>, AuthError>;
}

/// License tier lookup. Asked on every context build.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LicenseProvider: Send + Sync {
    async fn is_enterprise(&self) -> Result<bool, AuthError>;
}

/// Token table built from `[[auth.users]]`.
#[derive(Debug, Clone, Default)]
pub struct StaticSessions {
    enabled: bool,
    tokens: HashMap<String, Actor>,
}

impl StaticSessions {
    pub fn from_config(config: &AuthConfig) -> Self {
        let tokens = config
            .users
            .iter()
            .filter_map(|user| {
                let token = user.token.clone()?;
                Some((token, Actor::new(user.name.clone(), user.roles.clone())))
            })
            .collect();
        Self {
            enabled: config.enabled,
            tokens,
        }
    }
}

#[async_trait]
impl SessionValidator for StaticSessions {
    async fn validate_session(&self, token: &str) -> Result<Option<Actor>, AuthError> {
        Ok(self.tokens.get(token).cloned())
    }

    async fn is_auth_enabled(&self) -> Result<bool, AuthError> {
        Ok(self.enabled)
    }
}

/// Environment assignments built from `[[auth.users]]`.
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironmentDirectory {
    assignments: HashMap<String, HashSet<EnvironmentId>>,
}

impl StaticEnvironmentDirectory {
    pub fn from_config(config: &AuthConfig) -> Self {
        let assignments = config
            .users
            .iter()
            .map(|user| {
                let envs = user.environments.iter().copied().map(EnvironmentId).collect();
                (user.name.clone(), envs)
            })
            .collect();
        Self { assignments }
    }
}

#[async_trait]
impl EnvironmentDirectory for StaticEnvironmentDirectory {
    async fn environments_for(&self, actor_id: &str) -> Result<Vec<EnvironmentId>, AuthError> {
        Ok(self
            .assignments
            .get(actor_id)
            .map(|envs| envs.iter().copied().collect())
            .unwrap_or_default())
    }
}

/// Fixed license tier from `[license]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticLicense {
    enterprise: bool,
}

impl StaticLicense {
    pub fn new(enterprise: bool) -> Self {
        Self { enterprise }
    }

    pub fn from_config(config: &LicenseConfig) -> Self {
        Self::new(config.enterprise)
    }
}

#[async_trait]
impl LicenseProvider for StaticLicense {
    async fn is_enterprise(&self) -> Result<bool, AuthError> {
        Ok(self.enterprise)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harbormaster_config::UserConfig;

    fn config() -> AuthConfig {
        AuthConfig {
            enabled: true,
            roles: Default::default(),
            users: vec![
                UserConfig {
                    name: "alice".to_string(),
                    token: Some("tok-alice".to_string()),
                    roles: vec!["admin".to_string()],
                    environments: vec![1, 2],
                },
                UserConfig {
                    name: "bob".to_string(),
                    token: None,
                    roles: vec!["viewer".to_string()],
                    environments: vec![],
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_static_sessions() {
        let sessions = StaticSessions::from_config(&config());
        assert!(sessions.is_auth_enabled().await.unwrap());

        let actor = sessions.validate_session("tok-alice").await.unwrap().unwrap();
        assert_eq!(actor.id.as_deref(), Some("alice"));
        assert_eq!(actor.roles, vec!["admin".to_string()]);

        assert!(sessions.validate_session("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_static_directory() {
        let directory = StaticEnvironmentDirectory::from_config(&config());
        let mut envs = directory.environments_for("alice").await.unwrap();
        envs.sort();
        assert_eq!(envs, vec![EnvironmentId(1), EnvironmentId(2)]);
        assert!(directory.environments_for("bob").await.unwrap().is_empty());
        assert!(directory.environments_for("mallory").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_static_license() {
        assert!(StaticLicense::new(true).is_enterprise().await.unwrap());
        assert!(!StaticLicense::default().is_enterprise().await.unwrap());
    }
}
