//! Resource and action catalog.
//!
//! Only the (resource, action) pairs listed in [`CATALOG`] exist. Anything
//! else never matches a grant.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Resource kinds guarded by permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Containers,
    Images,
    Volumes,
    Stacks,
    Configsets,
    Notifications,
    Git,
    License,
    Settings,
    #[serde(rename = "audit")]
    AuditLog,
    Environments,
    Schedules,
}

impl Resource {
    pub const ALL: [Resource; 12] = [
        Resource::Containers,
        Resource::Images,
        Resource::Volumes,
        Resource::Stacks,
        Resource::Configsets,
        Resource::Notifications,
        Resource::Git,
        Resource::License,
        Resource::Settings,
        Resource::AuditLog,
        Resource::Environments,
        Resource::Schedules,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Containers => "containers",
            Resource::Images => "images",
            Resource::Volumes => "volumes",
            Resource::Stacks => "stacks",
            Resource::Configsets => "configsets",
            Resource::Notifications => "notifications",
            Resource::Git => "git",
            Resource::License => "license",
            Resource::Settings => "settings",
            Resource::AuditLog => "audit",
            Resource::Environments => "environments",
            Resource::Schedules => "schedules",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if matches!(s, "audit_log" | "audit-log") {
            return Ok(Resource::AuditLog);
        }
        Resource::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| AuthError::UnknownResource(s.to_string()))
    }
}

/// Actions that can be performed on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    View,
    Create,
    Edit,
    Remove,
    Start,
    Stop,
    Restart,
    Exec,
    Logs,
    Inspect,
    Pull,
    Push,
    Build,
    Deploy,
    Sync,
    Test,
    Export,
    Manage,
    Run,
}

impl Action {
    pub const ALL: [Action; 19] = [
        Action::View,
        Action::Create,
        Action::Edit,
        Action::Remove,
        Action::Start,
        Action::Stop,
        Action::Restart,
        Action::Exec,
        Action::Logs,
        Action::Inspect,
        Action::Pull,
        Action::Push,
        Action::Build,
        Action::Deploy,
        Action::Sync,
        Action::Test,
        Action::Export,
        Action::Manage,
        Action::Run,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Remove => "remove",
            Action::Start => "start",
            Action::Stop => "stop",
            Action::Restart => "restart",
            Action::Exec => "exec",
            Action::Logs => "logs",
            Action::Inspect => "inspect",
            Action::Pull => "pull",
            Action::Push => "push",
            Action::Build => "build",
            Action::Deploy => "deploy",
            Action::Sync => "sync",
            Action::Test => "test",
            Action::Export => "export",
            Action::Manage => "manage",
            Action::Run => "run",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| AuthError::UnknownAction(s.to_string()))
    }
}

/// How an action relates to environments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    /// Deployment-wide; environment ids are ignored and only global grants apply.
    Global,
    /// Needs a concrete environment id; a check without one is denied.
    Environment,
    /// A missing environment id is evaluated as a global check.
    EnvironmentOptional,
}

use Action::*;
use Resource::*;
use ScopeKind::{Environment as Env, EnvironmentOptional as EnvOpt, Global as Glob};

/// Every valid (resource, action) pair.
pub const CATALOG: &[(Resource, Action, ScopeKind)] = &[
    (Containers, View, Env),
    (Containers, Create, Env),
    (Containers, Start, Env),
    (Containers, Stop, Env),
    (Containers, Restart, Env),
    (Containers, Remove, Env),
    (Containers, Exec, Env),
    (Containers, Logs, Env),
    (Containers, Inspect, Env),
    (Images, View, Env),
    (Images, Pull, Env),
    (Images, Push, Env),
    (Images, Build, Env),
    (Images, Remove, Env),
    (Images, Inspect, Env),
    (Volumes, View, Env),
    (Volumes, Create, Env),
    (Volumes, Remove, Env),
    (Volumes, Inspect, Env),
    (Volumes, Export, Env),
    (Stacks, View, Env),
    (Stacks, Create, Env),
    (Stacks, Edit, Env),
    (Stacks, Start, Env),
    (Stacks, Stop, Env),
    (Stacks, Remove, Env),
    (Stacks, Deploy, Env),
    (Configsets, View, Glob),
    (Configsets, Create, Glob),
    (Configsets, Edit, Glob),
    (Configsets, Remove, Glob),
    (Notifications, View, EnvOpt),
    (Notifications, Create, EnvOpt),
    (Notifications, Edit, EnvOpt),
    (Notifications, Remove, EnvOpt),
    (Notifications, Test, EnvOpt),
    (Git, View, Glob),
    (Git, Create, Glob),
    (Git, Edit, Glob),
    (Git, Remove, Glob),
    (Git, Sync, Glob),
    (License, View, Glob),
    (License, Manage, Glob),
    (Settings, View, Glob),
    (Settings, Edit, Glob),
    (AuditLog, View, Glob),
    (AuditLog, Export, Glob),
    (Environments, View, EnvOpt),
    (Environments, Create, Glob),
    (Environments, Edit, EnvOpt),
    (Environments, Remove, EnvOpt),
    (Schedules, View, EnvOpt),
    (Schedules, Edit, EnvOpt),
    (Schedules, Run, EnvOpt),
];

/// Scope kind of a catalog pair, `None` when the pair does not exist.
pub fn scope_of(resource: Resource, action: Action) -> Option<ScopeKind> {
    CATALOG
        .iter()
        .find(|(r, a, _)| *r == resource && *a == action)
        .map(|(_, _, scope)| *scope)
}

/// Actions defined for a resource, in catalog order.
pub fn actions_for(resource: Resource) -> impl Iterator<Item = Action> {
    CATALOG
        .iter()
        .filter(move |(r, _, _)| *r == resource)
        .map(|(_, a, _)| *a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_round_trip_names() {
        for resource in Resource::ALL {
            assert_eq!(resource.as_str().parse::<Resource>().unwrap(), resource);
        }
        assert_eq!("audit-log".parse::<Resource>().unwrap(), Resource::AuditLog);
        assert!("databases".parse::<Resource>().is_err());
    }

    #[test]
    fn test_every_resource_has_actions() {
        for resource in Resource::ALL {
            assert!(actions_for(resource).next().is_some(), "{} has no actions", resource);
        }
    }

    #[test]
    fn test_catalog_has_no_duplicates() {
        for (i, (r, a, _)) in CATALOG.iter().enumerate() {
            assert!(
                !CATALOG[i + 1..].iter().any(|(r2, a2, _)| r2 == r && a2 == a),
                "duplicate catalog entry {}:{}",
                r,
                a
            );
        }
    }

    #[test]
    fn test_scope_of() {
        assert_eq!(scope_of(Containers, Exec), Some(ScopeKind::Environment));
        assert_eq!(scope_of(Settings, Edit), Some(ScopeKind::Global));
        assert_eq!(scope_of(Schedules, Run), Some(ScopeKind::EnvironmentOptional));
        assert_eq!(scope_of(License, Exec), None);
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_value(Resource::AuditLog).unwrap(), "audit");
        assert_eq!(serde_json::to_value(Action::Exec).unwrap(), "exec");
    }
}
