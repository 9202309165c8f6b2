//! # Harbormaster Auth
//!
//! Decides whether an actor may perform an action in a scope.
//!
//! ## Layers
//!
//! - [`catalog`]: every valid (resource, action) pair and its scope kind
//! - [`PermissionModel`]: role → grant lookup, pure data
//! - [`AuthorizationContext`]: one per inbound operation; combines the actor,
//!   the deployment's auth flag, the license tier and environment assignments
//! - [`Authorizer`]: builds contexts from the session, license and
//!   environment-assignment collaborators

pub mod catalog;
mod collaborators;
mod context;
mod error;
mod grant;
mod model;

pub use catalog::{Action, Resource, ScopeKind};
pub use collaborators::{
    Actor, EnvironmentDirectory, LicenseProvider, SessionValidator, StaticEnvironmentDirectory,
    StaticLicense, StaticSessions,
};
pub use context::{AuthorizationContext, Authorizer};
pub use error::{AuthError, DenialPayload};
pub use grant::{EnvironmentId, GrantScope, PermissionGrant};
pub use model::{PermissionModel, PermissionModelBuilder};
