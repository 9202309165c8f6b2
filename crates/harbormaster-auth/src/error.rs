//! Authorization errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grant::EnvironmentId;

/// Authorization error types.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// No valid session.
    #[error("Authentication required")]
    Unauthenticated,

    /// Actor lacks a matching grant.
    #[error("Permission denied: {action} on {resource}{}", scope_suffix(.environment))]
    Forbidden {
        resource: String,
        action: String,
        environment: Option<EnvironmentId>,
    },

    /// Actor is not assigned to the environment.
    #[error("Access to environment {0} denied")]
    EnvironmentDenied(EnvironmentId),

    /// Feature needs an Enterprise license.
    #[error("{feature} requires an Enterprise license")]
    EnterpriseRequired { feature: String },

    /// Grant does not fit the catalog.
    #[error("Invalid grant in role '{role}': {reason}")]
    InvalidGrant { role: String, reason: String },

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// Session, license or directory lookup failed.
    #[error("Collaborator error: {0}")]
    Collaborator(String),
}

fn scope_suffix(environment: &Option<EnvironmentId>) -> String {
    match environment {
        Some(env) => format!(" in environment {}", env),
        None => String::new(),
    }
}

impl AuthError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Unauthenticated => "unauthenticated",
            AuthError::Forbidden { .. } => "forbidden",
            AuthError::EnvironmentDenied(_) => "environment_denied",
            AuthError::EnterpriseRequired { .. } => "enterprise_required",
            AuthError::InvalidGrant { .. } => "invalid_grant",
            AuthError::UnknownResource(_) => "unknown_resource",
            AuthError::UnknownAction(_) => "unknown_action",
            AuthError::Collaborator(_) => "collaborator_error",
        }
    }

    /// True for errors a caller reports as a denial.
    pub fn is_denial(&self) -> bool {
        matches!(
            self,
            AuthError::Unauthenticated
                | AuthError::Forbidden { .. }
                | AuthError::EnvironmentDenied(_)
                | AuthError::EnterpriseRequired { .. }
        )
    }

    /// Caller-facing payload.
    pub fn payload(&self) -> DenialPayload {
        DenialPayload {
            error: self.to_string(),
            code: self.code().to_string(),
            feature: match self {
                AuthError::EnterpriseRequired { feature } => Some(feature.clone()),
                _ => None,
            },
        }
    }
}

/// Serializable denial returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenialPayload {
    pub error: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_display() {
        let err = AuthError::Forbidden {
            resource: "containers".to_string(),
            action: "exec".to_string(),
            environment: Some(EnvironmentId(7)),
        };
        assert_eq!(
            err.to_string(),
            "Permission denied: exec on containers in environment 7"
        );

        let err = AuthError::Forbidden {
            resource: "settings".to_string(),
            action: "edit".to_string(),
            environment: None,
        };
        assert_eq!(err.to_string(), "Permission denied: edit on settings");
    }

    #[test]
    fn test_enterprise_payload() {
        let err = AuthError::EnterpriseRequired {
            feature: "mfa".to_string(),
        };
        let payload = err.payload();
        assert_eq!(payload.code, "enterprise_required");
        assert_eq!(payload.feature.as_deref(), Some("mfa"));
        assert!(err.is_denial());

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["code"], "enterprise_required");
    }

    #[test]
    fn test_payload_omits_feature() {
        let json = serde_json::to_value(AuthError::Unauthenticated.payload()).unwrap();
        assert!(json.get("feature").is_none());
        assert_eq!(json["error"], "Authentication required");
    }

    #[test]
    fn test_config_errors_are_not_denials() {
        assert!(!AuthError::UnknownAction("fly".to_string()).is_denial());
        assert!(!AuthError::Collaborator("timeout".to_string()).is_denial());
    }
}
