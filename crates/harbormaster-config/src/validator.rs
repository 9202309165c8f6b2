//! Configuration validation.

use std::collections::HashSet;

use crate::error::ConfigError;
use crate::schema::Config;

/// Schedule kinds understood by the scheduler.
const SCHEDULE_KINDS: [&str; 4] = [
    "container_update",
    "git_stack_sync",
    "env_update_check",
    "system_cleanup",
];

/// Roles that exist without being declared.
const BUILTIN_ROLES: [&str; 3] = ["admin", "operator", "viewer"];

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
///
/// Checks structure only; grant names and cron syntax are checked again by
/// the crates that interpret them.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_auth(config, &mut result);
        Self::validate_scheduler(config, &mut result);
        Self::validate_schedules(config, &mut result);
        Self::validate_logging(config, &mut result);

        Ok(result)
    }

    fn validate_auth(config: &Config, result: &mut ValidationResult) {
        if !config.auth.enabled && !config.auth.users.is_empty() {
            result.add_warning(ValidationWarning::new(
                "auth.enabled",
                "Users are configured but authorization is disabled; every check will be allowed",
            ));
        }

        for (name, role) in &config.auth.roles {
            for (i, grant) in role.grants.iter().enumerate() {
                if grant.resource.trim().is_empty() || grant.action.trim().is_empty() {
                    result.add_error(ValidationError::new(
                        format!("auth.roles.{}.grants[{}]", name, i),
                        "Grant resource and action cannot be empty",
                    ));
                }
            }
        }

        let mut tokens = HashSet::new();
        for (i, user) in config.auth.users.iter().enumerate() {
            if user.name.trim().is_empty() {
                result.add_error(ValidationError::new(
                    format!("auth.users[{}].name", i),
                    "User name cannot be empty",
                ));
            }

            if let Some(ref token) = user.token {
                if !tokens.insert(token.as_str()) {
                    result.add_error(ValidationError::new(
                        format!("auth.users[{}].token", i),
                        "Session token is shared with another user",
                    ));
                }
            }

            for role in &user.roles {
                let known = config.auth.roles.contains_key(role)
                    || BUILTIN_ROLES.contains(&role.as_str());
                if !known {
                    result.add_warning(ValidationWarning::new(
                        format!("auth.users[{}].roles", i),
                        format!("Role '{}' is not defined and grants nothing", role),
                    ));
                }
            }

            if !user.environments.is_empty() && !config.license.enterprise {
                result.add_warning(ValidationWarning::new(
                    format!("auth.users[{}].environments", i),
                    "Environment assignments only apply with an Enterprise license",
                ));
            }
        }
    }

    fn validate_scheduler(config: &Config, result: &mut ValidationResult) {
        if config.scheduler.page_limit == 0 {
            result.add_error(ValidationError::new(
                "scheduler.page_limit",
                "page_limit must be greater than 0",
            ));
        }

        if config.scheduler.retention_days == 0 {
            result.add_error(ValidationError::new(
                "scheduler.retention_days",
                "retention_days must be greater than 0",
            ));
        }
    }

    fn validate_schedules(config: &Config, result: &mut ValidationResult) {
        let mut seen = HashSet::new();

        for (i, schedule) in config.schedules.iter().enumerate() {
            let path = format!("schedules[{}]", i);

            if !SCHEDULE_KINDS.contains(&schedule.kind.as_str()) {
                result.add_error(ValidationError::new(
                    format!("{}.kind", path),
                    format!(
                        "Unknown schedule kind '{}', valid values: {:?}",
                        schedule.kind, SCHEDULE_KINDS
                    ),
                ));
            }

            let fields = schedule.cron.split_whitespace().count();
            if !(5..=7).contains(&fields) {
                result.add_error(ValidationError::new(
                    format!("{}.cron", path),
                    format!(
                        "Cron expression '{}' has {} fields, expected 5 to 7",
                        schedule.cron, fields
                    ),
                ));
            }

            if !seen.insert((schedule.kind.as_str(), schedule.id.to_string())) {
                result.add_error(ValidationError::new(
                    format!("{}.id", path),
                    format!("Duplicate schedule {}:{}", schedule.kind, schedule.id),
                ));
            }

            if schedule.kind == "system_cleanup" && !schedule.enabled {
                result.add_warning(ValidationWarning::new(
                    format!("{}.enabled", path),
                    "System cleanup jobs cannot be disabled; the flag is ignored",
                ));
            }

            let needs_command = match schedule.kind.as_str() {
                "container_update" => config.jobs.container_update.is_none(),
                "git_stack_sync" => config.jobs.git_stack_sync.is_none(),
                "env_update_check" => config.jobs.env_update_check.is_none(),
                _ => false,
            };
            if needs_command {
                result.add_warning(ValidationWarning::new(
                    format!("{}.kind", path),
                    format!(
                        "No [jobs.{}] command configured; runs will be skipped",
                        schedule.kind
                    ),
                ));
            }
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        // Accept full EnvFilter directives; only a bare level is checked.
        let level = config.logging.level.as_str();
        if !level.contains('=') && !level.contains(',') && !LOG_LEVELS.contains(&level) {
            result.add_error(ValidationError::new(
                "logging.level",
                format!("Unknown log level '{}', valid values: {:?}", level, LOG_LEVELS),
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
