//! `validate` subcommand.

use std::path::Path;

use anyhow::bail;
use harbormaster_auth::PermissionModelBuilder;
use harbormaster_config::{Config, ConfigValidator, ValidationError, ValidationResult};
use harbormaster_scheduler::ScheduleDescriptor;

/// Handle `harbormaster validate`: print the report, fail when it has errors.
pub(crate) fn validate(config: &Config, path: &Path) -> anyhow::Result<()> {
    let result = validation_report(config)?;
    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for error in &result.errors {
        println!("error: {}: {}", error.path, error.message);
    }

    if !result.is_valid() {
        bail!(
            "{} is invalid ({} errors, {} warnings)",
            path.display(),
            result.errors.len(),
            result.warnings.len()
        );
    }
    println!(
        "{} is valid ({} warnings)",
        path.display(),
        result.warnings.len()
    );
    Ok(())
}

/// Structural checks from the config crate, plus what only the auth and
/// scheduler crates can judge: grants against the permission catalog and
/// descriptors against the schedule rules (kinds, ids, cron syntax).
pub(crate) fn validation_report(config: &Config) -> anyhow::Result<ValidationResult> {
    let mut result = ConfigValidator::validate(config)?;

    let mut roles: Vec<_> = config.auth.roles.iter().collect();
    roles.sort_by_key(|(name, _)| name.as_str());
    for (name, role) in roles {
        if let Err(e) = PermissionModelBuilder::new().role_from_config(name, role) {
            result.add_error(ValidationError::new(
                format!("auth.roles.{}.grants", name),
                e.to_string(),
            ));
        }
    }

    for (i, schedule) in config.schedules.iter().enumerate() {
        if let Err(e) = ScheduleDescriptor::from_config(schedule) {
            result.add_error(ValidationError::new(format!("schedules[{}]", i), e.to_string()));
        }
    }

    Ok(result)
}
