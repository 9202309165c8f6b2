//! Configuration loader.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::schema::Config;

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a file if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::NotFound(_)) => Ok(Config::default()),
            other => other,
        }
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let mut result = content.to_string();
        let re = regex::Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    /// Expand shell-style paths (e.g., `~/.harbormaster`).
    pub fn expand_path(path: &Path) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ScheduleIdValue;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_empty_config() {
        let config = ConfigLoader::load_str("").unwrap();
        assert!(!config.auth.enabled);
        assert!(config.schedules.is_empty());
        assert_eq!(config.scheduler.page_limit, 50);
    }

    #[test]
    fn test_load_auth_section() {
        let content = r#"
            [auth]
            enabled = true

            [auth.roles.deployer]
            grants = [
                { resource = "stacks", action = "deploy", environment = 3 },
                { resource = "containers", action = "*" },
            ]

            [[auth.users]]
            name = "alice"
            token = "tok-alice"
            roles = ["deployer"]
            environments = [3]
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert!(config.auth.enabled);
        let role = &config.auth.roles["deployer"];
        assert_eq!(role.grants.len(), 2);
        assert_eq!(role.grants[0].environment, Some(3));
        assert_eq!(role.grants[1].environment, None);
        assert_eq!(config.auth.users[0].environments, vec![3]);
    }

    #[test]
    fn test_load_schedules() {
        let content = r#"
            [[schedules]]
            kind = "container_update"
            id = 12
            environment = 3
            cron = "0 * * * *"

            [[schedules]]
            kind = "system_cleanup"
            id = "event_cleanup"
            cron = "30 2 * * *"
            enabled = false
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.schedules.len(), 2);
        assert_eq!(config.schedules[0].id, ScheduleIdValue::Number(12));
        assert!(config.schedules[0].enabled);
        assert_eq!(
            config.schedules[1].id,
            ScheduleIdValue::Name("event_cleanup".to_string())
        );
        assert!(!config.schedules[1].enabled);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[license]").unwrap();
        writeln!(file, "enterprise = true").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert!(config.license.enterprise);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Path::new("/nonexistent/path/harbormaster.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config =
            ConfigLoader::load_or_default(Path::new("/nonexistent/path/harbormaster.toml"))
                .unwrap();
        assert!(!config.license.enterprise);
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = ConfigLoader::load_str("invalid = [unclosed");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::set_var("HARBORMASTER_TEST_CONFIG_VAR", "tok-from-env");
        }
        let content = "token = \"${HARBORMASTER_TEST_CONFIG_VAR}\"";
        let expanded = ConfigLoader::expand_env_vars(content).unwrap();
        assert!(expanded.contains("tok-from-env"));
        unsafe {
            std::env::remove_var("HARBORMASTER_TEST_CONFIG_VAR");
        }
    }

    #[test]
    fn test_expand_env_vars_not_set() {
        let content = "value = \"${HARBORMASTER_MISSING_VAR_12345}\"";
        let result = ConfigLoader::expand_env_vars(content);
        assert!(matches!(result, Err(ConfigError::EnvVarNotSet(_))));
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let expanded = ConfigLoader::expand_path(Path::new("~/data"));
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.ends_with("data"));
    }

    #[test]
    fn test_expand_path_no_tilde() {
        let expanded = ConfigLoader::expand_path(Path::new("/var/lib/harbormaster"));
        assert_eq!(expanded, PathBuf::from("/var/lib/harbormaster"));
    }
}
