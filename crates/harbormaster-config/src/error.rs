//! Configuration errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid config format: {0}")]
    InvalidFormat(String),

    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = ConfigError::NotFound("harbormaster.toml".to_string());
        assert!(err.to_string().contains("harbormaster.toml"));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_invalid_format_error() {
        let err = ConfigError::InvalidFormat("unsupported extension 'yaml'".to_string());
        let display = err.to_string();
        assert!(display.contains("Invalid config format"));
        assert!(display.contains("yaml"));
    }

    #[test]
    fn test_env_var_not_set_error() {
        let err = ConfigError::EnvVarNotSet("HARBORMASTER_TOKEN".to_string());
        assert!(err.to_string().contains("HARBORMASTER_TOKEN"));
        assert!(err.to_string().contains("not set"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigError::from(io_err);
        assert!(err.to_string().contains("file not found"));
    }
}
