//! # Harbormaster Config
//!
//! Configuration management for the Harbormaster control plane: authorization
//! roles and users, license tier, scheduler storage, logging, schedule
//! descriptors and job commands.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
