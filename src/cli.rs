//! CLI definitions for Harbormaster.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

/// Harbormaster CLI.
#[derive(Parser)]
#[command(name = "harbormaster")]
#[command(about = "Authorization engine and maintenance-job scheduler")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "config/harbormaster.toml",
        env = "HARBORMASTER_CONFIG",
        global = true
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Arm every enabled schedule and run until interrupted (default)
    Run,

    /// Run one schedule now and print the result
    Trigger {
        /// Schedule kind (container_update, git_stack_sync, env_update_check, system_cleanup)
        kind: String,

        /// Schedule id (numeric, or a system job name)
        id: String,

        /// Record the run as started by a webhook (git_stack_sync only)
        #[arg(long)]
        webhook: bool,
    },

    /// Query execution history
    Executions {
        /// Filter by schedule kind
        #[arg(long)]
        kind: Option<String>,

        /// Filter by schedule id
        #[arg(long)]
        id: Option<String>,

        /// Filter by environment id
        #[arg(long, conflicts_with = "no_env")]
        env: Option<u64>,

        /// Only executions without an environment
        #[arg(long)]
        no_env: bool,

        /// Filter by status (repeatable)
        #[arg(long)]
        status: Vec<String>,

        /// Filter by trigger source
        #[arg(long)]
        trigger: Option<String>,

        /// Created at or after (RFC 3339)
        #[arg(long)]
        from: Option<DateTime<Utc>>,

        /// Created at or before (RFC 3339)
        #[arg(long)]
        to: Option<DateTime<Utc>>,

        /// Page size (defaults to scheduler.page_limit)
        #[arg(long)]
        limit: Option<usize>,

        /// Records to skip
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Evaluate an authorization decision against the configured users
    Check {
        /// Session token (omit for an anonymous request)
        #[arg(long)]
        token: Option<String>,

        /// Resource name, e.g. stacks
        #[arg(long)]
        resource: String,

        /// Action name, e.g. deploy
        #[arg(long)]
        action: String,

        /// Environment the action targets
        #[arg(long)]
        env: Option<u64>,
    },

    /// Validate the configuration file
    Validate,
}
