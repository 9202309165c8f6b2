use super::*;
use crate::schema::{
    GrantConfig, JobCommandConfig, RoleConfig, ScheduleConfig, ScheduleIdValue, UserConfig,
};

fn schedule(kind: &str, id: ScheduleIdValue, cron: &str) -> ScheduleConfig {
    ScheduleConfig {
        kind: kind.to_string(),
        id,
        environment: None,
        cron: cron.to_string(),
        enabled: true,
        name: None,
    }
}

fn user(name: &str, token: &str, roles: &[&str]) -> UserConfig {
    UserConfig {
        name: name.to_string(),
        token: Some(token.to_string()),
        roles: roles.iter().map(|r| r.to_string()).collect(),
        environments: Vec::new(),
    }
}

#[test]
fn test_validate_default_config() {
    let config = Config::default();
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.is_valid());
    assert!(result.warnings.is_empty());
}

#[test]
fn test_validate_unknown_schedule_kind() {
    let mut config = Config::default();
    config
        .schedules
        .push(schedule("image_prune", ScheduleIdValue::Number(1), "0 * * * *"));

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(!result.is_valid());
    assert!(result.errors.iter().any(|e| e.path == "schedules[0].kind"));
}

#[test]
fn test_validate_bad_cron_field_count() {
    let mut config = Config::default();
    config.schedules.push(schedule(
        "system_cleanup",
        ScheduleIdValue::Name("event_cleanup".to_string()),
        "0 *",
    ));

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.errors.iter().any(|e| e.path == "schedules[0].cron"));
}

#[test]
fn test_validate_duplicate_schedule() {
    let mut config = Config::default();
    config.jobs.container_update = Some(JobCommandConfig {
        command: "true".to_string(),
        args: Vec::new(),
        env: Default::default(),
    });
    config
        .schedules
        .push(schedule("container_update", ScheduleIdValue::Number(12), "0 * * * *"));
    config
        .schedules
        .push(schedule("container_update", ScheduleIdValue::Number(12), "*/5 * * * *"));

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(!result.is_valid());
    assert!(result.errors.iter().any(|e| e.path == "schedules[1].id"));
}

#[test]
fn test_validate_missing_job_command_warning() {
    let mut config = Config::default();
    config
        .schedules
        .push(schedule("git_stack_sync", ScheduleIdValue::Number(4), "*/10 * * * *"));

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.is_valid());
    assert!(result.warnings.iter().any(|w| w.message.contains("jobs.git_stack_sync")));
}

#[test]
fn test_validate_disabled_system_cleanup_warning() {
    let mut config = Config::default();
    let mut cleanup = schedule(
        "system_cleanup",
        ScheduleIdValue::Name("schedule_cleanup".to_string()),
        "0 3 * * *",
    );
    cleanup.enabled = false;
    config.schedules.push(cleanup);

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.is_valid());
    assert!(result.warnings.iter().any(|w| w.path == "schedules[0].enabled"));
}

#[test]
fn test_validate_shared_token() {
    let mut config = Config::default();
    config.auth.enabled = true;
    config.auth.users.push(user("alice", "tok", &["admin"]));
    config.auth.users.push(user("bob", "tok", &["viewer"]));

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.errors.iter().any(|e| e.path == "auth.users[1].token"));
}

#[test]
fn test_validate_undefined_role_warning() {
    let mut config = Config::default();
    config.auth.enabled = true;
    config.auth.users.push(user("carol", "tok-c", &["deployer"]));

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.is_valid());
    assert!(result.warnings.iter().any(|w| w.message.contains("deployer")));

    config
        .auth
        .roles
        .insert("deployer".to_string(), RoleConfig::default());
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.warnings.is_empty());
}

#[test]
fn test_validate_empty_grant() {
    let mut config = Config::default();
    config.auth.roles.insert(
        "broken".to_string(),
        RoleConfig {
            grants: vec![GrantConfig {
                resource: "containers".to_string(),
                action: " ".to_string(),
                environment: None,
            }],
        },
    );

    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.errors.iter().any(|e| e.path == "auth.roles.broken.grants[0]"));
}

#[test]
fn test_validate_log_level() {
    let mut config = Config::default();
    config.logging.level = "loud".to_string();
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.errors.iter().any(|e| e.path == "logging.level"));

    config.logging.level = "info,harbormaster_scheduler=debug".to_string();
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.is_valid());
}

#[test]
fn test_validate_zero_page_limit() {
    let mut config = Config::default();
    config.scheduler.page_limit = 0;
    let result = ConfigValidator::validate(&config).unwrap();
    assert!(result.errors.iter().any(|e| e.path == "scheduler.page_limit"));
}
