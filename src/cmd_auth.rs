//! `check` subcommand: evaluate one authorization decision.

use harbormaster_auth::{
    Action, AuthError, AuthorizationContext, Authorizer, DenialPayload, EnvironmentId, Resource,
};
use harbormaster_config::Config;
use serde::Serialize;

/// Outcome of a single check, printed as JSON.
#[derive(Debug, Serialize)]
pub(crate) struct CheckReport {
    pub allowed: bool,
    pub actor: Option<String>,
    pub auth_enabled: bool,
    pub enterprise: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denial: Option<DenialPayload>,
}

/// Handle `harbormaster check`.
pub(crate) async fn check(
    config: &Config,
    token: Option<&str>,
    resource: &str,
    action: &str,
    env: Option<u64>,
) -> anyhow::Result<()> {
    let authorizer = Authorizer::from_config(&config.auth, &config.license)?;
    let resource: Resource = resource.parse()?;
    let action: Action = action.parse()?;

    let ctx = authorizer.context_for(token).await;
    let report = evaluate(&ctx, resource, action, env.map(EnvironmentId));
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.allowed {
        std::process::exit(2);
    }
    Ok(())
}

/// Permission check followed by the tenant-isolation check when an
/// environment is named.
pub(crate) fn evaluate(
    ctx: &AuthorizationContext,
    resource: Resource,
    action: Action,
    env: Option<EnvironmentId>,
) -> CheckReport {
    let decision: Result<(), AuthError> = ctx
        .authorize(resource, action, env)
        .and_then(|()| match env {
            Some(env) => ctx.authorize_environment(env),
            None => Ok(()),
        });

    CheckReport {
        allowed: decision.is_ok(),
        actor: ctx.actor().and_then(|a| a.id.clone()),
        auth_enabled: ctx.auth_enabled(),
        enterprise: ctx.is_enterprise(),
        denial: decision.err().map(|e| e.payload()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harbormaster_config::ConfigLoader;

    const CONFIG: &str = r#"
[auth]
enabled = true

[[auth.users]]
name = "olga"
token = "t-olga"
roles = ["operator"]
environments = [1]

[[auth.users]]
name = "vera"
token = "t-vera"
roles = ["viewer"]
environments = [1]
"#;

    async fn report(
        enterprise: bool,
        token: Option<&str>,
        resource: Resource,
        action: Action,
        env: Option<u64>,
    ) -> CheckReport {
        let mut config = ConfigLoader::load_str(CONFIG).unwrap();
        config.license.enterprise = enterprise;
        let authorizer = Authorizer::from_config(&config.auth, &config.license).unwrap();
        let ctx = authorizer.context_for(token).await;
        evaluate(&ctx, resource, action, env.map(EnvironmentId))
    }

    #[tokio::test]
    async fn test_operator_may_deploy() {
        let checked = report(false, Some("t-olga"), Resource::Stacks, Action::Deploy, Some(1)).await;
        assert!(checked.allowed);
        assert_eq!(checked.actor.as_deref(), Some("olga"));
        assert!(checked.denial.is_none());
    }

    #[tokio::test]
    async fn test_viewer_is_forbidden() {
        let checked = report(false, Some("t-vera"), Resource::Stacks, Action::Deploy, Some(1)).await;
        assert!(!checked.allowed);
        assert_eq!(checked.denial.unwrap().code, "forbidden");
    }

    #[tokio::test]
    async fn test_unassigned_environment_denied_with_enterprise() {
        let other = report(true, Some("t-olga"), Resource::Stacks, Action::Deploy, Some(2)).await;
        assert!(!other.allowed);
        assert!(other.enterprise);
        assert_eq!(other.denial.unwrap().code, "environment_denied");

        let assigned = report(true, Some("t-olga"), Resource::Stacks, Action::Deploy, Some(1)).await;
        assert!(assigned.allowed);
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthenticated() {
        let checked = report(false, None, Resource::Containers, Action::View, Some(1)).await;
        assert!(!checked.allowed);
        assert!(checked.actor.is_none());
        assert_eq!(checked.denial.unwrap().code, "unauthenticated");
    }
}
