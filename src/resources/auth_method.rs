//! `vault_auth_method`: manage one mounted authentication method.

use super::{Existence, Outcome, State, as_map, overlay};
use crate::args::{ModuleInvocation, lenient_opt_string};
use crate::connection::connect;
use crate::diff::get_keys_updated;
use crate::error::ModuleError;
use crate::result::ModuleResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;
use vault_client::VaultApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodType {
    Approle,
    Aws,
    Azure,
    Cert,
    Jwt,
    Kubernetes,
    Ldap,
    Oidc,
    Token,
    Userpass,
}

impl MethodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approle => "approle",
            Self::Aws => "aws",
            Self::Azure => "azure",
            Self::Cert => "cert",
            Self::Jwt => "jwt",
            Self::Kubernetes => "kubernetes",
            Self::Ldap => "ldap",
            Self::Oidc => "oidc",
            Self::Token => "token",
            Self::Userpass => "userpass",
        }
    }
}

impl fmt::Display for MethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tunable mount settings. Unset values are neither compared nor sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MountConfig {
    #[serde(default, deserialize_with = "lenient_opt_string", skip_serializing_if = "Option::is_none")]
    pub default_lease_ttl: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string", skip_serializing_if = "Option::is_none")]
    pub max_lease_ttl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_non_hmac_request_keys: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_non_hmac_response_keys: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_visibility: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passthrough_request_headers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_response_headers: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_opt_string", skip_serializing_if = "Option::is_none")]
    pub plugin_version: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string", skip_serializing_if = "Option::is_none")]
    pub identity_token_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthMethodArgs {
    pub method_type: MethodType,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub description: Option<String>,
    #[serde(default)]
    pub config: MountConfig,
    #[serde(default)]
    pub state: State,
}

impl AuthMethodArgs {
    pub fn from_invocation(invocation: &ModuleInvocation) -> Result<Self, ModuleError> {
        invocation.args(&["method_type"])
    }

    /// Mount path, always with a trailing slash.
    pub fn mount_path(&self) -> String {
        let path = match &self.path {
            Some(path) if !path.trim_matches('/').is_empty() => path.trim_start_matches('/').to_string(),
            _ => self.method_type.as_str().to_string(),
        };
        if path.ends_with('/') { path } else { format!("{path}/") }
    }

    pub fn desired_config(&self) -> Result<Map<String, Value>, ModuleError> {
        let value = serde_json::to_value(&self.config).map_err(|e| ModuleError::InvalidArgument(e.to_string()))?;
        Ok(as_map(&value))
    }
}

pub async fn run(invocation: ModuleInvocation) -> Result<ModuleResult, ModuleError> {
    let args = AuthMethodArgs::from_invocation(&invocation)?;
    let api = connect(&invocation.params).await?;
    reconcile(api.as_ref(), &args, invocation.check_mode).await
}

/// Keys that need a tune call: `description` when it differs, then config keys.
fn pending_changes(args: &AuthMethodArgs, config: &Map<String, Value>, current: &Value) -> Vec<String> {
    let mut changes = Vec::new();
    if let Some(description) = &args.description {
        if current.get("description").and_then(Value::as_str) != Some(description.as_str()) {
            changes.push("description".to_string());
        }
    }
    let current_config = current.get("config").map(as_map).unwrap_or_default();
    changes.extend(
        get_keys_updated(config, &current_config, &[])
            .into_iter()
            .map(|key| format!("config.{key}")),
    );
    changes
}

#[tracing::instrument(skip_all, fields(method_type = %args.method_type, check_mode = check_mode))]
pub async fn reconcile(
    api: &dyn VaultApi,
    args: &AuthMethodArgs,
    check_mode: bool,
) -> Result<ModuleResult, ModuleError> {
    let path = args.mount_path();
    let description = args.description.as_deref();
    let config = args.desired_config()?;

    let existence = match api.list_auth_methods().await?.remove(&path) {
        Some(mount) => Existence::Present(mount),
        None => Existence::Absent,
    };

    let (outcome, current) = match (args.state, existence) {
        (State::Present, Existence::Absent) => (Outcome::Created, None),
        (State::Present, Existence::Present(current)) => {
            let changes = pending_changes(args, &config, &current);
            if changes.is_empty() {
                (Outcome::NoOp, Some(current))
            } else {
                (Outcome::Updated(changes), Some(current))
            }
        }
        (State::Absent, Existence::Present(current)) => (Outcome::Deleted, Some(current)),
        (State::Absent, Existence::Absent) => (Outcome::NoOp, None),
    };

    if !check_mode {
        match &outcome {
            Outcome::Created => {
                tracing::info!(path = %path, "Enabling authentication method");
                api.enable_auth_method(args.method_type.as_str(), &path, description, &config)
                    .await?;
            }
            Outcome::Updated(changes) => {
                tracing::info!(path = %path, ?changes, "Tuning authentication method");
                api.tune_auth_method(&path, description, &config).await?;
            }
            Outcome::Deleted => {
                tracing::info!(path = %path, "Disabling authentication method");
                api.disable_auth_method(&path).await?;
            }
            Outcome::NoOp => {}
        }
    }

    let result = match outcome {
        Outcome::Created | Outcome::Updated(_) => {
            let auth_method = if check_mode {
                let mut desired = Map::new();
                desired.insert("type".to_string(), json!(args.method_type));
                if let Some(description) = description {
                    desired.insert("description".to_string(), json!(description));
                }
                desired.insert("config".to_string(), Value::Object(config));
                Some(overlay(current.as_ref().unwrap_or(&Value::Null), &desired))
            } else {
                api.list_auth_methods().await?.remove(&path)
            };
            ModuleResult::changed(format!("Successfully created or updated the authentication method {path}"))
                .with_auth_method(auth_method)
        }
        Outcome::Deleted => ModuleResult::changed(format!("Successfully deleted authentication method {path}"))
            .with_auth_method(current),
        Outcome::NoOp if args.state == State::Present => {
            ModuleResult::unchanged(format!("No changes to authentication method {path}")).with_auth_method(current)
        }
        Outcome::NoOp => ModuleResult::unchanged(format!("Authentication method {path} deleted or does not exist")),
    };
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: Value) -> AuthMethodArgs {
        AuthMethodArgs::from_invocation(&ModuleInvocation::from_json(value).unwrap()).unwrap()
    }

    #[test]
    fn test_default_path() {
        assert_eq!(args(json!({"method_type": "approle"})).mount_path(), "approle/");
        assert_eq!(args(json!({"method_type": "userpass", "path": ""})).mount_path(), "userpass/");
    }

    #[test]
    fn test_path_is_normalized() {
        assert_eq!(args(json!({"method_type": "approle", "path": "ci"})).mount_path(), "ci/");
        assert_eq!(args(json!({"method_type": "approle", "path": "ci/"})).mount_path(), "ci/");
        assert_eq!(args(json!({"method_type": "approle", "path": "/teams/ci"})).mount_path(), "teams/ci/");
    }

    #[test]
    fn test_unknown_config_key_rejected() {
        let invocation =
            ModuleInvocation::from_json(json!({"method_type": "approle", "config": {"bogus": 1}})).unwrap();
        let err = AuthMethodArgs::from_invocation(&invocation).unwrap_err();
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn test_unknown_method_type_rejected() {
        let invocation = ModuleInvocation::from_json(json!({"method_type": "github"})).unwrap();
        assert!(AuthMethodArgs::from_invocation(&invocation).is_err());
    }

    #[test]
    fn test_method_type_required() {
        let invocation = ModuleInvocation::from_json(json!({"path": "ci/"})).unwrap();
        let err = AuthMethodArgs::from_invocation(&invocation).unwrap_err();
        assert_eq!(err.to_string(), "missing required arguments: method_type");
    }

    #[test]
    fn test_config_drops_unset_values() {
        let args = args(json!({
            "method_type": "approle",
            "config": {"default_lease_ttl": 3600, "max_lease_ttl": null},
        }));
        assert_eq!(
            Value::Object(args.desired_config().unwrap()),
            json!({"default_lease_ttl": "3600"})
        );
    }

    #[test]
    fn test_pending_changes() {
        let args = args(json!({
            "method_type": "approle",
            "description": "ci",
            "config": {"default_lease_ttl": "1h"},
        }));
        let config = args.desired_config().unwrap();

        let same = json!({"description": "ci", "config": {"default_lease_ttl": 3600, "max_lease_ttl": 0}});
        assert!(pending_changes(&args, &config, &same).is_empty());

        let different = json!({"description": "old", "config": {"default_lease_ttl": 60}});
        assert_eq!(
            pending_changes(&args, &config, &different),
            vec!["description", "config.default_lease_ttl"]
        );
    }

    #[test]
    fn test_unset_description_is_not_compared() {
        let args = args(json!({"method_type": "token"}));
        let current = json!({"description": "token based credentials", "config": {}});
        assert!(pending_changes(&args, &Map::new(), &current).is_empty());
    }
}
