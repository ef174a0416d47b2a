//! `vault_approle`: manage one AppRole role.

use super::{Existence, Outcome, State, as_map, overlay};
use crate::args::{ModuleInvocation, lenient_string};
use crate::connection::connect;
use crate::diff::get_keys_updated;
use crate::error::ModuleError;
use crate::result::ModuleResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use vault_client::VaultApi;

/// Attributes the role endpoint accepts under one name and reports under another.
const READ_NAMES: [(&str, &str); 1] = [("enable_local_secret_ids", "local_secret_ids")];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    #[default]
    Default,
    Batch,
    Service,
}

/// Role attributes, named as the server reports them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApproleAttributes {
    #[serde(default = "default_true")]
    pub bind_secret_id: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_id_bound_cidrs: Option<Vec<String>>,
    #[serde(default)]
    pub secret_id_num_uses: i64,
    #[serde(default = "zero", deserialize_with = "lenient_string")]
    pub secret_id_ttl: String,
    #[serde(default)]
    pub enable_local_secret_ids: bool,
    #[serde(default = "zero", deserialize_with = "lenient_string")]
    pub token_ttl: String,
    #[serde(default = "zero", deserialize_with = "lenient_string")]
    pub token_max_ttl: String,
    #[serde(default)]
    pub token_policies: Vec<String>,
    #[serde(default)]
    pub token_bound_cidrs: Vec<String>,
    #[serde(default = "zero", deserialize_with = "lenient_string")]
    pub token_explicit_max_ttl: String,
    #[serde(default)]
    pub token_no_default_policy: bool,
    #[serde(default)]
    pub token_num_uses: i64,
    #[serde(default = "zero", deserialize_with = "lenient_string")]
    pub token_period: String,
    #[serde(default)]
    pub token_type: TokenType,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApproleArgs {
    pub name: String,
    #[serde(default = "default_mount_point")]
    pub mount_point: String,
    #[serde(default)]
    pub state: State,
    #[serde(flatten)]
    pub attributes: ApproleAttributes,
}

fn default_true() -> bool {
    true
}

fn zero() -> String {
    "0".to_string()
}

fn default_mount_point() -> String {
    "approle".to_string()
}

impl ApproleArgs {
    pub fn from_invocation(invocation: &ModuleInvocation) -> Result<Self, ModuleError> {
        invocation.args(&["name"])
    }

    /// Body of the role write, with the names the write endpoint accepts.
    pub fn write_payload(&self) -> Result<Map<String, Value>, ModuleError> {
        let value = serde_json::to_value(&self.attributes).map_err(|e| ModuleError::InvalidArgument(e.to_string()))?;
        Ok(as_map(&value))
    }

    /// Desired state keyed the way the server reports a role on read.
    pub fn desired_state(&self) -> Result<Map<String, Value>, ModuleError> {
        let mut desired = self.write_payload()?;
        for (written, reported) in READ_NAMES {
            if let Some(value) = desired.remove(written) {
                desired.insert(reported.to_string(), value);
            }
        }
        Ok(desired)
    }
}

pub async fn run(invocation: ModuleInvocation) -> Result<ModuleResult, ModuleError> {
    let args = ApproleArgs::from_invocation(&invocation)?;
    let api = connect(&invocation.params).await?;
    reconcile(api.as_ref(), &args, invocation.check_mode).await
}

#[tracing::instrument(skip_all, fields(name = %args.name, mount_point = %args.mount_point, check_mode = check_mode))]
pub async fn reconcile(api: &dyn VaultApi, args: &ApproleArgs, check_mode: bool) -> Result<ModuleResult, ModuleError> {
    let name = args.name.as_str();
    let mount_point = args.mount_point.as_str();
    let existence = Existence::probe(api.read_role(name, mount_point).await)?;
    let desired = args.desired_state()?;
    let payload = args.write_payload()?;

    let (outcome, current) = match (args.state, existence) {
        (State::Present, Existence::Absent) => (Outcome::Created, None),
        (State::Present, Existence::Present(current)) => {
            let changes = get_keys_updated(&desired, &as_map(&current), &[]);
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
            Outcome::Created | Outcome::Updated(_) => {
                tracing::info!("Writing AppRole");
                api.create_or_update_approle(name, mount_point, &payload).await?;
            }
            Outcome::Deleted => {
                tracing::info!("Deleting AppRole");
                api.delete_role(name, mount_point).await?;
            }
            Outcome::NoOp => {}
        }
    }

    let changes = match &outcome {
        Outcome::Updated(changes) => Some(changes.clone()),
        _ => None,
    };
    let result = match outcome {
        Outcome::Created | Outcome::Updated(_) => {
            let approle = if check_mode {
                overlay(current.as_ref().unwrap_or(&Value::Null), &desired)
            } else {
                api.read_role(name, mount_point).await?
            };
            let result = ModuleResult::changed(format!("Successfully created or updated the approle {name}"))
                .with_approle(Some(approle));
            match changes {
                Some(changes) => result.with_changes(changes),
                None => result,
            }
        }
        Outcome::Deleted => {
            ModuleResult::changed(format!("Successfully deleted approle {name}")).with_approle(current)
        }
        Outcome::NoOp if args.state == State::Present => {
            ModuleResult::unchanged(format!("No changes to approle {name}")).with_approle(current)
        }
        Outcome::NoOp => ModuleResult::unchanged(format!("AppRole {name} deleted or does not exist")),
    };
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> ApproleArgs {
        ApproleArgs::from_invocation(&ModuleInvocation::from_json(value).unwrap()).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = args(json!({"name": "ci", "url": "http://vault:8200"}));
        assert_eq!(args.mount_point, "approle");
        assert_eq!(args.state, State::Present);
        assert_eq!(
            Value::Object(args.desired_state().unwrap()),
            json!({
                "bind_secret_id": true,
                "secret_id_num_uses": 0,
                "secret_id_ttl": "0",
                "local_secret_ids": false,
                "token_ttl": "0",
                "token_max_ttl": "0",
                "token_policies": [],
                "token_bound_cidrs": [],
                "token_explicit_max_ttl": "0",
                "token_no_default_policy": false,
                "token_num_uses": 0,
                "token_period": "0",
                "token_type": "default",
            })
        );
    }

    #[test]
    fn test_local_secret_ids_is_renamed() {
        let args = args(json!({"name": "ci", "enable_local_secret_ids": true}));
        let desired = args.desired_state().unwrap();
        assert_eq!(desired["local_secret_ids"], true);
        assert!(!desired.contains_key("enable_local_secret_ids"));
    }

    #[test]
    fn test_write_payload_uses_endpoint_name() {
        let args = args(json!({"name": "ci", "enable_local_secret_ids": true}));
        let payload = args.write_payload().unwrap();
        assert_eq!(payload["enable_local_secret_ids"], true);
        assert!(!payload.contains_key("local_secret_ids"));
        assert_eq!(payload.len(), args.desired_state().unwrap().len());
    }

    #[test]
    fn test_bound_cidrs_only_when_set() {
        let args = args(json!({"name": "ci", "secret_id_bound_cidrs": ["10.0.0.0/8"], "token_ttl": 300}));
        let desired = args.desired_state().unwrap();
        assert_eq!(desired["secret_id_bound_cidrs"], json!(["10.0.0.0/8"]));
        assert_eq!(desired["token_ttl"], "300");
    }

    #[test]
    fn test_name_required() {
        let invocation = ModuleInvocation::from_json(json!({"url": "http://vault:8200"})).unwrap();
        let err = ApproleArgs::from_invocation(&invocation).unwrap_err();
        assert_eq!(err.to_string(), "missing required arguments: name");
    }

    #[test]
    fn test_unknown_token_type() {
        let invocation = ModuleInvocation::from_json(json!({"name": "ci", "token_type": "magic"})).unwrap();
        assert!(matches!(
            ApproleArgs::from_invocation(&invocation),
            Err(ModuleError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_auth_mount_point_is_not_defaulted() {
        let invocation = ModuleInvocation::from_json(json!({"name": "ci"})).unwrap();
        assert_eq!(ApproleArgs::from_invocation(&invocation).unwrap().mount_point, "approle");
        assert!(!invocation.params.is_set("mount_point"));
    }
}
