//! Module argument loading.
//!
//! Arguments arrive as a JSON object, either in the file named by the first
//! command line argument or on stdin, optionally wrapped in
//! `ANSIBLE_MODULE_ARGS`. Framework keys (`_ansible_*`) are removed before
//! the rest becomes a [`ParameterBag`].

use crate::error::ModuleError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::Path;
use tokio::io::AsyncReadExt;
use vault_client::ParameterBag;

const WRAPPER_KEY: &str = "ANSIBLE_MODULE_ARGS";
const CHECK_MODE_KEY: &str = "_ansible_check_mode";
const FRAMEWORK_PREFIX: &str = "_ansible_";

#[derive(Debug, Clone)]
pub struct ModuleInvocation {
    pub params: ParameterBag,
    pub check_mode: bool,
}

impl ModuleInvocation {
    pub fn from_json(value: Value) -> Result<Self, ModuleError> {
        let mut value = match value {
            Value::Object(mut map) => match map.remove(WRAPPER_KEY) {
                Some(inner) => inner,
                None => Value::Object(map),
            },
            other => other,
        };

        let mut check_mode = false;
        if let Value::Object(map) = &mut value {
            check_mode = map.get(CHECK_MODE_KEY).and_then(Value::as_bool).unwrap_or(false);
            map.retain(|key, _| !key.starts_with(FRAMEWORK_PREFIX));
        }

        Ok(Self {
            params: ParameterBag::parse(value)?,
            check_mode,
        })
    }

    pub fn parse(input: &str) -> Result<Self, ModuleError> {
        Self::from_json(serde_json::from_str(input).map_err(ModuleError::ArgsJson)?)
    }

    /// Read arguments from `path`, or from stdin when there is none.
    pub async fn load(path: Option<&Path>) -> Result<Self, ModuleError> {
        let input = match path {
            Some(path) => tokio::fs::read_to_string(path).await.map_err(ModuleError::ReadArgs)?,
            None => {
                let mut input = String::new();
                tokio::io::stdin()
                    .read_to_string(&mut input)
                    .await
                    .map_err(ModuleError::ReadArgs)?;
                input
            }
        };
        Self::parse(&input)
    }

    /// Deserialize the module's own arguments once `required` are all present.
    pub fn args<T: DeserializeOwned>(&self, required: &[&'static str]) -> Result<T, ModuleError> {
        let missing = self.params.missing(required);
        if !missing.is_empty() {
            return Err(ModuleError::MissingArguments(missing));
        }
        self.params
            .deserialize()
            .map_err(|e| ModuleError::InvalidArgument(e.to_string()))
    }
}

/// Accept strings, numbers and booleans for `str` arguments.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string, got {other}"
        ))),
    }
}

/// Like [`lenient_string`], with `null` read as unset.
pub(crate) fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        value => lenient_string(value).map(Some).map_err(serde::de::Error::custom),
    }
}
