use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const ALIASES: [(&str, &str); 3] = [
    ("boto_profile", "aws_profile"),
    ("aws_access_key_id", "aws_access_key"),
    ("aws_secret_access_key", "aws_secret_key"),
];

const DEFAULT_TOKEN_FILENAME: &str = ".vault-token";
const DEFAULT_AZURE_RESOURCE: &str = "https://management.azure.com/";

#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("module arguments must be a JSON object")]
    NotAnObject,

    #[error("value of auth_method must be one of: {choices}, got: {value}")]
    UnknownAuthMethod { value: String, choices: String },

    #[error("argument {name} is of type {found} and we were unable to convert to str")]
    NotAString { name: String, found: &'static str },

    #[error("{0}")]
    Invalid(#[from] serde_json::Error),
}

/// The closed set of login strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethodKind {
    Approle,
    AwsIam,
    Azure,
    Cert,
    Jwt,
    Ldap,
    #[default]
    Token,
    Userpass,
    None,
}

impl AuthMethodKind {
    pub const ALL: [AuthMethodKind; 9] = [
        Self::Approle,
        Self::AwsIam,
        Self::Azure,
        Self::Cert,
        Self::Jwt,
        Self::Ldap,
        Self::Token,
        Self::Userpass,
        Self::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approle => "approle",
            Self::AwsIam => "aws_iam",
            Self::Azure => "azure",
            Self::Cert => "cert",
            Self::Jwt => "jwt",
            Self::Ldap => "ldap",
            Self::Token => "token",
            Self::Userpass => "userpass",
            Self::None => "none",
        }
    }
}

impl fmt::Display for AuthMethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMethodKind {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ParamsError::UnknownAuthMethod {
                value: s.to_string(),
                choices: Self::ALL
                    .iter()
                    .map(AuthMethodKind::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// Module arguments after alias folding and default filling.
///
/// `null` values behave exactly like absent keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterBag {
    values: Map<String, Value>,
    auth_method: AuthMethodKind,
}

impl ParameterBag {
    pub fn parse(value: Value) -> Result<Self, ParamsError> {
        let Value::Object(mut map) = value else {
            return Err(ParamsError::NotAnObject);
        };

        for (alias, canonical) in ALIASES {
            if let Some(value) = map.remove(alias) {
                if !value.is_null() && map.get(canonical).is_none_or(Value::is_null) {
                    map.insert(canonical.to_string(), value);
                }
            }
        }

        // unknown strategies are rejected before anything consumes the bag
        let auth_method = match map.get("auth_method") {
            None | Some(Value::Null) => AuthMethodKind::default(),
            Some(Value::String(s)) => s.parse()?,
            Some(other) => {
                return Err(ParamsError::NotAString {
                    name: "auth_method".to_string(),
                    found: json_type(other),
                });
            }
        };

        let mut bag = Self {
            values: map,
            auth_method,
        };
        bag.fill_default("auth_method", Value::from(auth_method.as_str()));
        bag.fill_default("token_filename", Value::from(DEFAULT_TOKEN_FILENAME));
        bag.fill_default("token_validate", Value::Bool(false));
        bag.fill_default("azure_resource", Value::from(DEFAULT_AZURE_RESOURCE));
        Ok(bag)
    }

    fn fill_default(&mut self, name: &str, value: Value) {
        if self.get(name).is_none() {
            self.values.insert(name.to_string(), value);
        }
    }

    pub fn auth_method(&self) -> AuthMethodKind {
        self.auth_method
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).filter(|v| !v.is_null())
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// String view of a scalar option. Numbers and booleans are rendered.
    pub fn string(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn bool(&self, name: &str) -> bool {
        match self.get(name) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => matches!(s.to_lowercase().as_str(), "true" | "yes" | "on" | "1"),
            _ => false,
        }
    }

    /// Fields from `fields` that are absent, preserving order.
    pub fn missing(&self, fields: &[&'static str]) -> Vec<&'static str> {
        fields.iter().copied().filter(|f| !self.is_set(f)).collect()
    }

    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ParamsError> {
        let value = Value::Object(
            self.values
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        );
        Ok(serde_json::from_value(value)?)
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
