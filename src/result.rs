use serde::Serialize;
use serde_json::Value;

/// The JSON object a module prints on success.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModuleResult {
    pub changed: bool,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approle: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_method: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<Vec<String>>,
}

impl ModuleResult {
    pub fn changed(msg: impl Into<String>) -> Self {
        Self {
            changed: true,
            msg: msg.into(),
            ..Self::default()
        }
    }

    pub fn unchanged(msg: impl Into<String>) -> Self {
        Self {
            changed: false,
            msg: msg.into(),
            ..Self::default()
        }
    }

    pub fn with_approle(mut self, approle: Option<Value>) -> Self {
        self.approle = approle;
        self
    }

    pub fn with_auth_method(mut self, auth_method: Option<Value>) -> Self {
        self.auth_method = auth_method;
        self
    }

    pub fn with_changes(mut self, changes: Vec<String>) -> Self {
        self.changes = Some(changes);
        self
    }
}

/// The JSON object a module prints when it fails.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedResult {
    pub failed: bool,
    pub msg: String,
}

impl FailedResult {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            failed: true,
            msg: msg.into(),
        }
    }
}
