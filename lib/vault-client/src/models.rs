use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Token information from a login call
#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub token: String,
    pub accessor: Option<String>,
    pub policies: Vec<String>,
    pub lease_duration: Duration,
    pub renewable: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub(crate) auth: AuthData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthData {
    pub(crate) client_token: String,
    #[serde(default)]
    pub(crate) accessor: Option<String>,
    #[serde(default)]
    pub(crate) policies: Vec<String>,
    #[serde(default)]
    pub(crate) lease_duration: u64,
    #[serde(default)]
    pub(crate) renewable: bool,
}

impl From<AuthData> for TokenInfo {
    fn from(auth: AuthData) -> Self {
        Self {
            token: auth.client_token,
            accessor: auth.accessor,
            policies: auth.policies,
            lease_duration: Duration::from_secs(auth.lease_duration),
            renewable: auth.renewable,
        }
    }
}

/// A signed `sts:GetCallerIdentity` request, still in plain form.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedIdentityRequest {
    pub method: String,
    pub url: String,
    pub body: String,
    pub headers: BTreeMap<String, Vec<String>>,
}

/// Body of the `auth/aws/login` call.
#[derive(Debug, Clone, Serialize)]
pub struct AwsIamLoginRequest {
    pub iam_http_request_method: String,
    pub iam_request_url: String,
    pub iam_request_body: String,
    pub iam_request_headers: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}
