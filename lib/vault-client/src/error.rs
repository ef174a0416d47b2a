use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Vault url is not set")]
    UrlNotSet,

    #[error("Vault path not found: {path}")]
    NotFound { path: String },

    #[error("Vault client error ({status}): {message}")]
    ClientError {
        status: u16,
        message: String,
        response_data: Option<serde_json::Value>,
    },

    #[error("Vault request error: {0}")]
    RequestError(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VaultError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<reqwest::Error> for VaultError {
    fn from(err: reqwest::Error) -> Self {
        Self::RequestError(err.to_string())
    }
}

/// Failures raised while validating credentials or logging in.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(
        "Authentication method {method} requires options {required:?} to be set, but these are missing: {missing:?}"
    )]
    MissingFields {
        method: &'static str,
        required: Vec<&'static str>,
        missing: Vec<&'static str>,
    },

    #[error("The Vault token file '{0}' was found but is not a file.")]
    TokenFileNotAFile(String),

    #[error("Failed to read the Vault token file '{path}': {source}")]
    TokenFileRead {
        path: String,
        source: std::io::Error,
    },

    #[error("No Vault Token specified or discovered.")]
    NoToken,

    #[error("Token validation failed: {0}")]
    TokenValidation(String),

    #[error("The AWS profile '{0}' was not found.")]
    AwsProfileNotFound(String),

    #[error("No AWS credentials supplied or available.")]
    NoAwsCredentials,

    #[error("Failed to resolve AWS credentials: {0}")]
    AwsCredentials(String),

    #[error("Failed to sign the AWS identity request: {0}")]
    AwsSigning(String),

    #[error("role_id is required for azure authentication.")]
    AzureRoleRequired,

    #[error("azure_tenant_id is required when using azure service principal.")]
    AzureTenantRequired,

    #[error("Failed to obtain an Azure access token: {0}")]
    AzureToken(String),

    #[error("Failed to load client certificate: {0}")]
    Certificate(String),

    #[error("{library} is required for {purpose}.")]
    MissingDependency {
        library: &'static str,
        purpose: &'static str,
    },

    #[error("Authentication method {0} was used before it was validated")]
    NotValidated(&'static str),
}
