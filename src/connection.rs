use crate::error::ModuleError;
use serde::Deserialize;
use std::time::Duration;
use vault_client::auth::{AppRoleClient, Authenticator};
use vault_client::{AuthError, AuthMethodKind, ParameterBag, VaultApi, VaultClient};

/// Options describing how to reach the server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConnectionOptions {
    pub url: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default = "default_validate_certs")]
    pub validate_certs: bool,
    /// Seconds
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub approle_relogin: bool,
}

fn default_validate_certs() -> bool {
    true
}

impl ConnectionOptions {
    pub fn from_params(params: &ParameterBag) -> Result<Self, ModuleError> {
        let missing = params.missing(&["url"]);
        if !missing.is_empty() {
            return Err(ModuleError::MissingArguments(missing));
        }
        params
            .deserialize()
            .map_err(|e| ModuleError::InvalidArgument(e.to_string()))
    }

    pub fn client(&self) -> Result<VaultClient, ModuleError> {
        let mut builder = VaultClient::builder()
            .base_url(&self.url)
            .validate_certs(self.validate_certs);
        if let Some(namespace) = &self.namespace {
            builder = builder.namespace(namespace);
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(Duration::from_secs(timeout));
        }
        Ok(builder.build()?)
    }
}

/// Build an authenticated client for `params`.
pub async fn connect(params: &ParameterBag) -> Result<Box<dyn VaultApi>, ModuleError> {
    connect_with(params, Authenticator::new(params.clone())).await
}

/// Like [`connect`], with a caller-provided authenticator.
///
/// With `auth_method=approle` and `approle_relogin` set, the returned client
/// logs in again before every call instead of once up front.
pub async fn connect_with(
    params: &ParameterBag,
    mut authenticator: Authenticator,
) -> Result<Box<dyn VaultApi>, ModuleError> {
    let options = ConnectionOptions::from_params(params)?;
    let client = options.client()?;
    authenticator.validate().await?;

    if options.approle_relogin && authenticator.kind() == AuthMethodKind::Approle {
        let login = authenticator
            .get_authenticator()
            .approle_login()
            .cloned()
            .ok_or(AuthError::NotValidated("approle"))?;
        tracing::debug!(url = %options.url, "Using AppRole relogin client");
        return Ok(Box::new(AppRoleClient::new(client, login)));
    }

    authenticator.authenticate(&client).await?;
    tracing::debug!(url = %options.url, auth_method = %authenticator.kind(), "Authenticated to Vault");
    Ok(Box::new(client))
}
