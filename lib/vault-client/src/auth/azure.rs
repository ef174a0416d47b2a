use super::{AuthMethod, Environ};
use crate::client::VaultClient;
use crate::error::{AuthError, VaultError};
use crate::params::ParameterBag;
use async_trait::async_trait;
use serde::Deserialize;

const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
const DEFAULT_IMDS_HOST: &str = "http://169.254.169.254";
const IMDS_TOKEN_PATH: &str = "/metadata/identity/oauth2/token";
const IMDS_API_VERSION: &str = "2018-02-01";

#[derive(Debug, Clone, PartialEq, Eq)]
enum AzureCredential {
    ClientSecret {
        tenant_id: String,
        client_id: String,
        client_secret: String,
    },
    /// System-assigned when `client_id` is `None`.
    ManagedIdentity { client_id: Option<String> },
}

#[derive(Debug, Deserialize)]
struct AccessToken {
    access_token: String,
}

/// Azure login with a caller-supplied JWT or a token fetched from Azure AD.
pub struct AzureAuth {
    params: ParameterBag,
    environ: Environ,
    jwt: Option<String>,
}

impl AzureAuth {
    pub const FIELDS: &'static [&'static str] = &[
        "role_id",
        "jwt",
        "mount_point",
        "azure_tenant_id",
        "azure_client_id",
        "azure_client_secret",
        "azure_resource",
    ];

    pub fn new(params: ParameterBag, environ: Environ) -> Self {
        Self {
            params,
            environ,
            jwt: None,
        }
    }

    fn credential(&self) -> Result<AzureCredential, AuthError> {
        let client_id = self.params.string("azure_client_id");
        match (client_id, self.params.string("azure_client_secret")) {
            (Some(client_id), Some(client_secret)) => {
                let tenant_id = self
                    .params
                    .string("azure_tenant_id")
                    .ok_or(AuthError::AzureTenantRequired)?;
                Ok(AzureCredential::ClientSecret {
                    tenant_id,
                    client_id,
                    client_secret,
                })
            }
            (client_id, _) => Ok(AzureCredential::ManagedIdentity { client_id }),
        }
    }

    fn env_or(&self, name: &str, default: &str) -> String {
        self.environ
            .get(name)
            .filter(|value| !value.is_empty())
            .map(|value| value.trim_end_matches('/').to_string())
            .unwrap_or_else(|| default.to_string())
    }

    async fn fetch_token(&self, credential: &AzureCredential) -> Result<String, AuthError> {
        let resource = self.params.string("azure_resource").unwrap_or_default();
        let http = reqwest::Client::new();

        let request = match credential {
            AzureCredential::ClientSecret {
                tenant_id,
                client_id,
                client_secret,
            } => {
                let url = format!(
                    "{}/{tenant_id}/oauth2/v2.0/token",
                    self.env_or("AZURE_AUTHORITY_HOST", DEFAULT_AUTHORITY_HOST)
                );
                let scope = format!("{}/.default", resource.trim_end_matches('/'));
                http.post(url).form(&[
                    ("grant_type", "client_credentials"),
                    ("client_id", client_id.as_str()),
                    ("client_secret", client_secret.as_str()),
                    ("scope", scope.as_str()),
                ])
            }
            AzureCredential::ManagedIdentity { client_id } => {
                let url = format!(
                    "{}{IMDS_TOKEN_PATH}",
                    self.env_or("AZURE_POD_IDENTITY_AUTHORITY_HOST", DEFAULT_IMDS_HOST)
                );
                let mut query = vec![("api-version", IMDS_API_VERSION), ("resource", resource.as_str())];
                if let Some(client_id) = client_id {
                    query.push(("client_id", client_id.as_str()));
                }
                http.get(url).header("Metadata", "true").query(&query)
            }
        };

        let response = request
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AuthError::AzureToken(e.to_string()))?;
        let token: AccessToken = response
            .json()
            .await
            .map_err(|e| AuthError::AzureToken(e.to_string()))?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl AuthMethod for AzureAuth {
    fn name(&self) -> &'static str {
        "azure"
    }

    fn auth_fields(&self) -> &'static [&'static str] {
        Self::FIELDS
    }

    async fn validate(&mut self) -> Result<(), AuthError> {
        if !self.params.is_set("role_id") {
            return Err(AuthError::AzureRoleRequired);
        }

        let jwt = match self.params.string("jwt") {
            Some(jwt) => jwt,
            None => {
                let credential = self.credential()?;
                tracing::debug!(
                    service_principal = matches!(credential, AzureCredential::ClientSecret { .. }),
                    "Fetching Azure access token"
                );
                self.fetch_token(&credential).await?
            }
        };
        self.jwt = Some(jwt);
        Ok(())
    }

    async fn authenticate(&self, client: &VaultClient) -> Result<(), VaultError> {
        let (Some(jwt), Some(role)) = (self.jwt.as_deref(), self.params.string("role_id")) else {
            return Err(AuthError::NotValidated(self.name()).into());
        };
        let mount_point = self.params.string("mount_point");
        client.azure_login(&role, jwt, mount_point.as_deref()).await?;
        Ok(())
    }
}
