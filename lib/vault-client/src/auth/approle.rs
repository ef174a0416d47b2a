use super::{AuthMethod, require_fields};
use crate::client::VaultClient;
use crate::error::{AuthError, VaultError};
use crate::models::TokenInfo;
use crate::params::ParameterBag;
use async_trait::async_trait;

/// Resolved AppRole credentials.
///
/// Kept separate from [`AppRoleAuth`] so that
/// [`AppRoleClient`](super::AppRoleClient) can repeat the login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppRoleLogin {
    pub role_id: String,
    pub secret_id: Option<String>,
    pub mount_point: Option<String>,
}

impl AppRoleLogin {
    pub async fn login(&self, client: &VaultClient) -> Result<TokenInfo, VaultError> {
        client
            .approle_login(
                &self.role_id,
                self.secret_id.as_deref(),
                self.mount_point.as_deref(),
            )
            .await
    }
}

pub struct AppRoleAuth {
    params: ParameterBag,
    login: Option<AppRoleLogin>,
}

impl AppRoleAuth {
    pub const FIELDS: &'static [&'static str] = &["role_id", "secret_id", "mount_point"];
    const REQUIRED: &'static [&'static str] = &["role_id"];

    pub fn new(params: ParameterBag) -> Self {
        Self { params, login: None }
    }

    /// Credentials resolved by the last successful `validate`.
    pub fn login(&self) -> Option<&AppRoleLogin> {
        self.login.as_ref()
    }
}

#[async_trait]
impl AuthMethod for AppRoleAuth {
    fn name(&self) -> &'static str {
        "approle"
    }

    fn auth_fields(&self) -> &'static [&'static str] {
        Self::FIELDS
    }

    async fn validate(&mut self) -> Result<(), AuthError> {
        require_fields(self.name(), &self.params, Self::REQUIRED)?;
        let role_id = self
            .params
            .string("role_id")
            .ok_or(AuthError::NotValidated(self.name()))?;

        self.login = Some(AppRoleLogin {
            role_id,
            secret_id: self.params.string("secret_id"),
            mount_point: self.params.string("mount_point"),
        });
        Ok(())
    }

    async fn authenticate(&self, client: &VaultClient) -> Result<(), VaultError> {
        let login = self.login.as_ref().ok_or(AuthError::NotValidated(self.name()))?;
        login.login(client).await?;
        Ok(())
    }
    fn approle_login(&self) -> Option<&AppRoleLogin> {
        self.login()
    }
}
