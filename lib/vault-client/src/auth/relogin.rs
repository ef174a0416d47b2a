use super::AppRoleLogin;
use crate::api::VaultApi;
use crate::client::VaultClient;
use crate::error::VaultError;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// A client that performs a fresh AppRole login before every call.
///
/// Meant for long automation runs where a short-lived AppRole token may
/// expire between two calls.
pub struct AppRoleClient {
    client: VaultClient,
    login: AppRoleLogin,
}

impl AppRoleClient {
    pub fn new(client: VaultClient, login: AppRoleLogin) -> Self {
        Self { client, login }
    }

    pub fn inner(&self) -> &VaultClient {
        &self.client
    }

    async fn relogin(&self) -> Result<(), VaultError> {
        self.login.login(&self.client).await?;
        tracing::debug!(role_id = %self.login.role_id, "AppRole token refreshed");
        Ok(())
    }
}

#[async_trait]
impl VaultApi for AppRoleClient {
    async fn lookup_self(&self) -> Result<Value, VaultError> {
        self.relogin().await?;
        self.client.lookup_self().await
    }

    async fn read_role(&self, name: &str, mount_point: &str) -> Result<Value, VaultError> {
        self.relogin().await?;
        self.client.read_role(name, mount_point).await
    }

    async fn list_roles(&self, mount_point: &str) -> Result<Vec<String>, VaultError> {
        self.relogin().await?;
        self.client.list_roles(mount_point).await
    }

    async fn create_or_update_approle(
        &self,
        name: &str,
        mount_point: &str,
        attrs: &Map<String, Value>,
    ) -> Result<(), VaultError> {
        self.relogin().await?;
        self.client.create_or_update_approle(name, mount_point, attrs).await
    }

    async fn delete_role(&self, name: &str, mount_point: &str) -> Result<(), VaultError> {
        self.relogin().await?;
        self.client.delete_role(name, mount_point).await
    }

    async fn list_auth_methods(&self) -> Result<Map<String, Value>, VaultError> {
        self.relogin().await?;
        self.client.list_auth_methods().await
    }

    async fn enable_auth_method(
        &self,
        method_type: &str,
        path: &str,
        description: Option<&str>,
        config: &Map<String, Value>,
    ) -> Result<(), VaultError> {
        self.relogin().await?;
        self.client.enable_auth_method(method_type, path, description, config).await
    }

    async fn tune_auth_method(
        &self,
        path: &str,
        description: Option<&str>,
        config: &Map<String, Value>,
    ) -> Result<(), VaultError> {
        self.relogin().await?;
        self.client.tune_auth_method(path, description, config).await
    }

    async fn disable_auth_method(&self, path: &str) -> Result<(), VaultError> {
        self.relogin().await?;
        self.client.disable_auth_method(path).await
    }
}
