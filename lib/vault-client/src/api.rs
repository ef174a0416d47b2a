use crate::VaultError;
use crate::client::VaultClient;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Server calls the resource reconcilers are allowed to make.
///
/// Implemented by [`VaultClient`] directly and by
/// [`AppRoleClient`](crate::auth::AppRoleClient), which logs in again before
/// forwarding each call.
#[async_trait]
pub trait VaultApi: Send + Sync {
    async fn lookup_self(&self) -> Result<Value, VaultError>;

    async fn read_role(&self, name: &str, mount_point: &str) -> Result<Value, VaultError>;

    async fn list_roles(&self, mount_point: &str) -> Result<Vec<String>, VaultError>;

    async fn create_or_update_approle(
        &self,
        name: &str,
        mount_point: &str,
        attrs: &Map<String, Value>,
    ) -> Result<(), VaultError>;

    async fn delete_role(&self, name: &str, mount_point: &str) -> Result<(), VaultError>;

    async fn list_auth_methods(&self) -> Result<Map<String, Value>, VaultError>;

    async fn enable_auth_method(
        &self,
        method_type: &str,
        path: &str,
        description: Option<&str>,
        config: &Map<String, Value>,
    ) -> Result<(), VaultError>;

    async fn tune_auth_method(
        &self,
        path: &str,
        description: Option<&str>,
        config: &Map<String, Value>,
    ) -> Result<(), VaultError>;

    async fn disable_auth_method(&self, path: &str) -> Result<(), VaultError>;
}

#[async_trait]
impl VaultApi for VaultClient {
    async fn lookup_self(&self) -> Result<Value, VaultError> {
        VaultClient::lookup_self(self).await
    }

    async fn read_role(&self, name: &str, mount_point: &str) -> Result<Value, VaultError> {
        VaultClient::read_role(self, name, mount_point).await
    }

    async fn list_roles(&self, mount_point: &str) -> Result<Vec<String>, VaultError> {
        VaultClient::list_roles(self, mount_point).await
    }

    async fn create_or_update_approle(
        &self,
        name: &str,
        mount_point: &str,
        attrs: &Map<String, Value>,
    ) -> Result<(), VaultError> {
        VaultClient::create_or_update_approle(self, name, mount_point, attrs).await
    }

    async fn delete_role(&self, name: &str, mount_point: &str) -> Result<(), VaultError> {
        VaultClient::delete_role(self, name, mount_point).await
    }

    async fn list_auth_methods(&self) -> Result<Map<String, Value>, VaultError> {
        VaultClient::list_auth_methods(self).await
    }

    async fn enable_auth_method(
        &self,
        method_type: &str,
        path: &str,
        description: Option<&str>,
        config: &Map<String, Value>,
    ) -> Result<(), VaultError> {
        VaultClient::enable_auth_method(self, method_type, path, description, config).await
    }

    async fn tune_auth_method(
        &self,
        path: &str,
        description: Option<&str>,
        config: &Map<String, Value>,
    ) -> Result<(), VaultError> {
        VaultClient::tune_auth_method(self, path, description, config).await
    }

    async fn disable_auth_method(&self, path: &str) -> Result<(), VaultError> {
        VaultClient::disable_auth_method(self, path).await
    }
}
