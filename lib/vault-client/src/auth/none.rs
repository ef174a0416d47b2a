use super::AuthMethod;
use crate::client::VaultClient;
use crate::error::{AuthError, VaultError};
use async_trait::async_trait;

/// Leaves the client without a token.
#[derive(Debug, Default)]
pub struct NoneAuth;

#[async_trait]
impl AuthMethod for NoneAuth {
    fn name(&self) -> &'static str {
        "none"
    }

    fn auth_fields(&self) -> &'static [&'static str] {
        &[]
    }

    async fn validate(&mut self) -> Result<(), AuthError> {
        Ok(())
    }

    async fn authenticate(&self, _client: &VaultClient) -> Result<(), VaultError> {
        Ok(())
    }
}
