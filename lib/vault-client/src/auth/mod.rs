mod approle;
mod authenticator;
mod aws_iam;
mod azure;
mod cert;
mod jwt;
mod none;
mod password;
mod relogin;
mod token;

pub use approle::{AppRoleAuth, AppRoleLogin};
pub use authenticator::Authenticator;
pub use aws_iam::{AwsCredentialSource, AwsCredentials, AwsIamAuth, DefaultCredentialSource};
pub use azure::AzureAuth;
pub use cert::CertAuth;
pub use jwt::JwtAuth;
pub use none::NoneAuth;
pub use password::PasswordAuth;
pub use relogin::AppRoleClient;
pub use token::TokenAuth;

use crate::client::VaultClient;
use crate::error::{AuthError, VaultError};
use crate::params::ParameterBag;
use async_trait::async_trait;
use std::collections::HashMap;

/// Process environment as seen by the strategies.
pub type Environ = HashMap<String, String>;

/// A login strategy.
///
/// `validate` resolves and checks everything the login needs (reading files,
/// asking cloud providers for credentials); `authenticate` then performs the
/// login and leaves the client holding a token.
#[async_trait]
pub trait AuthMethod: Send + Sync {
    fn name(&self) -> &'static str;

    /// Options this strategy reads from the parameter bag.
    fn auth_fields(&self) -> &'static [&'static str];

    async fn validate(&mut self) -> Result<(), AuthError>;

    async fn authenticate(&self, client: &VaultClient) -> Result<(), VaultError>;

    /// AppRole credentials resolved by `validate`, for strategies that have them.
    fn approle_login(&self) -> Option<&AppRoleLogin> {
        None
    }
}

pub(crate) fn require_fields(
    method: &'static str,
    params: &ParameterBag,
    required: &[&'static str],
) -> Result<(), AuthError> {
    let missing = params.missing(required);
    if missing.is_empty() {
        return Ok(());
    }
    Err(AuthError::MissingFields {
        method,
        required: required.to_vec(),
        missing,
    })
}
