use super::{
    AppRoleAuth, AuthMethod, AwsCredentialSource, AwsIamAuth, AzureAuth, CertAuth, DefaultCredentialSource,
    Environ, JwtAuth, NoneAuth, PasswordAuth, TokenAuth,
};
use crate::client::VaultClient;
use crate::error::{AuthError, VaultError};
use crate::params::{AuthMethodKind, ParameterBag};
use std::sync::Arc;

/// Selects the login strategy named by `auth_method` and drives it.
///
/// The strategy is built on first use and reused afterwards, so whatever
/// `validate` resolved is still there for `authenticate`.
pub struct Authenticator {
    params: ParameterBag,
    environ: Environ,
    aws_credentials: Arc<dyn AwsCredentialSource>,
    authenticator: Option<Box<dyn AuthMethod>>,
}

impl Authenticator {
    pub fn new(params: ParameterBag) -> Self {
        Self {
            params,
            environ: std::env::vars().collect(),
            aws_credentials: Arc::new(DefaultCredentialSource::default()),
            authenticator: None,
        }
    }

    pub fn with_environ(mut self, environ: Environ) -> Self {
        self.environ = environ;
        self
    }

    pub fn with_aws_credential_source(mut self, source: Arc<dyn AwsCredentialSource>) -> Self {
        self.aws_credentials = source;
        self
    }

    pub fn kind(&self) -> AuthMethodKind {
        self.params.auth_method()
    }

    fn construct(&self, kind: AuthMethodKind) -> Box<dyn AuthMethod> {
        let params = self.params.clone();
        match kind {
            AuthMethodKind::Token => Box::new(TokenAuth::new(params, self.environ.clone())),
            AuthMethodKind::Userpass => Box::new(PasswordAuth::userpass(params)),
            AuthMethodKind::Ldap => Box::new(PasswordAuth::ldap(params)),
            AuthMethodKind::Approle => Box::new(AppRoleAuth::new(params)),
            AuthMethodKind::AwsIam => Box::new(AwsIamAuth::new(params, Arc::clone(&self.aws_credentials))),
            AuthMethodKind::Azure => Box::new(AzureAuth::new(params, self.environ.clone())),
            AuthMethodKind::Jwt => Box::new(JwtAuth::new(params)),
            AuthMethodKind::Cert => Box::new(CertAuth::new(params)),
            AuthMethodKind::None => Box::new(NoneAuth),
        }
    }

    pub fn get_authenticator(&mut self) -> &mut dyn AuthMethod {
        let method = match self.authenticator.take() {
            Some(method) => method,
            None => {
                let kind = self.kind();
                tracing::debug!(auth_method = %kind, "Constructing authentication method");
                self.construct(kind)
            }
        };
        self.authenticator.insert(method).as_mut()
    }

    pub async fn validate(&mut self) -> Result<(), AuthError> {
        self.get_authenticator().validate().await
    }

    pub async fn authenticate(&mut self, client: &VaultClient) -> Result<(), VaultError> {
        self.get_authenticator().authenticate(client).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn authenticator(params: serde_json::Value) -> Authenticator {
        Authenticator::new(ParameterBag::parse(params).unwrap()).with_environ(Environ::new())
    }

    #[test]
    fn test_registry_covers_every_kind() {
        let mut auth = authenticator(json!({}));
        for kind in AuthMethodKind::ALL {
            assert_eq!(auth.construct(kind).name(), kind.as_str());
        }
        assert_eq!(auth.get_authenticator().name(), "token");
    }

    #[tokio::test]
    async fn test_strategy_is_memoized() {
        let mut auth = authenticator(json!({"auth_method": "token", "token": "abc"}));
        auth.validate().await.unwrap();

        // the resolved token survives because the same instance is reused
        let client = VaultClient::builder().base_url("http://vault:8200").build().unwrap();
        auth.authenticate(&client).await.unwrap();
        assert_eq!(client.token().await.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_validation_failure_is_forwarded() {
        let mut auth = authenticator(json!({"auth_method": "userpass", "username": "bob"}));
        let err = auth.validate().await.unwrap_err();
        assert!(matches!(err, AuthError::MissingFields { method: "userpass", .. }));
    }

    #[tokio::test]
    async fn test_environ_reaches_token_strategy() {
        let mut auth = Authenticator::new(ParameterBag::parse(json!({})).unwrap())
            .with_environ(Environ::from([("VAULT_TOKEN".to_string(), "from-env".to_string())]));
        auth.validate().await.unwrap();

        let client = VaultClient::builder().base_url("http://vault:8200").build().unwrap();
        auth.authenticate(&client).await.unwrap();
        assert_eq!(client.token().await.as_deref(), Some("from-env"));
    }
}
