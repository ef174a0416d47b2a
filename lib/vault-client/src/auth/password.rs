use super::{AuthMethod, require_fields};
use crate::client::VaultClient;
use crate::error::{AuthError, VaultError};
use crate::params::ParameterBag;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    Userpass,
    Ldap,
}

/// Username and password login against a userpass or LDAP mount.
pub struct PasswordAuth {
    backend: Backend,
    params: ParameterBag,
    validated: bool,
}

impl PasswordAuth {
    pub const FIELDS: &'static [&'static str] = &["username", "password", "mount_point"];
    const REQUIRED: &'static [&'static str] = &["username", "password"];

    pub fn userpass(params: ParameterBag) -> Self {
        Self {
            backend: Backend::Userpass,
            params,
            validated: false,
        }
    }

    pub fn ldap(params: ParameterBag) -> Self {
        Self {
            backend: Backend::Ldap,
            params,
            validated: false,
        }
    }
}

#[async_trait]
impl AuthMethod for PasswordAuth {
    fn name(&self) -> &'static str {
        match self.backend {
            Backend::Userpass => "userpass",
            Backend::Ldap => "ldap",
        }
    }

    fn auth_fields(&self) -> &'static [&'static str] {
        Self::FIELDS
    }

    async fn validate(&mut self) -> Result<(), AuthError> {
        require_fields(self.name(), &self.params, Self::REQUIRED)?;
        self.validated = true;
        Ok(())
    }

    async fn authenticate(&self, client: &VaultClient) -> Result<(), VaultError> {
        let (Some(username), Some(password), true) = (
            self.params.string("username"),
            self.params.string("password"),
            self.validated,
        ) else {
            return Err(AuthError::NotValidated(self.name()).into());
        };
        let mount_point = self.params.string("mount_point");

        match self.backend {
            Backend::Userpass => {
                client
                    .userpass_login(&username, &password, mount_point.as_deref())
                    .await?
            }
            Backend::Ldap => {
                client
                    .ldap_login(&username, &password, mount_point.as_deref())
                    .await?
            }
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_userpass_requires_password() {
        let params = ParameterBag::parse(json!({"username": "bob"})).unwrap();
        let mut auth = PasswordAuth::userpass(params);
        let err = auth.validate().await.unwrap_err();
        match err {
            AuthError::MissingFields { method, missing, .. } => {
                assert_eq!(method, "userpass");
                assert_eq!(missing, vec!["password"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_ldap_requires_both() {
        let params = ParameterBag::parse(json!({})).unwrap();
        let mut auth = PasswordAuth::ldap(params);
        let err = auth.validate().await.unwrap_err();
        assert!(err.to_string().starts_with("Authentication method ldap requires"));
    }

    #[tokio::test]
    async fn test_unvalidated_login_is_rejected() {
        let params = ParameterBag::parse(json!({"username": "bob", "password": "pw"})).unwrap();
        let auth = PasswordAuth::userpass(params);
        let client = VaultClient::builder().base_url("http://vault:8200").build().unwrap();
        let err = auth.authenticate(&client).await.unwrap_err();
        assert!(matches!(err, VaultError::Auth(AuthError::NotValidated("userpass"))));
    }
}
