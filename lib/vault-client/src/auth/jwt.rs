use super::{AuthMethod, require_fields};
use crate::client::VaultClient;
use crate::error::{AuthError, VaultError};
use crate::params::ParameterBag;
use async_trait::async_trait;

pub struct JwtAuth {
    params: ParameterBag,
    validated: bool,
}

impl JwtAuth {
    pub const FIELDS: &'static [&'static str] = &["jwt", "role_id", "mount_point"];
    const REQUIRED: &'static [&'static str] = &["jwt", "role_id"];

    pub fn new(params: ParameterBag) -> Self {
        Self {
            params,
            validated: false,
        }
    }
}

#[async_trait]
impl AuthMethod for JwtAuth {
    fn name(&self) -> &'static str {
        "jwt"
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
        let (Some(jwt), Some(role), true) = (
            self.params.string("jwt"),
            self.params.string("role_id"),
            self.validated,
        ) else {
            return Err(AuthError::NotValidated(self.name()).into());
        };

        // the mount point travels as the login path
        let path = self.params.string("mount_point");
        client.jwt_login(&role, &jwt, path.as_deref()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_requires_jwt_and_role() {
        let mut auth = JwtAuth::new(ParameterBag::parse(json!({"jwt": "eyJ"})).unwrap());
        match auth.validate().await.unwrap_err() {
            AuthError::MissingFields { required, missing, .. } => {
                assert_eq!(required, vec!["jwt", "role_id"]);
                assert_eq!(missing, vec!["role_id"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_validate_ok() {
        let mut auth = JwtAuth::new(ParameterBag::parse(json!({"jwt": "eyJ", "role_id": "ci"})).unwrap());
        assert!(auth.validate().await.is_ok());
    }
}
