use super::{AuthMethod, require_fields};
use crate::client::VaultClient;
use crate::error::{AuthError, VaultError};
use crate::params::ParameterBag;
use async_trait::async_trait;

struct Identity {
    cert_pem: Vec<u8>,
    key_pem: Vec<u8>,
}

/// TLS client certificate login.
pub struct CertAuth {
    params: ParameterBag,
    identity: Option<Identity>,
}

impl CertAuth {
    pub const FIELDS: &'static [&'static str] =
        &["cert_auth_public_key", "cert_auth_private_key", "role_id", "mount_point"];
    const REQUIRED: &'static [&'static str] = &["cert_auth_public_key", "cert_auth_private_key"];

    pub fn new(params: ParameterBag) -> Self {
        Self { params, identity: None }
    }

    async fn read_pem(&self, name: &str) -> Result<Vec<u8>, AuthError> {
        let path = self.params.string(name).unwrap_or_default();
        tokio::fs::read(&path)
            .await
            .map_err(|e| AuthError::Certificate(format!("{path}: {e}")))
    }
}

#[async_trait]
impl AuthMethod for CertAuth {
    fn name(&self) -> &'static str {
        "cert"
    }

    fn auth_fields(&self) -> &'static [&'static str] {
        Self::FIELDS
    }

    async fn validate(&mut self) -> Result<(), AuthError> {
        require_fields(self.name(), &self.params, Self::REQUIRED)?;
        let cert_pem = self.read_pem("cert_auth_public_key").await?;
        let key_pem = self.read_pem("cert_auth_private_key").await?;
        self.identity = Some(Identity { cert_pem, key_pem });
        Ok(())
    }

    async fn authenticate(&self, client: &VaultClient) -> Result<(), VaultError> {
        let identity = self.identity.as_ref().ok_or(AuthError::NotValidated(self.name()))?;
        let name = self.params.string("role_id");
        let mount_point = self.params.string("mount_point");
        client
            .cert_login(
                &identity.cert_pem,
                &identity.key_pem,
                name.as_deref(),
                mount_point.as_deref(),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_requires_both_keys() {
        let mut auth = CertAuth::new(ParameterBag::parse(json!({"cert_auth_public_key": "/tmp/c.pem"})).unwrap());
        match auth.validate().await.unwrap_err() {
            AuthError::MissingFields { missing, .. } => assert_eq!(missing, vec!["cert_auth_private_key"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unreadable_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("cert.pem");
        std::fs::write(&cert, "-----BEGIN CERTIFICATE-----\n").unwrap();

        let params = ParameterBag::parse(json!({
            "cert_auth_public_key": cert.to_str().unwrap(),
            "cert_auth_private_key": dir.path().join("missing.pem").to_str().unwrap(),
        }))
        .unwrap();
        let mut auth = CertAuth::new(params);
        let err = auth.validate().await.unwrap_err();
        assert!(matches!(err, AuthError::Certificate(_)));
        assert!(err.to_string().contains("missing.pem"));
    }

    #[tokio::test]
    async fn test_validate_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("cert.pem");
        let key = dir.path().join("key.pem");
        std::fs::write(&cert, "cert").unwrap();
        std::fs::write(&key, "key").unwrap();

        let params = ParameterBag::parse(json!({
            "cert_auth_public_key": cert.to_str().unwrap(),
            "cert_auth_private_key": key.to_str().unwrap(),
        }))
        .unwrap();
        let mut auth = CertAuth::new(params);
        auth.validate().await.unwrap();
        let identity = auth.identity.as_ref().unwrap();
        assert_eq!(identity.cert_pem, b"cert");
        assert_eq!(identity.key_pem, b"key");
    }
}
