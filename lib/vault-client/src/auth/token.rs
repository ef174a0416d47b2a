use super::{AuthMethod, Environ};
use crate::client::VaultClient;
use crate::error::{AuthError, VaultError};
use crate::params::ParameterBag;
use async_trait::async_trait;
use std::io;
use std::path::PathBuf;

const TOKEN_ENV_VARS: [&str; 2] = ["ANSIBLE_HASHI_VAULT_TOKEN", "VAULT_TOKEN"];

/// Bearer token supplied directly, through the environment or from a file.
pub struct TokenAuth {
    params: ParameterBag,
    environ: Environ,
    token: Option<String>,
}

impl TokenAuth {
    pub const FIELDS: &'static [&'static str] = &["token", "token_path", "token_filename", "token_validate"];

    pub fn new(params: ParameterBag, environ: Environ) -> Self {
        Self {
            params,
            environ,
            token: None,
        }
    }

    /// Token resolved by the last successful `validate`.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn from_environ(&self) -> Option<String> {
        TOKEN_ENV_VARS
            .iter()
            .filter_map(|name| self.environ.get(*name))
            .find(|value| !value.is_empty())
            .cloned()
    }

    async fn from_file(&self) -> Result<Option<String>, AuthError> {
        let (Some(dir), Some(filename)) = (self.params.string("token_path"), self.params.string("token_filename"))
        else {
            return Ok(None);
        };

        let path = PathBuf::from(dir).join(filename);
        let display = path.display().to_string();
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(AuthError::TokenFileRead { path: display, source }),
        };
        if !metadata.is_file() {
            return Err(AuthError::TokenFileNotAFile(display));
        }

        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| AuthError::TokenFileRead { path: display, source })?;
        Ok(Some(contents.trim().to_string()))
    }
}

#[async_trait]
impl AuthMethod for TokenAuth {
    fn name(&self) -> &'static str {
        "token"
    }

    fn auth_fields(&self) -> &'static [&'static str] {
        Self::FIELDS
    }

    async fn validate(&mut self) -> Result<(), AuthError> {
        let token = match self.params.string("token") {
            Some(token) => Some(token),
            None => match self.from_environ() {
                Some(token) => Some(token),
                None => self.from_file().await?,
            },
        };

        self.token = Some(token.ok_or(AuthError::NoToken)?);
        Ok(())
    }

    async fn authenticate(&self, client: &VaultClient) -> Result<(), VaultError> {
        let token = self.token.as_deref().ok_or(AuthError::NotValidated(self.name()))?;
        client.set_token(token).await;

        if self.params.bool("token_validate") {
            client
                .lookup_self()
                .await
                .map_err(|e| AuthError::TokenValidation(e.to_string()))?;
            tracing::debug!("Vault token validated");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn auth(params: serde_json::Value, environ: &[(&str, &str)]) -> TokenAuth {
        let environ = environ.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        TokenAuth::new(ParameterBag::parse(params).unwrap(), environ)
    }

    #[tokio::test]
    async fn test_explicit_token_wins() {
        let mut auth = auth(json!({"token": "explicit"}), &[("VAULT_TOKEN", "env")]);
        auth.validate().await.unwrap();
        assert_eq!(auth.token(), Some("explicit"));
    }

    #[tokio::test]
    async fn test_environment_precedence() {
        let mut auth = auth(
            json!({}),
            &[("VAULT_TOKEN", "vault"), ("ANSIBLE_HASHI_VAULT_TOKEN", "ansible")],
        );
        auth.validate().await.unwrap();
        assert_eq!(auth.token(), Some("ansible"));
    }

    #[tokio::test]
    async fn test_empty_environment_value_is_skipped() {
        let mut auth = auth(json!({}), &[("ANSIBLE_HASHI_VAULT_TOKEN", ""), ("VAULT_TOKEN", "vault")]);
        auth.validate().await.unwrap();
        assert_eq!(auth.token(), Some("vault"));
    }

    #[tokio::test]
    async fn test_token_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".vault-token"), "abc\n").unwrap();

        let mut auth = auth(json!({"token_path": dir.path().to_str().unwrap()}), &[]);
        auth.validate().await.unwrap();
        assert_eq!(auth.token(), Some("abc"));
    }

    #[tokio::test]
    async fn test_custom_token_filename() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("token"), "  xyz  ").unwrap();

        let mut auth = auth(
            json!({"token_path": dir.path().to_str().unwrap(), "token_filename": "token"}),
            &[],
        );
        auth.validate().await.unwrap();
        assert_eq!(auth.token(), Some("xyz"));
    }

    #[tokio::test]
    async fn test_token_file_is_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".vault-token")).unwrap();

        let mut auth = auth(json!({"token_path": dir.path().to_str().unwrap()}), &[]);
        let err = auth.validate().await.unwrap_err();
        assert!(matches!(err, AuthError::TokenFileNotAFile(_)));
        assert!(err.to_string().ends_with("was found but is not a file."));
    }

    #[tokio::test]
    async fn test_unreadable_token_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".vault-token"), [0xff, 0xfe, 0xfd]).unwrap();

        let mut auth = auth(json!({"token_path": dir.path().to_str().unwrap()}), &[]);
        let err = auth.validate().await.unwrap_err();
        assert!(matches!(err, AuthError::TokenFileRead { .. }));
        assert!(err.to_string().starts_with("Failed to read the Vault token file"));
    }

    #[tokio::test]
    async fn test_missing_token_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut auth = auth(json!({"token_path": dir.path().to_str().unwrap()}), &[]);
        let err = auth.validate().await.unwrap_err();
        assert_eq!(err.to_string(), "No Vault Token specified or discovered.");
    }

    #[tokio::test]
    async fn test_no_token() {
        let mut auth = auth(json!({}), &[]);
        assert!(matches!(auth.validate().await, Err(AuthError::NoToken)));
    }

    #[tokio::test]
    async fn test_authenticate_requires_validate() {
        let auth = auth(json!({"token": "t"}), &[]);
        let client = VaultClient::builder().base_url("http://vault:8200").build().unwrap();
        let err = auth.authenticate(&client).await.unwrap_err();
        assert!(matches!(err, VaultError::Auth(AuthError::NotValidated("token"))));
        assert!(client.token().await.is_none());
    }

    #[tokio::test]
    async fn test_authenticate_sets_token() {
        let mut auth = auth(json!({"token": "t"}), &[]);
        auth.validate().await.unwrap();
        let client = VaultClient::builder().base_url("http://vault:8200").build().unwrap();
        auth.authenticate(&client).await.unwrap();
        assert_eq!(client.token().await.as_deref(), Some("t"));
    }
}
