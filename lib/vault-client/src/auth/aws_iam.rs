use super::AuthMethod;
use crate::client::VaultClient;
use crate::error::{AuthError, VaultError};
use crate::models::{AwsIamLoginRequest, SignedIdentityRequest};
use crate::params::ParameterBag;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::sync::Arc;

const STS_URL: &str = "https://sts.amazonaws.com/";
const STS_HOST: &str = "sts.amazonaws.com";
const STS_BODY: &str = "Action=GetCallerIdentity&Version=2011-06-15";
const DEFAULT_REGION: &str = "us-east-1";
const SERVER_ID_HEADER: &str = "X-Vault-AWS-IAM-Server-ID";

#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    pub access_key: String,
    pub secret_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Where credentials come from when they are not passed explicitly.
#[async_trait]
pub trait AwsCredentialSource: Send + Sync {
    async fn credentials(&self, profile: Option<&str>) -> Result<AwsCredentials, AuthError>;
}

/// The AWS SDK default provider chain (environment, profile files, IMDS, ...).
///
/// A named profile is resolved from the shared config and credentials files
/// only, and must exist there.
#[derive(Debug, Default, Clone)]
pub struct DefaultCredentialSource {
    #[cfg(feature = "aws")]
    profile_files: Option<aws_config::profile::profile_file::ProfileFiles>,
}

impl DefaultCredentialSource {
    /// Read profiles from these files instead of `~/.aws/config` and `~/.aws/credentials`.
    #[cfg(feature = "aws")]
    pub fn with_profile_files(config: impl Into<std::path::PathBuf>, credentials: impl Into<std::path::PathBuf>) -> Self {
        use aws_config::profile::profile_file::{ProfileFileKind, ProfileFiles};

        let files = ProfileFiles::builder()
            .include_default_config_file(false)
            .include_default_credentials_file(false)
            .with_file(ProfileFileKind::Config, config)
            .with_file(ProfileFileKind::Credentials, credentials)
            .build();
        Self {
            profile_files: Some(files),
        }
    }
}

#[async_trait]
impl AwsCredentialSource for DefaultCredentialSource {
    #[cfg(feature = "aws")]
    async fn credentials(&self, profile: Option<&str>) -> Result<AwsCredentials, AuthError> {
        match profile {
            Some(profile) => sdk::load_profile_credentials(profile, self.profile_files.clone()).await,
            None => sdk::load_credentials().await,
        }
    }

    #[cfg(not(feature = "aws"))]
    async fn credentials(&self, _profile: Option<&str>) -> Result<AwsCredentials, AuthError> {
        Err(AuthError::MissingDependency {
            library: "aws-config",
            purpose: "loading a profile or IAM role credentials",
        })
    }
}

pub struct AwsIamAuth {
    params: ParameterBag,
    source: Arc<dyn AwsCredentialSource>,
    credentials: Option<AwsCredentials>,
}

impl AwsIamAuth {
    pub const FIELDS: &'static [&'static str] = &[
        "aws_profile",
        "aws_access_key",
        "aws_secret_key",
        "aws_security_token",
        "region",
        "aws_iam_server_id",
        "role_id",
    ];

    pub fn new(params: ParameterBag, source: Arc<dyn AwsCredentialSource>) -> Self {
        Self {
            params,
            source,
            credentials: None,
        }
    }

    fn login_request(&self, credentials: &AwsCredentials) -> Result<AwsIamLoginRequest, AuthError> {
        let region = self.params.string("region").unwrap_or_else(|| DEFAULT_REGION.to_string());
        let server_id = self.params.string("aws_iam_server_id");
        let signed = sign_identity_request(credentials, &region, server_id.as_deref())?;

        let headers = serde_json::to_string(&signed.headers).map_err(|e| AuthError::AwsSigning(e.to_string()))?;
        Ok(AwsIamLoginRequest {
            iam_http_request_method: signed.method,
            iam_request_url: STANDARD.encode(signed.url),
            iam_request_body: STANDARD.encode(signed.body),
            iam_request_headers: STANDARD.encode(headers),
            role: self.params.string("role_id"),
        })
    }
}

#[async_trait]
impl AuthMethod for AwsIamAuth {
    fn name(&self) -> &'static str {
        "aws_iam"
    }

    fn auth_fields(&self) -> &'static [&'static str] {
        Self::FIELDS
    }

    async fn validate(&mut self) -> Result<(), AuthError> {
        let explicit = (self.params.string("aws_access_key"), self.params.string("aws_secret_key"));
        let session_token = self.params.string("aws_security_token");

        let credentials = match explicit {
            (Some(access_key), Some(secret_key)) => AwsCredentials {
                access_key,
                secret_key,
                session_token,
            },
            _ => {
                let profile = self.params.string("aws_profile");
                tracing::debug!(profile = ?profile, "Resolving AWS credentials");
                let resolved = self.source.credentials(profile.as_deref()).await?;
                AwsCredentials {
                    session_token: resolved.session_token.or(session_token),
                    ..resolved
                }
            }
        };

        self.credentials = Some(credentials);
        Ok(())
    }

    async fn authenticate(&self, client: &VaultClient) -> Result<(), VaultError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(AuthError::NotValidated(self.name()))?;
        let request = self.login_request(credentials)?;
        let mount_point = self.params.string("mount_point");
        client.aws_iam_login(&request, mount_point.as_deref()).await?;
        Ok(())
    }
}

fn identity_request_headers(server_id: Option<&str>) -> Vec<(String, String)> {
    let mut headers = vec![
        (
            "content-type".to_string(),
            "application/x-www-form-urlencoded; charset=utf-8".to_string(),
        ),
        ("host".to_string(), STS_HOST.to_string()),
    ];
    if let Some(server_id) = server_id {
        headers.push((SERVER_ID_HEADER.to_string(), server_id.to_string()));
    }
    headers
}

fn into_signed_request(headers: Vec<(String, String)>) -> SignedIdentityRequest {
    let mut grouped = std::collections::BTreeMap::<String, Vec<String>>::new();
    for (name, value) in headers {
        grouped.entry(name).or_default().push(value);
    }
    SignedIdentityRequest {
        method: "POST".to_string(),
        url: STS_URL.to_string(),
        body: STS_BODY.to_string(),
        headers: grouped,
    }
}

#[cfg(feature = "aws")]
fn sign_identity_request(
    credentials: &AwsCredentials,
    region: &str,
    server_id: Option<&str>,
) -> Result<SignedIdentityRequest, AuthError> {
    use aws_credential_types::Credentials;
    use aws_sigv4::http_request::{SignableBody, SignableRequest, SigningParams, SigningSettings, sign};
    use aws_sigv4::sign::v4;
    use aws_smithy_runtime_api::client::identity::Identity;
    use std::time::SystemTime;

    let identity: Identity = Credentials::new(
        credentials.access_key.clone(),
        credentials.secret_key.clone(),
        credentials.session_token.clone(),
        None,
        "vault-modules",
    )
    .into();

    let params: SigningParams<'_> = v4::SigningParams::builder()
        .identity(&identity)
        .region(region)
        .name("sts")
        .time(SystemTime::now())
        .settings(SigningSettings::default())
        .build()
        .map_err(|e| AuthError::AwsSigning(e.to_string()))?
        .into();

    let mut headers = identity_request_headers(server_id);
    let signable = SignableRequest::new(
        "POST",
        STS_URL,
        headers.iter().map(|(name, value)| (name.as_str(), value.as_str())),
        SignableBody::Bytes(STS_BODY.as_bytes()),
    )
    .map_err(|e| AuthError::AwsSigning(e.to_string()))?;

    let (instructions, _signature) = sign(signable, &params)
        .map_err(|e| AuthError::AwsSigning(e.to_string()))?
        .into_parts();

    let signed: Vec<(String, String)> = instructions
        .headers()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    headers.extend(signed);
    Ok(into_signed_request(headers))
}

#[cfg(not(feature = "aws"))]
fn sign_identity_request(
    _credentials: &AwsCredentials,
    _region: &str,
    _server_id: Option<&str>,
) -> Result<SignedIdentityRequest, AuthError> {
    Err(AuthError::MissingDependency {
        library: "aws-sigv4",
        purpose: "signing the AWS identity request",
    })
}

#[cfg(feature = "aws")]
mod sdk {
    use super::AwsCredentials;
    use crate::error::AuthError;
    use aws_config::BehaviorVersion;
    use aws_config::profile::ProfileFileCredentialsProvider;
    use aws_config::profile::profile_file::ProfileFiles;
    use aws_credential_types::Credentials;
    use aws_credential_types::provider::ProvideCredentials;
    use aws_credential_types::provider::error::CredentialsError;
    use aws_types::os_shim_internal::{Env, Fs};

    pub(super) async fn load_credentials() -> Result<AwsCredentials, AuthError> {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        let provider = config.credentials_provider().ok_or(AuthError::NoAwsCredentials)?;
        let credentials = provider.provide_credentials().await.map_err(|err| match err {
            CredentialsError::CredentialsNotLoaded(_) => AuthError::NoAwsCredentials,
            other => AuthError::AwsCredentials(other.to_string()),
        })?;
        Ok(convert(&credentials))
    }

    /// Credentials of a named profile; the profile must be defined in the shared files.
    pub(super) async fn load_profile_credentials(
        profile: &str,
        files: Option<ProfileFiles>,
    ) -> Result<AwsCredentials, AuthError> {
        let files = files.unwrap_or_default();
        let profiles = aws_config::profile::load(&Fs::real(), &Env::real(), &files, None)
            .await
            .map_err(|e| AuthError::AwsCredentials(e.to_string()))?;
        if profiles.get_profile(profile).is_none() {
            return Err(AuthError::AwsProfileNotFound(profile.to_string()));
        }

        let provider = ProfileFileCredentialsProvider::builder()
            .profile_name(profile)
            .profile_files(files)
            .build();
        let credentials = provider.provide_credentials().await.map_err(|err| match err {
            CredentialsError::CredentialsNotLoaded(_) => AuthError::NoAwsCredentials,
            other => AuthError::AwsCredentials(other.to_string()),
        })?;
        Ok(convert(&credentials))
    }

    fn convert(credentials: &Credentials) -> AwsCredentials {
        AwsCredentials {
            access_key: credentials.access_key_id().to_string(),
            secret_key: credentials.secret_access_key().to_string(),
            session_token: credentials.session_token().map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct StaticSource(Result<AwsCredentials, fn() -> AuthError>);

    #[async_trait]
    impl AwsCredentialSource for StaticSource {
        async fn credentials(&self, _profile: Option<&str>) -> Result<AwsCredentials, AuthError> {
            self.0.clone().map_err(|make| make())
        }
    }

    fn creds(token: Option<&str>) -> AwsCredentials {
        AwsCredentials {
            access_key: "AKIDEXAMPLE".to_string(),
            secret_key: "wJalrXUtnFEMI".to_string(),
            session_token: token.map(str::to_string),
        }
    }

    fn auth(params: serde_json::Value, source: StaticSource) -> AwsIamAuth {
        AwsIamAuth::new(ParameterBag::parse(params).unwrap(), Arc::new(source))
    }

    #[tokio::test]
    async fn test_explicit_keys_skip_provider_chain() {
        let mut auth = auth(
            json!({"aws_access_key": "AK", "aws_secret_key": "SK", "aws_security_token": "ST"}),
            StaticSource(Err(|| AuthError::NoAwsCredentials)),
        );
        auth.validate().await.unwrap();
        let credentials = auth.credentials.as_ref().unwrap();
        assert_eq!(credentials.access_key, "AK");
        assert_eq!(credentials.session_token.as_deref(), Some("ST"));
    }

    #[tokio::test]
    async fn test_resolved_session_token_replaces_parameter() {
        let mut auth = auth(
            json!({"aws_security_token": "param-token"}),
            StaticSource(Ok(creds(Some("sdk-token")))),
        );
        auth.validate().await.unwrap();
        assert_eq!(
            auth.credentials.as_ref().unwrap().session_token.as_deref(),
            Some("sdk-token")
        );
    }

    #[tokio::test]
    async fn test_parameter_session_token_kept_without_resolved_one() {
        let mut auth = auth(json!({"aws_security_token": "param-token"}), StaticSource(Ok(creds(None))));
        auth.validate().await.unwrap();
        assert_eq!(
            auth.credentials.as_ref().unwrap().session_token.as_deref(),
            Some("param-token")
        );
    }

    #[tokio::test]
    async fn test_no_credentials() {
        let mut auth = auth(json!({}), StaticSource(Err(|| AuthError::NoAwsCredentials)));
        let err = auth.validate().await.unwrap_err();
        assert_eq!(err.to_string(), "No AWS credentials supplied or available.");
    }

    #[test]
    fn test_headers_grouped_by_name() {
        let request = into_signed_request(identity_request_headers(Some("vault.example.com")));
        assert_eq!(request.headers["host"], vec!["sts.amazonaws.com"]);
        assert_eq!(request.headers[SERVER_ID_HEADER], vec!["vault.example.com"]);
        assert_eq!(request.body, STS_BODY);
    }

    #[cfg(feature = "aws")]
    fn profile_source(dir: &tempfile::TempDir, config: &str, credentials: &str) -> DefaultCredentialSource {
        let config_path = dir.path().join("config");
        let credentials_path = dir.path().join("credentials");
        std::fs::write(&config_path, config).unwrap();
        std::fs::write(&credentials_path, credentials).unwrap();
        DefaultCredentialSource::with_profile_files(config_path, credentials_path)
    }

    #[cfg(feature = "aws")]
    #[tokio::test]
    async fn test_missing_profile_in_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        let source = profile_source(&dir, "", "");
        let err = source.credentials(Some("does-not-exist")).await.unwrap_err();
        assert_eq!(err.to_string(), "The AWS profile 'does-not-exist' was not found.");
    }

    #[cfg(feature = "aws")]
    #[tokio::test]
    async fn test_missing_profile_next_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let source = profile_source(
            &dir,
            "[default]\nregion = us-east-1\n",
            "[default]\naws_access_key_id = AKDEFAULT\naws_secret_access_key = SKDEFAULT\n",
        );
        let err = source.credentials(Some("does-not-exist")).await.unwrap_err();
        assert!(matches!(err, AuthError::AwsProfileNotFound(profile) if profile == "does-not-exist"));
    }

    #[cfg(feature = "aws")]
    #[tokio::test]
    async fn test_named_profile_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let source = profile_source(
            &dir,
            "[profile dev]\nregion = eu-west-1\n",
            "[dev]\naws_access_key_id = AKDEV\naws_secret_access_key = SKDEV\naws_session_token = TOKDEV\n",
        );
        let credentials = source.credentials(Some("dev")).await.unwrap();
        assert_eq!(credentials.access_key, "AKDEV");
        assert_eq!(credentials.secret_key, "SKDEV");
        assert_eq!(credentials.session_token.as_deref(), Some("TOKDEV"));
    }

    #[cfg(feature = "aws")]
    #[tokio::test]
    async fn test_login_request_is_signed_and_encoded() {
        let mut auth = auth(
            json!({"aws_access_key": "AK", "aws_secret_key": "SK", "role_id": "dev-role", "region": "eu-west-1"}),
            StaticSource(Err(|| AuthError::NoAwsCredentials)),
        );
        auth.validate().await.unwrap();
        let request = auth.login_request(auth.credentials.as_ref().unwrap()).unwrap();

        assert_eq!(request.iam_http_request_method, "POST");
        assert_eq!(request.role.as_deref(), Some("dev-role"));
        assert_eq!(STANDARD.decode(&request.iam_request_url).unwrap(), STS_URL.as_bytes());
        assert_eq!(STANDARD.decode(&request.iam_request_body).unwrap(), STS_BODY.as_bytes());

        let headers: serde_json::Value =
            serde_json::from_slice(&STANDARD.decode(&request.iam_request_headers).unwrap()).unwrap();
        let authorization = headers["authorization"][0].as_str().unwrap();
        assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=AK/"));
        assert!(authorization.contains("/eu-west-1/sts/aws4_request"));
        assert!(headers.get("x-amz-date").is_some());
    }
}
