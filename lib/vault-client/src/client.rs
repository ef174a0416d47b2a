use crate::error::{AuthError, VaultError};
use crate::models::{AwsIamLoginRequest, LoginResponse, TokenInfo};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::{Map, Value, json};
use std::time::Duration;
use tokio::sync::RwLock;

const TOKEN_HEADER: &str = "X-Vault-Token";
const NAMESPACE_HEADER: &str = "X-Vault-Namespace";

pub struct VaultClientBuilder {
    base_url: Option<String>,
    token: Option<String>,
    namespace: Option<String>,
    timeout: Option<Duration>,
    validate_certs: bool,
}

impl Default for VaultClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl VaultClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            token: None,
            namespace: None,
            timeout: None,
            validate_certs: true,
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn validate_certs(mut self, validate: bool) -> Self {
        self.validate_certs = validate;
        self
    }

    pub fn build(self) -> Result<VaultClient, VaultError> {
        let base_url = self
            .base_url
            .filter(|url| !url.is_empty())
            .ok_or(VaultError::UrlNotSet)?
            .trim_end_matches('/')
            .to_string();

        let settings = HttpSettings {
            timeout: self.timeout,
            validate_certs: self.validate_certs,
        };
        let http = settings.builder().build()?;

        Ok(VaultClient {
            base_url,
            http,
            settings,
            namespace: self.namespace,
            token: RwLock::new(self.token),
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct HttpSettings {
    timeout: Option<Duration>,
    validate_certs: bool,
}

impl HttpSettings {
    fn builder(&self) -> reqwest::ClientBuilder {
        let mut builder = reqwest::Client::builder().danger_accept_invalid_certs(!self.validate_certs);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder
    }
}

/// HTTP client for the Vault REST API.
///
/// The bearer token is interior state: login calls replace it, every other
/// call sends whatever is current.
pub struct VaultClient {
    base_url: String,
    http: reqwest::Client,
    settings: HttpSettings,
    namespace: Option<String>,
    token: RwLock<Option<String>>,
}

impl VaultClient {
    pub fn builder() -> VaultClientBuilder {
        VaultClientBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn set_token(&self, token: impl Into<String>) {
        *self.token.write().await = Some(token.into());
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut request = self.unauthenticated(&self.http, method, path);
        if let Some(token) = self.token.read().await.as_deref() {
            request = request.header(TOKEN_HEADER, token);
        }
        request
    }

    fn unauthenticated(&self, http: &reqwest::Client, method: Method, path: &str) -> RequestBuilder {
        let mut request = http.request(method, self.url(path));
        if let Some(namespace) = &self.namespace {
            request = request.header(NAMESPACE_HEADER, namespace);
        }
        request
    }

    async fn execute(&self, path: &str, request: RequestBuilder) -> Result<Option<Value>, VaultError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(VaultError::NotFound {
                path: path.to_string(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let response_data: Option<Value> = serde_json::from_str(&body).ok();
            let message = response_data
                .as_ref()
                .and_then(|data| data.get("errors"))
                .and_then(Value::as_array)
                .map(|errors| {
                    errors
                        .iter()
                        .filter_map(Value::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .filter(|message| !message.is_empty())
                .unwrap_or(body);
            return Err(VaultError::ClientError {
                status: status.as_u16(),
                message,
                response_data,
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&body)?))
    }

    async fn finish_login(&self, path: &str, request: RequestBuilder) -> Result<TokenInfo, VaultError> {
        let data = self.execute(path, request).await?.ok_or_else(|| {
            VaultError::RequestError(format!("Empty login response from {path}"))
        })?;
        let login: LoginResponse = serde_json::from_value(data)?;
        let info = TokenInfo::from(login.auth);
        self.set_token(info.token.clone()).await;
        tracing::debug!(path, policies = ?info.policies, "Logged in to Vault");
        Ok(info)
    }

    async fn login(&self, path: &str, body: &Value) -> Result<TokenInfo, VaultError> {
        let request = self.unauthenticated(&self.http, Method::POST, path).json(body);
        self.finish_login(path, request).await
    }

    pub async fn approle_login(
        &self,
        role_id: &str,
        secret_id: Option<&str>,
        mount_point: Option<&str>,
    ) -> Result<TokenInfo, VaultError> {
        let mut body = json!({ "role_id": role_id });
        if let Some(secret_id) = secret_id {
            body["secret_id"] = Value::from(secret_id);
        }
        let path = format!("auth/{}/login", mount_point.unwrap_or("approle"));
        self.login(&path, &body).await
    }

    pub async fn userpass_login(
        &self,
        username: &str,
        password: &str,
        mount_point: Option<&str>,
    ) -> Result<TokenInfo, VaultError> {
        let path = format!("auth/{}/login/{}", mount_point.unwrap_or("userpass"), username);
        self.login(&path, &json!({ "password": password })).await
    }

    pub async fn ldap_login(
        &self,
        username: &str,
        password: &str,
        mount_point: Option<&str>,
    ) -> Result<TokenInfo, VaultError> {
        let path = format!("auth/{}/login/{}", mount_point.unwrap_or("ldap"), username);
        self.login(&path, &json!({ "password": password })).await
    }

    pub async fn jwt_login(&self, role: &str, jwt: &str, path: Option<&str>) -> Result<TokenInfo, VaultError> {
        let path = format!("auth/{}/login", path.unwrap_or("jwt"));
        self.login(&path, &json!({ "role": role, "jwt": jwt })).await
    }

    pub async fn azure_login(
        &self,
        role: &str,
        jwt: &str,
        mount_point: Option<&str>,
    ) -> Result<TokenInfo, VaultError> {
        let path = format!("auth/{}/login", mount_point.unwrap_or("azure"));
        self.login(&path, &json!({ "role": role, "jwt": jwt })).await
    }

    pub async fn aws_iam_login(
        &self,
        request: &AwsIamLoginRequest,
        mount_point: Option<&str>,
    ) -> Result<TokenInfo, VaultError> {
        let path = format!("auth/{}/login", mount_point.unwrap_or("aws"));
        self.login(&path, &serde_json::to_value(request)?).await
    }

    /// Login over a TLS connection that presents the given client identity.
    pub async fn cert_login(
        &self,
        cert_pem: &[u8],
        key_pem: &[u8],
        name: Option<&str>,
        mount_point: Option<&str>,
    ) -> Result<TokenInfo, VaultError> {
        let mut pem = cert_pem.to_vec();
        if !pem.ends_with(b"\n") {
            pem.push(b'\n');
        }
        pem.extend_from_slice(key_pem);
        let identity =
            reqwest::Identity::from_pem(&pem).map_err(|e| AuthError::Certificate(e.to_string()))?;
        let http = self.settings.builder().identity(identity).build()?;

        let body = match name {
            Some(name) => json!({ "name": name }),
            None => json!({}),
        };
        let path = format!("auth/{}/login", mount_point.unwrap_or("cert"));
        let request = self.unauthenticated(&http, Method::POST, &path).json(&body);
        self.finish_login(&path, request).await
    }

    pub async fn lookup_self(&self) -> Result<Value, VaultError> {
        let path = "auth/token/lookup-self";
        let request = self.request(Method::GET, path).await;
        Ok(self.execute(path, request).await?.unwrap_or(Value::Null))
    }

    pub async fn read_role(&self, name: &str, mount_point: &str) -> Result<Value, VaultError> {
        let path = format!("auth/{mount_point}/role/{name}");
        let request = self.request(Method::GET, &path).await;
        let response = self.execute(&path, request).await?;
        Ok(data_of(response))
    }

    pub async fn list_roles(&self, mount_point: &str) -> Result<Vec<String>, VaultError> {
        let path = format!("auth/{mount_point}/role");
        let request = self.request(Method::GET, &path).await.query(&[("list", "true")]);
        let data = match self.execute(&path, request).await {
            Ok(response) => data_of(response),
            Err(VaultError::NotFound { .. }) => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        Ok(data
            .get("keys")
            .and_then(Value::as_array)
            .map(|keys| keys.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default())
    }

    pub async fn create_or_update_approle(
        &self,
        name: &str,
        mount_point: &str,
        attrs: &Map<String, Value>,
    ) -> Result<(), VaultError> {
        let path = format!("auth/{mount_point}/role/{name}");
        let request = self.request(Method::POST, &path).await.json(attrs);
        self.execute(&path, request).await?;
        Ok(())
    }

    pub async fn delete_role(&self, name: &str, mount_point: &str) -> Result<(), VaultError> {
        let path = format!("auth/{mount_point}/role/{name}");
        let request = self.request(Method::DELETE, &path).await;
        self.execute(&path, request).await?;
        Ok(())
    }

    /// Mounted auth methods keyed by path (with trailing slash).
    pub async fn list_auth_methods(&self) -> Result<Map<String, Value>, VaultError> {
        let path = "sys/auth";
        let request = self.request(Method::GET, path).await;
        let response = self.execute(path, request).await?.unwrap_or_default();
        if let Some(Value::Object(data)) = response.get("data") {
            return Ok(data.clone());
        }
        Ok(match response {
            Value::Object(map) => map.into_iter().filter(|(k, _)| k.ends_with('/')).collect(),
            _ => Map::new(),
        })
    }

    pub async fn enable_auth_method(
        &self,
        method_type: &str,
        path: &str,
        description: Option<&str>,
        config: &Map<String, Value>,
    ) -> Result<(), VaultError> {
        let mut body = json!({ "type": method_type, "config": config });
        if let Some(description) = description {
            body["description"] = Value::from(description);
        }
        let path = format!("sys/auth/{}", path.trim_end_matches('/'));
        let request = self.request(Method::POST, &path).await.json(&body);
        self.execute(&path, request).await?;
        Ok(())
    }

    pub async fn tune_auth_method(
        &self,
        path: &str,
        description: Option<&str>,
        config: &Map<String, Value>,
    ) -> Result<(), VaultError> {
        let mut body = config.clone();
        if let Some(description) = description {
            body.insert("description".to_string(), Value::from(description));
        }
        let path = format!("sys/auth/{}/tune", path.trim_end_matches('/'));
        let request = self.request(Method::POST, &path).await.json(&body);
        self.execute(&path, request).await?;
        Ok(())
    }

    pub async fn disable_auth_method(&self, path: &str) -> Result<(), VaultError> {
        let path = format!("sys/auth/{}", path.trim_end_matches('/'));
        let request = self.request(Method::DELETE, &path).await;
        self.execute(&path, request).await?;
        Ok(())
    }
}

fn data_of(response: Option<Value>) -> Value {
    response
        .and_then(|mut body| body.get_mut("data").map(Value::take))
        .unwrap_or(Value::Null)
}
