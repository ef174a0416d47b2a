//! vault-client - HashiCorp Vault client used by the vault modules
//!
//! * [`ParameterBag`] - module arguments with aliases folded and defaults filled
//! * [`auth::Authenticator`] - picks the login strategy named by `auth_method`
//! * [`VaultClient`] - thin async wrapper over the REST API
//! * [`VaultApi`] - the calls the resource modules make, also implemented by
//!   [`auth::AppRoleClient`] which logs in again before each call

mod api;
pub mod auth;
mod client;
mod error;
mod models;
mod params;

pub use api::VaultApi;
pub use client::{VaultClient, VaultClientBuilder};
pub use error::{AuthError, VaultError};
pub use models::{AwsIamLoginRequest, SignedIdentityRequest, TokenInfo};
pub use params::{AuthMethodKind, ParameterBag, ParamsError};
