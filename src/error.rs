use thiserror::Error;
use vault_client::{AuthError, ParamsError, VaultError};

#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("failed to read module arguments: {0}")]
    ReadArgs(#[source] std::io::Error),

    #[error("module arguments are not valid JSON: {0}")]
    ArgsJson(#[source] serde_json::Error),

    #[error(transparent)]
    Params(#[from] ParamsError),

    #[error("missing required arguments: {}", .0.join(", "))]
    MissingArguments(Vec<&'static str>),

    #[error("{0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Vault(#[from] VaultError),
}
