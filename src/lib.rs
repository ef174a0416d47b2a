//! vault-modules - declarative management of Vault auth methods and AppRoles
//!
//! Every module run follows the same cycle: load the arguments, connect and
//! authenticate, read the current state, diff it against the desired state,
//! apply at most one change and print the result as JSON on stdout.

pub mod args;
pub mod connection;
pub mod diff;
mod error;
pub mod resources;
mod result;

pub use args::ModuleInvocation;
pub use error::ModuleError;
pub use result::{FailedResult, ModuleResult};

use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;

/// Entry point shared by the module binaries.
///
/// Arguments come from the file named by the first command line argument,
/// or stdin. Logs go to stderr; stdout only ever carries the result.
pub async fn run_module<F, Fut>(application: &'static str, module: F) -> ExitCode
where
    F: FnOnce(ModuleInvocation) -> Fut,
    Fut: Future<Output = Result<ModuleResult, ModuleError>>,
{
    let _guard = match struct_log::setup_logger(application, env!("CARGO_PKG_VERSION")) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("{application}: logging disabled: {err}");
            None
        }
    };

    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let outcome = match ModuleInvocation::load(path.as_deref()).await {
        Ok(invocation) => module(invocation).await,
        Err(err) => Err(err),
    };

    match outcome {
        Ok(result) => {
            tracing::debug!(changed = result.changed, "Module finished");
            emit(&result);
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "Module failed");
            emit(&FailedResult::new(err.to_string()));
            ExitCode::FAILURE
        }
    }
}

fn emit<T: Serialize>(result: &T) {
    match serde_json::to_string(result) {
        Ok(json) => println!("{json}"),
        Err(err) => {
            eprintln!("failed to serialize module result: {err}");
            println!(r#"{{"failed": true, "msg": "failed to serialize module result"}}"#);
        }
    }
}
