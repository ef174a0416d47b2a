use std::process::ExitCode;

use vault_modules::resources::auth_method;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    vault_modules::run_module("vault_auth_method", auth_method::run).await
}
