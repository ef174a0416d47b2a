use std::process::ExitCode;

use vault_modules::resources::approle;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    vault_modules::run_module("vault_approle", approle::run).await
}
