//! Certificate import utility
//!
//! Installs `CodeSigningCertificate.cer` (next to this executable, else in
//! the working directory) into the configured machine-wide trust stores.
//! Takes no flags. Prints one JSON result line and exits with:
//!
//! - `0` installed or already trusted
//! - `1` any other failure
//! - `2` certificate missing or unreadable
//! - `3` not running elevated

use script_signer::{
    adapters::powershell::{PowerShellHost, PowerShellTrustStore},
    infra::config::ConfigManager,
    pipelines::{import::exit_code, ImportWorkflow},
    services::TrustStoreInstaller,
};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match ConfigManager::new() {
        Ok(manager) => manager.load_lenient(),
        Err(e) => {
            log::warn!("No configuration directory, using defaults: {e}");
            Default::default()
        }
    };

    let host = PowerShellHost::new(config.powershell.clone());
    let installer = TrustStoreInstaller::new(
        Arc::new(PowerShellTrustStore::new(host)),
        config.trust.stores.clone(),
    )
    .with_timeout(config.service_timeout());

    let executable_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from));
    let working_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let outcome = ImportWorkflow::new(installer)
        .run(executable_dir.as_deref(), &working_dir)
        .await;

    println!("{}", outcome.to_json_line());
    let code = outcome.exit_code();
    if code != exit_code::SUCCESS {
        std::process::exit(code);
    }
}
