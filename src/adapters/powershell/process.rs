//! Process supervision for the cloud-signing companion application.

use super::host::PowerShellHost;
use crate::adapters::backend::ProcessSupervisor;
use crate::infra::error::{SigningError, SigningResult};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

const RUNNING_SCRIPT: &str = r#"
Write-Result ($null -ne (Get-Process -Name $env:SS_PROCESS -ErrorAction SilentlyContinue))
"#;

/// Looks processes up with `Get-Process` and starts them directly.
#[derive(Debug, Clone, Default)]
pub struct PowerShellProcessSupervisor {
    host: PowerShellHost,
}

impl PowerShellProcessSupervisor {
    #[must_use]
    pub fn new(host: PowerShellHost) -> Self {
        Self { host }
    }
}

#[async_trait]
impl ProcessSupervisor for PowerShellProcessSupervisor {
    async fn is_running(&self, process_name: &str) -> SigningResult<bool> {
        let env = [("SS_PROCESS", OsString::from(process_name))];
        self.host
            .invoke::<bool>(RUNNING_SCRIPT, &env)
            .await?
            .map_err(|f| SigningError::CloudSessionFailure(f.message))
    }

    async fn launch(&self, executable: &Path) -> SigningResult<()> {
        if !executable.is_file() {
            return Err(SigningError::CloudSessionFailure(format!(
                "Companion application not found at {}",
                executable.display()
            )));
        }

        log::info!("Launching {}", executable.display());
        // Not awaited: the companion outlives this process.
        Command::new(executable)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(drop)
            .map_err(|e| {
                SigningError::CloudSessionFailure(format!(
                    "Failed to launch {}: {e}",
                    executable.display()
                ))
            })
    }
}
