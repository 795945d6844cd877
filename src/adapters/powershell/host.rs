//! Runs PowerShell snippets and decodes their JSON result line.
//!
//! Inputs never get spliced into script text. They are passed as environment
//! variables (`SS_*`) and read back with `$env:`; every snippet reports through
//! `Write-Result` / `Write-Failure`, which emit one compact JSON object.

use crate::infra::error::{SigningError, SigningResult};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::ffi::OsString;
use tokio::process::Command;

const PRELUDE: &str = r#"$ErrorActionPreference = 'Stop'
$ProgressPreference = 'SilentlyContinue'
function Write-Result($Data) {
    ConvertTo-Json -Compress -Depth 5 -InputObject @{ ok = $true; data = $Data }
}
function Write-Failure([string]$Kind, [string]$Message) {
    ConvertTo-Json -Compress -InputObject @{ ok = $false; kind = $Kind; message = $Message }
}
try {
"#;

const EPILOGUE: &str = r#"
} catch {
    Write-Failure 'host' $_.Exception.Message
}
"#;

/// A failure reported by the script itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostFailure {
    /// Short machine-readable tag chosen by the snippet, `host` for uncaught exceptions.
    pub kind: String,
    pub message: String,
}

#[derive(Deserialize)]
struct Envelope<T> {
    ok: bool,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

/// PowerShell executable plus the flags every invocation uses.
#[derive(Debug, Clone)]
pub struct PowerShellHost {
    executable: String,
}

impl Default for PowerShellHost {
    fn default() -> Self {
        Self::new(Self::default_executable())
    }
}

impl PowerShellHost {
    #[must_use]
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// `powershell.exe` on Windows, `pwsh` elsewhere.
    #[must_use]
    pub fn default_executable() -> &'static str {
        if cfg!(windows) {
            "powershell.exe"
        } else {
            "pwsh"
        }
    }

    #[must_use]
    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// Run `body` and decode its result.
    ///
    /// The outer `Result` carries transport problems (host missing, no JSON
    /// produced); the inner one carries failures the script reported.
    pub async fn invoke<T: DeserializeOwned>(
        &self,
        body: &str,
        env: &[(&str, OsString)],
    ) -> SigningResult<Result<T, HostFailure>> {
        let script = wrap_script(body);

        log::debug!("Invoking {} ({} env inputs)", self.executable, env.len());
        let output = Command::new(&self.executable)
            .args([
                "-NoLogo",
                "-NoProfile",
                "-NonInteractive",
                "-ExecutionPolicy",
                "Bypass",
                "-Command",
                script.as_str(),
            ])
            .envs(env.iter().map(|(k, v)| (*k, v)))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    SigningError::IoError(format!(
                        "PowerShell host '{}' was not found on PATH",
                        self.executable
                    ))
                } else {
                    SigningError::IoError(format!(
                        "Failed to start PowerShell host '{}': {e}",
                        self.executable
                    ))
                }
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            log::debug!("PowerShell stderr: {}", stderr.trim());
        }

        decode_result(&stdout).map_err(|e| {
            SigningError::InvalidInput(format!(
                "{e} (exit status {}, stderr: {})",
                output.status,
                stderr.trim()
            ))
        })
    }
}

fn wrap_script(body: &str) -> String {
    let mut script = String::with_capacity(PRELUDE.len() + body.len() + EPILOGUE.len());
    script.push_str(PRELUDE);
    script.push_str(body);
    script.push_str(EPILOGUE);
    script
}

/// Decode the last JSON line of `stdout`. Converters such as PS2EXE print
/// progress text before it.
fn decode_result<T: DeserializeOwned>(stdout: &str) -> Result<Result<T, HostFailure>, String> {
    let line = stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| l.starts_with('{'))
        .ok_or_else(|| "PowerShell produced no result".to_string())?;

    let envelope: Envelope<T> =
        serde_json::from_str(line).map_err(|e| format!("Unreadable PowerShell result: {e}"))?;

    if envelope.ok {
        envelope
            .data
            .map(Ok)
            .or_else(|| serde_json::from_value(serde_json::Value::Null).ok().map(Ok))
            .ok_or_else(|| "PowerShell result carried no data".to_string())
    } else {
        Ok(Err(HostFailure {
            kind: envelope.kind.unwrap_or_else(|| "host".to_string()),
            message: envelope.message.unwrap_or_default(),
        }))
    }
}
