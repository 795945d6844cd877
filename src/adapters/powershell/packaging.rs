//! Packaging service backed by the PS2EXE module (`Invoke-PS2EXE`).
//!
//! The converter writes to a staging file next to the target, which is only
//! renamed into place once the converter reports success.

use super::host::{HostFailure, PowerShellHost};
use crate::adapters::backend::PackagingService;
use crate::domain::packaging::{Architecture, PackagingRequest};
use crate::infra::error::{PackagingFailureKind, SigningError, SigningResult};
use async_trait::async_trait;
use serde::de::IgnoredAny;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

const PACKAGE_SCRIPT: &str = r#"
if (-not (Get-Module -ListAvailable -Name ps2exe)) {
    Write-Failure 'backend_missing' 'The ps2exe module is not installed (Install-Module ps2exe)'
} else {
    $tokens = $null
    $errors = $null
    $null = [System.Management.Automation.Language.Parser]::ParseFile($env:SS_SCRIPT, [ref]$tokens, [ref]$errors)
    if ($errors.Count -gt 0) {
        $details = ($errors | ForEach-Object { "line $($_.Extent.StartLineNumber): $($_.Message)" }) -join '; '
        Write-Failure 'invalid_script' $details
    } else {
        Import-Module ps2exe
        $params = @{ inputFile = $env:SS_SCRIPT; outputFile = $env:SS_OUTPUT }
        if ($env:SS_ICON) { $params.iconFile = $env:SS_ICON }
        if ($env:SS_PRODUCT) { $params.product = $env:SS_PRODUCT; $params.title = $env:SS_PRODUCT }
        if ($env:SS_COMPANY) { $params.company = $env:SS_COMPANY }
        if ($env:SS_VERSION) { $params.version = $env:SS_VERSION }
        if ($env:SS_DESCRIPTION) { $params.description = $env:SS_DESCRIPTION }
        if ($env:SS_COPYRIGHT) { $params.copyright = $env:SS_COPYRIGHT }
        if ($env:SS_NO_CONSOLE -eq '1') { $params.noConsole = $true }
        if ($env:SS_REQUIRE_ADMIN -eq '1') { $params.requireAdmin = $true }
        switch ($env:SS_ARCH) {
            'x86' { $params.x86 = $true }
            'x64' { $params.x64 = $true }
        }
        Invoke-PS2EXE @params | Out-Null
        if (Test-Path -LiteralPath $env:SS_OUTPUT) {
            Write-Result $env:SS_OUTPUT
        } else {
            Write-Failure 'write_failure' 'ps2exe finished without producing an executable'
        }
    }
}
"#;

/// Script-to-executable conversion through PS2EXE.
#[derive(Debug, Clone, Default)]
pub struct Ps2ExePackagingService {
    host: PowerShellHost,
}

impl Ps2ExePackagingService {
    #[must_use]
    pub fn new(host: PowerShellHost) -> Self {
        Self { host }
    }
}

/// Staging path next to `output`, keeping the `.exe` extension PS2EXE expects.
fn staging_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output.with_file_name(format!(".{stem}.{}.partial.exe", std::process::id()))
}

fn map_packaging_failure(failure: HostFailure) -> SigningError {
    let kind = match failure.kind.as_str() {
        "backend_missing" => PackagingFailureKind::BackendMissing,
        "invalid_script" => PackagingFailureKind::InvalidScript,
        _ => PackagingFailureKind::WriteFailure,
    };
    SigningError::packaging(kind, failure.message)
}

fn build_env(request: &PackagingRequest, staging: &Path) -> Vec<(&'static str, OsString)> {
    let metadata = &request.metadata;
    let mut env = vec![
        ("SS_SCRIPT", OsString::from(request.script_path.as_os_str())),
        ("SS_OUTPUT", OsString::from(staging.as_os_str())),
    ];

    let optional = [
        ("SS_PRODUCT", metadata.product_name.as_deref()),
        ("SS_COMPANY", metadata.company.as_deref()),
        ("SS_VERSION", metadata.version.as_deref()),
        ("SS_DESCRIPTION", metadata.description.as_deref()),
        ("SS_COPYRIGHT", metadata.copyright.as_deref()),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            env.push((key, OsString::from(value)));
        }
    }
    if let Some(icon) = &metadata.icon_path {
        env.push(("SS_ICON", OsString::from(icon.as_os_str())));
    }
    if metadata.hide_console {
        env.push(("SS_NO_CONSOLE", OsString::from("1")));
    }
    if metadata.require_admin {
        env.push(("SS_REQUIRE_ADMIN", OsString::from("1")));
    }
    if metadata.architecture != Architecture::Any {
        env.push(("SS_ARCH", OsString::from(metadata.architecture.to_string())));
    }
    env
}

/// Removes the staging file when dropped, including when the packaging
/// future is cancelled mid-flight. After a successful promotion the file is
/// already gone and the drop is a no-op.
struct StagingGuard(PathBuf);

impl StagingGuard {
    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for StagingGuard {
    fn drop(&mut self) {
        if self.0.exists() {
            if let Err(e) = std::fs::remove_file(&self.0) {
                log::warn!("Failed to remove staging file {}: {e}", self.0.display());
            }
        }
    }
}

/// Move the staged executable over the requested output.
fn promote(staging: &Path, output: &Path, overwrite: bool) -> SigningResult<()> {
    if output.exists() {
        if !overwrite {
            return Err(SigningError::packaging(
                PackagingFailureKind::OutputCollision,
                format!("{} already exists", output.display()),
            ));
        }
        std::fs::remove_file(output).map_err(|e| {
            SigningError::packaging(
                PackagingFailureKind::WriteFailure,
                format!("Cannot replace {}: {e}", output.display()),
            )
        })?;
    }
    std::fs::rename(staging, output).map_err(|e| {
        SigningError::packaging(
            PackagingFailureKind::WriteFailure,
            format!("Cannot move executable into {}: {e}", output.display()),
        )
    })
}

#[async_trait]
impl PackagingService for Ps2ExePackagingService {
    async fn package(&self, request: &PackagingRequest) -> SigningResult<PathBuf> {
        let staging = StagingGuard(staging_path(&request.output_path));
        log::info!(
            "Converting {} -> {}",
            request.script_path.display(),
            request.output_path.display()
        );

        let env = build_env(request, staging.path());
        self
            .host
            .invoke::<IgnoredAny>(PACKAGE_SCRIPT, &env)
            .await
            .map_err(|e| {
                SigningError::packaging(PackagingFailureKind::BackendMissing, e.to_string())
            })
            .and_then(|result| result.map_err(map_packaging_failure))
            .and_then(|_| promote(staging.path(), &request.output_path, request.overwrite))
            .map(|()| request.output_path.clone())
    }
}
