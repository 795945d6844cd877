//! Script Signer CLI
//!
//! Command-line front end for the signing workflow: list identities, sign
//! scripts and executables, convert scripts to executables, verify
//! signatures, start the cloud-signing companion and install the
//! publisher certificate.

use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};
use script_signer::{
    adapters::powershell::{workflow_services, PowerShellHost, PowerShellTrustStore},
    domain::trust::InstallResult,
    infra::config::{ConfigManager, ExportFormat},
    services::TrustStoreInstaller,
    ArtifactKind, Operation, SigningError, Thumbprint, TimestampUrl, WorkbenchConfiguration,
    WorkflowController,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "script-signer")]
#[command(about = "Authenticode signing and packaging for PowerShell scripts")]
#[command(long_about = "
Script Signer - sign PowerShell scripts and packaged executables

EXAMPLES:
    # List code-signing certificates in the current user's store
    script-signer identities

    # Show which operations are available for a file
    script-signer status report.ps1 --identity <THUMBPRINT>

    # Sign a script with timestamping
    script-signer sign report.ps1 --identity <THUMBPRINT>

    # Convert a script to report.exe and sign the result
    script-signer convert report.ps1 --sign --identity <THUMBPRINT>

    # Install the publisher certificate (elevated session)
    script-signer trust CodeSigningCertificate.cer

ENVIRONMENT VARIABLES:
    RUST_LOG        Logging level (debug, info, warn, error)
")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the per-user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// PowerShell host executable (overrides config)
    #[arg(long, global = true, value_name = "EXE")]
    powershell: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List code-signing identities
    Identities,

    /// Show the classification of a file and the permitted operations
    Status {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Identity thumbprint to evaluate permissions with
        #[arg(short, long, value_name = "THUMBPRINT")]
        identity: Option<String>,
    },

    /// Sign a script (.ps1, .psm1) or executable (.exe)
    Sign {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Identity thumbprint to sign with
        #[arg(short, long, value_name = "THUMBPRINT")]
        identity: String,

        /// Do not counter-sign with a timestamp authority
        #[arg(long)]
        no_timestamp: bool,

        /// Timestamp server URL (overrides config)
        #[arg(short, long, value_name = "URL", conflicts_with = "no_timestamp")]
        timestamp_url: Option<String>,
    },

    /// Convert a script into an executable
    Convert {
        #[arg(value_name = "SCRIPT")]
        file: PathBuf,

        /// Output executable (defaults to the script name with .exe)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Replace an existing output file
        #[arg(long)]
        overwrite: bool,

        /// Sign the produced executable
        #[arg(long, requires = "identity")]
        sign: bool,

        /// Identity thumbprint used with --sign
        #[arg(short, long, value_name = "THUMBPRINT")]
        identity: Option<String>,

        /// Do not counter-sign with a timestamp authority
        #[arg(long)]
        no_timestamp: bool,
    },

    /// Show the Authenticode signature of a file
    Verify {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Make sure the cloud-signing companion application is running
    CloudSession,

    /// Install a public certificate into the machine-wide trust stores
    Trust {
        /// Certificate file (defaults to the configured trust bundle)
        #[arg(value_name = "CERT")]
        certificate: Option<PathBuf>,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Create default configuration file
    Init,

    /// Set a configuration value (dotted key, e.g. packaging.company)
    Set {
        /// Configuration key
        key: String,
        /// Configuration value (empty clears optional values)
        value: String,
    },

    /// Export configuration
    Export {
        /// Export format
        #[arg(short, long, value_enum, default_value = "toml")]
        format: ExportFormatArg,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import configuration
    Import {
        /// Configuration file to import
        file: PathBuf,
        /// Import format
        #[arg(short, long, value_enum, default_value = "toml")]
        format: ExportFormatArg,
    },
}

#[derive(ValueEnum, Clone)]
enum ExportFormatArg {
    Toml,
    Json,
    Yaml,
}

impl From<ExportFormatArg> for ExportFormat {
    fn from(arg: ExportFormatArg) -> Self {
        match arg {
            ExportFormatArg::Toml => ExportFormat::Toml,
            ExportFormatArg::Json => ExportFormat::Json,
            ExportFormatArg::Yaml => ExportFormat::Yaml,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new()?,
    };
    let powershell = cli.powershell;

    match cli.command {
        Commands::Config(config_cmd) => handle_config_command(&manager, config_cmd)?,
        Commands::Identities => {
            let (config, host) = prepare(&manager, powershell)?;
            handle_identities_command(&config, &host).await?;
        }
        Commands::Status { file, identity } => {
            let (config, host) = prepare(&manager, powershell)?;
            handle_status_command(&config, &host, &file, identity.as_deref()).await?;
        }
        Commands::Sign {
            file,
            identity,
            no_timestamp,
            timestamp_url,
        } => {
            let (config, host) = prepare(&manager, powershell)?;
            let mut controller = controller(&config, &host, no_timestamp, timestamp_url)?;
            select_identity(&mut controller, &identity).await?;
            controller.select_path(&file);
            sign_current(&mut controller).await?;
        }
        Commands::Convert {
            file,
            output,
            overwrite,
            sign,
            identity,
            no_timestamp,
        } => {
            let (mut config, host) = prepare(&manager, powershell)?;
            config.packaging.overwrite_output |= overwrite;
            let mut controller = controller(&config, &host, no_timestamp, None)?;
            controller.select_path(&file);
            let produced = controller.convert_to_executable(output).await?;
            println!("✅ Created {}", produced.path().display());

            if sign {
                let identity = identity.ok_or(SigningError::NoIdentitySelected)?;
                select_identity(&mut controller, &identity).await?;
                sign_current(&mut controller).await?;
            }
        }
        Commands::Verify { file } => {
            let (config, host) = prepare(&manager, powershell)?;
            let mut controller = controller(&config, &host, false, None)?;
            controller.select_path(&file);
            let report = controller.verify_current().await?;
            println!("🔍 {}", report.path.display());
            println!("   Status: {} ({})", report.status, report.status_message);
            match &report.signer {
                Some(signer) => println!("   Signer: {signer}"),
                None => println!("   Signer: none"),
            }
            println!("   Timestamped: {}", report.timestamped);
        }
        Commands::CloudSession => {
            let (config, host) = prepare(&manager, powershell)?;
            let mut controller = controller(&config, &host, false, None)?;
            let status = controller.manage_cloud_session().await?;
            println!(
                "☁️  {}: {status}",
                controller.settings().cloud_session.process_name
            );
        }
        Commands::Trust { certificate } => {
            let (config, host) = prepare(&manager, powershell)?;
            let path = certificate.unwrap_or_else(|| PathBuf::from(&config.trust.certificate_file));
            let installer = TrustStoreInstaller::new(
                Arc::new(PowerShellTrustStore::new(host)),
                config.trust.stores.clone(),
            )
            .with_timeout(config.service_timeout());
            let report = installer.install(&path).await?;
            println!("🔐 {} [{}]", report.subject, report.thumbprint);
            for (store, result) in &report.stores {
                let label = match result {
                    InstallResult::Installed => "installed",
                    InstallResult::AlreadyTrusted => "already trusted",
                };
                println!("   {store}: {label}");
            }
        }
    }

    Ok(())
}

/// Configuration plus the PowerShell host it names.
fn prepare(
    manager: &ConfigManager,
    powershell: Option<String>,
) -> Result<(WorkbenchConfiguration, PowerShellHost)> {
    let mut config = load_config(manager)?;
    if let Some(powershell) = powershell {
        config.powershell = powershell;
    }
    let host = PowerShellHost::new(config.powershell.clone());
    Ok((config, host))
}

/// Strict when a config file exists, defaults otherwise.
fn load_config(manager: &ConfigManager) -> Result<WorkbenchConfiguration> {
    Ok(manager.load_if_present()?.unwrap_or_else(|| {
        log::debug!(
            "No configuration at {}, using defaults",
            manager.config_path().display()
        );
        WorkbenchConfiguration::default()
    }))
}

fn controller(
    config: &WorkbenchConfiguration,
    host: &PowerShellHost,
    no_timestamp: bool,
    timestamp_url: Option<String>,
) -> Result<WorkflowController> {
    let mut settings = config.workflow_settings()?;
    if let Some(url) = timestamp_url {
        settings.timestamp_url = Some(TimestampUrl::new(url)?);
        settings.timestamping = true;
    }
    if no_timestamp {
        settings.timestamping = false;
    }
    Ok(WorkflowController::new(workflow_services(host), settings))
}

async fn select_identity(controller: &mut WorkflowController, thumbprint: &str) -> Result<()> {
    let thumbprint = Thumbprint::new(thumbprint)?;
    controller.refresh_identities().await?;
    let identity = controller.select_identity_by_thumbprint(&thumbprint)?;
    if !identity.is_valid() {
        println!("⚠️  {identity} expired on {}", identity.not_after());
    }
    Ok(())
}

/// Sign the current artifact with the operation matching its kind.
async fn sign_current(controller: &mut WorkflowController) -> Result<()> {
    let kind = controller.current().map(|artifact| artifact.kind());
    let outcome = match kind {
        Some(ArtifactKind::Executable) => controller.sign_executable().await?,
        _ => controller.sign_script().await?,
    };

    println!("✅ Signed {}", outcome.path.display());
    println!("   Signer: {}", outcome.signer);
    println!("   Status: {}", outcome.report.status);
    match &outcome.timestamp_url {
        Some(url) => println!("   Timestamp: {url}"),
        None => println!("   Timestamp: none"),
    }
    Ok(())
}

async fn handle_identities_command(
    config: &WorkbenchConfiguration,
    host: &PowerShellHost,
) -> Result<()> {
    let mut controller = controller(config, host, false, None)?;
    let identities = controller.refresh_identities().await?;

    if identities.is_empty() {
        println!("📋 No code-signing certificates found in Cert:\\CurrentUser\\My");
        return Ok(());
    }

    let now = chrono::Utc::now();
    println!("📋 Code-signing identities:");
    for identity in identities {
        let state = if identity.is_valid_at(now) {
            format!("valid, {} days left", identity.days_until_expiry(now))
        } else {
            "EXPIRED".to_string()
        };
        println!("  {} {} ({state})", identity.thumbprint(), identity.subject());
    }
    Ok(())
}

async fn handle_status_command(
    config: &WorkbenchConfiguration,
    host: &PowerShellHost,
    file: &Path,
    identity: Option<&str>,
) -> Result<()> {
    let mut controller = controller(config, host, false, None)?;
    if let Some(thumbprint) = identity {
        select_identity(&mut controller, thumbprint).await?;
    }

    let artifact = controller.select_path(file).clone();
    println!("📄 {}", artifact.path().display());
    println!("   Kind: {}", artifact.kind());
    println!("   Exists: {}", artifact.exists());
    match controller.selected_identity() {
        Some(identity) => println!("   Identity: {identity}"),
        None => println!("   Identity: none"),
    }

    let permissions = controller.permissions();
    println!("   Operations:");
    for operation in Operation::ALL {
        let mark = if permissions.allows(operation) { "✓" } else { "✗" };
        println!("     {mark} {operation}");
    }
    Ok(())
}

fn handle_config_command(manager: &ConfigManager, config_cmd: ConfigCommands) -> Result<()> {
    match config_cmd {
        ConfigCommands::Show => match manager.load_if_present()? {
            Some(config) => {
                println!("📋 Current Configuration:");
                println!(
                    "  Default folder: {}",
                    config
                        .default_folder
                        .as_deref()
                        .map_or_else(|| "(none)".to_string(), |p| p.display().to_string())
                );
                println!("  PowerShell host: {}", config.powershell);
                println!("  Service timeout: {}s", config.service_timeout_seconds);
                println!(
                    "  Timestamping: {} ({})",
                    config.timestamp.enabled, config.timestamp.server
                );
                println!("  Architecture: {}", config.packaging.architecture);
                println!("  Overwrite output: {}", config.packaging.overwrite_output);
                println!("  Cloud session process: {}", config.cloud_session.process_name);
                println!("  Trust bundle: {}", config.trust.certificate_file);
                println!("  Configuration file: {}", manager.config_path().display());
            }
            None => {
                println!("📋 No configuration file found. Use 'config init' to create one.");
            }
        },

        ConfigCommands::Init => {
            manager.load_or_create_default()?;
            println!(
                "✅ Configuration initialized: {}",
                manager.config_path().display()
            );
            println!("   Edit the file to customize settings, or use 'config set' commands.");
        }

        ConfigCommands::Set { key, value } => {
            manager.update_value(&key, &value)?;
            println!("✅ Configuration updated: {key} = {value}");
        }

        ConfigCommands::Export { format, output } => {
            let content = manager.export_config(format.into())?;

            if let Some(output_path) = output {
                std::fs::write(&output_path, content).into_diagnostic()?;
                println!("✅ Configuration exported to: {}", output_path.display());
            } else {
                println!("{content}");
            }
        }

        ConfigCommands::Import { file, format } => {
            let content = std::fs::read_to_string(&file).into_diagnostic()?;
            manager.import_config(&content, format.into())?;
            println!("✅ Configuration imported from: {}", file.display());
        }
    }

    Ok(())
}
