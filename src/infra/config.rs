//! Configuration management infrastructure.
//!
//! Typed, validated settings for the workbench: default folder, PowerShell
//! host, timestamping, packaging metadata, cloud-session supervision and the
//! trust bundle. Stored as TOML; exportable as TOML, JSON or YAML.

use crate::domain::packaging::{Architecture, PackagingMetadata};
use crate::domain::session::CloudSessionSettings;
use crate::domain::trust::TrustStoreName;
use crate::domain::types::TimestampUrl;
use crate::infra::error::{SigningError, SigningResult};
use crate::infra::timeout::DEFAULT_SERVICE_TIMEOUT_SECONDS;
use crate::services::workflow::WorkflowSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration with all workflow preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkbenchConfiguration {
    /// Folder the file picker starts in
    pub default_folder: Option<PathBuf>,

    /// PowerShell host executable
    pub powershell: String,

    /// Bound on every delegated service call
    pub service_timeout_seconds: u64,

    pub timestamp: TimestampConfig,

    pub packaging: PackagingConfig,

    pub cloud_session: CloudSessionConfig,

    pub trust: TrustConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimestampConfig {
    /// Counter-sign signatures by default
    pub enabled: bool,
    pub server: String,
}

/// Metadata handed verbatim to the packaging service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagingConfig {
    pub icon_path: Option<PathBuf>,
    pub product_name: Option<String>,
    pub company: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub copyright: Option<String>,
    pub hide_console: bool,
    pub require_admin: bool,
    pub architecture: Architecture,
    /// Replace an existing executable instead of failing
    pub overwrite_output: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudSessionConfig {
    pub process_name: String,
    pub executable: PathBuf,
    pub settle_delay_ms: u64,
    pub checks: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    /// Certificate bundle installed by `import-certificate`
    pub certificate_file: String,
    pub stores: Vec<TrustStoreName>,
}

impl Default for WorkbenchConfiguration {
    fn default() -> Self {
        Self {
            default_folder: None,
            powershell: crate::adapters::powershell::PowerShellHost::default_executable()
                .to_string(),
            service_timeout_seconds: DEFAULT_SERVICE_TIMEOUT_SECONDS,
            timestamp: TimestampConfig::default(),
            packaging: PackagingConfig::default(),
            cloud_session: CloudSessionConfig::default(),
            trust: TrustConfig::default(),
        }
    }
}

impl Default for TimestampConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            server: "http://timestamp.digicert.com".to_string(),
        }
    }
}

impl Default for CloudSessionConfig {
    fn default() -> Self {
        let settings = CloudSessionSettings::default();
        Self {
            process_name: settings.process_name,
            executable: settings.executable,
            settle_delay_ms: u64::try_from(settings.settle_delay.as_millis()).unwrap_or(3000),
            checks: settings.checks,
        }
    }
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            certificate_file: "CodeSigningCertificate.cer".to_string(),
            stores: vec![TrustStoreName::TrustedPublisher, TrustStoreName::Root],
        }
    }
}

impl WorkbenchConfiguration {
    /// Check every value the workflow depends on.
    pub fn validate(&self) -> SigningResult<()> {
        if self.powershell.trim().is_empty() {
            return Err(SigningError::ConfigurationError(
                "PowerShell host must not be empty".to_string(),
            ));
        }

        if self.service_timeout_seconds == 0 {
            return Err(SigningError::ConfigurationError(
                "Service timeout must be greater than 0".to_string(),
            ));
        }

        if self.timestamp.enabled {
            TimestampUrl::new(&self.timestamp.server).map_err(|e| {
                SigningError::ConfigurationError(format!("Invalid timestamp server: {e}"))
            })?;
        }

        self.packaging_metadata()
            .validate()
            .map_err(|e| SigningError::ConfigurationError(e.to_string()))?;

        if self.cloud_session.process_name.trim().is_empty() {
            return Err(SigningError::ConfigurationError(
                "Cloud session process name must not be empty".to_string(),
            ));
        }

        if self.cloud_session.checks == 0 {
            return Err(SigningError::ConfigurationError(
                "Cloud session checks must be greater than 0".to_string(),
            ));
        }

        if self.trust.stores.is_empty() {
            return Err(SigningError::ConfigurationError(
                "At least one trust store must be configured".to_string(),
            ));
        }

        Ok(())
    }

    #[must_use]
    pub fn packaging_metadata(&self) -> PackagingMetadata {
        let p = &self.packaging;
        PackagingMetadata {
            icon_path: p.icon_path.clone(),
            product_name: p.product_name.clone(),
            company: p.company.clone(),
            version: p.version.clone(),
            description: p.description.clone(),
            copyright: p.copyright.clone(),
            hide_console: p.hide_console,
            require_admin: p.require_admin,
            architecture: p.architecture,
        }
    }

    /// Timestamp authority, or `None` when timestamping is off.
    pub fn timestamp_url(&self) -> SigningResult<Option<TimestampUrl>> {
        if self.timestamp.enabled {
            TimestampUrl::new(&self.timestamp.server).map(Some)
        } else {
            Ok(None)
        }
    }

    #[must_use]
    pub fn cloud_session_settings(&self) -> CloudSessionSettings {
        CloudSessionSettings {
            process_name: self.cloud_session.process_name.clone(),
            executable: self.cloud_session.executable.clone(),
            settle_delay: Duration::from_millis(self.cloud_session.settle_delay_ms),
            checks: self.cloud_session.checks,
        }
    }

    #[must_use]
    pub fn service_timeout(&self) -> Duration {
        Duration::from_secs(self.service_timeout_seconds)
    }

    /// Settings for a [`crate::services::WorkflowController`].
    pub fn workflow_settings(&self) -> SigningResult<WorkflowSettings> {
        let timestamp_url = self.timestamp_url()?;
        Ok(WorkflowSettings {
            timestamping: timestamp_url.is_some(),
            timestamp_url,
            packaging: self.packaging_metadata(),
            overwrite_output: self.packaging.overwrite_output,
            cloud_session: self.cloud_session_settings(),
            service_timeout: self.service_timeout(),
        })
    }
}

/// Configuration manager for handling config files
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new configuration manager with default path
    pub fn new() -> SigningResult<Self> {
        let config_path = Self::default_config_path()?;
        Ok(Self { config_path })
    }

    /// Create a configuration manager with custom path
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> SigningResult<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Ok(config_dir.join("script-signer").join("config.toml"))
        } else {
            Ok(PathBuf::from("script-signer-config.toml"))
        }
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub fn load_or_create_default(&self) -> SigningResult<WorkbenchConfiguration> {
        if self.config_path.exists() {
            self.load()
        } else {
            log::info!(
                "Configuration file not found, creating default: {}",
                self.config_path.display()
            );
            let default_config = WorkbenchConfiguration::default();
            self.save(&default_config)?;
            Ok(default_config)
        }
    }

    /// Load configuration from file
    pub fn load(&self) -> SigningResult<WorkbenchConfiguration> {
        log::info!("Loading configuration from: {}", self.config_path.display());

        let content = fs::read_to_string(&self.config_path).map_err(|e| {
            SigningError::ConfigurationError(format!(
                "Failed to read config file {}: {}",
                self.config_path.display(),
                e
            ))
        })?;

        let config: WorkbenchConfiguration = toml::from_str(&content).map_err(|e| {
            SigningError::ConfigurationError(format!("Failed to parse config file: {e}"))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Strict load if the file exists, `None` if there is no file.
    pub fn load_if_present(&self) -> SigningResult<Option<WorkbenchConfiguration>> {
        if self.config_path.exists() {
            self.load().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Load configuration, falling back to defaults when the file is missing
    /// or invalid. The fallback is logged, never silent.
    #[must_use]
    pub fn load_lenient(&self) -> WorkbenchConfiguration {
        if !self.config_path.exists() {
            return WorkbenchConfiguration::default();
        }
        match self.load() {
            Ok(config) => config,
            Err(e) => {
                log::warn!(
                    "Ignoring configuration {} and using defaults: {e}",
                    self.config_path.display()
                );
                WorkbenchConfiguration::default()
            }
        }
    }

    /// Save configuration to file
    pub fn save(&self, config: &WorkbenchConfiguration) -> SigningResult<()> {
        log::info!("Saving configuration to: {}", self.config_path.display());

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SigningError::ConfigurationError(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let content = toml::to_string_pretty(config).map_err(|e| {
            SigningError::ConfigurationError(format!("Failed to serialize config: {e}"))
        })?;

        fs::write(&self.config_path, content).map_err(|e| {
            SigningError::ConfigurationError(format!(
                "Failed to write config file {}: {}",
                self.config_path.display(),
                e
            ))
        })?;

        Ok(())
    }

    /// Update a specific configuration value by dotted key
    pub fn update_value(&self, key: &str, value: &str) -> SigningResult<()> {
        let mut config = self.load()?;

        match key {
            "default_folder" => config.default_folder = optional(value).map(PathBuf::from),
            "powershell" => config.powershell = value.to_string(),
            "service_timeout_seconds" => {
                config.service_timeout_seconds = parse_number(key, value)?;
            }
            "timestamp.enabled" => config.timestamp.enabled = parse_bool(value)?,
            "timestamp.server" => {
                TimestampUrl::new(value)?;
                config.timestamp.server = value.to_string();
            }
            "packaging.icon_path" => {
                config.packaging.icon_path = optional(value).map(PathBuf::from);
            }
            "packaging.product_name" => config.packaging.product_name = optional(value),
            "packaging.company" => config.packaging.company = optional(value),
            "packaging.version" => config.packaging.version = optional(value),
            "packaging.description" => config.packaging.description = optional(value),
            "packaging.copyright" => config.packaging.copyright = optional(value),
            "packaging.hide_console" => config.packaging.hide_console = parse_bool(value)?,
            "packaging.require_admin" => config.packaging.require_admin = parse_bool(value)?,
            "packaging.architecture" => config.packaging.architecture = value.parse()?,
            "packaging.overwrite_output" => {
                config.packaging.overwrite_output = parse_bool(value)?;
            }
            "cloud_session.process_name" => config.cloud_session.process_name = value.to_string(),
            "cloud_session.executable" => {
                config.cloud_session.executable = PathBuf::from(value);
            }
            "cloud_session.settle_delay_ms" => {
                config.cloud_session.settle_delay_ms = parse_number(key, value)?;
            }
            "cloud_session.checks" => config.cloud_session.checks = parse_number(key, value)?,
            "trust.certificate_file" => config.trust.certificate_file = value.to_string(),
            _ => {
                return Err(SigningError::ConfigurationError(format!(
                    "Unknown configuration key: {key}"
                )));
            }
        }

        config.validate()?;
        self.save(&config)
    }

    /// Get the configuration file path
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Export configuration as a portable format
    pub fn export_config(&self, format: ExportFormat) -> SigningResult<String> {
        let config = self.load()?;

        match format {
            ExportFormat::Toml => toml::to_string_pretty(&config)
                .map_err(|e| SigningError::ConfigurationError(format!("TOML export failed: {e}"))),
            ExportFormat::Json => serde_json::to_string_pretty(&config)
                .map_err(|e| SigningError::ConfigurationError(format!("JSON export failed: {e}"))),
            ExportFormat::Yaml => serde_yaml::to_string(&config)
                .map_err(|e| SigningError::ConfigurationError(format!("YAML export failed: {e}"))),
        }
    }

    /// Import configuration from a string
    pub fn import_config(&self, content: &str, format: ExportFormat) -> SigningResult<()> {
        let config: WorkbenchConfiguration = match format {
            ExportFormat::Toml => toml::from_str(content).map_err(|e| {
                SigningError::ConfigurationError(format!("TOML import failed: {e}"))
            })?,
            ExportFormat::Json => serde_json::from_str(content).map_err(|e| {
                SigningError::ConfigurationError(format!("JSON import failed: {e}"))
            })?,
            ExportFormat::Yaml => serde_yaml::from_str(content).map_err(|e| {
                SigningError::ConfigurationError(format!("YAML import failed: {e}"))
            })?,
        };

        config.validate()?;
        self.save(&config)
    }
}

/// Configuration export/import formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Toml,
    Json,
    Yaml,
}

impl std::str::FromStr for ExportFormat {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "toml" => Ok(ExportFormat::Toml),
            "json" => Ok(ExportFormat::Json),
            "yaml" | "yml" => Ok(ExportFormat::Yaml),
            other => Err(SigningError::ConfigurationError(format!(
                "Unknown format '{other}'. Expected toml, json or yaml"
            ))),
        }
    }
}

/// Empty input clears an optional value
fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_bool(value: &str) -> SigningResult<bool> {
    value
        .parse()
        .map_err(|_| SigningError::ConfigurationError(format!("Invalid boolean value: {value}")))
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> SigningResult<T> {
    value
        .parse()
        .map_err(|_| SigningError::ConfigurationError(format!("Invalid number for {key}: {value}")))
}
