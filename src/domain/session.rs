//! Cloud-signing companion process supervision settings and outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// How to find, start and confirm the companion application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudSessionSettings {
    /// Process name as reported by the OS, without extension.
    pub process_name: String,
    pub executable: PathBuf,
    /// Wait before each liveness check after launching.
    pub settle_delay: Duration,
    /// Number of liveness checks before giving up.
    pub checks: u32,
}

impl Default for CloudSessionSettings {
    fn default() -> Self {
        Self {
            process_name: "SimplySignDesktop".to_string(),
            executable: PathBuf::from(
                r"C:\Program Files\Certum\SimplySign Desktop\SimplySignDesktop.exe",
            ),
            settle_delay: Duration::from_secs(3),
            checks: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudSessionStatus {
    /// The companion was already running; nothing was launched.
    AlreadyRunning,
    /// The companion was launched and observed alive.
    Started,
}

impl fmt::Display for CloudSessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloudSessionStatus::AlreadyRunning => f.write_str("already running"),
            CloudSessionStatus::Started => f.write_str("started"),
        }
    }
}
