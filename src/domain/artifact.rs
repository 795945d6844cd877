//! The file currently targeted for signing or conversion.

use std::fmt;
use std::path::{Path, PathBuf};

/// Classification of a selected path, derived from its extension only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// `.ps1` or `.psm1`
    ScriptSource,
    /// `.exe`
    Executable,
    Unrecognized,
}

impl ArtifactKind {
    const SCRIPT_EXTENSIONS: [&'static str; 2] = ["ps1", "psm1"];
    const EXECUTABLE_EXTENSIONS: [&'static str; 1] = ["exe"];

    /// Classify a path by its extension, ignoring case. The file is never read.
    #[must_use]
    pub fn classify(path: &Path) -> Self {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return ArtifactKind::Unrecognized;
        };

        if Self::SCRIPT_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known))
        {
            ArtifactKind::ScriptSource
        } else if Self::EXECUTABLE_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known))
        {
            ArtifactKind::Executable
        } else {
            ArtifactKind::Unrecognized
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::ScriptSource => "script",
            ArtifactKind::Executable => "executable",
            ArtifactKind::Unrecognized => "unrecognized file",
        };
        f.write_str(name)
    }
}

/// A selected path together with its classification and the existence
/// observed when the reference was built.
///
/// Existence is a snapshot; call [`ArtifactReference::refreshed`] at the
/// point of use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactReference {
    path: PathBuf,
    kind: ArtifactKind,
    exists: bool,
}

impl ArtifactReference {
    /// Build a reference by inspecting the filesystem.
    ///
    /// Relative paths are made absolute against the working directory when it
    /// can be determined.
    ///
    /// A missing file keeps the kind its extension implies, so a deleted
    /// `report.ps1` still reads as a script. It carries `exists == false`,
    /// and that flag alone withholds every file operation.
    #[must_use]
    pub fn probe(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        };
        let exists = path.is_file();
        Self::new(path, exists)
    }

    /// Build a reference with an explicit existence flag.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, exists: bool) -> Self {
        let path = path.into();
        let kind = ArtifactKind::classify(&path);
        Self { path, kind, exists }
    }

    /// Same path, existence re-checked now.
    #[must_use]
    pub fn refreshed(&self) -> Self {
        Self {
            path: self.path.clone(),
            kind: self.kind,
            exists: self.path.is_file(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.exists
    }

    /// Default executable path for a converted script: same directory and stem.
    #[must_use]
    pub fn default_executable_path(&self) -> PathBuf {
        self.path.with_extension("exe")
    }
}

impl fmt::Display for ArtifactReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path.display(), self.kind)
    }
}
