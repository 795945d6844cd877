//! Tracks the single artifact currently targeted by the workflow.

use crate::domain::artifact::ArtifactReference;
use std::path::Path;

/// Holds at most one selected artifact. Selecting replaces; no history.
#[derive(Debug, Default, Clone)]
pub struct ArtifactSelector {
    current: Option<ArtifactReference>,
}

impl ArtifactSelector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `path`, classifying it by extension.
    ///
    /// Never fails: a missing file is recorded with `exists() == false`.
    pub fn select_path(&mut self, path: impl AsRef<Path>) -> &ArtifactReference {
        let artifact = ArtifactReference::probe(path);
        log::debug!(
            "Selected {artifact}{}",
            if artifact.exists() { "" } else { " (missing)" }
        );
        self.current.insert(artifact)
    }

    /// Last selected artifact, or `None` if nothing was ever selected.
    #[must_use]
    pub fn current(&self) -> Option<&ArtifactReference> {
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::artifact::ArtifactKind;
    use tempfile::TempDir;

    #[test]
    fn test_nothing_selected_initially() {
        assert!(ArtifactSelector::new().current().is_none());
    }

    #[test]
    fn test_select_replaces_previous() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("report.ps1");
        std::fs::write(&script, "Write-Output 1").unwrap();

        let mut selector = ArtifactSelector::new();
        selector.select_path(&script);
        selector.select_path(dir.path().join("notes.txt"));

        let current = selector.current().unwrap();
        assert_eq!(current.kind(), ArtifactKind::Unrecognized);
        assert!(!current.exists());
    }

    #[test]
    fn test_classification_is_stable() {
        let mut selector = ArtifactSelector::new();
        let first = selector.select_path("Tool.PSM1").clone();
        let second = selector.select_path("Tool.PSM1").clone();
        assert_eq!(first, second);
        assert_eq!(first.kind(), ArtifactKind::ScriptSource);
        assert!(first.path().is_absolute());
    }
}
