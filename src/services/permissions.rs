//! Permission computation for the four workflow operations.
//!
//! Both functions are pure: the only inputs are the artifact (its kind and
//! existence flag) and whether an identity is selected. Callers refresh the
//! artifact's existence before asking.

use crate::domain::artifact::{ArtifactKind, ArtifactReference};
use crate::domain::identity::SigningIdentity;
use crate::domain::permissions::{Operation, WorkflowPermissions};
use crate::infra::error::{SigningError, SigningResult};

#[must_use]
pub fn compute_permissions(
    artifact: Option<&ArtifactReference>,
    identity: Option<&SigningIdentity>,
) -> WorkflowPermissions {
    let has_file = artifact.is_some_and(ArtifactReference::exists);
    let has_identity = identity.is_some();
    let kind = artifact.map(ArtifactReference::kind);
    let is_script = has_file && kind == Some(ArtifactKind::ScriptSource);
    let is_executable = has_file && kind == Some(ArtifactKind::Executable);

    WorkflowPermissions {
        can_sign_script: is_script && has_identity,
        can_convert_to_executable: is_script,
        can_sign_executable: is_executable && has_identity,
        can_manage_cloud_session: true,
    }
}

/// Artifact kind an operation needs, if any.
#[must_use]
pub fn required_kind(operation: Operation) -> Option<ArtifactKind> {
    match operation {
        Operation::SignScript | Operation::ConvertToExecutable => Some(ArtifactKind::ScriptSource),
        Operation::SignExecutable => Some(ArtifactKind::Executable),
        Operation::ManageCloudSession => None,
    }
}

/// Reject `operation` with the specific reason it is not permitted.
///
/// Succeeds exactly when `compute_permissions(..).allows(operation)`.
///
/// # Errors
///
/// `NoArtifactSelected`, `ArtifactTypeMismatch` or `NoIdentitySelected`,
/// checked in that order.
pub fn ensure_permitted(
    operation: Operation,
    artifact: Option<&ArtifactReference>,
    identity: Option<&SigningIdentity>,
) -> SigningResult<()> {
    let Some(expected) = required_kind(operation) else {
        return Ok(());
    };

    let artifact = match artifact {
        None => {
            return Err(SigningError::NoArtifactSelected(format!(
                "select a {expected} before trying to {operation}"
            )))
        }
        Some(artifact) if !artifact.exists() => {
            return Err(SigningError::NoArtifactSelected(format!(
                "{} does not exist",
                artifact.path().display()
            )))
        }
        Some(artifact) => artifact,
    };

    if artifact.kind() != expected {
        return Err(SigningError::ArtifactTypeMismatch {
            expected,
            found: artifact.kind(),
            path: artifact.path().to_path_buf(),
        });
    }

    let needs_identity = matches!(operation, Operation::SignScript | Operation::SignExecutable);
    if needs_identity && identity.is_none() {
        return Err(SigningError::NoIdentitySelected);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::Thumbprint;
    use crate::infra::error::ErrorKind;
    use chrono::{Duration, Utc};

    fn identity() -> SigningIdentity {
        SigningIdentity::new(
            Thumbprint::new("A".repeat(40)).unwrap(),
            "CN=Dev Cert",
            Utc::now() + Duration::days(30),
        )
    }

    fn artifacts() -> Vec<Option<ArtifactReference>> {
        let mut all = vec![None];
        for name in ["a.ps1", "a.psm1", "a.exe", "a.txt"] {
            for exists in [true, false] {
                all.push(Some(ArtifactReference::new(name, exists)));
            }
        }
        all
    }

    #[test]
    fn test_existing_script_without_identity() {
        let script = ArtifactReference::new("report.ps1", true);
        let permissions = compute_permissions(Some(&script), None);
        assert!(!permissions.can_sign_script);
        assert!(permissions.can_convert_to_executable);
        assert!(!permissions.can_sign_executable);
        assert!(permissions.can_manage_cloud_session);
    }

    #[test]
    fn test_missing_file_permits_only_cloud_session() {
        let identity = identity();
        let exe = ArtifactReference::new("tool.exe", false);
        let permissions = compute_permissions(Some(&exe), Some(&identity));
        assert_eq!(permissions.permitted(), vec![Operation::ManageCloudSession]);
    }

    #[test]
    fn test_executable_with_identity() {
        let identity = identity();
        let exe = ArtifactReference::new("tool.exe", true);
        let permissions = compute_permissions(Some(&exe), Some(&identity));
        assert!(permissions.can_sign_executable);
        assert!(!permissions.can_sign_script);
        assert!(!permissions.can_convert_to_executable);
    }

    #[test]
    fn test_compute_is_repeatable() {
        let identity = identity();
        for artifact in artifacts() {
            for id in [None, Some(&identity)] {
                assert_eq!(
                    compute_permissions(artifact.as_ref(), id),
                    compute_permissions(artifact.as_ref(), id)
                );
            }
        }
    }

    #[test]
    fn test_ensure_agrees_with_compute() {
        let identity = identity();
        for artifact in artifacts() {
            for id in [None, Some(&identity)] {
                let permissions = compute_permissions(artifact.as_ref(), id);
                for op in Operation::ALL {
                    assert_eq!(
                        permissions.allows(op),
                        ensure_permitted(op, artifact.as_ref(), id).is_ok(),
                        "{op} with {artifact:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_rejection_kinds() {
        let identity = identity();
        let script = ArtifactReference::new("report.ps1", true);
        let exe = ArtifactReference::new("report.exe", true);

        fn kind(
            op: Operation,
            artifact: Option<&ArtifactReference>,
            id: Option<&SigningIdentity>,
        ) -> ErrorKind {
            ensure_permitted(op, artifact, id).unwrap_err().kind()
        }

        assert_eq!(
            kind(Operation::SignScript, None, Some(&identity)),
            ErrorKind::NoArtifactSelected
        );
        assert_eq!(
            kind(Operation::SignScript, Some(&exe), Some(&identity)),
            ErrorKind::ArtifactTypeMismatch
        );
        assert_eq!(
            kind(Operation::SignExecutable, Some(&script), Some(&identity)),
            ErrorKind::ArtifactTypeMismatch
        );
        assert_eq!(
            kind(Operation::ConvertToExecutable, Some(&exe), None),
            ErrorKind::ArtifactTypeMismatch
        );
        assert_eq!(
            kind(Operation::SignScript, Some(&script), None),
            ErrorKind::NoIdentitySelected
        );
        assert_eq!(
            kind(
                Operation::SignExecutable,
                Some(&ArtifactReference::new("gone.exe", false)),
                Some(&identity)
            ),
            ErrorKind::NoArtifactSelected
        );
    }
}
