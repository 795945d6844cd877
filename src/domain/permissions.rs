//! The four workflow operations and the flags that gate them.

use std::fmt;

/// Operations a user can invoke from the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    SignScript,
    ConvertToExecutable,
    SignExecutable,
    ManageCloudSession,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::SignScript,
        Operation::ConvertToExecutable,
        Operation::SignExecutable,
        Operation::ManageCloudSession,
    ];
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::SignScript => "sign script",
            Operation::ConvertToExecutable => "convert to executable",
            Operation::SignExecutable => "sign executable",
            Operation::ManageCloudSession => "manage cloud session",
        };
        f.write_str(name)
    }
}

/// Which operations are currently permitted. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkflowPermissions {
    pub can_sign_script: bool,
    pub can_convert_to_executable: bool,
    pub can_sign_executable: bool,
    pub can_manage_cloud_session: bool,
}

impl WorkflowPermissions {
    #[must_use]
    pub fn allows(&self, operation: Operation) -> bool {
        match operation {
            Operation::SignScript => self.can_sign_script,
            Operation::ConvertToExecutable => self.can_convert_to_executable,
            Operation::SignExecutable => self.can_sign_executable,
            Operation::ManageCloudSession => self.can_manage_cloud_session,
        }
    }

    /// Operations currently permitted, in menu order.
    #[must_use]
    pub fn permitted(&self) -> Vec<Operation> {
        Operation::ALL
            .into_iter()
            .filter(|op| self.allows(*op))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_maps_each_flag() {
        let permissions = WorkflowPermissions {
            can_sign_script: false,
            can_convert_to_executable: true,
            can_sign_executable: false,
            can_manage_cloud_session: true,
        };
        assert_eq!(
            permissions.permitted(),
            vec![Operation::ConvertToExecutable, Operation::ManageCloudSession]
        );
    }
}
