//! Custom assertions for tests
//!
//! Expressive helpers that give better messages than bare `matches!`.

use crate::core_subspaces::{Permission, PermissionSet, SubspacesError};
use std::fmt::Debug;

/// Assert that a Result is Ok and return the value
pub fn assert_ok<T, E: Debug>(result: Result<T, E>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => panic!("Expected Ok, got Err: {:?}", e),
    }
}

/// Assert that a Result is Err and return the error
pub fn assert_err<T: Debug, E>(result: Result<T, E>) -> E {
    match result {
        Ok(value) => panic!("Expected Err, got Ok: {:?}", value),
        Err(e) => e,
    }
}

/// Assert that an operation failed with the given error class (see [`SubspacesError::kind`])
pub fn assert_error_kind<T: Debug>(result: Result<T, SubspacesError>, kind: &str) {
    let err = assert_err(result);
    if err.kind() != kind {
        panic!("Expected {} error, got {}: {}", kind, err.kind(), err);
    }
}

/// Assert that an operation was denied for lacking `missing`
pub fn assert_permission_denied<T: Debug>(result: Result<T, SubspacesError>, missing: Permission) {
    match assert_err(result) {
        SubspacesError::PermissionDenied { required, .. } => {
            if !required.check(missing) {
                panic!("Expected denial for {}, required set was {}", missing, required);
            }
        }
        other => panic!("Expected PermissionDenied, got {}", other),
    }
}

/// Assert that two permission sets hold the same permissions, ignoring order
pub fn assert_same_permissions(actual: &PermissionSet, expected: &PermissionSet) {
    if sorted_codes(actual) != sorted_codes(expected) {
        panic!("Permission sets differ: got {}, expected {}", actual, expected);
    }
}

fn sorted_codes(set: &PermissionSet) -> Vec<u32> {
    let mut codes: Vec<u32> = set.iter().map(|p| p.code()).collect();
    codes.sort_unstable();
    codes.dedup();
    codes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_ok_and_err() {
        let ok: Result<u8, String> = Ok(3);
        assert_eq!(assert_ok(ok), 3);
        let err: Result<u8, String> = Err("no".to_string());
        assert_eq!(assert_err(err), "no");
    }

    #[test]
    fn test_assert_error_kind() {
        let result: Result<(), SubspacesError> =
            Err(SubspacesError::NotFound("subspace 9".to_string()));
        assert_error_kind(result, "not_found");
    }

    #[test]
    #[should_panic(expected = "Expected PermissionDenied")]
    fn test_assert_permission_denied_rejects_other_errors() {
        let result: Result<(), SubspacesError> =
            Err(SubspacesError::Validation("blank".to_string()));
        assert_permission_denied(result, Permission::Write);
    }

    #[test]
    fn test_assert_same_permissions_ignores_order() {
        assert_same_permissions(
            &PermissionSet::new([Permission::Write, Permission::ManageGroups]),
            &PermissionSet::new([Permission::ManageGroups, Permission::Write]),
        );
    }
}
