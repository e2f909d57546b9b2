//! Direct permission grants and group membership records

use super::address::AddressValidator;
use super::errors::{SubspacesError, SubspacesResult};
use super::permission::{PermissionRegistry, PermissionSet};
use super::types::{Address, GroupId, SectionId, SubspaceId, DEFAULT_GROUP_ID};
use serde::{Deserialize, Serialize};

/// Permissions granted to one user at one section of a subspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPermission {
    pub subspace_id: SubspaceId,
    pub section_id: SectionId,
    pub user: Address,
    pub permissions: PermissionSet,
}

impl UserPermission {
    pub fn new(
        subspace_id: SubspaceId,
        section_id: SectionId,
        user: Address,
        permissions: PermissionSet,
    ) -> Self {
        UserPermission {
            subspace_id,
            section_id,
            user,
            permissions,
        }
    }

    pub fn validate(
        &self,
        registry: &PermissionRegistry,
        addresses: &dyn AddressValidator,
    ) -> SubspacesResult<()> {
        if self.subspace_id == 0 {
            return Err(SubspacesError::Validation(format!(
                "invalid subspace id: {}",
                self.subspace_id
            )));
        }

        addresses.validate(self.user.as_str()).map_err(|e| {
            SubspacesError::Validation(format!("invalid user address {}: {}", self.user, e))
        })?;

        // A stored grant always holds something; an empty set means no entry
        if self.permissions.is_empty() {
            return Err(SubspacesError::Validation(format!(
                "empty permission set for {} at section {} of subspace {}",
                self.user, self.section_id, self.subspace_id
            )));
        }

        registry.validate_set(&self.permissions)
    }
}

/// Membership of one user in one group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGroupMemberEntry {
    pub subspace_id: SubspaceId,
    pub group_id: GroupId,
    pub user: Address,
}

impl UserGroupMemberEntry {
    pub fn new(subspace_id: SubspaceId, group_id: GroupId, user: Address) -> Self {
        UserGroupMemberEntry {
            subspace_id,
            group_id,
            user,
        }
    }

    /// Members of the default group are implicit and never stored
    pub fn validate(&self, addresses: &dyn AddressValidator) -> SubspacesResult<()> {
        if self.subspace_id == 0 {
            return Err(SubspacesError::Validation(format!(
                "invalid subspace id: {}",
                self.subspace_id
            )));
        }

        if self.group_id == DEFAULT_GROUP_ID {
            return Err(SubspacesError::Validation(
                "the default group cannot have explicit members".to_string(),
            ));
        }

        addresses.validate(self.user.as_str()).map_err(|e| {
            SubspacesError::Validation(format!("invalid user address {}: {}", self.user, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_subspaces::address::Bech32Validator;
    use crate::core_subspaces::permission::Permission;

    fn user() -> Address {
        Address::new(Bech32Validator::default().encode(&[7; 20]))
    }

    #[test]
    fn test_user_permission_validation() {
        let validator = Bech32Validator::default();
        let registry = PermissionRegistry::all();

        let entry = UserPermission::new(1, 0, user(), Permission::Write.into());
        assert!(entry.validate(&registry, &validator).is_ok());

        let zero = UserPermission::new(0, 0, user(), Permission::Write.into());
        assert!(matches!(
            zero.validate(&registry, &validator),
            Err(SubspacesError::Validation(_))
        ));

        let bad_user = UserPermission::new(1, 0, Address::new("nope"), PermissionSet::nothing());
        assert!(bad_user.validate(&registry, &validator).is_err());
    }

    #[test]
    fn test_user_permission_rejects_empty_set() {
        let entry = UserPermission::new(1, 0, user(), PermissionSet::nothing());
        assert!(matches!(
            entry.validate(&PermissionRegistry::all(), &Bech32Validator::default()),
            Err(SubspacesError::Validation(_))
        ));
    }

    #[test]
    fn test_user_permission_rejects_unregistered_permission() {
        let validator = Bech32Validator::default();
        let registry = PermissionRegistry::from_names(["write"]).unwrap();

        let entry = UserPermission::new(1, 0, user(), Permission::ManageGroups.into());
        assert!(matches!(
            entry.validate(&registry, &validator),
            Err(SubspacesError::Validation(_))
        ));
    }

    #[test]
    fn test_member_entry_validation() {
        let validator = Bech32Validator::default();
        assert!(UserGroupMemberEntry::new(1, 1, user())
            .validate(&validator)
            .is_ok());
        assert!(UserGroupMemberEntry::new(1, DEFAULT_GROUP_ID, user())
            .validate(&validator)
            .is_err());
        assert!(UserGroupMemberEntry::new(1, 1, Address::new("x"))
            .validate(&validator)
            .is_err());
    }
}
