//! User group data structures

use super::errors::{SubspacesError, SubspacesResult};
use super::permission::PermissionSet;
use super::types::{field_update, GroupId, SectionId, SubspaceId, DEFAULT_GROUP_ID, ROOT_SECTION_ID};
use serde::{Deserialize, Serialize};

/// A named, section-scoped set of members sharing a permission set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGroup {
    pub subspace_id: SubspaceId,
    pub section_id: SectionId,
    pub id: GroupId,
    pub name: String,
    pub description: String,
    pub permissions: PermissionSet,
}

impl UserGroup {
    pub fn new(
        subspace_id: SubspaceId,
        section_id: SectionId,
        id: GroupId,
        name: impl Into<String>,
        description: impl Into<String>,
        permissions: PermissionSet,
    ) -> Self {
        UserGroup {
            subspace_id,
            section_id,
            id,
            name: name.into(),
            description: description.into(),
            permissions,
        }
    }

    /// The default group every user of the subspace implicitly belongs to
    pub fn default_group(subspace_id: SubspaceId) -> Self {
        UserGroup::new(
            subspace_id,
            ROOT_SECTION_ID,
            DEFAULT_GROUP_ID,
            "Default",
            "This is a default user group which all users are automatically part of",
            PermissionSet::nothing(),
        )
    }

    pub fn is_default(&self) -> bool {
        self.id == DEFAULT_GROUP_ID
    }

    pub fn validate(&self) -> SubspacesResult<()> {
        if self.subspace_id == 0 {
            return Err(SubspacesError::Validation(format!(
                "invalid subspace id: {}",
                self.subspace_id
            )));
        }

        if self.is_default() && self.section_id != ROOT_SECTION_ID {
            return Err(SubspacesError::Validation(
                "the default group must live in the root section".to_string(),
            ));
        }

        if self.name.trim().is_empty() {
            return Err(SubspacesError::Validation(format!(
                "invalid group name: {:?}",
                self.name
            )));
        }

        Ok(())
    }

    /// Apply a partial update without validating the result.
    ///
    /// Permissions and section are changed through their own operations.
    pub fn update(&self, update: GroupUpdate) -> UserGroup {
        UserGroup {
            subspace_id: self.subspace_id,
            section_id: self.section_id,
            id: self.id,
            name: update.name.unwrap_or_else(|| self.name.clone()),
            description: update
                .description
                .unwrap_or_else(|| self.description.clone()),
            permissions: self.permissions.clone(),
        }
    }
}

/// Editable fields of a group. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl GroupUpdate {
    pub fn from_raw(name: &str, description: &str) -> Self {
        GroupUpdate {
            name: field_update(name),
            description: field_update(description),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_subspaces::permission::Permission;
    use crate::core_subspaces::types::DO_NOT_MODIFY;

    #[test]
    fn test_default_group() {
        let group = UserGroup::default_group(3);
        assert!(group.is_default());
        assert_eq!(group.section_id, ROOT_SECTION_ID);
        assert!(group.permissions.is_empty());
        assert!(group.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        let perms = PermissionSet::new([Permission::Write]);
        assert!(UserGroup::new(1, 1, 1, "Writers", "", perms.clone())
            .validate()
            .is_ok());
        assert!(UserGroup::new(0, 1, 1, "Writers", "", perms.clone())
            .validate()
            .is_err());
        assert!(UserGroup::new(1, 1, 1, "", "", perms.clone())
            .validate()
            .is_err());
        assert!(UserGroup::new(1, 2, 0, "Default", "", perms)
            .validate()
            .is_err());
    }

    #[test]
    fn test_update_keeps_permissions() {
        let group = UserGroup::new(
            1,
            1,
            2,
            "Writers",
            "Can write",
            PermissionSet::new([Permission::Write]),
        );
        let updated = group.update(GroupUpdate::from_raw(DO_NOT_MODIFY, "Can still write"));

        assert_eq!(updated.name, "Writers");
        assert_eq!(updated.description, "Can still write");
        assert_eq!(updated.permissions, group.permissions);
        assert_eq!(updated.section_id, group.section_id);
    }
}
