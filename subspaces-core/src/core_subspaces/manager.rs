//! Manager traits for subspace, section, group and permission operations
//!
//! Mutating methods take the acting user (`signer`) and fail with
//! `PermissionDenied` when that user does not hold the required permission at
//! the relevant section. The subspace owner always passes.

use super::acl::UserPermission;
use super::errors::SubspacesResult;
use super::group::{GroupUpdate, UserGroup};
use super::permission::{Permission, PermissionSet};
use super::section::{Section, SectionUpdate};
use super::subspace::{Subspace, SubspaceUpdate};
use super::types::{Address, DeletePolicy, GroupId, SectionId, SubspaceId, Timestamp};

/// Manager for subspace operations
pub trait SubspaceManager {
    /// Create a subspace together with its root section and default group.
    ///
    /// `owner` defaults to `creator`.
    fn create_subspace(
        &mut self,
        name: String,
        description: String,
        treasury: Option<Address>,
        owner: Option<Address>,
        creator: Address,
        creation_time: Timestamp,
    ) -> SubspacesResult<Subspace>;

    fn get_subspace(&self, subspace_id: SubspaceId) -> SubspacesResult<Subspace>;

    fn list_subspaces(&self) -> SubspacesResult<Vec<Subspace>>;

    /// Requires `EDIT_SUBSPACE` at the root section
    fn edit_subspace(
        &mut self,
        subspace_id: SubspaceId,
        update: SubspaceUpdate,
        signer: &Address,
    ) -> SubspacesResult<Subspace>;

    /// Requires `DELETE_SUBSPACE` at the root section. Removes everything in it.
    fn delete_subspace(&mut self, subspace_id: SubspaceId, signer: &Address) -> SubspacesResult<()>;
}

/// Manager for the section tree
pub trait SectionManager {
    /// Requires `MANAGE_SECTIONS` at the parent section
    fn create_section(
        &mut self,
        subspace_id: SubspaceId,
        parent_id: SectionId,
        name: String,
        description: String,
        creator: &Address,
    ) -> SubspacesResult<Section>;

    fn get_section(&self, subspace_id: SubspaceId, section_id: SectionId) -> SubspacesResult<Section>;

    fn list_sections(&self, subspace_id: SubspaceId) -> SubspacesResult<Vec<Section>>;

    fn list_child_sections(
        &self,
        subspace_id: SubspaceId,
        parent_id: SectionId,
    ) -> SubspacesResult<Vec<Section>>;

    /// Section IDs from `section_id` up to the root
    fn section_path(
        &self,
        subspace_id: SubspaceId,
        section_id: SectionId,
    ) -> SubspacesResult<Vec<SectionId>>;

    /// Requires `MANAGE_SECTIONS` at the section
    fn edit_section(
        &mut self,
        subspace_id: SubspaceId,
        section_id: SectionId,
        update: SectionUpdate,
        editor: &Address,
    ) -> SubspacesResult<Section>;

    /// Requires `MANAGE_SECTIONS` at the section and at the new parent.
    ///
    /// Fails with `InvalidState` if the move would create a cycle.
    fn move_section(
        &mut self,
        subspace_id: SubspaceId,
        section_id: SectionId,
        new_parent_id: SectionId,
        signer: &Address,
    ) -> SubspacesResult<Section>;

    /// Requires `MANAGE_SECTIONS` at the section. The root cannot be deleted.
    fn delete_section(
        &mut self,
        subspace_id: SubspaceId,
        section_id: SectionId,
        policy: DeletePolicy,
        signer: &Address,
    ) -> SubspacesResult<()>;
}

/// Manager for user groups and their members
pub trait GroupManager {
    /// Requires `MANAGE_GROUPS` at the section; a non-empty initial permission
    /// set additionally requires `SET_PERMISSIONS` and holding every
    /// permission being granted.
    fn create_user_group(
        &mut self,
        subspace_id: SubspaceId,
        section_id: SectionId,
        name: String,
        description: String,
        permissions: PermissionSet,
        creator: &Address,
    ) -> SubspacesResult<UserGroup>;

    fn get_user_group(&self, subspace_id: SubspaceId, group_id: GroupId) -> SubspacesResult<UserGroup>;

    fn list_user_groups(&self, subspace_id: SubspaceId) -> SubspacesResult<Vec<UserGroup>>;

    fn list_section_user_groups(
        &self,
        subspace_id: SubspaceId,
        section_id: SectionId,
    ) -> SubspacesResult<Vec<UserGroup>>;

    /// Requires `MANAGE_GROUPS` at the group section
    fn edit_user_group(
        &mut self,
        subspace_id: SubspaceId,
        group_id: GroupId,
        update: GroupUpdate,
        signer: &Address,
    ) -> SubspacesResult<UserGroup>;

    /// Requires `MANAGE_GROUPS` at the current and at the destination section
    fn move_user_group(
        &mut self,
        subspace_id: SubspaceId,
        group_id: GroupId,
        new_section_id: SectionId,
        signer: &Address,
    ) -> SubspacesResult<UserGroup>;

    /// Requires `SET_PERMISSIONS` at the group section and every permission
    /// being granted
    fn set_user_group_permissions(
        &mut self,
        subspace_id: SubspaceId,
        group_id: GroupId,
        permissions: PermissionSet,
        signer: &Address,
    ) -> SubspacesResult<UserGroup>;

    /// Requires `MANAGE_GROUPS` at the group section
    fn delete_user_group(
        &mut self,
        subspace_id: SubspaceId,
        group_id: GroupId,
        policy: DeletePolicy,
        signer: &Address,
    ) -> SubspacesResult<()>;

    /// Requires `SET_PERMISSIONS` at the group section. Adding an existing
    /// member is a no-op.
    fn add_user_to_group(
        &mut self,
        subspace_id: SubspaceId,
        group_id: GroupId,
        user: &Address,
        signer: &Address,
    ) -> SubspacesResult<()>;

    /// Requires `SET_PERMISSIONS` at the group section. Removing a non-member
    /// is a no-op.
    fn remove_user_from_group(
        &mut self,
        subspace_id: SubspaceId,
        group_id: GroupId,
        user: &Address,
        signer: &Address,
    ) -> SubspacesResult<()>;

    fn list_group_members(
        &self,
        subspace_id: SubspaceId,
        group_id: GroupId,
    ) -> SubspacesResult<Vec<Address>>;

    fn is_member_of_group(
        &self,
        subspace_id: SubspaceId,
        group_id: GroupId,
        user: &Address,
    ) -> SubspacesResult<bool>;
}

/// Manager for direct grants and permission queries
pub trait PermissionManager {
    /// Requires `SET_PERMISSIONS` at the section and every permission being
    /// granted. An empty set removes the entry.
    fn set_user_permissions(
        &mut self,
        subspace_id: SubspaceId,
        section_id: SectionId,
        user: &Address,
        permissions: PermissionSet,
        signer: &Address,
    ) -> SubspacesResult<()>;

    /// Requires `SET_PERMISSIONS` at the section. No-op if there is no entry.
    fn remove_user_permissions(
        &mut self,
        subspace_id: SubspaceId,
        section_id: SectionId,
        user: &Address,
        signer: &Address,
    ) -> SubspacesResult<()>;

    /// Permissions granted directly at one section, without inheritance
    fn get_user_permissions(
        &self,
        subspace_id: SubspaceId,
        section_id: SectionId,
        user: &Address,
    ) -> SubspacesResult<PermissionSet>;

    fn list_user_permissions(&self, subspace_id: SubspaceId) -> SubspacesResult<Vec<UserPermission>>;

    /// Effective permissions including groups and ancestor sections
    fn resolve_permissions(
        &self,
        subspace_id: SubspaceId,
        section_id: SectionId,
        user: &Address,
    ) -> SubspacesResult<PermissionSet>;

    fn has_permission(
        &self,
        subspace_id: SubspaceId,
        section_id: SectionId,
        user: &Address,
        permission: Permission,
    ) -> SubspacesResult<bool>;

    fn has_permissions(
        &self,
        subspace_id: SubspaceId,
        section_id: SectionId,
        user: &Address,
        permissions: &PermissionSet,
    ) -> SubspacesResult<bool>;
}
