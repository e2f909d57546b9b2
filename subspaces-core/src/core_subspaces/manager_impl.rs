//! Manager trait implementations with authorization and business rules

use super::acl::UserPermission;
use super::errors::{SubspacesError, SubspacesResult};
use super::group::{GroupUpdate, UserGroup};
use super::hooks::SubspacesHooks;
use super::keeper::Keeper;
use super::manager::{GroupManager, PermissionManager, SectionManager, SubspaceManager};
use super::permission::{Permission, PermissionSet};
use super::section::{Section, SectionUpdate};
use super::storage::KvStore;
use super::subspace::{Subspace, SubspaceUpdate};
use super::types::{
    Address, DeletePolicy, GroupId, SectionId, SubspaceId, Timestamp, DEFAULT_GROUP_ID,
    FIRST_LOCAL_ID, ROOT_SECTION_ID,
};
use crate::metrics::record_denied;
use std::collections::{BTreeMap, HashSet};
use tracing::{info, warn};

/// Manager implementation over a [`Keeper`]
pub struct SubspacesManagerImpl<S: KvStore> {
    keeper: Keeper<S>,
}

impl<S: KvStore> SubspacesManagerImpl<S> {
    pub fn new(keeper: Keeper<S>) -> Self {
        Self { keeper }
    }

    pub fn keeper(&self) -> &Keeper<S> {
        &self.keeper
    }

    /// Direct state access, bypassing authorization
    pub fn keeper_mut(&mut self) -> &mut Keeper<S> {
        &mut self.keeper
    }

    pub fn into_keeper(self) -> Keeper<S> {
        self.keeper
    }

    pub fn register_hook(&mut self, hook: Box<dyn SubspacesHooks>) {
        self.keeper.register_hook(hook);
    }

    fn authorize(
        &self,
        op: &'static str,
        subspace_id: SubspaceId,
        section_id: SectionId,
        signer: &Address,
        permission: Permission,
    ) -> SubspacesResult<()> {
        self.keeper
            .require_permissions(op, subspace_id, section_id, signer, &permission.into())
    }

    /// Check the signer may hand out `permissions` at a section.
    ///
    /// Granting requires `SET_PERMISSIONS` and holding every permission being
    /// granted.
    fn authorize_grant(
        &self,
        op: &'static str,
        subspace_id: SubspaceId,
        section_id: SectionId,
        signer: &Address,
        permissions: &PermissionSet,
    ) -> SubspacesResult<()> {
        self.keeper.registry().validate_set(permissions)?;
        let required = PermissionSet::combine([
            &PermissionSet::from(Permission::SetPermissions),
            permissions,
        ]);
        self.keeper
            .require_permissions(op, subspace_id, section_id, signer, &required)
    }

    /// Sections under `section_id` (inclusive), children before parents
    fn collect_subtree(
        &self,
        subspace_id: SubspaceId,
        section_id: SectionId,
    ) -> SubspacesResult<Vec<SectionId>> {
        let mut children: BTreeMap<SectionId, Vec<SectionId>> = BTreeMap::new();
        for section in self.keeper.list_sections(subspace_id)? {
            if !section.is_root() {
                children.entry(section.parent_id).or_default().push(section.id);
            }
        }

        let mut order = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![(section_id, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            if !visited.insert(id) {
                return Err(SubspacesError::InvalidState(format!(
                    "section {} of subspace {} is part of a cycle",
                    id, subspace_id
                )));
            }
            stack.push((id, true));
            for child in children.get(&id).into_iter().flatten() {
                stack.push((*child, false));
            }
        }
        Ok(order)
    }

    /// Store every address of a validated subspace in canonical form
    fn canonical_subspace(&self, subspace: Subspace) -> Subspace {
        Subspace {
            treasury: subspace
                .treasury
                .as_ref()
                .map(|t| self.keeper.canonical_address(t)),
            owner: self.keeper.canonical_address(&subspace.owner),
            creator: self.keeper.canonical_address(&subspace.creator),
            ..subspace
        }
    }

    fn reject_default_group(group_id: GroupId, action: &str) -> SubspacesResult<()> {
        if group_id == DEFAULT_GROUP_ID {
            return Err(SubspacesError::Validation(format!(
                "the default group cannot be {}",
                action
            )));
        }
        Ok(())
    }
}

impl<S: KvStore> SubspaceManager for SubspacesManagerImpl<S> {
    fn create_subspace(
        &mut self,
        name: String,
        description: String,
        treasury: Option<Address>,
        owner: Option<Address>,
        creator: Address,
        creation_time: Timestamp,
    ) -> SubspacesResult<Subspace> {
        self.keeper.validate_address(&creator)?;
        let owner = owner.unwrap_or_else(|| creator.clone());

        // Validate against the ID about to be handed out, before writing anything
        let next_id = self.keeper.get_next_subspace_id()?;
        let candidate = Subspace::new(
            next_id,
            name,
            description,
            treasury,
            owner,
            creator,
            creation_time,
        );
        candidate.validate(self.keeper.address_validator())?;

        let subspace_id = self.keeper.allocate_subspace_id()?;
        let subspace = Subspace {
            id: subspace_id,
            ..self.canonical_subspace(candidate)
        };

        self.keeper.save_subspace(&subspace)?;
        self.keeper.save_section(&Section::root(subspace_id))?;
        self.keeper.save_user_group(&UserGroup::default_group(subspace_id))?;
        self.keeper.set_next_section_id(subspace_id, FIRST_LOCAL_ID)?;
        self.keeper.set_next_group_id(subspace_id, FIRST_LOCAL_ID)?;

        info!(
            subspace_id,
            owner = %subspace.owner,
            creator = %subspace.creator,
            "Created subspace"
        );
        Ok(subspace)
    }

    fn get_subspace(&self, subspace_id: SubspaceId) -> SubspacesResult<Subspace> {
        self.keeper.require_subspace(subspace_id)
    }

    fn list_subspaces(&self) -> SubspacesResult<Vec<Subspace>> {
        self.keeper.list_subspaces()
    }

    fn edit_subspace(
        &mut self,
        subspace_id: SubspaceId,
        update: SubspaceUpdate,
        signer: &Address,
    ) -> SubspacesResult<Subspace> {
        let subspace = self.keeper.require_subspace(subspace_id)?;
        let updated = subspace.update(update);
        updated.validate(self.keeper.address_validator())?;
        self.authorize(
            "edit_subspace",
            subspace_id,
            ROOT_SECTION_ID,
            signer,
            Permission::EditSubspace,
        )?;
        let updated = self.canonical_subspace(updated);

        self.keeper.save_subspace(&updated)?;
        info!(subspace_id, signer = %signer, "Edited subspace");
        Ok(updated)
    }

    fn delete_subspace(&mut self, subspace_id: SubspaceId, signer: &Address) -> SubspacesResult<()> {
        self.keeper.require_subspace(subspace_id)?;
        self.authorize(
            "delete_subspace",
            subspace_id,
            ROOT_SECTION_ID,
            signer,
            Permission::DeleteSubspace,
        )?;
        self.keeper.delete_subspace(subspace_id)
    }
}

impl<S: KvStore> SectionManager for SubspacesManagerImpl<S> {
    fn create_section(
        &mut self,
        subspace_id: SubspaceId,
        parent_id: SectionId,
        name: String,
        description: String,
        creator: &Address,
    ) -> SubspacesResult<Section> {
        self.keeper.require_subspace(subspace_id)?;
        self.keeper.require_section(subspace_id, parent_id)?;

        let next_id = self.keeper.get_next_section_id(subspace_id)?;
        if next_id == ROOT_SECTION_ID {
            return Err(SubspacesError::InvalidState(format!(
                "section id counter of subspace {} points at the root section",
                subspace_id
            )));
        }
        let candidate = Section::new(subspace_id, next_id, parent_id, name, description);
        candidate.validate()?;

        self.authorize(
            "create_section",
            subspace_id,
            parent_id,
            creator,
            Permission::ManageSections,
        )?;

        let section_id = self.keeper.allocate_section_id(subspace_id)?;
        let section = Section {
            id: section_id,
            ..candidate
        };
        self.keeper.save_section(&section)?;

        info!(subspace_id, section_id, parent_id, "Created section");
        Ok(section)
    }

    fn get_section(&self, subspace_id: SubspaceId, section_id: SectionId) -> SubspacesResult<Section> {
        self.keeper.require_section(subspace_id, section_id)
    }

    fn list_sections(&self, subspace_id: SubspaceId) -> SubspacesResult<Vec<Section>> {
        self.keeper.list_sections(subspace_id)
    }

    fn list_child_sections(
        &self,
        subspace_id: SubspaceId,
        parent_id: SectionId,
    ) -> SubspacesResult<Vec<Section>> {
        self.keeper.list_child_sections(subspace_id, parent_id)
    }

    fn section_path(
        &self,
        subspace_id: SubspaceId,
        section_id: SectionId,
    ) -> SubspacesResult<Vec<SectionId>> {
        self.keeper.section_path(subspace_id, section_id)
    }

    fn edit_section(
        &mut self,
        subspace_id: SubspaceId,
        section_id: SectionId,
        update: SectionUpdate,
        editor: &Address,
    ) -> SubspacesResult<Section> {
        self.keeper.require_subspace(subspace_id)?;
        let section = self.keeper.require_section(subspace_id, section_id)?;
        let updated = section.update(update);
        updated.validate()?;
        self.authorize(
            "edit_section",
            subspace_id,
            section_id,
            editor,
            Permission::ManageSections,
        )?;

        self.keeper.save_section(&updated)?;
        info!(subspace_id, section_id, "Edited section");
        Ok(updated)
    }

    fn move_section(
        &mut self,
        subspace_id: SubspaceId,
        section_id: SectionId,
        new_parent_id: SectionId,
        signer: &Address,
    ) -> SubspacesResult<Section> {
        self.keeper.require_subspace(subspace_id)?;
        if section_id == ROOT_SECTION_ID {
            return Err(SubspacesError::Validation(
                "the root section cannot be moved".to_string(),
            ));
        }
        let section = self.keeper.require_section(subspace_id, section_id)?;
        self.keeper.require_section(subspace_id, new_parent_id)?;

        self.authorize(
            "move_section",
            subspace_id,
            section_id,
            signer,
            Permission::ManageSections,
        )?;
        self.authorize(
            "move_section",
            subspace_id,
            new_parent_id,
            signer,
            Permission::ManageSections,
        )?;

        // The new parent must not sit below the section being moved
        let path = self.keeper.section_path(subspace_id, new_parent_id)?;
        if path.contains(&section_id) {
            return Err(SubspacesError::InvalidState(format!(
                "moving section {} under section {} would create a cycle",
                section_id, new_parent_id
            )));
        }

        let moved = Section {
            parent_id: new_parent_id,
            ..section
        };
        moved.validate()?;
        self.keeper.save_section(&moved)?;

        info!(subspace_id, section_id, new_parent_id, "Moved section");
        Ok(moved)
    }

    fn delete_section(
        &mut self,
        subspace_id: SubspaceId,
        section_id: SectionId,
        policy: DeletePolicy,
        signer: &Address,
    ) -> SubspacesResult<()> {
        self.keeper.require_subspace(subspace_id)?;
        if section_id == ROOT_SECTION_ID {
            return Err(SubspacesError::Validation(
                "the root section cannot be deleted".to_string(),
            ));
        }
        self.keeper.require_section(subspace_id, section_id)?;
        self.authorize(
            "delete_section",
            subspace_id,
            section_id,
            signer,
            Permission::ManageSections,
        )?;

        let subtree = match policy {
            DeletePolicy::Reject => {
                let children = self.keeper.list_child_sections(subspace_id, section_id)?;
                let groups = self
                    .keeper
                    .list_section_user_groups(subspace_id, section_id)?;
                if !children.is_empty() || !groups.is_empty() {
                    return Err(SubspacesError::InvalidState(format!(
                        "section {} of subspace {} still has {} child sections and {} groups",
                        section_id,
                        subspace_id,
                        children.len(),
                        groups.len()
                    )));
                }
                vec![section_id]
            }
            DeletePolicy::Cascade => self.collect_subtree(subspace_id, section_id)?,
        };

        for id in &subtree {
            for group in self.keeper.list_section_user_groups(subspace_id, *id)? {
                self.keeper.delete_user_group(subspace_id, group.id)?;
            }
            self.keeper.delete_section(subspace_id, *id)?;
        }

        info!(
            subspace_id,
            section_id,
            removed = subtree.len(),
            "Deleted section"
        );
        Ok(())
    }
}

impl<S: KvStore> GroupManager for SubspacesManagerImpl<S> {
    fn create_user_group(
        &mut self,
        subspace_id: SubspaceId,
        section_id: SectionId,
        name: String,
        description: String,
        permissions: PermissionSet,
        creator: &Address,
    ) -> SubspacesResult<UserGroup> {
        self.keeper.require_subspace(subspace_id)?;
        self.keeper.require_section(subspace_id, section_id)?;

        let next_id = self.keeper.get_next_group_id(subspace_id)?;
        if next_id == DEFAULT_GROUP_ID {
            return Err(SubspacesError::InvalidState(format!(
                "group id counter of subspace {} points at the default group",
                subspace_id
            )));
        }
        let candidate = UserGroup::new(
            subspace_id,
            section_id,
            next_id,
            name,
            description,
            permissions,
        );
        candidate.validate()?;
        self.keeper.registry().validate_set(&candidate.permissions)?;

        self.authorize(
            "create_user_group",
            subspace_id,
            section_id,
            creator,
            Permission::ManageGroups,
        )?;
        if !candidate.permissions.is_empty() {
            self.authorize_grant(
                "create_user_group",
                subspace_id,
                section_id,
                creator,
                &candidate.permissions,
            )?;
        }

        let group_id = self.keeper.allocate_group_id(subspace_id)?;
        let group = UserGroup {
            id: group_id,
            ..candidate
        };
        self.keeper.save_user_group(&group)?;

        info!(subspace_id, group_id, section_id, "Created user group");
        Ok(group)
    }

    fn get_user_group(&self, subspace_id: SubspaceId, group_id: GroupId) -> SubspacesResult<UserGroup> {
        self.keeper.require_user_group(subspace_id, group_id)
    }

    fn list_user_groups(&self, subspace_id: SubspaceId) -> SubspacesResult<Vec<UserGroup>> {
        self.keeper.list_user_groups(subspace_id)
    }

    fn list_section_user_groups(
        &self,
        subspace_id: SubspaceId,
        section_id: SectionId,
    ) -> SubspacesResult<Vec<UserGroup>> {
        self.keeper.list_section_user_groups(subspace_id, section_id)
    }

    fn edit_user_group(
        &mut self,
        subspace_id: SubspaceId,
        group_id: GroupId,
        update: GroupUpdate,
        signer: &Address,
    ) -> SubspacesResult<UserGroup> {
        self.keeper.require_subspace(subspace_id)?;
        let group = self.keeper.require_user_group(subspace_id, group_id)?;
        let updated = group.update(update);
        updated.validate()?;
        self.authorize(
            "edit_user_group",
            subspace_id,
            group.section_id,
            signer,
            Permission::ManageGroups,
        )?;

        self.keeper.save_user_group(&updated)?;
        info!(subspace_id, group_id, "Edited user group");
        Ok(updated)
    }

    fn move_user_group(
        &mut self,
        subspace_id: SubspaceId,
        group_id: GroupId,
        new_section_id: SectionId,
        signer: &Address,
    ) -> SubspacesResult<UserGroup> {
        self.keeper.require_subspace(subspace_id)?;
        Self::reject_default_group(group_id, "moved")?;
        let group = self.keeper.require_user_group(subspace_id, group_id)?;
        self.keeper.require_section(subspace_id, new_section_id)?;

        self.authorize(
            "move_user_group",
            subspace_id,
            group.section_id,
            signer,
            Permission::ManageGroups,
        )?;
        self.authorize(
            "move_user_group",
            subspace_id,
            new_section_id,
            signer,
            Permission::ManageGroups,
        )?;
        // Landing the group in a new section grants its permissions there
        if !group.permissions.is_empty() {
            self.authorize_grant(
                "move_user_group",
                subspace_id,
                new_section_id,
                signer,
                &group.permissions,
            )?;
        }

        let moved = UserGroup {
            section_id: new_section_id,
            ..group
        };
        self.keeper.save_user_group(&moved)?;

        info!(subspace_id, group_id, new_section_id, "Moved user group");
        Ok(moved)
    }

    fn set_user_group_permissions(
        &mut self,
        subspace_id: SubspaceId,
        group_id: GroupId,
        permissions: PermissionSet,
        signer: &Address,
    ) -> SubspacesResult<UserGroup> {
        let subspace = self.keeper.require_subspace(subspace_id)?;
        let group = self.keeper.require_user_group(subspace_id, group_id)?;
        self.authorize_grant(
            "set_user_group_permissions",
            subspace_id,
            group.section_id,
            signer,
            &permissions,
        )?;

        // Members cannot raise their own group, only the owner can
        if !self.keeper.same_address(signer, &subspace.owner)
            && !group.is_default()
            && self.keeper.is_member_of_group(subspace_id, group_id, signer)?
        {
            record_denied("set_user_group_permissions");
            warn!(
                subspace_id,
                group_id,
                signer = %signer,
                "Group member tried to change its own group permissions"
            );
            return Err(SubspacesError::PermissionDenied {
                subspace_id,
                section_id: group.section_id,
                user: signer.clone(),
                required: PermissionSet::everything(),
            });
        }

        let updated = UserGroup {
            permissions,
            ..group
        };
        self.keeper.save_user_group(&updated)?;

        info!(
            subspace_id,
            group_id,
            permissions = %updated.permissions,
            "Set user group permissions"
        );
        Ok(updated)
    }

    fn delete_user_group(
        &mut self,
        subspace_id: SubspaceId,
        group_id: GroupId,
        policy: DeletePolicy,
        signer: &Address,
    ) -> SubspacesResult<()> {
        self.keeper.require_subspace(subspace_id)?;
        Self::reject_default_group(group_id, "deleted")?;
        let group = self.keeper.require_user_group(subspace_id, group_id)?;
        self.authorize(
            "delete_user_group",
            subspace_id,
            group.section_id,
            signer,
            Permission::ManageGroups,
        )?;

        if policy == DeletePolicy::Reject {
            let members = self.keeper.list_group_members(subspace_id, group_id)?;
            if !members.is_empty() {
                return Err(SubspacesError::InvalidState(format!(
                    "group {} of subspace {} still has {} members",
                    group_id,
                    subspace_id,
                    members.len()
                )));
            }
        }

        self.keeper.delete_user_group(subspace_id, group_id)
    }

    fn add_user_to_group(
        &mut self,
        subspace_id: SubspaceId,
        group_id: GroupId,
        user: &Address,
        signer: &Address,
    ) -> SubspacesResult<()> {
        self.keeper.require_subspace(subspace_id)?;
        Self::reject_default_group(group_id, "given explicit members")?;
        let group = self.keeper.require_user_group(subspace_id, group_id)?;
        self.keeper.validate_address(user)?;
        self.authorize(
            "add_user_to_group",
            subspace_id,
            group.section_id,
            signer,
            Permission::SetPermissions,
        )?;

        if self.keeper.add_user_to_group(subspace_id, group_id, user)? {
            info!(subspace_id, group_id, user = %user, "Added user to group");
        }
        Ok(())
    }

    fn remove_user_from_group(
        &mut self,
        subspace_id: SubspaceId,
        group_id: GroupId,
        user: &Address,
        signer: &Address,
    ) -> SubspacesResult<()> {
        self.keeper.require_subspace(subspace_id)?;
        Self::reject_default_group(group_id, "left")?;
        let group = self.keeper.require_user_group(subspace_id, group_id)?;
        self.keeper.validate_address(user)?;
        self.authorize(
            "remove_user_from_group",
            subspace_id,
            group.section_id,
            signer,
            Permission::SetPermissions,
        )?;

        if self
            .keeper
            .remove_user_from_group(subspace_id, group_id, user)?
        {
            info!(subspace_id, group_id, user = %user, "Removed user from group");
        }
        Ok(())
    }

    fn list_group_members(
        &self,
        subspace_id: SubspaceId,
        group_id: GroupId,
    ) -> SubspacesResult<Vec<Address>> {
        self.keeper.require_user_group(subspace_id, group_id)?;
        self.keeper.list_group_members(subspace_id, group_id)
    }

    fn is_member_of_group(
        &self,
        subspace_id: SubspaceId,
        group_id: GroupId,
        user: &Address,
    ) -> SubspacesResult<bool> {
        self.keeper.is_member_of_group(subspace_id, group_id, user)
    }
}

impl<S: KvStore> PermissionManager for SubspacesManagerImpl<S> {
    fn set_user_permissions(
        &mut self,
        subspace_id: SubspaceId,
        section_id: SectionId,
        user: &Address,
        permissions: PermissionSet,
        signer: &Address,
    ) -> SubspacesResult<()> {
        self.keeper.require_subspace(subspace_id)?;
        self.keeper.require_section(subspace_id, section_id)?;
        self.keeper.validate_address(user)?;
        self.authorize_grant(
            "set_user_permissions",
            subspace_id,
            section_id,
            signer,
            &permissions,
        )?;

        self.keeper
            .set_user_permissions(subspace_id, section_id, user, &permissions)?;
        info!(
            subspace_id,
            section_id,
            user = %user,
            permissions = %permissions,
            "Set user permissions"
        );
        Ok(())
    }

    fn remove_user_permissions(
        &mut self,
        subspace_id: SubspaceId,
        section_id: SectionId,
        user: &Address,
        signer: &Address,
    ) -> SubspacesResult<()> {
        self.keeper.require_subspace(subspace_id)?;
        self.keeper.require_section(subspace_id, section_id)?;
        self.keeper.validate_address(user)?;
        self.authorize(
            "remove_user_permissions",
            subspace_id,
            section_id,
            signer,
            Permission::SetPermissions,
        )?;

        self.keeper
            .remove_user_permissions(subspace_id, section_id, user)?;
        Ok(())
    }

    fn get_user_permissions(
        &self,
        subspace_id: SubspaceId,
        section_id: SectionId,
        user: &Address,
    ) -> SubspacesResult<PermissionSet> {
        self.keeper.get_user_permissions(subspace_id, section_id, user)
    }

    fn list_user_permissions(&self, subspace_id: SubspaceId) -> SubspacesResult<Vec<UserPermission>> {
        self.keeper.list_user_permissions(subspace_id)
    }

    fn resolve_permissions(
        &self,
        subspace_id: SubspaceId,
        section_id: SectionId,
        user: &Address,
    ) -> SubspacesResult<PermissionSet> {
        self.keeper.resolve_permissions(subspace_id, section_id, user)
    }

    fn has_permission(
        &self,
        subspace_id: SubspaceId,
        section_id: SectionId,
        user: &Address,
        permission: Permission,
    ) -> SubspacesResult<bool> {
        self.keeper
            .has_permission(subspace_id, section_id, user, permission)
    }

    fn has_permissions(
        &self,
        subspace_id: SubspaceId,
        section_id: SectionId,
        user: &Address,
        permissions: &PermissionSet,
    ) -> SubspacesResult<bool> {
        self.keeper
            .has_permissions(subspace_id, section_id, user, permissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::assertions::assert_permission_denied;
    use crate::test_utils::fixtures::{address, manager_with_subspace};

    #[test]
    fn test_create_subspace_provisions_root_and_default_group() {
        let (manager, subspace_id, owner) = manager_with_subspace();

        let subspace = manager.get_subspace(subspace_id).unwrap();
        assert_eq!(subspace.owner, owner);
        assert_eq!(subspace.creator, owner);

        let root = manager.get_section(subspace_id, ROOT_SECTION_ID).unwrap();
        assert!(root.is_root());
        let default_group = manager.get_user_group(subspace_id, 0).unwrap();
        assert!(default_group.is_default());
        assert!(default_group.permissions.is_empty());

        assert_eq!(
            manager.keeper().get_next_section_id(subspace_id).unwrap(),
            FIRST_LOCAL_ID
        );
        assert_eq!(
            manager.keeper().get_next_group_id(subspace_id).unwrap(),
            FIRST_LOCAL_ID
        );
    }

    #[test]
    fn test_create_subspace_validation_writes_nothing() {
        let (mut manager, _, owner) = manager_with_subspace();
        let before = manager.keeper().get_next_subspace_id().unwrap();

        let blank = manager.create_subspace(
            "   ".to_string(),
            String::new(),
            None,
            None,
            owner.clone(),
            Timestamp(5),
        );
        assert!(matches!(blank, Err(SubspacesError::Validation(_))));

        let bad_creator = manager.create_subspace(
            "ok".to_string(),
            String::new(),
            None,
            None,
            Address::new("not-an-address"),
            Timestamp(5),
        );
        assert!(matches!(bad_creator, Err(SubspacesError::Validation(_))));

        assert_eq!(manager.keeper().get_next_subspace_id().unwrap(), before);
        assert_eq!(manager.list_subspaces().unwrap().len(), 1);
    }

    #[test]
    fn test_owner_defaults_to_creator_but_can_differ() {
        let (mut manager, _, creator) = manager_with_subspace();
        let owner = address(42);
        let subspace = manager
            .create_subspace(
                "other".to_string(),
                String::new(),
                Some(address(43)),
                Some(owner.clone()),
                creator.clone(),
                Timestamp(9),
            )
            .unwrap();

        assert_eq!(subspace.id, 2);
        assert_eq!(subspace.owner, owner);
        assert_eq!(subspace.creator, creator);
        assert_eq!(subspace.treasury, Some(address(43)));
    }

    #[test]
    fn test_edit_subspace_needs_permission_and_keeps_creator() {
        let (mut manager, subspace_id, owner) = manager_with_subspace();
        let editor = address(10);

        let denied = manager.edit_subspace(
            subspace_id,
            SubspaceUpdate::from_raw("renamed", "[do-not-modify]", "[do-not-modify]", "[do-not-modify]"),
            &editor,
        );
        assert!(matches!(
            denied,
            Err(SubspacesError::PermissionDenied { .. })
        ));

        manager
            .set_user_permissions(
                subspace_id,
                ROOT_SECTION_ID,
                &editor,
                Permission::EditSubspace.into(),
                &owner,
            )
            .unwrap();
        let new_owner = address(11);
        let updated = manager
            .edit_subspace(
                subspace_id,
                SubspaceUpdate {
                    name: Some("renamed".to_string()),
                    owner: Some(new_owner.clone()),
                    ..Default::default()
                },
                &editor,
            )
            .unwrap();

        assert_eq!(updated.name, "renamed");
        assert_eq!(updated.owner, new_owner);
        assert_eq!(updated.creator, owner);
    }

    #[test]
    fn test_create_section_requires_existing_parent_and_permission() {
        let (mut manager, subspace_id, owner) = manager_with_subspace();

        let missing = manager.create_section(subspace_id, 7, "x".into(), "".into(), &owner);
        assert!(matches!(missing, Err(SubspacesError::NotFound(_))));

        let denied = manager.create_section(subspace_id, 0, "x".into(), "".into(), &address(5));
        assert!(matches!(
            denied,
            Err(SubspacesError::PermissionDenied { .. })
        ));

        let section = manager
            .create_section(subspace_id, 0, "General".into(), "".into(), &owner)
            .unwrap();
        assert_eq!(section.id, 1);
        assert_eq!(section.parent_id, 0);
    }

    #[test]
    fn test_section_ids_are_never_reused() {
        let (mut manager, subspace_id, owner) = manager_with_subspace();
        let first = manager
            .create_section(subspace_id, 0, "a".into(), "".into(), &owner)
            .unwrap();
        manager
            .delete_section(subspace_id, first.id, DeletePolicy::Reject, &owner)
            .unwrap();
        let second = manager
            .create_section(subspace_id, 0, "b".into(), "".into(), &owner)
            .unwrap();
        assert!(second.id > first.id);
    }

    #[test]
    fn test_move_section_rejects_cycles_and_root() {
        let (mut manager, subspace_id, owner) = manager_with_subspace();
        let one = manager
            .create_section(subspace_id, 0, "one".into(), "".into(), &owner)
            .unwrap();
        let two = manager
            .create_section(subspace_id, one.id, "two".into(), "".into(), &owner)
            .unwrap();

        let cycle = manager.move_section(subspace_id, one.id, two.id, &owner);
        assert!(matches!(cycle, Err(SubspacesError::InvalidState(_))));

        let onto_itself = manager.move_section(subspace_id, one.id, one.id, &owner);
        assert!(matches!(onto_itself, Err(SubspacesError::InvalidState(_))));

        let root = manager.move_section(subspace_id, ROOT_SECTION_ID, one.id, &owner);
        assert!(matches!(root, Err(SubspacesError::Validation(_))));

        let moved = manager
            .move_section(subspace_id, two.id, ROOT_SECTION_ID, &owner)
            .unwrap();
        assert_eq!(moved.parent_id, ROOT_SECTION_ID);
    }

    #[test]
    fn test_delete_section_policies() {
        let (mut manager, subspace_id, owner) = manager_with_subspace();
        let parent = manager
            .create_section(subspace_id, 0, "parent".into(), "".into(), &owner)
            .unwrap();
        let child = manager
            .create_section(subspace_id, parent.id, "child".into(), "".into(), &owner)
            .unwrap();
        let group = manager
            .create_user_group(
                subspace_id,
                child.id,
                "g".into(),
                "".into(),
                Permission::Write.into(),
                &owner,
            )
            .unwrap();
        manager
            .add_user_to_group(subspace_id, group.id, &address(20), &owner)
            .unwrap();
        manager
            .set_user_permissions(
                subspace_id,
                child.id,
                &address(21),
                Permission::Write.into(),
                &owner,
            )
            .unwrap();

        let rejected = manager.delete_section(subspace_id, parent.id, DeletePolicy::Reject, &owner);
        assert!(matches!(rejected, Err(SubspacesError::InvalidState(_))));
        assert!(manager.keeper().has_section(subspace_id, child.id).unwrap());

        manager
            .delete_section(subspace_id, parent.id, DeletePolicy::Cascade, &owner)
            .unwrap();
        assert_eq!(manager.list_sections(subspace_id).unwrap().len(), 1);
        assert!(!manager.keeper().has_user_group(subspace_id, group.id).unwrap());
        assert!(manager
            .keeper()
            .list_subspace_group_members(subspace_id)
            .unwrap()
            .is_empty());
        assert!(manager.list_user_permissions(subspace_id).unwrap().is_empty());
    }

    #[test]
    fn test_default_group_rules() {
        let (mut manager, subspace_id, owner) = manager_with_subspace();
        let section = manager
            .create_section(subspace_id, 0, "s".into(), "".into(), &owner)
            .unwrap();

        assert!(matches!(
            manager.add_user_to_group(subspace_id, 0, &address(3), &owner),
            Err(SubspacesError::Validation(_))
        ));
        assert!(matches!(
            manager.move_user_group(subspace_id, 0, section.id, &owner),
            Err(SubspacesError::Validation(_))
        ));
        assert!(matches!(
            manager.delete_user_group(subspace_id, 0, DeletePolicy::Cascade, &owner),
            Err(SubspacesError::Validation(_))
        ));

        // Its permissions can still be changed by the owner
        let updated = manager
            .set_user_group_permissions(subspace_id, 0, Permission::ReportContent.into(), &owner)
            .unwrap();
        assert_eq!(updated.permissions, PermissionSet::new([Permission::ReportContent]));
    }

    #[test]
    fn test_privilege_escalation_is_blocked() {
        let (mut manager, subspace_id, owner) = manager_with_subspace();
        let admin = address(30);
        let target = address(31);

        manager
            .set_user_permissions(
                subspace_id,
                ROOT_SECTION_ID,
                &admin,
                PermissionSet::new([Permission::SetPermissions, Permission::Write]),
                &owner,
            )
            .unwrap();

        // Granting something it holds is fine
        manager
            .set_user_permissions(
                subspace_id,
                ROOT_SECTION_ID,
                &target,
                Permission::Write.into(),
                &admin,
            )
            .unwrap();

        // Granting something it does not hold is not
        let escalation = manager.set_user_permissions(
            subspace_id,
            ROOT_SECTION_ID,
            &target,
            Permission::ManageGroups.into(),
            &admin,
        );
        assert!(matches!(
            escalation,
            Err(SubspacesError::PermissionDenied { .. })
        ));

        let wildcard = manager.set_user_permissions(
            subspace_id,
            ROOT_SECTION_ID,
            &admin,
            PermissionSet::everything(),
            &admin,
        );
        assert!(matches!(
            wildcard,
            Err(SubspacesError::PermissionDenied { .. })
        ));
    }

    #[test]
    fn test_group_member_cannot_change_own_group() {
        let (mut manager, subspace_id, owner) = manager_with_subspace();
        let member = address(40);
        let group = manager
            .create_user_group(
                subspace_id,
                ROOT_SECTION_ID,
                "admins".into(),
                "".into(),
                PermissionSet::new([Permission::SetPermissions, Permission::Write]),
                &owner,
            )
            .unwrap();
        manager
            .add_user_to_group(subspace_id, group.id, &member, &owner)
            .unwrap();

        let result = manager.set_user_group_permissions(
            subspace_id,
            group.id,
            Permission::Write.into(),
            &member,
        );
        assert!(matches!(
            result,
            Err(SubspacesError::PermissionDenied { .. })
        ));
    }

    #[test]
    fn test_membership_operations_are_idempotent() {
        let (mut manager, subspace_id, owner) = manager_with_subspace();
        let group = manager
            .create_user_group(
                subspace_id,
                ROOT_SECTION_ID,
                "g".into(),
                "".into(),
                PermissionSet::nothing(),
                &owner,
            )
            .unwrap();
        let user = address(50);

        manager
            .add_user_to_group(subspace_id, group.id, &user, &owner)
            .unwrap();
        manager
            .add_user_to_group(subspace_id, group.id, &user, &owner)
            .unwrap();
        assert_eq!(
            manager.list_group_members(subspace_id, group.id).unwrap(),
            vec![user.clone()]
        );

        manager
            .remove_user_from_group(subspace_id, group.id, &user, &owner)
            .unwrap();
        manager
            .remove_user_from_group(subspace_id, group.id, &user, &owner)
            .unwrap();
        assert!(!manager
            .is_member_of_group(subspace_id, group.id, &user)
            .unwrap());

        assert!(matches!(
            manager.add_user_to_group(subspace_id, 99, &user, &owner),
            Err(SubspacesError::NotFound(_))
        ));
        assert!(matches!(
            manager.add_user_to_group(subspace_id, group.id, &Address::new("bad"), &owner),
            Err(SubspacesError::Validation(_))
        ));
    }

    #[test]
    fn test_delete_group_with_members_needs_cascade() {
        let (mut manager, subspace_id, owner) = manager_with_subspace();
        let group = manager
            .create_user_group(
                subspace_id,
                ROOT_SECTION_ID,
                "g".into(),
                "".into(),
                PermissionSet::nothing(),
                &owner,
            )
            .unwrap();
        manager
            .add_user_to_group(subspace_id, group.id, &address(60), &owner)
            .unwrap();

        assert!(matches!(
            manager.delete_user_group(subspace_id, group.id, DeletePolicy::Reject, &owner),
            Err(SubspacesError::InvalidState(_))
        ));
        manager
            .delete_user_group(subspace_id, group.id, DeletePolicy::Cascade, &owner)
            .unwrap();
        assert!(matches!(
            manager.get_user_group(subspace_id, group.id),
            Err(SubspacesError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_subspace_removes_everything() {
        let (mut manager, subspace_id, owner) = manager_with_subspace();
        manager
            .create_section(subspace_id, 0, "s".into(), "".into(), &owner)
            .unwrap();

        assert!(matches!(
            manager.delete_subspace(subspace_id, &address(70)),
            Err(SubspacesError::PermissionDenied { .. })
        ));
        manager.delete_subspace(subspace_id, &owner).unwrap();

        assert!(matches!(
            manager.get_subspace(subspace_id),
            Err(SubspacesError::NotFound(_))
        ));
        assert!(manager.list_sections(subspace_id).unwrap().is_empty());
        // The global counter is not rewound
        assert_eq!(manager.keeper().get_next_subspace_id().unwrap(), 2);
    }

    #[test]
    fn test_moving_a_group_cannot_spread_unheld_permissions() {
        let (mut manager, subspace_id, owner) = manager_with_subspace();
        let organizer = address(80);
        let section = manager
            .create_section(subspace_id, ROOT_SECTION_ID, "inner".into(), "".into(), &owner)
            .unwrap();
        let mods = manager
            .create_user_group(
                subspace_id,
                section.id,
                "mods".into(),
                "".into(),
                Permission::ModerateContent.into(),
                &owner,
            )
            .unwrap();
        manager
            .set_user_permissions(
                subspace_id,
                ROOT_SECTION_ID,
                &organizer,
                Permission::ManageGroups.into(),
                &owner,
            )
            .unwrap();

        let result = manager.move_user_group(subspace_id, mods.id, ROOT_SECTION_ID, &organizer);
        assert_permission_denied(result, Permission::ModerateContent);
        assert_eq!(
            manager.get_user_group(subspace_id, mods.id).unwrap().section_id,
            section.id
        );

        let moved = manager
            .move_user_group(subspace_id, mods.id, ROOT_SECTION_ID, &owner)
            .unwrap();
        assert_eq!(moved.section_id, ROOT_SECTION_ID);
    }

    #[test]
    fn test_non_member_cannot_grant_what_it_lacks_to_groups() {
        let (mut manager, subspace_id, owner) = manager_with_subspace();
        let admin = address(81);
        manager
            .set_user_permissions(
                subspace_id,
                ROOT_SECTION_ID,
                &admin,
                PermissionSet::new([Permission::SetPermissions, Permission::ManageGroups]),
                &owner,
            )
            .unwrap();
        let group = manager
            .create_user_group(
                subspace_id,
                ROOT_SECTION_ID,
                "plain".into(),
                "".into(),
                PermissionSet::default(),
                &admin,
            )
            .unwrap();

        let raised = manager.set_user_group_permissions(
            subspace_id,
            group.id,
            Permission::ModerateContent.into(),
            &admin,
        );
        assert_permission_denied(raised, Permission::ModerateContent);

        let created = manager.create_user_group(
            subspace_id,
            ROOT_SECTION_ID,
            "mods".into(),
            "".into(),
            Permission::ModerateContent.into(),
            &admin,
        );
        assert_permission_denied(created, Permission::ModerateContent);
    }

    #[test]
    fn test_owner_matches_in_any_letter_case() {
        let (mut manager, subspace_id, owner) = manager_with_subspace();
        let shouting = Address::new(owner.as_str().to_ascii_uppercase());

        assert_eq!(
            manager
                .resolve_permissions(subspace_id, ROOT_SECTION_ID, &shouting)
                .unwrap(),
            PermissionSet::everything()
        );

        let created = manager
            .create_subspace(
                "loud".into(),
                "".into(),
                None,
                Some(shouting.clone()),
                shouting.clone(),
                Timestamp(5),
            )
            .unwrap();
        assert_eq!(created.owner, owner);
        assert_eq!(created.creator, owner);
    }

    #[test]
    fn test_grants_and_members_ignore_letter_case() {
        let (mut manager, subspace_id, owner) = manager_with_subspace();
        let user = address(82);
        let shouting = Address::new(user.as_str().to_ascii_uppercase());

        manager
            .set_user_permissions(
                subspace_id,
                ROOT_SECTION_ID,
                &shouting,
                Permission::Write.into(),
                &owner,
            )
            .unwrap();
        manager
            .remove_user_permissions(subspace_id, ROOT_SECTION_ID, &user, &owner)
            .unwrap();
        assert!(manager.list_user_permissions(subspace_id).unwrap().is_empty());

        let group = manager
            .create_user_group(
                subspace_id,
                ROOT_SECTION_ID,
                "g".into(),
                "".into(),
                PermissionSet::default(),
                &owner,
            )
            .unwrap();
        manager
            .add_user_to_group(subspace_id, group.id, &shouting, &owner)
            .unwrap();
        manager
            .add_user_to_group(subspace_id, group.id, &user, &owner)
            .unwrap();
        assert_eq!(
            manager.list_group_members(subspace_id, group.id).unwrap(),
            vec![user]
        );
    }
}
