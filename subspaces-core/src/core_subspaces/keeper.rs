//! Typed access to the subspaces state
//!
//! The [`Keeper`] owns the host key-value store and exposes typed reads and
//! writes of every record, the ID counters and the membership and ACL
//! entries. It performs no authorization: callers that act on behalf of a
//! user go through the managers, which resolve permissions first.
//!
//! Every successful write dispatches the matching hook event.

use super::acl::{UserGroupMemberEntry, UserPermission};
use super::address::{AddressValidator, Bech32Validator};
use super::errors::{SubspacesError, SubspacesResult};
use super::group::UserGroup;
use super::hooks::{HookDispatcher, HookEvent, SubspacesHooks};
use super::permission::{PermissionRegistry, PermissionSet};
use super::section::Section;
use super::storage::codec::{decode, decode_u32, decode_u64, encode, encode_u32, encode_u64};
use super::storage::keys;
use super::storage::KvStore;
use super::subspace::Subspace;
use super::types::{
    Address, GroupId, SectionId, SubspaceId, DEFAULT_GROUP_ID, FIRST_LOCAL_ID, FIRST_SUBSPACE_ID,
    ROOT_SECTION_ID,
};
use crate::metrics::record_mutation;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// State access layer over a host key-value store
pub struct Keeper<S: KvStore> {
    store: S,
    registry: PermissionRegistry,
    addresses: Arc<dyn AddressValidator>,
    hooks: HookDispatcher,
}

impl<S: KvStore> Keeper<S> {
    pub fn new(store: S, registry: PermissionRegistry, addresses: Arc<dyn AddressValidator>) -> Self {
        Self {
            store,
            registry,
            addresses,
            hooks: HookDispatcher::new(),
        }
    }

    /// Keeper with every known permission and the default bech32 validator
    pub fn with_defaults(store: S) -> Self {
        Self::new(
            store,
            PermissionRegistry::all(),
            Arc::new(Bech32Validator::default()),
        )
    }

    /// Append a hook to the ordered dispatch list
    pub fn register_hook(&mut self, hook: Box<dyn SubspacesHooks>) {
        self.hooks.register(hook);
    }

    pub fn registry(&self) -> &PermissionRegistry {
        &self.registry
    }

    pub fn address_validator(&self) -> &dyn AddressValidator {
        self.addresses.as_ref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Fail with `Validation` if `address` is malformed
    /// Canonical spelling of `address`, used for every key and comparison
    pub fn canonical_address(&self, address: &Address) -> Address {
        Address::new(self.addresses.canonicalize(address.as_str()))
    }

    /// Whether two addresses name the same account
    pub fn same_address(&self, a: &Address, b: &Address) -> bool {
        self.addresses.canonicalize(a.as_str()) == self.addresses.canonicalize(b.as_str())
    }

    pub fn validate_address(&self, address: &Address) -> SubspacesResult<()> {
        self.addresses.validate(address.as_str()).map_err(|e| {
            SubspacesError::Validation(format!("invalid address {}: {}", address, e))
        })
    }

    fn read<T: serde::de::DeserializeOwned>(&self, key: &[u8]) -> SubspacesResult<Option<T>> {
        match self.store.get(key)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<T: serde::de::DeserializeOwned>(&self, prefix: &[u8]) -> SubspacesResult<Vec<T>> {
        self.store
            .prefix_scan(prefix)?
            .into_iter()
            .map(|(_, value)| decode(&value))
            .collect()
    }

    // =========================================================================
    // ID counters
    // =========================================================================

    /// Next subspace ID to be handed out
    pub fn get_next_subspace_id(&self) -> SubspacesResult<SubspaceId> {
        match self.store.get(keys::NEXT_SUBSPACE_ID_KEY)? {
            Some(bytes) => decode_u64(&bytes),
            None => Ok(FIRST_SUBSPACE_ID),
        }
    }

    pub fn set_next_subspace_id(&mut self, id: SubspaceId) -> SubspacesResult<()> {
        self.store.set(keys::NEXT_SUBSPACE_ID_KEY, &encode_u64(id))
    }

    /// Hand out the next subspace ID and advance the counter in one step
    pub fn allocate_subspace_id(&mut self) -> SubspacesResult<SubspaceId> {
        let id = self.get_next_subspace_id()?;
        let next = id.checked_add(1).ok_or_else(|| {
            SubspacesError::InvalidState("subspace id counter overflow".to_string())
        })?;
        self.set_next_subspace_id(next)?;
        Ok(id)
    }

    /// Next section ID to be handed out in `subspace_id`
    pub fn get_next_section_id(&self, subspace_id: SubspaceId) -> SubspacesResult<SectionId> {
        match self.store.get(&keys::next_section_id_key(subspace_id))? {
            Some(bytes) => decode_u32(&bytes),
            None => Ok(FIRST_LOCAL_ID),
        }
    }

    pub fn has_next_section_id(&self, subspace_id: SubspaceId) -> SubspacesResult<bool> {
        self.store.has(&keys::next_section_id_key(subspace_id))
    }

    pub fn set_next_section_id(
        &mut self,
        subspace_id: SubspaceId,
        id: SectionId,
    ) -> SubspacesResult<()> {
        self.store
            .set(&keys::next_section_id_key(subspace_id), &encode_u32(id))
    }

    /// Hand out the next section ID of `subspace_id` and advance the counter
    pub fn allocate_section_id(&mut self, subspace_id: SubspaceId) -> SubspacesResult<SectionId> {
        let id = self.get_next_section_id(subspace_id)?;
        if id == ROOT_SECTION_ID {
            return Err(SubspacesError::InvalidState(format!(
                "section id counter of subspace {} points at the root section",
                subspace_id
            )));
        }
        let next = id.checked_add(1).ok_or_else(|| {
            SubspacesError::InvalidState(format!(
                "section id counter overflow in subspace {}",
                subspace_id
            ))
        })?;
        self.set_next_section_id(subspace_id, next)?;
        Ok(id)
    }

    /// Next group ID to be handed out in `subspace_id`
    pub fn get_next_group_id(&self, subspace_id: SubspaceId) -> SubspacesResult<GroupId> {
        match self.store.get(&keys::next_group_id_key(subspace_id))? {
            Some(bytes) => decode_u32(&bytes),
            None => Ok(FIRST_LOCAL_ID),
        }
    }

    pub fn has_next_group_id(&self, subspace_id: SubspaceId) -> SubspacesResult<bool> {
        self.store.has(&keys::next_group_id_key(subspace_id))
    }

    pub fn set_next_group_id(&mut self, subspace_id: SubspaceId, id: GroupId) -> SubspacesResult<()> {
        self.store
            .set(&keys::next_group_id_key(subspace_id), &encode_u32(id))
    }

    /// Hand out the next group ID of `subspace_id` and advance the counter
    pub fn allocate_group_id(&mut self, subspace_id: SubspaceId) -> SubspacesResult<GroupId> {
        let id = self.get_next_group_id(subspace_id)?;
        if id == DEFAULT_GROUP_ID {
            return Err(SubspacesError::InvalidState(format!(
                "group id counter of subspace {} points at the default group",
                subspace_id
            )));
        }
        let next = id.checked_add(1).ok_or_else(|| {
            SubspacesError::InvalidState(format!(
                "group id counter overflow in subspace {}",
                subspace_id
            ))
        })?;
        self.set_next_group_id(subspace_id, next)?;
        Ok(id)
    }

    // =========================================================================
    // Subspaces
    // =========================================================================

    pub fn has_subspace(&self, subspace_id: SubspaceId) -> SubspacesResult<bool> {
        self.store.has(&keys::subspace_key(subspace_id))
    }

    pub fn get_subspace(&self, subspace_id: SubspaceId) -> SubspacesResult<Option<Subspace>> {
        self.read(&keys::subspace_key(subspace_id))
    }

    /// Like [`Keeper::get_subspace`] but fails with `NotFound`
    pub fn require_subspace(&self, subspace_id: SubspaceId) -> SubspacesResult<Subspace> {
        self.get_subspace(subspace_id)?
            .ok_or_else(|| SubspacesError::NotFound(format!("subspace {}", subspace_id)))
    }

    pub fn save_subspace(&mut self, subspace: &Subspace) -> SubspacesResult<()> {
        self.store
            .set(&keys::subspace_key(subspace.id), &encode(subspace)?)?;
        record_mutation("save_subspace");
        debug!(subspace_id = subspace.id, "Saved subspace");
        self.hooks.dispatch(HookEvent::SubspaceSaved(subspace.id));
        Ok(())
    }

    /// Remove a subspace together with every record and counter under it
    pub fn delete_subspace(&mut self, subspace_id: SubspaceId) -> SubspacesResult<()> {
        for prefix in keys::subspace_record_prefixes(subspace_id) {
            for (key, _) in self.store.prefix_scan(&prefix)? {
                self.store.delete(&key)?;
            }
        }
        self.store.delete(&keys::next_section_id_key(subspace_id))?;
        self.store.delete(&keys::next_group_id_key(subspace_id))?;
        self.store.delete(&keys::subspace_key(subspace_id))?;

        record_mutation("delete_subspace");
        info!(subspace_id, "Deleted subspace");
        self.hooks.dispatch(HookEvent::SubspaceDeleted(subspace_id));
        Ok(())
    }

    /// All subspaces in ID order
    pub fn list_subspaces(&self) -> SubspacesResult<Vec<Subspace>> {
        self.scan(&[keys::SUBSPACE_PREFIX])
    }

    // =========================================================================
    // Sections
    // =========================================================================

    pub fn has_section(&self, subspace_id: SubspaceId, section_id: SectionId) -> SubspacesResult<bool> {
        self.store.has(&keys::section_key(subspace_id, section_id))
    }

    pub fn get_section(
        &self,
        subspace_id: SubspaceId,
        section_id: SectionId,
    ) -> SubspacesResult<Option<Section>> {
        self.read(&keys::section_key(subspace_id, section_id))
    }

    pub fn require_section(
        &self,
        subspace_id: SubspaceId,
        section_id: SectionId,
    ) -> SubspacesResult<Section> {
        self.get_section(subspace_id, section_id)?.ok_or_else(|| {
            SubspacesError::NotFound(format!(
                "section {} in subspace {}",
                section_id, subspace_id
            ))
        })
    }

    pub fn save_section(&mut self, section: &Section) -> SubspacesResult<()> {
        self.store.set(
            &keys::section_key(section.subspace_id, section.id),
            &encode(section)?,
        )?;
        record_mutation("save_section");
        debug!(
            subspace_id = section.subspace_id,
            section_id = section.id,
            "Saved section"
        );
        self.hooks
            .dispatch(HookEvent::SectionSaved(section.subspace_id, section.id));
        Ok(())
    }

    /// Remove one section and the ACL entries granted at it.
    ///
    /// Child sections and groups are left alone; the caller decides what
    /// happens to them.
    pub fn delete_section(
        &mut self,
        subspace_id: SubspaceId,
        section_id: SectionId,
    ) -> SubspacesResult<()> {
        for entry in self.list_section_user_permissions(subspace_id, section_id)? {
            self.remove_user_permissions(subspace_id, section_id, &entry.user)?;
        }
        self.store
            .delete(&keys::section_key(subspace_id, section_id))?;

        record_mutation("delete_section");
        info!(subspace_id, section_id, "Deleted section");
        self.hooks
            .dispatch(HookEvent::SectionDeleted(subspace_id, section_id));
        Ok(())
    }

    /// All sections of a subspace in ID order
    pub fn list_sections(&self, subspace_id: SubspaceId) -> SubspacesResult<Vec<Section>> {
        self.scan(&keys::subspace_sections_prefix(subspace_id))
    }

    /// Direct children of `parent_id`, never including the root itself
    pub fn list_child_sections(
        &self,
        subspace_id: SubspaceId,
        parent_id: SectionId,
    ) -> SubspacesResult<Vec<Section>> {
        Ok(self
            .list_sections(subspace_id)?
            .into_iter()
            .filter(|s| !s.is_root() && s.parent_id == parent_id)
            .collect())
    }

    /// Ancestor chain from `section_id` up to and including the root.
    ///
    /// Fails with `InvalidState` if the chain loops or ends at a missing
    /// section.
    pub fn section_path(
        &self,
        subspace_id: SubspaceId,
        section_id: SectionId,
    ) -> SubspacesResult<Vec<SectionId>> {
        let mut path = Vec::new();
        let mut visited = HashSet::new();
        let mut current = self.require_section(subspace_id, section_id)?;

        loop {
            if !visited.insert(current.id) {
                return Err(SubspacesError::InvalidState(format!(
                    "section {} of subspace {} is part of a cycle",
                    current.id, subspace_id
                )));
            }
            path.push(current.id);
            if current.is_root() {
                return Ok(path);
            }
            current = self
                .get_section(subspace_id, current.parent_id)?
                .ok_or_else(|| {
                    SubspacesError::InvalidState(format!(
                        "section {} of subspace {} has missing parent {}",
                        current.id, subspace_id, current.parent_id
                    ))
                })?;
        }
    }

    // =========================================================================
    // User groups
    // =========================================================================

    pub fn has_user_group(&self, subspace_id: SubspaceId, group_id: GroupId) -> SubspacesResult<bool> {
        self.store.has(&keys::group_key(subspace_id, group_id))
    }

    pub fn get_user_group(
        &self,
        subspace_id: SubspaceId,
        group_id: GroupId,
    ) -> SubspacesResult<Option<UserGroup>> {
        self.read(&keys::group_key(subspace_id, group_id))
    }

    pub fn require_user_group(
        &self,
        subspace_id: SubspaceId,
        group_id: GroupId,
    ) -> SubspacesResult<UserGroup> {
        self.get_user_group(subspace_id, group_id)?.ok_or_else(|| {
            SubspacesError::NotFound(format!("group {} in subspace {}", group_id, subspace_id))
        })
    }

    pub fn save_user_group(&mut self, group: &UserGroup) -> SubspacesResult<()> {
        self.store
            .set(&keys::group_key(group.subspace_id, group.id), &encode(group)?)?;
        record_mutation("save_user_group");
        debug!(
            subspace_id = group.subspace_id,
            group_id = group.id,
            "Saved user group"
        );
        self.hooks
            .dispatch(HookEvent::GroupSaved(group.subspace_id, group.id));
        Ok(())
    }

    /// Remove a group and all its members
    pub fn delete_user_group(
        &mut self,
        subspace_id: SubspaceId,
        group_id: GroupId,
    ) -> SubspacesResult<()> {
        for member in self.list_group_members(subspace_id, group_id)? {
            self.remove_user_from_group(subspace_id, group_id, &member)?;
        }
        self.store.delete(&keys::group_key(subspace_id, group_id))?;

        record_mutation("delete_user_group");
        info!(subspace_id, group_id, "Deleted user group");
        self.hooks
            .dispatch(HookEvent::GroupDeleted(subspace_id, group_id));
        Ok(())
    }

    /// All groups of a subspace in ID order
    pub fn list_user_groups(&self, subspace_id: SubspaceId) -> SubspacesResult<Vec<UserGroup>> {
        self.scan(&keys::subspace_groups_prefix(subspace_id))
    }

    /// Groups scoped to one section, in ID order
    pub fn list_section_user_groups(
        &self,
        subspace_id: SubspaceId,
        section_id: SectionId,
    ) -> SubspacesResult<Vec<UserGroup>> {
        Ok(self
            .list_user_groups(subspace_id)?
            .into_iter()
            .filter(|g| g.section_id == section_id)
            .collect())
    }

    // =========================================================================
    // Membership
    // =========================================================================

    /// Every user is implicitly a member of the default group
    pub fn is_member_of_group(
        &self,
        subspace_id: SubspaceId,
        group_id: GroupId,
        user: &Address,
    ) -> SubspacesResult<bool> {
        if group_id == DEFAULT_GROUP_ID {
            return Ok(true);
        }
        let user = self.canonical_address(user);
        self.store
            .has(&keys::group_member_key(subspace_id, group_id, &user)?)
    }

    /// Add `user` to a group. Returns `false` if it was already a member.
    pub fn add_user_to_group(
        &mut self,
        subspace_id: SubspaceId,
        group_id: GroupId,
        user: &Address,
    ) -> SubspacesResult<bool> {
        let user = &self.canonical_address(user);
        let key = keys::group_member_key(subspace_id, group_id, user)?;
        if self.store.has(&key)? {
            return Ok(false);
        }
        self.store.set(&key, &[0x01])?;

        record_mutation("add_user_to_group");
        debug!(subspace_id, group_id, user = %user, "Added group member");
        self.hooks
            .dispatch(HookEvent::GroupMemberAdded(subspace_id, group_id, user));
        Ok(true)
    }

    /// Remove `user` from a group. Returns `false` if it was not a member.
    pub fn remove_user_from_group(
        &mut self,
        subspace_id: SubspaceId,
        group_id: GroupId,
        user: &Address,
    ) -> SubspacesResult<bool> {
        let user = &self.canonical_address(user);
        let key = keys::group_member_key(subspace_id, group_id, user)?;
        if !self.store.has(&key)? {
            return Ok(false);
        }
        self.store.delete(&key)?;

        record_mutation("remove_user_from_group");
        debug!(subspace_id, group_id, user = %user, "Removed group member");
        self.hooks
            .dispatch(HookEvent::GroupMemberRemoved(subspace_id, group_id, user));
        Ok(true)
    }

    /// Explicit members of a group, in key order
    pub fn list_group_members(
        &self,
        subspace_id: SubspaceId,
        group_id: GroupId,
    ) -> SubspacesResult<Vec<Address>> {
        self.store
            .prefix_scan(&keys::group_members_prefix(subspace_id, group_id))?
            .into_iter()
            .map(|(key, _)| {
                keys::parse_group_member_key(&key)
                    .map(|(_, _, user)| user)
                    .ok_or_else(|| corrupted_key("group member", &key))
            })
            .collect()
    }

    /// Every membership entry of a subspace
    pub fn list_subspace_group_members(
        &self,
        subspace_id: SubspaceId,
    ) -> SubspacesResult<Vec<UserGroupMemberEntry>> {
        self.store
            .prefix_scan(&keys::subspace_group_members_prefix(subspace_id))?
            .into_iter()
            .map(|(key, _)| {
                keys::parse_group_member_key(&key)
                    .map(|(sub, group, user)| UserGroupMemberEntry::new(sub, group, user))
                    .ok_or_else(|| corrupted_key("group member", &key))
            })
            .collect()
    }

    // =========================================================================
    // Direct permissions
    // =========================================================================

    /// Permissions granted directly to `user` at a section; empty if none
    pub fn get_user_permissions(
        &self,
        subspace_id: SubspaceId,
        section_id: SectionId,
        user: &Address,
    ) -> SubspacesResult<PermissionSet> {
        let user = self.canonical_address(user);
        Ok(self
            .read(&keys::user_permission_key(subspace_id, section_id, &user)?)?
            .unwrap_or_default())
    }

    pub fn has_user_permissions_entry(
        &self,
        subspace_id: SubspaceId,
        section_id: SectionId,
        user: &Address,
    ) -> SubspacesResult<bool> {
        let user = self.canonical_address(user);
        self.store
            .has(&keys::user_permission_key(subspace_id, section_id, &user)?)
    }

    /// Overwrite the grant of `user` at a section. An empty set removes it.
    pub fn set_user_permissions(
        &mut self,
        subspace_id: SubspaceId,
        section_id: SectionId,
        user: &Address,
        permissions: &PermissionSet,
    ) -> SubspacesResult<()> {
        if permissions.is_empty() {
            self.remove_user_permissions(subspace_id, section_id, user)?;
            return Ok(());
        }

        let user = &self.canonical_address(user);
        self.store.set(
            &keys::user_permission_key(subspace_id, section_id, user)?,
            &encode(permissions)?,
        )?;
        record_mutation("set_user_permissions");
        debug!(
            subspace_id,
            section_id,
            user = %user,
            permissions = %permissions,
            "Set user permissions"
        );
        self.hooks.dispatch(HookEvent::UserPermissionSet(
            subspace_id,
            section_id,
            user,
            permissions,
        ));
        Ok(())
    }

    /// Remove the grant of `user` at a section. Returns `false` if there was none.
    pub fn remove_user_permissions(
        &mut self,
        subspace_id: SubspaceId,
        section_id: SectionId,
        user: &Address,
    ) -> SubspacesResult<bool> {
        let user = &self.canonical_address(user);
        let key = keys::user_permission_key(subspace_id, section_id, user)?;
        if !self.store.has(&key)? {
            return Ok(false);
        }
        self.store.delete(&key)?;

        record_mutation("remove_user_permissions");
        debug!(subspace_id, section_id, user = %user, "Removed user permissions");
        self.hooks.dispatch(HookEvent::UserPermissionRemoved(
            subspace_id,
            section_id,
            user,
        ));
        Ok(true)
    }

    /// Every ACL entry of a subspace, ordered by section then user
    pub fn list_user_permissions(
        &self,
        subspace_id: SubspaceId,
    ) -> SubspacesResult<Vec<UserPermission>> {
        self.scan_user_permissions(&keys::subspace_user_permissions_prefix(subspace_id))
    }

    /// ACL entries granted at one section
    pub fn list_section_user_permissions(
        &self,
        subspace_id: SubspaceId,
        section_id: SectionId,
    ) -> SubspacesResult<Vec<UserPermission>> {
        self.scan_user_permissions(&keys::section_user_permissions_prefix(
            subspace_id,
            section_id,
        ))
    }

    fn scan_user_permissions(&self, prefix: &[u8]) -> SubspacesResult<Vec<UserPermission>> {
        self.store
            .prefix_scan(prefix)?
            .into_iter()
            .map(|(key, value)| -> SubspacesResult<UserPermission> {
                let (subspace_id, section_id, user) = keys::parse_user_permission_key(&key)
                    .ok_or_else(|| corrupted_key("user permission", &key))?;
                Ok(UserPermission::new(
                    subspace_id,
                    section_id,
                    user,
                    decode(&value)?,
                ))
            })
            .collect()
    }
}

impl<S: KvStore> std::fmt::Debug for Keeper<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keeper")
            .field("registry", &self.registry)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

fn corrupted_key(kind: &str, key: &[u8]) -> SubspacesError {
    SubspacesError::Serialization(format!("malformed {} key {}", kind, hex::encode(key)))
}
