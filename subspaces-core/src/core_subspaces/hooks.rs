//! Post-mutation hooks
//!
//! Other modules observe subspace changes by registering a [`SubspacesHooks`]
//! implementation with the keeper's [`HookDispatcher`]. Hooks run
//! synchronously, in registration order, after the mutation has been written.
//!
//! Hooks are fire-and-forget. A hook returning an error does not undo the
//! mutation and does not stop the remaining hooks: the failure is logged and
//! counted, then dispatch continues.

use super::permission::PermissionSet;
use super::types::{Address, GroupId, SectionId, SubspaceId};
use crate::metrics::HOOKS_FAILED;
use metrics::counter;
use thiserror::Error;
use tracing::warn;

/// Failure reported by a hook
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct HookError(pub String);

/// Observer of subspace mutations. Every method defaults to a no-op.
pub trait SubspacesHooks: Send + Sync {
    /// Name used when logging hook failures
    fn name(&self) -> &str {
        "unnamed"
    }

    fn after_subspace_saved(&self, _subspace_id: SubspaceId) -> Result<(), HookError> {
        Ok(())
    }

    fn after_subspace_deleted(&self, _subspace_id: SubspaceId) -> Result<(), HookError> {
        Ok(())
    }

    fn after_subspace_section_saved(
        &self,
        _subspace_id: SubspaceId,
        _section_id: SectionId,
    ) -> Result<(), HookError> {
        Ok(())
    }

    fn after_subspace_section_deleted(
        &self,
        _subspace_id: SubspaceId,
        _section_id: SectionId,
    ) -> Result<(), HookError> {
        Ok(())
    }

    fn after_subspace_group_saved(
        &self,
        _subspace_id: SubspaceId,
        _group_id: GroupId,
    ) -> Result<(), HookError> {
        Ok(())
    }

    fn after_subspace_group_member_added(
        &self,
        _subspace_id: SubspaceId,
        _group_id: GroupId,
        _user: &Address,
    ) -> Result<(), HookError> {
        Ok(())
    }

    fn after_subspace_group_member_removed(
        &self,
        _subspace_id: SubspaceId,
        _group_id: GroupId,
        _user: &Address,
    ) -> Result<(), HookError> {
        Ok(())
    }

    fn after_subspace_group_deleted(
        &self,
        _subspace_id: SubspaceId,
        _group_id: GroupId,
    ) -> Result<(), HookError> {
        Ok(())
    }

    fn after_user_permission_set(
        &self,
        _subspace_id: SubspaceId,
        _section_id: SectionId,
        _user: &Address,
        _permissions: &PermissionSet,
    ) -> Result<(), HookError> {
        Ok(())
    }

    fn after_user_permission_removed(
        &self,
        _subspace_id: SubspaceId,
        _section_id: SectionId,
        _user: &Address,
    ) -> Result<(), HookError> {
        Ok(())
    }
}

/// A mutation that hooks are notified about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookEvent<'a> {
    SubspaceSaved(SubspaceId),
    SubspaceDeleted(SubspaceId),
    SectionSaved(SubspaceId, SectionId),
    SectionDeleted(SubspaceId, SectionId),
    GroupSaved(SubspaceId, GroupId),
    GroupMemberAdded(SubspaceId, GroupId, &'a Address),
    GroupMemberRemoved(SubspaceId, GroupId, &'a Address),
    GroupDeleted(SubspaceId, GroupId),
    UserPermissionSet(SubspaceId, SectionId, &'a Address, &'a PermissionSet),
    UserPermissionRemoved(SubspaceId, SectionId, &'a Address),
}

impl HookEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            HookEvent::SubspaceSaved(..) => "subspace_saved",
            HookEvent::SubspaceDeleted(..) => "subspace_deleted",
            HookEvent::SectionSaved(..) => "section_saved",
            HookEvent::SectionDeleted(..) => "section_deleted",
            HookEvent::GroupSaved(..) => "group_saved",
            HookEvent::GroupMemberAdded(..) => "group_member_added",
            HookEvent::GroupMemberRemoved(..) => "group_member_removed",
            HookEvent::GroupDeleted(..) => "group_deleted",
            HookEvent::UserPermissionSet(..) => "user_permission_set",
            HookEvent::UserPermissionRemoved(..) => "user_permission_removed",
        }
    }

    fn deliver(&self, hook: &dyn SubspacesHooks) -> Result<(), HookError> {
        match *self {
            HookEvent::SubspaceSaved(subspace) => hook.after_subspace_saved(subspace),
            HookEvent::SubspaceDeleted(subspace) => hook.after_subspace_deleted(subspace),
            HookEvent::SectionSaved(subspace, section) => {
                hook.after_subspace_section_saved(subspace, section)
            }
            HookEvent::SectionDeleted(subspace, section) => {
                hook.after_subspace_section_deleted(subspace, section)
            }
            HookEvent::GroupSaved(subspace, group) => hook.after_subspace_group_saved(subspace, group),
            HookEvent::GroupMemberAdded(subspace, group, user) => {
                hook.after_subspace_group_member_added(subspace, group, user)
            }
            HookEvent::GroupMemberRemoved(subspace, group, user) => {
                hook.after_subspace_group_member_removed(subspace, group, user)
            }
            HookEvent::GroupDeleted(subspace, group) => {
                hook.after_subspace_group_deleted(subspace, group)
            }
            HookEvent::UserPermissionSet(subspace, section, user, permissions) => {
                hook.after_user_permission_set(subspace, section, user, permissions)
            }
            HookEvent::UserPermissionRemoved(subspace, section, user) => {
                hook.after_user_permission_removed(subspace, section, user)
            }
        }
    }
}

/// Ordered list of hooks invoked after every successful mutation
#[derive(Default)]
pub struct HookDispatcher {
    hooks: Vec<Box<dyn SubspacesHooks>>,
}

impl HookDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook; hooks fire in registration order
    pub fn register(&mut self, hook: Box<dyn SubspacesHooks>) {
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Deliver `event` to every hook, swallowing failures
    pub fn dispatch(&self, event: HookEvent<'_>) {
        for hook in &self.hooks {
            if let Err(err) = event.deliver(hook.as_ref()) {
                counter!(HOOKS_FAILED, "event" => event.name()).increment(1);
                warn!(
                    hook = hook.name(),
                    event = event.name(),
                    error = %err,
                    "Subspaces hook failed; mutation is kept"
                );
            }
        }
    }
}

impl std::fmt::Debug for HookDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.hooks.iter().map(|h| h.name()).collect();
        f.debug_struct("HookDispatcher").field("hooks", &names).finish()
    }
}
