//! Permission resolution
//!
//! A user's effective permissions at a section are the union of what they
//! were granted at that section and at every ancestor up to the root:
//!
//! ```text
//!   root (0)    ACL(user, 0)  + groups at 0 the user belongs to
//!     |
//!   section 1   ACL(user, 1)  + groups at 1 the user belongs to
//!     |
//!   section 2   ACL(user, 2)  + groups at 2 the user belongs to   <- resolve here
//! ```
//!
//! Inheritance only adds. A descendant section can never take away a
//! permission granted higher up. The subspace owner holds `EVERYTHING`.

use super::errors::{SubspacesError, SubspacesResult};
use super::keeper::Keeper;
use super::permission::{Permission, PermissionSet};
use super::storage::KvStore;
use super::types::{Address, SectionId, SubspaceId};
use crate::metrics::{record_denied, record_resolution};
use std::collections::HashSet;
use tracing::{debug, warn};

impl<S: KvStore> Keeper<S> {
    /// Effective permissions of `user` at `section_id`.
    ///
    /// Fails with `NotFound` if the subspace or the section does not exist,
    /// and with `InvalidState` if the section chain is broken.
    pub fn resolve_permissions(
        &self,
        subspace_id: SubspaceId,
        section_id: SectionId,
        user: &Address,
    ) -> SubspacesResult<PermissionSet> {
        let subspace = self.require_subspace(subspace_id)?;
        let mut current = self.require_section(subspace_id, section_id)?;

        if self.same_address(&subspace.owner, user) {
            record_resolution(0);
            return Ok(PermissionSet::everything());
        }

        let groups = self.list_user_groups(subspace_id)?;
        let mut levels = Vec::new();
        let mut visited = HashSet::new();

        loop {
            if !visited.insert(current.id) {
                return Err(SubspacesError::InvalidState(format!(
                    "section {} of subspace {} is part of a cycle",
                    current.id, subspace_id
                )));
            }

            levels.push(self.get_user_permissions(subspace_id, current.id, user)?);
            for group in groups.iter().filter(|g| g.section_id == current.id) {
                if self.is_member_of_group(subspace_id, group.id, user)? {
                    levels.push(group.permissions.clone());
                }
            }

            if current.is_root() {
                break;
            }
            let parent_id = current.parent_id;
            current = self.get_section(subspace_id, parent_id)?.ok_or_else(|| {
                SubspacesError::InvalidState(format!(
                    "section {} of subspace {} has missing parent {}",
                    current.id, subspace_id, parent_id
                ))
            })?;
        }

        let resolved = self.registry().sanitize(&PermissionSet::combine(&levels));
        record_resolution(visited.len());
        debug!(
            subspace_id,
            section_id,
            user = %user,
            depth = visited.len(),
            permissions = %resolved,
            "Resolved permissions"
        );
        Ok(resolved)
    }

    /// Whether `user` holds `permission` at `section_id`
    pub fn has_permission(
        &self,
        subspace_id: SubspaceId,
        section_id: SectionId,
        user: &Address,
        permission: Permission,
    ) -> SubspacesResult<bool> {
        Ok(self
            .resolve_permissions(subspace_id, section_id, user)?
            .check(permission))
    }

    /// Whether `user` holds every permission of `required` at `section_id`
    pub fn has_permissions(
        &self,
        subspace_id: SubspaceId,
        section_id: SectionId,
        user: &Address,
        required: &PermissionSet,
    ) -> SubspacesResult<bool> {
        Ok(self
            .resolve_permissions(subspace_id, section_id, user)?
            .check_all(required))
    }

    /// Fail with `PermissionDenied` unless `user` holds all of `required`
    pub fn require_permissions(
        &self,
        op: &'static str,
        subspace_id: SubspaceId,
        section_id: SectionId,
        user: &Address,
        required: &PermissionSet,
    ) -> SubspacesResult<()> {
        if self.has_permissions(subspace_id, section_id, user, required)? {
            return Ok(());
        }

        record_denied(op);
        warn!(
            op,
            subspace_id,
            section_id,
            user = %user,
            required = %required,
            "Permission denied"
        );
        Err(SubspacesError::PermissionDenied {
            subspace_id,
            section_id,
            user: user.clone(),
            required: required.clone(),
        })
    }
}
