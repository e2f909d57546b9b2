//! Test fixtures for creating common test objects
//!
//! Provides builder patterns and factory functions for creating test data.

use crate::core_subspaces::{
    Address, Bech32Validator, GroupId, HookError, Keeper, MemoryStore, PermissionSet, SectionId,
    Subspace, SubspaceId, SubspaceManager, SubspacesHooks, SubspacesManagerImpl, Timestamp,
};
use std::sync::{Arc, Mutex};

/// Deterministic valid bech32 address derived from `seed`
pub fn address(seed: u8) -> Address {
    Address::new(Bech32Validator::default().encode(&[seed; 20]))
}

/// Manager over an empty in-memory store with every permission registered
pub fn memory_manager() -> SubspacesManagerImpl<MemoryStore> {
    SubspacesManagerImpl::new(Keeper::with_defaults(MemoryStore::new()))
}

/// Manager holding one subspace (ID 1) owned and created by `address(1)`
pub fn manager_with_subspace() -> (SubspacesManagerImpl<MemoryStore>, SubspaceId, Address) {
    let mut manager = memory_manager();
    let owner = address(1);
    let subspace = manager
        .create_subspace(
            "Test subspace".to_string(),
            "Subspace used by tests".to_string(),
            None,
            None,
            owner.clone(),
            Timestamp::from_millis(1_000),
        )
        .expect("fixture subspace");
    (manager, subspace.id, owner)
}

/// Builder for subspace records written straight to a keeper or genesis
pub struct TestSubspaceBuilder {
    id: SubspaceId,
    name: String,
    description: String,
    treasury: Option<Address>,
    owner: Address,
    creator: Address,
    creation_time: Timestamp,
}

impl TestSubspaceBuilder {
    pub fn new(id: SubspaceId) -> Self {
        Self {
            id,
            name: format!("Subspace {}", id),
            description: String::new(),
            treasury: None,
            owner: address(1),
            creator: address(1),
            creation_time: Timestamp::from_millis(1_000),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_owner(mut self, owner: Address) -> Self {
        self.owner = owner;
        self
    }

    pub fn with_creator(mut self, creator: Address) -> Self {
        self.creator = creator;
        self
    }

    pub fn with_treasury(mut self, treasury: Address) -> Self {
        self.treasury = Some(treasury);
        self
    }

    pub fn build(self) -> Subspace {
        Subspace::new(
            self.id,
            self.name,
            self.description,
            self.treasury,
            self.owner,
            self.creator,
            self.creation_time,
        )
    }
}

/// Hook that records every event it sees as `event:args` strings
#[derive(Clone)]
pub struct RecordingHook {
    name: String,
    events: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl RecordingHook {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            events: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    /// Record events and then report a failure for each of them
    pub fn failing(name: &str) -> Self {
        Self {
            fail: true,
            ..Self::new(name)
        }
    }

    /// Share the event log with another hook so ordering can be observed
    pub fn sharing(name: &str, other: &RecordingHook) -> Self {
        Self {
            name: name.to_string(),
            events: Arc::clone(&other.events),
            fail: false,
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }

    fn record(&self, event: String) -> Result<(), HookError> {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
        if self.fail {
            return Err(HookError(format!("{} refused the event", self.name)));
        }
        Ok(())
    }
}

impl SubspacesHooks for RecordingHook {
    fn name(&self) -> &str {
        &self.name
    }

    fn after_subspace_saved(&self, subspace_id: SubspaceId) -> Result<(), HookError> {
        self.record(format!("subspace_saved:{}", subspace_id))
    }

    fn after_subspace_deleted(&self, subspace_id: SubspaceId) -> Result<(), HookError> {
        self.record(format!("subspace_deleted:{}", subspace_id))
    }

    fn after_subspace_section_saved(
        &self,
        subspace_id: SubspaceId,
        section_id: SectionId,
    ) -> Result<(), HookError> {
        self.record(format!("section_saved:{}:{}", subspace_id, section_id))
    }

    fn after_subspace_section_deleted(
        &self,
        subspace_id: SubspaceId,
        section_id: SectionId,
    ) -> Result<(), HookError> {
        self.record(format!("section_deleted:{}:{}", subspace_id, section_id))
    }

    fn after_subspace_group_saved(
        &self,
        subspace_id: SubspaceId,
        group_id: GroupId,
    ) -> Result<(), HookError> {
        self.record(format!("group_saved:{}:{}", subspace_id, group_id))
    }

    fn after_subspace_group_member_added(
        &self,
        subspace_id: SubspaceId,
        group_id: GroupId,
        user: &Address,
    ) -> Result<(), HookError> {
        self.record(format!(
            "group_member_added:{}:{}:{}",
            subspace_id, group_id, user
        ))
    }

    fn after_subspace_group_member_removed(
        &self,
        subspace_id: SubspaceId,
        group_id: GroupId,
        user: &Address,
    ) -> Result<(), HookError> {
        self.record(format!(
            "group_member_removed:{}:{}:{}",
            subspace_id, group_id, user
        ))
    }

    fn after_subspace_group_deleted(
        &self,
        subspace_id: SubspaceId,
        group_id: GroupId,
    ) -> Result<(), HookError> {
        self.record(format!("group_deleted:{}:{}", subspace_id, group_id))
    }

    fn after_user_permission_set(
        &self,
        subspace_id: SubspaceId,
        section_id: SectionId,
        user: &Address,
        permissions: &PermissionSet,
    ) -> Result<(), HookError> {
        self.record(format!(
            "user_permission_set:{}:{}:{}:{}",
            subspace_id, section_id, user, permissions
        ))
    }

    fn after_user_permission_removed(
        &self,
        subspace_id: SubspaceId,
        section_id: SectionId,
        user: &Address,
    ) -> Result<(), HookError> {
        self.record(format!(
            "user_permission_removed:{}:{}:{}",
            subspace_id, section_id, user
        ))
    }
}
