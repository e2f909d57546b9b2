//! Genesis state: validation, import and export
//!
//! A genesis state is a full snapshot of the subspaces state. Validation is
//! all-or-nothing: the first inconsistency fails the whole state and nothing
//! is written.
//!
//! Error classes:
//! - repeated keys give `Duplicate`
//! - malformed entities and unregistered permissions give `Validation`
//! - references to missing subspaces, sections or groups give `NotFound`
//! - counters that do not exceed the used IDs, section cycles and missing
//!   root sections, default groups or counters give `InvalidState`

use super::acl::{UserGroupMemberEntry, UserPermission};
use super::address::AddressValidator;
use super::errors::{SubspacesError, SubspacesResult};
use super::group::UserGroup;
use super::keeper::Keeper;
use super::permission::PermissionRegistry;
use super::section::Section;
use super::storage::KvStore;
use super::subspace::Subspace;
use super::types::{
    Address, GroupId, SectionId, SubspaceId, DEFAULT_GROUP_ID, FIRST_SUBSPACE_ID,
    ROOT_SECTION_ID,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use tracing::info;

/// Per-subspace ID counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubspaceData {
    pub subspace_id: SubspaceId,
    pub next_group_id: GroupId,
    pub next_section_id: SectionId,
}

impl SubspaceData {
    pub fn new(subspace_id: SubspaceId, next_group_id: GroupId, next_section_id: SectionId) -> Self {
        SubspaceData {
            subspace_id,
            next_group_id,
            next_section_id,
        }
    }
}

/// Full snapshot of the subspaces state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    pub initial_subspace_id: SubspaceId,
    #[serde(default)]
    pub subspaces_data: Vec<SubspaceData>,
    #[serde(default)]
    pub subspaces: Vec<Subspace>,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub user_permissions: Vec<UserPermission>,
    #[serde(default)]
    pub user_groups: Vec<UserGroup>,
    #[serde(default)]
    pub user_group_members: Vec<UserGroupMemberEntry>,
}

impl Default for GenesisState {
    fn default() -> Self {
        GenesisState {
            initial_subspace_id: FIRST_SUBSPACE_ID,
            subspaces_data: Vec::new(),
            subspaces: Vec::new(),
            sections: Vec::new(),
            user_permissions: Vec::new(),
            user_groups: Vec::new(),
            user_group_members: Vec::new(),
        }
    }
}

impl GenesisState {
    /// Load a genesis state from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> SubspacesResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Write the genesis state as pretty-printed JSON
    pub fn to_json_file(&self, path: impl AsRef<Path>) -> SubspacesResult<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), contents)?;
        Ok(())
    }
}

fn duplicate<T: std::fmt::Debug>(what: &str, key: T) -> SubspacesError {
    SubspacesError::Duplicate(format!("duplicated {} {:?}", what, key))
}

/// Check the global consistency of a genesis state
pub fn validate_genesis(
    state: &GenesisState,
    registry: &PermissionRegistry,
    addresses: &dyn AddressValidator,
) -> SubspacesResult<()> {
    // Subspaces
    let mut subspace_ids = BTreeSet::new();
    for subspace in &state.subspaces {
        if !subspace_ids.insert(subspace.id) {
            return Err(duplicate("subspace", subspace.id));
        }
        subspace.validate(addresses)?;
    }

    if state.initial_subspace_id == 0 {
        return Err(SubspacesError::InvalidState(
            "initial subspace id must be greater than zero".to_string(),
        ));
    }
    if let Some(max) = subspace_ids.last() {
        if state.initial_subspace_id <= *max {
            return Err(SubspacesError::InvalidState(format!(
                "initial subspace id {} must be greater than the highest subspace id {}",
                state.initial_subspace_id, max
            )));
        }
    }

    // Sections
    let mut sections: HashMap<(SubspaceId, SectionId), &Section> = HashMap::new();
    for section in &state.sections {
        if sections
            .insert((section.subspace_id, section.id), section)
            .is_some()
        {
            return Err(duplicate("section", (section.subspace_id, section.id)));
        }
        section.validate()?;
        if !subspace_ids.contains(&section.subspace_id) {
            return Err(SubspacesError::NotFound(format!(
                "subspace {} of section {}",
                section.subspace_id, section.id
            )));
        }
    }
    for section in &state.sections {
        if !sections.contains_key(&(section.subspace_id, section.parent_id)) {
            return Err(SubspacesError::NotFound(format!(
                "parent section {} of section {} in subspace {}",
                section.parent_id, section.id, section.subspace_id
            )));
        }
        check_acyclic(section, &sections)?;
    }

    // Groups
    let mut groups = HashSet::new();
    for group in &state.user_groups {
        if !groups.insert((group.subspace_id, group.id)) {
            return Err(duplicate("user group", (group.subspace_id, group.id)));
        }
        group.validate()?;
        registry.validate_set(&group.permissions)?;
        if !sections.contains_key(&(group.subspace_id, group.section_id)) {
            return Err(SubspacesError::NotFound(format!(
                "section {} of group {} in subspace {}",
                group.section_id, group.id, group.subspace_id
            )));
        }
    }

    // Every subspace has its reserved entities and counters
    let mut data_ids = HashSet::new();
    for data in &state.subspaces_data {
        if !data_ids.insert(data.subspace_id) {
            return Err(duplicate("subspace data", data.subspace_id));
        }
        if !subspace_ids.contains(&data.subspace_id) {
            return Err(SubspacesError::NotFound(format!(
                "subspace {} of subspace data",
                data.subspace_id
            )));
        }
        check_counters(state, data)?;
    }
    for subspace_id in &subspace_ids {
        if !data_ids.contains(subspace_id) {
            return Err(SubspacesError::InvalidState(format!(
                "subspace {} has no subspace data",
                subspace_id
            )));
        }
        if !sections.contains_key(&(*subspace_id, ROOT_SECTION_ID)) {
            return Err(SubspacesError::InvalidState(format!(
                "subspace {} has no root section",
                subspace_id
            )));
        }
        if !groups.contains(&(*subspace_id, DEFAULT_GROUP_ID)) {
            return Err(SubspacesError::InvalidState(format!(
                "subspace {} has no default group",
                subspace_id
            )));
        }
    }

    // Direct permissions
    let mut grants = HashSet::new();
    for entry in &state.user_permissions {
        if !grants.insert((entry.subspace_id, entry.section_id, &entry.user)) {
            return Err(duplicate(
                "user permission",
                (entry.subspace_id, entry.section_id, entry.user.as_str()),
            ));
        }
        entry.validate(registry, addresses)?;
        require_canonical(addresses, &entry.user)?;
        if !subspace_ids.contains(&entry.subspace_id) {
            return Err(SubspacesError::NotFound(format!(
                "subspace {} of permissions for {}",
                entry.subspace_id, entry.user
            )));
        }
        if !sections.contains_key(&(entry.subspace_id, entry.section_id)) {
            return Err(SubspacesError::NotFound(format!(
                "section {} of permissions for {} in subspace {}",
                entry.section_id, entry.user, entry.subspace_id
            )));
        }
    }

    // Memberships
    let mut members = HashSet::new();
    for entry in &state.user_group_members {
        if !members.insert((entry.subspace_id, entry.group_id, &entry.user)) {
            return Err(duplicate(
                "group member",
                (entry.subspace_id, entry.group_id, entry.user.as_str()),
            ));
        }
        entry.validate(addresses)?;
        require_canonical(addresses, &entry.user)?;
        if !groups.contains(&(entry.subspace_id, entry.group_id)) {
            return Err(SubspacesError::NotFound(format!(
                "group {} of member {} in subspace {}",
                entry.group_id, entry.user, entry.subspace_id
            )));
        }
    }

    Ok(())
}

/// Keyed entries must already be in canonical form so exports match imports
fn require_canonical(addresses: &dyn AddressValidator, user: &Address) -> SubspacesResult<()> {
    if addresses.canonicalize(user.as_str()) != user.as_str() {
        return Err(SubspacesError::Validation(format!(
            "address {} is not in canonical form",
            user
        )));
    }
    Ok(())
}

fn check_acyclic(
    start: &Section,
    sections: &HashMap<(SubspaceId, SectionId), &Section>,
) -> SubspacesResult<()> {
    let mut visited = HashSet::new();
    let mut current = start;
    while !current.is_root() {
        if !visited.insert(current.id) {
            return Err(SubspacesError::InvalidState(format!(
                "section {} of subspace {} is part of a cycle",
                start.id, start.subspace_id
            )));
        }
        current = match sections.get(&(current.subspace_id, current.parent_id)) {
            Some(parent) => *parent,
            None => {
                return Err(SubspacesError::NotFound(format!(
                    "parent section {} of section {} in subspace {}",
                    current.parent_id, current.id, current.subspace_id
                )))
            }
        };
    }
    Ok(())
}

fn check_counters(state: &GenesisState, data: &SubspaceData) -> SubspacesResult<()> {
    let max_section = state
        .sections
        .iter()
        .filter(|s| s.subspace_id == data.subspace_id)
        .map(|s| s.id)
        .max()
        .unwrap_or(ROOT_SECTION_ID);
    if data.next_section_id <= max_section {
        return Err(SubspacesError::InvalidState(format!(
            "next section id {} of subspace {} must be greater than {}",
            data.next_section_id, data.subspace_id, max_section
        )));
    }

    let max_group = state
        .user_groups
        .iter()
        .filter(|g| g.subspace_id == data.subspace_id)
        .map(|g| g.id)
        .max()
        .unwrap_or(DEFAULT_GROUP_ID);
    if data.next_group_id <= max_group {
        return Err(SubspacesError::InvalidState(format!(
            "next group id {} of subspace {} must be greater than {}",
            data.next_group_id, data.subspace_id, max_group
        )));
    }

    Ok(())
}

/// Validate `state` and write it into an empty store
pub fn init_genesis<S: KvStore>(keeper: &mut Keeper<S>, state: &GenesisState) -> SubspacesResult<()> {
    if !keeper.store().prefix_scan(&[])?.is_empty() {
        return Err(SubspacesError::InvalidState(
            "genesis can only be imported into an empty store".to_string(),
        ));
    }
    validate_genesis(state, keeper.registry(), keeper.address_validator())?;

    keeper.set_next_subspace_id(state.initial_subspace_id)?;
    for subspace in &state.subspaces {
        keeper.save_subspace(subspace)?;
    }
    for data in &state.subspaces_data {
        keeper.set_next_section_id(data.subspace_id, data.next_section_id)?;
        keeper.set_next_group_id(data.subspace_id, data.next_group_id)?;
    }
    for section in &state.sections {
        keeper.save_section(section)?;
    }
    for group in &state.user_groups {
        keeper.save_user_group(group)?;
    }
    for entry in &state.user_permissions {
        keeper.set_user_permissions(
            entry.subspace_id,
            entry.section_id,
            &entry.user,
            &entry.permissions,
        )?;
    }
    for entry in &state.user_group_members {
        keeper.add_user_to_group(entry.subspace_id, entry.group_id, &entry.user)?;
    }

    info!(
        subspaces = state.subspaces.len(),
        sections = state.sections.len(),
        groups = state.user_groups.len(),
        "Imported subspaces genesis"
    );
    Ok(())
}

/// Export the whole state, ordered by subspace and then by key
pub fn export_genesis<S: KvStore>(keeper: &Keeper<S>) -> SubspacesResult<GenesisState> {
    let mut state = GenesisState {
        initial_subspace_id: keeper.get_next_subspace_id()?,
        ..Default::default()
    };

    for subspace in keeper.list_subspaces()? {
        let subspace_id = subspace.id;
        state.subspaces_data.push(SubspaceData::new(
            subspace_id,
            keeper.get_next_group_id(subspace_id)?,
            keeper.get_next_section_id(subspace_id)?,
        ));
        state.sections.extend(keeper.list_sections(subspace_id)?);
        state.user_groups.extend(keeper.list_user_groups(subspace_id)?);
        state
            .user_permissions
            .extend(keeper.list_user_permissions(subspace_id)?);
        state
            .user_group_members
            .extend(keeper.list_subspace_group_members(subspace_id)?);
        state.subspaces.push(subspace);
    }

    Ok(state)
}
