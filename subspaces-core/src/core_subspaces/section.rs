//! Section data structures
//!
//! Sections form a tree inside each subspace. The root section (ID 0) is its
//! own parent, always exists and is an ancestor of every other section.

use super::errors::{SubspacesError, SubspacesResult};
use super::types::{field_update, SectionId, SubspaceId, ROOT_SECTION_ID};
use serde::{Deserialize, Serialize};

/// A node of a subspace's permission scope hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub subspace_id: SubspaceId,
    pub id: SectionId,
    pub parent_id: SectionId,
    pub name: String,
    pub description: String,
}

impl Section {
    pub fn new(
        subspace_id: SubspaceId,
        id: SectionId,
        parent_id: SectionId,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Section {
            subspace_id,
            id,
            parent_id,
            name: name.into(),
            description: description.into(),
        }
    }

    /// The root section provisioned with every subspace
    pub fn root(subspace_id: SubspaceId) -> Self {
        Section::new(
            subspace_id,
            ROOT_SECTION_ID,
            ROOT_SECTION_ID,
            "Default section",
            "This is the default subspace section",
        )
    }

    pub fn is_root(&self) -> bool {
        self.id == ROOT_SECTION_ID
    }

    pub fn validate(&self) -> SubspacesResult<()> {
        if self.subspace_id == 0 {
            return Err(SubspacesError::Validation(format!(
                "invalid subspace id: {}",
                self.subspace_id
            )));
        }

        if self.is_root() && self.parent_id != ROOT_SECTION_ID {
            return Err(SubspacesError::Validation(format!(
                "root section cannot have parent {}",
                self.parent_id
            )));
        }

        if !self.is_root() && self.parent_id == self.id {
            return Err(SubspacesError::Validation(format!(
                "section {} cannot be its own parent",
                self.id
            )));
        }

        if self.name.trim().is_empty() {
            return Err(SubspacesError::Validation(format!(
                "invalid section name: {:?}",
                self.name
            )));
        }

        Ok(())
    }

    /// Apply a partial update without validating the result
    pub fn update(&self, update: SectionUpdate) -> Section {
        Section {
            subspace_id: self.subspace_id,
            id: self.id,
            parent_id: self.parent_id,
            name: update.name.unwrap_or_else(|| self.name.clone()),
            description: update
                .description
                .unwrap_or_else(|| self.description.clone()),
        }
    }
}

/// Editable fields of a section. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl SectionUpdate {
    pub fn from_raw(name: &str, description: &str) -> Self {
        SectionUpdate {
            name: field_update(name),
            description: field_update(description),
        }
    }
}
