//! Subspace data structures and operations

use super::address::AddressValidator;
use super::errors::{SubspacesError, SubspacesResult};
use super::types::{field_update, Address, SubspaceId, Timestamp};
use serde::{Deserialize, Serialize};

/// A subspace is the tenant root: it owns sections, groups and grants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subspace {
    /// Unique identifier, never zero
    pub id: SubspaceId,

    /// Human-readable name
    pub name: String,

    /// Free-form description
    pub description: String,

    /// Optional account holding the subspace funds
    pub treasury: Option<Address>,

    /// Owner of the subspace (implicitly holds every permission)
    pub owner: Address,

    /// Account that created the subspace, immutable
    pub creator: Address,

    /// Block time of creation, immutable
    pub creation_time: Timestamp,
}

impl Subspace {
    pub fn new(
        id: SubspaceId,
        name: impl Into<String>,
        description: impl Into<String>,
        treasury: Option<Address>,
        owner: Address,
        creator: Address,
        creation_time: Timestamp,
    ) -> Self {
        Subspace {
            id,
            name: name.into(),
            description: description.into(),
            treasury,
            owner,
            creator,
            creation_time,
        }
    }

    /// Check the subspace is well formed
    pub fn validate(&self, addresses: &dyn AddressValidator) -> SubspacesResult<()> {
        if self.id == 0 {
            return Err(SubspacesError::Validation(format!(
                "invalid subspace id: {}",
                self.id
            )));
        }

        if self.name.trim().is_empty() {
            return Err(SubspacesError::Validation(
                "subspace name cannot be empty or blank".to_string(),
            ));
        }

        if let Some(treasury) = &self.treasury {
            addresses.validate(treasury.as_str()).map_err(|e| {
                SubspacesError::Validation(format!("invalid treasury address {}: {}", treasury, e))
            })?;
        }

        addresses.validate(self.owner.as_str()).map_err(|e| {
            SubspacesError::Validation(format!("invalid owner address {}: {}", self.owner, e))
        })?;

        addresses.validate(self.creator.as_str()).map_err(|e| {
            SubspacesError::Validation(format!("invalid creator address {}: {}", self.creator, e))
        })?;

        if self.creation_time.is_zero() {
            return Err(SubspacesError::Validation(
                "invalid subspace creation time: 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Apply a partial update without validating the result.
    ///
    /// The creator and the creation time are never touched.
    pub fn update(&self, update: SubspaceUpdate) -> Subspace {
        Subspace {
            id: self.id,
            name: update.name.unwrap_or_else(|| self.name.clone()),
            description: update
                .description
                .unwrap_or_else(|| self.description.clone()),
            treasury: update.treasury.unwrap_or_else(|| self.treasury.clone()),
            owner: update.owner.unwrap_or_else(|| self.owner.clone()),
            creator: self.creator.clone(),
            creation_time: self.creation_time,
        }
    }
}

/// Editable fields of a subspace. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubspaceUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    /// `Some(None)` clears the treasury
    pub treasury: Option<Option<Address>>,
    pub owner: Option<Address>,
}

impl SubspaceUpdate {
    /// Build an update from raw message fields where
    /// [`DO_NOT_MODIFY`](super::types::DO_NOT_MODIFY) keeps the current value
    /// and an empty treasury clears it.
    pub fn from_raw(name: &str, description: &str, treasury: &str, owner: &str) -> Self {
        SubspaceUpdate {
            name: field_update(name),
            description: field_update(description),
            treasury: field_update(treasury).map(|t| {
                if t.is_empty() {
                    None
                } else {
                    Some(Address(t))
                }
            }),
            owner: field_update(owner).map(Address),
        }
    }
}
