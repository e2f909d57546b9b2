//! Subspaces, Sections & Groups
//!
//! This module implements the access-control core of a multi-tenant
//! community state machine.
//!
//! ## Architecture
//!
//! - **Subspace**: the tenant root, owned by one address
//! - **Section**: a node of the per-subspace scope tree, rooted at section 0
//! - **User group**: a section-scoped set of members sharing a permission set;
//!   group 0 implicitly contains everyone
//! - **ACL entry**: permissions granted directly to one user at one section
//!
//! ## Key Design Principles
//!
//! 1. The permission registry is built once and injected, never mutated
//! 2. Permission inheritance down the section tree only adds
//! 3. IDs come from monotonic counters and are never reused
//! 4. Hooks observe mutations and cannot undo them
//!
//! Every operation is synchronous and works on a host-supplied
//! [`KvStore`](storage::KvStore).

pub mod acl;
pub mod address;
pub mod errors;
pub mod genesis;
pub mod group;
pub mod hooks;
pub mod keeper;
pub mod manager;
pub mod manager_impl;
pub mod permission;
pub mod resolver;
pub mod section;
pub mod storage;
pub mod subspace;
pub mod types;

pub use acl::{UserGroupMemberEntry, UserPermission};
pub use address::{AddressValidator, Bech32Validator};
pub use errors::{SubspacesError, SubspacesResult};
pub use genesis::{export_genesis, init_genesis, validate_genesis, GenesisState, SubspaceData};
pub use group::{GroupUpdate, UserGroup};
pub use hooks::{HookDispatcher, HookError, HookEvent, SubspacesHooks};
pub use keeper::Keeper;
pub use manager::{GroupManager, PermissionManager, SectionManager, SubspaceManager};
pub use manager_impl::SubspacesManagerImpl;
pub use permission::{Permission, PermissionRegistry, PermissionRegistryBuilder, PermissionSet};
pub use section::{Section, SectionUpdate};
pub use storage::{KvStore, MemoryStore, SqliteStore};
pub use subspace::{Subspace, SubspaceUpdate};
pub use types::{
    Address, DeletePolicy, GroupId, SectionId, SubspaceId, Timestamp, DEFAULT_GROUP_ID,
    DO_NOT_MODIFY, FIRST_LOCAL_ID, ROOT_SECTION_ID,
};
