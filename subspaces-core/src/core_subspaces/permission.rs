//! Permissions, the permission registry and permission sets
//!
//! A [`Permission`] is one of a closed list of capability kinds, plus the
//! [`Permission::Everything`] wildcard which subsumes all of them. Each kind
//! has a canonical uppercase tag (`MANAGE_GROUPS`) used for display and name
//! parsing, and a stable integer code used for every persisted form.
//!
//! Which kinds are usable is decided by a [`PermissionRegistry`]. The registry
//! is assembled once through a [`PermissionRegistryBuilder`] at build/genesis
//! time and is immutable afterwards, so every replica resolves permissions
//! against the same list.

use super::errors::{SubspacesError, SubspacesResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A capability kind that can be granted inside a subspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
#[repr(u32)]
pub enum Permission {
    /// Create content inside a section
    Write = 1,
    /// Edit the subspace metadata, owner and treasury
    EditSubspace = 2,
    /// Delete the whole subspace
    DeleteSubspace = 3,
    /// Create, edit, move and delete sections
    ManageSections = 4,
    /// Create, edit, move and delete user groups
    ManageGroups = 5,
    /// Grant permissions to users and groups, manage group members
    SetPermissions = 6,
    /// Manage the authorizations given to the subspace treasury
    ManageTreasuryAuthorization = 7,
    /// Edit content authored by oneself
    EditOwnContent = 8,
    /// React, comment and otherwise interact with content
    InteractWithContent = 9,
    /// Moderate content authored by others
    ModerateContent = 10,
    /// Manage the subspace registered reactions
    ManageRegisteredReactions = 11,
    /// Manage the subspace reaction parameters
    ManageReactionParams = 12,
    /// Report content and users
    ReportContent = 13,
    /// Delete reports created by oneself
    DeleteOwnReports = 14,
    /// Manage the reasons users can report with
    ManageReasons = 15,
    /// Manage the tokens issued by the subspace
    ManageSubspaceTokens = 16,
    /// Wildcard granting every capability
    Everything = 0xFFFF_FFFF,
}

impl Permission {
    /// Every known capability kind, excluding the wildcard, in code order
    pub const KNOWN: [Permission; 16] = [
        Permission::Write,
        Permission::EditSubspace,
        Permission::DeleteSubspace,
        Permission::ManageSections,
        Permission::ManageGroups,
        Permission::SetPermissions,
        Permission::ManageTreasuryAuthorization,
        Permission::EditOwnContent,
        Permission::InteractWithContent,
        Permission::ModerateContent,
        Permission::ManageRegisteredReactions,
        Permission::ManageReactionParams,
        Permission::ReportContent,
        Permission::DeleteOwnReports,
        Permission::ManageReasons,
        Permission::ManageSubspaceTokens,
    ];

    /// Canonical tag of the permission
    pub fn tag(&self) -> &'static str {
        match self {
            Permission::Write => "WRITE",
            Permission::EditSubspace => "EDIT_SUBSPACE",
            Permission::DeleteSubspace => "DELETE_SUBSPACE",
            Permission::ManageSections => "MANAGE_SECTIONS",
            Permission::ManageGroups => "MANAGE_GROUPS",
            Permission::SetPermissions => "SET_PERMISSIONS",
            Permission::ManageTreasuryAuthorization => "MANAGE_TREASURY_AUTHORIZATION",
            Permission::EditOwnContent => "EDIT_OWN_CONTENT",
            Permission::InteractWithContent => "INTERACT_WITH_CONTENT",
            Permission::ModerateContent => "MODERATE_CONTENT",
            Permission::ManageRegisteredReactions => "MANAGE_REGISTERED_REACTIONS",
            Permission::ManageReactionParams => "MANAGE_REACTION_PARAMS",
            Permission::ReportContent => "REPORT_CONTENT",
            Permission::DeleteOwnReports => "DELETE_OWN_REPORTS",
            Permission::ManageReasons => "MANAGE_REASONS",
            Permission::ManageSubspaceTokens => "MANAGE_SUBSPACE_TOKENS",
            Permission::Everything => "EVERYTHING",
        }
    }

    /// Stable integer code used in persisted and wire forms
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Look a permission up by its canonical tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        if tag == Permission::Everything.tag() {
            return Some(Permission::Everything);
        }
        Permission::KNOWN.iter().copied().find(|p| p.tag() == tag)
    }

    /// Look a permission up by a human name such as `"manage groups"`
    pub fn from_name(name: &str) -> Option<Self> {
        Self::from_tag(&normalize_permission_name(name))
    }

    pub fn is_everything(&self) -> bool {
        matches!(self, Permission::Everything)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl From<Permission> for u32 {
    fn from(permission: Permission) -> Self {
        permission.code()
    }
}

impl TryFrom<u32> for Permission {
    type Error = String;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        if code == Permission::Everything.code() {
            return Ok(Permission::Everything);
        }
        Permission::KNOWN
            .iter()
            .copied()
            .find(|p| p.code() == code)
            .ok_or_else(|| format!("unknown permission code: {}", code))
    }
}

/// Turn a human permission name into its canonical tag.
///
/// Leading and trailing whitespace is dropped, inner whitespace runs become a
/// single `_` and the result is uppercased: `" manage  groups"` gives
/// `"MANAGE_GROUPS"`.
pub fn normalize_permission_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_uppercase()
}

/// Mutable builder used once to assemble a [`PermissionRegistry`]
#[derive(Debug, Default)]
pub struct PermissionRegistryBuilder {
    registered: Vec<Permission>,
}

impl PermissionRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a permission by its human name.
    ///
    /// Fails with `Validation` if the name does not match a known kind or
    /// names the wildcard, and with `Duplicate` if it is already registered.
    pub fn register(&mut self, name: &str) -> SubspacesResult<Permission> {
        let tag = normalize_permission_name(name);
        let permission = Permission::from_tag(&tag).ok_or_else(|| {
            SubspacesError::Validation(format!("unknown permission name: {:?}", name))
        })?;
        self.register_permission(permission)?;
        Ok(permission)
    }

    /// Register an already parsed permission
    pub fn register_permission(&mut self, permission: Permission) -> SubspacesResult<()> {
        if permission.is_everything() {
            return Err(SubspacesError::Validation(
                "the EVERYTHING wildcard is always available and cannot be registered".to_string(),
            ));
        }
        if self.registered.contains(&permission) {
            return Err(SubspacesError::Duplicate(format!(
                "permission {} is already registered",
                permission
            )));
        }
        self.registered.push(permission);
        Ok(())
    }

    /// Freeze the registry
    pub fn build(self) -> PermissionRegistry {
        PermissionRegistry {
            registered: self.registered,
        }
    }
}

/// Immutable list of the permissions usable by the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRegistry {
    registered: Vec<Permission>,
}

impl PermissionRegistry {
    /// Registry containing every known permission kind
    pub fn all() -> Self {
        PermissionRegistry {
            registered: Permission::KNOWN.to_vec(),
        }
    }

    /// Build a registry from human names, in the given order
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> SubspacesResult<Self> {
        let mut builder = PermissionRegistryBuilder::new();
        for name in names {
            builder.register(name)?;
        }
        Ok(builder.build())
    }

    /// Registered permissions in registration order
    pub fn registered(&self) -> &[Permission] {
        &self.registered
    }

    /// The wildcard is always considered registered
    pub fn is_registered(&self, permission: Permission) -> bool {
        permission.is_everything() || self.registered.contains(&permission)
    }

    /// Parse a human name into a registered permission
    pub fn parse(&self, name: &str) -> SubspacesResult<Permission> {
        let permission = Permission::from_name(name).ok_or_else(|| {
            SubspacesError::Validation(format!("unknown permission name: {:?}", name))
        })?;
        if !self.is_registered(permission) {
            return Err(SubspacesError::Validation(format!(
                "permission {} is not registered",
                permission
            )));
        }
        Ok(permission)
    }

    /// Drop unregistered permissions and duplicates, keeping first-seen order
    pub fn sanitize(&self, set: &PermissionSet) -> PermissionSet {
        let mut sanitized = Vec::with_capacity(set.len());
        for permission in set.iter() {
            if self.is_registered(permission) && !sanitized.contains(&permission) {
                sanitized.push(permission);
            }
        }
        PermissionSet(sanitized)
    }

    /// Fail with `Validation` if the set contains an unregistered permission
    pub fn validate_set(&self, set: &PermissionSet) -> SubspacesResult<()> {
        match set.iter().find(|p| !self.is_registered(*p)) {
            Some(permission) => Err(SubspacesError::Validation(format!(
                "permission {} is not registered",
                permission
            ))),
            None => Ok(()),
        }
    }
}

impl Default for PermissionRegistry {
    fn default() -> Self {
        Self::all()
    }
}

/// Ordered collection of permissions.
///
/// Equality is sequence equality: two sets holding the same permissions in a
/// different order are not equal. Use [`PermissionSet::check_all`] in both
/// directions for order-insensitive comparisons.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(Vec<Permission>);

impl PermissionSet {
    pub fn new(permissions: impl IntoIterator<Item = Permission>) -> Self {
        PermissionSet(permissions.into_iter().collect())
    }

    /// The empty set
    pub fn nothing() -> Self {
        PermissionSet(Vec::new())
    }

    /// The set holding only the wildcard
    pub fn everything() -> Self {
        PermissionSet(vec![Permission::Everything])
    }

    /// Union of the given sets in first-seen order.
    ///
    /// If any input holds [`Permission::Everything`] the result collapses to
    /// the wildcard alone.
    pub fn combine<'a>(sets: impl IntoIterator<Item = &'a PermissionSet>) -> PermissionSet {
        let mut combined: Vec<Permission> = Vec::new();
        for set in sets {
            for permission in set.iter() {
                if permission.is_everything() {
                    return PermissionSet::everything();
                }
                if !combined.contains(&permission) {
                    combined.push(permission);
                }
            }
        }
        PermissionSet(combined)
    }

    /// Union of `self` and `other`
    pub fn union(&self, other: &PermissionSet) -> PermissionSet {
        PermissionSet::combine([self, other])
    }

    /// Order-sensitive sequence equality
    pub fn equals(&self, other: &PermissionSet) -> bool {
        self.0 == other.0
    }

    /// True if the set holds `permission` or the wildcard
    pub fn check(&self, permission: Permission) -> bool {
        self.0
            .iter()
            .any(|p| *p == permission || p.is_everything())
    }

    /// True if [`check`](Self::check) holds for every permission of `required`
    pub fn check_all(&self, required: &PermissionSet) -> bool {
        required.iter().all(|p| self.check(p))
    }

    pub fn contains_everything(&self) -> bool {
        self.0.iter().any(Permission::is_everything)
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[Permission] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Permission> for PermissionSet {
    fn from(permission: Permission) -> Self {
        PermissionSet(vec![permission])
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        PermissionSet(iter.into_iter().collect())
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<&str> = self.0.iter().map(Permission::tag).collect();
        write!(f, "[{}]", tags.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_permission_name() {
        assert_eq!(normalize_permission_name("write"), "WRITE");
        assert_eq!(normalize_permission_name("  manage   groups "), "MANAGE_GROUPS");
        assert_eq!(normalize_permission_name("Edit\tSubspace"), "EDIT_SUBSPACE");
    }

    #[test]
    fn test_permission_codes_are_stable() {
        assert_eq!(Permission::Write.code(), 1);
        assert_eq!(Permission::ManageSubspaceTokens.code(), 16);
        assert_eq!(Permission::Everything.code(), u32::MAX);
        for permission in Permission::KNOWN {
            assert_eq!(Permission::try_from(permission.code()), Ok(permission));
            assert_eq!(Permission::from_tag(permission.tag()), Some(permission));
        }
        assert!(Permission::try_from(999).is_err());
    }

    #[test]
    fn test_permission_serializes_as_code() {
        let json = serde_json::to_string(&PermissionSet::new([
            Permission::Write,
            Permission::Everything,
        ]))
        .unwrap();
        assert_eq!(json, "[1,4294967295]");

        let set: PermissionSet = serde_json::from_str("[5,6]").unwrap();
        assert_eq!(
            set,
            PermissionSet::new([Permission::ManageGroups, Permission::SetPermissions])
        );
        assert!(serde_json::from_str::<PermissionSet>("[1000]").is_err());
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut builder = PermissionRegistryBuilder::new();
        assert_eq!(builder.register("write").unwrap(), Permission::Write);

        let result = builder.register(" WRITE ");
        assert!(matches!(result, Err(SubspacesError::Duplicate(_))));
    }

    #[test]
    fn test_register_rejects_unknown_and_wildcard() {
        let mut builder = PermissionRegistryBuilder::new();
        assert!(matches!(
            builder.register("fly"),
            Err(SubspacesError::Validation(_))
        ));
        assert!(matches!(
            builder.register("everything"),
            Err(SubspacesError::Validation(_))
        ));
    }

    #[test]
    fn test_registry_keeps_registration_order() {
        let registry = PermissionRegistry::from_names(["manage groups", "write"]).unwrap();
        assert_eq!(
            registry.registered(),
            &[Permission::ManageGroups, Permission::Write]
        );
        assert!(registry.is_registered(Permission::Everything));
        assert!(!registry.is_registered(Permission::ModerateContent));
    }

    #[test]
    fn test_registry_parse() {
        let registry = PermissionRegistry::from_names(["write"]).unwrap();
        assert_eq!(registry.parse("Write").unwrap(), Permission::Write);
        assert_eq!(registry.parse("everything").unwrap(), Permission::Everything);
        assert!(registry.parse("moderate content").is_err());
    }

    #[test]
    fn test_combine_unions_in_first_seen_order() {
        let a = PermissionSet::new([Permission::Write, Permission::ManageGroups]);
        let b = PermissionSet::new([Permission::ManageGroups, Permission::SetPermissions]);
        let combined = PermissionSet::combine([&a, &b]);
        assert_eq!(
            combined,
            PermissionSet::new([
                Permission::Write,
                Permission::ManageGroups,
                Permission::SetPermissions
            ])
        );
    }

    #[test]
    fn test_combine_collapses_to_everything() {
        let a = PermissionSet::new([Permission::Write]);
        let b = PermissionSet::new([Permission::ManageGroups, Permission::Everything]);
        assert_eq!(PermissionSet::combine([&a, &b]), PermissionSet::everything());
        assert_eq!(PermissionSet::combine([&b, &a]), PermissionSet::everything());
    }

    #[test]
    fn test_combine_of_nothing_is_empty() {
        assert!(PermissionSet::combine(std::iter::empty()).is_empty());
        assert!(PermissionSet::nothing().union(&PermissionSet::nothing()).is_empty());
    }

    #[test]
    fn test_sanitize_drops_unregistered_and_duplicates() {
        let registry = PermissionRegistry::from_names(["write", "manage groups"]).unwrap();
        let set = PermissionSet::new([
            Permission::ModerateContent,
            Permission::ManageGroups,
            Permission::Write,
            Permission::ManageGroups,
        ]);
        assert_eq!(
            registry.sanitize(&set),
            PermissionSet::new([Permission::ManageGroups, Permission::Write])
        );
        assert!(registry.validate_set(&set).is_err());
        assert!(registry.validate_set(&registry.sanitize(&set)).is_ok());
    }

    #[test]
    fn test_equals_is_order_sensitive() {
        let a = PermissionSet::new([Permission::Write, Permission::ManageGroups]);
        let b = PermissionSet::new([Permission::ManageGroups, Permission::Write]);
        assert!(a.equals(&a.clone()));
        assert!(!a.equals(&b));
        assert!(a.check_all(&b) && b.check_all(&a));
    }

    #[test]
    fn test_check() {
        let set = PermissionSet::new([Permission::Write]);
        assert!(set.check(Permission::Write));
        assert!(!set.check(Permission::ManageGroups));
        assert!(PermissionSet::everything().check(Permission::ManageGroups));
        assert!(!PermissionSet::nothing().check(Permission::Write));
    }

    #[test]
    fn test_check_all() {
        let set = PermissionSet::new([Permission::Write, Permission::ManageGroups]);
        assert!(set.check_all(&PermissionSet::new([Permission::ManageGroups])));
        assert!(set.check_all(&PermissionSet::nothing()));
        assert!(!set.check_all(&PermissionSet::new([
            Permission::Write,
            Permission::SetPermissions
        ])));
        assert!(!set.check_all(&PermissionSet::everything()));
        assert!(PermissionSet::everything().check_all(&PermissionSet::everything()));
    }

    #[test]
    fn test_display() {
        let set = PermissionSet::new([Permission::Write, Permission::ManageGroups]);
        assert_eq!(set.to_string(), "[WRITE, MANAGE_GROUPS]");
        assert_eq!(PermissionSet::nothing().to_string(), "[]");
    }
}
