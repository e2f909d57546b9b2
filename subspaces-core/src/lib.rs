//! Access-control core of a multi-tenant community state machine
//!
//! Subspaces own a tree of sections; permissions are granted to users
//! directly or through section-scoped user groups and are inherited down the
//! tree. See [`core_subspaces`] for the data model and operations.

pub mod config;
pub mod core_subspaces;
pub mod logging;
pub mod metrics;
pub mod test_utils;

pub use config::{Config, ConfigError};
pub use core_subspaces::{
    Keeper, Permission, PermissionRegistry, PermissionSet, SubspacesError, SubspacesManagerImpl,
    SubspacesResult,
};
pub use logging::{init_logging, LogLevel};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let _ = LogLevel::Info;
        let registry = PermissionRegistry::all();
        assert!(registry.is_registered(Permission::Write));
        assert!(Config::default().validate().is_ok());
    }
}
