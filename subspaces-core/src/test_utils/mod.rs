//! Test utilities shared by unit tests, integration tests and benches
//!
//! Fixtures build managers and entities with deterministic addresses; the
//! assertions give readable failures for the subspaces error taxonomy.

pub mod assertions;
pub mod fixtures;

pub use assertions::*;
pub use fixtures::*;
