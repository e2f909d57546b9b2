//! Metrics for observability
//!
//! Only the `metrics` facade is used here. The host decides where the numbers
//! go by installing a recorder; without one every call is a no-op.

use metrics::{counter, describe_counter, describe_histogram, histogram};

pub const RESOLVE_TOTAL: &str = "subspaces.resolve.total";
pub const RESOLVE_DEPTH: &str = "subspaces.resolve.depth";
pub const PERMISSION_DENIED: &str = "subspaces.permission.denied";
pub const MUTATIONS_TOTAL: &str = "subspaces.mutations.total";
pub const HOOKS_FAILED: &str = "subspaces.hooks.failed";

/// Initialize metrics with descriptions
pub fn init_metrics() {
    describe_counter!(RESOLVE_TOTAL, "Number of permission resolutions");
    describe_histogram!(
        RESOLVE_DEPTH,
        "Number of sections visited by a permission resolution"
    );
    describe_counter!(
        PERMISSION_DENIED,
        "Operations rejected because the actor lacked a permission"
    );
    describe_counter!(MUTATIONS_TOTAL, "Successful state mutations, by operation");
    describe_counter!(HOOKS_FAILED, "Hook invocations that returned an error");
}

/// Count a successful mutation
pub fn record_mutation(op: &'static str) {
    counter!(MUTATIONS_TOTAL, "op" => op).increment(1);
}

/// Count a permission resolution and the depth it walked
pub fn record_resolution(depth: usize) {
    counter!(RESOLVE_TOTAL).increment(1);
    histogram!(RESOLVE_DEPTH).record(depth as f64);
}

/// Count an operation rejected for missing permissions
pub fn record_denied(op: &'static str) {
    counter!(PERMISSION_DENIED, "op" => op).increment(1);
}
