//! Default values applied when a registration leaves a setting unspecified.

/// Default Temporal frontend address (`host:port`).
pub const DEFAULT_TARGET_HOST: &str = "localhost:7233";

/// Default Temporal namespace.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Default upper bound on concurrently running activity tasks per worker.
pub const DEFAULT_MAX_CONCURRENT_ACTIVITIES: usize = 100;

/// Default upper bound on concurrently running workflow tasks per worker.
pub const DEFAULT_MAX_CONCURRENT_WORKFLOW_TASKS: usize = 100;
