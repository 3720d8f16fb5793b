//! Interceptor descriptors attached to clients and workers.

use std::{fmt, sync::Arc};

/// Names an interceptor the SDK connection should install.
pub trait Interceptor: Send + Sync + fmt::Debug {
    /// Name the SDK resolves the interceptor by.
    fn name(&self) -> &str;
}

/// Shared interceptor handle stored in option lists.
pub type SharedInterceptor = Arc<dyn Interceptor>;

/// The tracing interceptor installed by hosted service registration.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingInterceptor;

impl TracingInterceptor {
    /// Name reported by [`Interceptor::name`].
    pub const NAME: &'static str = "tracing";

    /// Returns a new shared handle.
    pub fn shared() -> SharedInterceptor {
        Arc::new(Self)
    }
}

impl Interceptor for TracingInterceptor {
    fn name(&self) -> &str {
        Self::NAME
    }
}
