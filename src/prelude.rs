//! Convenient imports for common `temporal_hosting` usage.
//!
//! Import with:
//! `use temporal_hosting::prelude::*;`

/// Registration entry points and their parameters.
pub use crate::hosting::{TemporalRegistration, TemporalServiceExt};

/// Fluent builder returned by registration.
pub use crate::builder::TemporalBuilder;

/// Startup registry and its materialized provider.
pub use crate::registry::{OptionsBuilder, ServiceProvider, ServiceRegistry};

/// Client-side options and the lazy client handle.
pub use crate::client::{ClientConnectOptions, Connector, LazyClient};

/// Worker-side options, versioning and the materialized worker.
pub use crate::worker::{
    HostedWorker, VersioningBehavior, WorkerDeploymentOptions, WorkerDeploymentVersion,
    WorkerOptionsBuilder, WorkerServiceOptions,
};

/// Codec and interceptor defaults.
pub use crate::converter::DataConverter;
pub use crate::interceptor::{Interceptor, TracingInterceptor};

/// Error type.
pub use crate::error::HostingError;
