//! Registration helpers for hosting Temporal clients and workers.
//!
//! This crate provides:
//! - An explicit startup registry ([`registry::ServiceRegistry`]) with named
//!   option slots, keyed singletons and a materialized, read-only
//!   [`registry::ServiceProvider`].
//! - One-call registration of a keyed client plus a hosted worker for a task
//!   queue, with the default codec, a tracing interceptor and optional worker
//!   versioning ([`hosting::TemporalServiceExt`]).
//! - A fluent [`builder::TemporalBuilder`] for further client and worker
//!   customization.
//!
//! ```
//! use temporal_hosting::prelude::*;
//!
//! let mut services = ServiceRegistry::new();
//! services
//!     .add_temporal_hosted_service(
//!         TemporalRegistration::new("orders-queue").with_build_id("build-42"),
//!     )?
//!     .configure_client(|options| options.identity = Some("orders".into()));
//!
//! let provider = services.build();
//! let worker = HostedWorker::resolve(&provider, "orders-queue")?;
//! assert_eq!(worker.options().build_id(), Some("build-42"));
//! # Ok::<(), temporal_hosting::HostingError>(())
//! ```

#![warn(missing_docs)]

/// The builder returned by hosted service registration.
pub mod builder;
/// Client connection options and the lazily connected client.
pub mod client;
/// Payload and failure converter descriptors.
pub mod converter;
/// Default hosts, namespaces and worker limits.
pub mod defaults;
/// Error taxonomy.
pub mod error;
/// Registration entry points.
pub mod hosting;
/// Client and worker interceptor descriptors.
pub mod interceptor;
/// Convenient re-exports for common imports.
pub mod prelude;
/// Declaration-phase registry and materialized provider.
pub mod registry;
/// Hosted worker options and materialization.
pub mod worker;

pub use builder::TemporalBuilder;
pub use error::{HostingError, Result};
pub use hosting::{TemporalRegistration, TemporalServiceExt};
