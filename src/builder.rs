//! The builder returned by Temporal hosted service registration.

use crate::{
    client::ClientConnectOptions,
    registry::{OptionsBuilder, ServiceRegistry},
    worker::WorkerOptionsBuilder,
};

/// Handle for customizing the client and worker declared for one task queue.
///
/// Every `configure_*` method consumes and returns the same builder so calls
/// can be chained.
#[derive(Debug)]
pub struct TemporalBuilder<'a> {
    name: String,
    build_id: Option<String>,
    services: &'a mut ServiceRegistry,
}

impl<'a> TemporalBuilder<'a> {
    pub(crate) fn new(
        name: String,
        build_id: Option<String>,
        services: &'a mut ServiceRegistry,
    ) -> Self {
        Self {
            name,
            build_id,
            services,
        }
    }

    /// The task queue this builder was registered for.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The registry the client and worker were declared on.
    pub fn services(&mut self) -> &mut ServiceRegistry {
        self.services
    }

    pub(crate) fn client_options_builder(&mut self) -> OptionsBuilder<'_, ClientConnectOptions> {
        self.services.add_options(self.name.clone())
    }

    pub(crate) fn worker_options_builder(&mut self) -> WorkerOptionsBuilder<'_> {
        WorkerOptionsBuilder::new(self.services, self.name.clone(), self.build_id.clone())
    }

    /// Runs `configure` once against the client option slot.
    pub fn configure_client_options<F>(mut self, configure: F) -> Self
    where
        F: FnOnce(&mut OptionsBuilder<'_, ClientConnectOptions>),
    {
        configure(&mut self.client_options_builder());
        tracing::debug!(task_queue = %self.name, "configured client options");
        self
    }

    /// Queues `configure` to run against the materialized client options.
    pub fn configure_client<F>(self, configure: F) -> Self
    where
        F: Fn(&mut ClientConnectOptions) + Send + Sync + 'static,
    {
        self.configure_client_options(move |builder| {
            builder.configure(configure);
        })
    }

    /// Runs `configure` once against the worker option slot.
    pub fn configure_worker_options<F>(mut self, configure: F) -> Self
    where
        F: FnOnce(&mut WorkerOptionsBuilder<'_>),
    {
        configure(&mut self.worker_options_builder());
        tracing::debug!(task_queue = %self.name, "configured worker options");
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        hosting::{TemporalRegistration, TemporalServiceExt},
        worker::WorkerServiceOptions,
    };

    #[test]
    fn configure_calls_run_once_and_return_the_same_builder() {
        let mut registry = ServiceRegistry::new();
        let registry_ptr: *const ServiceRegistry = &registry;

        let mut client_calls = 0;
        let mut worker_calls = 0;
        let mut builder = registry
            .add_temporal_hosted_service(TemporalRegistration::new("orders-queue"))
            .unwrap()
            .configure_client_options(|options| {
                client_calls += 1;
                assert_eq!(options.name(), "orders-queue");
            })
            .configure_worker_options(|worker| {
                worker_calls += 1;
                assert_eq!(worker.task_queue(), "orders-queue");
            });

        assert_eq!(builder.name(), "orders-queue");
        assert!(std::ptr::eq(builder.services(), registry_ptr));
        assert_eq!(client_calls, 1);
        assert_eq!(worker_calls, 1);
    }

    #[test]
    fn realized_client_callback_is_deferred_until_materialization() {
        let mut registry = ServiceRegistry::new();
        let before = registry.configure_action_count::<ClientConnectOptions>("orders");

        registry
            .add_temporal_hosted_service(TemporalRegistration::new("orders"))
            .unwrap()
            .configure_client(|options| options.identity = Some("orders-client".into()));

        let provider = registry.build();
        let options = provider.options::<ClientConnectOptions>("orders");
        assert_eq!(before, 0);
        assert_eq!(options.identity.as_deref(), Some("orders-client"));
    }

    #[test]
    fn worker_customizations_run_after_defaults() {
        let mut registry = ServiceRegistry::new();
        registry
            .add_temporal_hosted_service(TemporalRegistration::new("orders").with_build_id("b7"))
            .unwrap()
            .configure_worker_options(|worker| {
                assert_eq!(worker.build_id(), Some("b7"));
                worker.configure(|options| options.max_concurrent_activities = 4);
            });

        let options = registry.build().options::<WorkerServiceOptions>("orders");
        assert_eq!(options.max_concurrent_activities, 4);
        assert_eq!(options.build_id(), Some("b7"));
    }
}
