//! Registration of Temporal clients and hosted workers.

use serde::{Deserialize, Serialize};

use crate::{
    builder::TemporalBuilder,
    client::{ClientConnectOptions, LazyClient},
    defaults::{DEFAULT_NAMESPACE, DEFAULT_TARGET_HOST},
    error::{HostingError, Result, require_non_blank},
    interceptor::TracingInterceptor,
    registry::{OptionsBuilder, ServiceRegistry},
    worker::{WorkerDeploymentOptions, WorkerOptionsBuilder, WorkerServiceOptions},
};

/// Parameters for [`TemporalServiceExt::add_temporal_hosted_service`].
///
/// Deserializes from a host configuration section; only `task_queue` is
/// required there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalRegistration {
    /// Task queue polled by the worker; also names the client and worker slots.
    pub task_queue: String,
    /// Temporal frontend address, `host:port`.
    #[serde(default = "default_target_host")]
    pub target_host: String,
    /// Namespace the client and worker operate in.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Enables worker versioning under `(task_queue, build_id)` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_id: Option<String>,
}

fn default_target_host() -> String {
    DEFAULT_TARGET_HOST.to_owned()
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_owned()
}

impl TemporalRegistration {
    /// Creates a registration for `task_queue` with default host and namespace.
    ///
    /// Defaults:
    /// - target host: `localhost:7233`
    /// - namespace: `default`
    /// - build id: none (unversioned worker)
    pub fn new(task_queue: impl Into<String>) -> Self {
        Self {
            task_queue: task_queue.into(),
            target_host: default_target_host(),
            namespace: default_namespace(),
            build_id: None,
        }
    }

    /// Reads a registration from environment variables.
    ///
    /// Required:
    /// - `TEMPORAL_TASK_QUEUE`
    ///
    /// Optional:
    /// - `TEMPORAL_ADDRESS` (default: `localhost:7233`)
    /// - `TEMPORAL_NAMESPACE` (default: `default`)
    /// - `TEMPORAL_BUILD_ID` (default: unversioned)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let task_queue = lookup("TEMPORAL_TASK_QUEUE")
            .ok_or_else(|| HostingError::Environment("missing TEMPORAL_TASK_QUEUE".into()))?;

        let mut registration = Self::new(task_queue);
        if let Some(target_host) = lookup("TEMPORAL_ADDRESS") {
            registration.target_host = target_host;
        }
        if let Some(namespace) = lookup("TEMPORAL_NAMESPACE") {
            registration.namespace = namespace;
        }
        registration.build_id = lookup("TEMPORAL_BUILD_ID");
        Ok(registration)
    }

    /// Sets the target host.
    pub fn with_target_host(mut self, target_host: impl Into<String>) -> Self {
        self.target_host = target_host.into();
        self
    }

    /// Sets the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the build id, enabling worker versioning.
    pub fn with_build_id(mut self, build_id: impl Into<String>) -> Self {
        self.build_id = Some(build_id.into());
        self
    }

    fn validate(&self) -> Result<()> {
        require_non_blank("task_queue", &self.task_queue)?;
        require_non_blank("target_host", &self.target_host)?;
        require_non_blank("namespace", &self.namespace)?;
        if let Some(build_id) = &self.build_id {
            require_non_blank("build_id", build_id)?;
        }
        Ok(())
    }
}

/// Temporal registrations on a [`ServiceRegistry`].
pub trait TemporalServiceExt {
    /// Declares a keyed client and a hosted worker for one task queue.
    ///
    /// Both slots get the default codec and a single [`TracingInterceptor`].
    /// Fails with [`HostingError::DuplicateRegistration`] if a hosted service
    /// was already declared for the task queue; nothing is modified in that
    /// case.
    fn add_temporal_hosted_service(
        &mut self,
        registration: TemporalRegistration,
    ) -> Result<TemporalBuilder<'_>>;

    /// Declares a lazily connected client keyed by `task_queue`.
    ///
    /// The keyed singleton is only added once; the option slot accumulates
    /// every call's actions.
    fn add_keyed_temporal_client(
        &mut self,
        task_queue: &str,
        target_host: Option<&str>,
        namespace: Option<&str>,
    ) -> Result<OptionsBuilder<'_, ClientConnectOptions>>;

    /// Declares a hosted worker polling `task_queue` with its own client
    /// connection.
    fn add_hosted_temporal_worker(
        &mut self,
        target_host: &str,
        namespace: &str,
        task_queue: &str,
        deployment: WorkerDeploymentOptions,
    ) -> Result<WorkerOptionsBuilder<'_>>;
}

impl TemporalServiceExt for ServiceRegistry {
    fn add_temporal_hosted_service(
        &mut self,
        registration: TemporalRegistration,
    ) -> Result<TemporalBuilder<'_>> {
        registration.validate()?;
        let TemporalRegistration {
            task_queue,
            target_host,
            namespace,
            build_id,
        } = registration;

        if self.is_guarded(&task_queue) {
            return Err(HostingError::DuplicateRegistration { task_queue });
        }

        self.add_keyed_temporal_client(
            &task_queue,
            Some(target_host.as_str()),
            Some(namespace.as_str()),
        )?
        .configure(ClientConnectOptions::apply_hosting_defaults);

        let deployment = WorkerDeploymentOptions::for_build(&task_queue, build_id.as_deref());
        self.add_hosted_temporal_worker(&target_host, &namespace, &task_queue, deployment)?
            .configure_options(apply_worker_hosting_defaults, true)?;

        tracing::debug!(
            task_queue = %task_queue,
            target_host = %target_host,
            namespace = %namespace,
            build_id = ?build_id,
            "registered Temporal hosted service"
        );
        Ok(TemporalBuilder::new(task_queue, build_id, self))
    }

    fn add_keyed_temporal_client(
        &mut self,
        task_queue: &str,
        target_host: Option<&str>,
        namespace: Option<&str>,
    ) -> Result<OptionsBuilder<'_, ClientConnectOptions>> {
        require_non_blank("task_queue", task_queue)?;

        let key = task_queue.to_owned();
        self.try_add_keyed_singleton(task_queue, move |provider| {
            Ok(LazyClient::new(provider.options::<ClientConnectOptions>(&key)))
        });

        let mut builder = self.add_options::<ClientConnectOptions>(task_queue);
        if target_host.is_some() || namespace.is_some() {
            let target_host = target_host.map(str::to_owned);
            let namespace = namespace.map(str::to_owned);
            builder.configure(move |options| {
                options.target_host = target_host.clone();
                if let Some(namespace) = &namespace {
                    options.namespace = namespace.clone();
                }
            });
        }

        builder.configure_with_provider(|options, provider| {
            if let Some(logger) = provider.service::<tracing::Dispatch>() {
                options.logger = Some(tracing::Dispatch::clone(&logger));
            }
        });

        tracing::debug!(task_queue, "registered keyed Temporal client");
        Ok(builder)
    }

    fn add_hosted_temporal_worker(
        &mut self,
        target_host: &str,
        namespace: &str,
        task_queue: &str,
        deployment: WorkerDeploymentOptions,
    ) -> Result<WorkerOptionsBuilder<'_>> {
        require_non_blank("task_queue", task_queue)?;

        if !self.add_hosted(task_queue) {
            tracing::debug!(task_queue, "hosted worker already declared");
        }

        let build_id = deployment
            .version
            .as_ref()
            .map(|version| version.build_id.clone());
        let queue = task_queue.to_owned();
        let target_host = target_host.to_owned();
        let namespace = namespace.to_owned();

        let mut builder = WorkerOptionsBuilder::new(self, task_queue, build_id);
        builder.configure(move |options| {
            options.task_queue = queue.clone();
            options.client_options = Some(
                ClientConnectOptions::new(target_host.clone()).with_namespace(namespace.clone()),
            );
            options.deployment = deployment.clone();
        });
        Ok(builder)
    }
}

/// Installs the tracing interceptor on the worker, and the client defaults on
/// its embedded connection when it still has one.
fn apply_worker_hosting_defaults(options: &mut WorkerServiceOptions) {
    options.interceptors = vec![TracingInterceptor::shared()];
    if let Some(client_options) = options.client_options.as_mut() {
        client_options.apply_hosting_defaults();
    }
}
