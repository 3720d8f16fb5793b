//! Hosted worker options, deployment versioning and worker materialization.

use std::{fmt, sync::Arc};

use crate::{
    client::{ClientConnectOptions, LazyClient},
    defaults::{DEFAULT_MAX_CONCURRENT_ACTIVITIES, DEFAULT_MAX_CONCURRENT_WORKFLOW_TASKS},
    error::{HostingError, Result},
    interceptor::SharedInterceptor,
    registry::{ServiceProvider, ServiceRegistry},
};

/// How workflows started on a versioned worker follow new deployments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VersioningBehavior {
    /// Leave the decision to the server or to per-workflow settings.
    #[default]
    Unspecified,
    /// Workflows stay on the version they started on.
    Pinned,
    /// Workflows move to the current version on their next task.
    AutoUpgrade,
}

/// A deployment name paired with a build identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkerDeploymentVersion {
    /// Deployment the build belongs to; the task queue for hosted workers.
    pub deployment_name: String,
    /// Identifier of this build within the deployment.
    pub build_id: String,
}

impl WorkerDeploymentVersion {
    /// Creates the version `(deployment_name, build_id)`.
    pub fn new(deployment_name: impl Into<String>, build_id: impl Into<String>) -> Self {
        Self {
            deployment_name: deployment_name.into(),
            build_id: build_id.into(),
        }
    }
}

/// Worker deployment settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerDeploymentOptions {
    /// Version this worker polls as; `None` for unversioned workers.
    pub version: Option<WorkerDeploymentVersion>,
    /// Whether the worker registers with the server as versioned.
    pub use_worker_versioning: bool,
    /// Behavior for workflows that do not pick one themselves.
    pub default_versioning_behavior: VersioningBehavior,
}

impl WorkerDeploymentOptions {
    /// Versioned under `(deployment_name, build_id)` when a build id is given,
    /// unversioned otherwise.
    pub fn for_build(deployment_name: &str, build_id: Option<&str>) -> Self {
        Self {
            version: build_id
                .map(|build_id| WorkerDeploymentVersion::new(deployment_name, build_id)),
            use_worker_versioning: build_id.is_some(),
            default_versioning_behavior: VersioningBehavior::Unspecified,
        }
    }
}

/// Options for one hosted worker.
#[derive(Debug, Clone)]
pub struct WorkerServiceOptions {
    /// Task queue the worker polls.
    pub task_queue: String,
    /// Connection used by this worker. When `None`, the keyed client
    /// registered for the same task queue is used instead.
    pub client_options: Option<ClientConnectOptions>,
    /// Deployment and versioning settings.
    pub deployment: WorkerDeploymentOptions,
    /// Worker-side interceptors.
    pub interceptors: Vec<SharedInterceptor>,
    /// Maximum concurrent activity executions (default: 100).
    pub max_concurrent_activities: usize,
    /// Maximum concurrent workflow tasks (default: 100).
    pub max_concurrent_workflow_tasks: usize,
    /// Worker identity reported to the server; the SDK picks one when `None`.
    pub identity: Option<String>,
}

impl Default for WorkerServiceOptions {
    fn default() -> Self {
        Self {
            task_queue: String::new(),
            client_options: None,
            deployment: WorkerDeploymentOptions::default(),
            interceptors: Vec::new(),
            max_concurrent_activities: DEFAULT_MAX_CONCURRENT_ACTIVITIES,
            max_concurrent_workflow_tasks: DEFAULT_MAX_CONCURRENT_WORKFLOW_TASKS,
            identity: None,
        }
    }
}

impl WorkerServiceOptions {
    /// The deployment version, present only for versioned workers.
    pub fn version(&self) -> Option<&WorkerDeploymentVersion> {
        self.deployment.version.as_ref()
    }

    /// The build id of the deployment version, if any.
    pub fn build_id(&self) -> Option<&str> {
        self.version().map(|version| version.build_id.as_str())
    }
}

/// Queues configure actions against a hosted worker's options.
pub struct WorkerOptionsBuilder<'a> {
    task_queue: String,
    build_id: Option<String>,
    services: &'a mut ServiceRegistry,
}

impl fmt::Debug for WorkerOptionsBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerOptionsBuilder")
            .field("task_queue", &self.task_queue)
            .field("build_id", &self.build_id)
            .finish()
    }
}

impl<'a> WorkerOptionsBuilder<'a> {
    pub(crate) fn new(
        services: &'a mut ServiceRegistry,
        task_queue: impl Into<String>,
        build_id: Option<String>,
    ) -> Self {
        Self {
            task_queue: task_queue.into(),
            build_id,
            services,
        }
    }

    /// The task queue whose worker options this builder configures.
    pub fn task_queue(&self) -> &str {
        &self.task_queue
    }

    /// The build id given at registration, if any.
    pub fn build_id(&self) -> Option<&str> {
        self.build_id.as_deref()
    }

    /// The registry this builder queues actions on.
    pub fn services(&mut self) -> &mut ServiceRegistry {
        self.services
    }

    /// Queues an action against the worker options.
    pub fn configure<F>(&mut self, action: F) -> &mut Self
    where
        F: Fn(&mut WorkerServiceOptions) + Send + Sync + 'static,
    {
        self.services
            .add_options::<WorkerServiceOptions>(self.task_queue.clone())
            .configure(action);
        self
    }

    /// Like [`Self::configure`]; with `disallow_duplicates` set, fails if a
    /// guarded configuration already exists for this task queue.
    pub fn configure_options<F>(
        &mut self,
        action: F,
        disallow_duplicates: bool,
    ) -> Result<&mut Self>
    where
        F: Fn(&mut WorkerServiceOptions) + Send + Sync + 'static,
    {
        if disallow_duplicates && !self.services.guard(self.task_queue.clone()) {
            return Err(HostingError::DuplicateRegistration {
                task_queue: self.task_queue.clone(),
            });
        }
        Ok(self.configure(action))
    }
}

/// A worker ready to be started by the host: resolved options plus the client
/// it polls through.
#[derive(Debug, Clone)]
pub struct HostedWorker {
    options: WorkerServiceOptions,
    client: Arc<LazyClient>,
}

impl HostedWorker {
    /// Materializes the hosted worker declared for `task_queue`.
    ///
    /// Embedded client options produce a dedicated [`LazyClient`]; without
    /// them the keyed client registered under the same name is shared.
    pub fn resolve(provider: &ServiceProvider, task_queue: &str) -> Result<Self> {
        if !provider.is_hosted(task_queue) {
            return Err(HostingError::UnknownWorker(task_queue.to_owned()));
        }

        let options = provider.options::<WorkerServiceOptions>(task_queue);
        let client = match &options.client_options {
            Some(client_options) => Arc::new(LazyClient::new(client_options.clone())),
            None => provider.keyed_service::<LazyClient>(task_queue)?,
        };

        tracing::debug!(
            task_queue,
            build_id = ?options.build_id(),
            versioned = options.deployment.use_worker_versioning,
            "resolved hosted worker"
        );
        Ok(Self { options, client })
    }

    /// Materializes every hosted worker in registration order.
    pub fn resolve_all(provider: &ServiceProvider) -> Result<Vec<Self>> {
        provider
            .hosted()
            .map(|task_queue| Self::resolve(provider, task_queue))
            .collect()
    }

    /// The task queue this worker polls.
    pub fn task_queue(&self) -> &str {
        &self.options.task_queue
    }

    /// The materialized worker options.
    pub fn options(&self) -> &WorkerServiceOptions {
        &self.options
    }

    /// The client the worker polls through.
    pub fn client(&self) -> &Arc<LazyClient> {
        &self.client
    }
}
