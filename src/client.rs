//! Client connection options and the lazily connected client handle.

use std::{
    any::{Any, type_name},
    fmt,
    sync::Arc,
};

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::{
    converter::DataConverter,
    defaults::DEFAULT_NAMESPACE,
    error::{HostingError, Result},
    interceptor::{SharedInterceptor, TracingInterceptor},
};

/// Options used to connect a Temporal client.
#[derive(Debug, Clone)]
pub struct ClientConnectOptions {
    /// Frontend address as `host:port`. Required before connecting.
    pub target_host: Option<String>,
    /// Namespace the client operates in (default: `default`).
    pub namespace: String,
    /// Identity reported to the server. The SDK picks one when `None`.
    pub identity: Option<String>,
    /// Payload and failure converters.
    pub data_converter: DataConverter,
    /// Client-side interceptors, in installation order.
    pub interceptors: Vec<SharedInterceptor>,
    /// Dispatcher client log events are routed through, if any.
    pub logger: Option<tracing::Dispatch>,
}

impl Default for ClientConnectOptions {
    fn default() -> Self {
        Self {
            target_host: None,
            namespace: DEFAULT_NAMESPACE.to_owned(),
            identity: None,
            data_converter: DataConverter::default(),
            interceptors: Vec::new(),
            logger: None,
        }
    }
}

impl ClientConnectOptions {
    /// Creates options targeting `target_host` in the default namespace.
    pub fn new(target_host: impl Into<String>) -> Self {
        Self {
            target_host: Some(target_host.into()),
            ..Self::default()
        }
    }

    /// Sets the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the client identity.
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Sets the data converter.
    pub fn with_data_converter(mut self, data_converter: DataConverter) -> Self {
        self.data_converter = data_converter;
        self
    }

    /// Appends an interceptor.
    pub fn with_interceptor(mut self, interceptor: SharedInterceptor) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Resets the codec to [`DataConverter::default`] and the interceptor list
    /// to a single [`TracingInterceptor`]. Earlier values are discarded.
    pub fn apply_hosting_defaults(&mut self) {
        self.data_converter = DataConverter::default();
        self.interceptors = vec![TracingInterceptor::shared()];
    }
}

/// Establishes a connection from resolved client options.
///
/// Implemented by the host on top of the Temporal SDK client.
#[async_trait]
pub trait Connector: Send + Sync {
    /// The connected client type.
    type Client: Send + Sync + 'static;

    /// Connects using `options`.
    async fn connect(&self, options: &ClientConnectOptions) -> anyhow::Result<Self::Client>;
}

/// Client handle that connects on first use.
///
/// Creating a `LazyClient` never touches the network; the first call to
/// [`LazyClient::connect`] establishes the connection and every later call
/// reuses it.
pub struct LazyClient {
    options: ClientConnectOptions,
    connection: OnceCell<Arc<dyn Any + Send + Sync>>,
}

impl fmt::Debug for LazyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyClient")
            .field("target_host", &self.options.target_host)
            .field("namespace", &self.options.namespace)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl LazyClient {
    /// Wraps `options` without connecting.
    pub fn new(options: ClientConnectOptions) -> Self {
        Self {
            options,
            connection: OnceCell::new(),
        }
    }

    /// The options the connection is made with.
    pub fn options(&self) -> &ClientConnectOptions {
        &self.options
    }

    /// Whether a connection has been established.
    pub fn is_connected(&self) -> bool {
        self.connection.initialized()
    }

    /// Returns the connected client, connecting through `connector` if this is
    /// the first call.
    pub async fn connect<C: Connector>(&self, connector: &C) -> Result<Arc<C::Client>> {
        let target_host = self
            .options
            .target_host
            .clone()
            .ok_or_else(|| HostingError::invalid_argument("target_host", "not configured"))?;

        let connection = self
            .connection
            .get_or_try_init(|| async {
                self.log_connect(&target_host);
                let client = connector
                    .connect(&self.options)
                    .await
                    .map_err(|source| HostingError::Connect {
                        target_host: target_host.clone(),
                        source,
                    })?;
                Ok::<_, HostingError>(Arc::new(client) as Arc<dyn Any + Send + Sync>)
            })
            .await?;

        Arc::clone(connection)
            .downcast::<C::Client>()
            .map_err(|_| HostingError::ServiceTypeMismatch {
                expected: type_name::<C::Client>(),
                key: target_host,
            })
    }

    fn log_connect(&self, target_host: &str) {
        let log = || {
            tracing::info!(
                target_host,
                namespace = %self.options.namespace,
                "connecting Temporal client"
            );
        };
        match &self.options.logger {
            Some(logger) => tracing::dispatcher::with_default(logger, log),
            None => log(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::bail;

    use super::*;

    #[derive(Debug, PartialEq)]
    struct FakeClient {
        target_host: String,
        namespace: String,
    }

    #[derive(Default)]
    struct FakeConnector {
        attempts: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Connector for FakeConnector {
        type Client = FakeClient;

        async fn connect(&self, options: &ClientConnectOptions) -> anyhow::Result<FakeClient> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                bail!("connection refused");
            }
            Ok(FakeClient {
                target_host: options.target_host.clone().unwrap_or_default(),
                namespace: options.namespace.clone(),
            })
        }
    }

    struct OtherConnector;

    #[async_trait]
    impl Connector for OtherConnector {
        type Client = String;

        async fn connect(&self, _: &ClientConnectOptions) -> anyhow::Result<String> {
            Ok("other".into())
        }
    }

    #[test]
    fn defaults_reset_codec_and_interceptors() {
        let mut options = ClientConnectOptions::new("temporal:7233")
            .with_interceptor(TracingInterceptor::shared())
            .with_interceptor(TracingInterceptor::shared());
        options.apply_hosting_defaults();

        assert!(options.data_converter.is_default());
        assert_eq!(options.interceptors.len(), 1);
        assert_eq!(options.interceptors[0].name(), TracingInterceptor::NAME);
        assert_eq!(options.namespace, DEFAULT_NAMESPACE);
    }

    #[tokio::test]
    async fn connects_once_and_reuses_the_connection() {
        let connector = FakeConnector::default();
        let client =
            LazyClient::new(ClientConnectOptions::new("temporal:7233").with_namespace("prod"));
        assert!(!client.is_connected());

        let first = client.connect(&connector).await.unwrap();
        let second = client.connect(&connector).await.unwrap();

        assert!(client.is_connected());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(
            *first,
            FakeClient {
                target_host: "temporal:7233".into(),
                namespace: "prod".into(),
            }
        );
    }

    #[tokio::test]
    async fn connect_failures_are_wrapped_and_not_cached() {
        let connector = FakeConnector {
            fail: true,
            ..FakeConnector::default()
        };
        let client = LazyClient::new(ClientConnectOptions::new("temporal:7233"));

        let err = client.connect(&connector).await.unwrap_err();
        assert!(matches!(
            err,
            HostingError::Connect { ref target_host, .. } if target_host == "temporal:7233"
        ));
        assert!(client.connect(&connector).await.is_err());
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 2);
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn missing_target_host_is_rejected_before_connecting() {
        let connector = FakeConnector::default();
        let client = LazyClient::new(ClientConnectOptions::default());

        let err = client.connect(&connector).await.unwrap_err();
        assert!(matches!(
            err,
            HostingError::InvalidArgument {
                argument: "target_host",
                ..
            }
        ));
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reconnecting_with_another_client_type_fails() {
        let client = LazyClient::new(ClientConnectOptions::new("temporal:7233"));
        client.connect(&FakeConnector::default()).await.unwrap();

        let err = client.connect(&OtherConnector).await.unwrap_err();
        assert!(matches!(err, HostingError::ServiceTypeMismatch { .. }));
    }
}
