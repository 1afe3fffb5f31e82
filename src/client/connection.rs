//! Shared gRPC channel to the Temporal frontend.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, info};

use crate::config::EndpointConfig;
use crate::error::{ConnectionError, Result};

/// Owned handle to the remote channel.
///
/// Established once during provider configuration and cloned into every
/// client. Clones share the same channel; [`Connection::shutdown`] closes it
/// for all of them.
#[derive(Debug, Clone)]
pub struct Connection {
    endpoint: String,
    request_timeout: Duration,
    channel: Arc<RwLock<Option<Channel>>>,
}

impl Connection {
    /// Dials the frontend and waits for the channel to come up.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is malformed or unreachable.
    pub async fn establish(config: &EndpointConfig) -> Result<Self> {
        let endpoint = config.uri();
        info!(endpoint = %endpoint, "Connecting to Temporal frontend");

        let channel = Endpoint::from_shared(endpoint.clone())
            .map_err(|e| ConnectionError::InvalidEndpoint {
                endpoint: endpoint.clone(),
                message: e.to_string(),
            })?
            .connect_timeout(config.connect_timeout)
            .keep_alive_while_idle(true)
            .http2_keep_alive_interval(Duration::from_secs(30))
            .connect()
            .await
            .map_err(|e| ConnectionError::Unreachable {
                endpoint: endpoint.clone(),
                message: e.to_string(),
            })?;

        debug!(endpoint = %endpoint, "Temporal channel established");

        Ok(Self {
            endpoint,
            request_timeout: config.request_timeout,
            channel: Arc::new(RwLock::new(Some(channel))),
        })
    }

    /// Creates a handle with no channel behind it.
    ///
    /// Every call made through it fails with
    /// [`ConnectionError::NotEstablished`].
    #[must_use]
    pub fn disconnected(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            request_timeout: Duration::from_secs(30),
            channel: Arc::new(RwLock::new(None)),
        }
    }

    /// Endpoint URI this connection was made to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Timeout applied to each request.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns a clone of the live channel.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::NotEstablished`] if the channel was never
    /// established or has been shut down.
    pub async fn channel(&self) -> Result<Channel> {
        self.channel
            .read()
            .await
            .clone()
            .ok_or_else(|| ConnectionError::NotEstablished.into())
    }

    /// Returns true while the channel is open.
    pub async fn is_established(&self) -> bool {
        self.channel.read().await.is_some()
    }

    /// Closes the channel for every clone of this handle.
    pub async fn shutdown(&self) {
        if self.channel.write().await.take().is_some() {
            info!(endpoint = %self.endpoint, "Temporal connection closed");
        }
    }

    /// Runs `f` with a clone of this handle, then shuts the connection down
    /// whatever `f` returned.
    pub async fn scoped<T, F, Fut>(self, f: F) -> T
    where
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = T>,
    {
        let output = f(self.clone()).await;
        self.shutdown().await;
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ProviderError};

    #[tokio::test]
    async fn test_disconnected_handle_rejects_calls() {
        let connection = Connection::disconnected("http://localhost:7233");

        assert!(!connection.is_established().await);
        let err = connection.channel().await.expect_err("no channel");
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert!(matches!(
            err,
            ProviderError::Connection(ConnectionError::NotEstablished)
        ));
    }

    #[tokio::test]
    async fn test_shutdown_is_shared_and_idempotent() {
        let connection = Connection::disconnected("http://localhost:7233");
        let clone = connection.clone();

        connection.shutdown().await;
        clone.shutdown().await;

        assert!(!clone.is_established().await);
        assert_eq!(clone.endpoint(), "http://localhost:7233");
    }

    #[tokio::test]
    async fn test_invalid_endpoint_is_reported() {
        let config = EndpointConfig {
            host: String::from("bad host"),
            port: 7233,
            connect_timeout: Duration::from_millis(50),
            request_timeout: Duration::from_millis(50),
        };

        let err = Connection::establish(&config).await.expect_err("invalid");
        assert_eq!(err.kind(), ErrorKind::Connection);
    }

    #[tokio::test]
    async fn test_scoped_shuts_down_on_error() {
        let channel = Endpoint::from_static("http://localhost:7233").connect_lazy();
        let connection = Connection {
            endpoint: String::from("http://localhost:7233"),
            request_timeout: Duration::from_secs(1),
            channel: Arc::new(RwLock::new(Some(channel))),
        };
        let observer = connection.clone();

        let result: Result<()> = connection
            .scoped(|inner| async move {
                assert!(inner.is_established().await);
                Err(ProviderError::internal("state file unreadable"))
            })
            .await;

        assert_eq!(result.expect_err("failed").kind(), ErrorKind::Internal);
        assert!(!observer.is_established().await);
    }
}
