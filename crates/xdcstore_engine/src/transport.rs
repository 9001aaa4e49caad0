//! Outbound host channel abstraction.

use crate::error::{EngineError, EngineResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use xdcstore_protocol::HostRequest;

/// Sends requests to the host.
///
/// This trait abstracts the delivery mechanism, allowing for different
/// implementations (a webxdc status-update bridge, a recorder for tests,
/// stdout for the CLI, etc.). Responses arrive asynchronously through
/// [`crate::CatalogClient::handle`].
#[async_trait]
pub trait HostChannel: Send + Sync {
    /// Delivers a request to the host.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Channel`] if the request could not be sent.
    async fn send(&self, request: &HostRequest) -> EngineResult<()>;
}

#[async_trait]
impl<T: HostChannel + ?Sized> HostChannel for Arc<T> {
    async fn send(&self, request: &HostRequest) -> EngineResult<()> {
        (**self).send(request).await
    }
}

/// A mock channel for testing. Records every request it accepts.
#[derive(Debug)]
pub struct MockChannel {
    connected: AtomicBool,
    sent: Mutex<Vec<HostRequest>>,
}

impl MockChannel {
    /// Creates a connected mock channel.
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Sets the connected state. A disconnected channel rejects sends.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Returns true if the channel accepts sends.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Returns a copy of every request sent so far.
    pub fn sent(&self) -> Vec<HostRequest> {
        self.sent.lock().clone()
    }

    /// Removes and returns every request sent so far.
    pub fn take(&self) -> Vec<HostRequest> {
        std::mem::take(&mut *self.sent.lock())
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HostChannel for MockChannel {
    async fn send(&self, request: &HostRequest) -> EngineResult<()> {
        if !self.is_connected() {
            return Err(EngineError::channel_retryable("mock channel disconnected"));
        }
        self.sent.lock().push(request.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_channel_records_requests() {
        let channel = MockChannel::new();
        channel
            .send(&HostRequest::Download {
                app_id: "poll".into(),
            })
            .await
            .unwrap();
        channel.send(&HostRequest::UpgradeClient).await.unwrap();

        assert_eq!(channel.sent().len(), 2);
        assert_eq!(channel.take().len(), 2);
        assert!(channel.sent().is_empty());
    }

    #[tokio::test]
    async fn mock_channel_not_connected_error() {
        let channel = MockChannel::new();
        channel.set_connected(false);

        let result = channel.send(&HostRequest::UpgradeClient).await;
        assert!(matches!(result, Err(EngineError::Channel { retryable: true, .. })));
        assert!(channel.sent().is_empty());
    }
}
