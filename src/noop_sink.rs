use crate::sink::QueueTransport;
use async_trait::async_trait;
use std::error::Error;

/// A queue transport that accepts and discards every payload.
///
/// Useful for measuring the overhead of formatting and shipping without
/// any external I/O, and for unit tests that don't care about delivery.
#[derive(Clone, Default)]
pub struct NoopQueue;

#[async_trait]
impl QueueTransport for NoopQueue {
    async fn send(&self, _body: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
