use async_trait::async_trait;
use std::error::Error;

/// Fire-and-forget destination for formatted record text.
///
/// `deliver` must return without waiting for network completion; whether
/// the text ultimately reaches the queue is deliberately invisible to
/// the caller. Implemented by [`Shipper`](crate::shipper::Shipper); test
/// code can substitute a recording implementation.
pub trait TextSink: Send + Sync {
    /// Hand one serialized record to the sink. Never blocks, never fails
    /// from the caller's point of view.
    fn deliver(&self, text: String);
}

/// Asynchronous send primitive exposed by the external queue service.
///
/// Implementations transport one opaque UTF-8 text payload and report
/// whether this individual attempt was accepted. They are called only
/// from the shipper's background task, never on application threads.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Send a single message body to the queue.
    ///
    /// **Returns**
    /// - `Ok(())` if the queue accepted the payload.
    /// - `Err(..)` on any transport failure (network error, auth expiry,
    ///   queue unavailable, rejected payload). The shipper treats every
    ///   such error as the loss of that one payload and nothing more.
    async fn send(&self, body: &str) -> Result<(), Box<dyn Error + Send + Sync>>;
}
