//! Delivery component sitting at the end of the logging path.
//!
//! The shipper is the terminal sink of the path that produces log
//! records, which forces an unusual error-handling contract: a delivery
//! failure must never be reported back through logging. Logging "failed
//! to ship a log message" would create a new record that itself needs
//! shipping, and under a sustained queue outage that loop amplifies
//! itself without bound. Every per-message failure after a successful
//! initialization is therefore swallowed: not logged, not retried, not
//! counted. That one message is lost and the system moves on.
//!
//! Initialization is different: it happens once, before any event flows,
//! so its failure is safe to report loudly. It is reported exactly once,
//! after which the shipper is permanently disabled and rejects every
//! delivery without attempting I/O.

use std::error::Error;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::sink::{QueueTransport, TextSink};

enum State {
    /// Transport is up; deliveries are forwarded to the background task.
    Ready { sender: mpsc::Sender<String> },
    /// Initialization failed; terminal. Deliveries are rejected silently.
    FailedInit,
}

/// Accepts formatted record text and forwards it, fire-and-forget, to an
/// external queue via a [`QueueTransport`].
///
/// Internally a bounded channel decouples callers from the network: a
/// background task pulls bodies off the channel and sends them one at a
/// time. [`deliver`](TextSink::deliver) only performs a non-blocking
/// enqueue; if the channel is full the body is dropped, which is the
/// only backpressure behavior this component has.
pub struct Shipper {
    state: State,
}

impl Shipper {
    /// Start a ready shipper backed by `queue`, spawning the background
    /// delivery task on the current Tokio runtime.
    ///
    /// `channel_buffer` bounds how many formatted bodies may be waiting
    /// for transmission; a minimal threshold is enforced to avoid
    /// degenerate configurations. The returned handle runs until the
    /// shipper (and every clone of its sender) is dropped.
    pub fn start(queue: Arc<dyn QueueTransport>, channel_buffer: usize) -> (Self, JoinHandle<()>) {
        let channel_buffer = channel_buffer.max(16);
        let (sender, mut receiver) = mpsc::channel::<String>(channel_buffer);

        let handle = tokio::spawn(async move {
            while let Some(body) = receiver.recv().await {
                // Swallowed on purpose. Reporting this failure through the
                // logging path would generate another record to deliver,
                // re-creating the failure while the queue is down.
                let _ = queue.send(&body).await;
            }
        });

        (
            Self {
                state: State::Ready { sender },
            },
            handle,
        )
    }

    /// Construct a permanently disabled shipper after a failed
    /// initialization.
    ///
    /// The failure is reported here, exactly once, outside the logging
    /// path; every subsequent delivery is rejected without I/O and
    /// without further noise.
    pub fn failed_init(error: &(dyn Error + 'static)) -> Self {
        eprintln!("log shipper initialization failed, delivery permanently disabled: {error}");
        Self {
            state: State::FailedInit,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready { .. })
    }
}

impl TextSink for Shipper {
    fn deliver(&self, text: String) {
        match &self.state {
            State::Ready { sender } => {
                // A full channel is a silent drop, never a wait.
                let _ = sender.try_send(text);
            }
            State::FailedInit => {}
        }
    }
}
