use crate::format::{Formatter, DEFAULT_MAX_MESSAGE_SIZE};
use crate::http_queue::{HttpQueue, QueueConfig};
use crate::identity::ProcessIdentity;
use crate::layer::QueueLogLayer;
use crate::shipper::Shipper;
use crate::sink::TextSink;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Setup-time configuration for the whole logging sink.
///
/// **Fields**
/// - `queue`: connection settings for the remote queue.
/// - `cluster_name`: optional cluster/environment label stamped on every
///   record built in this process.
/// - `max_message_size`: limit on the serialized size of one record;
///   values below the hard floor put the formatter into a standing
///   configuration fault.
/// - `channel_buffer`: how many formatted bodies may wait for
///   transmission before new ones are dropped.
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt` layer is
///   installed alongside the queue layer so events also reach the
///   console.
#[derive(Clone, Debug)]
pub struct LogSinkConfig {
    pub queue: QueueConfig,
    pub cluster_name: Option<String>,
    pub max_message_size: usize,
    pub channel_buffer: usize,
    pub enable_stdout: bool,
}

impl LogSinkConfig {
    pub fn new(queue: QueueConfig) -> Self {
        Self {
            queue,
            cluster_name: None,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            channel_buffer: 1024,
            enable_stdout: true,
        }
    }
}

/// Connect to the queue and install the global `tracing` subscriber.
///
/// **Behavior**
///
/// Builds the process identity (applying `cluster_name` if given), the
/// formatter and the shipper, then installs a [`Registry`] with the
/// [`QueueLogLayer`] as the global default subscriber. A failed queue
/// connection does not fail this call: it is reported once on stderr and
/// the shipper comes up permanently disabled, so the process logs to the
/// console (if enabled) but ships nothing.
pub async fn init_tracing_with_config(config: LogSinkConfig) {
    let identity = Arc::new(ProcessIdentity::new());
    if let Some(cluster) = &config.cluster_name {
        identity.set_cluster_name(cluster);
    }
    let formatter = Formatter::new(identity, config.max_message_size);

    let shipper = match HttpQueue::connect(config.queue.clone()).await {
        Ok(queue) => Shipper::start(Arc::new(queue), config.channel_buffer).0,
        Err(e) => Shipper::failed_init(&e),
    };

    let layer = QueueLogLayer::new(formatter, Arc::new(shipper) as Arc<dyn TextSink>);

    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber).expect("set global subscriber");
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber).expect("set global subscriber");
    }
}

/// Initialize tracing with sensible defaults.
///
/// Equivalent to calling [`init_tracing_with_config`] with
/// [`LogSinkConfig::new`]. This is the recommended entrypoint for
/// typical services.
pub async fn init_tracing(queue: QueueConfig) {
    init_tracing_with_config(LogSinkConfig::new(queue)).await
}
