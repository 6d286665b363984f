//! Environment variable names used by this crate for convenient
//! configuration of the queue connection from services.
//!
//! These are purely helpers; the core types remain decoupled from
//! environment access.

use crate::http_queue::QueueConfig;

/// Base URL of the queue service, e.g. `https://queue.internal:9324`.
pub const QUEUE_LOG_ENDPOINT_ENV: &str = "QUEUE_LOG_ENDPOINT";

/// Name of the queue that receives the serialized records.
pub const QUEUE_LOG_QUEUE_NAME_ENV: &str = "QUEUE_LOG_QUEUE_NAME";

/// Optional access key for the queue service.
pub const QUEUE_LOG_ACCESS_KEY_ENV: &str = "QUEUE_LOG_ACCESS_KEY";

/// Optional secret key for the queue service.
pub const QUEUE_LOG_SECRET_KEY_ENV: &str = "QUEUE_LOG_SECRET_KEY";

/// Optional cluster/environment label stamped on every record.
pub const QUEUE_LOG_CLUSTER_ENV: &str = "QUEUE_LOG_CLUSTER";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Build a [`QueueConfig`] from the environment, if the two required
/// variables (endpoint and queue name) are set.
pub fn queue_config_from_env() -> Option<QueueConfig> {
    let endpoint = std::env::var(QUEUE_LOG_ENDPOINT_ENV).ok()?;
    let queue_name = std::env::var(QUEUE_LOG_QUEUE_NAME_ENV).ok()?;
    Some(QueueConfig {
        endpoint,
        queue_name,
        access_key: std::env::var(QUEUE_LOG_ACCESS_KEY_ENV).ok(),
        secret_key: std::env::var(QUEUE_LOG_SECRET_KEY_ENV).ok(),
    })
}
