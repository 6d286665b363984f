use crate::sink::QueueTransport;
use async_trait::async_trait;
use reqwest::Client;
use std::error::Error;

/// Connection settings for [`HttpQueue`].
///
/// Credentials are optional; when either half is missing the requests
/// are sent unauthenticated and the queue service's ambient/default
/// authentication applies.
#[derive(Clone, Debug)]
pub struct QueueConfig {
    /// Base URL of the queue service, e.g. "https://queue.internal:9324".
    pub endpoint: String,
    /// Name of the queue that receives the serialized records.
    pub queue_name: String,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

/// Error produced while looking up the queue at setup.
#[derive(thiserror::Error, Debug)]
pub enum QueueInitError {
    #[error("queue lookup request failed: {0}")]
    Lookup(#[from] reqwest::Error),

    #[error("queue {queue_name:?} lookup returned status {status}")]
    QueueNotFound {
        queue_name: String,
        status: reqwest::StatusCode,
    },

    #[error("queue {queue_name:?} lookup returned an empty queue URL")]
    EmptyQueueUrl { queue_name: String },
}

/// Queue transport speaking the service's HTTP interface.
///
/// The queue is addressed by name: `connect` resolves the name to the
/// queue's canonical send URL once, at setup, and `send` POSTs each
/// message body to that URL as an opaque UTF-8 payload.
#[derive(Clone)]
pub struct HttpQueue {
    client: Client,
    send_url: String,
    config: QueueConfig,
}

impl HttpQueue {
    /// Resolve the configured queue name to its send URL.
    ///
    /// **Returns**
    /// - A ready-to-use [`HttpQueue`] on success.
    /// - [`QueueInitError`] if the lookup request fails, the queue does
    ///   not exist, or the service returns no URL. Callers are expected
    ///   to turn this into a permanently disabled shipper.
    pub async fn connect(config: QueueConfig) -> Result<Self, QueueInitError> {
        let client = Client::new();

        let request = with_auth(client.get(lookup_url(&config)), &config);
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(QueueInitError::QueueNotFound {
                queue_name: config.queue_name.clone(),
                status: response.status(),
            });
        }

        // The lookup body is the queue's canonical send URL.
        let send_url = response.text().await?.trim().to_string();
        if send_url.is_empty() {
            return Err(QueueInitError::EmptyQueueUrl {
                queue_name: config.queue_name.clone(),
            });
        }

        Ok(Self {
            client,
            send_url,
            config,
        })
    }

    pub fn send_url(&self) -> &str {
        &self.send_url
    }
}

fn lookup_url(config: &QueueConfig) -> String {
    format!(
        "{}/queues/{}",
        config.endpoint.trim_end_matches('/'),
        urlencoding::encode(&config.queue_name)
    )
}

fn with_auth(request: reqwest::RequestBuilder, config: &QueueConfig) -> reqwest::RequestBuilder {
    match (&config.access_key, &config.secret_key) {
        (Some(access), Some(secret)) => request.basic_auth(access, Some(secret)),
        _ => request,
    }
}

#[async_trait]
impl QueueTransport for HttpQueue {
    async fn send(&self, body: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        let request = with_auth(self.client.post(&self.send_url), &self.config);
        let response = request.body(body.to_string()).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("queue send failed with status {}", response.status()).into())
        }
    }
}
