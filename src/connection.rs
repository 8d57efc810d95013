use std::future::Future;
use std::io;
use std::time::Duration;

use log::{info, warn};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

use crate::{config::BridgeConfig, errors::BridgeError};

// Dials the serving process with a fixed number of attempts and a fixed pause
// between them. No backoff growth, no jitter.
#[derive(Debug, Clone)]
pub struct Connector {
    endpoint: String,
    max_retries: u32,
    retry_interval: Duration,
    connect_timeout: Option<Duration>,
}

impl Connector {
    pub fn new(endpoint: impl Into<String>, max_retries: u32, retry_interval: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            max_retries,
            retry_interval,
            connect_timeout: None,
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            max_retries: config.max_retries,
            retry_interval: config.retry_interval,
            connect_timeout: config.connect_timeout,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Opens a TCP connection, retrying up to `max_retries` attempts in total.
    pub async fn connect(&self) -> Result<TcpStream, BridgeError> {
        self.connect_with(|| TcpStream::connect(self.endpoint.as_str()))
            .await
    }

    pub(crate) async fn connect_with<F, Fut, S>(&self, mut dial: F) -> Result<S, BridgeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = io::Result<S>>,
    {
        if self.max_retries == 0 {
            return Err(BridgeError::Config(
                "max_retries must allow at least one dial attempt".into(),
            ));
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.bounded_dial(dial()).await {
                Ok(stream) => {
                    info!(
                        "Connected to {} on attempt {}/{}",
                        self.endpoint, attempt, self.max_retries
                    );
                    return Ok(stream);
                }
                Err(e) => {
                    warn!(
                        "Connection attempt {}/{} to {} failed: {}",
                        attempt, self.max_retries, self.endpoint, e
                    );
                    if attempt >= self.max_retries {
                        return Err(BridgeError::Connection {
                            endpoint: self.endpoint.clone(),
                            attempts: attempt,
                            source: e,
                        });
                    }
                    sleep(self.retry_interval).await;
                }
            }
        }
    }

    // An attempt that outlives `connect_timeout` counts as a failed dial.
    async fn bounded_dial<Fut, S>(&self, dial: Fut) -> io::Result<S>
    where
        Fut: Future<Output = io::Result<S>>,
    {
        match self.connect_timeout {
            Some(limit) => timeout(limit, dial).await.map_err(|_| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("dial timed out after {:?}", limit),
                )
            })?,
            None => dial.await,
        }
    }
}
