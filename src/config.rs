use std::time::Duration;

use crate::errors::BridgeError;

pub const DEFAULT_ENDPOINT: &str = "127.0.0.1:65432";
pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_TERMINATION_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 16 * 1024 * 1024;
pub const DEFAULT_MAX_NEW_TOKENS: u32 = 500;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Everything a bridge call needs to know about the serving process.
///
/// Nothing here is read from the environment; callers build it explicitly.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub endpoint: String,

    /// Total dial attempts, not retries after the first.
    pub max_retries: u32,

    pub retry_interval: Duration,

    pub connect_timeout: Option<Duration>,

    /// Bound on every single frame read or write.
    pub io_timeout: Option<Duration>,

    /// How long to wait for the serving process to acknowledge termination.
    pub termination_timeout: Duration,

    /// Bound on the whole call, dial included.
    pub call_deadline: Option<Duration>,

    pub max_frame_length: usize,

    pub max_new_tokens: u32,

    pub temperature: f32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            connect_timeout: None,
            io_timeout: None,
            termination_timeout: DEFAULT_TERMINATION_TIMEOUT,
            call_deadline: None,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl BridgeConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = Some(timeout);
        self
    }

    pub fn with_termination_timeout(mut self, timeout: Duration) -> Self {
        self.termination_timeout = timeout;
        self
    }

    pub fn with_call_deadline(mut self, deadline: Duration) -> Self {
        self.call_deadline = Some(deadline);
        self
    }

    pub fn with_max_frame_length(mut self, length: usize) -> Self {
        self.max_frame_length = length;
        self
    }

    pub fn with_max_new_tokens(mut self, tokens: u32) -> Self {
        self.max_new_tokens = tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.endpoint.trim().is_empty() {
            return Err(BridgeError::Config("endpoint must not be empty".into()));
        }
        if self.max_retries == 0 {
            return Err(BridgeError::Config(
                "max_retries must allow at least one dial attempt".into(),
            ));
        }
        if self.max_frame_length == 0 {
            return Err(BridgeError::Config("max_frame_length must be positive".into()));
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(BridgeError::Config(format!(
                "temperature must be a non-negative number, got {}",
                self.temperature
            )));
        }
        Ok(())
    }
}
