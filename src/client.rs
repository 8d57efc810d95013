use async_trait::async_trait;
use log::{debug, warn};
use tokio::time::{timeout, Instant};

use crate::{
    config::BridgeConfig, errors::BridgeError, request::InferenceRequest, session::Session,
};

/// Anything that turns a prompt into generated text.
///
/// [`InferenceBridge`] is the local serving-process implementation; hosted
/// providers or test doubles can stand in for it.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, BridgeError>;
}

/// Entry point for generation against the local serving process.
///
/// Holds no connection. Every call dials, greets, exchanges one request,
/// terminates and hangs up, so clones can be used from concurrent tasks.
#[derive(Debug, Clone)]
pub struct InferenceBridge {
    config: BridgeConfig,
}

impl InferenceBridge {
    pub fn new(config: BridgeConfig) -> Result<Self, BridgeError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, BridgeError> {
        let request = InferenceRequest::from_prompt(
            prompt,
            self.config.max_new_tokens,
            self.config.temperature,
        );
        self.generate_request(&request).await
    }

    /// Runs one full session for a caller-built request.
    ///
    /// `call_deadline` covers dialing, the welcome and the exchange. Once the
    /// text is obtained it is returned; termination only gets whatever time
    /// is left on the deadline, and running out of it drops the socket.
    pub async fn generate_request(&self, request: &InferenceRequest) -> Result<String, BridgeError> {
        let started = Instant::now();
        let (session, text) = match self.config.call_deadline {
            Some(deadline) => timeout(deadline, self.open_and_exchange(request))
                .await
                .map_err(|_| {
                    warn!("Call to {} exceeded its {:?} deadline", self.config.endpoint, deadline);
                    BridgeError::Timeout(deadline)
                })??,
            None => self.open_and_exchange(request).await?,
        };

        match self.config.call_deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_sub(started.elapsed());
                if timeout(remaining, session.terminate()).await.is_err() {
                    debug!("Call deadline reached during termination, dropping the connection");
                }
            }
            None => {
                session.terminate().await;
            }
        }
        Ok(text)
    }

    async fn open_and_exchange(
        &self,
        request: &InferenceRequest,
    ) -> Result<(Session, String), BridgeError> {
        let mut session = Session::open(&self.config).await?;

        match session.exchange(request).await {
            Ok(text) => Ok((session, text)),
            Err(e) => {
                debug!("Generation exchange failed: {}", e);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl TextGenerator for InferenceBridge {
    async fn generate(&self, prompt: &str) -> Result<String, BridgeError> {
        InferenceBridge::generate(self, prompt).await
    }
}
