//! One connection's lifecycle against the serving process.
//!
//! ```text
//! Connecting -> AwaitingWelcome -> Ready -> Exchanging -> Ready -> Terminating -> Closed
//! ```
//!
//! Any failure before the exchange completes goes straight to `Closed`. The
//! socket is released when the session is terminated or dropped.

use std::future::Future;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;

use crate::{
    codec::{read_frame, write_frame, FrameCodec},
    config::BridgeConfig,
    connection::Connector,
    errors::BridgeError,
    request::InferenceRequest,
    response::InferenceResponse,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    AwaitingWelcome,
    Ready,
    Exchanging,
    Terminating,
    Closed,
}

/// How the closing handshake went. Never an error for the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationOutcome {
    /// The serving process answered the termination frame.
    Acknowledged,
    /// The serving process hung up without answering.
    PeerClosed,
    Failed(String),
}

pub struct Session<T = TcpStream> {
    framed: Framed<T, FrameCodec>,
    state: SessionState,
    welcome: String,
    io_timeout: Option<Duration>,
    termination_timeout: Duration,
}

impl<T> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("welcome", &self.welcome)
            .finish_non_exhaustive()
    }
}

impl Session<TcpStream> {
    /// Dials the configured endpoint and completes the welcome handshake.
    pub async fn open(config: &BridgeConfig) -> Result<Self, BridgeError> {
        debug!("Session {:?} {}", SessionState::Connecting, config.endpoint);
        let stream = Connector::from_config(config).connect().await?;
        Self::handshake(stream, config).await
    }
}

impl<T> Session<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Waits for the welcome frame on an already-open stream.
    pub async fn handshake(stream: T, config: &BridgeConfig) -> Result<Self, BridgeError> {
        let mut session = Self {
            framed: Framed::new(stream, FrameCodec::new(config.max_frame_length)),
            state: SessionState::AwaitingWelcome,
            welcome: String::new(),
            io_timeout: config.io_timeout,
            termination_timeout: config.termination_timeout,
        };

        let greeting = match bounded(session.io_timeout, read_frame(&mut session.framed)).await {
            Ok(greeting) => greeting,
            Err(e) => {
                session.transition(SessionState::Closed);
                return Err(BridgeError::Protocol(format!("peer did not greet: {e}")));
            }
        };

        session.welcome = String::from_utf8_lossy(&greeting).into_owned();
        info!("Serving process says: {}", session.welcome);
        session.transition(SessionState::Ready);
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn welcome(&self) -> &str {
        &self.welcome
    }

    /// Sends one generation request and waits for its single response.
    pub async fn exchange(&mut self, request: &InferenceRequest) -> Result<String, BridgeError> {
        if self.state != SessionState::Ready {
            return Err(BridgeError::Protocol(format!(
                "cannot exchange while session is {:?}",
                self.state
            )));
        }
        if request.is_terminate() {
            return Err(BridgeError::Protocol(
                "termination frames are sent by terminate()".into(),
            ));
        }

        self.transition(SessionState::Exchanging);
        match self.round_trip(request).await {
            Ok(text) => {
                self.transition(SessionState::Ready);
                Ok(text)
            }
            Err(e) => {
                self.transition(SessionState::Closed);
                Err(e)
            }
        }
    }

    async fn round_trip(&mut self, request: &InferenceRequest) -> Result<String, BridgeError> {
        let payload = request.to_payload()?;
        debug!("-> {}", String::from_utf8_lossy(&payload));
        bounded(self.io_timeout, write_frame(&mut self.framed, payload)).await?;

        let reply = match bounded(self.io_timeout, read_frame(&mut self.framed)).await {
            Ok(reply) => reply,
            Err(BridgeError::PeerClosed) => {
                return Err(BridgeError::Protocol(
                    "peer closed the connection before responding".into(),
                ))
            }
            Err(e) => return Err(e),
        };
        debug!("<- {}", String::from_utf8_lossy(&reply));

        InferenceResponse::from_payload(&reply)?.into_text()
    }

    /// Best-effort closing handshake, then releases the socket.
    ///
    /// Failures are logged and reported in the outcome, never returned as
    /// errors: a generation result obtained earlier stays valid.
    pub async fn terminate(mut self) -> TerminationOutcome {
        let outcome = if self.state == SessionState::Ready {
            self.transition(SessionState::Terminating);
            let limit = self.termination_timeout;
            match timeout(limit, self.send_terminate()).await {
                Ok(outcome) => outcome,
                Err(_) => TerminationOutcome::Failed(BridgeError::Timeout(limit).to_string()),
            }
        } else {
            TerminationOutcome::Failed(format!("session is {:?}", self.state))
        };

        match &outcome {
            TerminationOutcome::Acknowledged => debug!("Termination acknowledged"),
            TerminationOutcome::PeerClosed => debug!("Peer closed without acknowledging termination"),
            TerminationOutcome::Failed(reason) => warn!("Termination handshake failed: {}", reason),
        }

        self.close().await;
        outcome
    }

    async fn send_terminate(&mut self) -> TerminationOutcome {
        let payload = match InferenceRequest::terminate().to_payload() {
            Ok(payload) => payload,
            Err(e) => return TerminationOutcome::Failed(e.to_string()),
        };
        debug!("-> {}", String::from_utf8_lossy(&payload));

        if let Err(e) = write_frame(&mut self.framed, payload).await {
            return TerminationOutcome::Failed(e.to_string());
        }

        match read_frame(&mut self.framed).await {
            Ok(ack) => {
                debug!("<- {}", String::from_utf8_lossy(&ack));
                TerminationOutcome::Acknowledged
            }
            Err(BridgeError::PeerClosed) => TerminationOutcome::PeerClosed,
            Err(e) => TerminationOutcome::Failed(e.to_string()),
        }
    }

    async fn close(&mut self) {
        self.transition(SessionState::Closed);
        if let Err(e) = self.framed.get_mut().shutdown().await {
            debug!("Socket shutdown failed: {}", e);
        }
    }

    fn transition(&mut self, next: SessionState) {
        debug!("Session {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

async fn bounded<F, R>(limit: Option<Duration>, fut: F) -> Result<R, BridgeError>
where
    F: Future<Output = Result<R, BridgeError>>,
{
    match limit {
        Some(limit) => timeout(limit, fut)
            .await
            .map_err(|_| BridgeError::Timeout(limit))?,
        None => fut.await,
    }
}
