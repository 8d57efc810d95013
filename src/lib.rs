//! Client for a locally hosted model-serving process that speaks a
//! length-prefixed JSON protocol over raw TCP.
//!
//! Each [`InferenceBridge::generate`] call opens its own connection, waits for
//! the server's welcome frame, sends one request, reads one response, sends a
//! best-effort termination frame and hangs up.
//!
//! ```no_run
//! use inference_bridge::{BridgeConfig, InferenceBridge};
//!
//! # async fn run() -> Result<(), inference_bridge::BridgeError> {
//! let bridge = InferenceBridge::new(BridgeConfig::new("127.0.0.1:65432"))?;
//! let text = bridge.generate("List the side effects mentioned in this post: ...").await?;
//! println!("{text}");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod connection;
pub mod errors;
pub mod extract;
pub mod request;
pub mod response;
pub mod session;

pub use client::{InferenceBridge, TextGenerator};
pub use codec::{read_frame, write_frame, FrameCodec};
pub use config::BridgeConfig;
pub use connection::Connector;
pub use errors::BridgeError;
pub use request::InferenceRequest;
pub use response::InferenceResponse;
pub use session::{Session, SessionState, TerminationOutcome};
