use bytes::Bytes;
use serde_derive::{Deserialize, Serialize};

use crate::errors::BridgeError;

// Request envelope sent to the serving process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRequest {
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub input_ids: Option<Vec<u32>>,
    pub max_new_tokens: u32,
    pub temperature: f32,
    #[serde(default)]
    pub terminate: bool,
}

impl InferenceRequest {
    pub fn from_prompt(prompt: impl Into<String>, max_new_tokens: u32, temperature: f32) -> Self {
        Self {
            context: Some(prompt.into()),
            input_ids: None,
            max_new_tokens,
            temperature,
            terminate: false,
        }
    }

    pub fn from_input_ids(input_ids: Vec<u32>, max_new_tokens: u32, temperature: f32) -> Self {
        Self {
            context: None,
            input_ids: Some(input_ids),
            max_new_tokens,
            temperature,
            terminate: false,
        }
    }

    /// Closing message: no payload, zero budget.
    pub fn terminate() -> Self {
        Self {
            context: None,
            input_ids: None,
            max_new_tokens: 0,
            temperature: 0.0,
            terminate: true,
        }
    }

    pub fn is_terminate(&self) -> bool {
        self.terminate
    }

    pub fn to_payload(&self) -> Result<Bytes, BridgeError> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }
}
