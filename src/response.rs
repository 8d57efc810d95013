use serde_json::Value;

use crate::errors::BridgeError;

const GENERATED_TEXT: &str = "generated_text";

/// Outcome reported by the serving process for one generation request.
///
/// Decided by field presence: a string `generated_text` is a success,
/// anything else is a failure carrying the best reason available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceResponse {
    Success { text: String },
    Failure { reason: String },
}

impl InferenceResponse {
    /// Decodes a response frame payload.
    ///
    /// Only invalid JSON is an error here; a well-formed object without
    /// usable text becomes [`InferenceResponse::Failure`].
    pub fn from_payload(payload: &[u8]) -> Result<Self, BridgeError> {
        let value: Value = serde_json::from_slice(payload)
            .map_err(|e| BridgeError::Protocol(format!("response is not valid JSON: {e}")))?;
        Ok(Self::from_value(value))
    }

    pub fn from_value(value: Value) -> Self {
        let mut fields = match value {
            Value::Object(fields) => fields,
            other => {
                return InferenceResponse::Failure {
                    reason: format!("expected a JSON object, got {}", kind_of(&other)),
                }
            }
        };

        match fields.remove(GENERATED_TEXT) {
            Some(Value::String(text)) => InferenceResponse::Success { text },
            Some(other) => InferenceResponse::Failure {
                reason: format!("{GENERATED_TEXT} must be a string, got {}", kind_of(&other)),
            },
            None => {
                let reason = match fields.get("error") {
                    Some(Value::String(error)) => format!("serving process reported: {error}"),
                    Some(other) => format!("serving process reported: {other}"),
                    None => format!("response has no {GENERATED_TEXT} field"),
                };
                InferenceResponse::Failure { reason }
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, InferenceResponse::Success { .. })
    }

    pub fn into_text(self) -> Result<String, BridgeError> {
        match self {
            InferenceResponse::Success { text } => Ok(text),
            InferenceResponse::Failure { reason } => Err(BridgeError::Contract(reason)),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
