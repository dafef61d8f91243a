//! JSON text framing for listen messages.

use crate::domain::TransportError;

use super::{ListenRequest, ListenResponse};

/// Encode an outbound request as a JSON text frame.
pub fn encode_request(request: &ListenRequest) -> Result<String, TransportError> {
    serde_json::to_string(request).map_err(|e| TransportError::Framing(e.to_string()))
}

/// Decode an outbound request from a JSON text frame.
pub fn decode_request(frame: &str) -> Result<ListenRequest, TransportError> {
    serde_json::from_str(frame).map_err(|e| TransportError::Framing(e.to_string()))
}

/// Encode an inbound response as a JSON text frame.
pub fn encode_response(response: &ListenResponse) -> Result<String, TransportError> {
    serde_json::to_string(response).map_err(|e| TransportError::Framing(e.to_string()))
}

/// Decode an inbound response from a JSON text frame.
pub fn decode_response(frame: &str) -> Result<ListenResponse, TransportError> {
    serde_json::from_str(frame).map_err(|e| TransportError::Framing(e.to_string()))
}
