//! Control messages
//!
//! Commands from other extension surfaces arrive as JSON objects of the
//! form `{"type": "SET_SPEED", "payload": 1.5}`. Parsing is strict: a bad
//! payload is rejected before any controller is touched.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// A parsed control command
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlMessage {
    GetStatus,
    SetSpeed(f64),
    AdjustSpeed(f64),
    ResetSpeed,
    ToggleDisplay,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

impl ControlMessage {
    pub fn from_value(value: Value) -> Result<ControlMessage> {
        let envelope: Envelope = serde_json::from_value(value)?;
        match envelope.kind.as_str() {
            "GET_STATUS" => Ok(ControlMessage::GetStatus),
            "SET_SPEED" => finite("SET_SPEED", &envelope.payload).map(ControlMessage::SetSpeed),
            "ADJUST_SPEED" => finite("ADJUST_SPEED", &envelope.payload).map(ControlMessage::AdjustSpeed),
            "RESET_SPEED" => Ok(ControlMessage::ResetSpeed),
            "TOGGLE_DISPLAY" => Ok(ControlMessage::ToggleDisplay),
            _ => Err(Error::UnknownMessage(envelope.kind)),
        }
    }

    pub fn parse(json: &str) -> Result<ControlMessage> {
        ControlMessage::from_value(serde_json::from_str(json)?)
    }

    /// Wire name of the message type
    pub fn kind(&self) -> &'static str {
        match self {
            ControlMessage::GetStatus => "GET_STATUS",
            ControlMessage::SetSpeed(_) => "SET_SPEED",
            ControlMessage::AdjustSpeed(_) => "ADJUST_SPEED",
            ControlMessage::ResetSpeed => "RESET_SPEED",
            ControlMessage::ToggleDisplay => "TOGGLE_DISPLAY",
        }
    }
}

fn finite(message: &'static str, payload: &Value) -> Result<f64> {
    payload
        .as_f64()
        .filter(|n| n.is_finite())
        .ok_or_else(|| Error::InvalidPayload { message, reason: format!("expected a finite number, got {}", payload) })
}

/// Reply to a control message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum ControlResponse {
    Status { has_videos: bool, current_speed: f64, video_count: usize },
    Ack {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl ControlResponse {
    pub fn ok() -> Self {
        ControlResponse::Ack { success: true, error: None }
    }

    pub fn failure(error: impl ToString) -> Self {
        ControlResponse::Ack { success: false, error: Some(error.to_string()) }
    }

    pub fn is_success(&self) -> bool {
        match self {
            ControlResponse::Status { .. } => true,
            ControlResponse::Ack { success, .. } => *success,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
