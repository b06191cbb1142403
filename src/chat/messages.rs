//! Chat message protocol

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message sent from the browser to the bot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// User text
    Msg {
        token: String,
        text: String,
        #[serde(default)]
        mobile: bool,
        /// Restart the conversation
        #[serde(default, rename = "startOver")]
        start_over: bool,
    },
    /// Keep-alive
    Ping { token: String },
}

/// Message sent from the bot to the browser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Bot reply, optionally carrying located points
    Msg {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        points: Option<Vec<Value>>,
    },
    /// Echo of what the user typed, as understood by the bot
    Input {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    /// Keep-alive
    Ping,
}

impl ClientMessage {
    pub fn token(&self) -> &str {
        match self {
            ClientMessage::Msg { token, .. } | ClientMessage::Ping { token } => token,
        }
    }
}

impl ServerMessage {
    pub fn text(text: impl Into<String>) -> Self {
        ServerMessage::Msg {
            text: Some(text.into()),
            points: None,
        }
    }

    /// Points to forward to the map, if any
    pub fn points(&self) -> Option<&[Value]> {
        match self {
            ServerMessage::Msg {
                points: Some(points),
                ..
            } => Some(points),
            _ => None,
        }
    }
}
