//
// Copyright 2025-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Message payloads exchanged with clients.
//!
//! The server consumes exactly one client event (`message_to_server`,
//! carrying `{content}`) and produces exactly one (`message`, carrying
//! `{type, content, name?}`). Content may use lightweight markup tags
//! (`[b]..[/b]`, `[i]..[/i]`, `[color=x]..[/color]`, `[code]..[/code]`)
//! which clients render; unrecognized tags render as literal text.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Event name clients use to send input to the server.
pub const MESSAGE_IN: &str = "message_to_server";

/// Event name the server uses for all outbound messages.
pub const MESSAGE_OUT: &str = "message";

/// Category of an outbound message; clients use this for styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// Server notifications, command results, world state changes.
    System,
    /// Things said by other human players.
    Player,
    /// Dialogue and actions from non-player characters.
    Npc,
    /// Command failures, invalid input, internal errors.
    Error,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::System => write!(f, "system"),
            MessageType::Player => write!(f, "player"),
            MessageType::Npc => write!(f, "npc"),
            MessageType::Error => write!(f, "error"),
        }
    }
}

/// The single outbound payload shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub content: String,
    /// Speaker name for player/npc messages.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
}

impl Payload {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            kind: MessageType::System,
            content: content.into(),
            name: None,
        }
    }

    /// Create a player message attributed to a speaker.
    pub fn player(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: MessageType::Player,
            content: content.into(),
            name: Some(name.into()),
        }
    }

    /// Create an NPC message attributed to a speaker.
    pub fn npc(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: MessageType::Npc,
            content: content.into(),
            name: Some(name.into()),
        }
    }

    /// Create an error message.
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            kind: MessageType::Error,
            content: content.into(),
            name: None,
        }
    }
}

/// Wrap text in bold markup.
pub fn bold(text: &str) -> String {
    format!("[b]{}[/b]", text)
}

/// Wrap text in italic markup.
pub fn italic(text: &str) -> String {
    format!("[i]{}[/i]", text)
}

/// Wrap text in a named color.
pub fn color(name: &str, text: &str) -> String {
    format!("[color={}]{}[/color]", name, text)
}

/// Wrap text in code markup.
pub fn code(text: &str) -> String {
    format!("[code]{}[/code]", text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_serialization() {
        let payload = Payload::system("Welcome!");
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "system");
        assert_eq!(json["content"], "Welcome!");
        assert!(json.get("name").is_none());
    }

    #[test]
    fn test_payload_with_name() {
        let payload = Payload::npc("Gareth", "Hello there.");
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "npc");
        assert_eq!(json["name"], "Gareth");
    }

    #[test]
    fn test_payload_round_trip() {
        let payload = Payload::player("Alice", "hi all");
        let json = serde_json::to_string(&payload).unwrap();
        let back: Payload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_markup_helpers() {
        assert_eq!(bold("Alice"), "[b]Alice[/b]");
        assert_eq!(italic("waves"), "[i]waves[/i]");
        assert_eq!(color("red", "ouch"), "[color=red]ouch[/color]");
        assert_eq!(code("/help"), "[code]/help[/code]");
    }
}
