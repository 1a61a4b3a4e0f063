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

//! The uniform service contract.
//!
//! Every service function returns a `ServiceResult`:
//! - `handled`: whether this service recognized the request at all
//! - `error`: None on success; a user-facing message on failure
//!   (`handled` stays true for handled-but-failed)
//! - `emits`: messages for the acting player
//! - `broadcasts`: `(room_id, payload)` pairs for co-located peers
//!
//! Routers deliver results uniformly: an unhandled result passes to the next
//! router; an error emits as `type=error`; otherwise emits go to the actor
//! and each broadcast goes to the room's occupants excluding the actor.
//! Within a service, failures are values, never control-flow exceptions.

use tinymud_common::Payload;

/// Uniform result of every service function.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceResult {
    pub handled: bool,
    pub error: Option<String>,
    pub emits: Vec<Payload>,
    pub broadcasts: Vec<(String, Payload)>,
}

impl ServiceResult {
    /// Handled successfully, with messages for the actor only.
    pub fn success(emits: Vec<Payload>) -> Self {
        Self {
            handled: true,
            error: None,
            emits,
            broadcasts: Vec::new(),
        }
    }

    /// Handled successfully, with actor messages and room broadcasts.
    pub fn success_with(emits: Vec<Payload>, broadcasts: Vec<(String, Payload)>) -> Self {
        Self {
            handled: true,
            error: None,
            emits,
            broadcasts,
        }
    }

    /// Handled, but the operation failed with a user-facing message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            handled: true,
            error: Some(message.into()),
            emits: Vec::new(),
            broadcasts: Vec::new(),
        }
    }

    /// This service did not recognize the request; try the next router.
    pub fn not_handled() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.handled && self.error.is_none()
    }

    /// Append a broadcast, preserving emission order.
    pub fn broadcast(mut self, room_id: impl Into<String>, payload: Payload) -> Self {
        self.broadcasts.push((room_id.into(), payload));
        self
    }
}

/// Where a payload should be delivered.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// Directly to one session.
    To(String),
    /// To every session in a room, optionally excluding one (the actor).
    Room {
        room_id: String,
        exclude: Option<String>,
    },
}

/// A payload paired with its destination; the transport layer fans these out.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub delivery: Delivery,
    pub payload: Payload,
}

impl Outbound {
    pub fn to(sid: impl Into<String>, payload: Payload) -> Self {
        Self {
            delivery: Delivery::To(sid.into()),
            payload,
        }
    }

    pub fn room(room_id: impl Into<String>, exclude: Option<String>, payload: Payload) -> Self {
        Self {
            delivery: Delivery::Room {
                room_id: room_id.into(),
                exclude,
            },
            payload,
        }
    }
}

/// Flatten a service result into deliverable messages for the acting
/// session. This is the single router emission path: error takes precedence
/// over emits, broadcasts exclude the actor, ordering is preserved.
pub fn deliver(sid: &str, result: &ServiceResult) -> Vec<Outbound> {
    let mut out = Vec::new();
    if !result.handled {
        return out;
    }
    if let Some(error) = &result.error {
        out.push(Outbound::to(sid, Payload::error(error.clone())));
        return out;
    }
    for payload in &result.emits {
        out.push(Outbound::to(sid, payload.clone()));
    }
    for (room_id, payload) in &result.broadcasts {
        out.push(Outbound::room(
            room_id.clone(),
            Some(sid.to_string()),
            payload.clone(),
        ));
    }
    out
}
