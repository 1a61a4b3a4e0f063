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

//! Persistent user accounts and ephemeral player bindings.

use crate::world::sheet::CharacterSheet;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted account. The display name doubles as the login name and is
/// unique per world. The stored verifier is a bcrypt hash; the plaintext
/// never touches the world document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: Uuid,
    pub display_name: String,
    /// bcrypt password verifier.
    pub password_hash: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_admin: bool,
    pub sheet: CharacterSheet,
}

impl User {
    /// Create a fresh account with a sheet mirroring the display name.
    pub fn new(
        display_name: impl Into<String>,
        password_hash: impl Into<String>,
        description: impl Into<String>,
        is_admin: bool,
    ) -> Self {
        let display_name = display_name.into();
        let description = description.into();
        let sheet = CharacterSheet::new(display_name.clone(), description.clone());
        Self {
            user_id: Uuid::new_v4(),
            display_name,
            password_hash: password_hash.into(),
            description,
            is_admin,
            sheet,
        }
    }
}

/// An ephemeral binding of a live session to a user. Never persisted; the
/// underlying `User` and its sheet survive disconnects.
#[derive(Debug, Clone)]
pub struct Player {
    /// Transport-assigned session id.
    pub sid: String,
    pub user_id: Uuid,
    pub room_id: String,
}

impl Player {
    pub fn new(sid: impl Into<String>, user_id: Uuid, room_id: impl Into<String>) -> Self {
        Self {
            sid: sid.into(),
            user_id,
            room_id: room_id.into(),
        }
    }
}
