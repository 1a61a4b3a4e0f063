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

//! The world: rooms, users, NPC sheets, templates, relationships, settings.
//!
//! The world is the sole shared mutable resource. Live `players` bindings are
//! ephemeral; everything else round-trips through a single JSON document.
//! Loading applies all pending schema migrations before deserializing.

pub mod migrations;
pub mod object;
pub mod room;
pub mod sheet;
pub mod user;

use crate::world::migrations::{MigrationError, MigrationRegistry};
use crate::world::object::Object;
use crate::world::sheet::CharacterSheet;
use crate::world::user::{Player, User};

pub use crate::world::room::Room;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

/// Room id players fall into when no start room exists yet.
pub const VOID_ROOM_ID: &str = "__void__";

/// Errors from world construction and loading.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("failed to read world file: {0}")]
    Io(#[from] std::io::Error),
    #[error("world document is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error(transparent)]
    Migration(#[from] MigrationError),
    #[error("display name already taken")]
    NameTaken,
    #[error("display name must be 2-32 characters")]
    InvalidName,
    #[error("password required")]
    PasswordRequired,
}

/// AI content safety band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SafetyLevel {
    #[serde(rename = "G")]
    G,
    #[default]
    #[serde(rename = "PG-13")]
    Pg13,
    #[serde(rename = "R")]
    R,
    #[serde(rename = "OFF")]
    Off,
}

impl fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SafetyLevel::G => write!(f, "G"),
            SafetyLevel::Pg13 => write!(f, "PG-13"),
            SafetyLevel::R => write!(f, "R"),
            SafetyLevel::Off => write!(f, "OFF"),
        }
    }
}

impl FromStr for SafetyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "G" => Ok(SafetyLevel::G),
            "PG-13" | "PG13" | "PG" => Ok(SafetyLevel::Pg13),
            "R" => Ok(SafetyLevel::R),
            "OFF" => Ok(SafetyLevel::Off),
            other => Err(format!(
                "Unknown safety level '{}'. Valid: G, PG-13, R, OFF",
                other
            )),
        }
    }
}

/// A named group NPCs can belong to, with declared rivals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Faction {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Faction keys this faction is hostile toward.
    #[serde(default)]
    pub rivals: BTreeSet<String>,
}

impl Faction {
    pub fn is_rival(&self, other_faction_id: &str) -> bool {
        self.rivals.contains(other_faction_id)
    }
}

/// Main container for all game entities and settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct World {
    /// Schema version; bumped by migrations on load.
    #[serde(default)]
    pub world_version: i64,
    #[serde(default)]
    pub rooms: BTreeMap<String, Room>,
    /// Live session bindings; never persisted.
    #[serde(skip)]
    pub players: HashMap<String, Player>,
    #[serde(default)]
    pub users: BTreeMap<Uuid, User>,
    /// NPC display name -> sheet. NPC names are globally unique.
    #[serde(default)]
    pub npc_sheets: BTreeMap<String, CharacterSheet>,
    /// NPC display name -> stable UUID.
    #[serde(default)]
    pub npc_ids: BTreeMap<String, Uuid>,
    #[serde(default)]
    pub object_templates: BTreeMap<String, Object>,
    /// Directed relationship graph: entity id -> target id -> type.
    #[serde(default)]
    pub relationships: BTreeMap<Uuid, BTreeMap<Uuid, String>>,
    #[serde(default)]
    pub factions: BTreeMap<String, Faction>,
    #[serde(default)]
    pub world_name: Option<String>,
    #[serde(default)]
    pub world_description: Option<String>,
    #[serde(default)]
    pub world_conflict: Option<String>,
    #[serde(default)]
    pub start_room_id: Option<String>,
    #[serde(default)]
    pub safety_level: SafetyLevel,
    /// Gate for the AI planning path; offline planning is always available.
    #[serde(default)]
    pub advanced_goap_enabled: bool,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        Self {
            world_version: migrations::LATEST_VERSION,
            rooms: BTreeMap::new(),
            players: HashMap::new(),
            users: BTreeMap::new(),
            npc_sheets: BTreeMap::new(),
            npc_ids: BTreeMap::new(),
            object_templates: BTreeMap::new(),
            relationships: BTreeMap::new(),
            factions: BTreeMap::new(),
            world_name: None,
            world_description: None,
            world_conflict: None,
            start_room_id: None,
            safety_level: SafetyLevel::default(),
            advanced_goap_enabled: false,
        }
    }

    // --- Player lifecycle ---

    /// Bind a session to a user and place them in a room (the configured
    /// start room when none is given).
    pub fn add_player(&mut self, sid: &str, user_id: Uuid, room_id: Option<String>) -> &Player {
        let room_id = room_id.unwrap_or_else(|| {
            self.start_room_id
                .as_ref()
                .filter(|id| self.rooms.contains_key(*id))
                .cloned()
                .unwrap_or_else(|| VOID_ROOM_ID.to_string())
        });
        let player = Player::new(sid, user_id, room_id.clone());
        self.players.insert(sid.to_string(), player);
        if let Some(room) = self.rooms.get_mut(&room_id) {
            room.players.insert(sid.to_string());
        }
        &self.players[sid]
    }

    /// Tear down a session binding; the underlying user persists.
    pub fn remove_player(&mut self, sid: &str) {
        if let Some(player) = self.players.remove(sid) {
            if let Some(room) = self.rooms.get_mut(&player.room_id) {
                room.players.remove(sid);
            }
        }
    }

    /// Move a player between rooms, keeping both `players` sets consistent.
    pub fn move_player(&mut self, sid: &str, new_room_id: &str) -> bool {
        if !self.rooms.contains_key(new_room_id) {
            return false;
        }
        let old_room_id = match self.players.get(sid) {
            Some(p) => p.room_id.clone(),
            None => return false,
        };
        if let Some(old_room) = self.rooms.get_mut(&old_room_id) {
            old_room.players.remove(sid);
        }
        if let Some(player) = self.players.get_mut(sid) {
            player.room_id = new_room_id.to_string();
        }
        if let Some(new_room) = self.rooms.get_mut(new_room_id) {
            new_room.players.insert(sid.to_string());
        }
        true
    }

    // --- Lookups ---

    pub fn user_for_sid(&self, sid: &str) -> Option<&User> {
        let player = self.players.get(sid)?;
        self.users.get(&player.user_id)
    }

    pub fn sheet_for_sid(&self, sid: &str) -> Option<&CharacterSheet> {
        self.user_for_sid(sid).map(|u| &u.sheet)
    }

    pub fn sheet_for_sid_mut(&mut self, sid: &str) -> Option<&mut CharacterSheet> {
        let user_id = self.players.get(sid)?.user_id;
        self.users.get_mut(&user_id).map(|u| &mut u.sheet)
    }

    pub fn room_for_sid(&self, sid: &str) -> Option<&Room> {
        let player = self.players.get(sid)?;
        self.rooms.get(&player.room_id)
    }

    pub fn get_user_by_display_name(&self, name: &str) -> Option<&User> {
        let low = name.trim().to_lowercase();
        self.users
            .values()
            .find(|u| u.display_name.to_lowercase() == low)
    }

    /// Display name of the character bound to a session, if any.
    pub fn display_name_for_sid(&self, sid: &str) -> Option<String> {
        self.sheet_for_sid(sid).map(|s| s.display_name.clone())
    }

    // --- NPC helpers ---

    /// Stable UUID for an NPC name, minting one if missing.
    pub fn get_or_create_npc_id(&mut self, npc_name: &str) -> Uuid {
        *self
            .npc_ids
            .entry(npc_name.to_string())
            .or_insert_with(Uuid::new_v4)
    }

    /// Room id where an NPC is currently present.
    pub fn find_npc_room(&self, npc_name: &str) -> Option<&str> {
        self.rooms
            .values()
            .find(|r| r.npcs.contains(npc_name))
            .map(|r| r.id.as_str())
    }

    // --- User lifecycle ---

    /// Create a user account. The first account in the world is admin.
    pub fn create_user(
        &mut self,
        display_name: &str,
        password_hash: &str,
        description: &str,
    ) -> Result<Uuid, WorldError> {
        let name = display_name.trim();
        if name.len() < 2 || name.len() > 32 {
            return Err(WorldError::InvalidName);
        }
        if password_hash.is_empty() {
            return Err(WorldError::PasswordRequired);
        }
        if self.get_user_by_display_name(name).is_some() {
            return Err(WorldError::NameTaken);
        }
        let is_admin = self.users.is_empty();
        let user = User::new(name, password_hash, description, is_admin);
        let uid = user.user_id;
        self.users.insert(uid, user);
        Ok(uid)
    }

    // --- Persistence document ---

    /// Serialize to the persisted document shape (live players excluded).
    pub fn to_document(&self) -> Value {
        serde_json::to_value(self).expect("world serialization is infallible")
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string_pretty(&self.to_document()).expect("world serialization is infallible")
    }

    /// Deserialize a migrated document into a world, normalizing inventory
    /// shapes that may have come from older data.
    pub fn from_document(doc: Value) -> Result<World, WorldError> {
        let mut world: World = serde_json::from_value(doc)?;
        for user in world.users.values_mut() {
            user.sheet.inventory.normalize();
        }
        for sheet in world.npc_sheets.values_mut() {
            sheet.inventory.normalize();
        }
        Ok(world)
    }

    /// Load a world from disk, applying all pending migrations. A missing
    /// file yields a fresh world; a malformed document is a fatal error (the
    /// server refuses to serve rather than run on corrupt state).
    pub fn load(path: &Path) -> Result<World, WorldError> {
        if !path.exists() {
            tracing::info!("No world file at {}; starting fresh", path.display());
            return Ok(World::new());
        }
        let raw = std::fs::read_to_string(path)?;
        let doc: Value = serde_json::from_str(&raw)?;
        let registry = MigrationRegistry::new();
        let migrated = registry.migrate(&doc)?;
        let world = World::from_document(migrated)?;
        tracing::info!(
            "Loaded world '{}' at schema version {} ({} rooms, {} users, {} NPCs)",
            world.world_name.as_deref().unwrap_or("(unnamed)"),
            world.world_version,
            world.rooms.len(),
            world.users.len(),
            world.npc_sheets.len()
        );
        Ok(world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(p: &str) -> String {
        // Cheap stand-in; production hashing happens in the auth service.
        format!("$test${}", p)
    }

    #[test]
    fn test_first_user_is_admin() {
        let mut world = World::new();
        let alice = world.create_user("Alice", &hash("hunter2"), "explorer").unwrap();
        let bob = world.create_user("Bob", &hash("passw0rd"), "merchant").unwrap();
        assert!(world.users[&alice].is_admin);
        assert!(!world.users[&bob].is_admin);
    }

    #[test]
    fn test_duplicate_display_name_rejected() {
        let mut world = World::new();
        world.create_user("Alice", &hash("a"), "").unwrap();
        assert!(matches!(
            world.create_user("alice", &hash("b"), ""),
            Err(WorldError::NameTaken)
        ));
    }

    #[test]
    fn test_name_length_bounds() {
        let mut world = World::new();
        assert!(matches!(
            world.create_user("A", &hash("x"), ""),
            Err(WorldError::InvalidName)
        ));
        let long = "x".repeat(33);
        assert!(matches!(
            world.create_user(&long, &hash("x"), ""),
            Err(WorldError::InvalidName)
        ));
    }

    #[test]
    fn test_player_movement_updates_room_sets() {
        let mut world = World::new();
        world.rooms.insert("a".into(), Room::new("a", "Room A."));
        world.rooms.insert("b".into(), Room::new("b", "Room B."));
        let uid = world.create_user("Alice", &hash("x"), "").unwrap();
        world.add_player("sid-1", uid, Some("a".into()));

        assert!(world.rooms["a"].players.contains("sid-1"));
        assert!(world.move_player("sid-1", "b"));
        assert!(!world.rooms["a"].players.contains("sid-1"));
        assert!(world.rooms["b"].players.contains("sid-1"));
        assert_eq!(world.players["sid-1"].room_id, "b");
    }

    #[test]
    fn test_move_to_unknown_room_is_noop() {
        let mut world = World::new();
        world.rooms.insert("a".into(), Room::new("a", "Room A."));
        let uid = world.create_user("Alice", &hash("x"), "").unwrap();
        world.add_player("sid-1", uid, Some("a".into()));
        assert!(!world.move_player("sid-1", "nowhere"));
        assert_eq!(world.players["sid-1"].room_id, "a");
    }

    #[test]
    fn test_remove_player_keeps_user() {
        let mut world = World::new();
        world.rooms.insert("a".into(), Room::new("a", "Room A."));
        let uid = world.create_user("Alice", &hash("x"), "").unwrap();
        world.add_player("sid-1", uid, Some("a".into()));
        world.remove_player("sid-1");
        assert!(world.players.is_empty());
        assert!(world.rooms["a"].players.is_empty());
        assert!(world.users.contains_key(&uid));
    }

    #[test]
    fn test_npc_id_stable() {
        let mut world = World::new();
        let a = world.get_or_create_npc_id("Gareth");
        let b = world.get_or_create_npc_id("Gareth");
        assert_eq!(a, b);
    }

    #[test]
    fn test_document_round_trip() {
        let mut world = World::new();
        world.rooms.insert("a".into(), Room::new("a", "Room A."));
        world.world_name = Some("Testland".into());
        let uid = world.create_user("Alice", &hash("x"), "explorer").unwrap();
        world.add_player("sid-1", uid, Some("a".into()));

        let doc = world.to_document();
        let back = World::from_document(doc).unwrap();
        assert_eq!(back.world_name.as_deref(), Some("Testland"));
        assert!(back.rooms.contains_key("a"));
        assert!(back.users.contains_key(&uid));
        // Live players are not persisted.
        assert!(back.players.is_empty());
    }

    #[test]
    fn test_safety_level_parsing() {
        assert_eq!("pg-13".parse::<SafetyLevel>().unwrap(), SafetyLevel::Pg13);
        assert_eq!("OFF".parse::<SafetyLevel>().unwrap(), SafetyLevel::Off);
        assert!("X".parse::<SafetyLevel>().is_err());
    }
}
