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

//! Versioned world-schema migrations.
//!
//! Each migration transforms the raw world document from version N-1 to N.
//! Migrations never mutate their input, are idempotent, backfill safe
//! defaults instead of deleting data, and stamp `world_version` on
//! completion. A failing migration aborts the load; nothing partial is ever
//! persisted.

use serde_json::{json, Map, Value};
use uuid::Uuid;

/// The schema version fresh worlds are created at.
pub const LATEST_VERSION: i64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("cannot downgrade world from version {from} to {to}")]
    Downgrade { from: i64, to: i64 },
    #[error("no migration registered for version {0}")]
    Missing(i64),
    #[error("migration {version} failed: {reason}")]
    Failed { version: i64, reason: String },
    #[error("migration {0} did not stamp world_version")]
    NotStamped(i64),
}

/// One discrete schema upgrade.
pub trait Migration: Send + Sync {
    /// The version this migration upgrades TO.
    fn version(&self) -> i64;
    fn description(&self) -> &'static str;
    fn migrate(&self, data: &Value) -> Result<Value, MigrationError>;
}

fn as_object_mut(value: &mut Value) -> Option<&mut Map<String, Value>> {
    value.as_object_mut()
}

fn stamp(data: &mut Value, version: i64) {
    if let Some(obj) = as_object_mut(data) {
        obj.insert("world_version".to_string(), json!(version));
    }
}

fn set_default(map: &mut Map<String, Value>, key: &str, value: Value) {
    if !map.contains_key(key) || map[key].is_null() {
        map.insert(key.to_string(), value);
    }
}

fn coerce_f64(map: &mut Map<String, Value>, key: &str, default: f64) {
    let v = map.get(key).and_then(|v| {
        v.as_f64()
            .or_else(|| v.as_str().and_then(|s| s.parse::<f64>().ok()))
    });
    map.insert(key.to_string(), json!(v.unwrap_or(default)));
}

fn coerce_i64(map: &mut Map<String, Value>, key: &str, default: i64) {
    let v = map.get(key).and_then(|v| {
        v.as_i64()
            .or_else(|| v.as_str().and_then(|s| s.parse::<i64>().ok()))
    });
    map.insert(key.to_string(), json!(v.unwrap_or(default)));
}

/// Visit every character sheet map in the document (NPC sheets and the
/// sheets nested inside user accounts).
fn for_each_sheet(data: &mut Value, mut f: impl FnMut(&mut Map<String, Value>)) {
    if let Some(sheets) = data.get_mut("npc_sheets").and_then(Value::as_object_mut) {
        for sheet in sheets.values_mut() {
            if let Some(map) = sheet.as_object_mut() {
                f(map);
            }
        }
    }
    if let Some(users) = data.get_mut("users").and_then(Value::as_object_mut) {
        for user in users.values_mut() {
            if let Some(sheet) = user.get_mut("sheet").and_then(Value::as_object_mut) {
                f(sheet);
            }
        }
    }
}

/// Migration 1: bootstrap version tracking. Worlds without a version field
/// are treated as version 0.
struct AddWorldVersion;

impl Migration for AddWorldVersion {
    fn version(&self) -> i64 {
        1
    }

    fn description(&self) -> &'static str {
        "Add world_version field and basic version tracking"
    }

    fn migrate(&self, data: &Value) -> Result<Value, MigrationError> {
        let mut out = data.clone();
        stamp(&mut out, self.version());
        Ok(out)
    }
}

/// Migration 2: backfill needs-system defaults on every character sheet,
/// coercing stray string/number types along the way.
struct ConsolidateNeeds;

impl Migration for ConsolidateNeeds {
    fn version(&self) -> i64 {
        2
    }

    fn description(&self) -> &'static str {
        "Backfill needs system defaults for character sheets"
    }

    fn migrate(&self, data: &Value) -> Result<Value, MigrationError> {
        let mut out = data.clone();
        for_each_sheet(&mut out, |sheet| {
            coerce_f64(sheet, "hunger", 100.0);
            coerce_f64(sheet, "thirst", 100.0);
            coerce_f64(sheet, "socialization", 100.0);
            coerce_f64(sheet, "sleep", 100.0);
            coerce_i64(sheet, "sleeping_ticks_remaining", 0);
            set_default(sheet, "sleeping_bed_uuid", Value::Null);
            coerce_i64(sheet, "action_points", 0);
            set_default(sheet, "plan_queue", json!([]));
        });
        stamp(&mut out, self.version());
        Ok(out)
    }
}

/// Migration 3: mint stable UUIDs for rooms, doors, stairs, NPCs, objects,
/// and templates wherever they are missing.
struct ConsolidateUuids;

impl Migration for ConsolidateUuids {
    fn version(&self) -> i64 {
        3
    }

    fn description(&self) -> &'static str {
        "Generate stable UUIDs for rooms, doors, stairs, NPCs, and templates"
    }

    fn migrate(&self, data: &Value) -> Result<Value, MigrationError> {
        let mut out = data.clone();

        if let Some(rooms) = out.get_mut("rooms").and_then(Value::as_object_mut) {
            for room in rooms.values_mut() {
                let Some(room) = room.as_object_mut() else {
                    continue;
                };
                if room
                    .get("uuid")
                    .and_then(Value::as_str)
                    .and_then(|s| Uuid::parse_str(s).ok())
                    .is_none()
                {
                    room.insert("uuid".into(), json!(Uuid::new_v4().to_string()));
                }

                let door_names: Vec<String> = room
                    .get("doors")
                    .and_then(Value::as_object)
                    .map(|d| d.keys().cloned().collect())
                    .unwrap_or_default();
                let door_ids = room
                    .entry("door_ids")
                    .or_insert_with(|| json!({}))
                    .as_object_mut();
                if let Some(door_ids) = door_ids {
                    for name in door_names {
                        if !door_ids.contains_key(&name) {
                            door_ids.insert(name, json!(Uuid::new_v4().to_string()));
                        }
                    }
                }

                for (target_key, id_key) in
                    [("stairs_up_to", "stairs_up_id"), ("stairs_down_to", "stairs_down_id")]
                {
                    let has_target = room
                        .get(target_key)
                        .map(|v| !v.is_null())
                        .unwrap_or(false);
                    let has_id = room.get(id_key).map(|v| !v.is_null()).unwrap_or(false);
                    if has_target && !has_id {
                        room.insert(id_key.into(), json!(Uuid::new_v4().to_string()));
                    }
                }

                // Objects are keyed by UUID; make sure the inner field agrees.
                if let Some(objects) = room.get_mut("objects").and_then(Value::as_object_mut) {
                    for (key, obj) in objects.iter_mut() {
                        if let Some(obj) = obj.as_object_mut() {
                            let missing = obj
                                .get("uuid")
                                .and_then(Value::as_str)
                                .map(str::is_empty)
                                .unwrap_or(true);
                            if missing {
                                obj.insert("uuid".into(), json!(key));
                            }
                        }
                    }
                }
            }
        }

        // NPC ids for every sheet and every room occupant.
        let mut npc_names: Vec<String> = Vec::new();
        if let Some(sheets) = out.get("npc_sheets").and_then(Value::as_object) {
            npc_names.extend(sheets.keys().cloned());
        }
        if let Some(rooms) = out.get("rooms").and_then(Value::as_object) {
            for room in rooms.values() {
                if let Some(npcs) = room.get("npcs").and_then(Value::as_array) {
                    npc_names.extend(npcs.iter().filter_map(Value::as_str).map(String::from));
                }
            }
        }
        let npc_ids = out
            .as_object_mut()
            .ok_or_else(|| MigrationError::Failed {
                version: 3,
                reason: "document root is not an object".into(),
            })?
            .entry("npc_ids")
            .or_insert_with(|| json!({}));
        if let Some(npc_ids) = npc_ids.as_object_mut() {
            for name in npc_names {
                if !npc_ids.contains_key(&name) {
                    npc_ids.insert(name, json!(Uuid::new_v4().to_string()));
                }
            }
        }

        if let Some(templates) = out.get_mut("object_templates").and_then(Value::as_object_mut) {
            for tmpl in templates.values_mut() {
                if let Some(tmpl) = tmpl.as_object_mut() {
                    let missing = tmpl
                        .get("uuid")
                        .and_then(Value::as_str)
                        .map(str::is_empty)
                        .unwrap_or(true);
                    if missing {
                        tmpl.insert("uuid".into(), json!(Uuid::new_v4().to_string()));
                    }
                }
            }
        }

        stamp(&mut out, self.version());
        Ok(out)
    }
}

/// Migration 4: ensure every door and stair has a matching Travel Point
/// object with the proper tags and link target.
struct EnsureTravelObjects;

impl EnsureTravelObjects {
    fn ensure_travel_object(
        objects: &mut Map<String, Value>,
        id: &str,
        display_name: &str,
        description: &str,
        target: &str,
    ) {
        match objects.get_mut(id) {
            None => {
                objects.insert(
                    id.to_string(),
                    json!({
                        "uuid": id,
                        "display_name": display_name,
                        "description": description,
                        "tags": ["Immovable", "Travel Point"],
                        "link_target_room_id": target,
                    }),
                );
            }
            Some(obj) => {
                if let Some(obj) = obj.as_object_mut() {
                    let mut tags: Vec<String> = obj
                        .get("tags")
                        .and_then(Value::as_array)
                        .map(|a| {
                            a.iter()
                                .filter_map(Value::as_str)
                                .map(String::from)
                                .collect()
                        })
                        .unwrap_or_default();
                    for required in ["Immovable", "Travel Point"] {
                        if !tags.iter().any(|t| t == required) {
                            tags.push(required.to_string());
                        }
                    }
                    tags.sort();
                    obj.insert("tags".into(), json!(tags));
                    let missing_link = obj
                        .get("link_target_room_id")
                        .map(|v| v.is_null())
                        .unwrap_or(true);
                    if missing_link {
                        obj.insert("link_target_room_id".into(), json!(target));
                    }
                }
            }
        }
    }
}

impl Migration for EnsureTravelObjects {
    fn version(&self) -> i64 {
        4
    }

    fn description(&self) -> &'static str {
        "Create travel point objects for doors and stairs"
    }

    fn migrate(&self, data: &Value) -> Result<Value, MigrationError> {
        let mut out = data.clone();
        if let Some(rooms) = out.get_mut("rooms").and_then(Value::as_object_mut) {
            for room in rooms.values_mut() {
                let Some(room) = room.as_object_mut() else {
                    continue;
                };
                let doors: Vec<(String, String)> = room
                    .get("doors")
                    .and_then(Value::as_object)
                    .map(|d| {
                        d.iter()
                            .filter_map(|(k, v)| v.as_str().map(|t| (k.clone(), t.to_string())))
                            .collect()
                    })
                    .unwrap_or_default();
                let door_ids: Map<String, Value> = room
                    .get("door_ids")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                let stairs: Vec<(Option<String>, Option<String>, &str, &str)> = vec![
                    (
                        room.get("stairs_up_to").and_then(Value::as_str).map(String::from),
                        room.get("stairs_up_id").and_then(Value::as_str).map(String::from),
                        "stairs up",
                        "A staircase leading up.",
                    ),
                    (
                        room.get("stairs_down_to").and_then(Value::as_str).map(String::from),
                        room.get("stairs_down_id").and_then(Value::as_str).map(String::from),
                        "stairs down",
                        "A staircase leading down.",
                    ),
                ];

                let objects = room
                    .entry("objects")
                    .or_insert_with(|| json!({}))
                    .as_object_mut();
                let Some(objects) = objects else { continue };

                for (name, target) in &doors {
                    if let Some(id) = door_ids.get(name).and_then(Value::as_str) {
                        Self::ensure_travel_object(
                            objects,
                            id,
                            name,
                            &format!("A doorway named '{}'.", name),
                            target,
                        );
                    }
                }
                for (target, id, name, desc) in stairs {
                    if let (Some(target), Some(id)) = (target, id) {
                        Self::ensure_travel_object(objects, &id, name, desc, &target);
                    }
                }
            }
        }
        stamp(&mut out, self.version());
        Ok(out)
    }
}

/// Migration 5: backfill combat fields on every character sheet.
struct BackfillCombatFields;

impl Migration for BackfillCombatFields {
    fn version(&self) -> i64 {
        5
    }

    fn description(&self) -> &'static str {
        "Backfill combat fields (hp, morale, yield, equipment) on sheets"
    }

    fn migrate(&self, data: &Value) -> Result<Value, MigrationError> {
        let mut out = data.clone();
        for_each_sheet(&mut out, |sheet| {
            coerce_i64(sheet, "hp", 10);
            coerce_i64(sheet, "max_hp", 10);
            coerce_i64(sheet, "morale", 50);
            set_default(sheet, "yielded", json!(false));
            set_default(sheet, "is_dead", json!(false));
            set_default(sheet, "equipped_weapon", Value::Null);
            set_default(sheet, "equipped_armor", Value::Null);
        });
        stamp(&mut out, self.version());
        Ok(out)
    }
}

/// Registry and runner. Migrations apply in ascending version order from the
/// document's current version to the latest.
pub struct MigrationRegistry {
    migrations: Vec<Box<dyn Migration>>,
}

impl Default for MigrationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationRegistry {
    pub fn new() -> Self {
        let migrations: Vec<Box<dyn Migration>> = vec![
            Box::new(AddWorldVersion),
            Box::new(ConsolidateNeeds),
            Box::new(ConsolidateUuids),
            Box::new(EnsureTravelObjects),
            Box::new(BackfillCombatFields),
        ];
        debug_assert!(migrations
            .iter()
            .enumerate()
            .all(|(i, m)| m.version() == i as i64 + 1));
        Self { migrations }
    }

    pub fn current_version(&self, data: &Value) -> i64 {
        data.get("world_version").and_then(Value::as_i64).unwrap_or(0)
    }

    pub fn latest_version(&self) -> i64 {
        self.migrations.last().map(|m| m.version()).unwrap_or(0)
    }

    pub fn needs_migration(&self, data: &Value) -> bool {
        self.current_version(data) < self.latest_version()
    }

    /// Apply all pending migrations, returning the upgraded document. The
    /// input is never mutated.
    pub fn migrate(&self, data: &Value) -> Result<Value, MigrationError> {
        let current = self.current_version(data);
        let latest = self.latest_version();
        if current > latest {
            return Err(MigrationError::Downgrade {
                from: current,
                to: latest,
            });
        }
        if current == latest {
            return Ok(data.clone());
        }
        tracing::info!("Migrating world document from version {} to {}", current, latest);

        let mut doc = data.clone();
        for migration in &self.migrations {
            let version = migration.version();
            if version <= current {
                continue;
            }
            tracing::info!("Applying migration {}: {}", version, migration.description());
            doc = migration.migrate(&doc)?;
            if self.current_version(&doc) != version {
                return Err(MigrationError::NotStamped(version));
            }
        }
        Ok(doc)
    }
}
