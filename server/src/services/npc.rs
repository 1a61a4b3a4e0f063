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

//! NPC administration: roster, sheets, attributes, AI generation.
//!
//! NPC display names are globally unique; the sheet map and the id map stay
//! in step with every room roster mutation.

use crate::resolve::{resolve_or_err, resolve_room_id};
use crate::service::ServiceResult;
use crate::world::sheet::CharacterSheet;
use crate::world::World;
use serde_json::Value;
use tinymud_common::Payload;

/// Default description for characters created without one.
pub const DEFAULT_NPC_DESCRIPTION: &str = "A person who belongs in this world.";

/// Add an NPC to a room, creating its sheet and stable id.
pub fn add_npc(
    world: &mut World,
    actor_room: Option<&str>,
    typed_room: &str,
    name: &str,
    description: &str,
) -> ServiceResult {
    let name = name.trim();
    if name.is_empty() {
        return ServiceResult::error("NPC name required: /npc add <room> | <name> | <description>");
    }
    let room_id = match resolve_room_id(typed_room, actor_room, world.rooms.keys().cloned()) {
        Ok(id) => id,
        Err(e) => return ServiceResult::error(e),
    };
    if world.npc_sheets.contains_key(name) {
        return ServiceResult::error(format!("An NPC named '{}' already exists.", name));
    }
    let description = if description.trim().is_empty() {
        DEFAULT_NPC_DESCRIPTION
    } else {
        description.trim()
    };
    world
        .npc_sheets
        .insert(name.to_string(), CharacterSheet::new(name, description));
    world.get_or_create_npc_id(name);
    world
        .rooms
        .get_mut(&room_id)
        .expect("resolved room exists")
        .npcs
        .insert(name.to_string());
    tracing::info!("NPC '{}' added to room '{}'", name, room_id);
    ServiceResult::success_with(
        vec![Payload::system(format!(
            "NPC [b]{}[/b] added to [b]{}[/b].",
            name, room_id
        ))],
        vec![(room_id, Payload::system(format!("{} arrives.", name)))],
    )
}

/// Remove an NPC from a room's roster. The sheet is retained.
pub fn remove_npc(
    world: &mut World,
    actor_room: Option<&str>,
    typed_room: &str,
    typed_name: &str,
) -> ServiceResult {
    let room_id = match resolve_room_id(typed_room, actor_room, world.rooms.keys().cloned()) {
        Ok(id) => id,
        Err(e) => return ServiceResult::error(e),
    };
    let room = world.rooms.get(&room_id).expect("resolved room exists");
    let name = match resolve_or_err(typed_name, room.npcs.iter().cloned()) {
        Ok(name) => name,
        Err(e) => return ServiceResult::error(e),
    };
    world
        .rooms
        .get_mut(&room_id)
        .expect("room exists")
        .npcs
        .remove(&name);
    ServiceResult::success_with(
        vec![Payload::system(format!(
            "NPC [b]{}[/b] removed from [b]{}[/b].",
            name, room_id
        ))],
        vec![(room_id, Payload::system(format!("{} departs.", name)))],
    )
}

fn resolve_npc<'a>(world: &'a mut World, typed: &str) -> Result<&'a mut CharacterSheet, String> {
    let name = resolve_or_err(typed, world.npc_sheets.keys().cloned())?;
    Ok(world.npc_sheets.get_mut(&name).expect("resolved npc exists"))
}

pub fn set_description(world: &mut World, typed_name: &str, description: &str) -> ServiceResult {
    match resolve_npc(world, typed_name) {
        Ok(sheet) => {
            sheet.description = description.trim().to_string();
            let name = sheet.display_name.clone();
            ServiceResult::success(vec![Payload::system(format!(
                "Description of [b]{}[/b] updated.",
                name
            ))])
        }
        Err(e) => ServiceResult::error(e),
    }
}

pub fn set_attribute(world: &mut World, typed_name: &str, key: &str, value: &str) -> ServiceResult {
    let Ok(value) = value.trim().parse::<i32>() else {
        return ServiceResult::error(format!("'{}' is not a number.", value.trim()));
    };
    match resolve_npc(world, typed_name) {
        Ok(sheet) => match sheet.set_attribute(key.trim(), value) {
            Ok(()) => ServiceResult::success(vec![Payload::system(format!(
                "[b]{}[/b]: {} set to {}.",
                sheet.display_name,
                key.trim(),
                value.clamp(3, 18)
            ))]),
            Err(e) => ServiceResult::error(e),
        },
        Err(e) => ServiceResult::error(e),
    }
}

pub fn set_aspect(world: &mut World, typed_name: &str, key: &str, value: &str) -> ServiceResult {
    match resolve_npc(world, typed_name) {
        Ok(sheet) => match sheet.set_aspect(key.trim(), value.trim()) {
            Ok(()) => ServiceResult::success(vec![Payload::system(format!(
                "[b]{}[/b]: {} updated.",
                sheet.display_name,
                key.trim()
            ))]),
            Err(e) => ServiceResult::error(e),
        },
        Err(e) => ServiceResult::error(e),
    }
}

pub fn set_matrix(world: &mut World, typed_name: &str, axis: &str, value: &str) -> ServiceResult {
    let Ok(value) = value.trim().parse::<i32>() else {
        return ServiceResult::error(format!("'{}' is not a number.", value.trim()));
    };
    match resolve_npc(world, typed_name) {
        Ok(sheet) => match sheet.set_matrix_axis(axis.trim(), value) {
            Ok(()) => ServiceResult::success(vec![Payload::system(format!(
                "[b]{}[/b]: {} set to {}.",
                sheet.display_name,
                axis.trim(),
                value.clamp(-10, 10)
            ))]),
            Err(e) => ServiceResult::error(e),
        },
        Err(e) => ServiceResult::error(e),
    }
}

pub fn show_sheet(world: &World, typed_name: &str) -> ServiceResult {
    match resolve_or_err(typed_name, world.npc_sheets.keys().cloned()) {
        Ok(name) => ServiceResult::success(vec![Payload::system(
            world.npc_sheets[&name].describe(),
        )]),
        Err(e) => ServiceResult::error(e),
    }
}

/// Apply an AI-generated profile onto a sheet. Unknown or malformed fields
/// are skipped; attribute and matrix values are clamped.
pub fn apply_generated_profile(sheet: &mut CharacterSheet, profile: &Value) {
    if let Some(text) = profile.get("high_concept").and_then(Value::as_str) {
        sheet.high_concept = text.to_string();
    }
    if let Some(text) = profile.get("trouble").and_then(Value::as_str) {
        sheet.trouble = text.to_string();
    }
    if let Some(text) = profile.get("background").and_then(Value::as_str) {
        sheet.background = text.to_string();
    }
    if let Some(text) = profile.get("focus").and_then(Value::as_str) {
        sheet.focus = text.to_string();
    }
    for key in ["strength", "dexterity", "intelligence", "health"] {
        if let Some(v) = profile.get(key).and_then(Value::as_i64) {
            let _ = sheet.set_attribute(key, v as i32);
        }
    }
    if let Some(matrix) = profile.get("psychosocial_matrix").and_then(Value::as_object) {
        for (axis, v) in matrix {
            if let Some(v) = v.as_i64() {
                let _ = sheet.set_matrix_axis(axis, v as i32);
            }
        }
    }
    if let Some(desc) = profile.get("description").and_then(Value::as_str) {
        sheet.description = desc.to_string();
    }
}

/// Create an NPC from an AI-generated profile. On a profile that failed to
/// generate, no NPC is created and the error surfaces.
pub fn add_generated_npc(
    world: &mut World,
    actor_room: Option<&str>,
    typed_room: &str,
    name: &str,
    description: &str,
    profile: &Value,
) -> ServiceResult {
    let result = add_npc(world, actor_room, typed_room, name, description);
    if !result.is_success() {
        return result;
    }
    let sheet = world
        .npc_sheets
        .get_mut(name.trim())
        .expect("just inserted");
    apply_generated_profile(sheet, profile);
    result
}
