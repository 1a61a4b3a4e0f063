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

//! Object templates: definition, deletion, and instantiation into rooms.

use crate::resolve::{resolve_or_err, resolve_room_id};
use crate::service::ServiceResult;
use crate::world::object::Object;
use crate::world::World;
use tinymud_common::Payload;

/// Define (or redefine) an object template. Tags are comma-separated.
pub fn create_template(
    world: &mut World,
    key: &str,
    display_name: &str,
    description: &str,
    tags_csv: &str,
) -> ServiceResult {
    let key = key.trim();
    if key.is_empty() || display_name.trim().is_empty() {
        return ServiceResult::error(
            "Usage: /object template <key> | <name> | <description> | <tags>",
        );
    }
    let mut template = Object::new(display_name.trim(), description.trim());
    for tag in tags_csv.split(',') {
        let tag = tag.trim();
        if !tag.is_empty() {
            template.tags.insert(tag.to_string());
        }
    }
    let replaced = world
        .object_templates
        .insert(key.to_string(), template)
        .is_some();
    ServiceResult::success(vec![Payload::system(format!(
        "Template [b]{}[/b] {}.",
        key,
        if replaced { "replaced" } else { "created" }
    ))])
}

pub fn delete_template(world: &mut World, typed_key: &str) -> ServiceResult {
    match resolve_or_err(typed_key, world.object_templates.keys().cloned()) {
        Ok(key) => {
            world.object_templates.remove(&key);
            ServiceResult::success(vec![Payload::system(format!(
                "Template [b]{}[/b] deleted.",
                key
            ))])
        }
        Err(e) => ServiceResult::error(e),
    }
}

/// Spawn a fresh instance of a template into a room (deep copy, new UUID).
pub fn spawn_from_template(
    world: &mut World,
    actor_room: Option<&str>,
    typed_key: &str,
    typed_room: &str,
) -> ServiceResult {
    let key = match resolve_or_err(typed_key, world.object_templates.keys().cloned()) {
        Ok(key) => key,
        Err(e) => return ServiceResult::error(e),
    };
    let room_id = match resolve_room_id(typed_room, actor_room, world.rooms.keys().cloned()) {
        Ok(id) => id,
        Err(e) => return ServiceResult::error(e),
    };
    let instance = world.object_templates[&key].instantiate();
    let name = instance.display_name.clone();
    world
        .rooms
        .get_mut(&room_id)
        .expect("resolved room exists")
        .objects
        .insert(instance.uuid, instance);
    ServiceResult::success_with(
        vec![Payload::system(format!(
            "A [b]{}[/b] appears in [b]{}[/b].",
            name, room_id
        ))],
        vec![(room_id, Payload::system(format!("A {} appears.", name)))],
    )
}
