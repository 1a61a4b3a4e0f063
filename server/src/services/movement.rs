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

//! Player movement through doors, stairs, and travel points.
//!
//! Traversal resolves the exit fuzzily, enforces door locks, and moves the
//! player atomically between room player sets. The departure broadcast is
//! ordered before the arrival broadcast.

use crate::permissions::door_traversal_permitted;
use crate::resolve::strip_article;
use crate::service::ServiceResult;
use crate::services::look::describe_room_for;
use crate::services::room::resolve_exit;
use crate::world::World;
use tinymud_common::Payload;

/// Move a player through a named exit. An empty name auto-selects when the
/// room has exactly one exit.
pub fn move_through(world: &mut World, sid: &str, typed_exit: &str) -> ServiceResult {
    let Some(player) = world.players.get(sid) else {
        return ServiceResult::error("Please authenticate first.");
    };
    let source_room_id = player.room_id.clone();
    let actor_id = player.user_id;
    let Some(room) = world.rooms.get(&source_room_id) else {
        return ServiceResult::error("You are nowhere.");
    };

    let mut name = strip_article(typed_exit).to_string();
    if name.is_empty() {
        let exits = room.exit_names();
        match exits.len() {
            1 => name = exits[0].clone(),
            0 => return ServiceResult::error("There is no way out of here."),
            _ => {
                return ServiceResult::error(format!(
                    "Which way? Exits: {}",
                    exits.join(", ")
                ))
            }
        }
    }

    let (label, target_room_id) = match resolve_exit(room, &name) {
        Ok(found) => found,
        Err(e) => return ServiceResult::error(e),
    };
    if !world.rooms.contains_key(&target_room_id) {
        return ServiceResult::error(format!(
            "The {} is linked to an unknown room.",
            label
        ));
    }
    if !door_traversal_permitted(world, actor_id, &world.rooms[&source_room_id], &label) {
        return ServiceResult::error(format!("The {} is locked.", label));
    }

    let display_name = world
        .display_name_for_sid(sid)
        .unwrap_or_else(|| "Someone".to_string());

    world.move_player(sid, &target_room_id);

    // Departure strictly before arrival.
    let broadcasts = vec![
        (
            source_room_id,
            Payload::system(format!("{} leaves through the {}.", display_name, label)),
        ),
        (
            target_room_id,
            Payload::system(format!("{} enters.", display_name)),
        ),
    ];
    let emits = vec![Payload::system(describe_room_for(world, sid))];
    ServiceResult::success_with(emits, broadcasts)
}
