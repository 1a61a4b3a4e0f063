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

//! The `look` flow: what a player sees in their room.

use crate::service::ServiceResult;
use crate::world::World;
use tinymud_common::Payload;

/// Multi-line room view: description, NPCs, other players, objects, exits.
pub fn describe_room_for(world: &World, sid: &str) -> String {
    let Some(player) = world.players.get(sid) else {
        return "You drift in the void.".to_string();
    };
    let Some(room) = world.rooms.get(&player.room_id) else {
        return "You are nowhere.".to_string();
    };

    let mut lines = vec![room.description.trim().to_string()];

    if !room.npcs.is_empty() {
        let names: Vec<&str> = room.npcs.iter().map(String::as_str).collect();
        lines.push(format!("NPCs here: {}", names.join(", ")));
    }

    let mut others: Vec<String> = room
        .players
        .iter()
        .filter(|other| other.as_str() != sid)
        .filter_map(|other| world.display_name_for_sid(other))
        .collect();
    if !others.is_empty() {
        others.sort();
        lines.push(format!("Also present: {}", others.join(", ")));
    }

    let objects: Vec<String> = room
        .visible_objects()
        .map(|o| o.display_name.clone())
        .collect();
    if !objects.is_empty() {
        lines.push(format!("You see: {}", objects.join(", ")));
    }

    let mut exit_bits = Vec::new();
    if !room.doors.is_empty() {
        let doors: Vec<&str> = room.doors.keys().map(String::as_str).collect();
        exit_bits.push(format!("doors: {}", doors.join(", ")));
    }
    if room.stairs_up_to.is_some() {
        exit_bits.push("stairs up".to_string());
    }
    if room.stairs_down_to.is_some() {
        exit_bits.push("stairs down".to_string());
    }
    if !exit_bits.is_empty() {
        lines.push(format!("Exits: {}", exit_bits.join("; ")));
    }

    lines.join("\n")
}

pub fn look(world: &World, sid: &str) -> ServiceResult {
    ServiceResult::success(vec![Payload::system(describe_room_for(world, sid))])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::object::Object;
    use crate::world::room::Room;
    use crate::world::sheet::CharacterSheet;

    #[test]
    fn test_describe_includes_everything() {
        let mut world = World::new();
        let mut room = Room::new("start", "A dusty square.");
        room.npcs.insert("Gareth".into());
        room.doors.insert("oak door".into(), "tavern".into());
        room.stairs_up_to = Some("loft".into());
        let apple = Object::new("apple", "Crisp.");
        room.objects.insert(apple.uuid, apple);
        world.rooms.insert("start".into(), room);
        world
            .npc_sheets
            .insert("Gareth".into(), CharacterSheet::new("Gareth", "A guard."));

        let alice = world.create_user("Alice", "$h", "").unwrap();
        let bob = world.create_user("Bob", "$h", "").unwrap();
        world.add_player("sid-a", alice, Some("start".into()));
        world.add_player("sid-b", bob, Some("start".into()));

        let view = describe_room_for(&world, "sid-a");
        assert!(view.contains("A dusty square."));
        assert!(view.contains("Gareth"));
        assert!(view.contains("Bob"));
        assert!(!view.contains("Alice"), "viewer excluded from 'also present'");
        assert!(view.contains("apple"));
        assert!(view.contains("oak door"));
        assert!(view.contains("stairs up"));
    }

    #[test]
    fn test_describe_unbound_session() {
        let world = World::new();
        assert_eq!(describe_room_for(&world, "ghost"), "You drift in the void.");
    }
}
