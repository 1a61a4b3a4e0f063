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

//! Autonomy overrides: personality- and drive-based impulses evaluated
//! before planning. A candidate scoring 80 or higher preempts whatever the
//! planner produced this tick.

use crate::world::sheet::{CharacterSheet, PlanAction};
use crate::world::{Room, World};
use serde_json::json;

/// A candidate impulse with its urgency.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredAction {
    pub action: PlanAction,
    pub priority: i32,
    pub description: String,
}

/// Priority at or above which an impulse overrides the plan for this tick.
pub const OVERRIDE_PRIORITY: i32 = 80;

/// Evaluate an NPC's impulses in its current room, sorted most urgent
/// first. Deterministic: no randomness, stable ordering.
pub fn evaluate_autonomy(world: &World, npc_name: &str, room_id: &str) -> Vec<ScoredAction> {
    let Some(sheet) = world.npc_sheets.get(npc_name) else {
        return Vec::new();
    };
    let Some(room) = world.rooms.get(room_id) else {
        return Vec::new();
    };

    let mut actions = Vec::new();
    evaluate_safety(world, sheet, npc_name, room, &mut actions);
    evaluate_wealth(sheet, room, &mut actions);
    evaluate_curiosity(sheet, room, &mut actions);
    evaluate_faction_rivals(world, sheet, npc_name, room, &mut actions);

    actions.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.description.cmp(&b.description)));
    actions
}

/// The top candidate if it is urgent enough to override the plan.
pub fn override_action(world: &World, npc_name: &str, room_id: &str) -> Option<ScoredAction> {
    evaluate_autonomy(world, npc_name, room_id)
        .into_iter()
        .next()
        .filter(|candidate| candidate.priority >= OVERRIDE_PRIORITY)
}

/// Threatened NPCs flee toward the first exit.
fn evaluate_safety(
    world: &World,
    sheet: &CharacterSheet,
    npc_name: &str,
    room: &Room,
    out: &mut Vec<ScoredAction>,
) {
    if sheet.safety >= 20.0 {
        return;
    }
    if !threat_present(world, room, npc_name) {
        return;
    }
    if let Some(exit) = room.exit_names().into_iter().next() {
        out.push(ScoredAction {
            action: PlanAction::new("move_through", json!({ "name": exit })),
            priority: 90,
            description: format!("{} seeks safety from perceived threats", npc_name),
        });
    }
}

/// Irresponsible, greedy NPCs eye valuable unowned objects.
fn evaluate_wealth(sheet: &CharacterSheet, room: &Room, out: &mut Vec<ScoredAction>) {
    if sheet.responsibility >= 30 || sheet.wealth_desire <= 70 {
        return;
    }
    let target = room
        .visible_objects()
        .filter(|o| o.value > 10 && o.owner_id.is_none() && !o.is_immovable())
        .max_by_key(|o| (o.value, std::cmp::Reverse(o.display_name.clone())));
    if let Some(target) = target {
        out.push(ScoredAction {
            action: PlanAction::new("get_object", json!({ "object_name": target.display_name })),
            priority: 80 + (30 - sheet.responsibility).min(15),
            description: format!("considers taking the {}", target.display_name),
        });
    }
}

/// Very curious NPCs wander through exits they have not used yet.
fn evaluate_curiosity(sheet: &CharacterSheet, room: &Room, out: &mut Vec<ScoredAction>) {
    if sheet.curiosity <= 70 {
        return;
    }
    let unexplored = room
        .exit_names()
        .into_iter()
        .find(|exit| !sheet.remembers("explored_exit", exit));
    if let Some(exit) = unexplored {
        out.push(ScoredAction {
            action: PlanAction::new("move_through", json!({ "name": exit })),
            priority: 80,
            description: format!("is drawn toward the {}", exit),
        });
    }
}

/// Faction rivalry: insult, then attack. The emitted attack record only
/// ever names an NPC from the room roster and executes through the
/// NPC-only combat path; it is not part of the adapter-facing tool set.
fn evaluate_faction_rivals(
    world: &World,
    sheet: &CharacterSheet,
    npc_name: &str,
    room: &Room,
    out: &mut Vec<ScoredAction>,
) {
    let Some(faction_id) = &sheet.faction_id else {
        return;
    };
    let Some(faction) = world.factions.get(faction_id) else {
        return;
    };
    for other_name in &room.npcs {
        if other_name == npc_name {
            continue;
        }
        let Some(other) = world.npc_sheets.get(other_name) else {
            continue;
        };
        if other.is_dead || other.yielded {
            continue;
        }
        let Some(other_faction) = &other.faction_id else {
            continue;
        };
        if faction.is_rival(other_faction) {
            out.push(ScoredAction {
                action: PlanAction::new(
                    "emote",
                    json!({ "message": format!("glares at {} with open contempt.", other_name) }),
                ),
                priority: 96,
                description: format!("insults rival {}", other_name),
            });
            out.push(ScoredAction {
                action: PlanAction::new("attack", json!({ "target": other_name })),
                priority: 95,
                description: format!("attacks rival {}", other_name),
            });
            break;
        }
    }
}

fn threat_present(world: &World, room: &Room, npc_name: &str) -> bool {
    room.npcs
        .iter()
        .filter(|other| other.as_str() != npc_name)
        .filter_map(|other| world.npc_sheets.get(other))
        .any(|other| !other.is_dead && other.aggression > 70)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::object::Object;
    use crate::world::room::Room;
    use crate::world::Faction;

    fn setup_with_npc(npc_name: &str) -> World {
        let mut world = World::new();
        world.rooms.insert("start".into(), Room::new("start", "Here."));
        let sheet = CharacterSheet::new(npc_name, "An NPC.");
        world.npc_sheets.insert(npc_name.to_string(), sheet);
        world.get_or_create_npc_id(npc_name);
        world
            .rooms
            .get_mut("start")
            .unwrap()
            .npcs
            .insert(npc_name.to_string());
        world
    }

    #[test]
    fn test_content_npc_has_no_impulses() {
        let world = setup_with_npc("Gareth");
        assert!(evaluate_autonomy(&world, "Gareth", "start").is_empty());
        assert!(override_action(&world, "Gareth", "start").is_none());
    }

    #[test]
    fn test_greedy_irresponsible_npc_steals() {
        let mut world = setup_with_npc("Fingers");
        {
            let sheet = world.npc_sheets.get_mut("Fingers").unwrap();
            sheet.responsibility = 20;
            sheet.wealth_desire = 85;
        }
        let mut gem = Object::new("gem", "Gleaming.").with_tag("small");
        gem.value = 50;
        world.rooms.get_mut("start").unwrap().objects.insert(gem.uuid, gem);

        let action = override_action(&world, "Fingers", "start").expect("steal impulse");
        assert_eq!(action.action.tool, "get_object");
        assert_eq!(action.action.arg_str("object_name"), Some("gem"));
        assert!(action.priority >= 80);
    }

    #[test]
    fn test_threatened_npc_flees() {
        let mut world = setup_with_npc("Mouse");
        world.npc_sheets.get_mut("Mouse").unwrap().safety = 10.0;
        // A menacing roommate.
        let mut brute = CharacterSheet::new("Brute", "Looming.");
        brute.aggression = 90;
        world.npc_sheets.insert("Brute".into(), brute);
        world.rooms.get_mut("start").unwrap().npcs.insert("Brute".into());
        // And a way out.
        world.rooms.insert("alley".into(), Room::new("alley", "Narrow."));
        crate::services::room::add_door(&mut world, "start", "side door", "alley");

        let action = override_action(&world, "Mouse", "start").expect("flee impulse");
        assert_eq!(action.action.tool, "move_through");
        assert!(action.priority >= 90);
    }

    #[test]
    fn test_curious_npc_investigates_unexplored_exit() {
        let mut world = setup_with_npc("Wren");
        world.npc_sheets.get_mut("Wren").unwrap().curiosity = 85;
        world.rooms.insert("alley".into(), Room::new("alley", "Narrow."));
        crate::services::room::add_door(&mut world, "start", "side door", "alley");

        let action = override_action(&world, "Wren", "start").expect("investigate impulse");
        assert_eq!(action.action.tool, "move_through");
        assert_eq!(action.action.arg_str("name"), Some("side door"));

        // Once remembered, the impulse fades.
        world
            .npc_sheets
            .get_mut("Wren")
            .unwrap()
            .add_memory("explored_exit", "side door");
        assert!(override_action(&world, "Wren", "start").is_none());
    }

    #[test]
    fn test_faction_rivals_trigger_hostility() {
        let mut world = setup_with_npc("RedGuard");
        let mut blue = CharacterSheet::new("BlueScout", "Wary.");
        blue.faction_id = Some("blue".into());
        world.npc_sheets.insert("BlueScout".into(), blue);
        world.rooms.get_mut("start").unwrap().npcs.insert("BlueScout".into());
        world.npc_sheets.get_mut("RedGuard").unwrap().faction_id = Some("red".into());

        let mut red_faction = Faction {
            name: "The Red Banner".into(),
            ..Default::default()
        };
        red_faction.rivals.insert("blue".into());
        world.factions.insert("red".into(), red_faction);
        world.factions.insert(
            "blue".into(),
            Faction {
                name: "The Blue Veil".into(),
                ..Default::default()
            },
        );

        let actions = evaluate_autonomy(&world, "RedGuard", "start");
        assert_eq!(actions[0].action.tool, "emote");
        assert_eq!(actions[1].action.tool, "attack");
        assert_eq!(actions[1].action.arg_str("target"), Some("BlueScout"));
    }
}
