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

//! Plan generation: the deterministic offline planner and the AI prompt
//! plumbing around it.
//!
//! The offline path is always available and targets the most unsatisfied
//! need. The AI path is only taken when advanced planning is enabled, an
//! adapter is configured, and a live player shares the room; its output is
//! validated to at most four well-formed action records over the permitted
//! tool set, and any failure falls back to the offline plan.

use crate::config::GameConfig;
use crate::world::sheet::{CharacterSheet, PlanAction};
use crate::world::{Room, World};
use serde_json::{json, Value};

/// Tools an NPC plan may contain; anything else is dropped at validation.
/// This is the full set advertised to and accepted from the AI adapter.
/// Combat is deliberately absent: the rivalry impulse reaches it through
/// its own NPC-only path, never as an adapter-controllable tool.
pub const ALLOWED_TOOLS: [&str; 9] = [
    "get_object",
    "consume_object",
    "emote",
    "say",
    "claim",
    "unclaim",
    "sleep",
    "do_nothing",
    "move_through",
];

/// Maximum actions accepted from one AI planning response.
pub const MAX_PLAN_ACTIONS: usize = 4;

/// Needs a planner can target, with current values.
fn need_values(sheet: &CharacterSheet) -> [(&'static str, f64); 4] {
    [
        ("hunger", sheet.hunger),
        ("thirst", sheet.thirst),
        ("socialization", sheet.socialization),
        ("sleep", sheet.sleep),
    ]
}

/// Whether any need sits below the planning threshold.
pub fn needs_planning(sheet: &CharacterSheet, config: &GameConfig) -> bool {
    need_values(sheet)
        .iter()
        .any(|(_, v)| *v < config.need_threshold)
}

/// Deterministic offline plan: address the most unsatisfied need below the
/// threshold; idle when nothing qualifies or nothing can be done.
pub fn offline_plan(
    world: &World,
    npc_name: &str,
    room: &Room,
    sheet: &CharacterSheet,
    config: &GameConfig,
) -> Vec<PlanAction> {
    let mut needs: Vec<(&str, f64)> = need_values(sheet)
        .into_iter()
        .filter(|(_, v)| *v < config.need_threshold)
        .collect();
    // Most unsatisfied first; name breaks ties deterministically.
    needs.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(b.0))
    });

    for (need, _) in needs {
        let plan = match need {
            "hunger" => consumption_plan(room, sheet, true),
            "thirst" => consumption_plan(room, sheet, false),
            "socialization" => social_plan(world, npc_name, room, sheet),
            "sleep" => sleep_plan(world, npc_name, room),
            _ => Vec::new(),
        };
        if !plan.is_empty() {
            return plan;
        }
    }
    vec![PlanAction::simple("do_nothing")]
}

/// Eat/drink from inventory, else fetch from the room and consume.
fn consumption_plan(room: &Room, sheet: &CharacterSheet, eating: bool) -> Vec<PlanAction> {
    let qualifies = |obj: &crate::world::object::Object| {
        let (satiation, hydration) = obj.nutrition();
        if eating {
            satiation > 0
        } else {
            hydration > 0
        }
    };

    if let Some((_, held)) = sheet.inventory.items().find(|(_, o)| qualifies(o)) {
        return vec![PlanAction::new(
            "consume_object",
            json!({ "object_uuid": held.uuid.to_string() }),
        )];
    }
    if let Some(found) = room.visible_objects().find(|o| qualifies(o)) {
        return vec![
            PlanAction::new("get_object", json!({ "object_name": found.display_name })),
            PlanAction::new(
                "consume_object",
                json!({ "object_uuid": found.uuid.to_string() }),
            ),
        ];
    }
    Vec::new()
}

/// Say something when a live listener is present, otherwise emote.
fn social_plan(
    world: &World,
    npc_name: &str,
    room: &Room,
    sheet: &CharacterSheet,
) -> Vec<PlanAction> {
    let has_listener = !room.players.is_empty()
        || room
            .npcs
            .iter()
            .filter(|n| n.as_str() != npc_name)
            .filter_map(|n| world.npc_sheets.get(n))
            .any(|s| !s.is_dead);
    if has_listener {
        vec![PlanAction::new(
            "say",
            json!({ "message": "Quiet around here lately, isn't it?" }),
        )]
    } else if sheet.aggression > 60 {
        vec![PlanAction::new(
            "emote",
            json!({ "message": "glares around the room assertively." }),
        )]
    } else {
        vec![PlanAction::new(
            "emote",
            json!({ "message": "hums a tune to themself." }),
        )]
    }
}

/// Sleep in an owned bed, or claim an unowned one first.
fn sleep_plan(world: &World, npc_name: &str, room: &Room) -> Vec<PlanAction> {
    let npc_id = world.npc_ids.get(npc_name).copied();
    let mut owned_bed = None;
    let mut unowned_bed = None;
    for obj in room.visible_objects() {
        if !obj.has_tag(crate::world::object::TAG_BED) {
            continue;
        }
        match obj.owner_id {
            Some(owner) if Some(owner) == npc_id => owned_bed = owned_bed.or(Some(obj.uuid)),
            None => unowned_bed = unowned_bed.or(Some(obj.uuid)),
            Some(_) => {}
        }
    }
    if let Some(bed) = owned_bed {
        return vec![PlanAction::new(
            "sleep",
            json!({ "bed_uuid": bed.to_string() }),
        )];
    }
    if let Some(bed) = unowned_bed {
        return vec![
            PlanAction::new("claim", json!({ "object_uuid": bed.to_string() })),
            PlanAction::new("sleep", json!({ "bed_uuid": bed.to_string() })),
        ];
    }
    Vec::new()
}

/// Assemble the AI planning prompt: world metadata, the NPC's needs and
/// personality, room contents with UUIDs/tags/nutrition, and inventory.
pub fn build_plan_prompt(world: &World, npc_name: &str, room: &Room) -> String {
    let sheet = &world.npc_sheets[npc_name];
    let mut lines = vec![
        format!(
            "You are planning actions for the NPC '{}' in the world '{}'.",
            npc_name,
            world.world_name.as_deref().unwrap_or("(unnamed)")
        ),
        format!(
            "World: {}. Conflict: {}.",
            world.world_description.as_deref().unwrap_or("unknown"),
            world.world_conflict.as_deref().unwrap_or("unknown")
        ),
        format!(
            "Needs (0-100, low is urgent): hunger {:.0}, thirst {:.0}, socialization {:.0}, sleep {:.0}.",
            sheet.hunger, sheet.thirst, sheet.socialization, sheet.sleep
        ),
        format!(
            "Personality: responsibility {}, aggression {}, confidence {}, curiosity {}.",
            sheet.responsibility, sheet.aggression, sheet.confidence, sheet.curiosity
        ),
        format!("Room '{}': {}", room.id, room.description),
    ];
    for obj in room.visible_objects() {
        let (satiation, hydration) = obj.nutrition();
        lines.push(format!(
            "  object uuid={} name='{}' tags=[{}] satiation={} hydration={}",
            obj.uuid,
            obj.display_name,
            obj.tags.iter().cloned().collect::<Vec<_>>().join(", "),
            satiation,
            hydration
        ));
    }
    lines.push("Exits:".to_string());
    for exit in room.exit_names() {
        lines.push(format!("  {}", exit));
    }
    lines.push("Inventory:".to_string());
    for (slot, obj) in sheet.inventory.items() {
        lines.push(format!(
            "  slot {} uuid={} name='{}'",
            slot, obj.uuid, obj.display_name
        ));
    }
    lines.push(format!(
        "Reply with ONLY a JSON array of at most {} actions. Each action is \
         {{\"tool\": <one of {}>, \"args\": {{...}}}}.",
        MAX_PLAN_ACTIONS,
        ALLOWED_TOOLS.join("|")
    ));
    lines.join("\n")
}

/// Validate an AI planning response into executable actions. Records with
/// unknown tools or malformed shapes are dropped; at most
/// `MAX_PLAN_ACTIONS` survive.
pub fn parse_plan(value: &Value) -> Vec<PlanAction> {
    let Some(entries) = value.as_array() else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| serde_json::from_value::<PlanAction>(entry.clone()).ok())
        .filter(|action| action.is_well_formed())
        .filter(|action| ALLOWED_TOOLS.contains(&action.tool.as_str()))
        .take(MAX_PLAN_ACTIONS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::object::Object;
    use crate::world::room::Room;

    fn world_with_npc(name: &str) -> World {
        let mut world = World::new();
        world.rooms.insert("start".into(), Room::new("start", "Here."));
        world
            .npc_sheets
            .insert(name.to_string(), CharacterSheet::new(name, "An NPC."));
        world.get_or_create_npc_id(name);
        world.rooms.get_mut("start").unwrap().npcs.insert(name.to_string());
        world
    }

    #[test]
    fn test_hungry_npc_plans_fetch_and_eat() {
        let mut world = world_with_npc("Gareth");
        world.npc_sheets.get_mut("Gareth").unwrap().hunger = 20.0;
        let apple = Object::new("apple", "Crisp.").with_tag("small").with_tag("Edible: 30");
        let apple_uuid = apple.uuid;
        world.rooms.get_mut("start").unwrap().objects.insert(apple.uuid, apple);

        let room = world.rooms["start"].clone();
        let sheet = world.npc_sheets["Gareth"].clone();
        let plan = offline_plan(&world, "Gareth", &room, &sheet, &GameConfig::default());
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].tool, "get_object");
        assert_eq!(plan[0].arg_str("object_name"), Some("apple"));
        assert_eq!(plan[1].tool, "consume_object");
        assert_eq!(plan[1].arg_uuid("object_uuid"), Some(apple_uuid));
    }

    #[test]
    fn test_inventory_food_preferred() {
        let mut world = world_with_npc("Gareth");
        let bread = Object::new("bread", "").with_tag("small").with_tag("Edible: 20");
        let bread_uuid = bread.uuid;
        {
            let sheet = world.npc_sheets.get_mut("Gareth").unwrap();
            sheet.hunger = 10.0;
            sheet.inventory.auto_place(bread).unwrap();
        }
        let room = world.rooms["start"].clone();
        let sheet = world.npc_sheets["Gareth"].clone();
        let plan = offline_plan(&world, "Gareth", &room, &sheet, &GameConfig::default());
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].tool, "consume_object");
        assert_eq!(plan[0].arg_uuid("object_uuid"), Some(bread_uuid));
    }

    #[test]
    fn test_most_unsatisfied_need_wins() {
        let mut world = world_with_npc("Gareth");
        {
            let sheet = world.npc_sheets.get_mut("Gareth").unwrap();
            sheet.hunger = 30.0;
            sheet.socialization = 5.0;
        }
        let room = world.rooms["start"].clone();
        let sheet = world.npc_sheets["Gareth"].clone();
        // No food anywhere: hunger yields nothing, socialization (the most
        // unsatisfied) is first in line anyway.
        let plan = offline_plan(&world, "Gareth", &room, &sheet, &GameConfig::default());
        assert_eq!(plan[0].tool, "emote");
    }

    #[test]
    fn test_satisfied_npc_idles() {
        let world = world_with_npc("Gareth");
        let room = world.rooms["start"].clone();
        let sheet = world.npc_sheets["Gareth"].clone();
        assert!(!needs_planning(&sheet, &GameConfig::default()));
        let plan = offline_plan(&world, "Gareth", &room, &sheet, &GameConfig::default());
        assert_eq!(plan, vec![PlanAction::simple("do_nothing")]);
    }

    #[test]
    fn test_sleep_plan_claims_unowned_bed() {
        let mut world = world_with_npc("Gareth");
        world.npc_sheets.get_mut("Gareth").unwrap().sleep = 10.0;
        let bed = Object::new("straw bed", "Lumpy.").with_tag("bed");
        let bed_uuid = bed.uuid;
        world.rooms.get_mut("start").unwrap().objects.insert(bed.uuid, bed);

        let room = world.rooms["start"].clone();
        let sheet = world.npc_sheets["Gareth"].clone();
        let plan = offline_plan(&world, "Gareth", &room, &sheet, &GameConfig::default());
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].tool, "claim");
        assert_eq!(plan[1].tool, "sleep");
        assert_eq!(plan[1].arg_uuid("bed_uuid"), Some(bed_uuid));
    }

    #[test]
    fn test_sleep_plan_uses_owned_bed_directly() {
        let mut world = world_with_npc("Gareth");
        let npc_id = world.npc_ids["Gareth"];
        world.npc_sheets.get_mut("Gareth").unwrap().sleep = 10.0;
        let mut bed = Object::new("straw bed", "Lumpy.").with_tag("bed");
        bed.owner_id = Some(npc_id);
        world.rooms.get_mut("start").unwrap().objects.insert(bed.uuid, bed);

        let room = world.rooms["start"].clone();
        let sheet = world.npc_sheets["Gareth"].clone();
        let plan = offline_plan(&world, "Gareth", &room, &sheet, &GameConfig::default());
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].tool, "sleep");
    }

    #[test]
    fn test_say_preferred_with_listener() {
        let mut world = world_with_npc("Gareth");
        world.npc_sheets.get_mut("Gareth").unwrap().socialization = 10.0;
        let uid = world.create_user("Alice", "$h", "").unwrap();
        world.add_player("sid-1", uid, Some("start".into()));

        let room = world.rooms["start"].clone();
        let sheet = world.npc_sheets["Gareth"].clone();
        let plan = offline_plan(&world, "Gareth", &room, &sheet, &GameConfig::default());
        assert_eq!(plan[0].tool, "say");
    }

    #[test]
    fn test_parse_plan_validates() {
        let value = serde_json::json!([
            {"tool": "get_object", "args": {"object_name": "apple"}},
            {"tool": "hack_the_server", "args": {}},
            {"tool": "emote"},
            {"tool": "", "args": {}},
            {"tool": "do_nothing", "args": {}},
            {"tool": "do_nothing", "args": {}},
            {"tool": "do_nothing", "args": {}}
        ]);
        let plan = parse_plan(&value);
        // Unknown and malformed records dropped, capped at four.
        assert_eq!(plan.len(), 4);
        assert_eq!(plan[0].tool, "get_object");
        assert!(plan.iter().all(|a| a.tool != "hack_the_server"));
    }

    #[test]
    fn test_parse_plan_non_array() {
        assert!(parse_plan(&serde_json::json!({"tool": "emote"})).is_empty());
    }

    #[test]
    fn test_parse_plan_rejects_attack_records() {
        // Combat is not an adapter-controllable tool; a backend returning
        // attack records gets them silently dropped.
        let value = serde_json::json!([
            {"tool": "attack", "args": {"target": "Alice"}},
            {"tool": "emote", "args": {"message": "shrugs."}}
        ]);
        let plan = parse_plan(&value);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].tool, "emote");
    }

    #[test]
    fn test_prompt_mentions_objects_and_tools() {
        let mut world = world_with_npc("Gareth");
        let apple = Object::new("apple", "Crisp.").with_tag("Edible: 30");
        world.rooms.get_mut("start").unwrap().objects.insert(apple.uuid, apple);
        let room = world.rooms["start"].clone();
        let prompt = build_plan_prompt(&world, "Gareth", &room);
        assert!(prompt.contains("apple"));
        assert!(prompt.contains("satiation=30"));
        assert!(prompt.contains("JSON array"));
        assert!(prompt.contains("get_object"));
    }
}
