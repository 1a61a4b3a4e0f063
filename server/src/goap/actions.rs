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

//! Per-action executors for NPC plan records.
//!
//! Every execution costs one action point, success or not; a failed action
//! makes the NPC grumble audibly with a reason-specific complaint instead
//! of silently retrying forever.

use crate::config::GameConfig;
use crate::permissions::door_traversal_permitted;
use crate::services::combat::npc_attack_npc;
use crate::services::room::resolve_exit;
use crate::world::object::TAG_BED;
use crate::world::sheet::{clamp_need, PlanAction};
use crate::world::World;
use tinymud_common::Payload;
use uuid::Uuid;

/// Result of executing one plan record.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub ok: bool,
    pub reason: String,
    pub broadcasts: Vec<(String, Payload)>,
}

impl ActionOutcome {
    fn ok(broadcasts: Vec<(String, Payload)>) -> Self {
        Self {
            ok: true,
            reason: String::new(),
            broadcasts,
        }
    }

    fn fail(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: reason.into(),
            broadcasts: Vec::new(),
        }
    }
}

/// Execute one action for an NPC. The caller charges the action point.
pub fn execute_action(
    world: &mut World,
    npc_name: &str,
    room_id: &str,
    action: &PlanAction,
    config: &GameConfig,
) -> ActionOutcome {
    let mut outcome = match action.tool.as_str() {
        "get_object" => get_object(world, npc_name, room_id, action),
        "consume_object" => consume_object(world, npc_name, room_id, action),
        "emote" => emote(world, npc_name, room_id, action, config),
        "say" => say(world, npc_name, room_id, action, config),
        "claim" => claim(world, npc_name, room_id, action, true),
        "unclaim" => claim(world, npc_name, room_id, action, false),
        "sleep" => sleep(world, npc_name, room_id, action, config),
        "do_nothing" => do_nothing(npc_name, room_id),
        "move_through" => move_through(world, npc_name, room_id, action),
        "attack" => npc_attack(world, npc_name, room_id, action),
        other => ActionOutcome::fail(format!("unknown tool '{}'", other)),
    };
    if !outcome.ok {
        outcome
            .broadcasts
            .push(grumble(npc_name, room_id, action, &outcome.reason));
    }
    outcome
}

/// Reason-specific complaint broadcast on action failure.
fn grumble(
    npc_name: &str,
    room_id: &str,
    action: &PlanAction,
    reason: &str,
) -> (String, Payload) {
    let explanation = match reason {
        "locked" => "This door is locked!".to_string(),
        "room not found" => "I don't know where I am going!".to_string(),
        "object not found" => {
            let target = action.arg_str("object_name").unwrap_or("it");
            format!("I cannot find the {}!", target)
        }
        "no free slot" | "cannot carry" => "I am carrying too much!".to_string(),
        "target not found" => {
            let target = action.arg_str("target").unwrap_or("them");
            format!("I cannot find {}!", target)
        }
        other => format!("I cannot {} because {}!", action.tool, other),
    };
    (
        room_id.to_string(),
        Payload::system(format!(
            "[i]{} grumbles loudly: \"{}\"[/i]",
            npc_name, explanation
        )),
    )
}

/// Score an object name against a query: exact, prefix, substring.
fn name_score(name: &str, query: &str) -> u8 {
    let (name, query) = (name.to_lowercase(), query.to_lowercase());
    if name == query {
        3
    } else if name.starts_with(&query) {
        2
    } else if name.contains(&query) {
        1
    } else {
        0
    }
}

fn get_object(world: &mut World, npc_name: &str, room_id: &str, action: &PlanAction) -> ActionOutcome {
    let query = action.arg_str("object_name").unwrap_or("").to_string();
    let Some(room) = world.rooms.get(room_id) else {
        return ActionOutcome::fail("room not found");
    };

    let mut best: Option<(Uuid, u8)> = None;
    for obj in room.visible_objects() {
        if obj.is_immovable() {
            continue;
        }
        let score = name_score(&obj.display_name, &query);
        if score > 0 && best.map(|(_, s)| score > s).unwrap_or(true) {
            best = Some((obj.uuid, score));
        }
    }
    // Fall back to anything nutritious, matching planner intent.
    if best.is_none() {
        best = room
            .visible_objects()
            .find(|o| {
                let (sv, hv) = o.nutrition();
                !o.is_immovable() && (sv > 0 || hv > 0)
            })
            .map(|o| (o.uuid, 0));
    }
    let Some((uuid, _)) = best else {
        return ActionOutcome::fail("object not found");
    };

    let obj = world
        .rooms
        .get_mut(room_id)
        .expect("room checked")
        .objects
        .remove(&uuid)
        .expect("object listed");
    let display_name = obj.display_name.clone();
    let sheet = world
        .npc_sheets
        .get_mut(npc_name)
        .expect("ticking npc has a sheet");
    match sheet.inventory.auto_place(obj) {
        Ok(_) => ActionOutcome::ok(vec![(
            room_id.to_string(),
            Payload::system(format!("[i]{} picks up the {}[/i]", npc_name, display_name)),
        )]),
        Err(obj) => {
            world
                .rooms
                .get_mut(room_id)
                .expect("room checked")
                .objects
                .insert(obj.uuid, obj);
            ActionOutcome::fail("no free slot")
        }
    }
}

fn consume_object(
    world: &mut World,
    npc_name: &str,
    room_id: &str,
    action: &PlanAction,
) -> ActionOutcome {
    let Some(uuid) = action.arg_uuid("object_uuid") else {
        return ActionOutcome::fail("object not found");
    };
    let Some(sheet) = world.npc_sheets.get_mut(npc_name) else {
        return ActionOutcome::fail("no sheet");
    };
    let Some(slot) = sheet.inventory.find_by_uuid(&uuid) else {
        return ActionOutcome::fail("object not in inventory");
    };
    let obj = sheet.inventory.remove(slot).expect("slot occupied");
    let (satiation, hydration) = obj.nutrition();
    sheet.hunger = clamp_need(sheet.hunger + satiation as f64);
    sheet.thirst = clamp_need(sheet.thirst + hydration as f64);

    let verb = if satiation > 0 {
        "eats"
    } else if hydration > 0 {
        "drinks"
    } else {
        "consumes"
    };
    let mut broadcasts = vec![(
        room_id.to_string(),
        Payload::system(format!("[i]{} {} the {}[/i]", npc_name, verb, obj.display_name)),
    )];

    if !obj.deconstruct_recipe.is_empty() {
        if let Some(room) = world.rooms.get_mut(room_id) {
            for output in &obj.deconstruct_recipe {
                let instance = output.instantiate();
                broadcasts.push((
                    room_id.to_string(),
                    Payload::system(format!("[i]A {} is left behind.[/i]", instance.display_name)),
                ));
                room.objects.insert(instance.uuid, instance);
            }
        }
    }
    ActionOutcome::ok(broadcasts)
}

fn emote(
    world: &mut World,
    npc_name: &str,
    room_id: &str,
    action: &PlanAction,
    config: &GameConfig,
) -> ActionOutcome {
    let text = action.arg_str("message").unwrap_or("").trim().to_string();
    let content = if text.is_empty() {
        format!("[i]{} looks around, humming softly.[/i]", npc_name)
    } else {
        format!("[i]{} {}[/i]", npc_name, text)
    };
    if let Some(sheet) = world.npc_sheets.get_mut(npc_name) {
        sheet.socialization = clamp_need(sheet.socialization + config.social_refill);
    }
    ActionOutcome::ok(vec![(room_id.to_string(), Payload::system(content))])
}

fn say(
    world: &mut World,
    npc_name: &str,
    room_id: &str,
    action: &PlanAction,
    config: &GameConfig,
) -> ActionOutcome {
    let message = action.arg_str("message").unwrap_or("").trim().to_string();
    if message.is_empty() {
        return ActionOutcome::fail("nothing to say");
    }
    if let Some(sheet) = world.npc_sheets.get_mut(npc_name) {
        sheet.socialization = clamp_need(sheet.socialization + config.social_refill);
    }
    ActionOutcome::ok(vec![(
        room_id.to_string(),
        Payload::npc(npc_name, message),
    )])
}

fn claim(
    world: &mut World,
    npc_name: &str,
    room_id: &str,
    action: &PlanAction,
    claiming: bool,
) -> ActionOutcome {
    let Some(uuid) = action.arg_uuid("object_uuid") else {
        return ActionOutcome::fail("object not found");
    };
    let npc_id = world.get_or_create_npc_id(npc_name);
    let Some(obj) = world
        .rooms
        .get_mut(room_id)
        .and_then(|r| r.objects.get_mut(&uuid))
    else {
        return ActionOutcome::fail("object not found");
    };
    if claiming {
        if obj.owner_id.is_some() && obj.owner_id != Some(npc_id) {
            return ActionOutcome::fail("already owned");
        }
        obj.owner_id = Some(npc_id);
        ActionOutcome::ok(vec![(
            room_id.to_string(),
            Payload::system(format!(
                "[i]{} lays claim to the {}.[/i]",
                npc_name, obj.display_name
            )),
        )])
    } else {
        if obj.owner_id != Some(npc_id) {
            return ActionOutcome::fail("not the owner");
        }
        obj.owner_id = None;
        ActionOutcome::ok(vec![(
            room_id.to_string(),
            Payload::system(format!(
                "[i]{} abandons the {}.[/i]",
                npc_name, obj.display_name
            )),
        )])
    }
}

fn sleep(
    world: &mut World,
    npc_name: &str,
    room_id: &str,
    action: &PlanAction,
    config: &GameConfig,
) -> ActionOutcome {
    let npc_id = world.get_or_create_npc_id(npc_name);
    let Some(room) = world.rooms.get(room_id) else {
        return ActionOutcome::fail("room not found");
    };

    // The bed must be here, tagged, and owned by this NPC.
    let wanted = action.arg_uuid("bed_uuid");
    let bed = room
        .objects
        .values()
        .filter(|o| o.has_tag(TAG_BED) && o.owner_id == Some(npc_id))
        .find(|o| wanted.map(|w| o.uuid == w).unwrap_or(true));
    let Some(bed) = bed else {
        return ActionOutcome::fail("no owned bed here");
    };
    let bed_uuid = bed.uuid;
    let bed_name = bed.display_name.clone();

    let sheet = world.npc_sheets.get_mut(npc_name).expect("npc has a sheet");
    sheet.sleeping_ticks_remaining = config.sleep_ticks;
    sheet.sleeping_bed_uuid = Some(bed_uuid);
    sheet.plan_queue.clear();
    ActionOutcome::ok(vec![(
        room_id.to_string(),
        Payload::system(format!(
            "[i]{} lies down on the {} and drifts off.[/i]",
            npc_name, bed_name
        )),
    )])
}

fn do_nothing(npc_name: &str, room_id: &str) -> ActionOutcome {
    ActionOutcome::ok(vec![(
        room_id.to_string(),
        Payload::system(format!("[i]{} pauses to think.[/i]", npc_name)),
    )])
}

fn move_through(
    world: &mut World,
    npc_name: &str,
    room_id: &str,
    action: &PlanAction,
) -> ActionOutcome {
    let name = crate::resolve::strip_article(action.arg_str("name").unwrap_or("")).to_string();
    let npc_id = world.get_or_create_npc_id(npc_name);
    let Some(room) = world.rooms.get(room_id) else {
        return ActionOutcome::fail("room not found");
    };

    let name = if name.is_empty() {
        let exits = room.exit_names();
        match exits.len() {
            1 => exits.into_iter().next().expect("single exit"),
            _ => return ActionOutcome::fail("target not found"),
        }
    } else {
        name
    };

    let Ok((label, target_room_id)) = resolve_exit(room, &name) else {
        return ActionOutcome::fail("target not found");
    };
    if !world.rooms.contains_key(&target_room_id) {
        return ActionOutcome::fail("target not found");
    }
    if !door_traversal_permitted(world, npc_id, &world.rooms[room_id], &label) {
        return ActionOutcome {
            ok: false,
            reason: "locked".to_string(),
            broadcasts: vec![(
                room_id.to_string(),
                Payload::system(format!(
                    "[i]{} tries the {}, but it's locked.[/i]",
                    npc_name, label
                )),
            )],
        };
    }

    if let Some(room) = world.rooms.get_mut(room_id) {
        room.npcs.remove(npc_name);
    }
    world
        .rooms
        .get_mut(&target_room_id)
        .expect("target checked")
        .npcs
        .insert(npc_name.to_string());
    if let Some(sheet) = world.npc_sheets.get_mut(npc_name) {
        sheet.add_memory("explored_exit", &label);
    }

    ActionOutcome::ok(vec![
        (
            room_id.to_string(),
            Payload::system(format!("{} leaves through the {}.", npc_name, label)),
        ),
        (
            target_room_id,
            Payload::system(format!("{} enters.", npc_name)),
        ),
    ])
}

/// The `attack` record is produced only by the autonomy rivalry impulse;
/// it is not in the adapter-facing tool set, and adapter responses carrying
/// it are dropped at plan validation. The target must name an NPC on the
/// room roster; players are never valid targets.
fn npc_attack(
    world: &mut World,
    npc_name: &str,
    room_id: &str,
    action: &PlanAction,
) -> ActionOutcome {
    let Some(target) = action.arg_str("target").map(String::from) else {
        return ActionOutcome::fail("target not found");
    };
    let on_roster = world
        .rooms
        .get(room_id)
        .map(|r| r.npcs.contains(&target))
        .unwrap_or(false);
    if !on_roster || !world.npc_sheets.contains_key(&target) {
        return ActionOutcome::fail("target not found");
    }
    let result = npc_attack_npc(world, npc_name, room_id, &target);
    if let Some(error) = result.error {
        return ActionOutcome::fail(error);
    }
    ActionOutcome::ok(result.broadcasts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::object::Object;
    use crate::world::room::Room;
    use crate::world::sheet::CharacterSheet;
    use serde_json::json;

    fn setup(npc: &str) -> World {
        let mut world = World::new();
        world.rooms.insert("start".into(), Room::new("start", "Here."));
        world
            .npc_sheets
            .insert(npc.to_string(), CharacterSheet::new(npc, "An NPC."));
        world.get_or_create_npc_id(npc);
        world.rooms.get_mut("start").unwrap().npcs.insert(npc.to_string());
        world
    }

    #[test]
    fn test_get_then_consume_restores_hunger() {
        let mut world = setup("Gareth");
        world.npc_sheets.get_mut("Gareth").unwrap().hunger = 20.0;
        let apple = Object::new("apple", "").with_tag("small").with_tag("Edible: 30");
        let apple_uuid = apple.uuid;
        world.rooms.get_mut("start").unwrap().objects.insert(apple.uuid, apple);
        let config = GameConfig::default();

        let get = PlanAction::new("get_object", json!({"object_name": "apple"}));
        let outcome = execute_action(&mut world, "Gareth", "start", &get, &config);
        assert!(outcome.ok, "{}", outcome.reason);
        assert!(world.rooms["start"].objects.is_empty());

        let eat = PlanAction::new(
            "consume_object",
            json!({"object_uuid": apple_uuid.to_string()}),
        );
        let outcome = execute_action(&mut world, "Gareth", "start", &eat, &config);
        assert!(outcome.ok, "{}", outcome.reason);
        let sheet = &world.npc_sheets["Gareth"];
        assert_eq!(sheet.hunger, 50.0);
        assert!(sheet.inventory.find_by_uuid(&apple_uuid).is_none());
    }

    #[test]
    fn test_get_missing_object_grumbles() {
        let mut world = setup("Gareth");
        let config = GameConfig::default();
        let get = PlanAction::new("get_object", json!({"object_name": "feast"}));
        let outcome = execute_action(&mut world, "Gareth", "start", &get, &config);
        assert!(!outcome.ok);
        let complaint = &outcome.broadcasts.last().unwrap().1.content;
        assert!(complaint.contains("grumbles"), "{}", complaint);
        assert!(complaint.contains("feast"), "{}", complaint);
    }

    #[test]
    fn test_emote_refills_socialization() {
        let mut world = setup("Gareth");
        world.npc_sheets.get_mut("Gareth").unwrap().socialization = 40.0;
        let config = GameConfig::default();
        let emote = PlanAction::new("emote", json!({"message": "waves."}));
        let outcome = execute_action(&mut world, "Gareth", "start", &emote, &config);
        assert!(outcome.ok);
        assert_eq!(world.npc_sheets["Gareth"].socialization, 50.0);
        assert!(outcome.broadcasts[0].1.content.contains("[i]Gareth waves.[/i]"));
    }

    #[test]
    fn test_say_uses_npc_payload() {
        let mut world = setup("Gareth");
        let config = GameConfig::default();
        let say = PlanAction::new("say", json!({"message": "Evening, all."}));
        let outcome = execute_action(&mut world, "Gareth", "start", &say, &config);
        assert!(outcome.ok);
        let payload = &outcome.broadcasts[0].1;
        assert_eq!(payload.name.as_deref(), Some("Gareth"));
    }

    #[test]
    fn test_sleep_requires_owned_bed() {
        let mut world = setup("Gareth");
        let bed = Object::new("straw bed", "").with_tag("bed");
        let bed_uuid = bed.uuid;
        world.rooms.get_mut("start").unwrap().objects.insert(bed.uuid, bed);
        let config = GameConfig::default();

        // Unowned: sleeping fails.
        let sleep_action = PlanAction::new("sleep", json!({"bed_uuid": bed_uuid.to_string()}));
        let outcome = execute_action(&mut world, "Gareth", "start", &sleep_action, &config);
        assert!(!outcome.ok);

        // Claim it, then sleep.
        let claim_action = PlanAction::new("claim", json!({"object_uuid": bed_uuid.to_string()}));
        assert!(execute_action(&mut world, "Gareth", "start", &claim_action, &config).ok);
        let outcome = execute_action(&mut world, "Gareth", "start", &sleep_action, &config);
        assert!(outcome.ok, "{}", outcome.reason);
        let sheet = &world.npc_sheets["Gareth"];
        assert_eq!(sheet.sleeping_ticks_remaining, config.sleep_ticks);
        assert_eq!(sheet.sleeping_bed_uuid, Some(bed_uuid));
    }

    #[test]
    fn test_move_through_locked_door() {
        let mut world = setup("Gareth");
        world.rooms.insert("alley".into(), Room::new("alley", "Narrow."));
        crate::services::room::add_door(&mut world, "start", "side door", "alley");
        let _warden = world.create_user("Warden", "$h", "").unwrap();
        crate::services::room::lock_door(&mut world, "start", "side door", "user:Warden");
        let config = GameConfig::default();

        let action = PlanAction::new("move_through", json!({"name": "side door"}));
        let outcome = execute_action(&mut world, "Gareth", "start", &action, &config);
        assert!(!outcome.ok);
        assert_eq!(outcome.reason, "locked");
        assert!(world.rooms["start"].npcs.contains("Gareth"));
        assert!(outcome.broadcasts[0].1.content.contains("locked"));
    }

    #[test]
    fn test_move_through_updates_rosters_and_memory() {
        let mut world = setup("Gareth");
        world.rooms.insert("alley".into(), Room::new("alley", "Narrow."));
        crate::services::room::add_door(&mut world, "start", "side door", "alley");
        let config = GameConfig::default();

        let action = PlanAction::new("move_through", json!({"name": "the side"}));
        let outcome = execute_action(&mut world, "Gareth", "start", &action, &config);
        assert!(outcome.ok, "{}", outcome.reason);
        assert!(!world.rooms["start"].npcs.contains("Gareth"));
        assert!(world.rooms["alley"].npcs.contains("Gareth"));
        assert!(world.npc_sheets["Gareth"].remembers("explored_exit", "side door"));
        // Departure before arrival.
        assert!(outcome.broadcasts[0].1.content.contains("leaves"));
        assert!(outcome.broadcasts[1].1.content.contains("enters"));
    }

    #[test]
    fn test_unknown_tool_fails() {
        let mut world = setup("Gareth");
        let config = GameConfig::default();
        let action = PlanAction::new("teleport", json!({}));
        let outcome = execute_action(&mut world, "Gareth", "start", &action, &config);
        assert!(!outcome.ok);
    }

    #[test]
    fn test_attack_record_targets_npcs_only() {
        let mut world = setup("RedGuard");
        world
            .npc_sheets
            .insert("BlueScout".into(), CharacterSheet::new("BlueScout", "Wary."));
        world.get_or_create_npc_id("BlueScout");
        world.rooms.get_mut("start").unwrap().npcs.insert("BlueScout".into());
        let uid = world.create_user("Alice", "$h", "").unwrap();
        world.add_player("s1", uid, Some("start".into()));
        let config = GameConfig::default();

        // A player display name never resolves through this path.
        let action = PlanAction::new("attack", json!({"target": "Alice"}));
        let outcome = execute_action(&mut world, "RedGuard", "start", &action, &config);
        assert!(!outcome.ok);
        assert_eq!(world.sheet_for_sid("s1").unwrap().hp, 10);

        // An NPC on the roster does.
        let pre_hp = world.npc_sheets["BlueScout"].hp;
        let action = PlanAction::new("attack", json!({"target": "BlueScout"}));
        let outcome = execute_action(&mut world, "RedGuard", "start", &action, &config);
        assert!(outcome.ok, "{}", outcome.reason);
        assert!(world.npc_sheets["BlueScout"].hp < pre_hp);
    }
}
