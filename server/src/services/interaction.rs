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

//! Object interaction: available actions from tags, and their execution.
//!
//! The action list for an object is derived conservatively from its tag set;
//! unknown tags simply contribute nothing. "Step Away" is always offered so
//! players can cancel. Execution validates strictly and reports the specific
//! constraint on failure.

use crate::service::ServiceResult;
use crate::session::InteractionMenu;
use crate::world::object::{
    Object, TAG_CONTAINER, TAG_TRAVEL_POINT, TAG_WEAPON,
};
use crate::world::sheet::{SLOT_LEFT_HAND, SLOT_RIGHT_HAND};
use crate::world::World;
use tinymud_common::Payload;
use uuid::Uuid;

pub const ACTION_STEP_AWAY: &str = "Step Away";

/// Derive the action menu for an object as seen by `actor_id`.
pub fn actions_for_object(obj: &Object, actor_id: Option<Uuid>, held: bool) -> Vec<String> {
    let mut actions: Vec<String> = Vec::new();
    let mut push = |action: String| {
        if !actions.contains(&action) {
            actions.push(action);
        }
    };

    if obj.has_tag(TAG_TRAVEL_POINT) {
        push("Move Through".to_string());
    }
    if !obj.is_immovable() {
        if held {
            push("Drop".to_string());
        } else {
            push("Pick Up".to_string());
        }
    }
    if obj.has_tag(TAG_CONTAINER) {
        push("Open".to_string());
        push("Search".to_string());
    }
    if obj.has_tag(TAG_WEAPON) {
        push("Wield".to_string());
    }
    if obj.is_edible() {
        push("Eat".to_string());
    }
    if obj.is_drinkable() {
        push("Drink".to_string());
    }
    if obj.has_tag("cutting damage") {
        push("Cut".to_string());
    }
    for template_key in obj.craft_spot_templates() {
        push(format!("Craft {}", template_key));
    }
    if !obj.is_immovable() {
        match (obj.owner_id, actor_id) {
            (None, Some(_)) => push("Claim".to_string()),
            (Some(owner), Some(actor)) if owner == actor => push("Unclaim".to_string()),
            _ => {}
        }
    }
    push(ACTION_STEP_AWAY.to_string());
    actions
}

/// Render the numbered menu players answer with a number or a name.
pub fn format_choices(title: &str, actions: &[String]) -> String {
    let mut lines = vec![format!("[b]{}[/b]", title)];
    for (idx, action) in actions.iter().enumerate() {
        lines.push(format!("{}. {}", idx + 1, action));
    }
    lines.push("What do you wish to do?".to_string());
    lines.join("\n")
}

/// Where an object was found relative to the actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjectLocation {
    Room,
    Inventory(usize),
}

fn locate_object(world: &World, sid: &str, obj_uuid: Uuid) -> Option<ObjectLocation> {
    let player = world.players.get(sid)?;
    if let Some(room) = world.rooms.get(&player.room_id) {
        if room.objects.contains_key(&obj_uuid) {
            return Some(ObjectLocation::Room);
        }
    }
    let sheet = world.sheet_for_sid(sid)?;
    sheet
        .inventory
        .find_by_uuid(&obj_uuid)
        .map(ObjectLocation::Inventory)
}

/// Start an interaction: resolve the object in the actor's room or
/// inventory and build the menu. The caller installs the menu on the
/// session.
pub fn begin_interaction(
    world: &World,
    sid: &str,
    object_name: &str,
) -> Result<(InteractionMenu, ServiceResult), ServiceResult> {
    let Some(player) = world.players.get(sid) else {
        return Err(ServiceResult::error("Please authenticate first."));
    };
    let Some(room) = world.rooms.get(&player.room_id) else {
        return Err(ServiceResult::error("You are nowhere."));
    };

    // Candidates: room objects plus held objects, resolved by display name.
    let sheet = world.sheet_for_sid(sid);
    let mut candidates: Vec<(String, Uuid, bool)> = room
        .objects
        .values()
        .map(|o| (o.display_name.clone(), o.uuid, false))
        .collect();
    if let Some(sheet) = sheet {
        candidates.extend(
            sheet
                .inventory
                .items()
                .map(|(_, o)| (o.display_name.clone(), o.uuid, true)),
        );
    }
    let names: Vec<String> = candidates.iter().map(|(n, _, _)| n.clone()).collect();
    let resolved = match crate::resolve::resolve_or_err(object_name, names) {
        Ok(name) => name,
        Err(e) => return Err(ServiceResult::error(e)),
    };
    let (_, obj_uuid, held) = candidates
        .iter()
        .find(|(n, _, _)| n == &resolved)
        .expect("resolved name present")
        .clone();

    let obj = room
        .objects
        .get(&obj_uuid)
        .or_else(|| {
            sheet.and_then(|s| {
                s.inventory
                    .find_by_uuid(&obj_uuid)
                    .and_then(|i| s.inventory.get(i))
            })
        })
        .expect("resolved object present");

    let actor_id = world.players.get(sid).map(|p| p.user_id);
    let actions = actions_for_object(obj, actor_id, held);
    let menu = InteractionMenu {
        obj_uuid,
        obj_name: obj.display_name.clone(),
        actions: actions.clone(),
    };
    let title = format!("Interactions for {}", obj.display_name);
    let result = ServiceResult::success(vec![Payload::system(format_choices(&title, &actions))]);
    Ok((menu, result))
}

/// Match a menu reply (number, exact name, or unique prefix) to an action.
pub fn choose_action(menu: &InteractionMenu, input: &str) -> Option<String> {
    let raw = input.trim();
    let low = raw.to_lowercase();
    if matches!(low.as_str(), "cancel" | "back" | "exit" | "quit" | "step away") {
        return Some(ACTION_STEP_AWAY.to_string());
    }
    if let Ok(idx) = raw.parse::<usize>() {
        if idx >= 1 && idx <= menu.actions.len() {
            return Some(menu.actions[idx - 1].clone());
        }
        return None;
    }
    if let Some(exact) = menu.actions.iter().find(|a| a.to_lowercase() == low) {
        return Some(exact.clone());
    }
    let matches: Vec<&String> = menu
        .actions
        .iter()
        .filter(|a| a.to_lowercase().starts_with(&low))
        .collect();
    if matches.len() == 1 {
        return Some(matches[0].clone());
    }
    None
}

/// Execute a chosen action against an object.
pub fn execute_action(world: &mut World, sid: &str, obj_uuid: Uuid, action: &str) -> ServiceResult {
    let Some(player) = world.players.get(sid) else {
        return ServiceResult::error("Please authenticate first.");
    };
    let room_id = player.room_id.clone();
    let actor_id = player.user_id;
    let low = action.to_lowercase();

    if low == "step away" {
        return ServiceResult::success(vec![Payload::system("You step away.")]);
    }
    if let Some(template_key) = action.strip_prefix("Craft ") {
        return craft(world, sid, &room_id, template_key.trim());
    }

    match low.as_str() {
        "pick up" => pick_up(world, sid, &room_id, obj_uuid),
        "drop" => drop_object(world, sid, &room_id, obj_uuid),
        "wield" => wield(world, sid, &room_id, obj_uuid),
        "eat" => consume(world, sid, &room_id, obj_uuid, true),
        "drink" => consume(world, sid, &room_id, obj_uuid, false),
        "search" => search_container(world, &room_id, obj_uuid),
        "open" => open_container(world, &room_id, obj_uuid),
        "cut" => cut(world, &room_id, obj_uuid),
        "claim" => claim(world, &room_id, obj_uuid, actor_id, true),
        "unclaim" => claim(world, &room_id, obj_uuid, actor_id, false),
        other => ServiceResult::error(format!("You can't {} that.", other)),
    }
}

fn object_name(world: &World, sid: &str, room_id: &str, obj_uuid: Uuid) -> String {
    world
        .rooms
        .get(room_id)
        .and_then(|r| r.objects.get(&obj_uuid))
        .or_else(|| {
            world.sheet_for_sid(sid).and_then(|s| {
                s.inventory
                    .find_by_uuid(&obj_uuid)
                    .and_then(|slot| s.inventory.get(slot))
            })
        })
        .map(|o| o.display_name.clone())
        .unwrap_or_else(|| "object".to_string())
}

fn pick_up(world: &mut World, sid: &str, room_id: &str, obj_uuid: Uuid) -> ServiceResult {
    let Some(room) = world.rooms.get_mut(room_id) else {
        return ServiceResult::error("You are nowhere.");
    };
    let Some(obj) = room.objects.get(&obj_uuid) else {
        return ServiceResult::error("It's no longer here.");
    };
    if obj.is_immovable() {
        let name = obj.display_name.clone();
        return ServiceResult::error(format!("The {} cannot be picked up.", name));
    }
    let obj = room.objects.remove(&obj_uuid).expect("checked present");
    let name = obj.display_name.clone();
    let sheet = world
        .sheet_for_sid_mut(sid)
        .expect("authenticated player has a sheet");
    match sheet.inventory.auto_place(obj) {
        Ok(_slot) => ServiceResult::success(vec![Payload::system(format!(
            "You pick up the {}.",
            name
        ))]),
        Err(obj) => {
            // Inventory full: the object goes back where it was.
            world
                .rooms
                .get_mut(room_id)
                .expect("room still exists")
                .objects
                .insert(obj.uuid, obj);
            ServiceResult::error(format!("You have no room to carry the {}.", name))
        }
    }
}

fn drop_object(world: &mut World, sid: &str, room_id: &str, obj_uuid: Uuid) -> ServiceResult {
    let Some(sheet) = world.sheet_for_sid_mut(sid) else {
        return ServiceResult::error("Please authenticate first.");
    };
    let Some(slot) = sheet.inventory.find_by_uuid(&obj_uuid) else {
        return ServiceResult::error("You aren't carrying that.");
    };
    if sheet.equipped_weapon == Some(obj_uuid) {
        sheet.equipped_weapon = None;
    }
    let obj = sheet.inventory.remove(slot).expect("slot occupied");
    let name = obj.display_name.clone();
    let Some(room) = world.rooms.get_mut(room_id) else {
        return ServiceResult::error("You are nowhere.");
    };
    room.objects.insert(obj.uuid, obj);
    ServiceResult::success(vec![Payload::system(format!("You drop the {}.", name))])
}

fn wield(world: &mut World, sid: &str, room_id: &str, obj_uuid: Uuid) -> ServiceResult {
    let location = match locate_object(world, sid, obj_uuid) {
        Some(loc) => loc,
        None => return ServiceResult::error("It's no longer here."),
    };
    // Validate the weapon tag wherever the object currently is.
    let is_weapon = match location {
        ObjectLocation::Room => world.rooms[room_id]
            .objects
            .get(&obj_uuid)
            .map(|o| o.has_tag(TAG_WEAPON)),
        ObjectLocation::Inventory(slot) => world
            .sheet_for_sid(sid)
            .and_then(|s| s.inventory.get(slot))
            .map(|o| o.has_tag(TAG_WEAPON)),
    }
    .unwrap_or(false);
    if !is_weapon {
        let name = object_name(world, sid, room_id, obj_uuid);
        return ServiceResult::error(format!("The {} is not a weapon.", name));
    }

    let obj = match location {
        ObjectLocation::Room => world
            .rooms
            .get_mut(room_id)
            .and_then(|r| r.objects.remove(&obj_uuid)),
        ObjectLocation::Inventory(slot) => {
            let sheet = world.sheet_for_sid_mut(sid).expect("sheet exists");
            if slot <= SLOT_RIGHT_HAND {
                let name = sheet.inventory.get(slot).unwrap().display_name.clone();
                sheet.equipped_weapon = Some(obj_uuid);
                return ServiceResult::success(vec![Payload::system(format!(
                    "You are already holding the {}.",
                    name
                ))]);
            }
            sheet.inventory.remove(slot)
        }
    };
    let Some(obj) = obj else {
        return ServiceResult::error("It's no longer here.");
    };
    let name = obj.display_name.clone();

    let sheet = world.sheet_for_sid_mut(sid).expect("sheet exists");
    let hand = if sheet.inventory.get(SLOT_RIGHT_HAND).is_none() {
        Some(SLOT_RIGHT_HAND)
    } else if sheet.inventory.get(SLOT_LEFT_HAND).is_none() {
        Some(SLOT_LEFT_HAND)
    } else {
        None
    };
    match hand {
        Some(hand) => {
            sheet
                .inventory
                .place(hand, obj)
                .expect("hand slot verified empty");
            sheet.equipped_weapon = Some(obj_uuid);
            let hand_name = if hand == SLOT_RIGHT_HAND {
                "right hand"
            } else {
                "left hand"
            };
            ServiceResult::success(vec![Payload::system(format!(
                "You wield the {} in your {}.",
                name, hand_name
            ))])
        }
        None => {
            // Return the object to where it came from.
            match location {
                ObjectLocation::Room => {
                    world
                        .rooms
                        .get_mut(room_id)
                        .expect("room exists")
                        .objects
                        .insert(obj.uuid, obj);
                }
                ObjectLocation::Inventory(slot) => {
                    let sheet = world.sheet_for_sid_mut(sid).expect("sheet exists");
                    let _ = sheet.inventory.place(slot, obj);
                }
            }
            ServiceResult::error("Your hands are full.")
        }
    }
}

fn consume(
    world: &mut World,
    sid: &str,
    room_id: &str,
    obj_uuid: Uuid,
    eating: bool,
) -> ServiceResult {
    let location = match locate_object(world, sid, obj_uuid) {
        Some(loc) => loc,
        None => return ServiceResult::error("It's no longer here."),
    };
    let obj = match location {
        ObjectLocation::Room => world.rooms[room_id].objects.get(&obj_uuid).cloned(),
        ObjectLocation::Inventory(slot) => world
            .sheet_for_sid(sid)
            .and_then(|s| s.inventory.get(slot))
            .cloned(),
    };
    let Some(obj) = obj else {
        return ServiceResult::error("It's no longer here.");
    };

    let (satiation, hydration) = obj.nutrition();
    if eating && !obj.is_edible() {
        return ServiceResult::error(format!("The {} is not edible.", obj.display_name));
    }
    if !eating && !obj.is_drinkable() {
        return ServiceResult::error(format!("You can't drink the {}.", obj.display_name));
    }

    // Remove the source, then apply nutrition and spawn deconstruct outputs.
    match location {
        ObjectLocation::Room => {
            world
                .rooms
                .get_mut(room_id)
                .expect("room exists")
                .objects
                .remove(&obj_uuid);
        }
        ObjectLocation::Inventory(slot) => {
            let sheet = world.sheet_for_sid_mut(sid).expect("sheet exists");
            sheet.inventory.remove(slot);
            if sheet.equipped_weapon == Some(obj_uuid) {
                sheet.equipped_weapon = None;
            }
        }
    }

    {
        let sheet = world.sheet_for_sid_mut(sid).expect("sheet exists");
        sheet.hunger = crate::world::sheet::clamp_need(sheet.hunger + satiation as f64);
        sheet.thirst = crate::world::sheet::clamp_need(sheet.thirst + hydration as f64);
    }

    let mut spawned_names = Vec::new();
    if !obj.deconstruct_recipe.is_empty() {
        let room = world.rooms.get_mut(room_id).expect("room exists");
        for output in &obj.deconstruct_recipe {
            let instance = output.instantiate();
            spawned_names.push(instance.display_name.clone());
            room.objects.insert(instance.uuid, instance);
        }
    }

    let verb = if eating { "eat" } else { "drink" };
    let mut message = format!("You {} the {}.", verb, obj.display_name);
    if !spawned_names.is_empty() {
        message.push_str(&format!(" Left behind: {}.", spawned_names.join(", ")));
    }
    ServiceResult::success(vec![Payload::system(message)])
}

/// First search may spawn loot: every template whose `loot_location_hint`
/// matches this container's display name (case-insensitively) spawns once
/// into a free container slot. Repeat searches never spawn.
fn search_container(world: &mut World, room_id: &str, obj_uuid: Uuid) -> ServiceResult {
    let container_name = {
        let Some(obj) = world
            .rooms
            .get(room_id)
            .and_then(|r| r.objects.get(&obj_uuid))
        else {
            return ServiceResult::error("It's no longer here.");
        };
        if !obj.has_tag(TAG_CONTAINER) {
            return ServiceResult::success(vec![Payload::system("You find nothing noteworthy.")]);
        }
        if obj.container_searched {
            return ServiceResult::error(format!(
                "You've already searched the {}.",
                obj.display_name
            ));
        }
        obj.display_name.to_lowercase()
    };

    let loot: Vec<Object> = world
        .object_templates
        .values()
        .filter(|t| {
            t.loot_location_hint
                .as_deref()
                .map(|hint| hint.trim().to_lowercase() == container_name)
                .unwrap_or(false)
        })
        .map(Object::instantiate)
        .collect();

    let obj = world
        .rooms
        .get_mut(room_id)
        .and_then(|r| r.objects.get_mut(&obj_uuid))
        .expect("container still present");
    obj.container_searched = true;

    let mut found = Vec::new();
    for item in loot {
        let slots = if item.is_large() {
            &mut obj.container_large_slots
        } else {
            &mut obj.container_small_slots
        };
        if let Some(slot) = slots.iter_mut().find(|s| s.is_none()) {
            found.push(item.display_name.clone());
            *slot = Some(item);
        }
    }

    let mut message = format!("You search the {}.", obj.display_name);
    if found.is_empty() {
        message.push_str(" You don't find anything of value.");
    } else {
        message.push_str(&format!(" You find: {}!", found.join(", ")));
    }
    ServiceResult::success(vec![Payload::system(message)])
}

fn open_container(world: &mut World, room_id: &str, obj_uuid: Uuid) -> ServiceResult {
    let Some(obj) = world
        .rooms
        .get(room_id)
        .and_then(|r| r.objects.get(&obj_uuid))
    else {
        return ServiceResult::error("It's no longer here.");
    };
    if !obj.has_tag(TAG_CONTAINER) {
        return ServiceResult::error(format!("The {} can't be opened.", obj.display_name));
    }
    if !obj.container_searched {
        return ServiceResult::error(format!(
            "You should search the {} before opening it.",
            obj.display_name
        ));
    }
    let names = |slots: &[Option<Object>]| -> Vec<String> {
        slots
            .iter()
            .flatten()
            .map(|o| o.display_name.clone())
            .collect()
    };
    let small = names(&obj.container_small_slots);
    let large = names(&obj.container_large_slots);
    let content = if small.is_empty() && large.is_empty() {
        format!("You open the {}. It's empty.", obj.display_name)
    } else {
        let mut bits = Vec::new();
        if !small.is_empty() {
            bits.push(format!("Small: {}", small.join(", ")));
        }
        if !large.is_empty() {
            bits.push(format!("Large: {}", large.join(", ")));
        }
        format!("You open the {}. Inside: {}", obj.display_name, bits.join("; "))
    };
    ServiceResult::success(vec![Payload::system(content)])
}

fn cut(world: &mut World, room_id: &str, obj_uuid: Uuid) -> ServiceResult {
    let Some(room) = world.rooms.get_mut(room_id) else {
        return ServiceResult::error("You are nowhere.");
    };
    let Some(obj) = room.objects.get(&obj_uuid) else {
        return ServiceResult::error("It's no longer here.");
    };
    if obj.deconstruct_recipe.is_empty() {
        return ServiceResult::success(vec![Payload::system(format!(
            "You cut at the {} to no effect.",
            obj.display_name
        ))]);
    }
    let obj = room.objects.remove(&obj_uuid).expect("checked present");
    let mut names = Vec::new();
    for output in &obj.deconstruct_recipe {
        let instance = output.instantiate();
        names.push(instance.display_name.clone());
        room.objects.insert(instance.uuid, instance);
    }
    ServiceResult::success(vec![Payload::system(format!(
        "You cut the {} apart into: {}.",
        obj.display_name,
        names.join(", ")
    ))])
}

fn claim(
    world: &mut World,
    room_id: &str,
    obj_uuid: Uuid,
    actor_id: Uuid,
    claiming: bool,
) -> ServiceResult {
    let Some(obj) = world
        .rooms
        .get_mut(room_id)
        .and_then(|r| r.objects.get_mut(&obj_uuid))
    else {
        return ServiceResult::error("It's no longer here.");
    };
    if claiming {
        match obj.owner_id {
            Some(owner) if owner == actor_id => {
                ServiceResult::error(format!("The {} is already yours.", obj.display_name))
            }
            Some(_) => ServiceResult::error(format!(
                "The {} already belongs to someone.",
                obj.display_name
            )),
            None => {
                obj.owner_id = Some(actor_id);
                ServiceResult::success(vec![Payload::system(format!(
                    "You claim the {}.",
                    obj.display_name
                ))])
            }
        }
    } else {
        match obj.owner_id {
            Some(owner) if owner == actor_id => {
                obj.owner_id = None;
                ServiceResult::success(vec![Payload::system(format!(
                    "You release your claim on the {}.",
                    obj.display_name
                ))])
            }
            _ => ServiceResult::error(format!("The {} isn't yours to unclaim.", obj.display_name)),
        }
    }
}

/// Craft from a template at a craft spot: the actor must hold every
/// component by display-name count. Components are consumed; the crafted
/// object lands in the inventory, or the room when full.
fn craft(world: &mut World, sid: &str, room_id: &str, template_key: &str) -> ServiceResult {
    let Some(template) = world.object_templates.get(template_key).cloned() else {
        return ServiceResult::error(format!("Unknown template '{}'.", template_key));
    };

    let missing: Vec<String> = {
        let sheet = world.sheet_for_sid(sid).expect("authenticated");
        let mut missing = Vec::new();
        let mut required: std::collections::BTreeMap<String, usize> = Default::default();
        for component in &template.crafting_recipe {
            *required.entry(component.to_lowercase()).or_default() += 1;
        }
        for (component, count) in &required {
            let have = sheet.inventory.count_by_name(component);
            if have < *count {
                missing.push(format!("{} (need {}, have {})", component, count, have));
            }
        }
        missing
    };
    if !missing.is_empty() {
        return ServiceResult::error(format!(
            "You are missing components: {}.",
            missing.join(", ")
        ));
    }

    // Consume components.
    {
        let sheet = world.sheet_for_sid_mut(sid).expect("authenticated");
        for component in &template.crafting_recipe {
            let low = component.to_lowercase();
            let slot = sheet
                .inventory
                .items()
                .find(|(_, o)| o.display_name.to_lowercase() == low)
                .map(|(i, _)| i)
                .expect("component verified present");
            sheet.inventory.remove(slot);
        }
    }

    let instance = template.instantiate();
    let name = instance.display_name.clone();
    let sheet = world.sheet_for_sid_mut(sid).expect("authenticated");
    match sheet.inventory.auto_place(instance) {
        Ok(_) => ServiceResult::success(vec![Payload::system(format!(
            "You craft a {}.",
            name
        ))]),
        Err(instance) => {
            world
                .rooms
                .get_mut(room_id)
                .expect("room exists")
                .objects
                .insert(instance.uuid, instance);
            ServiceResult::success(vec![Payload::system(format!(
                "You craft a {} and set it down.",
                name
            ))])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::object::{TAG_SMALL, TAG_STOWED};
    use crate::world::room::Room;

    fn setup() -> (World, String) {
        let mut world = World::new();
        world.rooms.insert("start".into(), Room::new("start", "The beginning."));
        let uid = world.create_user("Alice", "$hash", "explorer").unwrap();
        world.add_player("sid-1", uid, Some("start".into()));
        (world, "sid-1".to_string())
    }

    fn put_in_room(world: &mut World, obj: Object) -> Uuid {
        let uuid = obj.uuid;
        world
            .rooms
            .get_mut("start")
            .unwrap()
            .objects
            .insert(uuid, obj);
        uuid
    }

    #[test]
    fn test_actions_from_tags() {
        let apple = Object::new("apple", "Crisp.")
            .with_tag(TAG_SMALL)
            .with_tag("Edible: 10");
        let actions = actions_for_object(&apple, Some(Uuid::new_v4()), false);
        assert!(actions.contains(&"Pick Up".to_string()));
        assert!(actions.contains(&"Eat".to_string()));
        assert!(!actions.contains(&"Wield".to_string()));
        assert!(!actions.contains(&"Open".to_string()));
        assert_eq!(actions.last().map(String::as_str), Some(ACTION_STEP_AWAY));
    }

    #[test]
    fn test_travel_point_not_pickable() {
        let door = Object::travel_point(Uuid::new_v4(), "oak door", "Oak.", "tavern");
        let actions = actions_for_object(&door, None, false);
        assert!(actions.contains(&"Move Through".to_string()));
        assert!(!actions.contains(&"Pick Up".to_string()));
    }

    #[test]
    fn test_pickup_slots_small_and_sets_stowed() {
        let (mut world, sid) = setup();
        let apple = Object::new("apple", "Crisp.")
            .with_tag(TAG_SMALL)
            .with_tag("Edible: 10");
        let uuid = put_in_room(&mut world, apple);

        let result = pick_up(&mut world, &sid, "start", uuid);
        assert!(result.is_success(), "{:?}", result.error);
        let sheet = world.sheet_for_sid(&sid).unwrap();
        assert_eq!(sheet.inventory.find_by_uuid(&uuid), Some(2));
        assert!(sheet.inventory.get(2).unwrap().has_tag(TAG_STOWED));
        // Hunger untouched by picking up.
        assert_eq!(sheet.hunger, 100.0);
        assert!(world.rooms["start"].objects.is_empty());
    }

    #[test]
    fn test_pickup_immovable_rejected() {
        let (mut world, sid) = setup();
        let anvil = Object::new("anvil", "Heavy.").with_tag("Immovable");
        let uuid = put_in_room(&mut world, anvil);
        let result = pick_up(&mut world, &sid, "start", uuid);
        assert!(result.error.is_some());
        assert!(world.rooms["start"].objects.contains_key(&uuid));
    }

    #[test]
    fn test_pickup_inventory_full_restores_room() {
        let (mut world, sid) = setup();
        {
            let sheet = world.sheet_for_sid_mut(&sid).unwrap();
            for _ in 0..6 {
                sheet
                    .inventory
                    .auto_place(Object::new("pebble", "").with_tag(TAG_SMALL))
                    .unwrap();
            }
        }
        let apple = Object::new("apple", "").with_tag(TAG_SMALL);
        let uuid = put_in_room(&mut world, apple);
        let result = pick_up(&mut world, &sid, "start", uuid);
        assert!(result.error.is_some());
        assert!(world.rooms["start"].objects.contains_key(&uuid));
    }

    #[test]
    fn test_wield_requires_weapon_tag() {
        let (mut world, sid) = setup();
        let apple = Object::new("apple", "").with_tag(TAG_SMALL).with_tag("Edible: 10");
        let uuid = put_in_room(&mut world, apple);
        let result = wield(&mut world, &sid, "start", uuid);
        assert!(result.error.unwrap().contains("not a weapon"));
    }

    #[test]
    fn test_wield_weapon_goes_to_hand() {
        let (mut world, sid) = setup();
        let sword = Object::new("sword", "Sharp.")
            .with_tag(TAG_WEAPON)
            .with_tag(TAG_SMALL);
        let uuid = put_in_room(&mut world, sword);
        let result = wield(&mut world, &sid, "start", uuid);
        assert!(result.is_success());
        let sheet = world.sheet_for_sid(&sid).unwrap();
        assert_eq!(sheet.inventory.find_by_uuid(&uuid), Some(SLOT_RIGHT_HAND));
        assert_eq!(sheet.equipped_weapon, Some(uuid));
        assert!(!sheet.inventory.get(SLOT_RIGHT_HAND).unwrap().has_tag(TAG_STOWED));
    }

    #[test]
    fn test_eat_applies_nutrition_and_consumes() {
        let (mut world, sid) = setup();
        world.sheet_for_sid_mut(&sid).unwrap().hunger = 50.0;
        let apple = Object::new("apple", "")
            .with_tag(TAG_SMALL)
            .with_tag("Edible: 10");
        let uuid = put_in_room(&mut world, apple);
        pick_up(&mut world, &sid, "start", uuid);

        let result = consume(&mut world, &sid, "start", uuid, true);
        assert!(result.is_success());
        let sheet = world.sheet_for_sid(&sid).unwrap();
        assert_eq!(sheet.hunger, 60.0);
        assert!(sheet.inventory.find_by_uuid(&uuid).is_none());
    }

    #[test]
    fn test_eat_clamps_at_hundred() {
        let (mut world, sid) = setup();
        world.sheet_for_sid_mut(&sid).unwrap().hunger = 95.0;
        let feast = Object::new("feast", "").with_tag("Edible: 50");
        let uuid = put_in_room(&mut world, feast);
        consume(&mut world, &sid, "start", uuid, true);
        assert_eq!(world.sheet_for_sid(&sid).unwrap().hunger, 100.0);
    }

    #[test]
    fn test_eat_spawns_deconstruct_outputs() {
        let (mut world, sid) = setup();
        let mut apple = Object::new("apple", "").with_tag("Edible: 10");
        apple.deconstruct_recipe = vec![Object::new("apple core", "Not much left.")];
        let uuid = put_in_room(&mut world, apple);
        consume(&mut world, &sid, "start", uuid, true);
        let room = &world.rooms["start"];
        assert_eq!(room.objects.len(), 1);
        assert_eq!(
            room.objects.values().next().unwrap().display_name,
            "apple core"
        );
    }

    #[test]
    fn test_search_spawns_matching_loot_once() {
        let (mut world, _sid) = setup();
        let chest = Object::new("old chest", "Banded.").with_tag(TAG_CONTAINER);
        let chest_uuid = put_in_room(&mut world, chest);
        let mut coin = Object::new("coin", "Tarnished.").with_tag(TAG_SMALL);
        coin.loot_location_hint = Some("Old Chest".to_string());
        world.object_templates.insert("coin".into(), coin);

        let result = search_container(&mut world, "start", chest_uuid);
        assert!(result.is_success());
        assert!(result.emits[0].content.contains("coin"));

        let again = search_container(&mut world, "start", chest_uuid);
        assert!(again.error.unwrap().contains("already searched"));
        let chest = &world.rooms["start"].objects[&chest_uuid];
        let held: usize = chest
            .container_small_slots
            .iter()
            .filter(|s| s.is_some())
            .count();
        assert_eq!(held, 1);
    }

    #[test]
    fn test_open_requires_prior_search() {
        let (mut world, _sid) = setup();
        let chest = Object::new("old chest", "Banded.").with_tag(TAG_CONTAINER);
        let chest_uuid = put_in_room(&mut world, chest);
        let result = open_container(&mut world, "start", chest_uuid);
        assert!(result.error.unwrap().contains("search"));

        search_container(&mut world, "start", chest_uuid);
        let result = open_container(&mut world, "start", chest_uuid);
        assert!(result.is_success());
    }

    #[test]
    fn test_claim_and_unclaim() {
        let (mut world, sid) = setup();
        let actor = world.players[&sid].user_id;
        let bed = Object::new("bed", "Straw.").with_tag("bed");
        let uuid = put_in_room(&mut world, bed);

        assert!(claim(&mut world, "start", uuid, actor, true).is_success());
        assert_eq!(world.rooms["start"].objects[&uuid].owner_id, Some(actor));
        // A second claim by someone else fails.
        let other = Uuid::new_v4();
        assert!(claim(&mut world, "start", uuid, other, true).error.is_some());
        assert!(claim(&mut world, "start", uuid, actor, false).is_success());
        assert_eq!(world.rooms["start"].objects[&uuid].owner_id, None);
    }

    #[test]
    fn test_craft_reports_missing_components() {
        let (mut world, sid) = setup();
        let mut torch = Object::new("torch", "Burning.").with_tag(TAG_SMALL);
        torch.crafting_recipe = vec!["stick".to_string(), "cloth".to_string()];
        world.object_templates.insert("torch".into(), torch);

        let result = craft(&mut world, &sid, "start", "torch");
        let error = result.error.unwrap();
        assert!(error.contains("stick"), "{}", error);
        assert!(error.contains("cloth"), "{}", error);
    }

    #[test]
    fn test_craft_consumes_and_produces() {
        let (mut world, sid) = setup();
        let mut torch = Object::new("torch", "Burning.").with_tag(TAG_SMALL);
        torch.crafting_recipe = vec!["stick".to_string()];
        world.object_templates.insert("torch".into(), torch);
        {
            let sheet = world.sheet_for_sid_mut(&sid).unwrap();
            sheet
                .inventory
                .auto_place(Object::new("stick", "").with_tag(TAG_SMALL))
                .unwrap();
        }
        let result = craft(&mut world, &sid, "start", "torch");
        assert!(result.is_success(), "{:?}", result.error);
        let sheet = world.sheet_for_sid(&sid).unwrap();
        assert_eq!(sheet.inventory.count_by_name("stick"), 0);
        assert_eq!(sheet.inventory.count_by_name("torch"), 1);
    }

    #[test]
    fn test_craft_unknown_template() {
        let (mut world, sid) = setup();
        let result = craft(&mut world, &sid, "start", "widget");
        assert!(result.error.unwrap().contains("Unknown template"));
    }

    #[test]
    fn test_begin_interaction_builds_menu() {
        let (mut world, sid) = setup();
        let apple = Object::new("apple", "Crisp.")
            .with_tag(TAG_SMALL)
            .with_tag("Edible: 10");
        put_in_room(&mut world, apple);
        let (menu, result) = begin_interaction(&world, &sid, "app").unwrap();
        assert_eq!(menu.obj_name, "apple");
        assert!(menu.actions.contains(&"Eat".to_string()));
        assert!(result.emits[0].content.contains("1."));
    }

    #[test]
    fn test_choose_action_by_number_and_prefix() {
        let menu = InteractionMenu {
            obj_uuid: Uuid::new_v4(),
            obj_name: "apple".into(),
            actions: vec!["Pick Up".into(), "Eat".into(), ACTION_STEP_AWAY.into()],
        };
        assert_eq!(choose_action(&menu, "2"), Some("Eat".to_string()));
        assert_eq!(choose_action(&menu, "pick"), Some("Pick Up".to_string()));
        assert_eq!(choose_action(&menu, "cancel"), Some(ACTION_STEP_AWAY.to_string()));
        assert_eq!(choose_action(&menu, "9"), None);
        assert_eq!(choose_action(&menu, "zzz"), None);
    }
}
