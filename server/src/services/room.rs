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

//! Room administration: create, describe, doors, stairs, locks.
//!
//! Every door/stair mutation keeps the three views (`doors`, `door_ids`,
//! the Travel Point object in `objects`) in agreement on both sides of the
//! connection. Reciprocal door names that would collide with an existing
//! different link get a readable variant (`<name> (to <source-id>)`), with
//! numeric suffixes as a last resort.

use crate::resolve::{fuzzy_resolve, resolve_or_err, Resolution};
use crate::service::ServiceResult;
use crate::world::object::Object;
use crate::world::room::{DoorLockPolicy, RelationshipRule, Room};
use crate::world::World;
use tinymud_common::Payload;
use uuid::Uuid;

/// Install a door into a room, keeping all three views in agreement.
fn install_door(room: &mut Room, name: &str, target_room_id: &str) -> Uuid {
    let door_id = Uuid::new_v4();
    room.doors.insert(name.to_string(), target_room_id.to_string());
    room.door_ids.insert(name.to_string(), door_id);
    room.objects.insert(
        door_id,
        Object::travel_point(
            door_id,
            name,
            format!("A doorway named '{}'.", name),
            target_room_id,
        ),
    );
    door_id
}

/// Remove a door from a room across all three views plus any lock.
fn uninstall_door(room: &mut Room, name: &str) {
    room.doors.remove(name);
    room.door_locks.remove(name);
    if let Some(id) = room.door_ids.remove(name) {
        room.objects.remove(&id);
    }
}

/// Pick a door name for the reciprocal side. Reuses `name` when it is free
/// or already links back to `source_id`; otherwise derives a unique variant.
fn reciprocal_door_name(target: &Room, name: &str, source_id: &str) -> Option<String> {
    match target.doors.get(name) {
        None => return Some(name.to_string()),
        Some(existing) if existing == source_id => return None,
        Some(_) => {}
    }
    let base = format!("{} (to {})", name, source_id);
    if !target.doors.contains_key(&base) {
        return Some(base);
    }
    for n in 2..100 {
        let candidate = format!("{} {}", base, n);
        if !target.doors.contains_key(&candidate) {
            return Some(candidate);
        }
    }
    None
}

/// Create a room with a unique id.
pub fn create_room(world: &mut World, room_id: &str, description: &str) -> ServiceResult {
    let room_id = room_id.trim();
    if room_id.is_empty() {
        return ServiceResult::error("Room id required: /room create <id> | <description>");
    }
    if world.rooms.contains_key(room_id) {
        return ServiceResult::error(format!("Room '{}' already exists.", room_id));
    }
    world
        .rooms
        .insert(room_id.to_string(), Room::new(room_id, description));
    if world.start_room_id.is_none() {
        world.start_room_id = Some(room_id.to_string());
    }
    tracing::info!("Room '{}' created", room_id);
    ServiceResult::success(vec![Payload::system(format!(
        "Room [b]{}[/b] created.",
        room_id
    ))])
}

pub fn set_description(world: &mut World, typed_room: &str, description: &str) -> ServiceResult {
    let room_id = match resolve_or_err(typed_room, world.rooms.keys().cloned()) {
        Ok(id) => id,
        Err(e) => return ServiceResult::error(e),
    };
    let room = world.rooms.get_mut(&room_id).expect("resolved room exists");
    room.description = description.to_string();
    ServiceResult::success(vec![Payload::system(format!(
        "Description of [b]{}[/b] updated.",
        room_id
    ))])
}

/// Add a door from `source_room_id` to a target room, creating the
/// reciprocal door on the far side.
pub fn add_door(
    world: &mut World,
    source_room_id: &str,
    door_name: &str,
    typed_target: &str,
) -> ServiceResult {
    let door_name = door_name.trim();
    if door_name.is_empty() {
        return ServiceResult::error("Door name required: /room adddoor <name> | <target room>");
    }
    if !world.rooms.contains_key(source_room_id) {
        return ServiceResult::error("You are nowhere.");
    }
    let target_id = match resolve_or_err(typed_target, world.rooms.keys().cloned()) {
        Ok(id) => id,
        Err(e) => return ServiceResult::error(e),
    };
    if target_id == source_room_id {
        return ServiceResult::error("A door cannot lead back into the same room.");
    }
    if world.rooms[source_room_id].doors.contains_key(door_name) {
        return ServiceResult::error(format!("A door named '{}' already exists here.", door_name));
    }

    install_door(
        world.rooms.get_mut(source_room_id).expect("source exists"),
        door_name,
        &target_id,
    );

    let reciprocal = {
        let target = world.rooms.get(&target_id).expect("target resolved");
        reciprocal_door_name(target, door_name, source_room_id)
    };
    if let Some(reciprocal) = &reciprocal {
        install_door(
            world.rooms.get_mut(&target_id).expect("target resolved"),
            reciprocal,
            source_room_id,
        );
    }

    let mut emits = vec![Payload::system(format!(
        "Door [b]{}[/b] now leads to [b]{}[/b].",
        door_name, target_id
    ))];
    if let Some(reciprocal) = reciprocal {
        if reciprocal != door_name {
            emits.push(Payload::system(format!(
                "The far side uses the name [b]{}[/b].",
                reciprocal
            )));
        }
    }
    ServiceResult::success(emits)
}

/// Remove a door and its reciprocal on the far side.
pub fn remove_door(world: &mut World, source_room_id: &str, typed_door: &str) -> ServiceResult {
    let Some(room) = world.rooms.get(source_room_id) else {
        return ServiceResult::error("You are nowhere.");
    };
    let door_name = match resolve_or_err(typed_door, room.doors.keys().cloned()) {
        Ok(name) => name,
        Err(e) => return ServiceResult::error(e),
    };
    let target_id = room.doors[&door_name].clone();

    uninstall_door(
        world.rooms.get_mut(source_room_id).expect("room exists"),
        &door_name,
    );

    if let Some(target) = world.rooms.get_mut(&target_id) {
        // Prefer the mirrored name, then the collision variant, then any
        // remaining door that points back at the source.
        let variant_prefix = format!("{} (to ", door_name);
        let back_name = if target.doors.get(&door_name).map(String::as_str) == Some(source_room_id)
        {
            Some(door_name.clone())
        } else {
            target
                .doors
                .iter()
                .find(|(name, tgt)| {
                    tgt.as_str() == source_room_id && name.starts_with(&variant_prefix)
                })
                .or_else(|| {
                    target
                        .doors
                        .iter()
                        .find(|(_, tgt)| tgt.as_str() == source_room_id)
                })
                .map(|(name, _)| name.clone())
        };
        if let Some(back_name) = back_name {
            uninstall_door(target, &back_name);
        }
    }

    ServiceResult::success(vec![Payload::system(format!(
        "Door [b]{}[/b] removed from both sides.",
        door_name
    ))])
}

/// Link two existing rooms with explicitly named doors on each side.
pub fn link_doors(
    world: &mut World,
    typed_a: &str,
    door_a: &str,
    typed_b: &str,
    door_b: &str,
) -> ServiceResult {
    let room_a = match resolve_or_err(typed_a, world.rooms.keys().cloned()) {
        Ok(id) => id,
        Err(e) => return ServiceResult::error(e),
    };
    let room_b = match resolve_or_err(typed_b, world.rooms.keys().cloned()) {
        Ok(id) => id,
        Err(e) => return ServiceResult::error(e),
    };
    if room_a == room_b {
        return ServiceResult::error("A door cannot lead back into the same room.");
    }
    let (door_a, door_b) = (door_a.trim(), door_b.trim());
    if door_a.is_empty() || door_b.is_empty() {
        return ServiceResult::error(
            "Usage: /room linkdoor <room a> | <door a> | <room b> | <door b>",
        );
    }
    if world.rooms[&room_a].doors.contains_key(door_a) {
        return ServiceResult::error(format!("Room '{}' already has a door '{}'.", room_a, door_a));
    }
    if world.rooms[&room_b].doors.contains_key(door_b) {
        return ServiceResult::error(format!("Room '{}' already has a door '{}'.", room_b, door_b));
    }
    install_door(world.rooms.get_mut(&room_a).expect("resolved"), door_a, &room_b);
    install_door(world.rooms.get_mut(&room_b).expect("resolved"), door_b, &room_a);
    ServiceResult::success(vec![Payload::system(format!(
        "Linked [b]{}[/b]:{} <-> [b]{}[/b]:{}.",
        room_a, door_a, room_b, door_b
    ))])
}

/// Set stairs from the current room: up and/or down targets. Reciprocates
/// on the far side (their opposite direction points back).
pub fn set_stairs(
    world: &mut World,
    source_room_id: &str,
    typed_up: &str,
    typed_down: &str,
) -> ServiceResult {
    if !world.rooms.contains_key(source_room_id) {
        return ServiceResult::error("You are nowhere.");
    }
    if typed_up.is_empty() && typed_down.is_empty() {
        return ServiceResult::error("Usage: /room setstairs <up target> | <down target> ('-' to skip)");
    }

    let mut emits = Vec::new();
    for (typed, upward) in [(typed_up, true), (typed_down, false)] {
        if typed.is_empty() || typed == "-" {
            continue;
        }
        let target_id = match resolve_or_err(typed, world.rooms.keys().cloned()) {
            Ok(id) => id,
            Err(e) => return ServiceResult::error(e),
        };
        if target_id == source_room_id {
            return ServiceResult::error("Stairs cannot lead back into the same room.");
        }
        install_stairs(world, source_room_id, &target_id, upward);
        install_stairs(world, &target_id, source_room_id, !upward);
        emits.push(Payload::system(format!(
            "Stairs {} now lead to [b]{}[/b].",
            if upward { "up" } else { "down" },
            target_id
        )));
    }
    ServiceResult::success(emits)
}

/// Install one direction of stairs, keeping target/id/object agreement.
fn install_stairs(world: &mut World, room_id: &str, target_id: &str, upward: bool) {
    let Some(room) = world.rooms.get_mut(room_id) else {
        return;
    };
    // Drop any previous stairs object for this direction.
    let old_id = if upward {
        room.stairs_up_id.take()
    } else {
        room.stairs_down_id.take()
    };
    if let Some(old_id) = old_id {
        room.objects.remove(&old_id);
    }
    let stairs_id = Uuid::new_v4();
    let (name, description) = if upward {
        ("stairs up", "A staircase leading up.")
    } else {
        ("stairs down", "A staircase leading down.")
    };
    room.objects.insert(
        stairs_id,
        Object::travel_point(stairs_id, name, description, target_id),
    );
    if upward {
        room.stairs_up_to = Some(target_id.to_string());
        room.stairs_up_id = Some(stairs_id);
    } else {
        room.stairs_down_to = Some(target_id.to_string());
        room.stairs_down_id = Some(stairs_id);
    }
}

/// Set or clear a door lock policy.
///
/// Policy syntax: `clear`, or comma-separated terms of `user:<name>` and
/// `rel:<type>:<user name>`; referenced users must exist when the policy is
/// written (deleted accounts are additionally skipped at evaluation time).
pub fn lock_door(
    world: &mut World,
    source_room_id: &str,
    typed_door: &str,
    policy_text: &str,
) -> ServiceResult {
    let Some(room) = world.rooms.get(source_room_id) else {
        return ServiceResult::error("You are nowhere.");
    };
    let door_name = match resolve_or_err(typed_door, room.doors.keys().cloned()) {
        Ok(name) => name,
        Err(e) => return ServiceResult::error(e),
    };

    if policy_text.trim().eq_ignore_ascii_case("clear") {
        let room = world.rooms.get_mut(source_room_id).expect("room exists");
        room.door_locks.remove(&door_name);
        return ServiceResult::success(vec![Payload::system(format!(
            "The [b]{}[/b] is unlocked.",
            door_name
        ))]);
    }

    let mut policy = DoorLockPolicy::default();
    for term in policy_text.split(',') {
        let term = term.trim();
        if term.is_empty() {
            continue;
        }
        if let Some(name) = term.strip_prefix("user:") {
            match world.get_user_by_display_name(name.trim()) {
                Some(user) => {
                    policy.allow_ids.insert(user.user_id);
                }
                None => return ServiceResult::error(format!("No user named '{}'.", name.trim())),
            }
        } else if let Some(rest) = term.strip_prefix("rel:") {
            let mut parts = rest.splitn(2, ':');
            let rtype = parts.next().unwrap_or("").trim();
            let target = parts.next().unwrap_or("").trim();
            if rtype.is_empty() || target.is_empty() {
                return ServiceResult::error("Lock rule format: rel:<type>:<user name>");
            }
            match world.get_user_by_display_name(target) {
                Some(user) => policy.allow_rel.push(RelationshipRule {
                    rtype: rtype.to_string(),
                    to: user.user_id,
                }),
                None => return ServiceResult::error(format!("No user named '{}'.", target)),
            }
        } else {
            return ServiceResult::error(format!(
                "Unrecognized lock term '{}'. Use user:<name>, rel:<type>:<name>, or clear.",
                term
            ));
        }
    }
    if policy.is_empty() {
        return ServiceResult::error("Lock policy needs at least one user: or rel: term.");
    }

    let room = world.rooms.get_mut(source_room_id).expect("room exists");
    room.door_locks.insert(door_name.clone(), policy);
    ServiceResult::success(vec![Payload::system(format!(
        "The [b]{}[/b] is now locked.",
        door_name
    ))])
}

/// Resolve an exit name in a room over doors, stairs, and loose travel
/// points. Returns the resolved label and the target room id.
pub fn resolve_exit(room: &Room, typed: &str) -> Result<(String, String), String> {
    let names = room.exit_names();
    let stairs_names: Vec<String> = ["stairs up", "stairs down"]
        .iter()
        .filter(|n| {
            (**n == "stairs up" && room.stairs_up_to.is_some())
                || (**n == "stairs down" && room.stairs_down_to.is_some())
        })
        .map(|n| n.to_string())
        .collect();
    let mut candidates = names;
    candidates.extend(stairs_names);
    candidates.sort();
    candidates.dedup();

    let resolved = match fuzzy_resolve(typed, candidates.clone()) {
        Resolution::Resolved(name) => name,
        _ => return Err(match resolve_or_err(typed, candidates) {
            Err(e) => e,
            Ok(_) => unreachable!("resolution diverged"),
        }),
    };

    if resolved == "stairs up" {
        if let Some(target) = &room.stairs_up_to {
            return Ok((resolved, target.clone()));
        }
    }
    if resolved == "stairs down" {
        if let Some(target) = &room.stairs_down_to {
            return Ok((resolved, target.clone()));
        }
    }
    if let Some(target) = room.doors.get(&resolved) {
        return Ok((resolved, target.clone()));
    }
    // A loose travel-point object.
    for obj in room.travel_points() {
        if obj.display_name == resolved {
            if let Some(target) = &obj.link_target_room_id {
                return Ok((resolved, target.clone()));
            }
        }
    }
    Err(format!("The {} doesn't seem to lead anywhere.", resolved))
}
