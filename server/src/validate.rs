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

//! Integrity auditing and cleanup.
//!
//! The auditor runs on load and on demand, producing textual issues and a
//! health score. Cleanup repairs what it safely can: clamping ranges,
//! dropping malformed plan entries, resetting inconsistent sleep state, and
//! removing references to deleted users from relationships and door locks.

use crate::world::object::{Object, TAG_IMMOVABLE, TAG_TRAVEL_POINT};
use crate::world::sheet::{CharacterSheet, INVENTORY_SLOTS, LARGE_SLOTS, SMALL_SLOTS};
use crate::world::World;
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

/// Audit outcome: issues found and an overall health score in [0, 100].
#[derive(Debug, Clone)]
pub struct AuditReport {
    pub issues: Vec<String>,
    pub health_score: f64,
    /// Total checks performed; the score is derived from this.
    pub checks: usize,
}

impl AuditReport {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Run the full integrity audit.
pub fn audit_world(world: &World) -> AuditReport {
    let mut issues = Vec::new();
    let mut checks = 0usize;

    check_uuid_uniqueness(world, &mut issues, &mut checks);
    check_referential(world, &mut issues, &mut checks);
    check_reciprocal_doors(world, &mut issues, &mut checks);
    check_reciprocal_stairs(world, &mut issues, &mut checks);
    check_travel_point_tags(world, &mut issues, &mut checks);
    check_inventories(world, &mut issues, &mut checks);
    check_needs_bounds(world, &mut issues, &mut checks);

    let health_score = if checks == 0 {
        100.0
    } else {
        (100.0 - issues.len() as f64 * 100.0 / checks as f64).max(0.0)
    };
    AuditReport {
        issues,
        health_score,
        checks,
    }
}

/// UUIDs must be globally unique across rooms, objects (room-held,
/// inventory-held, container-held), NPCs, and users.
fn check_uuid_uniqueness(world: &World, issues: &mut Vec<String>, checks: &mut usize) {
    let mut seen: BTreeMap<Uuid, String> = BTreeMap::new();
    let mut record = |uuid: Uuid, site: String, issues: &mut Vec<String>, checks: &mut usize| {
        *checks += 1;
        if let Some(previous) = seen.insert(uuid, site.clone()) {
            issues.push(format!(
                "duplicate UUID {} at {} and {}",
                uuid, previous, site
            ));
        }
    };

    fn object_uuids(obj: &Object, out: &mut Vec<(Uuid, String)>, site: &str) {
        out.push((obj.uuid, format!("{} object '{}'", site, obj.display_name)));
        for slot in obj
            .container_small_slots
            .iter()
            .chain(obj.container_large_slots.iter())
            .flatten()
        {
            object_uuids(slot, out, &format!("{} container", site));
        }
    }

    let mut uuids: Vec<(Uuid, String)> = Vec::new();
    for (room_id, room) in &world.rooms {
        uuids.push((room.uuid, format!("room '{}'", room_id)));
        for obj in room.objects.values() {
            object_uuids(obj, &mut uuids, &format!("room '{}'", room_id));
        }
    }
    for (name, id) in &world.npc_ids {
        uuids.push((*id, format!("npc '{}'", name)));
    }
    for (uid, user) in &world.users {
        uuids.push((*uid, format!("user '{}'", user.display_name)));
        for (slot, obj) in user.sheet.inventory.items() {
            object_uuids(
                obj,
                &mut uuids,
                &format!("user '{}' slot {}", user.display_name, slot),
            );
        }
    }
    for (name, sheet) in &world.npc_sheets {
        for (slot, obj) in sheet.inventory.items() {
            object_uuids(obj, &mut uuids, &format!("npc '{}' slot {}", name, slot));
        }
    }

    for (uuid, site) in uuids {
        record(uuid, site, issues, checks);
    }
}

/// Players must stand in existing rooms; every sheet-holding NPC must have
/// an id mapping.
fn check_referential(world: &World, issues: &mut Vec<String>, checks: &mut usize) {
    for (sid, player) in &world.players {
        *checks += 1;
        if !world.rooms.contains_key(&player.room_id) {
            issues.push(format!(
                "player session '{}' references missing room '{}'",
                sid, player.room_id
            ));
        }
    }
    for name in world.npc_sheets.keys() {
        *checks += 1;
        if !world.npc_ids.contains_key(name) {
            issues.push(format!("npc '{}' has a sheet but no id mapping", name));
        }
    }
}

fn door_object_matches(room: &crate::world::Room, door_name: &str, target: &str) -> bool {
    room.door_ids
        .get(door_name)
        .and_then(|id| room.objects.get(id))
        .map(|obj| {
            obj.has_tag(TAG_IMMOVABLE)
                && obj.has_tag(TAG_TRAVEL_POINT)
                && obj.link_target_room_id.as_deref() == Some(target)
        })
        .unwrap_or(false)
}

/// Every door must have a far side pointing back, and both sides' door
/// objects must carry the travel tags and matching link targets.
fn check_reciprocal_doors(world: &World, issues: &mut Vec<String>, checks: &mut usize) {
    for (room_id, room) in &world.rooms {
        for (door_name, target_id) in &room.doors {
            *checks += 1;
            match world.rooms.get(target_id) {
                None => {
                    issues.push(format!(
                        "door '{}' in room '{}' targets missing room '{}'",
                        door_name, room_id, target_id
                    ));
                    continue;
                }
                Some(target) => {
                    if !target.doors.values().any(|back| back == room_id) {
                        issues.push(format!(
                            "door '{}' in room '{}' has no reciprocal door in '{}'",
                            door_name, room_id, target_id
                        ));
                    }
                }
            }
            if !door_object_matches(room, door_name, target_id) {
                issues.push(format!(
                    "door '{}' in room '{}' lacks a consistent travel-point object",
                    door_name, room_id
                ));
            }
        }
    }
}

fn check_reciprocal_stairs(world: &World, issues: &mut Vec<String>, checks: &mut usize) {
    for (room_id, room) in &world.rooms {
        for (target, upward) in [(&room.stairs_up_to, true), (&room.stairs_down_to, false)] {
            let Some(target_id) = target else { continue };
            *checks += 1;
            match world.rooms.get(target_id) {
                None => {
                    issues.push(format!(
                        "stairs in room '{}' target missing room '{}'",
                        room_id, target_id
                    ));
                }
                Some(target_room) => {
                    let back = if upward {
                        &target_room.stairs_down_to
                    } else {
                        &target_room.stairs_up_to
                    };
                    if back.as_deref() != Some(room_id.as_str()) {
                        issues.push(format!(
                            "stairs {} from '{}' to '{}' are not reciprocated",
                            if upward { "up" } else { "down" },
                            room_id,
                            target_id
                        ));
                    }
                }
            }
            let id = if upward {
                room.stairs_up_id
            } else {
                room.stairs_down_id
            };
            let object_ok = id
                .and_then(|id| room.objects.get(&id))
                .map(|obj| {
                    obj.has_tag(TAG_IMMOVABLE)
                        && obj.has_tag(TAG_TRAVEL_POINT)
                        && obj.link_target_room_id.as_deref() == Some(target_id.as_str())
                })
                .unwrap_or(false);
            if !object_ok {
                issues.push(format!(
                    "stairs {} in room '{}' lack a consistent travel-point object",
                    if upward { "up" } else { "down" },
                    room_id
                ));
            }
        }
    }
}

/// Travel Point implies Immovable plus a valid link target.
fn check_travel_point_tags(world: &World, issues: &mut Vec<String>, checks: &mut usize) {
    for (room_id, room) in &world.rooms {
        for obj in room.objects.values() {
            if !obj.has_tag(TAG_TRAVEL_POINT) {
                continue;
            }
            *checks += 1;
            if !obj.has_tag(TAG_IMMOVABLE) {
                issues.push(format!(
                    "travel point '{}' in room '{}' is not Immovable",
                    obj.display_name, room_id
                ));
            }
            let link_valid = obj
                .link_target_room_id
                .as_ref()
                .map(|t| world.rooms.contains_key(t))
                .unwrap_or(false);
            if !link_valid {
                issues.push(format!(
                    "travel point '{}' in room '{}' has no valid link target",
                    obj.display_name, room_id
                ));
            }
        }
    }
}

fn check_inventory(owner: &str, sheet: &CharacterSheet, issues: &mut Vec<String>, checks: &mut usize) {
    *checks += 1;
    if sheet.inventory.slots.len() != INVENTORY_SLOTS {
        issues.push(format!(
            "{} inventory has {} slots, expected {}",
            owner,
            sheet.inventory.slots.len(),
            INVENTORY_SLOTS
        ));
        return;
    }
    let mut seen: HashSet<Uuid> = HashSet::new();
    for (index, obj) in sheet.inventory.items() {
        if !seen.insert(obj.uuid) {
            issues.push(format!(
                "{} inventory holds UUID {} in more than one slot",
                owner, obj.uuid
            ));
        }
        if SMALL_SLOTS.contains(&index) && !obj.is_small() {
            issues.push(format!(
                "{} slot {} holds non-small object '{}'",
                owner, index, obj.display_name
            ));
        }
        if LARGE_SLOTS.contains(&index) && !obj.is_large() {
            issues.push(format!(
                "{} slot {} holds non-large object '{}'",
                owner, index, obj.display_name
            ));
        }
    }
}

fn check_inventories(world: &World, issues: &mut Vec<String>, checks: &mut usize) {
    for user in world.users.values() {
        check_inventory(
            &format!("user '{}'", user.display_name),
            &user.sheet,
            issues,
            checks,
        );
    }
    for (name, sheet) in &world.npc_sheets {
        check_inventory(&format!("npc '{}'", name), sheet, issues, checks);
    }
}

fn check_needs_bounds(world: &World, issues: &mut Vec<String>, checks: &mut usize) {
    let sheets = world
        .npc_sheets
        .iter()
        .map(|(name, sheet)| (format!("npc '{}'", name), sheet))
        .chain(
            world
                .users
                .values()
                .map(|u| (format!("user '{}'", u.display_name), &u.sheet)),
        );
    for (owner, sheet) in sheets {
        *checks += 1;
        for (need, value) in [
            ("hunger", sheet.hunger),
            ("thirst", sheet.thirst),
            ("socialization", sheet.socialization),
            ("sleep", sheet.sleep),
        ] {
            if !(0.0..=100.0).contains(&value) || value.is_nan() {
                issues.push(format!("{} {} out of range: {}", owner, need, value));
            }
        }
        if sheet.action_points < 0 {
            issues.push(format!(
                "{} action_points negative: {}",
                owner, sheet.action_points
            ));
        }
        for (axis, value) in &sheet.matrix {
            if !(-10..=10).contains(value) {
                issues.push(format!("{} matrix axis {} out of range: {}", owner, axis, value));
            }
        }
    }
}

/// Repair what can be repaired, returning a note per action taken.
pub fn cleanup_world(world: &mut World) -> Vec<String> {
    let mut notes = Vec::new();

    // Clamp needs and matrix axes; drop malformed plan entries.
    let names: Vec<String> = world.npc_sheets.keys().cloned().collect();
    for name in &names {
        let room_id = world.find_npc_room(name).map(String::from);
        if let Some(room_id) = room_id {
            notes.extend(crate::goap::enforce_planner_invariants(world, name, &room_id));
        }
    }
    let sheets: Vec<&mut CharacterSheet> = {
        let user_sheets = world.users.values_mut().map(|u| &mut u.sheet);
        world.npc_sheets.values_mut().chain(user_sheets).collect()
    };
    fn clamp_field(value: &mut f64) -> bool {
        if (0.0..=100.0).contains(value) && !value.is_nan() {
            return false;
        }
        *value = if value.is_nan() {
            100.0
        } else {
            value.clamp(0.0, 100.0)
        };
        true
    }
    for sheet in sheets {
        let owner = sheet.display_name.clone();
        for (label, changed) in [
            ("hunger", clamp_field(&mut sheet.hunger)),
            ("thirst", clamp_field(&mut sheet.thirst)),
            ("socialization", clamp_field(&mut sheet.socialization)),
            ("sleep", clamp_field(&mut sheet.sleep)),
        ] {
            if changed {
                notes.push(format!("clamped {} for '{}'", label, owner));
            }
        }
        for value in sheet.matrix.values_mut() {
            if !(-10..=10).contains(value) {
                *value = (*value).clamp(-10, 10);
                notes.push(format!("clamped matrix axis for '{}'", owner));
            }
        }
        let before = sheet.plan_queue.len();
        sheet.plan_queue.retain(|a| a.is_well_formed());
        if sheet.plan_queue.len() != before {
            notes.push(format!("dropped malformed plan entries for '{}'", owner));
        }
        if sheet.action_points < 0 {
            sheet.action_points = 0;
            notes.push(format!("reset action points for '{}'", owner));
        }
    }

    // Remove orphan references to deleted users.
    let live: HashSet<Uuid> = world.users.keys().copied().collect();
    let npc_ids: HashSet<Uuid> = world.npc_ids.values().copied().collect();
    let known = |id: &Uuid| live.contains(id) || npc_ids.contains(id);

    let before = world.relationships.len();
    world.relationships.retain(|source, _| known(source));
    for edges in world.relationships.values_mut() {
        edges.retain(|target, _| known(target));
    }
    world.relationships.retain(|_, edges| !edges.is_empty());
    if world.relationships.len() != before {
        notes.push("removed relationship entries for deleted entities".to_string());
    }

    for room in world.rooms.values_mut() {
        for (door, policy) in room.door_locks.iter_mut() {
            let before = policy.allow_rel.len() + policy.allow_ids.len();
            policy.allow_ids.retain(|id| known(id));
            policy.allow_rel.retain(|rule| live.contains(&rule.to));
            if policy.allow_rel.len() + policy.allow_ids.len() != before {
                notes.push(format!(
                    "pruned deleted users from lock on '{}' in room '{}'",
                    door, room.id
                ));
            }
        }
    }

    notes
}
