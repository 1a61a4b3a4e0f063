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

//! Combat: attack, damage, morale/yield, death, flee.
//!
//! Damage is `max(1, strength/2 + weapon_damage - armor_defense)`, with
//! equipment contributing zero when absent. A hit NPC that survives checks
//! morale: at or below 30% health, or on a failed roll
//! (`rand(1..=100) + morale + confidence - aggression < 50`), it yields and
//! stops retaliating. Dead NPCs leave the room's roster but keep their
//! sheet. Dead players keep only `/help`, `/who`, `/look`.
//!
//! Two entry points exist: `attack` resolves a player-initiated attack
//! against anyone in the room, and `npc_attack_npc` serves the autonomy
//! rivalry impulse and only ever targets NPCs.

use crate::permissions::door_traversal_permitted;
use crate::resolve::resolve_or_err;
use crate::service::ServiceResult;
use crate::world::sheet::CharacterSheet;
use crate::world::World;
use rand::Rng;
use tinymud_common::Payload;

/// A resolved attack target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetRef {
    Player(String),
    Npc(String),
}

fn weapon_damage(sheet: &CharacterSheet) -> i32 {
    sheet
        .equipped_weapon
        .and_then(|uuid| {
            sheet
                .inventory
                .find_by_uuid(&uuid)
                .and_then(|slot| sheet.inventory.get(slot))
        })
        .and_then(|obj| obj.weapon_damage)
        .unwrap_or(0)
}

fn armor_defense(sheet: &CharacterSheet) -> i32 {
    sheet
        .equipped_armor
        .and_then(|uuid| {
            sheet
                .inventory
                .find_by_uuid(&uuid)
                .and_then(|slot| sheet.inventory.get(slot))
        })
        .and_then(|obj| obj.armor_defense)
        .unwrap_or(0)
}

/// The damage formula, floor of one point.
pub fn damage_for(attacker: &CharacterSheet, target: &CharacterSheet) -> i32 {
    (attacker.strength / 2 + weapon_damage(attacker) - armor_defense(target)).max(1)
}

/// Whether a surviving NPC yields after a hit, given the morale roll.
pub fn yield_check(target: &CharacterSheet, roll: i32) -> bool {
    let low_hp = target.hp <= ((target.max_hp * 3) / 10).max(1);
    low_hp || roll + target.morale + target.confidence - target.aggression < 50
}

/// Resolve and perform a player-initiated attack.
pub fn attack(world: &mut World, sid: &str, target_token: &str) -> ServiceResult {
    let Some(player) = world.players.get(sid) else {
        return ServiceResult::error("Please authenticate first.");
    };
    let room_id = player.room_id.clone();
    let Some(sheet) = world.sheet_for_sid(sid) else {
        return ServiceResult::error("You have no character sheet.");
    };
    let attacker_name = sheet.display_name.clone();
    if sheet.is_dead {
        return ServiceResult::error("You are dead and cannot act.");
    }
    if sheet.yielded {
        return ServiceResult::error("You have yielded; you cannot attack.");
    }
    let Some(room) = world.rooms.get(&room_id) else {
        return ServiceResult::error("You are nowhere.");
    };

    // Candidates: living players in the room (not the attacker) and NPCs
    // with sheets.
    let mut refs: Vec<(String, TargetRef)> = Vec::new();
    for other_sid in &room.players {
        if other_sid.as_str() == sid {
            continue;
        }
        if let Some(other) = world.sheet_for_sid(other_sid) {
            if !other.is_dead {
                refs.push((
                    other.display_name.clone(),
                    TargetRef::Player(other_sid.clone()),
                ));
            }
        }
    }
    for npc_name in &room.npcs {
        if world.npc_sheets.contains_key(npc_name) {
            refs.push((npc_name.clone(), TargetRef::Npc(npc_name.clone())));
        }
    }
    if refs.is_empty() {
        return ServiceResult::error("No valid targets here.");
    }

    let resolved = match resolve_or_err(target_token, refs.iter().map(|(n, _)| n.clone())) {
        Ok(name) => name,
        Err(e) => return ServiceResult::error(e),
    };
    let target_ref = refs
        .iter()
        .find(|(n, _)| n == &resolved)
        .map(|(_, r)| r.clone())
        .expect("resolved target present");

    let attacker_sheet = world.sheet_for_sid(sid).expect("checked above").clone();
    let target_sheet = match &target_ref {
        TargetRef::Player(other_sid) => world.sheet_for_sid(other_sid).expect("listed").clone(),
        TargetRef::Npc(name) => world.npc_sheets[name.as_str()].clone(),
    };
    if target_sheet.is_dead {
        return ServiceResult::error(format!("{} is already dead.", target_sheet.display_name));
    }
    if target_sheet.yielded {
        return ServiceResult::error(format!(
            "{} has yielded and is not fighting.",
            target_sheet.display_name
        ));
    }

    let dmg = damage_for(&attacker_sheet, &target_sheet);
    let roll = rand::thread_rng().gen_range(1..=100);
    apply_attack(world, &attacker_name, &room_id, &target_ref, dmg, roll, Some(sid))
}

/// NPC-on-NPC attack serving the autonomy rivalry impulse. The target must
/// be a living, unyielded NPC present in the room; players are never valid
/// targets through this path.
pub fn npc_attack_npc(
    world: &mut World,
    attacker_name: &str,
    room_id: &str,
    target_npc: &str,
) -> ServiceResult {
    let Some(attacker_sheet) = world.npc_sheets.get(attacker_name) else {
        return ServiceResult::error("Attacker NPC not found.");
    };
    if attacker_sheet.is_dead {
        return ServiceResult::error("You are dead and cannot act.");
    }
    if attacker_sheet.yielded {
        return ServiceResult::error("You have yielded; you cannot attack.");
    }
    let Some(room) = world.rooms.get(room_id) else {
        return ServiceResult::error("You are nowhere.");
    };
    if !room.npcs.contains(target_npc) {
        return ServiceResult::error("No such NPC here.");
    }
    let Some(target_sheet) = world.npc_sheets.get(target_npc) else {
        return ServiceResult::error("No such NPC here.");
    };
    if target_sheet.is_dead {
        return ServiceResult::error(format!("{} is already dead.", target_npc));
    }
    if target_sheet.yielded {
        return ServiceResult::error(format!("{} has yielded and is not fighting.", target_npc));
    }

    let attacker_sheet = &world.npc_sheets[attacker_name];
    let dmg = damage_for(attacker_sheet, target_sheet);
    let roll = rand::thread_rng().gen_range(1..=100);
    apply_attack(
        world,
        attacker_name,
        room_id,
        &TargetRef::Npc(target_npc.to_string()),
        dmg,
        roll,
        None,
    )
}

/// Apply a resolved attack with a known damage amount and morale roll.
/// Split from the entry points so the roll is injectable.
pub fn apply_attack(
    world: &mut World,
    attacker_name: &str,
    room_id: &str,
    target_ref: &TargetRef,
    dmg: i32,
    roll: i32,
    attacker_sid: Option<&str>,
) -> ServiceResult {
    let target_sheet = match target_ref {
        TargetRef::Player(sid) => world.sheet_for_sid_mut(sid),
        TargetRef::Npc(name) => world.npc_sheets.get_mut(name),
    };
    let Some(target_sheet) = target_sheet else {
        return ServiceResult::error("Target is gone.");
    };

    let pre_hp = target_sheet.hp;
    target_sheet.hp = (target_sheet.hp - dmg).max(0);
    let target_name = target_sheet.display_name.clone();
    let died = target_sheet.hp == 0;
    let mut yielded_now = false;
    if died {
        target_sheet.is_dead = true;
    } else if matches!(target_ref, TargetRef::Npc(_)) && yield_check(target_sheet, roll) {
        target_sheet.yielded = true;
        yielded_now = true;
    }

    let mut emits = Vec::new();
    let mut broadcasts = Vec::new();
    if attacker_sid.is_some() {
        emits.push(Payload::system(format!(
            "You attack {} for {} damage (HP {} -> {}).",
            target_name,
            dmg,
            pre_hp,
            pre_hp - dmg.min(pre_hp)
        )));
    }
    broadcasts.push((
        room_id.to_string(),
        Payload::system(format!(
            "{} attacks {} for {} damage.",
            attacker_name, target_name, dmg
        )),
    ));

    if died {
        let death_msg = match target_ref {
            TargetRef::Player(_) => format!("{} dies! Permadeath.", target_name),
            TargetRef::Npc(_) => format!("{} is slain.", target_name),
        };
        emits.push(Payload::system(death_msg.clone()));
        broadcasts.push((room_id.to_string(), Payload::system(death_msg)));
        // A slain NPC leaves the roster; the sheet is retained for history.
        if let TargetRef::Npc(name) = target_ref {
            if let Some(room) = world.rooms.get_mut(room_id) {
                room.npcs.remove(name);
            }
        }
    } else if yielded_now {
        let yield_msg = format!("{} yields! They will not continue fighting.", target_name);
        emits.push(Payload::system(yield_msg.clone()));
        broadcasts.push((room_id.to_string(), Payload::system(yield_msg)));
    }

    ServiceResult::success_with(emits, broadcasts)
}

/// Flee to a random adjacent room. Locked exits are filtered out before the
/// random choice; with nothing permitted the flee fails without moving.
pub fn flee(world: &mut World, sid: &str) -> ServiceResult {
    let Some(player) = world.players.get(sid) else {
        return ServiceResult::error("Please authenticate first.");
    };
    let room_id = player.room_id.clone();
    let actor_id = player.user_id;
    let Some(sheet) = world.sheet_for_sid(sid) else {
        return ServiceResult::error("You have no character sheet.");
    };
    if sheet.is_dead {
        return ServiceResult::error("You are dead and cannot act.");
    }
    if sheet.yielded {
        return ServiceResult::error("You have yielded and cannot flee.");
    }
    let display_name = sheet.display_name.clone();
    let Some(room) = world.rooms.get(&room_id) else {
        return ServiceResult::error("You are nowhere.");
    };

    // Candidate exits the actor may actually use.
    let mut permitted: Vec<(String, String)> = Vec::new();
    for label in room.exit_names() {
        if let Ok((label, target)) = crate::services::room::resolve_exit(room, &label) {
            if world.rooms.contains_key(&target)
                && door_traversal_permitted(world, actor_id, room, &label)
            {
                permitted.push((label, target));
            }
        }
    }
    permitted.sort();
    permitted.dedup();
    if permitted.is_empty() {
        return ServiceResult::error("No exits to flee through!");
    }

    let (label, target) = permitted[rand::thread_rng().gen_range(0..permitted.len())].clone();
    world.move_player(sid, &target);
    let broadcasts = vec![
        (
            room_id,
            Payload::system(format!("{} flees through the {}!", display_name, label)),
        ),
        (
            target.clone(),
            Payload::system(format!("{} rushes in, breathless.", display_name)),
        ),
    ];
    let emits = vec![Payload::system(crate::services::look::describe_room_for(
        world, sid,
    ))];
    ServiceResult::success_with(emits, broadcasts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::room::{add_door, lock_door};
    use crate::world::object::Object;
    use crate::world::room::Room;

    fn setup() -> World {
        let mut world = World::new();
        world.rooms.insert("start".into(), Room::new("start", "The beginning."));
        world
    }

    fn add_npc(world: &mut World, name: &str, room: &str) {
        let sheet = CharacterSheet::new(name, "An NPC.");
        world.npc_sheets.insert(name.to_string(), sheet);
        world.get_or_create_npc_id(name);
        world.rooms.get_mut(room).unwrap().npcs.insert(name.to_string());
    }

    #[test]
    fn test_damage_formula() {
        let mut attacker = CharacterSheet::new("A", "");
        attacker.strength = 14;
        let target = CharacterSheet::new("B", "");
        assert_eq!(damage_for(&attacker, &target), 7);

        // Weak attacker still deals one point.
        attacker.strength = 1;
        assert_eq!(damage_for(&attacker, &target), 1);
    }

    #[test]
    fn test_damage_with_weapon_and_armor() {
        let mut attacker = CharacterSheet::new("A", "");
        attacker.strength = 10;
        let mut sword = Object::new("sword", "");
        sword.weapon_damage = Some(4);
        let sword_id = sword.uuid;
        attacker.inventory.place(1, sword).unwrap();
        attacker.equipped_weapon = Some(sword_id);

        let mut target = CharacterSheet::new("B", "");
        let mut shield = Object::new("shield", "");
        shield.armor_defense = Some(3);
        let shield_id = shield.uuid;
        target.inventory.place(0, shield).unwrap();
        target.equipped_armor = Some(shield_id);

        // 10/2 + 4 - 3 = 6
        assert_eq!(damage_for(&attacker, &target), 6);
    }

    #[test]
    fn test_yield_check_low_hp() {
        let mut target = CharacterSheet::new("B", "");
        target.max_hp = 10;
        target.hp = 3;
        // Even a great roll yields at 30% health.
        assert!(yield_check(&target, 100));
        target.hp = 4;
        target.morale = 100;
        assert!(!yield_check(&target, 100));
    }

    #[test]
    fn test_yield_check_roll() {
        let mut target = CharacterSheet::new("B", "");
        target.hp = 10;
        target.max_hp = 10;
        target.morale = 10;
        target.confidence = 10;
        target.aggression = 50;
        // roll 20: 20 + 10 + 10 - 50 = -10 < 50 -> yields.
        assert!(yield_check(&target, 20));
        // roll 90: 90 + 10 + 10 - 50 = 60 >= 50 -> fights on.
        assert!(!yield_check(&target, 90));
    }

    #[test]
    fn test_attack_npc_to_death_removes_from_room() {
        let mut world = setup();
        let uid = world.create_user("Alice", "$h", "").unwrap();
        world.add_player("sid-1", uid, Some("start".into()));
        add_npc(&mut world, "Goblin", "start");
        {
            let goblin = world.npc_sheets.get_mut("Goblin").unwrap();
            goblin.hp = 1;
            goblin.max_hp = 10;
        }

        let result = attack(&mut world, "sid-1", "Goblin");
        assert!(result.is_success(), "{:?}", result.error);
        let goblin = &world.npc_sheets["Goblin"];
        assert!(goblin.is_dead);
        assert_eq!(goblin.hp, 0);
        // Sheet retained, roster entry gone.
        assert!(!world.rooms["start"].npcs.contains("Goblin"));
        assert!(world.npc_sheets.contains_key("Goblin"));
    }

    #[test]
    fn test_attack_yielded_target_rejected() {
        let mut world = setup();
        let uid = world.create_user("Alice", "$h", "").unwrap();
        world.add_player("sid-1", uid, Some("start".into()));
        add_npc(&mut world, "Goblin", "start");
        world.npc_sheets.get_mut("Goblin").unwrap().yielded = true;

        let result = attack(&mut world, "sid-1", "Goblin");
        assert!(result.error.unwrap().contains("yielded"));
    }

    #[test]
    fn test_dead_attacker_cannot_attack() {
        let mut world = setup();
        let uid = world.create_user("Alice", "$h", "").unwrap();
        world.add_player("sid-1", uid, Some("start".into()));
        add_npc(&mut world, "Goblin", "start");
        world.sheet_for_sid_mut("sid-1").unwrap().is_dead = true;

        let result = attack(&mut world, "sid-1", "Goblin");
        assert!(result.error.unwrap().contains("dead"));
    }

    #[test]
    fn test_no_targets() {
        let mut world = setup();
        let uid = world.create_user("Alice", "$h", "").unwrap();
        world.add_player("sid-1", uid, Some("start".into()));
        let result = attack(&mut world, "sid-1", "anyone");
        assert!(result.error.unwrap().contains("No valid targets"));
    }

    #[test]
    fn test_npc_attack_npc_hits_rival() {
        let mut world = setup();
        add_npc(&mut world, "RedGuard", "start");
        add_npc(&mut world, "BlueScout", "start");
        let pre_hp = world.npc_sheets["BlueScout"].hp;

        let result = npc_attack_npc(&mut world, "RedGuard", "start", "BlueScout");
        assert!(result.is_success(), "{:?}", result.error);
        assert!(world.npc_sheets["BlueScout"].hp < pre_hp);
        assert!(!result.broadcasts.is_empty());
    }

    #[test]
    fn test_npc_attack_npc_never_targets_players() {
        let mut world = setup();
        let uid = world.create_user("Alice", "$h", "").unwrap();
        world.add_player("sid-1", uid, Some("start".into()));
        add_npc(&mut world, "RedGuard", "start");

        // A player display name is not a valid target for this path.
        let result = npc_attack_npc(&mut world, "RedGuard", "start", "Alice");
        assert!(result.error.unwrap().contains("No such NPC"));
        assert_eq!(world.sheet_for_sid("sid-1").unwrap().hp, 10);
    }

    #[test]
    fn test_npc_attack_npc_rejects_absent_target() {
        let mut world = setup();
        world.rooms.insert("alley".into(), Room::new("alley", "Narrow."));
        add_npc(&mut world, "RedGuard", "start");
        add_npc(&mut world, "BlueScout", "alley");

        // The rival exists but is not in the attacker's room.
        let result = npc_attack_npc(&mut world, "RedGuard", "start", "BlueScout");
        assert!(result.error.unwrap().contains("No such NPC"));
    }

    #[test]
    fn test_flee_moves_through_unlocked_exit() {
        let mut world = setup();
        world.rooms.insert("alley".into(), Room::new("alley", "Narrow."));
        add_door(&mut world, "start", "side door", "alley");
        let uid = world.create_user("Alice", "$h", "").unwrap();
        world.add_player("sid-1", uid, Some("start".into()));

        let result = flee(&mut world, "sid-1");
        assert!(result.is_success(), "{:?}", result.error);
        assert_eq!(world.players["sid-1"].room_id, "alley");
    }

    #[test]
    fn test_flee_respects_locks() {
        let mut world = setup();
        world.rooms.insert("alley".into(), Room::new("alley", "Narrow."));
        add_door(&mut world, "start", "side door", "alley");
        let uid = world.create_user("Alice", "$h", "").unwrap();
        let _warden = world.create_user("Warden", "$h", "").unwrap();
        world.add_player("sid-1", uid, Some("start".into()));
        lock_door(&mut world, "start", "side door", "user:Warden");

        let result = flee(&mut world, "sid-1");
        assert!(result.error.unwrap().contains("No exits"));
        assert_eq!(world.players["sid-1"].room_id, "start");
    }

    #[test]
    fn test_flee_dead_or_yielded_rejected() {
        let mut world = setup();
        world.rooms.insert("alley".into(), Room::new("alley", "Narrow."));
        add_door(&mut world, "start", "side door", "alley");
        let uid = world.create_user("Alice", "$h", "").unwrap();
        world.add_player("sid-1", uid, Some("start".into()));
        world.sheet_for_sid_mut("sid-1").unwrap().yielded = true;
        assert!(flee(&mut world, "sid-1").error.is_some());
    }
}
