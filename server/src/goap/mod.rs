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

//! NPC autonomy core: needs, planning, execution.
//!
//! Per NPC per tick: needs decay and action points regenerate; planner
//! invariants are enforced; a sleeping NPC just sleeps; otherwise the NPC
//! thinks (AI path when gated on, offline otherwise), autonomy impulses may
//! override the plan, and up to `ap_max` actions execute, each costing one
//! action point even on failure.
//!
//! Lock discipline: world mutation phases hold the write guard; the AI
//! adapter call happens with no guard held, and its plan is validated and
//! installed under a fresh guard.

pub mod actions;
pub mod autonomy;
pub mod planner;
pub mod tick;

use crate::config::GameConfig;
use crate::context::AppContext;
use crate::ratelimit::Operation;
use crate::world::object::TAG_BED;
use crate::world::sheet::{clamp_need, CharacterSheet};
use crate::world::World;
use tinymud_common::Payload;

/// Needs decay and action-point regeneration for one tick.
///
/// Sleep refills while sleeping and drains otherwise; socialization refills
/// slowly when the NPC is alone and drains in company. All needs clamp to
/// [0, 100]; action points clamp to [0, ap_max].
pub fn decay_needs(sheet: &mut CharacterSheet, config: &GameConfig, alone: bool) {
    sheet.hunger = clamp_need(sheet.hunger - config.need_drop);
    sheet.thirst = clamp_need(sheet.thirst - config.need_drop);
    if alone {
        sheet.socialization = clamp_need(sheet.socialization + config.social_sim_tick);
    } else {
        sheet.socialization = clamp_need(sheet.socialization - config.social_drop);
    }
    if sheet.is_sleeping() {
        sheet.sleep = clamp_need(sheet.sleep + config.sleep_refill);
    } else {
        sheet.sleep = clamp_need(sheet.sleep - config.sleep_drop);
    }
    sheet.action_points = (sheet.action_points + 1).clamp(0, config.ap_max);
}

/// Enforce the per-tick planner invariants on one NPC, returning notes for
/// anything repaired.
///
/// - plan queue entries must be well-formed action records, else the whole
///   plan is dropped (the NPC replans)
/// - sleeping state holds only while the referenced bed is present in the
///   current room, tagged `bed`, and owned by this NPC
/// - action points never go negative
pub fn enforce_planner_invariants(world: &mut World, npc_name: &str, room_id: &str) -> Vec<String> {
    let mut notes = Vec::new();
    let npc_id = world.npc_ids.get(npc_name).copied();

    let bed_ok = |world: &World, bed: uuid::Uuid| -> bool {
        world
            .rooms
            .get(room_id)
            .and_then(|r| r.objects.get(&bed))
            .map(|o| o.has_tag(TAG_BED) && o.owner_id == npc_id)
            .unwrap_or(false)
    };
    let sleeping_bed = world
        .npc_sheets
        .get(npc_name)
        .and_then(|s| s.sleeping_bed_uuid);
    let bed_valid = sleeping_bed.map(|b| bed_ok(world, b)).unwrap_or(false);

    let Some(sheet) = world.npc_sheets.get_mut(npc_name) else {
        return notes;
    };

    if sheet.plan_queue.iter().any(|a| !a.is_well_formed()) {
        sheet.plan_queue.clear();
        notes.push(format!("dropped malformed plan for '{}'", npc_name));
    }

    let consistent = (sheet.sleeping_ticks_remaining > 0) == bed_valid
        && (sheet.sleeping_ticks_remaining > 0) == sheet.sleeping_bed_uuid.is_some();
    if !consistent {
        sheet.sleeping_ticks_remaining = 0;
        sheet.sleeping_bed_uuid = None;
        notes.push(format!("reset inconsistent sleep state for '{}'", npc_name));
    }

    if sheet.action_points < 0 {
        sheet.action_points = 0;
        notes.push(format!("reset negative action points for '{}'", npc_name));
    }
    notes
}

/// Full per-tick update of one NPC. Returns room broadcasts in
/// action-execution order.
pub async fn update_npc(ctx: &AppContext, room_id: &str, npc_name: &str) -> Vec<(String, Payload)> {
    let mut broadcasts = Vec::new();

    // Phase 1: invariants, decay, sleep handling (write guard).
    let (needs_plan, ai_eligible) = {
        let mut world = ctx.world.write().await;
        if !world
            .rooms
            .get(room_id)
            .map(|r| r.npcs.contains(npc_name))
            .unwrap_or(false)
        {
            return broadcasts;
        }
        if !world.npc_sheets.contains_key(npc_name) {
            return broadcasts;
        }
        for note in enforce_planner_invariants(&mut world, npc_name, room_id) {
            tracing::debug!("tick repair: {}", note);
        }

        let alone = world
            .rooms
            .get(room_id)
            .map(|r| r.players.is_empty() && r.npcs.len() <= 1)
            .unwrap_or(true);
        let advanced = world.advanced_goap_enabled;
        let players_present = world
            .rooms
            .get(room_id)
            .map(|r| !r.players.is_empty())
            .unwrap_or(false);

        let sheet = world.npc_sheets.get_mut(npc_name).expect("checked above");
        if sheet.is_dead {
            return broadcasts;
        }
        decay_needs(sheet, &ctx.game, alone);

        if sheet.is_sleeping() {
            sheet.sleeping_ticks_remaining -= 1;
            if sheet.sleeping_ticks_remaining == 0 {
                sheet.sleeping_bed_uuid = None;
                broadcasts.push((
                    room_id.to_string(),
                    Payload::system(format!("[i]{} wakes up, refreshed.[/i]", npc_name)),
                ));
            }
            return broadcasts;
        }

        let needs_plan =
            sheet.plan_queue.is_empty() && planner::needs_planning(sheet, &ctx.game);
        let ai_eligible = needs_plan && advanced && ctx.llm.is_configured() && players_present;
        (needs_plan, ai_eligible)
    };

    // Phase 2: planning. The adapter call runs without any guard held.
    if ai_eligible
        && ctx
            .limiter
            .check_and_consume(npc_name, Operation::NpcPlanning)
            .is_ok()
    {
        let prompt = {
            let world = ctx.world.read().await;
            match world.rooms.get(room_id) {
                Some(room) if world.npc_sheets.contains_key(npc_name) => {
                    Some(planner::build_plan_prompt(&world, npc_name, room))
                }
                _ => None,
            }
        };
        if let Some(prompt) = prompt {
            let ai_plan = match ctx.llm.plan(&prompt).await {
                Ok(value) => planner::parse_plan(&value),
                Err(e) => {
                    tracing::warn!("AI planning failed for '{}' ({}); going offline", npc_name, e);
                    Vec::new()
                }
            };
            let mut world = ctx.world.write().await;
            // Re-validate: the world may have moved while we awaited.
            let still_here = world
                .rooms
                .get(room_id)
                .map(|r| r.npcs.contains(npc_name))
                .unwrap_or(false);
            if still_here {
                let plan = if ai_plan.is_empty() {
                    offline_plan_for(&world, npc_name, room_id, &ctx.game)
                } else {
                    ai_plan
                };
                if let Some(sheet) = world.npc_sheets.get_mut(npc_name) {
                    if sheet.plan_queue.is_empty() {
                        sheet.plan_queue = plan;
                    }
                }
            }
        }
    } else if needs_plan {
        let mut world = ctx.world.write().await;
        let plan = offline_plan_for(&world, npc_name, room_id, &ctx.game);
        if let Some(sheet) = world.npc_sheets.get_mut(npc_name) {
            if sheet.plan_queue.is_empty() {
                sheet.plan_queue = plan;
            }
        }
    }

    // Phase 3: autonomy override, then execution (write guard).
    {
        let mut world = ctx.world.write().await;
        if let Some(impulse) = autonomy::override_action(&world, npc_name, room_id) {
            tracing::debug!(
                "autonomy override for '{}': {} (priority {})",
                npc_name,
                impulse.description,
                impulse.priority
            );
            if let Some(sheet) = world.npc_sheets.get_mut(npc_name) {
                sheet.plan_queue.insert(0, impulse.action);
            }
        }

        loop {
            let action = {
                let Some(sheet) = world.npc_sheets.get_mut(npc_name) else {
                    break;
                };
                if sheet.action_points <= 0 || sheet.plan_queue.is_empty() || sheet.is_sleeping() {
                    break;
                }
                // One point per executed action, success or not.
                sheet.action_points -= 1;
                sheet.plan_queue.remove(0)
            };
            let outcome = actions::execute_action(&mut world, npc_name, room_id, &action, &ctx.game);
            broadcasts.extend(outcome.broadcasts);
            // A move mid-plan leaves the rest of the plan for the new room
            // on a later tick; this tick stops here.
            if action.tool == "move_through" && outcome.ok {
                break;
            }
        }
    }

    broadcasts
}

fn offline_plan_for(
    world: &World,
    npc_name: &str,
    room_id: &str,
    config: &GameConfig,
) -> Vec<crate::world::sheet::PlanAction> {
    match (world.rooms.get(room_id), world.npc_sheets.get(npc_name)) {
        (Some(room), Some(sheet)) => planner::offline_plan(world, npc_name, room, sheet, config),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::room::Room;
    use crate::world::sheet::PlanAction;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn test_decay_clamps_and_regenerates_ap() {
        let config = GameConfig::default();
        let mut sheet = CharacterSheet::new("Gareth", "");
        sheet.hunger = 0.5;
        sheet.thirst = 0.0;
        sheet.action_points = 0;
        decay_needs(&mut sheet, &config, false);
        assert_eq!(sheet.hunger, 0.0);
        assert_eq!(sheet.thirst, 0.0);
        assert_eq!(sheet.action_points, 1);

        for _ in 0..10 {
            decay_needs(&mut sheet, &config, false);
        }
        assert_eq!(sheet.action_points, config.ap_max);
    }

    #[test]
    fn test_sleep_refills_while_sleeping() {
        let config = GameConfig::default();
        let mut sheet = CharacterSheet::new("Gareth", "");
        sheet.sleep = 20.0;
        sheet.sleeping_ticks_remaining = 2;
        sheet.sleeping_bed_uuid = Some(Uuid::new_v4());
        decay_needs(&mut sheet, &config, true);
        assert_eq!(sheet.sleep, 30.0);
    }

    #[test]
    fn test_social_sim_refill_when_alone() {
        let config = GameConfig::default();
        let mut sheet = CharacterSheet::new("Gareth", "");
        sheet.socialization = 50.0;
        decay_needs(&mut sheet, &config, true);
        assert_eq!(sheet.socialization, 55.0);
        decay_needs(&mut sheet, &config, false);
        assert_eq!(sheet.socialization, 54.5);
    }

    #[test]
    fn test_invariants_drop_malformed_plan() {
        let mut world = World::new();
        world.rooms.insert("start".into(), Room::new("start", "Here."));
        let mut sheet = CharacterSheet::new("Gareth", "");
        sheet.plan_queue = vec![
            PlanAction::new("emote", json!({})),
            PlanAction::new("", json!({})),
        ];
        world.npc_sheets.insert("Gareth".into(), sheet);
        world.get_or_create_npc_id("Gareth");

        let notes = enforce_planner_invariants(&mut world, "Gareth", "start");
        assert!(!notes.is_empty());
        assert!(world.npc_sheets["Gareth"].plan_queue.is_empty());
    }

    #[test]
    fn test_invariants_reset_orphaned_sleep() {
        let mut world = World::new();
        world.rooms.insert("start".into(), Room::new("start", "Here."));
        let mut sheet = CharacterSheet::new("Gareth", "");
        // Sleeping with no bed in the room.
        sheet.sleeping_ticks_remaining = 3;
        sheet.sleeping_bed_uuid = Some(Uuid::new_v4());
        world.npc_sheets.insert("Gareth".into(), sheet);
        world.get_or_create_npc_id("Gareth");

        enforce_planner_invariants(&mut world, "Gareth", "start");
        let sheet = &world.npc_sheets["Gareth"];
        assert_eq!(sheet.sleeping_ticks_remaining, 0);
        assert_eq!(sheet.sleeping_bed_uuid, None);
    }

    #[test]
    fn test_invariants_reset_bed_without_sleep() {
        let mut world = World::new();
        world.rooms.insert("start".into(), Room::new("start", "Here."));
        let mut sheet = CharacterSheet::new("Gareth", "");
        sheet.sleeping_ticks_remaining = 0;
        sheet.sleeping_bed_uuid = Some(Uuid::new_v4());
        world.npc_sheets.insert("Gareth".into(), sheet);

        enforce_planner_invariants(&mut world, "Gareth", "start");
        assert_eq!(world.npc_sheets["Gareth"].sleeping_bed_uuid, None);
    }
}
