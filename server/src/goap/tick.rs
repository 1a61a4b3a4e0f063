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

//! The world tick scheduler.
//!
//! One logical heartbeat drives every NPC in every room in a deterministic
//! order: rooms sorted by id, NPCs sorted by name. No locks are held
//! between ticks. Toggling the advanced planning mode clears every plan
//! queue so stale AI plans never outlive the switch.

use crate::context::AppContext;
use crate::world::World;
use std::time::Duration;
use tinymud_common::Payload;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Channel type the tick uses to hand room broadcasts to the transport.
pub type RoomBroadcastSender = UnboundedSender<(String, Payload)>;

/// Run one tick over all NPCs, returning room broadcasts in order.
pub async fn run_world_tick(ctx: &AppContext) -> Vec<(String, Payload)> {
    // Snapshot the iteration set; rooms and rosters are sorted maps, so the
    // order is deterministic.
    let pairs: Vec<(String, String)> = {
        let world = ctx.world.read().await;
        world
            .rooms
            .iter()
            .flat_map(|(room_id, room)| {
                room.npcs
                    .iter()
                    .map(|npc| (room_id.clone(), npc.clone()))
                    .collect::<Vec<_>>()
            })
            .collect()
    };

    let mut broadcasts = Vec::new();
    for (room_id, npc_name) in pairs {
        broadcasts.extend(crate::goap::update_npc(ctx, &room_id, &npc_name).await);
    }

    // One coalesced save per tick; the write runs off the guard.
    {
        let world = ctx.world.read().await;
        ctx.persistence.save_world(&world, true);
    }
    broadcasts
}

/// Spawn the periodic tick task. Broadcasts flow to the transport through
/// `sender`; a closed channel stops the task.
pub fn spawn_tick_task(ctx: AppContext, sender: RoomBroadcastSender) -> JoinHandle<()> {
    let interval = Duration::from_secs(ctx.game.tick_seconds.max(1));
    tokio::spawn(async move {
        tracing::info!("World tick running every {:?}", interval);
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first interval tick fires immediately; skip it so the world
        // settles before NPCs start acting.
        timer.tick().await;
        loop {
            timer.tick().await;
            let broadcasts = run_world_tick(&ctx).await;
            for broadcast in broadcasts {
                if sender.send(broadcast).is_err() {
                    tracing::info!("Broadcast channel closed; stopping world tick");
                    return;
                }
            }
        }
    })
}

/// Switch the advanced planning mode. On an actual change, every NPC plan
/// queue is cleared. Returns notes describing what was done.
pub fn set_goap_mode(world: &mut World, enabled: bool) -> Vec<String> {
    let mut notes = Vec::new();
    if world.advanced_goap_enabled == enabled {
        notes.push(format!("advanced planning already {}", on_off(enabled)));
        return notes;
    }
    for (name, sheet) in world.npc_sheets.iter_mut() {
        if !sheet.plan_queue.is_empty() {
            sheet.plan_queue.clear();
            notes.push(format!("cleared plan queue for '{}'", name));
        }
    }
    world.advanced_goap_enabled = enabled;
    notes.push(format!("advanced planning now {}", on_off(enabled)));
    tracing::info!("GOAP mode switched: advanced planning {}", on_off(enabled));
    notes
}

fn on_off(b: bool) -> &'static str {
    if b {
        "on"
    } else {
        "off"
    }
}
