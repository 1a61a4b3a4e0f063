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

//! The `/npc` admin command family, including AI-assisted generation.
//!
//! Generation builds its prompt under a read guard, calls the adapter with
//! no guard held, and installs the resulting NPC under a write guard after
//! re-validating the target room.

use crate::context::AppContext;
use crate::resolve::parse_pipe_parts;
use crate::service::{deliver, Outbound, ServiceResult};
use crate::services::npc as npc_service;

/// Handle `/npc <sub> ...`; requires admin (checked by the dispatcher).
pub async fn handle(ctx: &AppContext, sid: &str, rest: &str) -> Option<Vec<Outbound>> {
    let rest = rest.trim();
    let (sub, args) = match rest.split_once(char::is_whitespace) {
        Some((sub, args)) => (sub, args.trim()),
        None => (rest, ""),
    };

    if sub == "generate" {
        return Some(generate(ctx, sid, args).await);
    }

    let mut world = ctx.world.write().await;
    let actor_room = world.players.get(sid).map(|p| p.room_id.clone());

    let result = match sub {
        "add" => {
            let parts = parse_pipe_parts(args, Some(3));
            npc_service::add_npc(
                &mut world,
                actor_room.as_deref(),
                &parts[0],
                &parts[1],
                &parts[2],
            )
        }
        "remove" => {
            // `/npc remove <room> <name>` with space-separated form.
            let (room, name) = match args.split_once(char::is_whitespace) {
                Some((room, name)) => (room.trim(), name.trim()),
                None => ("here", args),
            };
            npc_service::remove_npc(&mut world, actor_room.as_deref(), room, name)
        }
        "setdesc" => {
            let parts = parse_pipe_parts(args, Some(2));
            npc_service::set_description(&mut world, &parts[0], &parts[1])
        }
        "setattr" => {
            let parts = parse_pipe_parts(args, Some(3));
            npc_service::set_attribute(&mut world, &parts[0], &parts[1], &parts[2])
        }
        "setaspect" => {
            let parts = parse_pipe_parts(args, Some(3));
            npc_service::set_aspect(&mut world, &parts[0], &parts[1], &parts[2])
        }
        "setmatrix" => {
            let parts = parse_pipe_parts(args, Some(3));
            npc_service::set_matrix(&mut world, &parts[0], &parts[1], &parts[2])
        }
        "sheet" => npc_service::show_sheet(&world, args),
        _ => return None,
    };

    if result.is_success() {
        ctx.persistence.save_world(&world, true);
    }
    Some(deliver(sid, &result))
}

/// `/npc generate [<room> | <name> | <description>]`: AI-assisted creation.
/// On adapter failure with no usable profile, no NPC is created.
async fn generate(ctx: &AppContext, sid: &str, args: &str) -> Vec<Outbound> {
    let parts = parse_pipe_parts(args, Some(3));
    let (typed_room, name, description) = (parts[0].clone(), parts[1].clone(), parts[2].clone());
    if name.trim().is_empty() {
        return deliver(
            sid,
            &ServiceResult::error("Usage: /npc generate <room> | <name> | <description>"),
        );
    }

    // Prompt assembled under the read guard; adapter called outside it.
    let (prompt, world_name, safety) = {
        let world = ctx.world.read().await;
        if world.npc_sheets.contains_key(name.trim()) {
            return deliver(
                sid,
                &ServiceResult::error(format!("An NPC named '{}' already exists.", name.trim())),
            );
        }
        let prompt = format!(
            "Create an NPC character profile for a text adventure world.\n\
             World: {}\nSetting: {}\nConflict: {}\nName: {}\nConcept: {}\n\
             Reply with a JSON object with keys high_concept, trouble, background, \
             focus, strength, dexterity, intelligence, health, psychosocial_matrix.",
            world.world_name.as_deref().unwrap_or("(unnamed)"),
            world.world_description.as_deref().unwrap_or("unknown"),
            world.world_conflict.as_deref().unwrap_or("unknown"),
            name.trim(),
            if description.trim().is_empty() {
                "any fitting character"
            } else {
                description.trim()
            },
        );
        (
            prompt,
            world.world_name.clone().unwrap_or_default(),
            world.safety_level,
        )
    };

    let profile = match ctx.llm.generate_json(&world_name, safety, &prompt).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::warn!("NPC generation failed: {}", e);
            return deliver(
                sid,
                &ServiceResult::error("Generation failed; no NPC was created."),
            );
        }
    };

    let mut world = ctx.world.write().await;
    let actor_room = world.players.get(sid).map(|p| p.room_id.clone());
    let result = npc_service::add_generated_npc(
        &mut world,
        actor_room.as_deref(),
        &typed_room,
        name.trim(),
        description.trim(),
        &profile,
    );
    if result.is_success() {
        ctx.persistence.save_world(&world, true);
    }
    deliver(sid, &result)
}
