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

//! The command dispatcher: an ordered chain of routers.
//!
//! Input first flows through the session state machines (auth wizard,
//! interaction menu). Playing input is either a slash command routed by
//! verb or natural language routed to interaction and then dialogue. Dead
//! characters keep only `/help`, `/who`, and `look`. Admin verbs require
//! `is_admin`. A handled mutation requests a debounced save inside its
//! router.

pub mod admin;
pub mod auth;
pub mod interaction;
pub mod npc;
pub mod object;
pub mod player;
pub mod room;
pub mod trade;

use crate::context::AppContext;
use crate::ratelimit::Operation;
use crate::service::{deliver, Outbound, ServiceResult};
use crate::session::SessionState;
use tinymud_common::Payload;

/// Everything the transport must do after one input: deliver messages and
/// close any sessions.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    pub outbound: Vec<Outbound>,
    /// Sessions to close (the actor on /quit, targets of /kick).
    pub close_sids: Vec<String>,
}

impl DispatchOutcome {
    fn messages(outbound: Vec<Outbound>) -> Self {
        Self {
            outbound,
            close_sids: Vec::new(),
        }
    }
}

/// Admin-gated slash verbs.
const ADMIN_VERBS: [&str; 9] = [
    "room", "npc", "object", "kick", "purge", "safety", "goap", "audit", "savestats",
];

/// Commands a dead character may still use.
const DEAD_VERBS: [&str; 4] = ["help", "who", "look", "l"];

/// Route one line of client input.
pub async fn handle_input(ctx: &AppContext, sid: &str, text: &str) -> DispatchOutcome {
    let text = text.trim();
    if text.is_empty() {
        return DispatchOutcome::default();
    }

    // Session state machines run before command routing.
    let state = {
        let sessions = ctx.sessions.read().await;
        sessions.get(sid).map(|s| s.state.clone())
    };
    match state {
        None => return DispatchOutcome::default(),
        Some(SessionState::Auth(_)) => {
            return DispatchOutcome::messages(auth::handle_wizard_input(ctx, sid, text).await);
        }
        Some(SessionState::Interacting(menu)) => {
            return DispatchOutcome::messages(
                interaction::handle_menu_input(ctx, sid, &menu, text).await,
            );
        }
        Some(SessionState::Playing) => {}
    }

    if let Err(hint) = ctx.limiter.check_and_consume(sid, Operation::Message) {
        return DispatchOutcome::messages(vec![Outbound::to(sid, Payload::error(hint))]);
    }

    // Dead characters are spectators.
    let is_dead = {
        let world = ctx.world.read().await;
        world.sheet_for_sid(sid).map(|s| s.is_dead).unwrap_or(false)
    };

    if let Some(command) = text.strip_prefix('/') {
        let (verb, rest) = match command.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (command, ""),
        };
        let verb = verb.to_lowercase();

        if is_dead && !DEAD_VERBS.contains(&verb.as_str()) {
            return DispatchOutcome::messages(deliver(
                sid,
                &ServiceResult::error("You are dead. Only /help, /who, and /look remain to you."),
            ));
        }

        if ADMIN_VERBS.contains(&verb.as_str()) {
            let is_admin = {
                let world = ctx.world.read().await;
                world.user_for_sid(sid).map(|u| u.is_admin).unwrap_or(false)
            };
            if !is_admin {
                return DispatchOutcome::messages(deliver(
                    sid,
                    &ServiceResult::error("That command requires admin rights."),
                ));
            }
        }

        return dispatch_slash(ctx, sid, &verb, rest).await;
    }

    // Natural language.
    if is_dead && !text.eq_ignore_ascii_case("look") && !text.eq_ignore_ascii_case("l") {
        return DispatchOutcome::messages(deliver(
            sid,
            &ServiceResult::error("You are dead. Only /help, /who, and /look remain to you."),
        ));
    }
    if text.eq_ignore_ascii_case("look") || text.eq_ignore_ascii_case("l") {
        if let Some(out) = player::handle(ctx, sid, "look", "").await {
            return DispatchOutcome::messages(out);
        }
    }
    if let Some(out) = interaction::handle_verb(ctx, sid, text).await {
        return DispatchOutcome::messages(out);
    }
    DispatchOutcome::messages(say(ctx, sid, text).await)
}

async fn dispatch_slash(ctx: &AppContext, sid: &str, verb: &str, rest: &str) -> DispatchOutcome {
    // Ordered router chain; the first router that recognizes the verb wins.
    match verb {
        "quit" => {
            let out = vec![Outbound::to(sid, Payload::system("Farewell."))];
            DispatchOutcome {
                outbound: out,
                close_sids: vec![sid.to_string()],
            }
        }
        "auth" => match auth::handle_auth_command(ctx, sid, rest).await {
            Some(out) => DispatchOutcome::messages(out),
            None => DispatchOutcome::messages(deliver(
                sid,
                &ServiceResult::error("You are already logged in."),
            )),
        },
        "room" => match room::handle(ctx, sid, rest).await {
            Some(out) => DispatchOutcome::messages(out),
            None => unknown(sid, verb),
        },
        "npc" => match npc::handle(ctx, sid, rest).await {
            Some(out) => DispatchOutcome::messages(out),
            None => unknown(sid, verb),
        },
        "object" => match object::handle(ctx, sid, rest).await {
            Some(out) => DispatchOutcome::messages(out),
            None => unknown(sid, verb),
        },
        "trade" => match trade::handle(ctx, sid, rest).await {
            Some(out) => DispatchOutcome::messages(out),
            None => unknown(sid, verb),
        },
        "kick" | "purge" | "safety" | "goap" | "audit" | "savestats" => {
            match admin::handle(ctx, sid, verb, rest).await {
                Some(outcome) => DispatchOutcome {
                    outbound: outcome.outbound,
                    close_sids: outcome.kick_sids,
                },
                None => unknown(sid, verb),
            }
        }
        _ => match player::handle(ctx, sid, verb, rest).await {
            Some(out) => DispatchOutcome::messages(out),
            None => unknown(sid, verb),
        },
    }
}

fn unknown(sid: &str, verb: &str) -> DispatchOutcome {
    DispatchOutcome::messages(vec![Outbound::to(
        sid,
        Payload::error(format!("Unknown command '/{}'. Try /help.", verb)),
    )])
}

/// Plain speech: broadcast to the room, then let one NPC respond through
/// the dialogue adapter (outside the world guard).
async fn say(ctx: &AppContext, sid: &str, text: &str) -> Vec<Outbound> {
    let (display_name, room_id, npc_name, world_name, safety) = {
        let world = ctx.world.read().await;
        let Some(player) = world.players.get(sid) else {
            return deliver(sid, &ServiceResult::error("Please authenticate first."));
        };
        let room_id = player.room_id.clone();
        let display_name = world
            .display_name_for_sid(sid)
            .unwrap_or_else(|| "Someone".to_string());
        // First living NPC by name answers.
        let npc_name = world
            .rooms
            .get(&room_id)
            .and_then(|room| {
                room.npcs
                    .iter()
                    .find(|name| {
                        world
                            .npc_sheets
                            .get(*name)
                            .map(|s| !s.is_dead)
                            .unwrap_or(false)
                    })
                    .cloned()
            });
        (
            display_name,
            room_id,
            npc_name,
            world.world_name.clone().unwrap_or_default(),
            world.safety_level,
        )
    };

    let mut out = vec![
        Outbound::to(sid, Payload::system(format!("You say: {}", text))),
        Outbound::room(
            room_id.clone(),
            Some(sid.to_string()),
            Payload::player(display_name.clone(), text),
        ),
    ];

    if let Some(npc_name) = npc_name {
        let prompt = {
            let world = ctx.world.read().await;
            let sheet = &world.npc_sheets[&npc_name];
            format!(
                "You are {}, {} High concept: {}. A traveler named {} says to you: \"{}\". \
                 Reply in character with one or two sentences.",
                npc_name, sheet.description, sheet.high_concept, display_name, text
            )
        };
        let reply = ctx.llm.chat(&world_name, safety, &prompt).await;
        {
            // Conversation satisfies the NPC's social need.
            let mut world = ctx.world.write().await;
            if let Some(sheet) = world.npc_sheets.get_mut(&npc_name) {
                sheet.socialization =
                    crate::world::sheet::clamp_need(sheet.socialization + ctx.game.social_refill);
            }
        }
        out.push(Outbound::room(
            room_id,
            None,
            Payload::npc(npc_name, reply),
        ));
    }
    out
}
