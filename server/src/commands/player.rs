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

//! Player-facing commands: look, sheet, who, help, rename, describe,
//! attack, flee, quit.

use crate::context::AppContext;
use crate::service::{deliver, Outbound, ServiceResult};
use crate::services::combat::{attack, flee};
use crate::services::look;
use tinymud_common::{bold, Payload};

const HELP_TEXT: &str = "\
[b]Commands[/b]
look (l) - look around
/sheet - your character sheet
/who - connected players
/rename <name> | /describe <text>
/attack <target> | /flee
/trade <player> | <your items> | <their items>, /trade accept|reject|cancel
pick up / eat / drink / wield / search / open <object>, interact <object>
move through <exit>, go up, go down
/quit - leave
Admins: /room, /npc, /object, /kick, /purge, /safety, /goap, /auth promote";

/// Handle a player verb; `None` when the verb belongs to another router.
pub async fn handle(ctx: &AppContext, sid: &str, verb: &str, rest: &str) -> Option<Vec<Outbound>> {
    match verb {
        "help" => Some(deliver(
            sid,
            &ServiceResult::success(vec![Payload::system(HELP_TEXT)]),
        )),
        "who" => {
            let world = ctx.world.read().await;
            let mut names: Vec<String> = world
                .players
                .keys()
                .filter_map(|other| world.display_name_for_sid(other))
                .collect();
            names.sort();
            Some(deliver(
                sid,
                &ServiceResult::success(vec![Payload::system(format!(
                    "Connected ({}): {}",
                    names.len(),
                    names.join(", ")
                ))]),
            ))
        }
        "look" | "l" => {
            let world = ctx.world.read().await;
            Some(deliver(sid, &look::look(&world, sid)))
        }
        "sheet" => {
            let world = ctx.world.read().await;
            let result = match world.sheet_for_sid(sid) {
                Some(sheet) => ServiceResult::success(vec![Payload::system(sheet.describe())]),
                None => ServiceResult::error("You have no character sheet."),
            };
            Some(deliver(sid, &result))
        }
        "rename" => {
            let new_name = rest.trim();
            if new_name.len() < 2 || new_name.len() > 32 {
                return Some(deliver(
                    sid,
                    &ServiceResult::error("Names are 2-32 characters."),
                ));
            }
            let mut world = ctx.world.write().await;
            if world.get_user_by_display_name(new_name).is_some() {
                return Some(deliver(sid, &ServiceResult::error("That name is taken.")));
            }
            let Some(user_id) = world.players.get(sid).map(|p| p.user_id) else {
                return Some(deliver(sid, &ServiceResult::error("Please authenticate first.")));
            };
            let old_name = {
                let user = world.users.get_mut(&user_id).expect("player has a user");
                let old = user.display_name.clone();
                user.display_name = new_name.to_string();
                user.sheet.display_name = new_name.to_string();
                old
            };
            ctx.persistence.save_world(&world, true);
            let room_id = world.players[sid].room_id.clone();
            let result = ServiceResult::success_with(
                vec![Payload::system(format!("You are now {}.", bold(new_name)))],
                vec![(
                    room_id,
                    Payload::system(format!("{} is now known as {}.", old_name, new_name)),
                )],
            );
            Some(deliver(sid, &result))
        }
        "describe" => {
            let mut world = ctx.world.write().await;
            let result = match world.sheet_for_sid_mut(sid) {
                Some(sheet) => {
                    sheet.description = rest.trim().to_string();
                    ServiceResult::success(vec![Payload::system("Description updated.")])
                }
                None => ServiceResult::error("Please authenticate first."),
            };
            if result.is_success() {
                ctx.persistence.save_world(&world, true);
            }
            Some(deliver(sid, &result))
        }
        "attack" => {
            let mut world = ctx.world.write().await;
            let result = attack(&mut world, sid, rest.trim());
            if result.is_success() {
                ctx.persistence.save_world(&world, true);
            }
            Some(deliver(sid, &result))
        }
        "flee" => {
            let mut world = ctx.world.write().await;
            let result = flee(&mut world, sid);
            if result.is_success() {
                ctx.persistence.save_world(&world, true);
            }
            Some(deliver(sid, &result))
        }
        _ => None,
    }
}
