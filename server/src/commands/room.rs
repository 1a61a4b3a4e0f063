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

//! The `/room` admin command family.

use crate::context::AppContext;
use crate::resolve::parse_pipe_parts;
use crate::service::{deliver, Outbound, ServiceResult};
use crate::services::room as room_service;

/// Handle `/room <sub> ...`; requires admin (checked by the dispatcher).
pub async fn handle(ctx: &AppContext, sid: &str, rest: &str) -> Option<Vec<Outbound>> {
    let rest = rest.trim();
    let (sub, args) = match rest.split_once(char::is_whitespace) {
        Some((sub, args)) => (sub, args.trim()),
        None => (rest, ""),
    };

    let mut world = ctx.world.write().await;
    let actor_room = world.players.get(sid).map(|p| p.room_id.clone());

    let result = match sub {
        "create" => {
            let parts = parse_pipe_parts(args, Some(2));
            room_service::create_room(&mut world, &parts[0], &parts[1])
        }
        "setdesc" => {
            let parts = parse_pipe_parts(args, Some(2));
            room_service::set_description(&mut world, &parts[0], &parts[1])
        }
        "adddoor" => {
            let parts = parse_pipe_parts(args, Some(2));
            match &actor_room {
                Some(room_id) => room_service::add_door(&mut world, room_id, &parts[0], &parts[1]),
                None => ServiceResult::error("You are nowhere."),
            }
        }
        "removedoor" => match &actor_room {
            Some(room_id) => room_service::remove_door(&mut world, room_id, args),
            None => ServiceResult::error("You are nowhere."),
        },
        "linkdoor" => {
            let parts = parse_pipe_parts(args, Some(4));
            room_service::link_doors(&mut world, &parts[0], &parts[1], &parts[2], &parts[3])
        }
        "setstairs" => {
            let parts = parse_pipe_parts(args, Some(2));
            match &actor_room {
                Some(room_id) => {
                    room_service::set_stairs(&mut world, room_id, &parts[0], &parts[1])
                }
                None => ServiceResult::error("You are nowhere."),
            }
        }
        "lockdoor" => {
            let parts = parse_pipe_parts(args, Some(2));
            match &actor_room {
                Some(room_id) => {
                    room_service::lock_door(&mut world, room_id, &parts[0], &parts[1])
                }
                None => ServiceResult::error("You are nowhere."),
            }
        }
        _ => return None,
    };

    if result.is_success() {
        ctx.persistence.save_world(&world, true);
    }
    Some(deliver(sid, &result))
}
