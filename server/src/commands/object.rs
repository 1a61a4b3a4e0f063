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

//! The `/object` admin command family: templates and spawning.

use crate::context::AppContext;
use crate::resolve::parse_pipe_parts;
use crate::service::{deliver, Outbound};
use crate::services::object as object_service;

/// Handle `/object <sub> ...`; requires admin (checked by the dispatcher).
pub async fn handle(ctx: &AppContext, sid: &str, rest: &str) -> Option<Vec<Outbound>> {
    let rest = rest.trim();
    let (sub, args) = match rest.split_once(char::is_whitespace) {
        Some((sub, args)) => (sub, args.trim()),
        None => (rest, ""),
    };

    let mut world = ctx.world.write().await;
    let actor_room = world.players.get(sid).map(|p| p.room_id.clone());

    let result = match sub {
        "template" => {
            let parts = parse_pipe_parts(args, Some(4));
            object_service::create_template(&mut world, &parts[0], &parts[1], &parts[2], &parts[3])
        }
        "deltemplate" => object_service::delete_template(&mut world, args),
        "spawn" => {
            let parts = parse_pipe_parts(args, Some(2));
            let room = if parts[1].is_empty() { "here" } else { &parts[1] };
            object_service::spawn_from_template(&mut world, actor_room.as_deref(), &parts[0], room)
        }
        _ => return None,
    };

    if result.is_success() {
        ctx.persistence.save_world(&world, true);
    }
    Some(deliver(sid, &result))
}
