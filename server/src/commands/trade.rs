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

//! The `/trade` command: propose, accept, reject, cancel.

use crate::context::AppContext;
use crate::resolve::parse_pipe_parts;
use crate::service::{deliver, Outbound, ServiceResult};
use crate::services::trade as trade_service;

/// Handle `/trade ...`.
pub async fn handle(ctx: &AppContext, sid: &str, rest: &str) -> Option<Vec<Outbound>> {
    let rest = rest.trim();
    let lower = rest.to_lowercase();

    let (result, direct) = match lower.as_str() {
        "accept" | "reject" => {
            let mut world = ctx.world.write().await;
            let mut sessions = ctx.sessions.write().await;
            let accepted = lower == "accept";
            let pair = trade_service::respond(&mut world, &mut sessions, sid, accepted);
            if pair.0.is_success() && accepted {
                ctx.persistence.save_world(&world, true);
            }
            pair
        }
        "cancel" => {
            let world = ctx.world.read().await;
            let mut sessions = ctx.sessions.write().await;
            trade_service::cancel(&world, &mut sessions, sid)
        }
        "" => (
            ServiceResult::error(
                "Usage: /trade <player> | <your items> | <their items>, or /trade accept|reject|cancel",
            ),
            vec![],
        ),
        _ => {
            let parts = parse_pipe_parts(rest, Some(3));
            let world = ctx.world.read().await;
            let mut sessions = ctx.sessions.write().await;
            trade_service::propose(&world, &mut sessions, sid, &parts[0], &parts[1], &parts[2])
        }
    };

    let mut out = deliver(sid, &result);
    for (target_sid, payload) in direct {
        out.push(Outbound::to(target_sid, payload));
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::object::{Object, TAG_SMALL};
    use crate::world::room::Room;
    use crate::world::World;

    async fn two_player_ctx() -> AppContext {
        let mut world = World::new();
        world.rooms.insert("start".into(), Room::new("start", "Here."));
        let alice = world.create_user("Alice", "$h", "").unwrap();
        let bob = world.create_user("Bob", "$h", "").unwrap();
        world.add_player("sa", alice, Some("start".into()));
        world.add_player("sb", bob, Some("start".into()));
        world
            .sheet_for_sid_mut("sa")
            .unwrap()
            .inventory
            .auto_place(Object::new("apple", "").with_tag(TAG_SMALL))
            .unwrap();
        world
            .sheet_for_sid_mut("sb")
            .unwrap()
            .inventory
            .auto_place(Object::new("coin", "").with_tag(TAG_SMALL))
            .unwrap();
        AppContext::for_testing(world)
    }

    #[tokio::test]
    async fn test_propose_accept_round_trip() {
        let ctx = two_player_ctx().await;
        let out = handle(&ctx, "sa", "Bob | apple | coin").await.unwrap();
        assert!(out.iter().any(|o| o.payload.content.contains("propose")));

        let out = handle(&ctx, "sb", "accept").await.unwrap();
        assert!(out.iter().any(|o| o.payload.content.contains("complete")));
        let world = ctx.world.read().await;
        assert_eq!(world.sheet_for_sid("sa").unwrap().inventory.count_by_name("coin"), 1);
        assert_eq!(world.sheet_for_sid("sb").unwrap().inventory.count_by_name("apple"), 1);
    }

    #[tokio::test]
    async fn test_accept_without_offer() {
        let ctx = two_player_ctx().await;
        let out = handle(&ctx, "sb", "accept").await.unwrap();
        assert!(out[0].payload.content.contains("No one has proposed"));
    }
}
