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

//! Natural-language interaction verbs and the interaction menu flow.
//!
//! `interact <object>` opens the numbered menu; direct verbs (`pick up`,
//! `eat`, `wield`, ...) resolve the object and execute immediately.

use crate::context::AppContext;
use crate::service::{deliver, Outbound, ServiceResult};
use crate::session::{InteractionMenu, SessionState};
use crate::services::interaction as interaction_service;
use crate::services::movement;
use tinymud_common::Payload;

/// Direct verbs mapped to menu action labels.
const DIRECT_VERBS: [(&str, &str); 10] = [
    ("pick up", "Pick Up"),
    ("take", "Pick Up"),
    ("get", "Pick Up"),
    ("drop", "Drop"),
    ("eat", "Eat"),
    ("drink", "Drink"),
    ("wield", "Wield"),
    ("search", "Search"),
    ("open", "Open"),
    ("cut", "Cut"),
];

/// Case-insensitive ASCII prefix strip preserving the original casing of
/// the remainder.
fn strip_prefix_ci<'a>(input: &'a str, prefix: &str) -> Option<&'a str> {
    if input.len() >= prefix.len() && input.is_char_boundary(prefix.len()) {
        let (head, rest) = input.split_at(prefix.len());
        if head.eq_ignore_ascii_case(prefix) {
            return Some(rest);
        }
    }
    None
}

/// Try an interaction or movement phrasing; `None` when unrecognized.
pub async fn handle_verb(ctx: &AppContext, sid: &str, input: &str) -> Option<Vec<Outbound>> {
    let input = input.trim();

    // Movement phrasings.
    for prefix in ["move through ", "go through ", "enter "] {
        if let Some(exit) = strip_prefix_ci(input, prefix) {
            return Some(do_move(ctx, sid, exit).await);
        }
    }
    if input.eq_ignore_ascii_case("go up") || input.eq_ignore_ascii_case("go down") {
        let direction = if input.to_lowercase().ends_with("up") {
            "stairs up"
        } else {
            "stairs down"
        };
        return Some(do_move(ctx, sid, direction).await);
    }

    // Menu opener.
    if let Some(name) = strip_prefix_ci(input, "interact ") {
        return Some(open_menu(ctx, sid, name.trim()).await);
    }

    // Direct action verbs.
    for (verb, action) in DIRECT_VERBS {
        if let Some(rest) = strip_prefix_ci(input, verb) {
            if !rest.starts_with(' ') {
                continue;
            }
            return Some(direct_action(ctx, sid, rest.trim(), action).await);
        }
    }

    None
}

async fn do_move(ctx: &AppContext, sid: &str, exit: &str) -> Vec<Outbound> {
    let mut world = ctx.world.write().await;
    let result = movement::move_through(&mut world, sid, exit);
    if result.is_success() {
        ctx.persistence.save_world(&world, true);
    }
    deliver(sid, &result)
}

async fn open_menu(ctx: &AppContext, sid: &str, object_name: &str) -> Vec<Outbound> {
    let menu_result = {
        let world = ctx.world.read().await;
        interaction_service::begin_interaction(&world, sid, object_name)
    };
    match menu_result {
        Err(error_result) => deliver(sid, &error_result),
        Ok((menu, result)) => {
            let mut sessions = ctx.sessions.write().await;
            if let Some(session) = sessions.get_mut(sid) {
                session.state = SessionState::Interacting(menu);
            }
            deliver(sid, &result)
        }
    }
}

/// Resolve an object and run one action against it without the menu.
async fn direct_action(
    ctx: &AppContext,
    sid: &str,
    object_name: &str,
    action: &str,
) -> Vec<Outbound> {
    let resolved = {
        let world = ctx.world.read().await;
        interaction_service::begin_interaction(&world, sid, object_name).map(|(menu, _)| menu)
    };
    let menu = match resolved {
        Err(error_result) => return deliver(sid, &error_result),
        Ok(menu) => menu,
    };
    let mut world = ctx.world.write().await;
    let result = interaction_service::execute_action(&mut world, sid, menu.obj_uuid, action);
    if result.is_success() {
        ctx.persistence.save_world(&world, true);
    }
    deliver(sid, &result)
}

/// Drive input while an interaction menu is open.
pub async fn handle_menu_input(
    ctx: &AppContext,
    sid: &str,
    menu: &InteractionMenu,
    input: &str,
) -> Vec<Outbound> {
    let Some(chosen) = interaction_service::choose_action(menu, input) else {
        let title = format!("Interactions for {}", menu.obj_name);
        return vec![
            Outbound::to(
                sid,
                Payload::system("I didn't catch that. Pick an option by number or name."),
            ),
            Outbound::to(
                sid,
                Payload::system(interaction_service::format_choices(&title, &menu.actions)),
            ),
        ];
    };

    // Any resolved choice closes the menu.
    {
        let mut sessions = ctx.sessions.write().await;
        if let Some(session) = sessions.get_mut(sid) {
            session.state = SessionState::Playing;
        }
    }

    if chosen == interaction_service::ACTION_STEP_AWAY {
        return deliver(
            sid,
            &ServiceResult::success(vec![Payload::system(format!(
                "You step away from the {}.",
                menu.obj_name
            ))]),
        );
    }

    if chosen == "Move Through" {
        return do_move(ctx, sid, &menu.obj_name).await;
    }

    let mut world = ctx.world.write().await;
    let result = interaction_service::execute_action(&mut world, sid, menu.obj_uuid, &chosen);
    if result.is_success() {
        ctx.persistence.save_world(&world, true);
    }
    deliver(sid, &result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::object::{Object, TAG_SMALL};
    use crate::world::room::Room;
    use crate::world::World;

    async fn ctx_with_apple() -> AppContext {
        let mut world = World::new();
        world.rooms.insert("start".into(), Room::new("start", "Here."));
        let uid = world.create_user("Alice", "$h", "").unwrap();
        world.add_player("s1", uid, Some("start".into()));
        let apple = Object::new("apple", "Crisp.")
            .with_tag(TAG_SMALL)
            .with_tag("Edible: 10");
        world
            .rooms
            .get_mut("start")
            .unwrap()
            .objects
            .insert(apple.uuid, apple);
        let ctx = AppContext::for_testing(world);
        ctx.sessions.write().await.connect("s1").state = SessionState::Playing;
        ctx
    }

    #[tokio::test]
    async fn test_pick_up_direct() {
        let ctx = ctx_with_apple().await;
        let out = handle_verb(&ctx, "s1", "pick up apple").await.unwrap();
        assert!(out[0].payload.content.contains("pick up the apple"));
        let world = ctx.world.read().await;
        assert_eq!(
            world.sheet_for_sid("s1").unwrap().inventory.count_by_name("apple"),
            1
        );
    }

    #[tokio::test]
    async fn test_wield_non_weapon_errors() {
        let ctx = ctx_with_apple().await;
        let out = handle_verb(&ctx, "s1", "wield apple").await.unwrap();
        assert!(out[0].payload.content.contains("not a weapon"));
    }

    #[tokio::test]
    async fn test_interact_opens_menu_and_choice_executes() {
        let ctx = ctx_with_apple().await;
        let out = handle_verb(&ctx, "s1", "interact apple").await.unwrap();
        assert!(out[0].payload.content.contains("Interactions for apple"));

        let menu = {
            let sessions = ctx.sessions.read().await;
            match &sessions.get("s1").unwrap().state {
                SessionState::Interacting(menu) => menu.clone(),
                other => panic!("expected menu state, got {:?}", other),
            }
        };
        let eat_index = menu.actions.iter().position(|a| a == "Eat").unwrap() + 1;
        let out = handle_menu_input(&ctx, "s1", &menu, &eat_index.to_string()).await;
        assert!(out[0].payload.content.contains("eat the apple"));

        let sessions = ctx.sessions.read().await;
        assert_eq!(sessions.get("s1").unwrap().state, SessionState::Playing);
    }

    #[tokio::test]
    async fn test_menu_garbage_reprints() {
        let ctx = ctx_with_apple().await;
        handle_verb(&ctx, "s1", "interact apple").await.unwrap();
        let menu = {
            let sessions = ctx.sessions.read().await;
            match &sessions.get("s1").unwrap().state {
                SessionState::Interacting(menu) => menu.clone(),
                _ => unreachable!(),
            }
        };
        let out = handle_menu_input(&ctx, "s1", &menu, "xyzzy").await;
        assert!(out[0].payload.content.contains("didn't catch"));
    }

    #[tokio::test]
    async fn test_unrecognized_verb_passes() {
        let ctx = ctx_with_apple().await;
        assert!(handle_verb(&ctx, "s1", "polish the silver").await.is_none());
    }
}
