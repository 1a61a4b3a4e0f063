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

//! End-to-end auth flow: account creation, first-admin, login.

use tinymud_server::commands::handle_input;
use tinymud_server::context::AppContext;
use tinymud_server::world::World;

async fn connect(ctx: &AppContext, sid: &str) {
    ctx.sessions.write().await.connect(sid);
}

fn contents(outbound: &[tinymud_server::service::Outbound]) -> String {
    outbound
        .iter()
        .map(|o| o.payload.content.clone())
        .collect::<Vec<_>>()
        .join("\n")
}

#[tokio::test]
async fn test_first_admin_scenario() {
    let ctx = AppContext::for_testing(World::new());
    connect(&ctx, "s1").await;
    connect(&ctx, "s2").await;

    // Session S1 creates the first account.
    let outcome = handle_input(
        &ctx,
        "s1",
        "/auth create Alice | hunter2 | a curious explorer",
    )
    .await;
    let all = contents(&outcome.outbound);
    assert!(all.contains("[b]Alice[/b]"), "welcome missing: {}", all);
    assert!(all.contains("Account created"), "{}", all);
    assert!(all.contains("admin"), "first-admin note missing: {}", all);

    // Session S2 creates the second.
    let outcome = handle_input(
        &ctx,
        "s2",
        "/auth create Bob | passw0rd | a wary merchant",
    )
    .await;
    assert!(contents(&outcome.outbound).contains("[b]Bob[/b]"));

    // Only Alice is an admin.
    let outcome = handle_input(&ctx, "s1", "/auth list_admins").await;
    let all = contents(&outcome.outbound);
    assert!(all.contains("Alice"), "{}", all);
    assert!(!all.contains("Bob"), "{}", all);

    let world = ctx.world.read().await;
    assert_eq!(world.users.len(), 2);
    assert!(world.get_user_by_display_name("Alice").unwrap().is_admin);
    assert!(!world.get_user_by_display_name("Bob").unwrap().is_admin);
}

#[tokio::test]
async fn test_login_after_disconnect_preserves_sheet() {
    let ctx = AppContext::for_testing(World::new());
    connect(&ctx, "s1").await;
    handle_input(&ctx, "s1", "/auth create Alice | hunter2 | a curious explorer").await;
    handle_input(&ctx, "s1", "/describe a seasoned wanderer").await;

    // Disconnect: the player binding goes, the user persists.
    {
        let mut world = ctx.world.write().await;
        world.remove_player("s1");
    }
    {
        let mut sessions = ctx.sessions.write().await;
        sessions.disconnect("s1");
    }

    connect(&ctx, "s2").await;
    let outcome = handle_input(&ctx, "s2", "/auth login Alice | hunter2").await;
    assert!(contents(&outcome.outbound).contains("Welcome back"));
    let world = ctx.world.read().await;
    assert_eq!(
        world.sheet_for_sid("s2").unwrap().description,
        "a seasoned wanderer"
    );
}

#[tokio::test]
async fn test_unauthenticated_commands_stay_in_wizard() {
    let ctx = AppContext::for_testing(World::new());
    connect(&ctx, "s1").await;
    let outcome = handle_input(&ctx, "s1", "look").await;
    // Unrecognized wizard input re-prompts rather than reaching the game.
    assert!(contents(&outcome.outbound).contains("create"));
}
