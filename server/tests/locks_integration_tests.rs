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

//! Door lock policies end to end, including the deleted-target rule.

use tinymud_server::commands::handle_input;
use tinymud_server::context::AppContext;
use tinymud_server::services::movement::move_through;
use tinymud_server::services::room::{add_door, lock_door};
use tinymud_server::world::room::Room;
use tinymud_server::world::World;

fn locked_world() -> (World, uuid::Uuid, uuid::Uuid) {
    let mut world = World::new();
    world.rooms.insert("a".into(), Room::new("a", "Room A."));
    world.rooms.insert("b".into(), Room::new("b", "Room B."));
    add_door(&mut world, "a", "iron gate", "b");
    let alice = world.create_user("Alice", "$h", "").unwrap();
    let bob = world.create_user("Bob", "$h", "").unwrap();
    (world, alice, bob)
}

#[tokio::test]
async fn test_relationship_rule_grants_traversal() {
    let (mut world, alice, bob) = locked_world();
    world
        .relationships
        .entry(alice)
        .or_default()
        .insert(bob, "friend".to_string());
    lock_door(&mut world, "a", "iron gate", "rel:friend:Bob");
    world.add_player("s1", alice, Some("a".into()));

    let result = move_through(&mut world, "s1", "iron gate");
    assert!(result.is_success(), "{:?}", result.error);
    assert_eq!(world.players["s1"].room_id, "b");
}

#[tokio::test]
async fn test_deleted_relationship_target_denies() {
    let (mut world, alice, bob) = locked_world();
    world
        .relationships
        .entry(alice)
        .or_default()
        .insert(bob, "friend".to_string());
    lock_door(&mut world, "a", "iron gate", "rel:friend:Bob");

    // Bob's account is deleted; the rule must be skipped, not granted.
    world.users.remove(&bob);
    world.add_player("s1", alice, Some("a".into()));

    let result = move_through(&mut world, "s1", "iron gate");
    assert_eq!(result.error.as_deref(), Some("The iron gate is locked."));
    assert_eq!(world.players["s1"].room_id, "a");
}

#[tokio::test]
async fn test_wrong_relationship_type_denies() {
    let (mut world, alice, bob) = locked_world();
    world
        .relationships
        .entry(alice)
        .or_default()
        .insert(bob, "rival".to_string());
    lock_door(&mut world, "a", "iron gate", "rel:friend:Bob");
    world.add_player("s1", alice, Some("a".into()));

    let result = move_through(&mut world, "s1", "iron gate");
    assert_eq!(result.error.as_deref(), Some("The iron gate is locked."));
}

#[tokio::test]
async fn test_allowlisted_user_passes_via_commands() {
    let ctx = AppContext::for_testing({
        let mut world = World::new();
        world.rooms.insert("a".into(), Room::new("a", "Room A."));
        world.start_room_id = Some("a".into());
        world
    });
    ctx.sessions.write().await.connect("s1");
    handle_input(&ctx, "s1", "/auth create Alice | hunter2 | warden").await;
    handle_input(&ctx, "s1", "/room create b | Room B.").await;
    handle_input(&ctx, "s1", "/room adddoor iron gate | b").await;
    handle_input(&ctx, "s1", "/room lockdoor iron gate | user:Alice").await;

    let outcome = handle_input(&ctx, "s1", "move through iron gate").await;
    let text: String = outcome
        .outbound
        .iter()
        .map(|o| o.payload.content.clone())
        .collect();
    assert!(text.contains("Room B."), "{}", text);
}
