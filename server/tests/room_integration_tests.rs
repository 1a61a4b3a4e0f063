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

//! Room creation and door reciprocity through the command surface.

use tinymud_server::commands::handle_input;
use tinymud_server::context::AppContext;
use tinymud_server::validate::audit_world;
use tinymud_server::world::object::{TAG_IMMOVABLE, TAG_TRAVEL_POINT};
use tinymud_server::world::room::Room;
use tinymud_server::world::World;

async fn admin_ctx() -> AppContext {
    let mut world = World::new();
    world.rooms.insert("start".into(), Room::new("start", "The beginning."));
    world.start_room_id = Some("start".into());
    let ctx = AppContext::for_testing(world);
    ctx.sessions.write().await.connect("s1");
    handle_input(&ctx, "s1", "/auth create Alice | hunter2 | an architect").await;
    ctx
}

#[tokio::test]
async fn test_room_create_and_door_reciprocity() {
    let ctx = admin_ctx().await;

    handle_input(&ctx, "s1", "/room create tavern | A warm tavern.").await;
    let outcome = handle_input(&ctx, "s1", "/room adddoor oak door | tavern").await;
    assert!(
        outcome
            .outbound
            .iter()
            .all(|o| !matches!(o.payload.kind, tinymud_common::MessageType::Error)),
        "adddoor failed"
    );

    let world = ctx.world.read().await;
    // Alice stands in start (her current room when she ran adddoor).
    let (_, player) = world.players.iter().next().unwrap();
    assert_eq!(player.room_id, "start");
    assert_eq!(
        world.rooms["start"].doors.get("oak door").map(String::as_str),
        Some("tavern")
    );
    // The far side targets back.
    assert!(world.rooms["tavern"].doors.values().any(|t| t == "start"));

    // Both sides carry consistent travel-point objects.
    for (room_id, far) in [("start", "tavern"), ("tavern", "start")] {
        let room = &world.rooms[room_id];
        let (name, target) = room
            .doors
            .iter()
            .find(|(_, t)| t.as_str() == far)
            .expect("door present");
        let id = room.door_ids[name];
        let obj = &room.objects[&id];
        assert!(obj.has_tag(TAG_IMMOVABLE));
        assert!(obj.has_tag(TAG_TRAVEL_POINT));
        assert_eq!(obj.link_target_room_id.as_deref(), Some(target.as_str()));
    }

    // The validator finds nothing wrong.
    let report = audit_world(&world);
    assert!(report.is_healthy(), "{:?}", report.issues);
}

#[tokio::test]
async fn test_movement_through_created_door() {
    let ctx = admin_ctx().await;
    handle_input(&ctx, "s1", "/room create tavern | A warm tavern.").await;
    handle_input(&ctx, "s1", "/room adddoor oak door | tavern").await;

    let outcome = handle_input(&ctx, "s1", "move through the oak door").await;
    let text: String = outcome
        .outbound
        .iter()
        .map(|o| o.payload.content.clone())
        .collect();
    assert!(text.contains("warm tavern"), "{}", text);
    let world = ctx.world.read().await;
    let sid = world.players.keys().next().unwrap().clone();
    assert_eq!(world.players[&sid].room_id, "tavern");
}

#[tokio::test]
async fn test_stairs_reciprocity_via_commands() {
    let ctx = admin_ctx().await;
    handle_input(&ctx, "s1", "/room create loft | Dusty rafters.").await;
    handle_input(&ctx, "s1", "/room setstairs loft | -").await;

    let world = ctx.world.read().await;
    assert_eq!(world.rooms["start"].stairs_up_to.as_deref(), Some("loft"));
    assert_eq!(world.rooms["loft"].stairs_down_to.as_deref(), Some("start"));
    assert!(audit_world(&world).is_healthy());
}
