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

//! The NPC autonomy loop end to end: offline planning, the AI gate, sleep,
//! and mode-switch cleanup.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tinymud_server::config::GameConfig;
use tinymud_server::context::AppContext;
use tinymud_server::goap::tick::{run_world_tick, set_goap_mode};
use tinymud_server::llm::{LlmError, LlmManager, LlmProvider};
use tinymud_server::persistence::PersistenceManager;
use tinymud_server::world::object::Object;
use tinymud_server::world::room::Room;
use tinymud_server::world::sheet::CharacterSheet;
use tinymud_server::world::World;

/// Provider that counts invocations; used to assert the AI-off gate.
struct CountingProvider {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl LlmProvider for CountingProvider {
    fn name(&self) -> &str {
        "counting"
    }

    async fn generate(&self, _prompt: &str, _max_tokens: u32) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(r#"[{"tool": "do_nothing", "args": {}}]"#.to_string())
    }
}

fn world_with_hungry_gareth() -> World {
    let mut world = World::new();
    world.rooms.insert("start".into(), Room::new("start", "The beginning."));
    let mut sheet = CharacterSheet::new("Gareth", "A tired guard.");
    sheet.hunger = 20.0;
    sheet.action_points = 3;
    world.npc_sheets.insert("Gareth".into(), sheet);
    world.get_or_create_npc_id("Gareth");
    world.rooms.get_mut("start").unwrap().npcs.insert("Gareth".into());

    let apple = Object::new("apple", "A crisp apple.")
        .with_tag("small")
        .with_tag("Edible: 40");
    world
        .rooms
        .get_mut("start")
        .unwrap()
        .objects
        .insert(apple.uuid, apple);
    world
}

fn ctx_with_counting_provider(world: World, calls: Arc<AtomicUsize>) -> AppContext {
    let dir = std::env::temp_dir().join(format!("tinymud-goap-{}", uuid::Uuid::new_v4()));
    AppContext::new(
        world,
        PersistenceManager::new(dir.join("world.json"), 50),
        LlmManager::with_provider(
            Arc::new(CountingProvider { calls }),
            Duration::from_secs(5),
            10_000,
        ),
        GameConfig::default(),
    )
}

#[tokio::test]
async fn test_offline_planning_feeds_hungry_npc() {
    let calls = Arc::new(AtomicUsize::new(0));
    let ctx = ctx_with_counting_provider(world_with_hungry_gareth(), calls.clone());

    let broadcasts = run_world_tick(&ctx).await;

    // Planning went offline: no adapter call was made
    // (advanced_goap_enabled is false and no player shares the room).
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let world = ctx.world.read().await;
    let sheet = &world.npc_sheets["Gareth"];
    // Needs decayed by 1, then the apple restored 40: 20 - 1 + 40.
    assert_eq!(sheet.hunger, 59.0);
    // Two actions executed (get + consume) from an AP budget of 3.
    assert_eq!(sheet.action_points, 1);
    assert!(sheet.plan_queue.is_empty());
    // The apple is gone from both the room and the inventory.
    assert!(world.rooms["start"].objects.is_empty());
    assert_eq!(sheet.inventory.count_by_name("apple"), 0);

    let text: String = broadcasts.iter().map(|(_, p)| p.content.clone()).collect();
    assert!(text.contains("picks up the apple"), "{}", text);
    assert!(text.contains("eats the apple"), "{}", text);
}

#[tokio::test]
async fn test_second_tick_no_replanning_above_threshold() {
    let calls = Arc::new(AtomicUsize::new(0));
    let ctx = ctx_with_counting_provider(world_with_hungry_gareth(), calls.clone());

    run_world_tick(&ctx).await;
    let broadcasts = run_world_tick(&ctx).await;

    let world = ctx.world.read().await;
    let sheet = &world.npc_sheets["Gareth"];
    // Second tick only decays: 59 - 1.
    assert_eq!(sheet.hunger, 58.0);
    assert!(sheet.plan_queue.is_empty());
    // No action broadcasts from Gareth this tick.
    let text: String = broadcasts.iter().map(|(_, p)| p.content.clone()).collect();
    assert!(!text.contains("picks up"), "{}", text);
}

#[tokio::test]
async fn test_ai_gate_requires_all_three_conditions() {
    let calls = Arc::new(AtomicUsize::new(0));
    let ctx = ctx_with_counting_provider(world_with_hungry_gareth(), calls.clone());

    // advanced on + adapter configured, but no player in the room: offline.
    {
        let mut world = ctx.world.write().await;
        world.advanced_goap_enabled = true;
    }
    run_world_tick(&ctx).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // Now put a live player in the room and make Gareth hungry again.
    {
        let mut world = ctx.world.write().await;
        let uid = world.create_user("Alice", "$h", "").unwrap();
        world.add_player("s1", uid, Some("start".into()));
        let sheet = world.npc_sheets.get_mut("Gareth").unwrap();
        sheet.hunger = 10.0;
        sheet.plan_queue.clear();
    }
    run_world_tick(&ctx).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_ai_off_gate_never_calls_adapter() {
    let calls = Arc::new(AtomicUsize::new(0));
    let ctx = ctx_with_counting_provider(world_with_hungry_gareth(), calls.clone());
    {
        // Even with a player present, the gate stays closed when the mode
        // is off.
        let mut world = ctx.world.write().await;
        let uid = world.create_user("Alice", "$h", "").unwrap();
        world.add_player("s1", uid, Some("start".into()));
        assert!(!world.advanced_goap_enabled);
    }
    for _ in 0..3 {
        run_world_tick(&ctx).await;
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_mode_switch_clears_plan_queues() {
    let ctx = AppContext::for_testing(world_with_hungry_gareth());
    run_world_tick(&ctx).await;
    {
        let mut world = ctx.world.write().await;
        // Force a residual plan.
        world.npc_sheets.get_mut("Gareth").unwrap().plan_queue =
            vec![tinymud_server::world::sheet::PlanAction::simple("do_nothing")];
        set_goap_mode(&mut world, true);
        assert!(world.npc_sheets["Gareth"].plan_queue.is_empty());
    }
}

#[tokio::test]
async fn test_sleep_cycle() {
    let mut world = World::new();
    world.rooms.insert("start".into(), Room::new("start", "The beginning."));
    let mut sheet = CharacterSheet::new("Gareth", "A tired guard.");
    sheet.sleep = 10.0;
    sheet.action_points = 3;
    world.npc_sheets.insert("Gareth".into(), sheet);
    let npc_id = world.get_or_create_npc_id("Gareth");
    world.rooms.get_mut("start").unwrap().npcs.insert("Gareth".into());
    let mut bed = Object::new("straw bed", "Lumpy.").with_tag("bed");
    bed.owner_id = Some(npc_id);
    world.rooms.get_mut("start").unwrap().objects.insert(bed.uuid, bed);

    let ctx = AppContext::for_testing(world);

    // Tick 1: plans and falls asleep.
    run_world_tick(&ctx).await;
    {
        let world = ctx.world.read().await;
        let sheet = &world.npc_sheets["Gareth"];
        assert!(sheet.is_sleeping(), "should be sleeping");
        assert!(sheet.sleeping_bed_uuid.is_some());
    }

    // Sleeping ticks: refills, then wakes with the bed reference cleared.
    for _ in 0..ctx.game.sleep_ticks {
        run_world_tick(&ctx).await;
    }
    let world = ctx.world.read().await;
    let sheet = &world.npc_sheets["Gareth"];
    assert!(!sheet.is_sleeping());
    assert_eq!(sheet.sleeping_bed_uuid, None);
    assert!(sheet.sleep > 10.0);
}

#[tokio::test]
async fn test_needs_stay_bounded_over_many_ticks() {
    let ctx = AppContext::for_testing(world_with_hungry_gareth());
    for _ in 0..50 {
        run_world_tick(&ctx).await;
    }
    let world = ctx.world.read().await;
    let sheet = &world.npc_sheets["Gareth"];
    for value in [sheet.hunger, sheet.thirst, sheet.socialization, sheet.sleep] {
        assert!((0.0..=100.0).contains(&value), "need out of range: {}", value);
    }
    assert!(sheet.action_points >= 0);
}
