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

//! Application context threading shared state through the dispatcher.
//!
//! The world is the single shared mutable resource, guarded by one RwLock:
//! every command mutation holds the write guard for its whole transition,
//! the tick holds it per mutation phase, and all blocking work (AI calls,
//! disk writes) happens with no guard held.

use crate::config::GameConfig;
use crate::llm::LlmManager;
use crate::persistence::PersistenceManager;
use crate::ratelimit::RateLimiter;
use crate::session::SessionRegistry;
use crate::world::World;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared handles for routers, services, the tick, and the listener.
#[derive(Clone)]
pub struct AppContext {
    pub world: Arc<RwLock<World>>,
    pub sessions: Arc<RwLock<SessionRegistry>>,
    pub persistence: Arc<PersistenceManager>,
    pub llm: Arc<LlmManager>,
    pub limiter: Arc<RateLimiter>,
    pub game: GameConfig,
}

impl AppContext {
    pub fn new(
        world: World,
        persistence: PersistenceManager,
        llm: LlmManager,
        game: GameConfig,
    ) -> Self {
        let limiter = Arc::new(RateLimiter::new(game.rate_enable));
        Self {
            world: Arc::new(RwLock::new(world)),
            sessions: Arc::new(RwLock::new(SessionRegistry::new())),
            persistence: Arc::new(persistence),
            llm: Arc::new(llm),
            limiter,
            game,
        }
    }

    /// Convenience constructor for tests: fresh world, temp persistence,
    /// offline AI, default tuning.
    pub fn for_testing(world: World) -> Self {
        let dir = std::env::temp_dir().join(format!("tinymud-test-{}", uuid::Uuid::new_v4()));
        let path = dir.join("world.json");
        Self::new(
            world,
            PersistenceManager::new(path, 50),
            LlmManager::offline(),
            GameConfig::default(),
        )
    }
}
