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

//! Door lock policy evaluation.
//!
//! A door with no policy entry is unlocked. A present policy grants
//! traversal when the actor id is allow-listed, or when some relationship
//! rule matches: the rule's target user must still exist in the world and
//! the relationship graph must record exactly that type from actor to
//! target. A rule whose target account was deleted is skipped, never
//! granted. An empty policy denies everyone.

use crate::world::room::{DoorLockPolicy, Room};
use crate::world::World;
use uuid::Uuid;

/// Evaluate a policy for an actor.
pub fn policy_permits(world: &World, actor_id: Uuid, policy: &DoorLockPolicy) -> bool {
    if policy.is_empty() {
        return false;
    }
    if policy.allow_ids.contains(&actor_id) {
        return true;
    }
    let actor_edges = world.relationships.get(&actor_id);
    for rule in &policy.allow_rel {
        if rule.rtype.trim().is_empty() {
            continue;
        }
        // Deleted accounts never grant access.
        if !world.users.contains_key(&rule.to) {
            continue;
        }
        let matches = actor_edges
            .and_then(|edges| edges.get(&rule.to))
            .map(|rtype| rtype == &rule.rtype)
            .unwrap_or(false);
        if matches {
            return true;
        }
    }
    false
}

/// Whether `actor_id` may traverse the named door of `room`. Door names
/// must already be resolved to the exact key.
pub fn door_traversal_permitted(
    world: &World,
    actor_id: Uuid,
    room: &Room,
    door_name: &str,
) -> bool {
    match room.door_locks.get(door_name) {
        None => true,
        Some(policy) => policy_permits(world, actor_id, policy),
    }
}
