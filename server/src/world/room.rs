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

//! Rooms: the places of the world.
//!
//! A room connection is dual-represented: `doors` maps a door name to the
//! target room id for fast traversal, while `objects` holds a matching
//! `Immovable` + `Travel Point` object (keyed by the UUID in `door_ids`)
//! carrying the interactive affordances. The room service keeps both views,
//! plus the reciprocal door on the target side, in agreement; the validator
//! audits that invariant.

use crate::world::object::{Object, TAG_TRAVEL_POINT};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// One relationship-based lock rule: actors related to `to` by `rtype` pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipRule {
    #[serde(rename = "type")]
    pub rtype: String,
    pub to: Uuid,
}

/// Lock policy for a door. An empty policy denies everyone; a door with no
/// policy entry at all is unlocked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DoorLockPolicy {
    #[serde(default)]
    pub allow_ids: BTreeSet<Uuid>,
    #[serde(default)]
    pub allow_rel: Vec<RelationshipRule>,
}

impl DoorLockPolicy {
    pub fn is_empty(&self) -> bool {
        self.allow_ids.is_empty() && self.allow_rel.is_empty()
    }
}

/// A place holding players, NPCs, objects, and exits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    /// Short opaque identifier, the key in `World::rooms`.
    pub id: String,
    #[serde(default)]
    pub description: String,
    /// Live session ids present; never persisted.
    #[serde(skip)]
    pub players: BTreeSet<String>,
    /// NPC display names present.
    #[serde(default)]
    pub npcs: BTreeSet<String>,
    /// Door name -> target room id.
    #[serde(default)]
    pub doors: BTreeMap<String, String>,
    #[serde(default)]
    pub stairs_up_to: Option<String>,
    #[serde(default)]
    pub stairs_down_to: Option<String>,
    /// Stable identity of the room itself.
    #[serde(default = "Uuid::new_v4")]
    pub uuid: Uuid,
    /// Door name -> door object UUID.
    #[serde(default)]
    pub door_ids: BTreeMap<String, Uuid>,
    #[serde(default)]
    pub stairs_up_id: Option<Uuid>,
    #[serde(default)]
    pub stairs_down_id: Option<Uuid>,
    /// Door name -> lock policy.
    #[serde(default)]
    pub door_locks: BTreeMap<String, DoorLockPolicy>,
    /// Objects present, keyed by UUID.
    #[serde(default)]
    pub objects: BTreeMap<Uuid, Object>,
    /// Optional room tags: `external`, `internal`, `ownable`.
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl Room {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            players: BTreeSet::new(),
            npcs: BTreeSet::new(),
            doors: BTreeMap::new(),
            stairs_up_to: None,
            stairs_down_to: None,
            uuid: Uuid::new_v4(),
            door_ids: BTreeMap::new(),
            stairs_up_id: None,
            stairs_down_id: None,
            door_locks: BTreeMap::new(),
            objects: BTreeMap::new(),
            tags: BTreeSet::new(),
        }
    }

    /// Travel-point objects present, with their door/stair display names.
    pub fn travel_points(&self) -> impl Iterator<Item = &Object> {
        self.objects
            .values()
            .filter(|o| o.has_tag(TAG_TRAVEL_POINT))
    }

    /// All traversal target room ids reachable from here (doors, stairs,
    /// loose travel points).
    pub fn adjacent_room_ids(&self) -> BTreeSet<String> {
        let mut out: BTreeSet<String> = self.doors.values().cloned().collect();
        if let Some(up) = &self.stairs_up_to {
            out.insert(up.clone());
        }
        if let Some(down) = &self.stairs_down_to {
            out.insert(down.clone());
        }
        for obj in self.travel_points() {
            if let Some(target) = &obj.link_target_room_id {
                out.insert(target.clone());
            }
        }
        out
    }

    /// Names usable with "move through": doors first, then travel-point
    /// object display names not already covered by a door entry.
    pub fn exit_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.doors.keys().cloned().collect();
        for obj in self.travel_points() {
            if !self.doors.contains_key(&obj.display_name) {
                names.push(obj.display_name.clone());
            }
        }
        names.sort();
        names.dedup();
        names
    }

    /// Non-travel-point objects visible to a looker.
    pub fn visible_objects(&self) -> impl Iterator<Item = &Object> {
        self.objects
            .values()
            .filter(|o| !o.has_tag(TAG_TRAVEL_POINT))
    }
}
