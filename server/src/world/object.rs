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

//! Game objects and their semantic tag vocabulary.
//!
//! An object lives either in a room's `objects` map or in exactly one
//! inventory slot, never both. Affordances are tag-driven: the tag set on an
//! object decides which interactions it offers (`weapon` enables Wield,
//! `Container` enables Open/Search, `Edible: N` carries nutrition, and so on).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Size class: fits the four small stow slots.
pub const TAG_SMALL: &str = "small";
/// Size class: fits the two large stow slots.
pub const TAG_LARGE: &str = "large";
/// Marks a door or stair object; requires `link_target_room_id`.
pub const TAG_TRAVEL_POINT: &str = "Travel Point";
/// Cannot be picked up. Doors and stairs carry this alongside `Travel Point`.
pub const TAG_IMMOVABLE: &str = "Immovable";
/// Enables Open and Search; containers hold 2 small + 2 large internal slots.
pub const TAG_CONTAINER: &str = "Container";
/// Enables Wield; hand slots preferred.
pub const TAG_WEAPON: &str = "weapon";
/// Runtime marker set when an object sits in a stow slot, cleared in hands.
pub const TAG_STOWED: &str = "stowed";
/// Slept-upon objects; sleeping requires an owned bed.
pub const TAG_BED: &str = "bed";
/// Prefix for dynamic crafting-station tags: `craft spot:<template_key>`.
pub const TAG_CRAFT_SPOT_PREFIX: &str = "craft spot:";

fn default_container_slots() -> Vec<Option<Object>> {
    vec![None, None]
}

/// A single world object.
///
/// Objects created from templates deep-copy the template and receive a fresh
/// UUID; templates themselves live in `World::object_templates` and are never
/// placed into rooms directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub uuid: Uuid,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    /// Owning entity (user or NPC id); None when unowned.
    #[serde(default)]
    pub owner_id: Option<Uuid>,
    /// Target room for `Travel Point` objects.
    #[serde(default)]
    pub link_target_room_id: Option<String>,
    /// Free-form tag set; recognized tags are the `TAG_*` constants plus
    /// `Edible: N` / `Drinkable: N` value tags.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub material: Option<String>,
    /// Component display names required to craft this object.
    #[serde(default)]
    pub crafting_recipe: Vec<String>,
    /// Objects spawned into the room when this object is consumed.
    #[serde(default)]
    pub deconstruct_recipe: Vec<Object>,
    /// Trade/steal value heuristic.
    #[serde(default)]
    pub value: i64,
    #[serde(default)]
    pub weapon_damage: Option<i32>,
    #[serde(default)]
    pub armor_defense: Option<i32>,
    /// Template-only: display name of the container this loot spawns in.
    #[serde(default)]
    pub loot_location_hint: Option<String>,
    /// Container runtime state.
    #[serde(default)]
    pub container_searched: bool,
    #[serde(default = "default_container_slots")]
    pub container_small_slots: Vec<Option<Object>>,
    #[serde(default = "default_container_slots")]
    pub container_large_slots: Vec<Option<Object>>,
}

impl Object {
    /// Create a bare object with a fresh UUID.
    pub fn new(display_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            display_name: display_name.into(),
            description: description.into(),
            owner_id: None,
            link_target_room_id: None,
            tags: BTreeSet::new(),
            material: None,
            crafting_recipe: Vec::new(),
            deconstruct_recipe: Vec::new(),
            value: 0,
            weapon_damage: None,
            armor_defense: None,
            loot_location_hint: None,
            container_searched: false,
            container_small_slots: default_container_slots(),
            container_large_slots: default_container_slots(),
        }
    }

    /// Builder-style tag addition.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Builder-style travel link.
    pub fn with_link(mut self, room_id: impl Into<String>) -> Self {
        self.link_target_room_id = Some(room_id.into());
        self
    }

    /// Construct a door/stair object for a room connection.
    pub fn travel_point(
        uuid: Uuid,
        display_name: impl Into<String>,
        description: impl Into<String>,
        target_room_id: impl Into<String>,
    ) -> Self {
        let mut obj = Object::new(display_name, description);
        obj.uuid = uuid;
        obj.tags.insert(TAG_IMMOVABLE.to_string());
        obj.tags.insert(TAG_TRAVEL_POINT.to_string());
        obj.link_target_room_id = Some(target_room_id.into());
        obj
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Parse the integer value of a `<key>: N` tag, matching the key
    /// case-insensitively (`Edible: 10`, `edible:10`, `EDIBLE: +10`).
    pub fn tag_value(&self, key: &str) -> Option<i64> {
        let key_low = key.trim().to_lowercase();
        for tag in &self.tags {
            let mut parts = tag.splitn(2, ':');
            let left = parts.next()?.trim().to_lowercase();
            let right = match parts.next() {
                Some(r) => r.trim(),
                None => continue,
            };
            if left == key_low {
                let digits = right.strip_prefix('+').unwrap_or(right);
                if let Ok(v) = digits.parse::<i64>() {
                    return Some(v);
                }
            }
        }
        None
    }

    /// Satiation and hydration amounts from `Edible`/`Drinkable` tags.
    pub fn nutrition(&self) -> (i64, i64) {
        (
            self.tag_value("Edible").unwrap_or(0),
            self.tag_value("Drinkable").unwrap_or(0),
        )
    }

    pub fn is_edible(&self) -> bool {
        self.tag_value("Edible").is_some()
    }

    pub fn is_drinkable(&self) -> bool {
        self.tag_value("Drinkable").is_some()
    }

    pub fn is_small(&self) -> bool {
        self.has_tag(TAG_SMALL)
    }

    pub fn is_large(&self) -> bool {
        self.has_tag(TAG_LARGE)
    }

    pub fn is_immovable(&self) -> bool {
        self.has_tag(TAG_IMMOVABLE) || self.has_tag(TAG_TRAVEL_POINT)
    }

    /// Template keys from any `craft spot:<key>` tags, in tag order.
    pub fn craft_spot_templates(&self) -> Vec<String> {
        self.tags
            .iter()
            .filter_map(|t| {
                let low = t.to_lowercase();
                if low.starts_with(TAG_CRAFT_SPOT_PREFIX) {
                    Some(t[TAG_CRAFT_SPOT_PREFIX.len()..].trim().to_string())
                } else {
                    None
                }
            })
            .filter(|k| !k.is_empty())
            .collect()
    }

    /// Instantiate a fresh object from this template: deep copy with a new
    /// UUID and cleared runtime state.
    pub fn instantiate(&self) -> Object {
        let mut obj = self.clone();
        obj.uuid = Uuid::new_v4();
        obj.owner_id = None;
        obj.container_searched = false;
        obj.tags.remove(TAG_STOWED);
        obj
    }
}
