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

//! Character sheets and the eight-slot inventory.
//!
//! One sheet type serves both player characters and NPCs. NPCs additionally
//! use the planner fields (`action_points`, `plan_queue`, sleep state) driven
//! by the world tick.

use crate::world::object::{Object, TAG_STOWED};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Number of inventory slots per character.
pub const INVENTORY_SLOTS: usize = 8;
/// Slot index of the left hand.
pub const SLOT_LEFT_HAND: usize = 0;
/// Slot index of the right hand.
pub const SLOT_RIGHT_HAND: usize = 1;
/// Small stow slots: indices 2..=5.
pub const SMALL_SLOTS: std::ops::Range<usize> = 2..6;
/// Large stow slots: indices 6..=7.
pub const LARGE_SLOTS: std::ops::Range<usize> = 6..8;

/// The eleven psychosocial matrix axes, each an opposing trait pair scored
/// in [-10, +10].
pub const MATRIX_AXES: [&str; 11] = [
    "auth_egal",
    "cons_lib",
    "intro_extro",
    "cynic_ideal",
    "caut_bold",
    "self_altru",
    "trad_innov",
    "stoic_emot",
    "serious_play",
    "frugal_lavish",
    "loyal_indep",
];

/// Clamp a need value to [0, 100].
pub fn clamp_need(v: f64) -> f64 {
    v.clamp(0.0, 100.0)
}

/// Clamp a psychosocial axis to [-10, +10].
pub fn clamp_axis(v: i32) -> i32 {
    v.clamp(-10, 10)
}

fn default_slots() -> Vec<Option<Object>> {
    vec![None; INVENTORY_SLOTS]
}

/// Fixed eight-slot inventory.
///
/// Layout: 0 = left hand, 1 = right hand, 2-5 = small stow, 6-7 = large
/// stow. Hands accept any size; stow slots are size-gated. Placing into a
/// stow slot sets the `stowed` tag; moving into a hand clears it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default = "default_slots")]
    pub slots: Vec<Option<Object>>,
}

impl Default for Inventory {
    fn default() -> Self {
        Self {
            slots: default_slots(),
        }
    }
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore the eight-slot shape after deserializing foreign data.
    pub fn normalize(&mut self) {
        self.slots.truncate(INVENTORY_SLOTS);
        while self.slots.len() < INVENTORY_SLOTS {
            self.slots.push(None);
        }
    }

    /// Whether `obj` may legally occupy `index` (ignoring occupancy).
    pub fn can_place(&self, index: usize, obj: &Object) -> bool {
        match index {
            SLOT_LEFT_HAND | SLOT_RIGHT_HAND => true,
            i if SMALL_SLOTS.contains(&i) => obj.is_small(),
            i if LARGE_SLOTS.contains(&i) => obj.is_large(),
            _ => false,
        }
    }

    /// Place an object into a specific slot, maintaining the `stowed`
    /// marker. Fails if the slot is occupied or size-incompatible.
    pub fn place(&mut self, index: usize, mut obj: Object) -> Result<(), Object> {
        if index >= INVENTORY_SLOTS || self.slots[index].is_some() || !self.can_place(index, &obj) {
            return Err(obj);
        }
        if index <= SLOT_RIGHT_HAND {
            obj.tags.remove(TAG_STOWED);
        } else {
            obj.tags.insert(TAG_STOWED.to_string());
        }
        self.slots[index] = Some(obj);
        Ok(())
    }

    /// Place by size-class preference: small objects try stow slots 2-5 then
    /// right hand then left; large objects try 6-7 then right then left;
    /// unsized objects go to hands only. Returns the slot used.
    pub fn auto_place(&mut self, obj: Object) -> Result<usize, Object> {
        let order: Vec<usize> = if obj.is_small() {
            SMALL_SLOTS
                .chain([SLOT_RIGHT_HAND, SLOT_LEFT_HAND])
                .collect()
        } else if obj.is_large() {
            LARGE_SLOTS
                .chain([SLOT_RIGHT_HAND, SLOT_LEFT_HAND])
                .collect()
        } else {
            vec![SLOT_RIGHT_HAND, SLOT_LEFT_HAND]
        };
        let mut obj = obj;
        for index in order {
            match self.place(index, obj) {
                Ok(()) => return Ok(index),
                Err(back) => obj = back,
            }
        }
        Err(obj)
    }

    pub fn remove(&mut self, index: usize) -> Option<Object> {
        if index >= INVENTORY_SLOTS {
            return None;
        }
        let mut obj = self.slots[index].take()?;
        obj.tags.remove(TAG_STOWED);
        Some(obj)
    }

    pub fn find_by_uuid(&self, uuid: &Uuid) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.as_ref().map(|o| &o.uuid == uuid).unwrap_or(false))
    }

    pub fn get(&self, index: usize) -> Option<&Object> {
        self.slots.get(index).and_then(|s| s.as_ref())
    }

    /// Iterate held objects with their slot indices.
    pub fn items(&self) -> impl Iterator<Item = (usize, &Object)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|o| (i, o)))
    }

    /// Count held objects whose display name matches (case-insensitive).
    pub fn count_by_name(&self, name: &str) -> usize {
        let low = name.to_lowercase();
        self.items()
            .filter(|(_, o)| o.display_name.to_lowercase() == low)
            .count()
    }

    /// Render the slot layout for the `/sheet` command.
    pub fn describe(&self) -> String {
        const LABELS: [&str; INVENTORY_SLOTS] = [
            "Left Hand",
            "Right Hand",
            "Small Slot 1",
            "Small Slot 2",
            "Small Slot 3",
            "Small Slot 4",
            "Large Slot 1",
            "Large Slot 2",
        ];
        LABELS
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let name = self
                    .get(i)
                    .map(|o| o.display_name.as_str())
                    .unwrap_or("[empty]");
                format!("{}: {}", label, name)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One queued NPC action: a tool name plus a JSON argument object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanAction {
    pub tool: String,
    #[serde(default)]
    pub args: Value,
}

impl PlanAction {
    pub fn new(tool: impl Into<String>, args: Value) -> Self {
        Self {
            tool: tool.into(),
            args,
        }
    }

    pub fn simple(tool: impl Into<String>) -> Self {
        Self::new(tool, Value::Object(Default::default()))
    }

    /// A record is well-formed when the tool is a non-empty string and args
    /// is an object (or absent). Malformed records are dropped by cleanup.
    pub fn is_well_formed(&self) -> bool {
        !self.tool.trim().is_empty() && (self.args.is_object() || self.args.is_null())
    }

    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(Value::as_str)
    }

    pub fn arg_uuid(&self, key: &str) -> Option<Uuid> {
        self.arg_str(key).and_then(|s| Uuid::parse_str(s).ok())
    }
}

/// A remembered event, bounded per sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub kind: String,
    pub detail: String,
}

/// Oldest memories are dropped past this bound.
pub const MAX_MEMORIES: usize = 50;

fn default_attr() -> i32 {
    10
}
fn default_trait() -> i32 {
    50
}
fn default_morale() -> i32 {
    50
}
fn default_need() -> f64 {
    100.0
}

/// Character sheet for players and NPCs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterSheet {
    pub display_name: String,
    #[serde(default)]
    pub description: String,

    // GURPS-style attributes, 3-18.
    #[serde(default = "default_attr")]
    pub strength: i32,
    #[serde(default = "default_attr")]
    pub dexterity: i32,
    #[serde(default = "default_attr")]
    pub intelligence: i32,
    #[serde(default = "default_attr")]
    pub health: i32,

    // Derived stats.
    #[serde(default = "default_attr")]
    pub hp: i32,
    #[serde(default = "default_attr")]
    pub max_hp: i32,
    #[serde(default = "default_attr")]
    pub will: i32,
    #[serde(default = "default_attr")]
    pub perception: i32,
    #[serde(default = "default_attr")]
    pub fp: i32,
    #[serde(default = "default_attr")]
    pub max_fp: i32,

    // Fate aspects.
    #[serde(default)]
    pub high_concept: String,
    #[serde(default)]
    pub trouble: String,
    #[serde(default)]
    pub background: String,
    #[serde(default)]
    pub focus: String,

    /// Psychosocial matrix, keyed by the `MATRIX_AXES` names, each in
    /// [-10, +10].
    #[serde(default)]
    pub matrix: BTreeMap<String, i32>,

    #[serde(default)]
    pub advantages: Vec<String>,
    #[serde(default)]
    pub disadvantages: Vec<String>,
    #[serde(default)]
    pub quirks: Vec<String>,

    // Combat state.
    #[serde(default = "default_morale")]
    pub morale: i32,
    #[serde(default)]
    pub yielded: bool,
    #[serde(default)]
    pub is_dead: bool,
    #[serde(default)]
    pub equipped_weapon: Option<Uuid>,
    #[serde(default)]
    pub equipped_armor: Option<Uuid>,

    // Needs, 0-100, full at 100.
    #[serde(default = "default_need")]
    pub hunger: f64,
    #[serde(default = "default_need")]
    pub thirst: f64,
    #[serde(default = "default_need")]
    pub socialization: f64,
    #[serde(default = "default_need")]
    pub sleep: f64,

    // Extended needs.
    #[serde(default = "default_need")]
    pub safety: f64,
    #[serde(default = "default_trait")]
    pub wealth_desire: i32,
    #[serde(default = "default_trait")]
    pub social_status: i32,

    // Personality traits, 0-100.
    #[serde(default = "default_trait")]
    pub responsibility: i32,
    #[serde(default = "default_trait")]
    pub aggression: i32,
    #[serde(default = "default_trait")]
    pub confidence: i32,
    #[serde(default = "default_trait")]
    pub curiosity: i32,

    #[serde(default)]
    pub currency: i64,

    #[serde(default)]
    pub memories: Vec<Memory>,
    /// Standing toward other entities, -100..+100.
    #[serde(default)]
    pub relationships: BTreeMap<Uuid, i32>,
    #[serde(default)]
    pub faction_id: Option<String>,

    // Planner state.
    #[serde(default)]
    pub action_points: i32,
    #[serde(default)]
    pub plan_queue: Vec<PlanAction>,
    #[serde(default)]
    pub sleeping_ticks_remaining: i32,
    #[serde(default)]
    pub sleeping_bed_uuid: Option<Uuid>,

    #[serde(default)]
    pub inventory: Inventory,
}

impl CharacterSheet {
    pub fn new(display_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            description: description.into(),
            strength: 10,
            dexterity: 10,
            intelligence: 10,
            health: 10,
            hp: 10,
            max_hp: 10,
            will: 10,
            perception: 10,
            fp: 10,
            max_fp: 10,
            high_concept: String::new(),
            trouble: String::new(),
            background: String::new(),
            focus: String::new(),
            matrix: BTreeMap::new(),
            advantages: Vec::new(),
            disadvantages: Vec::new(),
            quirks: Vec::new(),
            morale: 50,
            yielded: false,
            is_dead: false,
            equipped_weapon: None,
            equipped_armor: None,
            hunger: 100.0,
            thirst: 100.0,
            socialization: 100.0,
            sleep: 100.0,
            safety: 100.0,
            wealth_desire: 50,
            social_status: 50,
            responsibility: 50,
            aggression: 50,
            confidence: 50,
            curiosity: 50,
            currency: 0,
            memories: Vec::new(),
            relationships: BTreeMap::new(),
            faction_id: None,
            action_points: 0,
            plan_queue: Vec::new(),
            sleeping_ticks_remaining: 0,
            sleeping_bed_uuid: None,
            inventory: Inventory::new(),
        }
    }

    /// Set a matrix axis; unknown axes are rejected, values clamped.
    pub fn set_matrix_axis(&mut self, axis: &str, value: i32) -> Result<(), String> {
        if !MATRIX_AXES.contains(&axis) {
            return Err(format!(
                "Unknown matrix axis '{}'. Valid axes: {}",
                axis,
                MATRIX_AXES.join(", ")
            ));
        }
        self.matrix.insert(axis.to_string(), clamp_axis(value));
        Ok(())
    }

    /// Set a GURPS attribute by name, clamped to 3..=18.
    pub fn set_attribute(&mut self, name: &str, value: i32) -> Result<(), String> {
        let v = value.clamp(3, 18);
        match name {
            "strength" => self.strength = v,
            "dexterity" => self.dexterity = v,
            "intelligence" => self.intelligence = v,
            "health" => self.health = v,
            _ => {
                return Err(format!(
                    "Unknown attribute '{}'. Valid: strength, dexterity, intelligence, health",
                    name
                ))
            }
        }
        Ok(())
    }

    /// Set a fate aspect by name.
    pub fn set_aspect(&mut self, name: &str, value: &str) -> Result<(), String> {
        match name {
            "high_concept" => self.high_concept = value.to_string(),
            "trouble" => self.trouble = value.to_string(),
            "background" => self.background = value.to_string(),
            "focus" => self.focus = value.to_string(),
            _ => {
                return Err(format!(
                    "Unknown aspect '{}'. Valid: high_concept, trouble, background, focus",
                    name
                ))
            }
        }
        Ok(())
    }

    /// Append a memory, dropping the oldest past the bound.
    pub fn add_memory(&mut self, kind: impl Into<String>, detail: impl Into<String>) {
        self.memories.push(Memory {
            kind: kind.into(),
            detail: detail.into(),
        });
        if self.memories.len() > MAX_MEMORIES {
            let excess = self.memories.len() - MAX_MEMORIES;
            self.memories.drain(..excess);
        }
    }

    pub fn remembers(&self, kind: &str, detail: &str) -> bool {
        self.memories
            .iter()
            .any(|m| m.kind == kind && m.detail == detail)
    }

    /// Shift standing toward another entity, clamped to [-100, +100].
    pub fn adjust_relationship(&mut self, target: Uuid, delta: i32) {
        let current = self.relationships.get(&target).copied().unwrap_or(0);
        self.relationships
            .insert(target, (current + delta).clamp(-100, 100));
    }

    /// Whether the character is currently mid-sleep.
    pub fn is_sleeping(&self) -> bool {
        self.sleeping_ticks_remaining > 0
    }

    /// Render the sheet for the `/sheet` command.
    pub fn describe(&self) -> String {
        let mut lines = vec![
            format!("[b]{}[/b]", self.display_name),
            self.description.clone(),
            format!(
                "ST {} DX {} IQ {} HT {}",
                self.strength, self.dexterity, self.intelligence, self.health
            ),
            format!(
                "HP {}/{}  Will {}  Per {}  FP {}/{}",
                self.hp, self.max_hp, self.will, self.perception, self.fp, self.max_fp
            ),
            format!(
                "Needs: hunger {:.0} thirst {:.0} social {:.0} sleep {:.0}",
                self.hunger, self.thirst, self.socialization, self.sleep
            ),
        ];
        if !self.high_concept.is_empty() {
            lines.push(format!("High concept: {}", self.high_concept));
        }
        if !self.trouble.is_empty() {
            lines.push(format!("Trouble: {}", self.trouble));
        }
        lines.push(String::from("Inventory:"));
        lines.push(self.inventory.describe());
        lines.join("\n")
    }
}
