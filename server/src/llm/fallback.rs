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

//! Deterministic fallback generator.
//!
//! When no AI adapter is configured, or the adapter errors or times out,
//! this generator produces contextually seeded content. The seed is derived
//! from the world name combined with the prompt, so the same world and
//! request always yield the same output. Prompt intent is detected
//! shallowly: planning prompts get a JSON action array, character prompts
//! get a profile object, everything else gets a dialogue line.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

const DIALOGUE_LINES: [&str; 8] = [
    "Hmm. Strange days in these parts.",
    "I've seen travelers come and go. Few stay long.",
    "The roads aren't what they used to be.",
    "Keep your wits about you around here.",
    "There's always work for those willing to look.",
    "Weather's turning. I can feel it in my knees.",
    "You're not from around here, are you?",
    "Some doors are better left closed, friend.",
];

const NPC_CONCEPTS: [(&str, &str); 6] = [
    ("Weathered Caravan Guard", "Quietly watches every exit."),
    ("Curious Herbalist", "Smells faintly of crushed mint."),
    ("Retired Dockhand", "Still ties knots out of habit."),
    ("Wandering Chronicler", "Scribbles notes mid-conversation."),
    ("Soft-spoken Baker", "Flour never quite leaves their sleeves."),
    ("Restless Tinker", "Pockets full of odd springs."),
];

const NPC_TROUBLES: [&str; 6] = [
    "Owes money to the wrong people",
    "Cannot resist a locked box",
    "Haunted by an old storm at sea",
    "Trusts strangers too quickly",
    "Keeps a secret that is not theirs",
    "Never finishes what they start",
];

/// Stable seed from the world name and prompt.
pub fn seed_for(world_name: &str, prompt: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    world_name.hash(&mut hasher);
    prompt.hash(&mut hasher);
    hasher.finish()
}

/// Deterministic stand-in for the external adapter.
#[derive(Debug, Default, Clone)]
pub struct FallbackGenerator;

impl FallbackGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Produce seeded content matched to the prompt's apparent intent.
    pub fn generate(&self, world_name: &str, prompt: &str) -> String {
        let mut rng = StdRng::seed_from_u64(seed_for(world_name, prompt));
        let low = prompt.to_lowercase();
        if low.contains("json array") || low.contains("plan") {
            self.generate_plan(&mut rng)
        } else if low.contains("character") || low.contains("npc") || low.contains("profile") {
            self.generate_profile(&mut rng)
        } else {
            DIALOGUE_LINES[rng.gen_range(0..DIALOGUE_LINES.len())].to_string()
        }
    }

    fn generate_plan(&self, rng: &mut StdRng) -> String {
        // A safe minimal plan; the offline planner handles real goal
        // selection, so the fallback only ever idles or emotes.
        if rng.gen_bool(0.5) {
            r#"[{"tool": "do_nothing", "args": {}}]"#.to_string()
        } else {
            r#"[{"tool": "emote", "args": {"message": "glances around thoughtfully."}}]"#.to_string()
        }
    }

    fn generate_profile(&self, rng: &mut StdRng) -> String {
        let (concept, quirk) = NPC_CONCEPTS[rng.gen_range(0..NPC_CONCEPTS.len())];
        let trouble = NPC_TROUBLES[rng.gen_range(0..NPC_TROUBLES.len())];
        let attrs: Vec<i32> = (0..4).map(|_| rng.gen_range(8..=14)).collect();
        serde_json::json!({
            "high_concept": concept,
            "trouble": trouble,
            "background": quirk,
            "focus": "Getting through the day",
            "strength": attrs[0],
            "dexterity": attrs[1],
            "intelligence": attrs[2],
            "health": attrs[3],
            "psychosocial_matrix": {
                "auth_egal": rng.gen_range(-5..=5),
                "cons_lib": rng.gen_range(-5..=5)
            }
        })
        .to_string()
    }
}
