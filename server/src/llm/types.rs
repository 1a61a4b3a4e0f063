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

//! Common types for the AI adapter tier.

use crate::world::SafetyLevel;

/// AI adapter error kinds. These never reach players directly; callers
/// substitute the deterministic fallback or their offline path.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Timed out after {0}s")]
    Timeout(u64),
    #[error("No AI provider configured")]
    Unavailable,
    #[error("Response was not parseable: {0}")]
    Parse(String),
}

/// Map the world safety band to a content instruction for the adapter. The
/// endpoint owns the real enforcement; this is the adapter-facing setting.
pub fn safety_instruction(level: SafetyLevel) -> Option<&'static str> {
    match level {
        SafetyLevel::G => Some(
            "Content rating: G. Keep all generated content wholesome and suitable for all ages.",
        ),
        SafetyLevel::Pg13 => Some(
            "Content rating: PG-13. Mild peril and conflict are fine; avoid graphic or explicit content.",
        ),
        SafetyLevel::R => Some(
            "Content rating: R. Mature themes and violence are permitted; avoid gratuitous explicit content.",
        ),
        SafetyLevel::Off => None,
    }
}
