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

//! AI adapter: the thin wrapper the core talks through.
//!
//! Every call is bounded by a hard timeout and a response-size cap. Dialogue
//! and content generation fall back to the deterministic seeded generator
//! when the adapter is absent or failing; plan generation propagates the
//! error so the planner can take its offline path instead.

pub mod fallback;
pub mod provider;
pub mod types;

pub use fallback::{seed_for, FallbackGenerator};
pub use provider::{HttpProvider, LlmProvider};
pub use types::{safety_instruction, LlmError};

use crate::config::AiConfig;
use crate::world::SafetyLevel;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Default token budget for dialogue-sized requests.
const CHAT_MAX_TOKENS: u32 = 500;
/// Token budget for plan requests (up to four small action records).
const PLAN_MAX_TOKENS: u32 = 400;

/// Adapter facade owned by the application context.
pub struct LlmManager {
    provider: Option<Arc<dyn LlmProvider>>,
    timeout: Duration,
    max_response_length: usize,
    fallback: FallbackGenerator,
}

impl LlmManager {
    /// Build from configuration; with no endpoint the manager is
    /// fallback-only.
    pub fn from_config(config: &AiConfig) -> Self {
        let provider: Option<Arc<dyn LlmProvider>> = if config.endpoint.is_some() {
            match HttpProvider::new(config) {
                Ok(p) => Some(Arc::new(p)),
                Err(e) => {
                    tracing::warn!("AI provider misconfigured, running fallback-only: {}", e);
                    None
                }
            }
        } else {
            None
        };
        Self {
            provider,
            timeout: Duration::from_secs(config.timeout_seconds),
            max_response_length: config.max_response_length,
            fallback: FallbackGenerator::new(),
        }
    }

    /// Test seam: install a specific provider.
    pub fn with_provider(
        provider: Arc<dyn LlmProvider>,
        timeout: Duration,
        max_response_length: usize,
    ) -> Self {
        Self {
            provider: Some(provider),
            timeout,
            max_response_length,
            fallback: FallbackGenerator::new(),
        }
    }

    /// Fallback-only manager.
    pub fn offline() -> Self {
        Self {
            provider: None,
            timeout: Duration::from_secs(30),
            max_response_length: 10_000,
            fallback: FallbackGenerator::new(),
        }
    }

    /// Whether a real adapter is configured. The AI planning path requires
    /// this in addition to `advanced_goap_enabled`.
    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    /// One adapter round-trip: timeout-bounded, size-capped.
    async fn call(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        let provider = self.provider.as_ref().ok_or(LlmError::Unavailable)?;
        let result = tokio::time::timeout(self.timeout, provider.generate(prompt, max_tokens))
            .await
            .map_err(|_| LlmError::Timeout(self.timeout.as_secs()))??;
        Ok(self.truncate(result))
    }

    fn truncate(&self, mut text: String) -> String {
        if text.len() > self.max_response_length {
            let mut cut = self.max_response_length;
            while cut > 0 && !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text.truncate(cut);
            tracing::warn!(
                "AI response truncated to {} characters",
                self.max_response_length
            );
        }
        text
    }

    /// Dialogue/content generation: never fails. Adapter errors substitute
    /// the deterministic fallback and are logged, not surfaced.
    pub async fn chat(&self, world_name: &str, safety: SafetyLevel, prompt: &str) -> String {
        let full_prompt = match safety_instruction(safety) {
            Some(instruction) => format!("{}\n\n{}", instruction, prompt),
            None => prompt.to_string(),
        };
        match self.call(&full_prompt, CHAT_MAX_TOKENS).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                tracing::warn!("AI returned empty response; using fallback");
                self.fallback.generate(world_name, prompt)
            }
            Err(e) => {
                tracing::warn!("AI chat failed ({}); using fallback", e);
                self.fallback.generate(world_name, prompt)
            }
        }
    }

    /// Structured generation (NPC profiles, world content): adapter output
    /// or deterministic fallback, parsed as JSON.
    pub async fn generate_json(
        &self,
        world_name: &str,
        safety: SafetyLevel,
        prompt: &str,
    ) -> Result<Value, LlmError> {
        let text = self.chat(world_name, safety, prompt).await;
        extract_json(&text).ok_or_else(|| LlmError::Parse(preview(&text)))
    }

    /// Plan generation: errors propagate so the planner can fall back to
    /// its offline path. Best-effort JSON extraction handles truncated or
    /// chatty responses.
    pub async fn plan(&self, prompt: &str) -> Result<Value, LlmError> {
        let text = self.call(prompt, PLAN_MAX_TOKENS).await?;
        extract_json(&text)
            .filter(Value::is_array)
            .ok_or_else(|| LlmError::Parse(preview(&text)))
    }
}

fn preview(text: &str) -> String {
    text.chars().take(80).collect()
}

/// Best-effort JSON extraction: parse directly, or find the outermost
/// bracketed region and shrink from the right until something parses. This
/// recovers arrays from responses wrapped in prose or cut off mid-stream.
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }
    let start = trimmed.find(|c: char| c == '[' || c == '{')?;
    let slice = &trimmed[start..];
    // Walk candidate end positions from the far end inward.
    let closers: Vec<usize> = slice
        .char_indices()
        .filter(|(_, c)| *c == ']' || *c == '}')
        .map(|(i, c)| i + c.len_utf8())
        .collect();
    for end in closers.into_iter().rev() {
        if let Ok(value) = serde_json::from_str::<Value>(&slice[..end]) {
            return Some(value);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted provider for tests.
    struct ScriptedProvider {
        response: Result<String, LlmError>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn ok(text: &str) -> Self {
            Self {
                response: Ok(text.to_string()),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        fn slow(text: &str, delay: Duration) -> Self {
            Self {
                response: Ok(text.to_string()),
                delay,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, _prompt: &str, _max_tokens: u32) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.response.clone()
        }
    }

    #[tokio::test]
    async fn test_chat_uses_provider() {
        let manager = LlmManager::with_provider(
            Arc::new(ScriptedProvider::ok("Well met, traveler.")),
            Duration::from_secs(5),
            10_000,
        );
        let reply = manager.chat("Testland", SafetyLevel::Pg13, "greet").await;
        assert_eq!(reply, "Well met, traveler.");
    }

    #[tokio::test]
    async fn test_chat_falls_back_without_provider() {
        let manager = LlmManager::offline();
        let reply = manager.chat("Testland", SafetyLevel::G, "greet the player").await;
        assert!(!reply.is_empty());
        // Deterministic: same inputs, same output.
        let again = manager.chat("Testland", SafetyLevel::G, "greet the player").await;
        assert_eq!(reply, again);
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let manager = LlmManager::with_provider(
            Arc::new(ScriptedProvider::slow("late", Duration::from_secs(60))),
            Duration::from_millis(50),
            10_000,
        );
        let reply = manager.chat("Testland", SafetyLevel::Off, "hello").await;
        assert_ne!(reply, "late");
    }

    #[tokio::test]
    async fn test_plan_error_propagates() {
        let manager = LlmManager::offline();
        assert!(matches!(
            manager.plan("plan as JSON array").await,
            Err(LlmError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn test_plan_parses_wrapped_json() {
        let manager = LlmManager::with_provider(
            Arc::new(ScriptedProvider::ok(
                "Here is the plan:\n[{\"tool\": \"do_nothing\", \"args\": {}}]\nDone.",
            )),
            Duration::from_secs(5),
            10_000,
        );
        let plan = manager.plan("plan").await.unwrap();
        assert_eq!(plan[0]["tool"], "do_nothing");
    }

    #[tokio::test]
    async fn test_response_truncation() {
        let long = "x".repeat(500);
        let manager = LlmManager::with_provider(
            Arc::new(ScriptedProvider::ok(&long)),
            Duration::from_secs(5),
            100,
        );
        let reply = manager.chat("Testland", SafetyLevel::Off, "hello").await;
        assert_eq!(reply.len(), 100);
    }

    #[test]
    fn test_extract_json_direct() {
        let value = extract_json("  {\"a\": 1}  ").unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_extract_json_from_truncated_array() {
        // A trailing partial element is dropped, recovering the valid prefix.
        let text = "[{\"tool\": \"emote\", \"args\": {}}, {\"tool\": \"ge";
        assert!(extract_json(text).is_none());
        let text = "prefix [{\"tool\": \"emote\", \"args\": {}}] suffix {";
        let value = extract_json(text).unwrap();
        assert!(value.is_array());
    }
}
