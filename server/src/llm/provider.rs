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

//! AI provider trait and the HTTP chat-completions implementation.

use crate::config::AiConfig;
use crate::llm::types::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The single external AI interface the core depends on.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Generate free text for a prompt. May fail; the core wraps every call
    /// with a timeout and a fallback.
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError>;
}

/// Provider speaking the OpenAI-compatible chat-completions shape.
pub struct HttpProvider {
    endpoint: String,
    api_key: Option<String>,
    model: String,
    client: reqwest::Client,
}

impl HttpProvider {
    pub fn new(config: &AiConfig) -> Result<Self, LlmError> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| LlmError::Config("AI endpoint not configured".to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            endpoint,
            api_key: config.api_key.as_ref().map(|k| String::clone(k)),
            model: config.model.clone().unwrap_or_else(|| "default".to_string()),
            client,
        })
    }
}

#[async_trait]
impl LlmProvider for HttpProvider {
    fn name(&self) -> &str {
        "http"
    }

    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        #[derive(Serialize)]
        struct ChatMessage<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<ChatMessage<'a>>,
            max_tokens: u32,
        }

        #[derive(Deserialize)]
        struct ChoiceMessage {
            content: String,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMessage,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<Choice>,
        }

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
        };

        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| LlmError::Network(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::Api(format!(
                "API returned {}: {}",
                status, error_text
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Api(format!("Failed to parse response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::Api("Response contained no choices".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_provider_requires_endpoint() {
        let config = AiConfig::default();
        assert!(matches!(
            HttpProvider::new(&config),
            Err(LlmError::Config(_))
        ));
    }

    #[test]
    fn test_http_provider_builds_with_endpoint() {
        let config = AiConfig {
            endpoint: Some("http://localhost:11434/v1/chat/completions".to_string()),
            ..AiConfig::default()
        };
        let provider = HttpProvider::new(&config).unwrap();
        assert_eq!(provider.name(), "http");
        assert_eq!(provider.model, "default");
    }
}
