// src/provider/anthropic.rs — Anthropic Messages API client

use async_trait::async_trait;
use std::path::Path;

use super::{Block, ModelClient, Role, Turn};
use crate::agent::prompts;
use crate::infra::errors::ScadCriticError;

pub struct AnthropicClient {
    api_key: String,
    client: reqwest::Client,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn new(api_key: String, max_tokens: u32) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            max_tokens,
        }
    }

    /// Build a client from the environment, falling back to a
    /// `ANTHROPIC_API_KEY=...` line in ./.env.
    pub fn from_env(max_tokens: u32) -> Result<Self, ScadCriticError> {
        let key = resolve_api_key().ok_or(ScadCriticError::NoApiKey)?;
        Ok(Self::new(key, max_tokens))
    }

    fn api_url(&self) -> &str {
        "https://api.anthropic.com/v1/messages"
    }

    fn build_body(&self, system: &str, turns: &[Turn], model: &str) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = turns
            .iter()
            .map(|t| {
                let content: Vec<serde_json::Value> = t
                    .blocks
                    .iter()
                    .map(|b| match b {
                        Block::Text { text } => {
                            serde_json::json!({ "type": "text", "text": text })
                        }
                        Block::Image { media_type, data } => serde_json::json!({
                            "type": "image",
                            "source": {
                                "type": "base64",
                                "media_type": media_type,
                                "data": data,
                            },
                        }),
                    })
                    .collect();

                serde_json::json!({
                    "role": match t.role {
                        Role::User => "user",
                        Role::Assistant => "assistant",
                    },
                    "content": content,
                })
            })
            .collect();

        serde_json::json!({
            "model": model,
            "max_tokens": self.max_tokens,
            "system": system,
            "messages": messages,
        })
    }

    async fn send(&self, body: serde_json::Value) -> Result<String, ScadCriticError> {
        let response = self
            .client
            .post(self.api_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ScadCriticError::Model {
                message: e.to_string(),
                retriable: e.is_timeout() || e.is_connect(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5);
            return Err(ScadCriticError::RateLimited {
                retry_after_ms: retry_after * 1000,
            });
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ScadCriticError::Model {
                message: format!("HTTP {}: {}", status, error_body),
                retriable: status.is_server_error(),
            });
        }

        let resp: serde_json::Value =
            response.json().await.map_err(|e| ScadCriticError::Model {
                message: format!("failed to decode response: {}", e),
                retriable: false,
            })?;

        let text = resp["content"]
            .as_array()
            .unwrap_or(&vec![])
            .iter()
            .filter(|c| c["type"] == "text")
            .map(|c| c["text"].as_str().unwrap_or(""))
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(ScadCriticError::Model {
                message: "response contained no text content".into(),
                retriable: false,
            });
        }

        Ok(text)
    }
}

#[async_trait]
impl ModelClient for AnthropicClient {
    fn id(&self) -> &str {
        "anthropic"
    }

    async fn generate(&self, description: &str, model: &str) -> Result<String, ScadCriticError> {
        let turns = vec![Turn::user(vec![Block::text(format!(
            "Create an OpenSCAD design for: {description}"
        ))])];
        self.send(self.build_body(prompts::GENERATE_SYSTEM, &turns, model))
            .await
    }

    async fn converse(
        &self,
        system: &str,
        turns: &[Turn],
        model: &str,
    ) -> Result<String, ScadCriticError> {
        self.send(self.build_body(system, turns, model)).await
    }
}

fn resolve_api_key() -> Option<String> {
    if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
        if !key.trim().is_empty() {
            return Some(key);
        }
    }
    api_key_from_env_file(Path::new(".env"))
}

/// Parse `ANTHROPIC_API_KEY=value` out of a dotenv-style file.
fn api_key_from_env_file(path: &Path) -> Option<String> {
    let raw = std::fs::read_to_string(path).ok()?;
    for line in raw.lines() {
        let line = line.trim();
        if line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        if key.trim() == "ANTHROPIC_API_KEY" && !value.trim().is_empty() {
            return Some(value.trim().to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_build_body_roles_and_system() {
        let client = AnthropicClient::new("key".into(), 8192);
        let turns = vec![
            Turn::user(vec![Block::text("evaluate this")]),
            Turn::assistant("looks fine"),
        ];
        let body = client.build_body("you are an evaluator", &turns, "test-model");

        assert_eq!(body["model"], "test-model");
        assert_eq!(body["max_tokens"], 8192);
        assert_eq!(body["system"], "you are an evaluator");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][1]["role"], "assistant");
        assert_eq!(body["messages"][0]["content"][0]["text"], "evaluate this");
    }

    #[test]
    fn test_build_body_image_block() {
        let client = AnthropicClient::new("key".into(), 1024);
        let turns = vec![Turn::user(vec![
            Block::text("here is the render"),
            Block::png(&[1, 2, 3]),
        ])];
        let body = client.build_body("sys", &turns, "m");

        let image = &body["messages"][0]["content"][1];
        assert_eq!(image["type"], "image");
        assert_eq!(image["source"]["type"], "base64");
        assert_eq!(image["source"]["media_type"], "image/png");
        assert!(image["source"]["data"].as_str().is_some());
    }

    #[test]
    fn test_api_key_from_env_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "OTHER=abc").unwrap();
        writeln!(file, "ANTHROPIC_API_KEY = sk-test-123 ").unwrap();
        assert_eq!(
            api_key_from_env_file(file.path()),
            Some("sk-test-123".into())
        );
    }

    #[test]
    fn test_api_key_from_env_file_missing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "OTHER=abc").unwrap();
        assert_eq!(api_key_from_env_file(file.path()), None);
        assert_eq!(api_key_from_env_file(Path::new("/nonexistent/.env")), None);
    }
}
