// src/provider/mod.rs — Model client layer

pub mod anthropic;
pub mod retry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::infra::errors::ScadCriticError;

/// Core trait for the vision/text model service the evaluation loop
/// consumes. Implementations return raw assistant text; decoding into
/// structured evaluations happens in the agent layer.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Client identifier (for logs).
    fn id(&self) -> &str;

    /// Generate initial OpenSCAD source from a free-text description.
    async fn generate(&self, description: &str, model: &str) -> Result<String, ScadCriticError>;

    /// Run one multi-turn exchange and return the raw assistant text.
    async fn converse(
        &self,
        system: &str,
        turns: &[Turn],
        model: &str,
    ) -> Result<String, ScadCriticError>;
}

/// One conversation turn. Each turn owns its content; a session only
/// ever appends turns, never mutates them in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub blocks: Vec<Block>,
}

impl Turn {
    pub fn user(blocks: Vec<Block>) -> Self {
        Self {
            role: Role::User,
            blocks,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            blocks: vec![Block::text(text)],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A content block within a turn: text, or an inline base64 image.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Text { text: String },
    Image { media_type: String, data: String },
}

impl Block {
    pub fn text(text: impl Into<String>) -> Self {
        Block::Text { text: text.into() }
    }

    /// Encode PNG bytes as a base64 image block.
    pub fn png(bytes: &[u8]) -> Self {
        use base64::Engine as _;
        Block::Image {
            media_type: "image/png".into(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ─── Turn tests ─────────────────────────────────────────────

    #[test]
    fn test_turn_user() {
        let t = Turn::user(vec![Block::text("hello")]);
        assert_eq!(t.role, Role::User);
        assert_eq!(t.blocks.len(), 1);
    }

    #[test]
    fn test_turn_assistant() {
        let t = Turn::assistant("sure");
        assert_eq!(t.role, Role::Assistant);
        match &t.blocks[0] {
            Block::Text { text } => assert_eq!(text, "sure"),
            other => panic!("expected text block, got {other:?}"),
        }
    }

    // ─── Block tests ────────────────────────────────────────────

    #[test]
    fn test_block_png_encodes_base64() {
        let b = Block::png(&[0x89, b'P', b'N', b'G']);
        match b {
            Block::Image { media_type, data } => {
                assert_eq!(media_type, "image/png");
                assert_eq!(data, "iVBORw==");
            }
            other => panic!("expected image block, got {other:?}"),
        }
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
    }
}
