//! Turning a gym conversation into training tokens and a loss mask.

use std::path::Path;

use anyhow::{anyhow, Result};

use crate::model::api::{ChatMessage, Role};

/// Text to token ids, without special tokens.
pub trait TextTokenizer: Send + Sync {
    fn encode(&self, text: &str) -> Result<Vec<u32>>;
}

/// A HuggingFace `tokenizer.json`.
pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
}

impl HfTokenizer {
    pub fn from_file(path: &Path) -> Result<Self> {
        let inner = tokenizers::Tokenizer::from_file(path)
            .map_err(|e| anyhow!("failed to load tokenizer {}: {e}", path.display()))?;
        Ok(Self { inner })
    }
}

impl TextTokenizer for HfTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| anyhow!("tokenization failed: {e}"))?;
        Ok(encoding.get_ids().to_vec())
    }
}

/// Tokens for one trajectory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenizedConversation {
    /// Prompt tokens followed by response tokens.
    pub tokens: Vec<u32>,
    /// One entry per response token: 1 for model output, 0 for tool output.
    pub loss_mask: Vec<u8>,
    pub response_text: String,
    pub response_length: usize,
}

/// Tokenize `messages`, treating the first two (system + user) as the prompt.
///
/// Only assistant tokens are trained on; tool results are masked out. Empty
/// messages contribute nothing.
pub fn build_tokens_and_mask<T: TextTokenizer + ?Sized>(
    messages: &[ChatMessage],
    tokenizer: &T,
) -> Result<TokenizedConversation> {
    if messages.len() < 2 {
        return Ok(TokenizedConversation::default());
    }
    let (prompt, responses) = messages.split_at(2);

    let mut tokens = Vec::new();
    for msg in prompt.iter().filter(|m| !m.content.is_empty()) {
        tokens.extend(tokenizer.encode(&msg.content)?);
    }

    let mut loss_mask = Vec::new();
    let mut response_text = String::new();
    let mut response_length = 0;
    for msg in responses.iter().filter(|m| !m.content.is_empty()) {
        let ids = tokenizer.encode(&msg.content)?;
        let mask = u8::from(msg.role == Role::Assistant);
        loss_mask.extend(std::iter::repeat(mask).take(ids.len()));
        response_length += ids.len();
        tokens.extend(ids);
        response_text.push_str(&msg.content);
    }

    Ok(TokenizedConversation {
        tokens,
        loss_mask,
        response_text,
        response_length,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// One token per whitespace-separated word; ids are word lengths.
    pub(crate) struct WordTokenizer;

    impl TextTokenizer for WordTokenizer {
        fn encode(&self, text: &str) -> Result<Vec<u32>> {
            Ok(text.split_whitespace().map(|w| w.len() as u32).collect())
        }
    }

    #[test]
    fn test_too_few_messages() {
        let out = build_tokens_and_mask(&[ChatMessage::system("sys")], &WordTokenizer).unwrap();
        assert_eq!(out, TokenizedConversation::default());
    }

    #[test]
    fn test_prompt_only() {
        let out = build_tokens_and_mask(
            &[ChatMessage::system("a bb"), ChatMessage::user("ccc")],
            &WordTokenizer,
        )
        .unwrap();
        assert_eq!(out.tokens, [1, 2, 3]);
        assert!(out.loss_mask.is_empty());
        assert_eq!(out.response_length, 0);
    }

    #[test]
    fn test_mask_covers_assistant_only() {
        let messages = [
            ChatMessage::system("s"),
            ChatMessage::user("u"),
            ChatMessage::assistant("run ls"),
            ChatMessage::tool("a b c"),
            ChatMessage::assistant(""),
            ChatMessage::assistant("done"),
        ];
        let out = build_tokens_and_mask(&messages, &WordTokenizer).unwrap();
        assert_eq!(out.tokens, [1, 1, 3, 2, 1, 1, 1, 4]);
        assert_eq!(out.loss_mask, [1, 1, 0, 0, 0, 1]);
        assert_eq!(out.response_length, 6);
        assert_eq!(out.response_text, "run lsa b cdone");
        assert_eq!(out.tokens.len(), 2 + out.loss_mask.len());
    }
}
