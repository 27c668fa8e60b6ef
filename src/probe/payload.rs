//! Minimal Messages API request body for connectivity tests

use crate::probe::ProbeError;
use serde::{Deserialize, Serialize};

/// Prompt sent in every test request
pub const TEST_PROMPT: &str = "hi";

/// Token cap for the test completion; the stream is abandoned long before
pub const TEST_MAX_TOKENS: u32 = 32;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PayloadOptions {
    pub stream: bool,
}

/// Request body sent upstream
///
/// Serializes as
/// `{"model", "max_tokens", "messages": [{"role": "user", "content": [...]}], "stream"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPayload {
    model: String,
    max_tokens: u32,
    messages: Vec<TestMessage>,
    stream: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestMessage {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: String,
}

impl TestPayload {
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn stream(&self) -> bool {
        self.stream
    }

    pub fn messages(&self) -> &[TestMessage] {
        &self.messages
    }
}

impl TestMessage {
    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn text(&self) -> String {
        self.content.iter().map(|b| b.text.as_str()).collect()
    }
}

/// Builds the request body for one test
///
/// A trait so the tester can be exercised with a recording double.
pub trait PayloadBuilder: Send + Sync {
    fn build(&self, model: &str, options: PayloadOptions) -> Result<TestPayload, ProbeError>;
}

/// Default builder producing [`build_test_payload`] bodies
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaudeTestPayload;

impl PayloadBuilder for ClaudeTestPayload {
    fn build(&self, model: &str, options: PayloadOptions) -> Result<TestPayload, ProbeError> {
        build_test_payload(model, options)
    }
}

/// Build the smallest valid completion request for `model`
///
/// Deterministic: identical inputs always produce equal payloads.
///
/// # Errors
///
/// Returns `InvalidModel` if `model` is empty or whitespace-only. Any other
/// validation of the model id is left to the upstream.
pub fn build_test_payload(model: &str, options: PayloadOptions) -> Result<TestPayload, ProbeError> {
    if model.trim().is_empty() {
        return Err(ProbeError::InvalidModel);
    }

    Ok(TestPayload {
        model: model.to_string(),
        max_tokens: TEST_MAX_TOKENS,
        messages: vec![TestMessage {
            role: "user".to_string(),
            content: vec![ContentBlock {
                kind: "text".to_string(),
                text: TEST_PROMPT.to_string(),
            }],
        }],
        stream: options.stream,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_is_deterministic() {
        let options = PayloadOptions { stream: true };
        let first = build_test_payload("claude-sonnet-4-6", options).unwrap();
        let second = build_test_payload("claude-sonnet-4-6", options).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.model(), "claude-sonnet-4-6");
        assert!(first.stream());
    }

    #[test]
    fn test_build_wire_shape() {
        let payload = build_test_payload("claude-sonnet-4-6", PayloadOptions { stream: true }).unwrap();
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(
            value,
            json!({
                "model": "claude-sonnet-4-6",
                "max_tokens": TEST_MAX_TOKENS,
                "messages": [
                    {"role": "user", "content": [{"type": "text", "text": TEST_PROMPT}]}
                ],
                "stream": true
            })
        );
    }

    #[test]
    fn test_build_honors_stream_flag() {
        let payload = build_test_payload("claude-haiku-4-5-20251001", PayloadOptions::default()).unwrap();
        assert!(!payload.stream());
        assert_eq!(payload.messages().len(), 1);
        assert_eq!(payload.messages()[0].role(), "user");
        assert_eq!(payload.messages()[0].text(), TEST_PROMPT);
    }

    #[test]
    fn test_build_rejects_empty_model() {
        for model in ["", "   ", "\t\n"] {
            let err = build_test_payload(model, PayloadOptions { stream: true }).unwrap_err();
            assert!(
                matches!(err, ProbeError::InvalidModel),
                "model {:?} should be rejected",
                model
            );
        }
    }

    #[test]
    fn test_builder_trait_delegates() {
        let via_trait = ClaudeTestPayload
            .build("claude-opus-4-6", PayloadOptions { stream: true })
            .unwrap();
        let direct = build_test_payload("claude-opus-4-6", PayloadOptions { stream: true }).unwrap();
        assert_eq!(via_trait, direct);
    }
}
