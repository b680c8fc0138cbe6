use async_trait::async_trait;

use crate::core::{credentials::Credential, history::ModelTurn};
use crate::error::Result;

/// Everything sent to the model for one attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelCall {
    /// Fully rendered prompt, sent as the final user turn.
    pub prompt: String,
    /// Prior turns, already normalized to start with a user turn.
    pub history: Vec<ModelTurn>,
    pub max_output_tokens: Option<u32>,
}

impl ModelCall {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            history: Vec::new(),
            max_output_tokens: None,
        }
    }

    pub fn with_history(mut self, history: Vec<ModelTurn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: Option<u32>) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }
}

/// The remote generative text model.
///
/// Implementations must report quota and rate-limit rejections as
/// [`GatewayError::Quota`](crate::GatewayError::Quota) so the retry loop can
/// rotate credentials; every other failure is terminal for the call.
#[async_trait]
pub trait TextModel: Send + Sync + std::fmt::Debug {
    /// Model identifier, used in logs
    fn name(&self) -> &str;

    /// Run one generation with the given credential and return the model's text.
    async fn generate(&self, credential: &Credential, call: &ModelCall) -> Result<String>;
}
