use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::{
    credentials::CredentialPool,
    history::normalize_history,
    retry::{CancelSignal, RetryCoordinator, RetryPolicy},
};
use crate::{
    config::GatewayConfig,
    error::{GatewayError, Result},
    schemas::Validator,
    services::{
        extraction::ResponseParser,
        gemini_client::GeminiClient,
        model::{ModelCall, TextModel},
        prompts::PromptBuilder,
    },
    types::{
        ChatRequest, FormRequest, GenerationMode, GenerationRequest, GenerationResult,
        ItinerarySpec, SurpriseRequest,
    },
};

/// Facade that turns a planning request into a chat reply or an itinerary.
#[derive(Debug, Clone)]
pub struct GenerationGateway {
    model: Arc<dyn TextModel>,
    retry: RetryCoordinator,
    prompts: PromptBuilder,
    parser: ResponseParser,
    chat_max_output_tokens: Option<u32>,
}

impl GenerationGateway {
    pub fn new(model: Arc<dyn TextModel>, pool: Arc<CredentialPool>) -> Self {
        Self {
            model,
            retry: RetryCoordinator::new(pool),
            prompts: PromptBuilder::new(),
            parser: ResponseParser::default(),
            chat_max_output_tokens: Some(2048),
        }
    }

    /// Wire a Gemini-backed gateway from loaded configuration.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let pool = Arc::new(CredentialPool::new(config.api_keys.iter().cloned())?);
        let mut client =
            GeminiClient::new(config.model.clone())?.with_base_url(config.base_url.clone());
        if let Some(timeout) = config.attempt_timeout {
            client = client.with_timeout(timeout)?;
        }

        Ok(Self::new(Arc::new(client), pool)
            .with_policy(RetryPolicy {
                max_attempts: config.max_attempts,
                attempt_timeout: config.attempt_timeout,
                retry_timeouts: config.retry_timeouts,
            })
            .with_chat_max_output_tokens(Some(config.max_output_tokens)))
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = self.retry.with_policy(policy);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        let mut policy = self.retry.policy().clone();
        policy.max_attempts = Some(max_attempts);
        self.retry = self.retry.with_policy(policy);
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        let mut policy = self.retry.policy().clone();
        policy.attempt_timeout = Some(timeout);
        self.retry = self.retry.with_policy(policy);
        self
    }

    pub fn with_retry_timeouts(mut self, retry_timeouts: bool) -> Self {
        let mut policy = self.retry.policy().clone();
        policy.retry_timeouts = retry_timeouts;
        self.retry = self.retry.with_policy(policy);
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.parser = ResponseParser::new(validator);
        self
    }

    pub fn with_chat_max_output_tokens(mut self, max_output_tokens: Option<u32>) -> Self {
        self.chat_max_output_tokens = max_output_tokens;
        self
    }

    pub fn credential_count(&self) -> usize {
        self.retry.pool().len()
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub async fn generate(&self, request: GenerationRequest) -> Result<GenerationResult> {
        self.generate_with_cancel(request, None).await
    }

    pub async fn generate_with_cancel(
        &self,
        request: GenerationRequest,
        cancel: Option<&CancelSignal>,
    ) -> Result<GenerationResult> {
        let mode = request.mode();
        if let Err(err) = request.validate() {
            warn!(target: "wanderai::gateway", mode = %mode, error = %err, "rejected request");
            return Err(err);
        }

        let prompt = self.prompts.build(&request);
        let call = match &request {
            GenerationRequest::Chat(chat) => {
                let history = normalize_history(&chat.history);
                // Without usable history the prompt goes out on its own, uncapped.
                let call = ModelCall::new(prompt);
                if history.is_empty() {
                    call
                } else {
                    call.with_history(history)
                        .with_max_output_tokens(self.chat_max_output_tokens)
                }
            }
            GenerationRequest::Form(_) | GenerationRequest::Surprise(_) => ModelCall::new(prompt),
        };

        info!(
            target: "wanderai::gateway",
            mode = %mode,
            history_turns = call.history.len(),
            prompt_chars = call.prompt.len(),
            model = self.model.name()
        );

        let text = self.call_model(&call, cancel).await?;

        match mode {
            GenerationMode::Chat => Ok(GenerationResult::Chat(text)),
            _ => {
                let itinerary = self.parser.extract(&text)?;
                info!(
                    target: "wanderai::gateway",
                    mode = %mode,
                    days = itinerary.days.len(),
                    activities = itinerary.activity_count()
                );
                Ok(GenerationResult::Itinerary(itinerary))
            }
        }
    }

    pub async fn chat(&self, request: ChatRequest) -> Result<String> {
        let result = self.generate(GenerationRequest::Chat(request)).await?;
        result
            .into_chat()
            .ok_or_else(|| GatewayError::Upstream("chat mode returned an itinerary".to_string()))
    }

    pub async fn form(&self, request: FormRequest) -> Result<ItinerarySpec> {
        let result = self.generate(GenerationRequest::Form(request)).await?;
        result
            .into_itinerary()
            .ok_or_else(|| GatewayError::Upstream("form mode returned prose".to_string()))
    }

    pub async fn surprise(&self, request: SurpriseRequest) -> Result<ItinerarySpec> {
        let result = self.generate(GenerationRequest::Surprise(request)).await?;
        result
            .into_itinerary()
            .ok_or_else(|| GatewayError::Upstream("surprise mode returned prose".to_string()))
    }

    async fn call_model(&self, call: &ModelCall, cancel: Option<&CancelSignal>) -> Result<String> {
        let model = &self.model;
        self.retry
            .run_with_cancel(
                |pooled| async move {
                    model
                        .generate(&pooled.credential, call)
                        .await
                        .map_err(|err| match err {
                            GatewayError::Quota { message, .. } => GatewayError::Quota {
                                credential_index: pooled.index,
                                message,
                            },
                            other => other,
                        })
                },
                cancel,
            )
            .await
    }
}
