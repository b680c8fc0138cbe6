//! wanderai-gateway: itinerary generation over a rotating pool of Gemini credentials
//!
//! Requests come in three modes. Chat returns the model's prose as-is; form and
//! surprise ask for a JSON itinerary, which is recovered from the reply and
//! validated against the [`ItinerarySpec`] schema. Quota rejections rotate to
//! the next credential; every other failure ends the call.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use wanderai_gateway::{FormRequest, GatewayConfig, GenerationGateway};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GatewayConfig::from_env()?;
//!     let gateway = GenerationGateway::from_config(&config)?;
//!
//!     let request = FormRequest::new("Lisbon", 3)
//!         .with_budget(600.0)
//!         .with_origin_city("Boston");
//!     let itinerary = gateway.form(request).await?;
//!     println!("{} days, ${}", itinerary.total_days, itinerary.total_estimated_cost);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod schemas;
pub mod server;
pub mod services;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;

pub use config::GatewayConfig;
pub use core::{
    cancellation, next_state, normalize_history, CancelHandle, CancelSignal, Credential,
    CredentialPool, GenerationGateway, ModelRole, ModelTurn, PooledCredential, RetryCoordinator,
    RetryPolicy, RetryState,
};
pub use error::{GatewayError, Result};
pub use schemas::{ResponseSchema, SchemaHandle, Validator};
pub use services::{
    ExtractionStrategy, GeminiClient, ModelCall, PromptBuilder, ResponseParser, TextModel,
};
pub use types::{
    deserialize_payload, Activity, ActivityCategory, Budget, ChatRequest, ConversationTurn,
    DayPlan, FormRequest, GenerationMode, GenerationRequest, GenerationResult, ItinerarySpec,
    Role, SurpriseRequest,
};
