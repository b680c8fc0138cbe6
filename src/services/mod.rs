pub mod extraction;
pub mod gemini_client;
pub mod model;
pub mod prompts;

pub use extraction::{ExtractionStrategy, ResponseParser};
pub use gemini_client::GeminiClient;
pub use model::{ModelCall, TextModel};
pub use prompts::PromptBuilder;
