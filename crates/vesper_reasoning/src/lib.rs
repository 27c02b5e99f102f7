pub mod api_types;
pub mod classifier;
pub mod llm;
pub mod prompts;
pub mod providers;
pub mod responder;
pub mod retry;

pub use classifier::{KeywordToneClassifier, LlmToneClassifier};
pub use llm::{generate_text, CompletionParams, LlmClient};
pub use responder::{Reply, Responder};
