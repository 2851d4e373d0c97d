pub mod backend;
pub mod cascade;
pub mod fields;
pub mod generative;
pub mod pipeline;

pub use backend::{InferenceBackend, InferenceError, MockBackend, UnavailableBackend};
pub use fields::RecoveredFields;
pub use pipeline::{ExtractError, ExtractionOutcome, ExtractionPipeline, NoBackend};

#[cfg(feature = "ollama")]
pub use backend::ollama_backend::OllamaBackend;
