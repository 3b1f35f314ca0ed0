#[cfg(feature = "backend-ollama")]
pub mod ollama;
