//! Concrete chat backends.

pub mod ollama;
pub mod openai;
pub mod openai_compat;
pub mod openrouter;
