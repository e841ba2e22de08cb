//! LLM integration - OpenAI-compatible API (Groq by default)
//!
//! This module provides:
//! - HTTP client for chat completions and batch embeddings
//! - Request/response types matching the OpenAI-compatible API
//! - Model fallback with automatic retry
//! - The [`TextGenerator`] boundary used by the dialogue and fallback classifier

mod client;
mod generator;
mod types;

pub use client::LlmClient;
pub use generator::TextGenerator;
pub use types::{
    ChatRequest, ChatResponse, Choice, EmbeddingRequest, EmbeddingResponse, FinishReason,
    LlmResponse, Message, MessageRole, Usage,
};
