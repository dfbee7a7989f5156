//! OpenAI-compatible backend
//!
//! One implementation covers OpenAI, OpenRouter and any gateway exposing
//! `POST {base_url}/chat/completions`.

mod client;
pub mod converter;
pub mod types;

pub use client::OpenAiCompatProvider;
pub use types::{ChatCompletionRequest, ChatCompletionResponse};
