//! Leadflow LLM - text completion abstraction
//!
//! The handoff core treats a language model as an opaque text-completion
//! function. This crate provides:
//! - `LlmProvider`: the provider trait
//! - `OpenAiCompatProvider`: chat-completions over HTTP (OpenAI, Ollama, Groq, ...)
//! - `MockProvider`: queued canned responses for tests and simulations

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod completion;
pub mod error;
pub mod mock;
pub mod openai_compat;
pub mod provider;

pub use completion::{CompletionRequest, CompletionResponse, Message, MessageRole, TokenUsage};
pub use error::{Error, Result};
pub use mock::{MockProvider, MockReply};
pub use openai_compat::{OpenAiCompatConfig, OpenAiCompatProvider};
pub use provider::{LlmProvider, SharedProvider};
