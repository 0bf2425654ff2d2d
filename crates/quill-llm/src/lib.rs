//! Chat-completions backend for Quill.
//!
//! [`ChatGenerator`] speaks the OpenAI-compatible `/chat/completions`
//! protocol, so it works against hosted providers as well as local servers
//! such as Ollama or llama.cpp.

mod chat;
pub mod error;

pub use chat::{ChatConfig, ChatGenerator};
pub use error::{Error, Result};
