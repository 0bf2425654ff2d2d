//! Core types, traits and flows for the Quill adventure engine.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::AdventureStore`]; narrative backends
//! implement [`generator::NarrativeGenerator`]. The two flows that drive an
//! adventure, [`creation::Creation`] and [`progression::Progression`], are
//! generic over both.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod adventure;
pub mod creation;
pub mod error;
pub mod generator;
pub mod progression;
pub mod prompt;
pub mod store;
pub mod stub;
pub mod template;

pub use error::{Error, Result};

#[cfg(test)]
mod memory;
