//! Generation service client for Tome.
//!
//! Defines the [`Generator`] trait consumed by the conversation core, an
//! OpenAI-compatible HTTP implementation with SSE streaming, and a scripted
//! mock for deterministic tests.

pub mod error;
pub mod generator;
pub mod openai;

pub use error::LlmError;
pub use generator::{FragmentStream, Generator, MockGenerator};
pub use openai::OpenAiGenerator;
