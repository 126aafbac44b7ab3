//! Shared foundation for Tome: configuration, the error taxonomy, and the
//! message/passage/fragment types every other crate speaks in.

pub mod config;
pub mod error;
pub mod types;

pub use config::TomeConfig;
pub use error::{Result, TomeError};
pub use types::{Message, Passage, Role, StreamFragment};
