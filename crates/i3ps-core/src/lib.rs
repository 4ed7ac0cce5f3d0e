//! # i3ps-core
//!
//! Core crate for the i3ps status engine, providing:
//!
//! - **Configuration** (`config`): JSON config deserialization
//! - **Error types** (`error`): `StatusError` and `ConfigError` via thiserror
//! - **Logging** (`logging`): tracing-based structured logging on stderr
//! - **Shutdown** (`shutdown`): interrupt flag consumed by the line channels

pub mod config;
pub mod error;
pub mod logging;
pub mod shutdown;

pub use error::{ConfigError, Result, StatusError};
