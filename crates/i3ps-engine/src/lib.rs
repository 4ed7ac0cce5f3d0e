//! # i3ps-engine
//!
//! Streaming engine for the i3bar JSON protocol.
//!
//! ## Architecture
//!
//! A protocol host (i3status, or the built-in simulator) writes one JSON
//! array per tick. The engine echoes the handshake, then for every tick
//! inserts each registered module's latest output at the module's position
//! and writes the array back.
//!
//! - [`io`]: `LineChannel` trait and the stdio implementation
//! - [`standalone`]: host simulator for running without i3status
//! - [`json_io`]: handshake and per-tick parse/mutate/serialize
//! - [`module`]: module contract, output slot, background variants
//! - [`settings`]: settings schema and validation
//! - [`registry`]: module sources, catalog, registration requests
//! - [`engine`]: `StatusEngine`: registration and merge
//! - [`modules`]: built-in modules

pub mod engine;
pub mod io;
pub mod json_io;
pub mod module;
pub mod modules;
pub mod registry;
pub mod settings;
pub mod standalone;

pub use engine::StatusEngine;
pub use io::{LineChannel, LineIo};
pub use json_io::{JsonIo, Tick};
pub use module::{AsyncModule, Background, IntervalModule, Module, ModuleState, OutputSlot, Periodic};
pub use standalone::StandaloneIo;
