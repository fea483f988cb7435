//! Core preprocessing engine for MASP, the assembly-source preprocessor.
//!
//! See `src/engine.rs` for the entry points ([`engine::Engine::process_file`]
//! / [`engine::Engine::process_text`]); the other modules are the
//! cooperating scanners described in the design notes: a growable byte
//! buffer, an input stack, a symbol table, a macro store, a conditional
//! stack, the line scanner, directive handlers, and the emitter.

#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod conditional;
pub mod directives;
pub mod emitter;
pub mod engine;
pub mod error;
pub mod input_stack;
pub mod macros;
pub mod sb;
pub mod scanner;
pub mod symtab;

pub use engine::{Engine, EngineConfig};
pub use error::MaspError;
