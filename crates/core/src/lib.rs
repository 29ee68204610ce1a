//! parity-core
//!
//! Core library for checking reconstructed C++ functions against a binary.
//!
//! This crate locates the textual definition of a hooked function inside a
//! C-family source tree (without a compiler front end), runs a fixed battery of
//! heuristic signals against decompiler/ASM metadata, and reduces them to a
//! green/yellow/red parity status.
//!
//! All substantive logic lives here so it is fully testable and reusable from
//! multiple frontends (CLI, editor tooling, etc.).

pub mod config;
pub mod db;
pub mod index;
pub mod model;
pub mod parity;
pub mod registry;
pub mod scan;
pub mod services;

pub use index::SourceIndexer;
pub use model::{
    format_address, normalize_address, Finding, GhidraData, HookEntry, ManualCheckEntry,
    ParityStatus, SemanticRule, Severity, SourceMatch,
};
pub use parity::{run_parity, score_single, ParityResult};
pub use registry::{parse_hooks, read_hooks};
