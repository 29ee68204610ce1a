//! Parity verification: signal detectors, overrides, scoring and the batch engine.

mod engine;
pub mod rules;
pub mod scoring;
pub mod signals;

pub use engine::{run_parity, score_single, Overrides, ParityResult, ParityRunner};
pub use scoring::{score, StatusCounts};
