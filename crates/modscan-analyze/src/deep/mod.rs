//! Deep-behavior orchestrator (spec §4.7). Optional second pass over methods that
//! already produced a seed signal, running a fixed set of cross-rule correlators that
//! look for compound patterns no single rule sees on its own.

mod correlators;
mod orchestrator;

pub use orchestrator::run_deep_analysis;
