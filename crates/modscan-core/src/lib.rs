//! Shared data model, error types, and configuration for ModScan, a static analyzer for
//! malicious behaviors in compiled .NET mod assemblies.
//!
//! This crate carries no analysis logic of its own — it is the vocabulary the rule
//! engine (`modscan-rules`) and the analysis pipeline (`modscan-analyze`) are built on:
//! severities, findings, signal sets, the CIL instruction view, and scan configuration.

pub mod callgraph;
pub mod cil;
pub mod config;
pub mod cross_assembly;
pub mod dataflow;
pub mod error;
pub mod finding;
pub mod il_helpers;
pub mod metadata;
pub mod severity;
pub mod signals;

pub mod testkit;

pub use callgraph::{CallChain, CallChainNode, CallChainNodeKind};
pub use config::{DeepAnalysisConfig, ScanConfig};
pub use cross_assembly::{ArtifactRole, CrossAssemblyEdge, CrossAssemblyGraph, CrossAssemblyNode};
pub use dataflow::{DataFlowChain, DataFlowNode, DataFlowNodeKind, DataFlowPattern};
pub use error::{Result, ScanError};
pub use finding::{malformed_assembly_finding, DeveloperGuidance, Finding};
pub use il_helpers::{
    stack_delta, try_get_argument_index, try_get_local_index, try_get_stored_local_index,
    try_resolve_int32_literal, try_resolve_preceding_string_literal, window, DEFAULT_CONTEXT_WINDOW,
};
pub use metadata::{AssemblyResolverProvider, DefaultEntryPointProvider, EntryPointProvider, NullAssemblyResolverProvider};
pub use severity::Severity;
pub use signals::{SignalBits, SignalSet};
