//! Rule interface and the canonical rule catalogue for ModScan (spec §3 "Rule", §4.1,
//! §4.3). This crate carries no instruction-walking or signal-tracking logic of its own
//! — that lives in `modscan-analyze`, which dispatches against the [`registry::RuleSet`]
//! this crate builds.

pub mod classification;
pub mod registry;
pub mod rule;
pub mod rules;

pub use registry::{default_rules, RuleSet};
pub use rule::{AssemblyMetadataRule, CallSiteContext, CallSiteRule, InstructionSequenceRule, PostAnalysisRefiner, RuleMeta, StringLiteralRule};
