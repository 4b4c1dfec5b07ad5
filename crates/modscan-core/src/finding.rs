use serde::{Deserialize, Serialize};

use crate::callgraph::CallChain;
use crate::dataflow::DataFlowChain;
use crate::severity::Severity;

/// Remediation text attached only when `ScanConfig::developer_mode` is set (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeveloperGuidance {
    pub summary: String,
    pub recommendation: String,
}

impl DeveloperGuidance {
    pub fn new(summary: impl Into<String>, recommendation: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            recommendation: recommendation.into(),
        }
    }
}

/// A single detection result (spec §3 "Finding"). Created when a rule reports a hit;
/// mutated only to attach refined metadata (risk score, bypass flag, guidance) during
/// `post_analysis_refine` or deep-behavior correlation — never to change its rule id or
/// location after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub rule_id: String,
    pub description: String,
    pub severity: Severity,
    /// `Namespace.Type.Method:IL-offset`
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub developer_guidance: Option<DeveloperGuidance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_chain: Option<CallChain>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_flow_chain: Option<DataFlowChain>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<i32>,
    pub bypass_companion_check: bool,
}

impl Finding {
    pub fn new(
        rule_id: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
        location: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            description: description.into(),
            severity,
            location: location.into(),
            code_snippet: None,
            developer_guidance: None,
            call_chain: None,
            data_flow_chain: None,
            risk_score: None,
            bypass_companion_check: false,
        }
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.code_snippet = Some(snippet.into());
        self
    }

    pub fn with_guidance(mut self, guidance: DeveloperGuidance) -> Self {
        self.developer_guidance = Some(guidance);
        self
    }

    pub fn with_risk_score(mut self, score: i32) -> Self {
        self.risk_score = Some(score);
        self
    }

    pub fn with_bypass_companion_check(mut self, bypass: bool) -> Self {
        self.bypass_companion_check = bypass;
        self
    }

    pub fn with_call_chain(mut self, chain: CallChain) -> Self {
        self.call_chain = Some(chain);
        self
    }

    pub fn with_data_flow_chain(mut self, chain: DataFlowChain) -> Self {
        self.data_flow_chain = Some(chain);
        self
    }

    /// Parses the `IL-offset` suffix out of `location`, used by invariant checks
    /// (spec §8 invariant 1).
    pub fn il_offset(&self) -> Option<u32> {
        self.location.rsplit(':').next()?.parse().ok()
    }
}

/// The pseudo-location and rule id used for the single downgraded `MalformedAssembly`
/// informational finding (spec §7).
pub const MALFORMED_ASSEMBLY_LOCATION: &str = "Assembly scanning";
pub const MALFORMED_ASSEMBLY_RULE_ID: &str = "AssemblyScanner";

pub fn malformed_assembly_finding(detail: impl std::fmt::Display) -> Finding {
    Finding::new(
        MALFORMED_ASSEMBLY_RULE_ID,
        format!("Assembly could not be fully analyzed: {detail}"),
        Severity::Low,
        MALFORMED_ASSEMBLY_LOCATION,
    )
}
