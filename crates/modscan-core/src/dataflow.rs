//! Data-flow node/chain shapes (spec §3, §4.6).

use serde::{Deserialize, Serialize};

use crate::severity::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataFlowNodeKind {
    Source,
    Transform,
    Sink,
    Intermediate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFlowNode {
    pub node_type: DataFlowNodeKind,
    pub location: String,
    pub operation: String,
    pub data_description: String,
    pub instruction_offset: u32,
    pub method_key: String,
    pub is_method_boundary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_method_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<String>,
}

impl DataFlowNode {
    pub fn new(
        node_type: DataFlowNodeKind,
        method_key: impl Into<String>,
        instruction_offset: u32,
        operation: impl Into<String>,
        data_description: impl Into<String>,
    ) -> Self {
        let method_key = method_key.into();
        Self {
            node_type,
            location: format!("{method_key}:{instruction_offset}"),
            operation: operation.into(),
            data_description: data_description.into(),
            instruction_offset,
            method_key,
            is_method_boundary: false,
            target_method_key: None,
            code_snippet: None,
        }
    }

    pub fn as_method_boundary(mut self, target_method_key: impl Into<String>) -> Self {
        self.is_method_boundary = true;
        self.target_method_key = Some(target_method_key.into());
        self
    }
}

/// Recognized attack/benign shapes for a data-flow chain (spec §4.6 "Pattern
/// recognition", evaluated in this declaration order — first match wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataFlowPattern {
    DownloadAndExecute,
    DataExfiltration,
    DynamicCodeLoading,
    CredentialTheft,
    ObfuscatedPersistence,
    RemoteConfigLoad,
    Unknown,
    Legitimate,
}

impl DataFlowPattern {
    /// Severity assignment from spec §4.6 / §8 invariant 5.
    pub fn severity(self) -> Severity {
        match self {
            DataFlowPattern::DownloadAndExecute
            | DataFlowPattern::DataExfiltration
            | DataFlowPattern::DynamicCodeLoading
            | DataFlowPattern::CredentialTheft => Severity::Critical,
            DataFlowPattern::ObfuscatedPersistence => Severity::High,
            DataFlowPattern::RemoteConfigLoad => Severity::Medium,
            DataFlowPattern::Unknown | DataFlowPattern::Legitimate => Severity::Low,
        }
    }

    pub fn is_reportable(self) -> bool {
        !matches!(self, DataFlowPattern::Legitimate | DataFlowPattern::Unknown)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFlowChain {
    pub pattern: DataFlowPattern,
    pub confidence: f64,
    pub severity: Severity,
    pub method_location: String,
    pub is_cross_method: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub involved_methods: Option<Vec<String>>,
    pub nodes: Vec<DataFlowNode>,
}

impl DataFlowChain {
    pub fn new(pattern: DataFlowPattern, method_location: impl Into<String>, nodes: Vec<DataFlowNode>) -> Self {
        Self {
            pattern,
            confidence: 0.7,
            severity: pattern.severity(),
            method_location: method_location.into(),
            is_cross_method: false,
            involved_methods: None,
            nodes,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn as_cross_method(mut self, involved_methods: Vec<String>) -> Self {
        self.is_cross_method = true;
        self.involved_methods = Some(involved_methods);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_severities_match_spec_matrix() {
        assert_eq!(DataFlowPattern::DownloadAndExecute.severity(), Severity::Critical);
        assert_eq!(DataFlowPattern::DataExfiltration.severity(), Severity::Critical);
        assert_eq!(DataFlowPattern::DynamicCodeLoading.severity(), Severity::Critical);
        assert_eq!(DataFlowPattern::CredentialTheft.severity(), Severity::Critical);
        assert_eq!(DataFlowPattern::ObfuscatedPersistence.severity(), Severity::High);
        assert_eq!(DataFlowPattern::RemoteConfigLoad.severity(), Severity::Medium);
    }

    #[test]
    fn unknown_and_legitimate_are_not_reportable() {
        assert!(!DataFlowPattern::Unknown.is_reportable());
        assert!(!DataFlowPattern::Legitimate.is_reportable());
        assert!(DataFlowPattern::RemoteConfigLoad.is_reportable());
    }
}
