//! Call-graph node/edge and call-chain shapes (spec §3, §4.5).

use serde::{Deserialize, Serialize};

use crate::severity::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CallChainNodeKind {
    EntryPoint,
    IntermediateCall,
    SuspiciousDeclaration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallChainNode {
    pub kind: CallChainNodeKind,
    /// `Namespace.Type.Method`
    pub method_key: String,
    pub code_snippet: Option<String>,
}

impl CallChainNode {
    pub fn new(kind: CallChainNodeKind, method_key: impl Into<String>) -> Self {
        Self {
            kind,
            method_key: method_key.into(),
            code_snippet: None,
        }
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.code_snippet = Some(snippet);
        self
    }
}

/// An ordered sequence of nodes from an entry point to a suspicious declaration (spec
/// §4.5, §8 invariant 4: exactly one `EntryPoint`, exactly one `SuspiciousDeclaration`,
/// all intermediate nodes `IntermediateCall`, length >= 2).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallChain {
    pub rule_id: String,
    pub severity: Severity,
    pub nodes: Vec<CallChainNode>,
    pub combined_snippet: Option<String>,
}

impl CallChain {
    pub fn new(rule_id: impl Into<String>, severity: Severity, nodes: Vec<CallChainNode>) -> Self {
        Self {
            rule_id: rule_id.into(),
            severity,
            nodes,
            combined_snippet: None,
        }
    }

    /// Validates invariant 4 from spec §8: exactly one entry point, exactly one
    /// suspicious declaration, intermediate-only in between, length >= 2.
    pub fn is_well_formed(&self) -> bool {
        if self.nodes.len() < 2 {
            return false;
        }
        let first_is_entry = matches!(self.nodes.first().map(|n| n.kind), Some(CallChainNodeKind::EntryPoint));
        let last_is_sink = matches!(
            self.nodes.last().map(|n| n.kind),
            Some(CallChainNodeKind::SuspiciousDeclaration)
        );
        let entry_count = self
            .nodes
            .iter()
            .filter(|n| n.kind == CallChainNodeKind::EntryPoint)
            .count();
        let sink_count = self
            .nodes
            .iter()
            .filter(|n| n.kind == CallChainNodeKind::SuspiciousDeclaration)
            .count();
        let middle_all_intermediate = self.nodes[1..self.nodes.len() - 1]
            .iter()
            .all(|n| n.kind == CallChainNodeKind::IntermediateCall);

        first_is_entry && last_is_sink && entry_count == 1 && sink_count == 1 && middle_all_intermediate
    }
}
