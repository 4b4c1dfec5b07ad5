//! Local-variable suspicious-usage rule (spec §2 "Local-variable & exception-handler
//! analyzers"). A method declaring several raw byte/char buffer locals is a common shape
//! for manual payload reconstruction (as opposed to a single `byte[]` read once from a
//! resource or network response).

use modscan_core::cil::MethodDef;
use modscan_core::{Finding, Severity, SignalSet};

use crate::rule::{InstructionSequenceRule, RuleMeta};

pub const RULE_ID: &str = "SuspiciousLocalVariableUsageRule";

const BUFFER_TYPE_NAMES: &[&str] = &["System.Byte[]", "System.Char[]", "System.String[]"];
const BUFFER_LOCAL_THRESHOLD: usize = 3;

pub struct LocalVariableRule;

impl RuleMeta for LocalVariableRule {
    fn rule_id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "Several raw byte/char buffer locals, suggestive of manual payload reconstruction"
    }

    fn default_severity(&self) -> Severity {
        Severity::Low
    }
}

impl InstructionSequenceRule for LocalVariableRule {
    fn analyze_instructions(&self, method: &MethodDef, _method_signals: &SignalSet) -> Vec<Finding> {
        let buffer_locals = method.locals.iter().filter(|l| BUFFER_TYPE_NAMES.contains(&l.type_name.as_str())).count();
        if buffer_locals < BUFFER_LOCAL_THRESHOLD {
            return Vec::new();
        }
        let location = format!("{}:{}", method.method_key(), method.max_offset());
        vec![Finding::new(
            RULE_ID,
            format!("{buffer_locals} raw byte/char/string buffer locals declared in one method"),
            Severity::Low,
            location,
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modscan_core::cil::LocalVariable;

    fn method_with_locals(locals: Vec<LocalVariable>) -> MethodDef {
        MethodDef {
            name: "M".into(),
            declaring_type: "T".into(),
            namespace: "N".into(),
            is_static: true,
            instructions: Vec::new(),
            locals,
            exception_handlers: Vec::new(),
        }
    }

    #[test]
    fn flags_methods_with_many_buffer_locals() {
        let locals = (0..4)
            .map(|i| LocalVariable { index: i, type_name: "System.Byte[]".into(), name: None })
            .collect();
        let method = method_with_locals(locals);
        assert_eq!(LocalVariableRule.analyze_instructions(&method, &SignalSet::new()).len(), 1);
    }

    #[test]
    fn ignores_methods_with_few_buffer_locals() {
        let locals = vec![LocalVariable { index: 0, type_name: "System.Int32".into(), name: None }];
        let method = method_with_locals(locals);
        assert!(LocalVariableRule.analyze_instructions(&method, &SignalSet::new()).is_empty());
    }
}
