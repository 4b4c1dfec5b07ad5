//! Embedded-resource payload refiner (spec §4.3 `post_analysis_refine` example: "recursive
//! scan of embedded resources"). Runs after the whole module has been scanned, inspecting
//! `Module.manifest_resources` for payloads that look like a dropped executable or a
//! dangerous command embedded as raw bytes, and correlates the finding's severity against
//! whatever the rest of the pass already flagged in the same module.

use modscan_core::cil::Module;
use modscan_core::finding::MALFORMED_ASSEMBLY_LOCATION;
use modscan_core::{Finding, Severity};

use crate::classification::contains_dangerous_substring;
use crate::rule::{PostAnalysisRefiner, RuleMeta};

pub const RULE_ID: &str = "EmbeddedResourcePayloadRule";

/// First two bytes of every Windows PE image ("MZ").
const PE_MAGIC: [u8; 2] = [0x4D, 0x5A];

pub struct EmbeddedResourcePayloadRule;

impl RuleMeta for EmbeddedResourcePayloadRule {
    fn rule_id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "Embedded manifest resource carries a PE payload or an encoded dangerous command"
    }

    fn default_severity(&self) -> Severity {
        Severity::Medium
    }
}

impl PostAnalysisRefiner for EmbeddedResourcePayloadRule {
    fn post_analysis_refine(&self, module: &Module, existing_findings: &[Finding]) -> Vec<Finding> {
        let module_already_loads_assemblies =
            existing_findings.iter().any(|f| f.rule_id == "AssemblyDynamicLoadRule" || f.rule_id == "ReflectionInvokeRule");

        let mut findings = Vec::new();
        for resource in &module.manifest_resources {
            let Some(kind) = classify_payload(&resource.data) else {
                continue;
            };

            let severity = match (kind, module_already_loads_assemblies) {
                (PayloadKind::ExecutableImage, true) => Severity::Critical,
                (PayloadKind::ExecutableImage, false) => Severity::High,
                (PayloadKind::DangerousCommand, true) => Severity::High,
                (PayloadKind::DangerousCommand, false) => Severity::Medium,
            };

            let description = match kind {
                PayloadKind::ExecutableImage => {
                    format!("Manifest resource \"{}\" embeds a PE image ({} bytes)", resource.name, resource.data.len())
                }
                PayloadKind::DangerousCommand => {
                    format!("Manifest resource \"{}\" embeds a dangerous command fragment as raw bytes", resource.name)
                }
            };

            let location = format!("{}:{}", module.assembly_name, resource.name);
            findings.push(Finding::new(RULE_ID, description, severity, location));
        }
        findings
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum PayloadKind {
    ExecutableImage,
    DangerousCommand,
}

/// Recursively inspects a resource's raw bytes the same two ways the live scan inspects a
/// string literal: a PE-magic sniff, then a dangerous-substring scan over any printable
/// ASCII run found inside the blob (covers a resource that embeds a plaintext or
/// lightly-obfuscated script rather than a full PE image).
fn classify_payload(data: &[u8]) -> Option<PayloadKind> {
    if data.len() >= 2 && data[0..2] == PE_MAGIC {
        return Some(PayloadKind::ExecutableImage);
    }

    let printable: String = data.iter().filter(|b| b.is_ascii_graphic() || **b == b' ').map(|b| *b as char).collect();
    if printable.len() >= 16 && contains_dangerous_substring(&printable) {
        return Some(PayloadKind::DangerousCommand);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use modscan_core::cil::ManifestResource;

    fn module_with_resource(name: &str, data: Vec<u8>) -> Module {
        let mut module = Module::new("Sample.Mod");
        module.manifest_resources.push(ManifestResource { name: name.to_string(), data });
        module
    }

    #[test]
    fn flags_pe_magic_as_executable_image() {
        let rule = EmbeddedResourcePayloadRule;
        let mut bytes = vec![0x4D, 0x5A];
        bytes.extend(std::iter::repeat(0u8).take(62));
        let module = module_with_resource("payload.bin", bytes);

        let findings = rule.post_analysis_refine(&module, &[]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::High);
    }

    #[test]
    fn executable_image_escalates_to_critical_when_module_already_loads_assemblies() {
        let rule = EmbeddedResourcePayloadRule;
        let mut bytes = vec![0x4D, 0x5A];
        bytes.extend(std::iter::repeat(0u8).take(62));
        let module = module_with_resource("payload.bin", bytes);

        let companion = Finding::new("AssemblyDynamicLoadRule", "loads an assembly", Severity::Medium, MALFORMED_ASSEMBLY_LOCATION);
        let findings = rule.post_analysis_refine(&module, &[companion]);
        assert_eq!(findings[0].severity, Severity::Critical);
    }

    #[test]
    fn flags_embedded_plaintext_powershell_command() {
        let rule = EmbeddedResourcePayloadRule;
        let data = b"powershell -enc JABhAGIAYwA=".to_vec();
        let module = module_with_resource("config.txt", data);

        let findings = rule.post_analysis_refine(&module, &[]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Medium);
    }

    #[test]
    fn ignores_ordinary_resource_data() {
        let rule = EmbeddedResourcePayloadRule;
        let module = module_with_resource("icon.ico", vec![1, 2, 3, 4, 5]);
        assert!(rule.post_analysis_refine(&module, &[]).is_empty());
    }
}
