//! End-to-end coverage of spec §8's ten scenarios, driven through
//! `AssemblyScanner::scan_module` against synthetic modules built with
//! `modscan_core::testkit` — never a real `.dll` on disk.

use modscan_analyze::cross_assembly::{build_cross_assembly_graph, ScannedAssembly};
use modscan_analyze::AssemblyScanner;
use modscan_core::cross_assembly::ArtifactRole;
use modscan_core::testkit::{MethodBuilder, ModuleBuilderKit, TypeBuilder};
use modscan_core::{ScanConfig, Severity};

fn rules() -> modscan_rules::RuleSet {
    modscan_rules::default_rules()
}

struct NeverReads;

impl modscan_analyze::MetadataReader for NeverReads {
    fn read_path(&self, _path: &std::path::Path) -> modscan_core::Result<modscan_core::cil::Module> {
        unreachable!("scenario tests drive scan_module directly")
    }

    fn read_bytes(&self, _bytes: &[u8], _virtual_path: Option<&str>) -> modscan_core::Result<modscan_core::cil::Module> {
        unreachable!("scenario tests drive scan_module directly")
    }
}

fn scanner() -> AssemblyScanner {
    AssemblyScanner::new(Box::new(NeverReads))
}

#[test]
fn scenario_1_empty_module_produces_zero_findings() {
    let type_def = TypeBuilder::new("Game", "Plugin").method(MethodBuilder::new("Tick").ret()).build();
    let module = ModuleBuilderKit::new("Plugin").with_type(type_def).build();

    let result = scanner().scan_module(&module, &ScanConfig::default(), &rules());
    assert!(result.findings.is_empty());
}

#[test]
fn scenario_2_process_start_with_calc_exe_is_critical() {
    let type_def = TypeBuilder::new("Game", "Plugin")
        .method(
            MethodBuilder::new("Launch")
                .ldstr("calc.exe")
                .call("System.Diagnostics.Process", "Start", "System")
                .ret(),
        )
        .build();
    let module = ModuleBuilderKit::new("Plugin").with_type(type_def).build();

    let result = scanner().scan_module(&module, &ScanConfig::default(), &rules());
    assert!(result.findings.iter().any(|f| f.description.contains("Process.Start") || f.rule_id == "ProcessStartRule"));
    assert!(result.findings.iter().any(|f| f.severity == Severity::Critical));
}

#[test]
fn scenario_3_from_base64_string_alone_is_low_with_no_escalation() {
    let type_def = TypeBuilder::new("Game", "Plugin")
        .method(
            MethodBuilder::new("Decode")
                .ldstr("aGVsbG8gd29ybGQgdGhpcyBpcyBhIHRlc3Q=")
                .call("System.Convert", "FromBase64String", "System")
                .ret(),
        )
        .build();
    let module = ModuleBuilderKit::new("Plugin").with_type(type_def).build();

    let result = scanner().scan_module(&module, &ScanConfig::default(), &rules());
    let base64_finding = result.findings.iter().find(|f| f.description.to_ascii_lowercase().contains("base64")).expect("base64 finding");
    assert_eq!(base64_finding.severity, Severity::Low);
}

#[test]
fn scenario_4_registry_run_key_is_critical() {
    let type_def = TypeBuilder::new("Game", "Plugin")
        .method(
            MethodBuilder::new("Persist")
                .ldstr("SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\Run")
                .call("Microsoft.Win32.Registry", "SetValue", "System")
                .ret(),
        )
        .build();
    let module = ModuleBuilderKit::new("Plugin").with_type(type_def).build();

    let result = scanner().scan_module(&module, &ScanConfig::default(), &rules());
    assert!(result.findings.iter().any(|f| f.severity == Severity::Critical));
}

#[test]
fn scenario_5_encoded_string_pipeline_requires_select_before_concat() {
    let in_order = TypeBuilder::new("Game", "Plugin")
        .method(
            MethodBuilder::new("Pipeline")
                .ldstr("1")
                .call("System.Int32", "Parse", "System")
                .conv_u2()
                .call("System.Linq.Enumerable", "Select", "System")
                .call("System.String", "Concat", "System")
                .ret(),
        )
        .build();
    let module = ModuleBuilderKit::new("Plugin").with_type(in_order).build();
    let result = scanner().scan_module(&module, &ScanConfig::default(), &rules());
    let pipeline_findings: Vec<_> = result.findings.iter().filter(|f| f.rule_id == "EncodedStringPipelineRule").collect();
    assert_eq!(pipeline_findings.len(), 1);
    assert_eq!(pipeline_findings[0].severity, Severity::High);

    let reordered = TypeBuilder::new("Game", "Plugin")
        .method(
            MethodBuilder::new("Pipeline")
                .ldstr("1")
                .call("System.Int32", "Parse", "System")
                .conv_u2()
                .call("System.String", "Concat", "System")
                .call("System.Linq.Enumerable", "Select", "System")
                .ret(),
        )
        .build();
    let module = ModuleBuilderKit::new("Plugin").with_type(reordered).build();
    let result = scanner().scan_module(&module, &ScanConfig::default(), &rules());
    assert!(result.findings.iter().all(|f| f.rule_id != "EncodedStringPipelineRule"));
}

#[test]
fn scenario_6_obfuscated_reflective_execution_chain_is_critical() {
    let type_def = TypeBuilder::new("Game", "Plugin")
        .method(
            MethodBuilder::new("Run")
                .ldstr("112-111-119-101-114-115-104-101-108-108-46-101-120-101")
                .call("System.Int32", "Parse", "System")
                .conv_u2()
                .call("System.Reflection.Assembly", "Load", "System")
                .call("System.Reflection.MethodInfo", "Invoke", "System")
                .ldstr("powershell.exe")
                .ldstr("-ep bypass -enc payload")
                .call("System.Diagnostics.Process", "Start", "System")
                .ret(),
        )
        .build();
    let module = ModuleBuilderKit::new("Plugin").with_type(type_def).build();

    let result = scanner().scan_module(&module, &ScanConfig::default(), &rules());
    let obfuscated: Vec<_> = result.findings.iter().filter(|f| f.rule_id == "ObfuscatedReflectiveExecutionRule").collect();
    assert_eq!(obfuscated.len(), 1);
    assert_eq!(obfuscated[0].severity, Severity::Critical);
    assert!(obfuscated[0].risk_score.unwrap_or(0) >= 90);
    assert!(obfuscated[0].description.contains("obfuscation/decode"));
}

#[test]
fn scenario_7_benign_explorer_launch_produces_no_high_or_critical_findings() {
    let type_def = TypeBuilder::new("Game", "Plugin")
        .method(
            MethodBuilder::new("OpenFolder")
                .ldstr("explorer.exe")
                .ldstr("C:\\Users\\Public\\Documents")
                .call("System.Diagnostics.Process", "Start", "System")
                .ret(),
        )
        .build();
    let module = ModuleBuilderKit::new("Plugin").with_type(type_def).build();

    let result = scanner().scan_module(&module, &ScanConfig::default(), &rules());
    assert!(result.findings.iter().all(|f| f.severity != Severity::Critical && f.severity != Severity::High));
}

#[test]
fn scenario_8_com_reflection_full_chain_is_critical() {
    let type_def = TypeBuilder::new("Game", "Plugin")
        .method(
            MethodBuilder::new("Launch")
                .ldstr("Shell.Application")
                .call("System.Type", "GetTypeFromProgID", "System")
                .call("System.Activator", "CreateInstance", "System")
                .ldstr("ShellExecute")
                .call("System.Type", "InvokeMember", "System")
                .ret(),
        )
        .build();
    let module = ModuleBuilderKit::new("Plugin").with_type(type_def).build();

    let result = scanner().scan_module(&module, &ScanConfig::default(), &rules());
    assert!(result.findings.iter().any(|f| f.rule_id == "ComReflectionAttackRule" && f.severity == Severity::Critical));
    assert!(result.findings.iter().any(|f| f.severity == Severity::Critical || f.severity == Severity::High));
}

#[test]
fn scenario_9_legitimate_il2cpp_style_interop_produces_no_high_or_critical() {
    let type_def = TypeBuilder::new("Game", "Plugin")
        .method(
            MethodBuilder::new("Bind")
                .call("System.Type", "GetMethod", "System")
                .call("System.Type", "GetProperty", "System")
                .call("System.Type", "GetField", "System")
                .call("System.Reflection.MethodInfo", "Invoke", "System")
                .ret(),
        )
        .build();
    let module = ModuleBuilderKit::new("Plugin").with_type(type_def).build();

    let result = scanner().scan_module(&module, &ScanConfig::default(), &rules());
    assert!(result.findings.iter().all(|f| f.severity != Severity::Critical && f.severity != Severity::High));
}

#[test]
fn scenario_10_cross_assembly_graph_has_one_edge_and_an_unresolved_external_node() {
    let module_a = ModuleBuilderKit::new("A").with_assembly_reference("B").build();
    let module_b = ModuleBuilderKit::new("B").with_assembly_reference("C").build();
    let module_c_self_ref = ModuleBuilderKit::new("A").with_assembly_reference("A").build();

    let targets = vec![
        ScannedAssembly { path: "A.dll".into(), content_hash: "hash-a".into(), module: &module_a },
        ScannedAssembly { path: "B.dll".into(), content_hash: "hash-b".into(), module: &module_b },
    ];
    let graph = build_cross_assembly_graph(&targets);
    assert_eq!(graph.nodes.len(), 3);
    assert_eq!(graph.edges.len(), 1);
    let c = graph.find_node_by_assembly_name("C").unwrap();
    assert_eq!(graph.nodes[c].role, ArtifactRole::ExternalReference);
    assert!(!graph.edges.iter().any(|e| e.to == c));

    let self_ref_targets = vec![ScannedAssembly { path: "A.dll".into(), content_hash: "h".into(), module: &module_c_self_ref }];
    let self_graph = build_cross_assembly_graph(&self_ref_targets);
    assert!(self_graph.edges.is_empty());
}
