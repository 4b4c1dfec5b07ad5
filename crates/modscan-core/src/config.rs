//! Scan configuration (spec §3 "Scan configuration"). Constructed by the caller and
//! immutable for the lifetime of a scan — nothing inside the analysis core mutates it.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

fn default_minimum_encoded_string_length() -> usize {
    10
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeepAnalysisConfig {
    #[serde(default)]
    pub enable: bool,
    #[serde(default = "default_true")]
    pub deep_scan_only_flagged_methods: bool,
    #[serde(default = "DeepAnalysisConfig::default_max_deep_methods")]
    pub max_deep_methods_per_assembly: usize,
    #[serde(default = "DeepAnalysisConfig::default_max_time_ms")]
    pub max_analysis_time_ms_per_method: u64,
    #[serde(default)]
    pub emit_diagnostic_findings: bool,
    #[serde(default = "default_true")]
    pub require_correlated_base_finding: bool,

    #[serde(default = "default_true")]
    pub enable_string_decode_flow: bool,
    #[serde(default = "default_true")]
    pub enable_execution_chain: bool,
    #[serde(default = "default_true")]
    pub enable_resource_payload: bool,
    #[serde(default = "default_true")]
    pub enable_dynamic_load_correlation: bool,
    #[serde(default = "default_true")]
    pub enable_native_interop_correlation: bool,
    #[serde(default = "default_true")]
    pub enable_script_host_launch: bool,
    #[serde(default = "default_true")]
    pub enable_environment_pivot: bool,
}

impl DeepAnalysisConfig {
    fn default_max_deep_methods() -> usize {
        200
    }

    fn default_max_time_ms() -> u64 {
        50
    }
}

impl Default for DeepAnalysisConfig {
    fn default() -> Self {
        Self {
            enable: false,
            deep_scan_only_flagged_methods: true,
            max_deep_methods_per_assembly: Self::default_max_deep_methods(),
            max_analysis_time_ms_per_method: Self::default_max_time_ms(),
            emit_diagnostic_findings: false,
            require_correlated_base_finding: true,
            enable_string_decode_flow: true,
            enable_execution_chain: true,
            enable_resource_payload: true,
            enable_dynamic_load_correlation: true,
            enable_native_interop_correlation: true,
            enable_script_host_launch: true,
            enable_environment_pivot: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScanConfig {
    #[serde(default = "default_true")]
    pub enable_multi_signal_detection: bool,
    #[serde(default = "default_true")]
    pub detect_assembly_metadata: bool,
    #[serde(default = "default_true")]
    pub analyze_exception_handlers: bool,
    #[serde(default = "default_true")]
    pub analyze_local_variables: bool,
    #[serde(default = "default_true")]
    pub analyze_property_accessors: bool,
    #[serde(default)]
    pub developer_mode: bool,
    #[serde(default = "default_minimum_encoded_string_length")]
    pub minimum_encoded_string_length: usize,
    #[serde(default)]
    pub deep_analysis: DeepAnalysisConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            enable_multi_signal_detection: true,
            detect_assembly_metadata: true,
            analyze_exception_handlers: true,
            analyze_local_variables: true,
            analyze_property_accessors: true,
            developer_mode: false,
            minimum_encoded_string_length: default_minimum_encoded_string_length(),
            deep_analysis: DeepAnalysisConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = ScanConfig::default();
        assert_eq!(cfg.minimum_encoded_string_length, 10);
        assert!(!cfg.deep_analysis.enable);
        assert!(cfg.deep_analysis.deep_scan_only_flagged_methods);
    }

    #[test]
    fn round_trips_through_json() {
        let cfg = ScanConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ScanConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.minimum_encoded_string_length, cfg.minimum_encoded_string_length);
    }
}
