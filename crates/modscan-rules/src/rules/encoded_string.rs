//! Base64 / hex / numeric-tokenized encoded-string literal rule (spec §4.3, scenario 3,
//! part of scenario 6's obfuscated-execution chain).

use base64::Engine;
use modscan_core::cil::MethodDef;
use modscan_core::{Finding, ScanConfig, Severity};

use crate::classification::contains_dangerous_substring;
use crate::rule::{RuleMeta, StringLiteralRule};

pub const RULE_ID: &str = "EncodedStringRule";

pub struct EncodedStringRule;

impl RuleMeta for EncodedStringRule {
    fn rule_id(&self) -> &'static str {
        RULE_ID
    }

    fn description(&self) -> &'static str {
        "String literal decodes to a base64/hex/numeric-tokenized payload"
    }

    fn default_severity(&self) -> Severity {
        Severity::Low
    }
}

impl StringLiteralRule for EncodedStringRule {
    fn analyze_string_literal(
        &self,
        literal: &str,
        method: &MethodDef,
        instruction_index: usize,
        config: &ScanConfig,
    ) -> Vec<Finding> {
        if literal.len() < config.minimum_encoded_string_length {
            return Vec::new();
        }

        let Some(decoded) = decode_candidate(literal) else {
            return Vec::new();
        };

        let location = format!(
            "{}:{}",
            method.method_key(),
            method
                .instructions
                .get(instruction_index)
                .map(|i| i.offset)
                .unwrap_or(0)
        );

        let dangerous = contains_dangerous_substring(&decoded);
        let severity = if dangerous { Severity::High } else { Severity::Low };
        let description = if dangerous {
            format!("Encoded string literal decodes to a dangerous payload fragment: \"{decoded}\"")
        } else {
            format!("String literal \"{literal}\" looks like an encoded/obfuscated payload")
        };

        vec![Finding::new(RULE_ID, description, severity, location).with_snippet(literal.to_string())]
    }
}

/// Attempts each of the three decode strategies in spec §4.3 order; returns the first
/// that succeeds and produces plausible text.
pub(crate) fn decode_candidate(literal: &str) -> Option<String> {
    decode_numeric_tokenized(literal)
        .or_else(|| decode_base64_like(literal))
        .or_else(|| decode_hex_like(literal))
}

fn decode_numeric_tokenized(literal: &str) -> Option<String> {
    if literal.len() < 12 {
        return None;
    }
    let tokens: Vec<&str> = literal.split(|c: char| c == '-' || c == ',' || c == ' ').filter(|t| !t.is_empty()).collect();
    if tokens.len() < 4 {
        return None;
    }
    let numeric_tokens = tokens.iter().filter(|t| t.chars().all(|c| c.is_ascii_digit())).count();
    if (numeric_tokens as f64) / (tokens.len() as f64) < 0.70 {
        return None;
    }
    let mut decoded = String::new();
    let mut plausible_bytes = 0usize;
    for tok in &tokens {
        let Ok(v) = tok.parse::<u32>() else { return None };
        if v > 255 {
            return None;
        }
        if (32..=126).contains(&v) {
            plausible_bytes += 1;
        }
        decoded.push(v as u8 as char);
    }
    if plausible_bytes < 3 {
        return None;
    }
    Some(decoded)
}

fn decode_base64_like(literal: &str) -> Option<String> {
    if literal.len() < 24 || literal.len() % 4 != 0 {
        return None;
    }
    let valid_chars = literal
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '+' || *c == '/' || *c == '=')
        .count();
    if valid_chars < literal.len().saturating_sub(2) {
        return None;
    }
    let bytes = base64::engine::general_purpose::STANDARD.decode(literal).ok()?;
    String::from_utf8(bytes).ok().filter(|s| !s.is_empty())
}

fn decode_hex_like(literal: &str) -> Option<String> {
    let stripped: String = literal
        .replace("0x", "")
        .replace(['-', ':', ' '], "");
    if stripped.len() < 16 || stripped.len() % 2 != 0 {
        return None;
    }
    if !stripped.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let mut bytes = Vec::with_capacity(stripped.len() / 2);
    let chars: Vec<char> = stripped.chars().collect();
    for pair in chars.chunks(2) {
        let byte_str: String = pair.iter().collect();
        bytes.push(u8::from_str_radix(&byte_str, 16).ok()?);
    }
    String::from_utf8(bytes).ok().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_numeric_tokenized_ascii_codes() {
        let literal = "112-111-119-101-114-115-104-101-108-108-46-101-120-101";
        assert_eq!(decode_numeric_tokenized(literal).as_deref(), Some("powershell.exe"));
    }

    #[test]
    fn decodes_base64_dangerous_marker() {
        let encoded = base64::engine::general_purpose::STANDARD.encode("powershell -enc payload");
        let decoded = decode_base64_like(&encoded);
        assert!(decoded.unwrap().contains("powershell"));
    }

    #[test]
    fn ignores_short_literals() {
        assert!(decode_numeric_tokenized("1-2-3").is_none());
        assert!(decode_base64_like("YWJj").is_none());
    }
}
