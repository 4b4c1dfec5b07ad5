//! Fixed lookup tables shared by the instruction analyzer and the rule catalogue (spec
//! §4.2 "Update method signals based on the callee's type+method name via a fixed
//! classification table", §4.3 LOLBin/safe-tool/dangerous-substring lists, GLOSSARY).
//!
//! Kept data-only and dependency-free (besides `modscan_core::cil`) so both the analyzer
//! (for signal-setting) and individual rules (for their own classification) can use it
//! without creating a cycle.

use modscan_core::cil::MethodRef;
use modscan_core::SignalBits;

/// Assembly scope names treated as BCL/system assemblies for the system-assembly
/// suppression rule (spec §4.2). Keyed by *assembly scope*, never namespace, so a mod
/// cannot spoof `System.Diagnostics` by declaring a type of that name in its own assembly.
pub const SYSTEM_ASSEMBLY_SCOPES: &[&str] = &[
    "mscorlib",
    "System",
    "System.Private.CoreLib",
    "System.Runtime",
    "netstandard",
    "System.Core",
    "System.Net.Http",
    "System.IO.FileSystem",
    "Microsoft.Win32.Registry",
    "UnityEngine",
    "UnityEngine.CoreModule",
];

pub fn is_system_assembly(assembly_scope: &str) -> bool {
    SYSTEM_ASSEMBLY_SCOPES.contains(&assembly_scope)
}

/// Living-off-the-land binaries (GLOSSARY).
pub const LOLBINS: &[&str] = &[
    "powershell.exe",
    "powershell",
    "cmd.exe",
    "cmd",
    "mshta.exe",
    "mshta",
    "regsvr32.exe",
    "regsvr32",
    "rundll32.exe",
    "rundll32",
    "certutil.exe",
    "certutil",
    "bitsadmin.exe",
    "bitsadmin",
    "msiexec.exe",
    "msiexec",
    "wmic.exe",
    "wmic",
    "schtasks.exe",
    "schtasks",
    "wscript.exe",
    "wscript",
    "cscript.exe",
    "cscript",
];

pub fn is_lolbin(target: &str) -> bool {
    let lower = target.to_ascii_lowercase();
    LOLBINS.iter().any(|b| lower.ends_with(b) || lower == *b)
}

/// Developer/content tools a legitimate mod plausibly launches (spec §4.3 Process.Start
/// severity matrix).
pub const KNOWN_SAFE_TOOLS: &[&str] = &["yt-dlp", "yt-dlp.exe", "ffmpeg", "ffmpeg.exe", "git", "git.exe", "node", "node.exe", "python", "python.exe", "dotnet", "dotnet.exe"];

pub fn is_known_safe_tool(target: &str) -> bool {
    let lower = target.to_ascii_lowercase();
    KNOWN_SAFE_TOOLS.iter().any(|t| lower.ends_with(t) || lower == *t)
}

/// Markers that, found in a decoded base64/hex string, indicate a dangerous payload
/// (spec §4.3 encoded-string rule).
pub const DANGEROUS_SUBSTRINGS: &[&str] = &[
    "powershell",
    "cmd.exe",
    "wscript",
    "mshta",
    "rundll32",
    "regsvr32",
    "http://",
    "https://",
    "%temp%",
    "appdata",
    "startup",
    "shell32.dll",
    "process",
    "assembly.load",
];

pub fn contains_dangerous_substring(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    DANGEROUS_SUBSTRINGS.iter().any(|m| lower.contains(m))
}

/// Suspicious-argument indicators for Process.Start argument strings (spec §4.3).
pub const SUSPICIOUS_ARGUMENT_MARKERS: &[&str] = &[
    "-enc",
    "-encodedcommand",
    "-ep bypass",
    "-executionpolicy bypass",
    "iex",
    "invoke-expression",
    "invoke-webrequest",
    "downloadstring",
    "downloadfile",
    "http://",
    "https://",
    "%temp%",
    "\\temp\\",
    "/tmp/",
];

pub fn has_suspicious_argument_marker(args: &str) -> bool {
    let lower = args.to_ascii_lowercase();
    SUSPICIOUS_ARGUMENT_MARKERS.iter().any(|m| lower.contains(m))
}

/// Hosts treated as suspicious file/paste/tunnel sharing services (spec §4.3
/// Data-infiltration rule).
pub const SUSPICIOUS_HOSTS: &[&str] = &[
    "pastebin.com",
    "hastebin.com",
    "ngrok.io",
    "ngrok-free.app",
    "api.telegram.org",
];

/// Hosts treated as safe distribution/package hosts.
pub const SAFE_HOSTS: &[&str] = &[
    "github.com",
    "raw.githubusercontent.com",
    "modrinth.com",
    "cdn.modrinth.com",
    "jsdelivr.net",
    "cdn.jsdelivr.net",
    "googleapis.com",
];

pub fn host_of(url: &str) -> Option<&str> {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let host = without_scheme.split(['/', '?', '#']).next()?;
    let host = host.split('@').next_back().unwrap_or(host);
    let host = host.split(':').next().unwrap_or(host);
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

pub fn is_bare_ip(host: &str) -> bool {
    host.split('.').count() == 4 && host.split('.').all(|p| p.parse::<u8>().is_ok())
}

pub fn classify_host(host: &str) -> HostClass {
    let lower = host.to_ascii_lowercase();
    if SUSPICIOUS_HOSTS.iter().any(|h| lower == *h || lower.ends_with(&format!(".{h}"))) || is_bare_ip(&lower) {
        HostClass::Suspicious
    } else if SAFE_HOSTS.iter().any(|h| lower == *h || lower.ends_with(&format!(".{h}"))) {
        HostClass::SafeKnown
    } else {
        HostClass::Unknown
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostClass {
    Suspicious,
    SafeKnown,
    Unknown,
}

/// Sensitive filesystem locations commonly used for staging/persistence.
pub const SENSITIVE_FOLDER_MARKERS: &[&str] = &["%temp%", "\\temp\\", "/tmp/", "appdata", "\\startup\\", "/startup/"];

pub fn uses_sensitive_folder(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    SENSITIVE_FOLDER_MARKERS.iter().any(|m| lower.contains(m))
}

/// One entry of the fixed method-reference classification table (spec §4.2). `signal`
/// is the bit the analyzer sets in the method's `SignalSet` the moment this method
/// reference is called, independent of whether any rule later emits a finding for it.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationEntry {
    pub declaring_type: &'static str,
    pub name: &'static str,
    pub signal: SignalBits,
}

const TABLE: &[ClassificationEntry] = &[
    ClassificationEntry { declaring_type: "System.Convert", name: "FromBase64String", signal: SignalBits::HAS_BASE64 },
    ClassificationEntry { declaring_type: "System.Diagnostics.Process", name: "Start", signal: SignalBits::HAS_PROCESS_LIKE_CALL },
    ClassificationEntry { declaring_type: "System.Net.WebClient", name: "DownloadString", signal: SignalBits::HAS_NETWORK_CALL },
    ClassificationEntry { declaring_type: "System.Net.WebClient", name: "DownloadData", signal: SignalBits::HAS_NETWORK_CALL },
    ClassificationEntry { declaring_type: "System.Net.WebClient", name: "DownloadFile", signal: SignalBits::HAS_NETWORK_CALL },
    ClassificationEntry { declaring_type: "System.Net.WebClient", name: "UploadString", signal: SignalBits::HAS_NETWORK_CALL },
    ClassificationEntry { declaring_type: "System.Net.WebClient", name: "UploadData", signal: SignalBits::HAS_NETWORK_CALL },
    ClassificationEntry { declaring_type: "System.Net.Http.HttpClient", name: "GetAsync", signal: SignalBits::HAS_NETWORK_CALL },
    ClassificationEntry { declaring_type: "System.Net.Http.HttpClient", name: "PostAsync", signal: SignalBits::HAS_NETWORK_CALL },
    ClassificationEntry { declaring_type: "System.Net.Http.HttpClient", name: "GetStringAsync", signal: SignalBits::HAS_NETWORK_CALL },
    ClassificationEntry { declaring_type: "System.IO.File", name: "WriteAllBytes", signal: SignalBits::HAS_FILE_WRITE },
    ClassificationEntry { declaring_type: "System.IO.File", name: "WriteAllText", signal: SignalBits::HAS_FILE_WRITE },
    ClassificationEntry { declaring_type: "System.IO.File", name: "Create", signal: SignalBits::HAS_FILE_WRITE },
    ClassificationEntry { declaring_type: "System.IO.FileStream", name: ".ctor", signal: SignalBits::HAS_FILE_WRITE },
    ClassificationEntry { declaring_type: "Microsoft.Win32.Registry", name: "SetValue", signal: SignalBits::HAS_REGISTRY_WRITE },
    ClassificationEntry { declaring_type: "Microsoft.Win32.RegistryKey", name: "SetValue", signal: SignalBits::HAS_REGISTRY_WRITE },
    ClassificationEntry { declaring_type: "System.Reflection.MethodInfo", name: "Invoke", signal: SignalBits::HAS_SUSPICIOUS_REFLECTION },
    ClassificationEntry { declaring_type: "System.Reflection.MethodBase", name: "Invoke", signal: SignalBits::HAS_SUSPICIOUS_REFLECTION },
    ClassificationEntry { declaring_type: "System.Type", name: "InvokeMember", signal: SignalBits::HAS_SUSPICIOUS_REFLECTION },
    ClassificationEntry { declaring_type: "System.Type", name: "GetTypeFromProgID", signal: SignalBits::HAS_SUSPICIOUS_REFLECTION },
    ClassificationEntry { declaring_type: "System.Type", name: "GetTypeFromCLSID", signal: SignalBits::HAS_SUSPICIOUS_REFLECTION },
    ClassificationEntry { declaring_type: "System.Activator", name: "CreateInstance", signal: SignalBits::HAS_SUSPICIOUS_REFLECTION },
    ClassificationEntry { declaring_type: "System.Runtime.InteropServices.Marshal", name: "GetActiveObject", signal: SignalBits::HAS_SUSPICIOUS_REFLECTION },
    ClassificationEntry { declaring_type: "System.Reflection.Assembly", name: "Load", signal: SignalBits::HAS_DYNAMIC_ASSEMBLY_LOAD },
    ClassificationEntry { declaring_type: "System.Reflection.Assembly", name: "LoadFrom", signal: SignalBits::HAS_DYNAMIC_ASSEMBLY_LOAD },
    ClassificationEntry { declaring_type: "System.Reflection.Assembly", name: "LoadFile", signal: SignalBits::HAS_DYNAMIC_ASSEMBLY_LOAD },
    ClassificationEntry { declaring_type: "System.Environment", name: "SetEnvironmentVariable", signal: SignalBits::HAS_ENVIRONMENT_VARIABLE_MODIFICATION },
    ClassificationEntry { declaring_type: "System.Environment", name: "GetFolderPath", signal: SignalBits::HAS_PATH_MANIPULATION },
    ClassificationEntry { declaring_type: "System.IO.Path", name: "Combine", signal: SignalBits::HAS_PATH_MANIPULATION },
];

/// Looks up the fixed classification entry for a resolved method reference, matching on
/// declaring type and member name only (never assembly scope — BCL renames across
/// runtime versions are common; suppression of *system-assembly* calls happens
/// separately in the instruction analyzer).
pub fn classify(method_ref: &MethodRef) -> Option<SignalBits> {
    TABLE
        .iter()
        .find(|e| e.declaring_type == method_ref.declaring_type && e.name == method_ref.name)
        .map(|e| e.signal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_base64_call() {
        let m = MethodRef::new("System.Convert", "FromBase64String", "System.Private.CoreLib");
        assert_eq!(classify(&m), Some(SignalBits::HAS_BASE64));
    }

    #[test]
    fn unknown_calls_classify_to_none() {
        let m = MethodRef::new("MyMod.Helpers", "DoThing", "MyMod");
        assert_eq!(classify(&m), None);
    }

    #[test]
    fn host_classification() {
        assert_eq!(classify_host("pastebin.com"), HostClass::Suspicious);
        assert_eq!(classify_host("raw.githubusercontent.com"), HostClass::SafeKnown);
        assert_eq!(classify_host("203.0.113.5"), HostClass::Suspicious);
        assert_eq!(classify_host("example.net"), HostClass::Unknown);
    }

    #[test]
    fn host_of_strips_scheme_and_path() {
        assert_eq!(host_of("https://pastebin.com/raw/abc123"), Some("pastebin.com"));
        assert_eq!(host_of("pastebin.com/raw/abc"), Some("pastebin.com"));
    }

    #[test]
    fn lolbin_and_safe_tool_detection() {
        assert!(is_lolbin("powershell.exe"));
        assert!(is_lolbin("C:\\Windows\\System32\\cmd.exe"));
        assert!(!is_lolbin("notepad.exe"));
        assert!(is_known_safe_tool("ffmpeg.exe"));
    }
}
