use thiserror::Error;

/// Errors surfaced to callers of the scanner API (spec §7: "Propagation policy").
///
/// Analysis-time failures (a rule panicking on a malformed call site, a deep analyzer
/// blowing its time budget) never appear here — they are degraded to informational
/// findings or swallowed, never raised. Only I/O and configuration problems propagate.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Recovered locally by `AssemblyScanner` into a single Low-severity informational
    /// finding; kept as an error variant so the metadata-reading boundary can still
    /// report the failure mode that triggered the downgrade.
    #[error("malformed assembly: {0}")]
    MalformedAssembly(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;
