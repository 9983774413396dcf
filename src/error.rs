use thiserror::Error;

/// Failures raised by the reconciliation core itself.
///
/// I/O problems never show up here; the batch reader and registry layer
/// report those through `anyhow`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("candidate at position {index} has no name")]
    MalformedCandidate { index: usize },

    #[error("record '{name}' reached formatting without a company id")]
    MissingIdentifier { name: String },
}
