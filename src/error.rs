//! Error types for artifact validation and request-time scoring

/// Failure while scoring a single aligned feature row.
///
/// Raised when the row width disagrees with what the scaler or the
/// classifier was fitted on, or when extreme inputs overflow the decision
/// value into NaN. Missing or malformed inputs never produce one.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoringError {
    /// Row width does not match a fitted artifact.
    #[error("shape mismatch in {stage}: expected {expected} features, got {actual}")]
    ShapeMismatch {
        /// Which artifact rejected the row ("scaler" or "classifier")
        stage: &'static str,
        /// Width the artifact was fitted on
        expected: usize,
        /// Width of the row that was supplied
        actual: usize,
    },

    /// Arithmetic produced NaN, so no probability can be reported.
    #[error("{stage} produced a NaN decision value")]
    NotANumber {
        /// Which artifact produced the value
        stage: &'static str,
    },
}

/// A fitted artifact whose contents cannot describe a binary linear model.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ArtifactError {
    #[error("invalid classifier: {0}")]
    Classifier(String),

    #[error("invalid scaler: {0}")]
    Scaler(String),
}
