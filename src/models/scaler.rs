//! Fitted standard scaler

use crate::error::{ArtifactError, ScoringError};
use serde::Deserialize;

/// Per-column `(x - mean) / scale` normalization fitted at training time.
///
/// `mean` is absent when the scaler was fitted without centering, `scale`
/// when it was fitted without variance scaling.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawScaler")]
pub struct StandardScaler {
    mean: Option<Vec<f64>>,
    scale: Option<Vec<f64>>,
    n_features: Option<usize>,
}

#[derive(Deserialize)]
struct RawScaler {
    #[serde(default, alias = "mean_")]
    mean: Option<Vec<f64>>,
    #[serde(default, alias = "scale_")]
    scale: Option<Vec<f64>>,
    #[serde(default, alias = "n_features_in_")]
    n_features_in: Option<usize>,
}

impl TryFrom<RawScaler> for StandardScaler {
    type Error = ArtifactError;

    fn try_from(raw: RawScaler) -> Result<Self, Self::Error> {
        let widths = [
            raw.mean.as_ref().map(Vec::len),
            raw.scale.as_ref().map(Vec::len),
            raw.n_features_in,
        ];
        let mut known = widths.iter().flatten();
        let n_features = known.next().copied();
        if let Some(other) = known.find(|&&w| Some(w) != n_features) {
            return Err(ArtifactError::Scaler(format!(
                "inconsistent feature counts: {} vs {}",
                n_features.unwrap_or_default(),
                other
            )));
        }

        Ok(Self {
            mean: raw.mean,
            scale: raw.scale,
            n_features,
        })
    }
}

impl StandardScaler {
    /// Create a scaler with both centering and scaling
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, ArtifactError> {
        Self::try_from(RawScaler {
            mean: Some(mean),
            scale: Some(scale),
            n_features_in: None,
        })
    }

    /// Number of columns the scaler was fitted on, if recorded
    pub fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    /// Transform a single row.
    ///
    /// A zero scale entry leaves the centered value unscaled.
    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>, ScoringError> {
        if let Some(expected) = self.n_features {
            if row.len() != expected {
                return Err(ScoringError::ShapeMismatch {
                    stage: "scaler",
                    expected,
                    actual: row.len(),
                });
            }
        }

        let mut out = row.to_vec();
        if let Some(mean) = &self.mean {
            out.iter_mut().zip(mean).for_each(|(x, m)| *x -= m);
        }
        if let Some(scale) = &self.scale {
            out.iter_mut()
                .zip(scale)
                .for_each(|(x, &s)| *x /= if s == 0.0 { 1.0 } else { s });
        }
        Ok(out)
    }
}
