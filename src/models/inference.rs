//! Scoring engine: alignment, scaling and classification of one record

use crate::error::ScoringError;
use crate::feature_aligner::{EncodingPolicy, FeatureAligner};
use crate::models::classifier::LogisticRegression;
use crate::models::loader::{ArtifactPaths, ModelArtifacts};
use crate::models::scaler::StandardScaler;
use crate::types::request::Record;
use crate::types::response::PredictResponse;
use anyhow::Result;
use tracing::{debug, info};

/// Round a probability to 4 decimal places, ties to even.
pub fn round_probability(probability: f64) -> f64 {
    (probability * 10_000.0).round_ties_even() / 10_000.0
}

/// Outcome of scoring one record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Predicted class label
    pub label: i64,
    /// Positive-class probability, already rounded
    pub probability: f64,
}

impl Prediction {
    pub fn is_positive(&self, classes: [i64; 2]) -> bool {
        self.label == classes[1]
    }

    /// Convert to the API response body
    pub fn to_response(&self) -> PredictResponse {
        PredictResponse {
            prediction: self.label,
            probability: self.probability,
        }
    }
}

/// Immutable scoring context shared by every request.
///
/// Built once at startup from the loaded artifacts and never mutated, so it
/// can be read concurrently without locking.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    aligner: FeatureAligner,
    scaler: StandardScaler,
    classifier: LogisticRegression,
}

impl ScoringEngine {
    /// Create an engine from loaded artifacts
    pub fn new(artifacts: ModelArtifacts, policy: EncodingPolicy) -> Self {
        let ModelArtifacts {
            classifier,
            scaler,
            columns,
        } = artifacts;

        Self {
            aligner: FeatureAligner::new(columns, policy),
            scaler,
            classifier,
        }
    }

    /// Load artifacts from disk and build the engine
    pub fn load(paths: &ArtifactPaths, policy: EncodingPolicy) -> Result<Self> {
        let artifacts = ModelArtifacts::load(paths)?;
        let engine = Self::new(artifacts, policy);

        info!(
            features = engine.feature_count(),
            encoding = ?policy,
            "Scoring engine initialized"
        );

        Ok(engine)
    }

    /// Number of aligned features per row
    pub fn feature_count(&self) -> usize {
        self.aligner.feature_count()
    }

    pub fn feature_names(&self) -> &[String] {
        self.aligner.feature_names()
    }

    pub fn policy(&self) -> EncodingPolicy {
        self.aligner.policy()
    }

    pub fn classes(&self) -> [i64; 2] {
        self.classifier.classes()
    }

    /// Shape disagreements between the loaded artifacts
    pub fn consistency_issues(&self) -> Vec<String> {
        ModelArtifacts {
            classifier: self.classifier.clone(),
            scaler: self.scaler.clone(),
            columns: self.aligner.feature_names().to_vec(),
        }
        .consistency_issues()
    }

    /// Align a record onto the training columns
    pub fn align(&self, record: &Record) -> Vec<f64> {
        self.aligner.align(record)
    }

    /// Scale an aligned row and classify it
    pub fn score(&self, features: &[f64]) -> Result<Prediction, ScoringError> {
        let scaled = self.scaler.transform(features)?;
        let label = self.classifier.predict(&scaled)?;
        let probability = round_probability(self.classifier.predict_proba(&scaled)?);

        debug!(label, probability, "Row scored");

        Ok(Prediction { label, probability })
    }

    /// Align and score a single record
    pub fn predict(&self, record: &Record) -> Result<Prediction, ScoringError> {
        let features = self.align(record);
        self.score(&features)
    }
}
