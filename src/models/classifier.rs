//! Fitted binary logistic regression classifier

use crate::error::{ArtifactError, ScoringError};
use serde::Deserialize;

/// Binary logistic regression: `sigmoid(coef . x + intercept)`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawClassifier")]
pub struct LogisticRegression {
    coef: Vec<f64>,
    intercept: f64,
    classes: [i64; 2],
}

/// Coefficients as either a flat vector or a `1 x n` matrix
#[derive(Deserialize)]
#[serde(untagged)]
enum Coefficients {
    Flat(Vec<f64>),
    Matrix(Vec<Vec<f64>>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Intercept {
    Scalar(f64),
    Vector(Vec<f64>),
}

#[derive(Deserialize)]
struct RawClassifier {
    #[serde(alias = "coef_")]
    coef: Coefficients,
    #[serde(alias = "intercept_")]
    intercept: Intercept,
    #[serde(default, alias = "classes_")]
    classes: Option<Vec<i64>>,
}

impl TryFrom<RawClassifier> for LogisticRegression {
    type Error = ArtifactError;

    fn try_from(raw: RawClassifier) -> Result<Self, Self::Error> {
        let coef = match raw.coef {
            Coefficients::Flat(coef) => coef,
            Coefficients::Matrix(mut rows) if rows.len() == 1 => rows.remove(0),
            Coefficients::Matrix(rows) => {
                return Err(ArtifactError::Classifier(format!(
                    "expected a single row of coefficients, found {}",
                    rows.len()
                )))
            }
        };

        let intercept = match raw.intercept {
            Intercept::Scalar(b) => b,
            Intercept::Vector(v) if v.len() == 1 => v[0],
            Intercept::Vector(v) => {
                return Err(ArtifactError::Classifier(format!(
                    "expected a single intercept, found {}",
                    v.len()
                )))
            }
        };

        let classes = match raw.classes.as_deref() {
            None => [0, 1],
            Some(&[negative, positive]) => [negative, positive],
            Some(other) => {
                return Err(ArtifactError::Classifier(format!(
                    "expected exactly two classes, found {}",
                    other.len()
                )))
            }
        };

        Ok(Self {
            coef,
            intercept,
            classes,
        })
    }
}

/// Numerically stable logistic function
fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl LogisticRegression {
    /// Create a classifier with labels `[0, 1]`
    pub fn new(coef: Vec<f64>, intercept: f64) -> Self {
        Self {
            coef,
            intercept,
            classes: [0, 1],
        }
    }

    /// Override the `[negative, positive]` class labels
    pub fn with_classes(mut self, classes: [i64; 2]) -> Self {
        self.classes = classes;
        self
    }

    /// Number of features the classifier was fitted on
    pub fn n_features(&self) -> usize {
        self.coef.len()
    }

    pub fn classes(&self) -> [i64; 2] {
        self.classes
    }

    /// Signed distance to the decision boundary.
    ///
    /// Overflow to an infinite value is kept and saturates the probability.
    /// `inf - inf` yields NaN and is rejected.
    pub fn decision_function(&self, row: &[f64]) -> Result<f64, ScoringError> {
        if row.len() != self.coef.len() {
            return Err(ScoringError::ShapeMismatch {
                stage: "classifier",
                expected: self.coef.len(),
                actual: row.len(),
            });
        }

        let dot: f64 = self.coef.iter().zip(row).map(|(w, x)| w * x).sum();
        let decision = dot + self.intercept;
        if decision.is_nan() {
            return Err(ScoringError::NotANumber { stage: "classifier" });
        }
        Ok(decision)
    }

    /// Predicted class label: the positive class when the decision value is > 0
    pub fn predict(&self, row: &[f64]) -> Result<i64, ScoringError> {
        let decision = self.decision_function(row)?;
        Ok(self.classes[usize::from(decision > 0.0)])
    }

    /// Probability of the positive class
    pub fn predict_proba(&self, row: &[f64]) -> Result<f64, ScoringError> {
        self.decision_function(row).map(sigmoid)
    }
}
