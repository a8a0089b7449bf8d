//! Artifact loader for the fitted classifier, scaler and training columns

use crate::models::classifier::LogisticRegression;
use crate::models::scaler::StandardScaler;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

/// The three artifacts a scoring engine is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Classifier,
    Scaler,
    Columns,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::Classifier,
        ArtifactKind::Scaler,
        ArtifactKind::Columns,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ArtifactKind::Classifier => "classifier",
            ArtifactKind::Scaler => "scaler",
            ArtifactKind::Columns => "columns",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Local file locations of the three artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub classifier: PathBuf,
    pub scaler: PathBuf,
    pub columns: PathBuf,
}

impl ArtifactPaths {
    pub fn get(&self, kind: ArtifactKind) -> &Path {
        match kind {
            ArtifactKind::Classifier => &self.classifier,
            ArtifactKind::Scaler => &self.scaler,
            ArtifactKind::Columns => &self.columns,
        }
    }

    /// Artifacts with no file on disk
    pub fn missing(&self) -> Vec<ArtifactKind> {
        ArtifactKind::ALL
            .into_iter()
            .filter(|&kind| !self.get(kind).exists())
            .collect()
    }
}

/// Loaded, immutable model artifacts
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub classifier: LogisticRegression,
    pub scaler: StandardScaler,
    /// Training column names in model order
    pub columns: Vec<String>,
}

impl ModelArtifacts {
    /// Load all three artifacts. Any failure is fatal to startup.
    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        let classifier: LogisticRegression = read_json(&paths.classifier, ArtifactKind::Classifier)?;
        let scaler: StandardScaler = read_json(&paths.scaler, ArtifactKind::Scaler)?;
        let columns: Vec<String> = read_json(&paths.columns, ArtifactKind::Columns)?;

        info!(
            features = columns.len(),
            classifier_features = classifier.n_features(),
            scaler_features = ?scaler.n_features(),
            "Model artifacts loaded"
        );

        Ok(Self {
            classifier,
            scaler,
            columns,
        })
    }

    /// Shape disagreements between the artifacts.
    ///
    /// These do not stop startup; every request fails with a shape mismatch
    /// instead.
    pub fn consistency_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let width = self.columns.len();

        if let Some(scaler_width) = self.scaler.n_features() {
            if scaler_width != width {
                issues.push(format!(
                    "scaler fitted on {} features but column list has {}",
                    scaler_width, width
                ));
            }
        }

        if self.classifier.n_features() != width {
            issues.push(format!(
                "classifier fitted on {} features but column list has {}",
                self.classifier.n_features(),
                width
            ));
        }

        let mut seen = HashSet::with_capacity(width);
        for column in &self.columns {
            if !seen.insert(column.as_str()) {
                issues.push(format!("duplicate training column {:?}", column));
            }
        }

        issues
    }
}

fn read_json<T: DeserializeOwned>(path: &Path, kind: ArtifactKind) -> Result<T> {
    info!(artifact = %kind, path = %path.display(), "Loading artifact");

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} artifact from {}", kind, path.display()))?;

    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse {} artifact at {}", kind, path.display()))
}
