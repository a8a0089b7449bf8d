//! Fitted model artifacts and the scoring engine built from them

pub mod classifier;
pub mod inference;
pub mod loader;
pub mod scaler;

pub use classifier::LogisticRegression;
pub use inference::{Prediction, ScoringEngine};
pub use loader::{ArtifactKind, ArtifactPaths, ModelArtifacts};
pub use scaler::StandardScaler;
