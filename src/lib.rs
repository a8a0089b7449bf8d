//! Credit Risk Scoring Service Library
//!
//! Serves a pre-trained logistic credit risk model over HTTP. Requests are
//! one-hot encoded and aligned to the training columns, standardized with
//! the fitted scaler, then classified.

pub mod api;
pub mod config;
pub mod error;
pub mod feature_aligner;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod store;
pub mod types;

pub use api::{build_router, AppState};
pub use config::AppConfig;
pub use error::ScoringError;
pub use feature_aligner::{EncodingPolicy, FeatureAligner};
pub use models::inference::ScoringEngine;
pub use store::ArtifactStore;
pub use types::{PredictRequest, PredictResponse, Record};
