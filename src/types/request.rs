//! Prediction request payloads

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One applicant record: feature name to raw value.
///
/// Values may be numbers, strings, booleans or null. Keys are arbitrary;
/// anything the model was not trained on is ignored during alignment.
pub type Record = Map<String, Value>;

/// Body of `POST /predict`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    /// Raw feature values keyed by column name
    pub data: Record,
}
