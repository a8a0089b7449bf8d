//! Prediction and error response payloads

use serde::{Deserialize, Serialize};

/// Body returned by `POST /predict`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    /// Predicted class label (0 = good standing, 1 = default risk)
    pub prediction: i64,

    /// Positive-class probability, rounded to 4 decimal places
    pub probability: f64,
}

/// JSON error envelope for failed requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Human-readable failure description
    pub message: String,

    /// Machine-readable failure category
    #[serde(rename = "type")]
    pub error_type: String,
}

impl ErrorBody {
    pub fn new(error_type: &str, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                message: message.into(),
                error_type: error_type.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_shape() {
        let response = PredictResponse {
            prediction: 1,
            probability: 0.8731,
        };

        let json = serde_json::to_value(response).unwrap();
        assert_eq!(json, serde_json::json!({"prediction": 1, "probability": 0.8731}));
    }

    #[test]
    fn test_error_body_uses_type_key() {
        let body = ErrorBody::new("scoring_error", "boom");
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["error"]["type"], "scoring_error");
        assert_eq!(json["error"]["message"], "boom");
    }
}
