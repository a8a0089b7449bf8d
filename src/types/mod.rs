//! Request and response types for the scoring API

pub mod request;
pub mod response;

pub use request::{PredictRequest, Record};
pub use response::{ErrorBody, PredictResponse};
