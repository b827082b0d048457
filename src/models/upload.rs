use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::RecordId;
use crate::core::error::ApiError;

/// File descriptor returned by the upload endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: RecordId,
    pub url: String,
}

impl UploadedFile {
    /// The endpoint answers with one descriptor or an array of them; the
    /// first element wins.
    pub fn from_response(value: Value) -> Result<Self, ApiError> {
        let descriptor = match value {
            Value::Array(items) => items
                .into_iter()
                .next()
                .ok_or_else(|| ApiError::Decode("upload returned no files".to_string()))?,
            other => other,
        };
        Ok(serde_json::from_value(descriptor)?)
    }
}
