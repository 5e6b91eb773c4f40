use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};
use thiserror::Error;

/// Name recorded against a failure to list the source bucket.
pub const LISTING_ERROR_NAME: &str = "oci bucket";

/// Prefix applied to every recorded error message. Existing consumers of the
/// response match on this text, so it is kept for all failing steps.
pub const ERROR_MESSAGE_PREFIX: &str = "error deleting file";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ZipRequest {
    pub namespace: String,
    pub source_bucket_name: String,
    pub target_bucket_name: String,
    pub prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessedError {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Error")]
    pub error: String,
}

/// Outcome of one pipeline run. Both lists are append-only while the run is
/// in progress and encode as `null` while empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessResponse {
    #[serde(
        rename = "ProcessedWithSuccess",
        default,
        serialize_with = "empty_as_null",
        deserialize_with = "null_as_empty"
    )]
    pub processed_with_success: Vec<String>,
    #[serde(
        rename = "ProcessedWithError",
        default,
        serialize_with = "empty_as_null",
        deserialize_with = "null_as_empty"
    )]
    pub processed_with_error: Vec<ProcessedError>,
}

impl ProcessResponse {
    pub fn record_success(&mut self, object_name: impl Into<String>) {
        self.processed_with_success.push(object_name.into());
    }

    pub fn record_error(&mut self, object_name: impl Into<String>, error: impl std::fmt::Display) {
        self.processed_with_error.push(ProcessedError {
            name: object_name.into(),
            error: format!("{ERROR_MESSAGE_PREFIX} {error}"),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.processed_with_success.is_empty() && self.processed_with_error.is_empty()
    }
}

fn empty_as_null<T, S>(values: &[T], serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize,
    S: Serializer,
{
    if values.is_empty() {
        serializer.serialize_none()
    } else {
        serializer.collect_seq(values)
    }
}

fn null_as_empty<'de, T, D>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error("Request payload must be a JSON object")]
    NotAnObject,
    #[error("Request body must be a JSON object")]
    BodyNotAnObject,
    #[error("Malformed JSON body: {0}")]
    MalformedBody(String),
    #[error("Malformed request: {0}")]
    MalformedRequest(String),
}

/// Rejects requests that cannot address a bucket. The prefix may be empty,
/// in which case the whole source bucket is listed.
pub fn validate_request(request: &ZipRequest) -> Result<(), ValidationError> {
    let required = [
        ("namespace", &request.namespace),
        ("sourceBucketName", &request.source_bucket_name),
        ("targetBucketName", &request.target_bucket_name),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(ValidationError::new(format!("{field} cannot be empty")));
        }
    }
    Ok(())
}

/// Accepts either a bare request object or a gateway envelope carrying the
/// request under `body` (as an object or a JSON-encoded string).
pub fn normalize_invocation_payload(event: Value) -> Result<Value, EnvelopeError> {
    let Some(object) = event.as_object() else {
        return Err(EnvelopeError::NotAnObject);
    };

    let Some(body) = object.get("body") else {
        return Ok(event);
    };

    match body {
        Value::Null => Ok(json!({})),
        Value::Object(_) => Ok(body.clone()),
        Value::String(text) => {
            let parsed: Value = serde_json::from_str(text)
                .map_err(|error| EnvelopeError::MalformedBody(error.to_string()))?;
            if parsed.is_object() {
                Ok(parsed)
            } else {
                Err(EnvelopeError::BodyNotAnObject)
            }
        }
        _ => Err(EnvelopeError::BodyNotAnObject),
    }
}

pub fn decode_request(event: Value) -> Result<ZipRequest, EnvelopeError> {
    let payload = normalize_invocation_payload(event)?;
    serde_json::from_value(payload)
        .map_err(|error| EnvelopeError::MalformedRequest(error.to_string()))
}
