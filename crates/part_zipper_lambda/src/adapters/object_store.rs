use std::io::Read;

use thiserror::Error;

/// One listed object. Only `name` drives the pipeline; the rest is carried
/// for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub name: String,
    pub size: Option<u64>,
    pub etag: Option<String>,
    pub last_modified_epoch_secs: Option<i64>,
}

impl ObjectSummary {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
            etag: None,
            last_modified_epoch_secs: None,
        }
    }
}

/// Transport or service failure reported by a store. The text is passed
/// through to the response unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StorageError {
    message: String,
}

impl StorageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub trait ObjectStore {
    /// Every object under `prefix`, in listing order, with pagination
    /// already drained.
    fn list_objects(
        &self,
        namespace: &str,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<ObjectSummary>, StorageError>;

    /// Lazily read object body. Dropping the reader releases the stream.
    fn get_object(
        &self,
        namespace: &str,
        bucket: &str,
        name: &str,
    ) -> Result<Box<dyn Read + Send>, StorageError>;

    /// Uploads the full content of `body`, replacing any existing object.
    fn put_object(
        &self,
        namespace: &str,
        bucket: &str,
        name: &str,
        body: &mut dyn Read,
    ) -> Result<(), StorageError>;

    /// Not assumed to be idempotent.
    fn delete_object(&self, namespace: &str, bucket: &str, name: &str)
        -> Result<(), StorageError>;
}
