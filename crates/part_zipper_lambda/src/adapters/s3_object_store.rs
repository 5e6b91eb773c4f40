use std::future::Future;
use std::io::{self, Read};

use aws_config::SdkConfig;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::Object;
use bytes::{Buf, Bytes};
use thiserror::Error;
use tracing::debug;

use crate::adapters::object_store::{ObjectStore, ObjectSummary, StorageError};

pub const ENDPOINT_TEMPLATE_ENV: &str = "PART_ZIPPER_ENDPOINT_TEMPLATE";
pub const FORCE_PATH_STYLE_ENV: &str = "PART_ZIPPER_FORCE_PATH_STYLE";
pub const NAMESPACE_PLACEHOLDER: &str = "{namespace}";

const ZIP_CONTENT_TYPE: &str = "application/zip";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{name} must not be blank when set")]
    BlankValue { name: &'static str },
    #[error("{name} must be 'true' or 'false', got '{value}'")]
    InvalidBool { name: &'static str, value: String },
}

/// How object storage endpoints are addressed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageConfig {
    /// Endpoint URL with an optional `{namespace}` placeholder. `None` keeps
    /// the SDK's default endpoint resolution.
    pub endpoint_template: Option<String>,
    pub force_path_style: bool,
}

impl StorageConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let endpoint_template = match lookup(ENDPOINT_TEMPLATE_ENV) {
            Some(value) if value.trim().is_empty() => {
                return Err(ConfigError::BlankValue {
                    name: ENDPOINT_TEMPLATE_ENV,
                })
            }
            Some(value) => Some(value.trim().to_string()),
            None => None,
        };

        // Compatibility endpoints only accept path-style requests, so a
        // templated endpoint defaults to it.
        let force_path_style = match lookup(FORCE_PATH_STYLE_ENV) {
            Some(value) => parse_bool(FORCE_PATH_STYLE_ENV, &value)?,
            None => endpoint_template.is_some(),
        };

        Ok(Self {
            endpoint_template,
            force_path_style,
        })
    }

    pub fn endpoint_for(&self, namespace: &str) -> Option<String> {
        self.endpoint_template
            .as_ref()
            .map(|template| template.replace(NAMESPACE_PLACEHOLDER, namespace))
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            name,
            value: value.to_string(),
        }),
    }
}

/// `ObjectStore` over the S3-compatible object storage API. Credentials and
/// region come from the ambient `aws-config` chain and are resolved lazily,
/// so authentication failures surface on the first request.
pub struct S3ObjectStore {
    sdk_config: SdkConfig,
    storage: StorageConfig,
    default_client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    pub fn new(sdk_config: &SdkConfig, storage: StorageConfig) -> Self {
        Self {
            sdk_config: sdk_config.clone(),
            storage,
            default_client: aws_sdk_s3::Client::new(sdk_config),
        }
    }

    fn client_for(&self, namespace: &str) -> aws_sdk_s3::Client {
        match self.storage.endpoint_for(namespace) {
            Some(endpoint) => {
                let config = aws_sdk_s3::config::Builder::from(&self.sdk_config)
                    .endpoint_url(endpoint)
                    .force_path_style(self.storage.force_path_style)
                    .build();
                aws_sdk_s3::Client::from_conf(config)
            }
            None => {
                debug!(
                    component = "s3_object_store",
                    namespace, "no endpoint template configured, using default endpoint"
                );
                self.default_client.clone()
            }
        }
    }
}

impl ObjectStore for S3ObjectStore {
    fn list_objects(
        &self,
        namespace: &str,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<ObjectSummary>, StorageError> {
        let client = self.client_for(namespace);

        block_on(async move {
            let mut objects = Vec::new();
            let mut continuation_token: Option<String> = None;
            loop {
                let output = client
                    .list_objects_v2()
                    .bucket(bucket)
                    .prefix(prefix)
                    .set_continuation_token(continuation_token.take())
                    .send()
                    .await
                    .map_err(|error| {
                        StorageError::new(format!(
                            "failed to list objects in bucket '{bucket}': {}",
                            DisplayErrorContext(&error)
                        ))
                    })?;

                objects.extend(output.contents().iter().filter_map(summary_from_s3));

                match output.next_continuation_token() {
                    Some(token) => continuation_token = Some(token.to_string()),
                    None => break,
                }
            }
            Ok(objects)
        })
    }

    fn get_object(
        &self,
        namespace: &str,
        bucket: &str,
        name: &str,
    ) -> Result<Box<dyn Read + Send>, StorageError> {
        let client = self.client_for(namespace);

        let output = block_on(async move {
            client
                .get_object()
                .bucket(bucket)
                .key(name)
                .send()
                .await
                .map_err(|error| {
                    StorageError::new(format!(
                        "failed to get object '{name}' from bucket '{bucket}': {}",
                        DisplayErrorContext(&error)
                    ))
                })
        })?;

        Ok(Box::new(ByteStreamReader::new(output.body)))
    }

    fn put_object(
        &self,
        namespace: &str,
        bucket: &str,
        name: &str,
        body: &mut dyn Read,
    ) -> Result<(), StorageError> {
        let mut payload = Vec::new();
        body.read_to_end(&mut payload).map_err(|error| {
            StorageError::new(format!("failed to read upload body for '{name}': {error}"))
        })?;
        let client = self.client_for(namespace);

        block_on(async move {
            client
                .put_object()
                .bucket(bucket)
                .key(name)
                .content_type(content_type_for(name))
                .body(ByteStream::from(payload))
                .send()
                .await
                .map(|_| ())
                .map_err(|error| {
                    StorageError::new(format!(
                        "failed to put object '{name}' to bucket '{bucket}': {}",
                        DisplayErrorContext(&error)
                    ))
                })
        })
    }

    fn delete_object(
        &self,
        namespace: &str,
        bucket: &str,
        name: &str,
    ) -> Result<(), StorageError> {
        let client = self.client_for(namespace);

        block_on(async move {
            client
                .delete_object()
                .bucket(bucket)
                .key(name)
                .send()
                .await
                .map(|_| ())
                .map_err(|error| {
                    StorageError::new(format!(
                        "failed to delete object '{name}' from bucket '{bucket}': {}",
                        DisplayErrorContext(&error)
                    ))
                })
        })
    }
}

fn summary_from_s3(object: &Object) -> Option<ObjectSummary> {
    Some(ObjectSummary {
        name: object.key()?.to_string(),
        size: object.size().and_then(|size| u64::try_from(size).ok()),
        etag: object.e_tag().map(str::to_string),
        last_modified_epoch_secs: object.last_modified().map(|time| time.secs()),
    })
}

fn content_type_for(name: &str) -> &'static str {
    if name.ends_with(".zip") {
        ZIP_CONTENT_TYPE
    } else {
        DEFAULT_CONTENT_TYPE
    }
}

/// Runs SDK futures from the synchronous store interface. Requires the
/// multi-threaded tokio runtime the Lambda binary starts.
fn block_on<F: Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

/// Blocking `Read` over an SDK body that pulls one chunk at a time.
struct ByteStreamReader {
    body: ByteStream,
    pending: Bytes,
}

impl ByteStreamReader {
    fn new(body: ByteStream) -> Self {
        Self {
            body,
            pending: Bytes::new(),
        }
    }
}

impl Read for ByteStreamReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        while self.pending.is_empty() {
            match block_on(self.body.try_next()) {
                Ok(Some(chunk)) => self.pending = chunk,
                Ok(None) => return Ok(0),
                Err(error) => return Err(io::Error::other(error)),
            }
        }

        let len = buf.len().min(self.pending.len());
        buf[..len].copy_from_slice(&self.pending[..len]);
        self.pending.advance(len);
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| values.get(key).cloned()
    }

    #[test]
    fn defaults_to_sdk_endpoint_without_template() {
        let config = StorageConfig::from_lookup(lookup_from(&[])).expect("config should load");

        assert_eq!(config, StorageConfig::default());
        assert_eq!(config.endpoint_for("ateamsaas"), None);
    }

    #[test]
    fn substitutes_namespace_into_template() {
        let config = StorageConfig::from_lookup(lookup_from(&[(
            ENDPOINT_TEMPLATE_ENV,
            "https://{namespace}.compat.objectstorage.us-ashburn-1.oraclecloud.com",
        )]))
        .expect("config should load");

        assert!(config.force_path_style);
        assert_eq!(
            config.endpoint_for("ateamsaas").as_deref(),
            Some("https://ateamsaas.compat.objectstorage.us-ashburn-1.oraclecloud.com")
        );
    }

    #[test]
    fn path_style_can_be_disabled_explicitly() {
        let config = StorageConfig::from_lookup(lookup_from(&[
            (ENDPOINT_TEMPLATE_ENV, "http://localhost:9000"),
            (FORCE_PATH_STYLE_ENV, "false"),
        ]))
        .expect("config should load");

        assert!(!config.force_path_style);
        assert_eq!(
            config.endpoint_for("ignored").as_deref(),
            Some("http://localhost:9000")
        );
    }

    #[test]
    fn rejects_blank_template() {
        let error = StorageConfig::from_lookup(lookup_from(&[(ENDPOINT_TEMPLATE_ENV, "  ")]))
            .expect_err("blank template should fail");

        assert_eq!(
            error,
            ConfigError::BlankValue {
                name: ENDPOINT_TEMPLATE_ENV
            }
        );
    }

    #[test]
    fn rejects_unparseable_path_style_flag() {
        let error = StorageConfig::from_lookup(lookup_from(&[(FORCE_PATH_STYLE_ENV, "maybe")]))
            .expect_err("invalid flag should fail");

        assert!(error.to_string().contains("got 'maybe'"));
    }

    #[test]
    fn store_builds_without_resolving_credentials() {
        let sdk_config = SdkConfig::builder()
            .behavior_version(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new("us-ashburn-1"))
            .build();
        assert!(sdk_config.credentials_provider().is_none());

        let storage = StorageConfig {
            endpoint_template: Some("https://{namespace}.compat.example.com".to_string()),
            force_path_style: true,
        };
        let store = S3ObjectStore::new(&sdk_config, storage);

        let client = store.client_for("ateamsaas");
        assert_eq!(
            client.config().region().map(|region| region.as_ref()),
            Some("us-ashburn-1")
        );
    }

    #[test]
    fn archives_are_tagged_as_zip() {
        assert_eq!(content_type_for("customer-import/part-1.csv.zip"), "application/zip");
        assert_eq!(content_type_for("customer-import/part-1.csv"), "application/octet-stream");
    }

    #[test]
    fn summary_skips_objects_without_keys() {
        let keyed = Object::builder()
            .key("customer-import/part-1.csv")
            .size(42)
            .e_tag("\"abc\"")
            .build();
        let unkeyed = Object::builder().size(1).build();

        assert_eq!(
            summary_from_s3(&keyed),
            Some(ObjectSummary {
                name: "customer-import/part-1.csv".to_string(),
                size: Some(42),
                etag: Some("\"abc\"".to_string()),
                last_modified_epoch_secs: None,
            })
        );
        assert_eq!(summary_from_s3(&unkeyed), None);
    }
}
