use std::time::Instant;

use part_zipper_core::contract::{
    decode_request, validate_request, EnvelopeError, ProcessResponse, ValidationError, ZipRequest,
    LISTING_ERROR_NAME,
};
use part_zipper_core::naming::{archive_entry_name, archive_object_name, is_part_object};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::adapters::object_store::{ObjectStore, StorageError};
use crate::archive::{build_single_entry_archive, ArchiveError};

const COMPONENT: &str = "zip_parts";

/// Failure of one object, tagged with the step that failed. Displays as the
/// underlying error text.
#[derive(Debug, Error)]
pub enum ObjectFailure {
    #[error("{0}")]
    Fetch(StorageError),
    #[error("{0}")]
    Archive(ArchiveError),
    #[error("{0}")]
    Upload(StorageError),
    #[error("{0}")]
    Delete(StorageError),
}

impl ObjectFailure {
    pub fn step(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "fetch",
            Self::Archive(_) => "archive",
            Self::Upload(_) => "upload",
            Self::Delete(_) => "delete",
        }
    }
}

/// Rejection of an invocation payload before any storage call is made.
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("error parsing request: {0}")]
    Decode(#[from] EnvelopeError),
    #[error("invalid request: {0}")]
    Invalid(#[from] ValidationError),
}

/// Decodes and validates one invocation payload, then runs the pipeline
/// against `store`.
pub fn handle_zip_event(
    payload: Value,
    store: &impl ObjectStore,
) -> Result<ProcessResponse, InvocationError> {
    let request = decode_request(payload)?;
    validate_request(&request)?;

    info!(
        component = COMPONENT,
        event = "request_received",
        namespace = %request.namespace,
        source_bucket = %request.source_bucket_name,
        target_bucket = %request.target_bucket_name,
        prefix = %request.prefix,
    );

    Ok(process_files(&request, store))
}

/// Lists `prefix` in the source bucket and moves every part file into its
/// own zip in the target bucket, one object at a time. Per-object failures
/// are recorded and never stop the run.
pub fn process_files(request: &ZipRequest, store: &impl ObjectStore) -> ProcessResponse {
    let started_at = Instant::now();
    let mut response = ProcessResponse::default();

    let objects = match store.list_objects(
        &request.namespace,
        &request.source_bucket_name,
        &request.prefix,
    ) {
        Ok(objects) => objects,
        Err(listing_error) => {
            error!(
                component = COMPONENT,
                event = "listing_failed",
                bucket = %request.source_bucket_name,
                prefix = %request.prefix,
                error = %listing_error,
            );
            response.record_error(LISTING_ERROR_NAME, &listing_error);
            return response;
        }
    };

    info!(
        component = COMPONENT,
        event = "listing_completed",
        bucket = %request.source_bucket_name,
        listed = objects.len(),
    );

    for object in &objects {
        if !is_part_object(&object.name) {
            debug!(component = COMPONENT, event = "object_skipped", object = %object.name);
            continue;
        }
        debug!(
            component = COMPONENT,
            event = "object_selected",
            object = %object.name,
            size = object.size,
            etag = object.etag.as_deref(),
            last_modified_epoch_secs = object.last_modified_epoch_secs,
        );

        match process_object(request, store, &object.name) {
            Ok(()) => response.record_success(object.name.as_str()),
            Err(failure) => {
                error!(
                    component = COMPONENT,
                    event = "object_failed",
                    object = %object.name,
                    step = failure.step(),
                    error = %failure,
                );
                response.record_error(object.name.as_str(), &failure);
            }
        }
    }

    info!(
        component = COMPONENT,
        event = "run_completed",
        succeeded = response.processed_with_success.len(),
        failed = response.processed_with_error.len(),
        duration_ms = started_at.elapsed().as_millis() as u64,
    );
    response
}

fn process_object(
    request: &ZipRequest,
    store: &impl ObjectStore,
    object_name: &str,
) -> Result<(), ObjectFailure> {
    let entry_name = archive_entry_name(&request.prefix, object_name);
    let archive = {
        let mut content = store
            .get_object(
                &request.namespace,
                &request.source_bucket_name,
                object_name,
            )
            .map_err(ObjectFailure::Fetch)?;
        build_single_entry_archive(&entry_name, &mut content)
            .map_err(ObjectFailure::Archive)?
    };
    info!(
        component = COMPONENT,
        event = "object_zipped",
        object = %object_name,
        entry = %entry_name,
        archive_bytes = archive.len(),
    );

    let upload_name = archive_object_name(object_name);
    store
        .put_object(
            &request.namespace,
            &request.target_bucket_name,
            &upload_name,
            &mut archive.as_slice(),
        )
        .map_err(ObjectFailure::Upload)?;
    info!(
        component = COMPONENT,
        event = "archive_uploaded",
        bucket = %request.target_bucket_name,
        archive = %upload_name,
    );

    store
        .delete_object(
            &request.namespace,
            &request.source_bucket_name,
            object_name,
        )
        .map_err(ObjectFailure::Delete)?;
    info!(
        component = COMPONENT,
        event = "source_deleted",
        bucket = %request.source_bucket_name,
        object = %object_name,
    );

    Ok(())
}
