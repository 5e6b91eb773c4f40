use lambda_runtime::{service_fn, Error, LambdaEvent};
use part_zipper_core::contract::ProcessResponse;
use part_zipper_lambda::adapters::s3_object_store::{S3ObjectStore, StorageConfig};
use part_zipper_lambda::handlers::zip_parts::handle_zip_event;
use serde_json::Value;
use tracing::error;
use tracing_subscriber::EnvFilter;

async fn handle_request(event: LambdaEvent<Value>) -> Result<ProcessResponse, Error> {
    let request_id = event.context.request_id;
    let storage = StorageConfig::from_env().map_err(|config_error| {
        error!(
            component = "zip_parts_lambda",
            event = "misconfigured",
            request_id = %request_id,
            error = %config_error,
        );
        Error::from(format!("error creating storage client: {config_error}"))
    })?;
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let store = S3ObjectStore::new(&aws_config, storage);

    handle_zip_event(event.payload, &store).map_err(|invocation_error| {
        error!(
            component = "zip_parts_lambda",
            event = "request_rejected",
            request_id = %request_id,
            error = %invocation_error,
        );
        Error::from(invocation_error.to_string())
    })
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();
    lambda_runtime::run(service_fn(handle_request)).await
}
