use datafusion::execution::context::SessionContext;
use datafusion::execution::object_store::ObjectStoreUrl;
use object_store::{aws::AmazonS3Builder, gcp::GoogleCloudStorageBuilder, ObjectStore};
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

use crate::error::DashboardError;

/// Where the input tables live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataLocation {
    Local(String),
    Remote { scheme: String, bucket: String },
}

impl DataLocation {
    pub fn parse(location: &str) -> Result<Self, DashboardError> {
        let url = match Url::parse(location) {
            Ok(url) if url.scheme() != "file" && url.scheme().len() > 1 => url,
            // Relative paths and Windows drive letters are not URLs
            _ => return Ok(DataLocation::Local(location.to_string())),
        };

        let bucket = url
            .host_str()
            .ok_or_else(|| DashboardError::ConfigError {
                message: format!("Invalid data location {}: missing bucket", location),
            })?
            .to_string();

        Ok(DataLocation::Remote {
            scheme: url.scheme().to_string(),
            bucket,
        })
    }
}

fn create_gcs_client(
    bucket_name: &str,
    service_account_path: Option<String>,
) -> Result<Arc<dyn ObjectStore>, DashboardError> {
    let mut builder = GoogleCloudStorageBuilder::new().with_bucket_name(bucket_name);

    if let Some(path) = service_account_path {
        builder = builder.with_service_account_path(path);
    }

    let store = builder.build().inspect_err(|e| {
        warn!("Failed to create GCS client for bucket '{}': {}", bucket_name, e)
    })?;

    Ok(Arc::new(store))
}

fn create_s3_client(bucket_name: &str) -> Result<Arc<dyn ObjectStore>, DashboardError> {
    let store = AmazonS3Builder::from_env()
        .with_bucket_name(bucket_name)
        .build()
        .inspect_err(|e| warn!("Failed to create S3 client for bucket '{}': {}", bucket_name, e))?;

    Ok(Arc::new(store))
}

/// Registers an object store for remote data locations so listing tables can
/// resolve `s3://` and `gs://` paths. Local locations need nothing.
pub fn register_object_store(ctx: &SessionContext, location: &str) -> Result<(), DashboardError> {
    let (scheme, bucket) = match DataLocation::parse(location)? {
        DataLocation::Local(path) => {
            info!("Reading dashboard tables from local path {}", path);
            return Ok(());
        }
        DataLocation::Remote { scheme, bucket } => (scheme, bucket),
    };

    let object_store: Arc<dyn ObjectStore> = match scheme.as_str() {
        "s3" => create_s3_client(&bucket)?,
        "gs" => create_gcs_client(
            &bucket,
            std::env::var("GOOGLE_APPLICATION_CREDENTIALS").ok(),
        )?,
        other => {
            return Err(DashboardError::ConfigError {
                message: format!("Unsupported storage scheme: {}", other),
            });
        }
    };

    let object_store_url =
        ObjectStoreUrl::parse(format!("{}://{}", scheme, bucket)).map_err(|origin| {
            warn!("Could not parse object store url: {}", origin);
            DashboardError::ConfigError {
                message: format!("Invalid data location: {}", location),
            }
        })?;

    ctx.register_object_store(object_store_url.as_ref(), object_store);
    info!("Registered object store for {}://{}", scheme, bucket);
    Ok(())
}
