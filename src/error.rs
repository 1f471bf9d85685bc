use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Failed to load table '{table}': {message}")]
    TableLoad { table: String, message: String },

    #[error("Result column '{column}' missing or of unexpected type")]
    MissingColumn { column: String },

    #[error("DataFusion error: {0}")]
    DataFusionError(#[from] datafusion::error::DataFusionError),

    #[error("Arrow error: {0}")]
    ArrowError(#[from] datafusion::arrow::error::ArrowError),

    #[error("Object store error: {0}")]
    ObjectStoreError(#[from] object_store::Error),

    #[error("gRPC transport error: {0}")]
    GrpcError(#[from] tonic::transport::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Internal server error: {message}")]
    InternalError { message: String },
}

impl From<DashboardError> for tonic::Status {
    fn from(err: DashboardError) -> Self {
        match err {
            DashboardError::TableLoad { .. } => tonic::Status::failed_precondition(err.to_string()),
            DashboardError::ConfigError { .. } => tonic::Status::invalid_argument(err.to_string()),
            _ => tonic::Status::internal(err.to_string()),
        }
    }
}
