use crate::catalog::DataFormat;
use crate::error::DashboardError;

const DEFAULT_DATA_DIR: &str = "../data";
const DEFAULT_GRPC_PORT: u16 = 50051;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    /// Local directory or `s3://` / `gs://` prefix holding the four tables.
    pub data_location: String,
    pub data_format: DataFormat,
    pub grpc_port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_location: DEFAULT_DATA_DIR.to_string(),
            data_format: DataFormat::Parquet,
            grpc_port: DEFAULT_GRPC_PORT,
        }
    }
}

impl DashboardConfig {
    pub fn from_env() -> Result<Self, DashboardError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, DashboardError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let data_location = lookup("DASHBOARD_DATA_DIR")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(defaults.data_location);

        let data_format = match lookup("DASHBOARD_DATA_FORMAT") {
            Some(value) => {
                DataFormat::parse(&value).ok_or_else(|| DashboardError::ConfigError {
                    message: format!("Unsupported DASHBOARD_DATA_FORMAT: {}", value),
                })?
            }
            None => defaults.data_format,
        };

        let grpc_port = match lookup("GRPC_PORT") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|e| DashboardError::ConfigError {
                    message: format!("Invalid GRPC_PORT '{}': {}", value, e),
                })?,
            None => defaults.grpc_port,
        };

        Ok(Self {
            data_location,
            data_format,
            grpc_port,
        })
    }
}
