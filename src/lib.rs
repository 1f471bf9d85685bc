pub mod proto {
    pub mod dashboard {
        tonic::include_proto!("dashboard");
    }
}

pub mod aggregations;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod filters;
pub mod format;
pub mod grpc_server;
pub mod loader;
pub mod pricing;
pub mod storage;

#[cfg(test)]
mod test_support;

pub use config::DashboardConfig;
pub use engine::DashboardEngine;
pub use error::DashboardError;
pub use filters::GameFilters;
pub use grpc_server::GrpcServer;
