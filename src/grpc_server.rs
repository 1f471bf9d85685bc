use std::net::SocketAddr;
use std::sync::Arc;
use tonic::{transport::Server, Request, Response, Status};
use tracing::{error, info};

use crate::engine::DashboardEngine;
use crate::error::DashboardError;
use crate::filters::GameFilters;
use crate::proto::dashboard::{
    dashboard_service_server::{DashboardService, DashboardServiceServer},
    filtered_games_response::ResponseType,
    DashboardRequest, DashboardResponse, FilterOptions, FilteredGamesResponse, GameRowChunk,
    GetFilterOptionsRequest, HealthCheckRequest, HealthCheckResponse, StreamComplete,
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

const CHUNK_SIZE: usize = 1000;

pub struct GrpcServer {
    engine: Arc<DashboardEngine>,
}

impl GrpcServer {
    pub fn new(engine: Arc<DashboardEngine>) -> Self {
        Self { engine }
    }

    pub async fn start(&self, addr: SocketAddr) -> Result<(), DashboardError> {
        info!("Starting gRPC server on {}", addr);

        Server::builder()
            .add_service(self.service())
            .serve(addr)
            .await?;

        Ok(())
    }

    pub fn service(&self) -> DashboardServiceServer<DashboardServiceImpl> {
        DashboardServiceServer::new(DashboardServiceImpl {
            engine: self.engine.clone(),
        })
    }
}

pub struct DashboardServiceImpl {
    engine: Arc<DashboardEngine>,
}

fn filters_from(request: &DashboardRequest) -> GameFilters {
    request
        .filters
        .as_ref()
        .map(GameFilters::from)
        .unwrap_or_default()
}

#[tonic::async_trait]
impl DashboardService for DashboardServiceImpl {
    type StreamFilteredGamesStream = ReceiverStream<Result<FilteredGamesResponse, Status>>;

    async fn get_filter_options(
        &self,
        _request: Request<GetFilterOptionsRequest>,
    ) -> Result<Response<FilterOptions>, Status> {
        info!("gRPC: Received get_filter_options request");

        match self.engine.filter_options().await {
            Ok(options) => {
                info!("gRPC: Returning {} tag options", options.tags.len());
                Ok(Response::new(options.into()))
            }
            Err(e) => {
                error!("gRPC: Failed to load filter options: {}", e);
                Err(Status::from(e))
            }
        }
    }

    async fn get_dashboard(
        &self,
        request: Request<DashboardRequest>,
    ) -> Result<Response<DashboardResponse>, Status> {
        let filters = filters_from(request.get_ref());
        info!("gRPC: Received get_dashboard request with {:?}", filters);

        match self.engine.dashboard(&filters).await {
            Ok(summary) => Ok(Response::new(summary.into())),
            Err(e) => {
                error!("gRPC: Failed to compute dashboard: {}", e);
                Err(Status::from(e))
            }
        }
    }

    async fn stream_filtered_games(
        &self,
        request: Request<DashboardRequest>,
    ) -> Result<Response<Self::StreamFilteredGamesStream>, Status> {
        let filters = filters_from(request.get_ref());
        info!("gRPC: Received stream_filtered_games request with {:?}", filters);

        let (tx, rx) = mpsc::channel(32);
        let engine = self.engine.clone();

        tokio::spawn(async move {
            let start_time = std::time::Instant::now();

            let complete = match engine.game_rows(&filters).await {
                Ok(rows) => {
                    let total_rows = rows.len() as i64;
                    let mut chunk_index = 0;
                    let mut rows = rows.into_iter().peekable();

                    while rows.peek().is_some() {
                        let chunk = GameRowChunk {
                            rows: rows.by_ref().take(CHUNK_SIZE).map(|r| r.into()).collect(),
                            chunk_index,
                        };
                        let response = FilteredGamesResponse {
                            response_type: Some(ResponseType::Rows(chunk)),
                        };
                        if tx.send(Ok(response)).await.is_err() {
                            return; // Client disconnected
                        }
                        chunk_index += 1;
                    }

                    info!(
                        "gRPC: Sent {} chunks with {} total rows in {}ms",
                        chunk_index,
                        total_rows,
                        start_time.elapsed().as_millis()
                    );

                    StreamComplete {
                        total_rows,
                        execution_time_ms: start_time.elapsed().as_millis().to_string(),
                        success: true,
                        error_message: String::new(),
                    }
                }
                Err(e) => {
                    error!("gRPC: Failed to collect filtered games: {}", e);
                    StreamComplete {
                        total_rows: 0,
                        execution_time_ms: start_time.elapsed().as_millis().to_string(),
                        success: false,
                        error_message: e.to_string(),
                    }
                }
            };

            let response = FilteredGamesResponse {
                response_type: Some(ResponseType::Complete(complete)),
            };
            let _ = tx.send(Ok(response)).await;
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    async fn health_check(
        &self,
        _request: Request<HealthCheckRequest>,
    ) -> Result<Response<HealthCheckResponse>, Status> {
        info!("gRPC: Received health_check request");

        match self.engine.health_check().await {
            Ok(_) => Ok(Response::new(HealthCheckResponse {
                status: "healthy".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            })),
            Err(e) => {
                error!("gRPC: Health check failed: {}", e);
                Err(Status::internal("Health check failed"))
            }
        }
    }
}
