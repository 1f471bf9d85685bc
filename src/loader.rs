use datafusion::dataframe::DataFrame;
use datafusion::datasource::file_format::csv::CsvFormat;
use datafusion::datasource::file_format::parquet::ParquetFormat;
use datafusion::datasource::listing::{
    ListingOptions, ListingTable, ListingTableConfig, ListingTableUrl,
};
use datafusion::execution::context::SessionContext;
use datafusion::prelude::{cast, col, Expr};
use std::sync::Arc;
use tracing::{debug, info};

use crate::catalog::{DashboardTable, DataFormat};
use crate::error::DashboardError;
use crate::pricing::join_lowest_prices;
use crate::storage::register_object_store;

/// The four input tables after normalization, plus the game table with the
/// lowest historical price joined in. Every frame is materialized in memory
/// and never modified after loading.
#[derive(Debug, Clone)]
pub struct LoadedTables {
    pub game_info: DataFrame,
    pub game_history: DataFrame,
    pub game_tags: DataFrame,
    pub top_game_tags: DataFrame,
    pub games: DataFrame,
}

impl LoadedTables {
    /// Normalizes raw frames, joins prices into games, and caches everything.
    pub async fn assemble(
        game_info: DataFrame,
        game_history: DataFrame,
        game_tags: DataFrame,
        top_game_tags: DataFrame,
    ) -> Result<Self, DashboardError> {
        let game_info = materialize(DashboardTable::GameInfo, game_info).await?;
        let game_history = materialize(DashboardTable::GameHistory, game_history).await?;
        let game_tags = materialize(DashboardTable::GameTags, game_tags).await?;
        let top_game_tags = materialize(DashboardTable::TopGameTags, top_game_tags).await?;

        let games = join_lowest_prices(game_info.clone(), game_history.clone())?
            .cache()
            .await?;

        Ok(Self {
            game_info,
            game_history,
            game_tags,
            top_game_tags,
            games,
        })
    }
}

/// Projects a raw frame onto the table's canonical columns, casting each to
/// its canonical type. A missing column or an impossible cast fails here.
pub fn normalize(table: DashboardTable, df: DataFrame) -> Result<DataFrame, DashboardError> {
    let projection: Vec<Expr> = table
        .columns()
        .iter()
        .map(|(name, data_type)| cast(col(*name), data_type.clone()).alias(*name))
        .collect();

    df.select(projection).map_err(|e| DashboardError::TableLoad {
        table: table.name().to_string(),
        message: e.to_string(),
    })
}

async fn materialize(table: DashboardTable, df: DataFrame) -> Result<DataFrame, DashboardError> {
    let cached = normalize(table, df)?
        .cache()
        .await
        .map_err(|e| DashboardError::TableLoad {
            table: table.name().to_string(),
            message: e.to_string(),
        })?;

    let rows = cached.clone().count().await?;
    info!("Loaded table '{}' with {} rows", table, rows);
    Ok(cached)
}

pub struct DataLoader {
    location: String,
    format: DataFormat,
}

impl DataLoader {
    pub fn new(location: impl Into<String>, format: DataFormat) -> Self {
        Self {
            location: location.into(),
            format,
        }
    }

    pub async fn load(&self, ctx: &SessionContext) -> Result<LoadedTables, DashboardError> {
        info!(
            "Loading dashboard tables from {} ({})",
            self.location, self.format
        );

        register_object_store(ctx, &self.location)?;

        let game_info = self.read_table(ctx, DashboardTable::GameInfo).await?;
        let game_history = self.read_table(ctx, DashboardTable::GameHistory).await?;
        let game_tags = self.read_table(ctx, DashboardTable::GameTags).await?;
        let top_game_tags = self.read_table(ctx, DashboardTable::TopGameTags).await?;

        LoadedTables::assemble(game_info, game_history, game_tags, top_game_tags).await
    }

    async fn read_table(
        &self,
        ctx: &SessionContext,
        table: DashboardTable,
    ) -> Result<DataFrame, DashboardError> {
        let file_path = table.file_path(&self.location, self.format);
        debug!("Reading table '{}' from {}", table, file_path);

        let load_error = |message: String| DashboardError::TableLoad {
            table: table.name().to_string(),
            message,
        };

        let table_url = ListingTableUrl::parse(&file_path).map_err(|e| load_error(e.to_string()))?;
        let listing_options = match self.format {
            DataFormat::Csv => {
                let csv_format = CsvFormat::default()
                    .with_has_header(true)
                    .with_delimiter(b',');
                ListingOptions::new(Arc::new(csv_format))
            }
            DataFormat::Parquet => ListingOptions::new(Arc::new(ParquetFormat::default())),
        };

        let config = ListingTableConfig::new(table_url)
            .with_listing_options(listing_options)
            .infer_schema(&ctx.state())
            .await
            .map_err(|e| load_error(format!("{} ({})", e, file_path)))?;

        let listing_table = ListingTable::try_new(config).map_err(|e| load_error(e.to_string()))?;

        ctx.read_table(Arc::new(listing_table))
            .map_err(|e| load_error(e.to_string()))
    }
}
