use datafusion::common::cast::as_string_array;
use datafusion::dataframe::DataFrame;
use datafusion::execution::context::SessionContext;
use datafusion::prelude::col;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

use crate::aggregations;
use crate::config::DashboardConfig;
use crate::domain::{DashboardSummary, FilterOptions, GameRow};
use crate::error::DashboardError;
use crate::filters::GameFilters;
use crate::loader::{DataLoader, LoadedTables};

/// Loads the dashboard tables once and recomputes every view from them on
/// each request. The cached tables are never mutated after loading, so one
/// engine can serve any number of concurrent sessions.
pub struct DashboardEngine {
    ctx: SessionContext,
    loader: Option<DataLoader>,
    tables: OnceCell<Arc<LoadedTables>>,
}

impl DashboardEngine {
    pub fn new(config: &DashboardConfig) -> Self {
        info!("Initializing Dashboard Engine");

        Self {
            ctx: SessionContext::new(),
            loader: Some(DataLoader::new(
                config.data_location.clone(),
                config.data_format,
            )),
            tables: OnceCell::new(),
        }
    }

    /// An engine over tables that are already loaded.
    pub fn with_tables(tables: LoadedTables) -> Self {
        Self {
            ctx: SessionContext::new(),
            loader: None,
            tables: OnceCell::new_with(Some(Arc::new(tables))),
        }
    }

    pub async fn tables(&self) -> Result<Arc<LoadedTables>, DashboardError> {
        self.tables
            .get_or_try_init(|| async {
                let loader = self.loader.as_ref().ok_or_else(|| DashboardError::InternalError {
                    message: "No data loader configured".to_string(),
                })?;
                let tables = loader.load(&self.ctx).await?;
                info!("Dashboard tables loaded and cached");
                Ok::<_, DashboardError>(Arc::new(tables))
            })
            .await
            .cloned()
    }

    /// Loads the tables up front so a missing or corrupt file fails startup.
    pub async fn warm_up(&self) -> Result<(), DashboardError> {
        self.tables().await.map(|_| ())
    }

    pub async fn filter_options(&self) -> Result<FilterOptions, DashboardError> {
        let tables = self.tables().await?;
        let batches = tables
            .top_game_tags
            .clone()
            .filter(col("tag").is_not_null())?
            .select_columns(&["tag"])?
            .distinct()?
            .sort(vec![col("tag").sort(true, false)])?
            .collect()
            .await?;

        let mut tags = Vec::new();
        for batch in &batches {
            let array = as_string_array(batch.column(0).as_ref())?;
            tags.extend(array.iter().flatten().map(str::to_string));
        }

        Ok(FilterOptions { tags })
    }

    pub async fn filtered_games(&self, filters: &GameFilters) -> Result<DataFrame, DashboardError> {
        let tables = self.tables().await?;
        filters.apply(tables.games.clone(), &tables.top_game_tags)
    }

    pub async fn dashboard(
        &self,
        filters: &GameFilters,
    ) -> Result<DashboardSummary, DashboardError> {
        let start_time = std::time::Instant::now();
        info!("Computing dashboard for {:?}", filters);

        let tables = self.tables().await?;
        let filtered = filters.apply(tables.games.clone(), &tables.top_game_tags)?;
        let summary = aggregations::summarize(&filtered, &tables.game_tags).await?;

        info!(
            "Dashboard computed over {} games in {}ms",
            summary.metrics.game_count,
            start_time.elapsed().as_millis()
        );
        Ok(summary)
    }

    pub async fn game_rows(&self, filters: &GameFilters) -> Result<Vec<GameRow>, DashboardError> {
        let filtered = self.filtered_games(filters).await?;
        aggregations::detail_rows(&filtered).await
    }

    pub async fn health_check(&self) -> Result<(), DashboardError> {
        let _ = self.ctx.sql("SELECT 1 as health_check").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{MonthFilter, TriState};
    use crate::test_support::{game, history, tag, TableFixture};

    async fn engine() -> DashboardEngine {
        let tables = TableFixture {
            games: vec![
                game("a").score(50).release(2021, 1).peak(1500),
                game("b").score(80).release(2022, 6).early_access(true).peak(2500),
                game("c").score(90).release(2022, 6).early_access(true).peak(4000),
            ],
            prices: vec![
                history("a", 10.0, 0.0),
                history("b", 20.0, 50.0),
                history("c", 30.0, 25.0),
                history("c", 35.0, 0.0),
            ],
            tags: vec![tag("a", "Indie"), tag("b", "Action")],
            top_tags: vec![
                tag("c", "RPG"),
                tag("a", "Indie"),
                tag("b", "Action"),
                tag("c", "Indie"),
            ],
        }
        .load()
        .await;
        DashboardEngine::with_tables(tables)
    }

    #[tokio::test]
    async fn filter_options_list_distinct_sorted_tags() {
        let engine = engine().await;
        let options = engine.filter_options().await.unwrap();
        assert_eq!(options.tags, vec!["Action", "Indie", "RPG"]);
    }

    #[tokio::test]
    async fn dashboard_reflects_the_filtered_view() {
        let engine = engine().await;
        let filters = GameFilters {
            months: MonthFilter::from_labels(&["06 - June"]),
            ..Default::default()
        };

        let summary = engine.dashboard(&filters).await.unwrap();
        assert_eq!(summary.metrics.game_count, 2);
        assert_eq!(summary.metrics.median_score, Some(85.0));
        assert_eq!(summary.metrics.median_price, Some(25.0));
        assert_eq!(summary.metrics.average_discount, Some(37.5));
        assert_eq!(summary.metrics.total_peak_players, 6500);

        let cards = summary.metrics.cards();
        assert_eq!(cards[1].value, "$25.00");
        assert_eq!(cards[4].value, "6,500");
    }

    #[tokio::test]
    async fn repeated_requests_reuse_the_cached_tables() {
        let engine = engine().await;
        let first = engine.tables().await.unwrap();
        let _ = engine.dashboard(&GameFilters::default()).await.unwrap();
        let second = engine.tables().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn game_rows_follow_the_filters() {
        let engine = engine().await;
        let filters = GameFilters {
            early_access: TriState::No,
            ..Default::default()
        };

        let rows = engine.game_rows(&filters).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].itad_uuid, "a");
        assert_eq!(rows[0].regular_price, Some(10.0));
    }

    #[tokio::test]
    async fn health_check_runs_a_query() {
        let engine = engine().await;
        assert!(engine.health_check().await.is_ok());
    }
}
