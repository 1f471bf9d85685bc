use datafusion::arrow::array::{Array, ArrayRef};
use datafusion::arrow::datatypes::DataType;
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::common::cast::{
    as_boolean_array, as_date32_array, as_float64_array, as_int64_array, as_string_array,
};
use datafusion::dataframe::DataFrame;
use datafusion::functions::math::expr_fn::floor;
use datafusion::functions_aggregate::expr_fn::{avg, count, median, sum};
use datafusion::prelude::{cast, col, lit, JoinType};
use tracing::debug;

use crate::domain::{
    DashboardMetrics, DashboardSummary, GameRow, PriceBin, ReleaseCount, TagPopularity,
    YearlyScore,
};
use crate::error::DashboardError;

pub const PRICE_BIN_WIDTH: f64 = 2.5;
/// Release trend only covers years strictly after this one.
pub const RELEASE_TREND_AFTER_YEAR: i64 = 2000;
pub const TOP_TAG_MIN_GAMES: i64 = 15;
pub const TOP_TAG_LIMIT: usize = 10;

pub const DETAIL_COLUMNS: [&str; 7] = [
    "itad_uuid",
    "rank",
    "title",
    "steam_score",
    "regular_price",
    "peak_player_count",
    "release_date",
];

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef, DashboardError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| DashboardError::MissingColumn {
            column: name.to_string(),
        })
}

fn f64_at(batch: &RecordBatch, name: &str, row: usize) -> Result<Option<f64>, DashboardError> {
    let array = as_float64_array(column(batch, name)?.as_ref())?;
    Ok((!array.is_null(row)).then(|| array.value(row)))
}

fn i64_at(batch: &RecordBatch, name: &str, row: usize) -> Result<Option<i64>, DashboardError> {
    let array = as_int64_array(column(batch, name)?.as_ref())?;
    Ok((!array.is_null(row)).then(|| array.value(row)))
}

fn bool_at(batch: &RecordBatch, name: &str, row: usize) -> Result<Option<bool>, DashboardError> {
    let array = as_boolean_array(column(batch, name)?.as_ref())?;
    Ok((!array.is_null(row)).then(|| array.value(row)))
}

fn string_at(
    batch: &RecordBatch,
    name: &str,
    row: usize,
) -> Result<Option<String>, DashboardError> {
    let array = as_string_array(column(batch, name)?.as_ref())?;
    Ok((!array.is_null(row)).then(|| array.value(row).to_string()))
}

fn rows(batches: &[RecordBatch]) -> impl Iterator<Item = (&RecordBatch, usize)> {
    batches
        .iter()
        .flat_map(|batch| (0..batch.num_rows()).map(move |row| (batch, row)))
}

/// Mean of `total` over `n` values, undefined when there are none.
pub fn checked_mean(total: Option<f64>, n: i64) -> Option<f64> {
    if n <= 0 {
        return None;
    }
    total.map(|total| total / n as f64)
}

pub async fn metrics(filtered: &DataFrame) -> Result<DashboardMetrics, DashboardError> {
    let totals = filtered
        .clone()
        .aggregate(
            vec![],
            vec![
                median(col("steam_score")).alias("median_score"),
                median(col("regular_price")).alias("median_price"),
                median(cast(col("peak_player_count"), DataType::Float64)).alias("median_peak"),
                sum(col("peak_player_count")).alias("total_peak"),
                count(lit(1)).alias("game_count"),
            ],
        )?
        .collect()
        .await?;

    let discounts = filtered
        .clone()
        .filter(col("percent").gt(lit(0.0)))?
        .aggregate(
            vec![],
            vec![
                sum(col("percent")).alias("discount_total"),
                count(col("percent")).alias("discounted_games"),
            ],
        )?
        .collect()
        .await?;

    let (summary, row) = rows(&totals)
        .next()
        .ok_or_else(|| DashboardError::InternalError {
            message: "Metric aggregation returned no rows".to_string(),
        })?;

    let average_discount = match rows(&discounts).next() {
        Some((batch, row)) => checked_mean(
            f64_at(batch, "discount_total", row)?,
            i64_at(batch, "discounted_games", row)?.unwrap_or(0),
        ),
        None => None,
    };

    Ok(DashboardMetrics {
        median_score: f64_at(summary, "median_score", row)?,
        median_price: f64_at(summary, "median_price", row)?,
        average_discount,
        median_peak_players: f64_at(summary, "median_peak", row)?,
        total_peak_players: i64_at(summary, "total_peak", row)?.unwrap_or(0),
        game_count: i64_at(summary, "game_count", row)?.unwrap_or(0) as usize,
    })
}

pub async fn release_trend(filtered: &DataFrame) -> Result<Vec<ReleaseCount>, DashboardError> {
    let batches = filtered
        .clone()
        .filter(
            col("release_date")
                .is_not_null()
                .and(col("release_year").gt(lit(RELEASE_TREND_AFTER_YEAR))),
        )?
        .aggregate(
            vec![col("release_year"), col("early_access")],
            vec![count(lit(1)).alias("release_count")],
        )?
        .sort(vec![
            col("release_year").sort(true, false),
            col("early_access").sort(true, true),
        ])?
        .collect()
        .await?;

    let mut points = Vec::new();
    for (batch, row) in rows(&batches) {
        if let Some(release_year) = i64_at(batch, "release_year", row)? {
            points.push(ReleaseCount {
                release_year,
                early_access: bool_at(batch, "early_access", row)?,
                count: i64_at(batch, "release_count", row)?.unwrap_or(0),
            });
        }
    }
    Ok(points)
}

pub async fn price_histogram(filtered: &DataFrame) -> Result<Vec<PriceBin>, DashboardError> {
    let bin_start = floor(col("regular_price") / lit(PRICE_BIN_WIDTH)) * lit(PRICE_BIN_WIDTH);

    let batches = filtered
        .clone()
        .filter(col("regular_price").is_not_null())?
        .aggregate(
            vec![bin_start.alias("bin_start")],
            vec![count(lit(1)).alias("bin_count")],
        )?
        .sort(vec![col("bin_start").sort(true, false)])?
        .collect()
        .await?;

    let mut bins = Vec::new();
    for (batch, row) in rows(&batches) {
        if let Some(bin_start) = f64_at(batch, "bin_start", row)? {
            bins.push(PriceBin {
                bin_start,
                bin_end: bin_start + PRICE_BIN_WIDTH,
                count: i64_at(batch, "bin_count", row)?.unwrap_or(0),
            });
        }
    }
    Ok(bins)
}

pub async fn score_trend(filtered: &DataFrame) -> Result<Vec<YearlyScore>, DashboardError> {
    let batches = filtered
        .clone()
        .filter(
            col("release_date")
                .is_not_null()
                .and(col("release_year").is_not_null()),
        )?
        .aggregate(
            vec![col("release_year")],
            vec![avg(col("steam_score")).alias("mean_score")],
        )?
        .sort(vec![col("release_year").sort(true, false)])?
        .collect()
        .await?;

    let mut points = Vec::new();
    for (batch, row) in rows(&batches) {
        let year = i64_at(batch, "release_year", row)?;
        let mean = f64_at(batch, "mean_score", row)?;
        if let (Some(release_year), Some(mean_score)) = (year, mean) {
            points.push(YearlyScore {
                release_year,
                mean_score,
            });
        }
    }
    Ok(points)
}

/// Tags on the filtered games ranked by median peak players, ignoring tags
/// with fewer than [`TOP_TAG_MIN_GAMES`] games.
pub async fn top_tags(
    filtered: &DataFrame,
    game_tags: &DataFrame,
) -> Result<Vec<TagPopularity>, DashboardError> {
    let games = filtered.clone().select(vec![
        col("itad_uuid").alias("game_uuid"),
        col("peak_player_count").alias("game_peak"),
    ])?;

    let batches = game_tags
        .clone()
        .join(games, JoinType::Inner, &["itad_uuid"], &["game_uuid"], None)?
        .aggregate(
            vec![col("tag")],
            vec![
                median(cast(col("game_peak"), DataType::Float64)).alias("median_peak"),
                count(col("game_peak")).alias("game_count"),
            ],
        )?
        .filter(col("game_count").gt_eq(lit(TOP_TAG_MIN_GAMES)))?
        .sort(vec![
            col("median_peak").sort(false, false),
            col("tag").sort(true, false),
        ])?
        .limit(0, Some(TOP_TAG_LIMIT))?
        .collect()
        .await?;

    let mut tags = Vec::new();
    for (batch, row) in rows(&batches) {
        let tag = string_at(batch, "tag", row)?;
        let median_peak = f64_at(batch, "median_peak", row)?;
        if let (Some(tag), Some(median_peak_players)) = (tag, median_peak) {
            tags.push(TagPopularity {
                tag,
                median_peak_players,
                game_count: i64_at(batch, "game_count", row)?.unwrap_or(0),
            });
        }
    }
    Ok(tags)
}

/// Filtered games for the detail table, ordered by rank.
pub async fn detail_rows(filtered: &DataFrame) -> Result<Vec<GameRow>, DashboardError> {
    let batches = filtered
        .clone()
        .sort(vec![
            col("rank").sort(true, false),
            col("itad_uuid").sort(true, false),
        ])?
        .select_columns(&DETAIL_COLUMNS)?
        .collect()
        .await?;

    let mut games = Vec::new();
    for (batch, row) in rows(&batches) {
        let release_dates = as_date32_array(column(batch, "release_date")?.as_ref())?;
        games.push(GameRow {
            itad_uuid: string_at(batch, "itad_uuid", row)?.unwrap_or_default(),
            rank: i64_at(batch, "rank", row)?,
            title: string_at(batch, "title", row)?.unwrap_or_default(),
            steam_score: f64_at(batch, "steam_score", row)?,
            regular_price: f64_at(batch, "regular_price", row)?,
            peak_player_count: i64_at(batch, "peak_player_count", row)?,
            release_date: if release_dates.is_null(row) {
                None
            } else {
                release_dates.value_as_date(row)
            },
        });
    }
    Ok(games)
}

pub async fn summarize(
    filtered: &DataFrame,
    game_tags: &DataFrame,
) -> Result<DashboardSummary, DashboardError> {
    let metrics = metrics(filtered).await?;
    debug!("Computed metrics over {} games", metrics.game_count);

    Ok(DashboardSummary {
        metrics,
        release_trend: release_trend(filtered).await?,
        price_histogram: price_histogram(filtered).await?,
        score_trend: score_trend(filtered).await?,
        top_tags: top_tags(filtered, game_tags).await?,
    })
}
