use datafusion::dataframe::DataFrame;
use datafusion::functions_window::expr_fn::row_number;
use datafusion::logical_expr::ExprFunctionExt;
use datafusion::prelude::{col, lit, Expr, JoinType};

use crate::catalog::DashboardTable;
use crate::error::DashboardError;

const PRICE_RANK: &str = "price_rank";

/// Reduces the price history to the cheapest row per game. Null prices sort
/// last; equal prices prefer the deeper discount.
pub fn lowest_prices(history: DataFrame) -> Result<DataFrame, DashboardError> {
    let price_rank = row_number()
        .partition_by(vec![col("itad_uuid")])
        .order_by(vec![
            col("regular_price").sort(true, false),
            col("percent").sort(false, false),
        ])
        .build()?
        .alias(PRICE_RANK);

    let lowest = history
        .window(vec![price_rank])?
        .filter(col(PRICE_RANK).eq(lit(1_u64)))?
        .select_columns(&["itad_uuid", "regular_price", "percent"])?;

    Ok(lowest)
}

/// Left-joins each game's lowest price onto the game table. Games without
/// price history keep null `regular_price` and `percent`.
pub fn join_lowest_prices(
    games: DataFrame,
    history: DataFrame,
) -> Result<DataFrame, DashboardError> {
    let prices = lowest_prices(history)?.select(vec![
        col("itad_uuid").alias("price_uuid"),
        col("regular_price").alias("regular_price"),
        col("percent").alias("percent"),
    ])?;

    let mut projection: Vec<Expr> = DashboardTable::GameInfo
        .columns()
        .iter()
        .map(|(name, _)| col(*name))
        .collect();
    projection.push(col("regular_price"));
    projection.push(col("percent"));

    let joined = games
        .join(prices, JoinType::Left, &["itad_uuid"], &["price_uuid"], None)?
        .select(projection)?;

    Ok(joined)
}
