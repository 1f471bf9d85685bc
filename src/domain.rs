use chrono::NaiveDate;
use serde::Serialize;

use crate::filters::{
    GameFilters, MonthFilter, ScoreRange, TagFilter, TagMatch, TriState, MONTH_LABELS, SCORE_MAX,
    SCORE_MIN, TAG_MATCH_LABELS, TRI_STATE_LABELS,
};
use crate::format;
use crate::proto::dashboard;

pub const CHART_HEIGHT: i32 = 320;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardMetrics {
    pub median_score: Option<f64>,
    pub median_price: Option<f64>,
    /// Mean of the positive discounts; `None` when no game is discounted.
    pub average_discount: Option<f64>,
    pub median_peak_players: Option<f64>,
    pub total_peak_players: i64,
    pub game_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricCard {
    pub label: String,
    pub value: String,
    pub has_data: bool,
}

impl MetricCard {
    fn new(label: &str, value: String, has_data: bool) -> Self {
        Self {
            label: label.to_string(),
            value,
            has_data,
        }
    }
}

impl DashboardMetrics {
    pub fn cards(&self) -> Vec<MetricCard> {
        vec![
            MetricCard::new(
                "Median Steam Score",
                format::score(self.median_score),
                self.median_score.is_some(),
            ),
            MetricCard::new(
                "Median Price",
                format::currency(self.median_price),
                self.median_price.is_some(),
            ),
            MetricCard::new(
                "Average Sale Percent",
                format::percent(self.average_discount),
                self.average_discount.is_some(),
            ),
            MetricCard::new(
                "Median Peak Players",
                format::players(self.median_peak_players),
                self.median_peak_players.is_some(),
            ),
            MetricCard::new(
                "Total Peak Players",
                format::thousands(self.total_peak_players),
                true,
            ),
            MetricCard::new("Number of Games", self.game_count.to_string(), true),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReleaseCount {
    pub release_year: i64,
    pub early_access: Option<bool>,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBin {
    pub bin_start: f64,
    pub bin_end: f64,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyScore {
    pub release_year: i64,
    pub mean_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagPopularity {
    pub tag: String,
    pub median_peak_players: f64,
    pub game_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: &'static str,
    pub x_title: &'static str,
    pub y_title: &'static str,
    pub height: i32,
    pub y_domain: Option<(f64, f64)>,
}

impl ChartSpec {
    pub fn release_trend() -> Self {
        Self {
            title: "Game Releases per Year",
            x_title: "Release Year",
            y_title: "Count",
            height: CHART_HEIGHT,
            y_domain: None,
        }
    }

    pub fn price_histogram() -> Self {
        Self {
            title: "Price",
            x_title: "Price",
            y_title: "Count",
            height: CHART_HEIGHT,
            y_domain: None,
        }
    }

    pub fn score_trend() -> Self {
        Self {
            title: "Average Score over Time",
            x_title: "Release Year",
            y_title: "Average Steam Score",
            height: CHART_HEIGHT,
            y_domain: Some((SCORE_MIN as f64, SCORE_MAX as f64)),
        }
    }

    pub fn top_tags() -> Self {
        Self {
            title: "Top 10 Tags",
            x_title: "Median Peak Players",
            y_title: "Tags",
            height: CHART_HEIGHT,
            y_domain: None,
        }
    }
}

/// Everything the main dashboard area shows for one filter state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub metrics: DashboardMetrics,
    pub release_trend: Vec<ReleaseCount>,
    pub price_histogram: Vec<PriceBin>,
    pub score_trend: Vec<YearlyScore>,
    pub top_tags: Vec<TagPopularity>,
}

/// One row of the filtered-games table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameRow {
    pub itad_uuid: String,
    pub rank: Option<i64>,
    pub title: String,
    pub steam_score: Option<f64>,
    pub regular_price: Option<f64>,
    pub peak_player_count: Option<i64>,
    pub release_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub tags: Vec<String>,
}

impl From<&dashboard::FilterControls> for GameFilters {
    fn from(controls: &dashboard::FilterControls) -> Self {
        Self {
            tags: TagFilter::from_selection(
                &controls.tags,
                TagMatch::from_label(&controls.tag_match),
            ),
            months: MonthFilter::from_labels(&controls.release_months),
            score: ScoreRange::new(controls.score_low, controls.score_high),
            early_access: TriState::from_label(&controls.early_access),
            mature: TriState::from_label(&controls.mature),
            achievements: TriState::from_label(&controls.achievements),
        }
    }
}

impl From<FilterOptions> for dashboard::FilterOptions {
    fn from(domain: FilterOptions) -> Self {
        Self {
            tags: domain.tags,
            tag_match_modes: TAG_MATCH_LABELS.iter().map(|s| s.to_string()).collect(),
            release_months: MONTH_LABELS.iter().map(|s| s.to_string()).collect(),
            score_min: SCORE_MIN as i32,
            score_max: SCORE_MAX as i32,
            tri_state_options: TRI_STATE_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl From<ChartSpec> for dashboard::ChartSpec {
    fn from(domain: ChartSpec) -> Self {
        Self {
            title: domain.title.to_string(),
            x_title: domain.x_title.to_string(),
            y_title: domain.y_title.to_string(),
            height: domain.height,
            y_domain_min: domain.y_domain.map(|(min, _)| min),
            y_domain_max: domain.y_domain.map(|(_, max)| max),
        }
    }
}

impl From<MetricCard> for dashboard::MetricCard {
    fn from(domain: MetricCard) -> Self {
        Self {
            label: domain.label,
            value: domain.value,
            has_data: domain.has_data,
        }
    }
}

impl From<DashboardMetrics> for dashboard::Metrics {
    fn from(domain: DashboardMetrics) -> Self {
        Self {
            median_score: domain.median_score,
            median_price: domain.median_price,
            average_discount: domain.average_discount,
            median_peak_players: domain.median_peak_players,
            total_peak_players: domain.total_peak_players,
            game_count: domain.game_count as i64,
        }
    }
}

impl From<ReleaseCount> for dashboard::ReleaseCount {
    fn from(domain: ReleaseCount) -> Self {
        Self {
            release_year: domain.release_year,
            early_access: domain.early_access,
            count: domain.count,
        }
    }
}

impl From<PriceBin> for dashboard::PriceBin {
    fn from(domain: PriceBin) -> Self {
        Self {
            bin_start: domain.bin_start,
            bin_end: domain.bin_end,
            count: domain.count,
        }
    }
}

impl From<YearlyScore> for dashboard::YearlyScore {
    fn from(domain: YearlyScore) -> Self {
        Self {
            release_year: domain.release_year,
            mean_score: domain.mean_score,
        }
    }
}

impl From<TagPopularity> for dashboard::TagPopularity {
    fn from(domain: TagPopularity) -> Self {
        Self {
            tag: domain.tag,
            median_peak_players: domain.median_peak_players,
            game_count: domain.game_count,
        }
    }
}

impl From<DashboardSummary> for dashboard::DashboardResponse {
    fn from(domain: DashboardSummary) -> Self {
        let cards = domain.metrics.cards().into_iter().map(|c| c.into()).collect();

        Self {
            metrics: Some(domain.metrics.into()),
            cards,
            release_trend: Some(dashboard::ReleaseTrendChart {
                spec: Some(ChartSpec::release_trend().into()),
                points: domain.release_trend.into_iter().map(|p| p.into()).collect(),
            }),
            price_histogram: Some(dashboard::PriceHistogramChart {
                spec: Some(ChartSpec::price_histogram().into()),
                bins: domain.price_histogram.into_iter().map(|b| b.into()).collect(),
            }),
            score_trend: Some(dashboard::ScoreTrendChart {
                spec: Some(ChartSpec::score_trend().into()),
                points: domain.score_trend.into_iter().map(|p| p.into()).collect(),
            }),
            top_tags: Some(dashboard::TopTagsChart {
                spec: Some(ChartSpec::top_tags().into()),
                tags: domain.top_tags.into_iter().map(|t| t.into()).collect(),
            }),
        }
    }
}

impl From<GameRow> for dashboard::GameRow {
    fn from(domain: GameRow) -> Self {
        Self {
            itad_uuid: domain.itad_uuid,
            rank: domain.rank,
            title: domain.title,
            steam_score: domain.steam_score,
            regular_price: domain.regular_price,
            peak_player_count: domain.peak_player_count,
            release_date: domain
                .release_date
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        }
    }
}
