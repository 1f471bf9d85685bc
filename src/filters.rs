use datafusion::dataframe::DataFrame;
use datafusion::functions_aggregate::expr_fn::count_distinct;
use datafusion::prelude::{col, lit, Expr, JoinType};
use std::collections::BTreeSet;
use tracing::debug;

use crate::error::DashboardError;

pub const MONTH_LABELS: [&str; 12] = [
    "01 - January",
    "02 - February",
    "03 - March",
    "04 - April",
    "05 - May",
    "06 - June",
    "07 - July",
    "08 - August",
    "09 - September",
    "10 - October",
    "11 - November",
    "12 - December",
];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub const SCORE_MIN: u8 = 0;
pub const SCORE_MAX: u8 = 100;
pub const TRI_STATE_LABELS: [&str; 3] = ["All", "Yes", "No"];
pub const TAG_MATCH_LABELS: [&str; 2] = ["any", "all"];

const MATCH_UUID: &str = "match_uuid";

/// Accepts `06 - June`, `June`, `jun` or `6`.
pub fn parse_month(label: &str) -> Option<u32> {
    let label = label.trim();
    let (number, name) = match label.split_once(" - ") {
        Some((number, name)) => (Some(number.trim()), name.trim()),
        None => (None, label),
    };

    let by_name = MONTH_NAMES.iter().position(|month| {
        month.eq_ignore_ascii_case(name)
            || (name.len() == 3 && month[..3].eq_ignore_ascii_case(name))
    });
    if let Some(index) = by_name {
        return Some(index as u32 + 1);
    }

    number
        .unwrap_or(label)
        .parse::<u32>()
        .ok()
        .filter(|month| (1..=12).contains(month))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagMatch {
    #[default]
    Any,
    Every,
}

impl TagMatch {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "all" | "every" => TagMatch::Every,
            _ => TagMatch::Any,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TagFilter {
    #[default]
    All,
    Matching { tags: BTreeSet<String>, mode: TagMatch },
}

impl TagFilter {
    pub fn from_selection<S: AsRef<str>>(tags: &[S], mode: TagMatch) -> Self {
        let tags: BTreeSet<String> = tags
            .iter()
            .map(|tag| tag.as_ref().trim())
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect();

        if tags.is_empty() {
            TagFilter::All
        } else {
            TagFilter::Matching { tags, mode }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MonthFilter {
    #[default]
    All,
    Months(BTreeSet<u32>),
}

impl MonthFilter {
    /// Unrecognized labels are ignored; nothing recognized means no filter.
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Self {
        let months: BTreeSet<u32> = labels
            .iter()
            .filter_map(|label| parse_month(label.as_ref()))
            .collect();

        if months.is_empty() {
            MonthFilter::All
        } else {
            MonthFilter::Months(months)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreRange {
    #[default]
    Full,
    Between { low: u8, high: u8 },
}

impl ScoreRange {
    /// Clamps both ends to the slider bounds and swaps reversed ends.
    pub fn new(low: Option<i32>, high: Option<i32>) -> Self {
        let clamp = |value: i32| value.clamp(SCORE_MIN as i32, SCORE_MAX as i32) as u8;
        let low = low.map(clamp).unwrap_or(SCORE_MIN);
        let high = high.map(clamp).unwrap_or(SCORE_MAX);
        let (low, high) = if low <= high { (low, high) } else { (high, low) };

        if low == SCORE_MIN && high == SCORE_MAX {
            ScoreRange::Full
        } else {
            ScoreRange::Between { low, high }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriState {
    #[default]
    All,
    Yes,
    No,
}

impl TriState {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "yes" | "true" => TriState::Yes,
            "no" | "false" => TriState::No,
            _ => TriState::All,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagColumn {
    EarlyAccess,
    Mature,
    Achievements,
}

impl FlagColumn {
    pub fn name(&self) -> &'static str {
        match self {
            FlagColumn::EarlyAccess => "early_access",
            FlagColumn::Mature => "mature",
            FlagColumn::Achievements => "achievements",
        }
    }
}

/// A single active filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterStep {
    Tags { tags: BTreeSet<String>, mode: TagMatch },
    Months(BTreeSet<u32>),
    Score { low: u8, high: u8 },
    Flag { column: FlagColumn, wanted: bool },
}

impl FilterStep {
    fn apply(&self, games: DataFrame, top_tags: &DataFrame) -> Result<DataFrame, DashboardError> {
        let filtered = match self {
            FilterStep::Tags { tags, mode } => {
                let matches = matching_games(top_tags, tags, *mode)?;
                games.join(matches, JoinType::LeftSemi, &["itad_uuid"], &[MATCH_UUID], None)?
            }
            FilterStep::Months(months) => {
                let months: Vec<Expr> = months.iter().map(|m| lit(*m as i64)).collect();
                games.filter(col("release_month").in_list(months, false))?
            }
            FilterStep::Score { low, high } => games.filter(
                col("steam_score").between(lit(*low as f64), lit(*high as f64)),
            )?,
            FilterStep::Flag { column, wanted } => {
                games.filter(col(column.name()).eq(lit(*wanted)))?
            }
        };
        Ok(filtered)
    }
}

/// Distinct non-null uuids from the tag widget table matching the selection.
fn matching_games(
    top_tags: &DataFrame,
    tags: &BTreeSet<String>,
    mode: TagMatch,
) -> Result<DataFrame, DashboardError> {
    let selected: Vec<Expr> = tags.iter().map(|tag| lit(tag.as_str())).collect();
    let matched = top_tags
        .clone()
        .filter(col("tag").in_list(selected, false))?
        .filter(col("itad_uuid").is_not_null())?;

    let ids = match mode {
        TagMatch::Any => matched
            .select(vec![col("itad_uuid").alias(MATCH_UUID)])?
            .distinct()?,
        TagMatch::Every => matched
            .aggregate(
                vec![col("itad_uuid")],
                vec![count_distinct(col("tag")).alias("matched_tags")],
            )?
            .filter(col("matched_tags").eq(lit(tags.len() as i64)))?
            .select(vec![col("itad_uuid").alias(MATCH_UUID)])?,
    };
    Ok(ids)
}

/// Every sidebar control, each with an explicit pass-through state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GameFilters {
    pub tags: TagFilter,
    pub months: MonthFilter,
    pub score: ScoreRange,
    pub early_access: TriState,
    pub mature: TriState,
    pub achievements: TriState,
}

impl GameFilters {
    /// Active filters in application order: tag, month, score, then flags.
    pub fn steps(&self) -> Vec<FilterStep> {
        let mut steps = Vec::new();

        if let TagFilter::Matching { tags, mode } = &self.tags {
            steps.push(FilterStep::Tags {
                tags: tags.clone(),
                mode: *mode,
            });
        }
        if let MonthFilter::Months(months) = &self.months {
            steps.push(FilterStep::Months(months.clone()));
        }
        if let ScoreRange::Between { low, high } = self.score {
            steps.push(FilterStep::Score { low, high });
        }

        let flags = [
            (FlagColumn::EarlyAccess, self.early_access),
            (FlagColumn::Mature, self.mature),
            (FlagColumn::Achievements, self.achievements),
        ];
        for (column, state) in flags {
            match state {
                TriState::All => {}
                TriState::Yes => steps.push(FilterStep::Flag {
                    column,
                    wanted: true,
                }),
                TriState::No => steps.push(FilterStep::Flag {
                    column,
                    wanted: false,
                }),
            }
        }

        steps
    }

    pub fn is_pass_through(&self) -> bool {
        self.steps().is_empty()
    }

    pub fn apply(
        &self,
        games: DataFrame,
        top_tags: &DataFrame,
    ) -> Result<DataFrame, DashboardError> {
        apply_steps(games, top_tags, &self.steps())
    }
}

pub fn apply_steps(
    games: DataFrame,
    top_tags: &DataFrame,
    steps: &[FilterStep],
) -> Result<DataFrame, DashboardError> {
    steps.iter().try_fold(games, |filtered, step| {
        debug!("Applying filter {:?}", step);
        step.apply(filtered, top_tags)
    })
}
