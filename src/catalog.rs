use datafusion::arrow::datatypes::DataType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DataFormat {
    #[serde(rename = "csv")]
    Csv,
    #[serde(rename = "parquet")]
    Parquet,
}

impl DataFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataFormat::Csv => "csv",
            DataFormat::Parquet => "parquet",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "csv" => Some(DataFormat::Csv),
            "parquet" => Some(DataFormat::Parquet),
            _ => None,
        }
    }
}

impl std::fmt::Display for DataFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The four input tables the dashboard is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DashboardTable {
    GameInfo,
    GameHistory,
    GameTags,
    TopGameTags,
}

impl DashboardTable {
    pub const ALL: [DashboardTable; 4] = [
        DashboardTable::GameInfo,
        DashboardTable::GameHistory,
        DashboardTable::GameTags,
        DashboardTable::TopGameTags,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DashboardTable::GameInfo => "game_info",
            DashboardTable::GameHistory => "game_history",
            DashboardTable::GameTags => "game_tags",
            DashboardTable::TopGameTags => "game_tags_15",
        }
    }

    /// Canonical columns and the types every loaded table is cast to.
    pub fn columns(&self) -> &'static [(&'static str, DataType)] {
        match self {
            DashboardTable::GameInfo => GAME_INFO_COLUMNS,
            DashboardTable::GameHistory => GAME_HISTORY_COLUMNS,
            DashboardTable::GameTags | DashboardTable::TopGameTags => GAME_TAG_COLUMNS,
        }
    }

    pub fn file_path(&self, location: &str, format: DataFormat) -> String {
        format!(
            "{}/{}.{}",
            location.trim_end_matches('/'),
            self.name(),
            format.as_str()
        )
    }
}

impl std::fmt::Display for DashboardTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

const GAME_INFO_COLUMNS: &[(&str, DataType)] = &[
    ("itad_uuid", DataType::Utf8),
    ("title", DataType::Utf8),
    ("rank", DataType::Int64),
    ("steam_score", DataType::Float64),
    ("release_date", DataType::Date32),
    ("release_month", DataType::Int64),
    ("release_year", DataType::Int64),
    ("early_access", DataType::Boolean),
    ("mature", DataType::Boolean),
    ("achievements", DataType::Boolean),
    ("peak_player_count", DataType::Int64),
];

const GAME_HISTORY_COLUMNS: &[(&str, DataType)] = &[
    ("itad_uuid", DataType::Utf8),
    ("regular_price", DataType::Float64),
    ("percent", DataType::Float64),
];

const GAME_TAG_COLUMNS: &[(&str, DataType)] =
    &[("itad_uuid", DataType::Utf8), ("tag", DataType::Utf8)];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_paths_use_table_name_and_format_extension() {
        assert_eq!(
            DashboardTable::TopGameTags.file_path("../data/", DataFormat::Parquet),
            "../data/game_tags_15.parquet"
        );
        assert_eq!(
            DashboardTable::GameHistory.file_path("gs://bucket/steam", DataFormat::Csv),
            "gs://bucket/steam/game_history.csv"
        );
    }

    #[test]
    fn data_format_parsing_is_case_insensitive() {
        assert_eq!(DataFormat::parse(" Parquet "), Some(DataFormat::Parquet));
        assert_eq!(DataFormat::parse("CSV"), Some(DataFormat::Csv));
        assert_eq!(DataFormat::parse("json"), None);
    }
}
