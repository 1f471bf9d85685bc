use std::path::Path;
use std::sync::Once;

use steam_dashboard::catalog::DataFormat;
use steam_dashboard::filters::{MonthFilter, TriState};
use steam_dashboard::{DashboardConfig, DashboardEngine, DashboardError, GameFilters};

static INIT: Once = Once::new();

fn init_test_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .init();
    });
}

/// Writes `<table>.csv`; each line is a comma-separated record, header first.
fn write_csv(dir: &Path, table: &str, lines: &[&str]) {
    let mut writer = csv::Writer::from_path(dir.join(format!("{}.csv", table))).unwrap();
    for line in lines {
        writer.write_record(line.split(',')).unwrap();
    }
    writer.flush().unwrap();
}

/// Games A (score 50, $10, January), B (80, $20, June, early access) and
/// C (90, $30, June, early access), with some extra price history.
fn write_scenario(dir: &Path) {
    write_csv(
        dir,
        "game_info",
        &[
            "itad_uuid,title,rank,steam_score,release_date,release_month,release_year,\
             early_access,mature,achievements,peak_player_count",
            "uuid-a,Alpha,1,50,2021-01-10,1,2021,false,false,true,1200",
            "uuid-b,Bravo,2,80,2022-06-03,6,2022,true,false,false,3400",
            "uuid-c,Charlie,3,90,2022-06-21,6,2022,true,true,true,56000",
        ],
    );
    write_csv(
        dir,
        "game_history",
        &[
            "itad_uuid,regular_price,percent",
            "uuid-a,10.0,0.0",
            "uuid-a,14.99,0.0",
            "uuid-b,20.0,40.0",
            "uuid-c,30.0,20.0",
            "uuid-c,39.99,0.0",
        ],
    );
    let tags = [
        "itad_uuid,tag",
        "uuid-a,Indie",
        "uuid-b,Action",
        "uuid-c,Action",
        "uuid-c,RPG",
    ];
    write_csv(dir, "game_tags", &tags);
    write_csv(dir, "game_tags_15", &tags);
}

fn csv_engine(dir: &Path) -> DashboardEngine {
    let config = DashboardConfig {
        data_location: dir.to_string_lossy().to_string(),
        data_format: DataFormat::Csv,
        ..Default::default()
    };
    DashboardEngine::new(&config)
}

#[tokio::test]
async fn test_june_releases_scenario_from_csv_files() {
    init_test_logging();

    // Given: the three-game catalog written to disk as CSV
    let dir = tempfile::tempdir().unwrap();
    write_scenario(dir.path());
    let engine = csv_engine(dir.path());
    engine.warm_up().await.expect("tables should load");

    // When: filtering to June releases
    let filters = GameFilters {
        months: MonthFilter::from_labels(&["06 - June"]),
        ..Default::default()
    };
    let rows = engine.game_rows(&filters).await.unwrap();
    let summary = engine.dashboard(&filters).await.unwrap();

    // Then: exactly B and C remain
    let ids: Vec<&str> = rows.iter().map(|r| r.itad_uuid.as_str()).collect();
    assert_eq!(ids, vec!["uuid-b", "uuid-c"]);

    // And: the metrics reflect only B and C
    assert_eq!(summary.metrics.game_count, 2);
    assert_eq!(summary.metrics.median_score, Some(85.0));
    assert_eq!(summary.metrics.median_price, Some(25.0));
    assert_eq!(summary.metrics.average_discount, Some(30.0));
    assert_eq!(summary.metrics.total_peak_players, 59400);

    let cards = summary.metrics.cards();
    let values: Vec<&str> = cards.iter().map(|c| c.value.as_str()).collect();
    assert_eq!(values, vec!["85", "$25.00", "30%", "29,700", "59,400", "2"]);

    // And: the release trend only has the 2022 early access bar
    assert_eq!(summary.release_trend.len(), 1);
    assert_eq!(summary.release_trend[0].release_year, 2022);
    assert_eq!(summary.release_trend[0].early_access, Some(true));
    assert_eq!(summary.release_trend[0].count, 2);
}

#[tokio::test]
async fn test_filters_that_exclude_everything_degrade_gracefully() {
    init_test_logging();

    // Given
    let dir = tempfile::tempdir().unwrap();
    write_scenario(dir.path());
    let engine = csv_engine(dir.path());

    // When: no January game is in early access
    let filters = GameFilters {
        months: MonthFilter::from_labels(&["January"]),
        early_access: TriState::Yes,
        ..Default::default()
    };
    let summary = engine.dashboard(&filters).await.unwrap();

    // Then
    assert_eq!(summary.metrics.game_count, 0);
    assert_eq!(summary.metrics.median_score, None);
    assert_eq!(summary.metrics.average_discount, None);
    assert_eq!(summary.metrics.total_peak_players, 0);
    assert!(summary.top_tags.is_empty());

    // And: the serialized summary exposes the undefined metrics as nulls
    let json = serde_json::to_value(&summary).unwrap();
    assert!(json["metrics"]["median_price"].is_null());
    assert_eq!(json["metrics"]["game_count"], 0);
    assert_eq!(json["price_histogram"], serde_json::json!([]));
}

#[tokio::test]
async fn test_missing_input_file_is_fatal() {
    init_test_logging();

    // Given: every table except the top-15 tag list
    let dir = tempfile::tempdir().unwrap();
    write_scenario(dir.path());
    std::fs::remove_file(dir.path().join("game_tags_15.csv")).unwrap();
    let engine = csv_engine(dir.path());

    // When
    let result = engine.warm_up().await;

    // Then
    assert!(
        matches!(result, Err(DashboardError::TableLoad { .. })),
        "{:?}",
        result.err()
    );
}
