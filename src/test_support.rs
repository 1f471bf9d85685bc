//! In-memory fixtures for unit tests.

use datafusion::arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::dataframe::DataFrame;
use datafusion::execution::context::SessionContext;
use std::sync::Arc;

use crate::loader::LoadedTables;

#[derive(Debug, Clone)]
pub struct GameFixture {
    pub uuid: String,
    pub title: String,
    pub rank: i64,
    pub score: Option<f64>,
    pub release_date: Option<String>,
    pub release_month: Option<i64>,
    pub release_year: Option<i64>,
    pub early_access: bool,
    pub mature: bool,
    pub achievements: bool,
    pub peak: i64,
}

pub fn game(uuid: &str) -> GameFixture {
    GameFixture {
        uuid: uuid.to_string(),
        title: format!("Game {}", uuid),
        rank: 1,
        score: Some(50.0),
        release_date: None,
        release_month: None,
        release_year: None,
        early_access: false,
        mature: false,
        achievements: false,
        peak: 0,
    }
}

impl GameFixture {
    pub fn rank(mut self, rank: i64) -> Self {
        self.rank = rank;
        self
    }

    pub fn score(mut self, score: i64) -> Self {
        self.score = Some(score as f64);
        self
    }

    pub fn release(mut self, year: i64, month: i64) -> Self {
        self.release_date = Some(format!("{:04}-{:02}-15", year, month));
        self.release_year = Some(year);
        self.release_month = Some(month);
        self
    }

    pub fn early_access(mut self, value: bool) -> Self {
        self.early_access = value;
        self
    }

    pub fn mature(mut self, value: bool) -> Self {
        self.mature = value;
        self
    }

    pub fn achievements(mut self, value: bool) -> Self {
        self.achievements = value;
        self
    }

    pub fn peak(mut self, peak: i64) -> Self {
        self.peak = peak;
        self
    }
}

#[derive(Debug, Clone)]
pub struct PriceFixture {
    pub uuid: String,
    pub regular_price: Option<f64>,
    pub percent: Option<f64>,
}

pub fn history(uuid: &str, regular_price: f64, percent: f64) -> PriceFixture {
    PriceFixture {
        uuid: uuid.to_string(),
        regular_price: Some(regular_price),
        percent: Some(percent),
    }
}

pub type TagFixture = (Option<String>, String);

pub fn tag(uuid: &str, tag: &str) -> TagFixture {
    (Some(uuid.to_string()), tag.to_string())
}

/// A tag row whose `itad_uuid` is null.
pub fn orphan_tag(tag: &str) -> TagFixture {
    (None, tag.to_string())
}

#[derive(Debug, Clone, Default)]
pub struct TableFixture {
    pub games: Vec<GameFixture>,
    pub prices: Vec<PriceFixture>,
    pub tags: Vec<TagFixture>,
    pub top_tags: Vec<TagFixture>,
}

impl TableFixture {
    pub async fn load(&self) -> LoadedTables {
        let ctx = SessionContext::new();
        LoadedTables::assemble(
            games_frame(&ctx, &self.games),
            prices_frame(&ctx, &self.prices),
            tags_frame(&ctx, &self.tags),
            tags_frame(&ctx, &self.top_tags),
        )
        .await
        .expect("fixture tables should assemble")
    }
}

fn games_frame(ctx: &SessionContext, games: &[GameFixture]) -> DataFrame {
    let strings = |f: fn(&GameFixture) -> Option<String>| -> ArrayRef {
        Arc::new(StringArray::from(games.iter().map(f).collect::<Vec<_>>()))
    };
    let ints = |f: fn(&GameFixture) -> Option<i64>| -> ArrayRef {
        Arc::new(Int64Array::from(games.iter().map(f).collect::<Vec<_>>()))
    };
    let bools = |f: fn(&GameFixture) -> bool| -> ArrayRef {
        Arc::new(BooleanArray::from(games.iter().map(f).collect::<Vec<_>>()))
    };

    let batch = RecordBatch::try_from_iter(vec![
        ("itad_uuid", strings(|g| Some(g.uuid.clone()))),
        ("title", strings(|g| Some(g.title.clone()))),
        ("rank", ints(|g| Some(g.rank))),
        (
            "steam_score",
            Arc::new(Float64Array::from(
                games.iter().map(|g| g.score).collect::<Vec<_>>(),
            )) as ArrayRef,
        ),
        ("release_date", strings(|g| g.release_date.clone())),
        ("release_month", ints(|g| g.release_month)),
        ("release_year", ints(|g| g.release_year)),
        ("early_access", bools(|g| g.early_access)),
        ("mature", bools(|g| g.mature)),
        ("achievements", bools(|g| g.achievements)),
        ("peak_player_count", ints(|g| Some(g.peak))),
    ])
    .expect("game fixture batch");

    ctx.read_batch(batch).expect("game fixture frame")
}

fn prices_frame(ctx: &SessionContext, prices: &[PriceFixture]) -> DataFrame {
    let batch = RecordBatch::try_from_iter(vec![
        (
            "itad_uuid",
            Arc::new(StringArray::from(
                prices.iter().map(|p| p.uuid.clone()).collect::<Vec<_>>(),
            )) as ArrayRef,
        ),
        (
            "regular_price",
            Arc::new(Float64Array::from(
                prices.iter().map(|p| p.regular_price).collect::<Vec<_>>(),
            )) as ArrayRef,
        ),
        (
            "percent",
            Arc::new(Float64Array::from(
                prices.iter().map(|p| p.percent).collect::<Vec<_>>(),
            )) as ArrayRef,
        ),
    ])
    .expect("price fixture batch");

    ctx.read_batch(batch).expect("price fixture frame")
}

fn tags_frame(ctx: &SessionContext, tags: &[TagFixture]) -> DataFrame {
    let batch = RecordBatch::try_from_iter(vec![
        (
            "itad_uuid",
            Arc::new(StringArray::from(
                tags.iter().map(|(uuid, _)| uuid.clone()).collect::<Vec<_>>(),
            )) as ArrayRef,
        ),
        (
            "tag",
            Arc::new(StringArray::from(
                tags.iter().map(|(_, tag)| tag.clone()).collect::<Vec<_>>(),
            )) as ArrayRef,
        ),
    ])
    .expect("tag fixture batch");

    ctx.read_batch(batch).expect("tag fixture frame")
}

/// Collects the `itad_uuid` column of a frame, sorted.
pub async fn uuids(df: DataFrame) -> Vec<String> {
    use datafusion::arrow::array::Array;
    use datafusion::common::cast::as_string_array;

    let batches = df
        .select_columns(&["itad_uuid"])
        .unwrap()
        .collect()
        .await
        .unwrap();
    let mut ids: Vec<String> = batches
        .iter()
        .flat_map(|batch| {
            let array = as_string_array(batch.column(0).as_ref()).unwrap();
            (0..array.len())
                .filter(|i| !array.is_null(*i))
                .map(|i| array.value(i).to_string())
                .collect::<Vec<_>>()
        })
        .collect();
    ids.sort();
    ids
}
