//! Behavior-driven tests for dataset assembly
//!
//! These tests verify how a user builds a dataset from symbols, ratios and
//! features, and what the assembled table looks like.

use std::collections::BTreeMap;
use std::sync::Arc;

use tempfile::tempdir;
use tickframe_core::{ColumnKey, SourceErrorKind, DERIVED_NAMESPACE};
use tickframe_tests::*;
use tickframe_warehouse::{StoreConfig, TableStore};

fn spy_qqq_provider() -> CountingProvider {
    CountingProvider::new()
        .with_closes("SPY", &[10.0, 12.0, 9.0, 15.0, 16.0])
        .with_closes("QQQ", &[5.0, 6.0, 3.0, 5.0, 4.0])
}

fn spy_qqq_dataset(provider: &CountingProvider) -> Dataset {
    let shared: Arc<dyn DataProvider> = Arc::new(provider.clone());
    Dataset::with_cache(Arc::new(MemoryCache::new()))
        .symbol("spy", close_symbol("SPY", shared.clone()))
        .expect("register spy")
        .symbol("qqq", close_symbol("QQQ", shared))
        .expect("register qqq")
        .ratio(
            "spy_qqq",
            Ratio::builder("spy_qqq")
                .numerator(SeriesRef::column("spy", "close"))
                .denominator(SeriesRef::column("qqq", "close"))
                .build()
                .expect("valid ratio"),
        )
        .expect("register ratio")
        .feature(
            "spy_sma3",
            Feature::simple_moving_average(SeriesRef::column("spy", "close")).with_window(3),
        )
        .expect("register feature")
}

// =============================================================================
// Dataset: Setup and Refresh
// =============================================================================

#[test]
fn when_dataset_is_set_up_on_disk_a_cache_file_appears_per_ticker() {
    // Given: A dataset configured with a fresh cache directory
    let temp = tempdir().expect("tempdir");
    let cache_dir = temp.path().join("cache");
    let options = BTreeMap::from([(
        "DATA_CACHE".to_string(),
        cache_dir.to_string_lossy().into_owned(),
    )]);
    let config = FrameConfig::from_mapping(&options).expect("valid options");
    let provider = spy_qqq_provider();
    let shared: Arc<dyn DataProvider> = Arc::new(provider.clone());
    let mut dataset = Dataset::new(&config)
        .expect("dataset opens")
        .symbol("spy", close_symbol("SPY", shared.clone()))
        .expect("register spy")
        .symbol("qqq", close_symbol("QQQ", shared))
        .expect("register qqq");

    // When: The dataset is set up twice
    dataset.setup().expect("first setup");
    dataset.setup().expect("second setup");

    // Then: Each ticker was fetched once and persisted in its own file
    assert_eq!(provider.calls(), 2);
    let store = TableStore::open(StoreConfig::new(cache_dir)).expect("store");
    assert_eq!(store.keys().expect("keys"), vec!["QQQ", "SPY"]);
}

#[test]
fn when_dataset_is_refreshed_every_column_is_fetched_again() {
    // Given: A dataset that is already set up
    let provider = spy_qqq_provider();
    let mut dataset = spy_qqq_dataset(&provider);
    dataset.setup().expect("setup");
    let after_setup = provider.calls();

    // When: The user refreshes it
    dataset.refresh().expect("refresh");

    // Then: Every symbol column hit the provider again
    assert_eq!(after_setup, 2);
    assert_eq!(provider.calls(), 4);
    assert!(dataset.series(&SeriesRef::feature("spy_sma3")).is_ok());
}

#[test]
fn when_provider_fails_setup_surfaces_the_fetch_error() {
    // Given: A symbol whose provider is rate limited
    let failing: Arc<dyn DataProvider> = Arc::new(FailingProvider {
        error: SourceError::rate_limited("5 calls per minute"),
    });
    let mut dataset = Dataset::with_cache(Arc::new(MemoryCache::new()))
        .symbol("spy", close_symbol("SPY", failing))
        .expect("register");

    // When: The dataset is set up
    let err = dataset.setup().expect_err("fetch must fail");

    // Then: The provider error is returned unchanged
    match err {
        FrameError::Fetch(source) => {
            assert_eq!(source.kind(), SourceErrorKind::RateLimited);
            assert!(source.retryable());
        }
        other => panic!("expected fetch error, got {other:?}"),
    }
}

#[test]
fn when_a_ticker_is_registered_twice_under_different_names_registration_fails() {
    // Given: A dataset that already holds SPY
    let provider: Arc<dyn DataProvider> = Arc::new(spy_qqq_provider());
    let dataset = Dataset::with_cache(Arc::new(MemoryCache::new()))
        .symbol("spy", close_symbol("SPY", provider.clone()))
        .expect("register spy");

    // When: SPY is registered again under another name
    let err = dataset
        .symbol("spy_again", close_symbol("SPY", provider))
        .expect_err("ticker taken");

    // Then: The clash is caught before any table is built
    assert_eq!(err.kind(), FrameErrorKind::Configuration);
    assert!(err.to_string().contains("'spy'"));
}

#[test]
fn when_table_is_requested_before_setup_it_is_not_ready() {
    let provider = spy_qqq_provider();
    let dataset = spy_qqq_dataset(&provider);

    let err = dataset.to_table(None).expect_err("not set up");

    assert_eq!(err.kind(), FrameErrorKind::NotReady);
    assert_eq!(provider.calls(), 0);
}

#[test]
fn when_a_windowed_feature_is_registered_without_window_registration_fails() {
    let err = Dataset::with_cache(Arc::new(MemoryCache::new()))
        .feature("vol", Feature::realised_volatility(SeriesRef::column("spy", "close")))
        .expect_err("window required");

    assert_eq!(err.kind(), FrameErrorKind::Configuration);
}

// =============================================================================
// Dataset: Table Assembly
// =============================================================================

#[test]
fn when_table_is_assembled_symbols_come_first_then_ratios_then_features() {
    // Given: A set-up dataset
    let provider = spy_qqq_provider();
    let mut dataset = spy_qqq_dataset(&provider);
    dataset.setup().expect("setup");

    // When: The full table is assembled
    let table = dataset.to_table(None).expect("table");

    // Then: Columns follow registration order within each group
    let keys: Vec<String> = table.keys().map(ToString::to_string).collect();
    assert_eq!(
        keys,
        ["SPY:close", "QQQ:close", "derived:spy_qqq", "derived:spy_sma3"]
    );
    assert_eq!(table.len(), 5);
    assert_eq!(dataset.start_date().expect("ready"), Some(utc_day(0)));
    assert_eq!(dataset.end_date().expect("ready"), Some(utc_day(4)));
}

#[test]
fn when_ratio_is_assembled_it_equals_numerator_over_denominator() {
    let provider = spy_qqq_provider();
    let mut dataset = spy_qqq_dataset(&provider);
    dataset.setup().expect("setup");

    let ratio = dataset.series(&SeriesRef::ratio("spy_qqq")).expect("ready");

    assert_values(ratio.values(), &[2.0, 2.0, 3.0, 3.0, 4.0]);
}

#[test]
fn when_table_is_taken_as_of_a_day_no_later_rows_leak() {
    // Given: A set-up dataset and its unshifted table
    let provider = spy_qqq_provider();
    let mut dataset = spy_qqq_dataset(&provider);
    dataset.setup().expect("setup");
    let full = dataset.to_table(None).expect("table");
    let as_of = utc_day(2);

    // When: The table is requested as of the third day
    let table = dataset.to_table(Some(as_of)).expect("table");

    // Then: No row is after the cut-off and the last row holds the previous day's data
    assert!(table.index().iter().all(|ts| *ts <= as_of));
    assert_eq!(table.end(), Some(as_of));
    assert_values(
        &table.row(as_of).expect("row"),
        &full.row(utc_day(1)).expect("row"),
    );
    assert!(table
        .row(utc_day(0))
        .expect("row")
        .iter()
        .all(|value| value.is_nan()));
}

#[test]
fn when_symbol_is_missing_a_day_derived_columns_keep_the_union_index() {
    // Given: QQQ has one fewer day of history than SPY
    let provider = CountingProvider::new()
        .with_closes("SPY", &[10.0, 12.0, 9.0])
        .with_closes("QQQ", &[5.0, 6.0]);
    let mut dataset = spy_qqq_dataset(&provider);
    dataset.setup().expect("setup");

    // When: The table is assembled
    let table = dataset.to_table(None).expect("table");

    // Then: The ratio is undefined where QQQ has no data
    let key = ColumnKey::new(DERIVED_NAMESPACE, "spy_qqq");
    assert_eq!(table.len(), 3);
    assert!(table.value(utc_day(2), &key).expect("cell").is_nan());
    assert!(table
        .value(utc_day(2), &ColumnKey::new("QQQ", "close"))
        .expect("cell")
        .is_nan());
}
