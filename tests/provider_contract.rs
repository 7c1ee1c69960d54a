//! Contract tests for the Alpha Vantage provider
//!
//! Every test runs offline against a canned HTTP response.

use std::sync::Arc;

use tickframe_core::{
    AlphaVantageProvider, ColumnKey, HttpError, HttpResponse, MemoryCache, ProviderId,
    SourceErrorKind, StaticHttpClient,
};
use tickframe_tests::*;

const DAILY_ADJUSTED: &str = r#"{
    "Meta Data": {
        "1. Information": "Daily Time Series with Splits and Dividend Events",
        "2. Symbol": "IBM"
    },
    "Time Series (Daily)": {
        "2024-01-04": {
            "1. open": "160.76", "2. high": "161.37", "3. low": "159.90",
            "4. close": "160.10", "5. adjusted close": "154.21", "6. volume": "4555600",
            "7. dividend amount": "0.0000", "8. split coefficient": "1.0"
        },
        "2024-01-03": {
            "1. open": "160.00", "2. high": "160.59", "3. low": "159.15",
            "4. close": "160.00", "5. adjusted close": "154.11", "6. volume": "3695400",
            "7. dividend amount": "0.0000", "8. split coefficient": "1.0"
        },
        "2024-01-02": {
            "1. open": "162.83", "2. high": "163.29", "3. low": "160.62",
            "4. close": "161.50", "5. adjusted close": "155.55", "6. volume": "4009800",
            "7. dividend amount": "0.0000", "8. split coefficient": "1.0"
        }
    }
}"#;

fn provider(client: StaticHttpClient) -> Arc<AlphaVantageProvider> {
    Arc::new(AlphaVantageProvider::with_http_client(Arc::new(client), "test-key"))
}

fn ibm() -> Ticker {
    Ticker::parse("IBM").expect("valid ticker")
}

#[test]
fn when_daily_history_is_fetched_fields_are_normalized_and_sorted() {
    // Given: A canned daily adjusted payload, newest day first
    let client = StaticHttpClient::new(HttpResponse::ok_json(DAILY_ADJUSTED));
    let column = Column::new("adjusted_close", provider(client));

    // When: The column fetches the ticker
    let table = column.fetch(&ibm()).expect("fetch");

    // Then: Every provider field has its canonical name and rows ascend
    let fields: Vec<&str> = table.keys().map(|key| key.field.as_str()).collect();
    assert_eq!(
        fields,
        [
            "adjusted_close",
            "close",
            "dividend_amount",
            "high",
            "low",
            "open",
            "split_coefficient",
            "volume"
        ]
    );
    assert_eq!(table.index(), &[utc_day(0), utc_day(1), utc_day(2)]);
    assert_eq!(
        table.value(utc_day(0), &ColumnKey::new("IBM", "adjusted_close")),
        Some(155.55)
    );
}

#[test]
fn when_column_is_set_up_its_series_is_named_by_the_selected_field() {
    let client = StaticHttpClient::new(HttpResponse::ok_json(DAILY_ADJUSTED));
    let mut column = Column::new("volume", provider(client.clone()));

    column.setup(&ibm(), &MemoryCache::new()).expect("setup");

    let series = column.get_series().expect("ready");
    assert_eq!(series.name(), "volume");
    assert_values(series.values(), &[4_009_800.0, 3_695_400.0, 4_555_600.0]);
    assert_eq!(client.requests().len(), 1);
    assert_eq!(column.provider_id(), ProviderId::ALPHAVANTAGE);
}

#[test]
fn when_provider_is_throttled_the_column_reports_a_retryable_fetch_error() {
    // Given: The provider answers with its call-frequency note
    let client = StaticHttpClient::new(HttpResponse::ok_json(
        r#"{"Note": "Our standard API call frequency is 5 calls per minute."}"#,
    ));
    let mut column = Column::new("close", provider(client.clone()));

    // When: The column is set up
    let err = column.setup(&ibm(), &MemoryCache::new()).expect_err("throttled");

    // Then: One request was made and the rate limit surfaces without retry
    assert_eq!(client.requests().len(), 1);
    match err {
        FrameError::Fetch(source) => {
            assert_eq!(source.kind(), SourceErrorKind::RateLimited);
            assert_eq!(source.code(), "source.rate_limited");
        }
        other => panic!("expected fetch error, got {other:?}"),
    }
}

#[test]
fn when_transport_fails_the_error_is_unavailable() {
    let client = StaticHttpClient::failing(HttpError::new("dns failure"));
    let column = Column::new("close", provider(client));

    let err = column.fetch(&ibm()).expect_err("transport failure");

    assert_eq!(err.kind(), FrameErrorKind::Fetch);
    assert!(err.to_string().contains("dns failure"));
}

#[test]
fn when_selected_field_is_absent_setup_fails_with_configuration() {
    let client = StaticHttpClient::new(HttpResponse::ok_json(DAILY_ADJUSTED));
    let mut column = Column::new("vwap", provider(client));

    let err = column.setup(&ibm(), &MemoryCache::new()).expect_err("no vwap");

    assert_eq!(err.kind(), FrameErrorKind::Configuration);
}
