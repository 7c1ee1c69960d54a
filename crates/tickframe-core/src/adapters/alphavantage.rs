use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::Value;
use time::macros::format_description;
use time::{Date, PrimitiveDateTime, Time};

use crate::data_source::{DataProvider, ProviderId, RawRow, RawTable, SourceError};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::Ticker;

const BASE_URL: &str = "https://www.alphavantage.co/query";
const API_KEY_ENV: &str = "ALPHAVANTAGE_API_KEY";

/// Alpha Vantage daily adjusted history provider.
///
/// Field names are returned as Alpha Vantage spells them (`1. open`,
/// `5. adjusted close`, ...).
#[derive(Clone)]
pub struct AlphaVantageProvider {
    http_client: Arc<dyn HttpClient>,
    api_key: String,
    base_url: String,
    timeout_ms: u64,
}

impl Default for AlphaVantageProvider {
    fn default() -> Self {
        Self::with_http_client(
            Arc::new(ReqwestHttpClient::default()),
            std::env::var(API_KEY_ENV).unwrap_or_else(|_| String::from("demo")),
        )
    }
}

impl AlphaVantageProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::default()), api_key)
    }

    pub fn with_http_client(http_client: Arc<dyn HttpClient>, api_key: impl Into<String>) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
            base_url: String::from(BASE_URL),
            timeout_ms: 30_000,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    fn endpoint(&self, ticker: &Ticker) -> String {
        format!(
            "{}?function=TIME_SERIES_DAILY_ADJUSTED&outputsize=full&symbol={}&apikey={}",
            self.base_url,
            urlencoding::encode(ticker.as_str()),
            urlencoding::encode(&self.api_key)
        )
    }
}

impl DataProvider for AlphaVantageProvider {
    fn id(&self) -> ProviderId {
        ProviderId::ALPHAVANTAGE
    }

    fn fetch(&self, ticker: &Ticker) -> Result<RawTable, SourceError> {
        let request = HttpRequest::get(self.endpoint(ticker)).with_timeout_ms(self.timeout_ms);
        let response = self.http_client.execute(request).map_err(|e| {
            SourceError::unavailable(format!("alphavantage transport error: {}", e.message()))
        })?;

        if !response.is_success() {
            return Err(SourceError::unavailable(format!(
                "alphavantage returned status {}",
                response.status
            )));
        }

        let table = parse_daily_adjusted(&response.body)?;
        tracing::debug!(%ticker, rows = table.len(), "parsed alphavantage daily history");
        Ok(table)
    }
}

/// Parse a `TIME_SERIES_DAILY_ADJUSTED` payload into raw rows, newest first
/// as Alpha Vantage orders them.
fn parse_daily_adjusted(body: &str) -> Result<RawTable, SourceError> {
    let payload: HashMap<String, Value> = serde_json::from_str(body).map_err(|e| {
        SourceError::malformed_payload(format!("failed to parse alphavantage response: {e}"))
    })?;

    if let Some(message) = payload.get("Error Message").and_then(Value::as_str) {
        return Err(SourceError::invalid_request(format!("alphavantage: {message}")));
    }
    for key in ["Note", "Information"] {
        if let Some(message) = payload.get(key).and_then(Value::as_str) {
            return Err(SourceError::rate_limited(format!("alphavantage: {message}")));
        }
    }

    let series = payload
        .iter()
        .find(|(key, _)| key.starts_with("Time Series"))
        .map(|(_, value)| value)
        .ok_or_else(|| SourceError::malformed_payload("no time series data in response"))?;

    let days: BTreeMap<String, BTreeMap<String, Value>> =
        serde_json::from_value(series.clone()).map_err(|e| {
            SourceError::malformed_payload(format!("unexpected time series layout: {e}"))
        })?;

    let mut rows = Vec::with_capacity(days.len());
    for (day, values) in days.into_iter().rev() {
        let timestamp = parse_timestamp(&day)?;
        let mut fields = BTreeMap::new();
        for (name, value) in values {
            let number = parse_number(&day, &name, &value)?;
            fields.insert(name, number);
        }
        rows.push(RawRow::new(timestamp, fields));
    }
    Ok(RawTable::new(rows))
}

fn parse_timestamp(value: &str) -> Result<PrimitiveDateTime, SourceError> {
    if let Ok(date) = Date::parse(value, format_description!("[year]-[month]-[day]")) {
        return Ok(PrimitiveDateTime::new(date, Time::MIDNIGHT));
    }
    PrimitiveDateTime::parse(
        value,
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    )
    .map_err(|_| SourceError::malformed_payload(format!("invalid timestamp '{value}'")))
}

fn parse_number(day: &str, field: &str, value: &Value) -> Result<f64, SourceError> {
    let parsed = match value {
        Value::String(text) => text.trim().parse::<f64>().ok(),
        Value::Number(number) => number.as_f64(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        SourceError::malformed_payload(format!("non-numeric '{field}' on {day}: {value}"))
    })
}
