//! Binance adapter against a local HTTP stub of `/api/v3`.

mod common;

use candlekeep_core::domain::{day_start_ms, FetchRequest, Interval, PageLimit};
use candlekeep_core::exchange::{BinanceClient, ExchangeClient, ExchangeError};
use candlekeep_core::fetch::{DayFetcher, Pacer};
use common::http_stub::{http_client, query_i64, string_row, StubServer};
use common::{date, run_of_bars, FIVE_MIN};
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, Request, ResponseTemplate};

fn client(stub: &StubServer) -> BinanceClient {
    BinanceClient::with_base_url(http_client(), stub.uri())
}

// ── Klines ───────────────────────────────────────────────────────────

#[test]
fn klines_are_requested_from_start_time() {
    let stub = StubServer::start();
    let since = day_start_ms(date(2020, 8, 20));
    stub.mount(
        Mock::given(method("GET"))
            .and(path("/api/v3/klines"))
            .and(query_param("symbol", "BTCUSDT"))
            .and(query_param("interval", "5m"))
            .and(query_param("startTime", since.to_string()))
            .and(query_param("limit", "1000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                [since, "11754.59", "11767.00", "11745.00", "11760.11", "123.456", since + 299_999, "0", 10, "0", "0", "0"],
                [since + FIVE_MIN, "11760.11", "11771.99", "11755.31", "11766.00", "98.7", since + 599_999, "0", 12, "0", "0", "0"]
            ]))),
    );

    let bars = client(&stub)
        .fetch_ohlcv("BTC/USDT", Interval::M5, since, Some(5000))
        .unwrap();

    assert_eq!(bars.len(), 2);
    assert_eq!(bars[0].timestamp, since);
    assert_eq!(bars[0].open, 11754.59);
    assert_eq!(bars[1].close, 11766.0);
    assert_eq!(stub.requests().len(), 1);
}

#[test]
fn day_fetch_walks_start_time_forward() {
    let stub = StubServer::start();
    let day = date(2020, 8, 20);
    let history = run_of_bars(day_start_ms(day), FIVE_MIN, 2 * 288, 100.0);
    stub.mount(
        Mock::given(method("GET"))
            .and(path("/api/v3/klines"))
            .respond_with(move |request: &Request| {
                let since = query_i64(request, "startTime").unwrap_or(0);
                let limit = query_i64(request, "limit").unwrap_or(500) as usize;
                let rows: Vec<Value> = history
                    .iter()
                    .filter(|b| b.timestamp >= since)
                    .take(limit)
                    .map(|b| {
                        let mut row = string_row(b);
                        row[0] = json!(b.timestamp);
                        Value::Array(row)
                    })
                    .collect();
                ResponseTemplate::new(200).set_body_json(rows)
            }),
    );

    let request = FetchRequest::new("BTC/USDT", Interval::M5, day, PageLimit::from_rows(100));
    let bars = DayFetcher::new(Pacer::unpaced())
        .fetch_day(&client(&stub), &request)
        .unwrap();

    let start = day_start_ms(day);
    assert_eq!(bars.len(), 288);
    assert_eq!(bars[0].timestamp, start);
    assert_eq!(
        stub.query_values("startTime"),
        vec![start, start + 99 * FIVE_MIN, start + 198 * FIVE_MIN]
    );
}

// ── Errors ───────────────────────────────────────────────────────────

#[test]
fn invalid_symbol_is_symbol_not_found() {
    let stub = StubServer::start();
    stub.mount(
        Mock::given(method("GET"))
            .and(path("/api/v3/klines"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"code": -1121, "msg": "Invalid symbol."})),
            ),
    );

    let err = client(&stub)
        .fetch_ohlcv("FOO/USDT", Interval::M5, 0, None)
        .unwrap_err();

    assert!(matches!(err, ExchangeError::SymbolNotFound { symbol } if symbol == "FOO/USDT"));
}

#[test]
fn ban_status_opens_the_breaker() {
    let stub = StubServer::start();
    stub.mount(
        Mock::given(method("GET"))
            .and(path("/api/v3/klines"))
            .respond_with(ResponseTemplate::new(418)),
    );
    let client = client(&stub);

    let first = client.fetch_ohlcv("BTC/USDT", Interval::M5, 0, None);
    let second = client.fetch_ohlcv("BTC/USDT", Interval::M5, 0, None);

    assert!(matches!(first, Err(ExchangeError::CircuitBreakerTripped)));
    assert!(matches!(second, Err(ExchangeError::CircuitBreakerTripped)));
    assert!(!client.is_available());
    assert_eq!(stub.requests().len(), 1);
}

// ── Symbols ──────────────────────────────────────────────────────────

#[test]
fn exchange_info_lists_trading_pairs() {
    let stub = StubServer::start();
    stub.mount(
        Mock::given(method("GET"))
            .and(path("/api/v3/exchangeInfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "timezone": "UTC",
                "symbols": [
                    {"symbol": "BTCUSDT", "status": "TRADING", "baseAsset": "BTC", "quoteAsset": "USDT"},
                    {"symbol": "LUNAUSDT", "status": "BREAK", "baseAsset": "LUNA", "quoteAsset": "USDT"}
                ]
            }))),
    );

    assert_eq!(client(&stub).list_symbols().unwrap(), vec!["BTC/USDT"]);
}
