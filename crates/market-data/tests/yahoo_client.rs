//! HTTP-level tests for `YahooQuoteClient` against a local mock server.

use configuration::MarketDataSettings;
use core_types::QuoteSide;
use market_data::error::QuoteError;
use market_data::{QuoteSource, YahooQuoteClient};
use rust_decimal_macros::dec;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> YahooQuoteClient {
    let settings = MarketDataSettings {
        base_url: server.uri(),
        ..MarketDataSettings::default()
    };
    YahooQuoteClient::new(&settings).unwrap()
}

#[tokio::test]
async fn fetches_ask_quote() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v7/finance/quote"))
        .and(query_param("symbols", "ACME"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "quoteResponse": {
                "result": [{"symbol": "ACME", "bid": 49.5, "bidSize": 10, "ask": 50.0, "askSize": 7}],
                "error": null
            }
        })))
        .mount(&server)
        .await;

    let quote = client_for(&server).quote("ACME", QuoteSide::Ask).await.unwrap();
    assert_eq!(quote.price, dec!(50));
    assert_eq!(quote.size, dec!(7));
    assert_eq!(quote.side, QuoteSide::Ask);
}

#[tokio::test]
async fn empty_result_is_unknown_symbol() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v7/finance/quote"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "quoteResponse": {"result": [], "error": null}
        })))
        .mount(&server)
        .await;

    let err = client_for(&server).quote("ZZZZ", QuoteSide::Bid).await.unwrap_err();
    assert!(matches!(err, QuoteError::UnknownSymbol(_)));
}

#[tokio::test]
async fn http_failure_is_a_feed_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v7/finance/quote"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let err = client_for(&server).quote("ACME", QuoteSide::Bid).await.unwrap_err();
    assert!(matches!(err, QuoteError::Feed(_)));
}

#[tokio::test]
async fn malformed_body_is_a_deserialization_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v7/finance/quote"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).quote("ACME", QuoteSide::Bid).await.unwrap_err();
    assert!(matches!(err, QuoteError::Deserialization(_)));
}

#[tokio::test]
async fn borrow_fee_is_unknown_for_this_feed() {
    let server = MockServer::start().await;
    assert_eq!(client_for(&server).borrow_fee("ACME").await.unwrap(), None);
}

#[tokio::test]
async fn option_premium_is_quoted_under_the_occ_ticker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v7/finance/quote"))
        .and(query_param("symbols", "ACME270115P00040000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "quoteResponse": {
                "result": [{"symbol": "ACME270115P00040000", "bid": 1.2, "bidSize": 30, "ask": 1.35, "askSize": 25}],
                "error": null
            }
        })))
        .mount(&server)
        .await;

    let expiry = chrono::NaiveDate::from_ymd_opt(2027, 1, 15).unwrap();
    let put = core_types::OptionContract::put(expiry, dec!(40)).unwrap();
    let quote = client_for(&server)
        .option_quote("ACME", &put, QuoteSide::Bid)
        .await
        .unwrap();
    assert_eq!(quote.price, dec!(1.2));
    assert_eq!(quote.size, dec!(30));
}
