use serde::Deserialize;

// Using `#[serde(rename_all = "camelCase")]` to automatically map from JSON camelCase to Rust snake_case.

/// The envelope of a `GET /v7/finance/quote` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteEnvelope {
    pub quote_response: QuoteResponse,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteResponse {
    #[serde(default)]
    pub result: Vec<QuoteResult>,
    #[serde(default)]
    pub error: Option<FeedError>,
}

/// A single symbol's top of book. Prices arrive as JSON floats and sizes as
/// integers; any of them may be absent outside market hours.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResult {
    pub symbol: String,
    pub bid: Option<f64>,
    pub bid_size: Option<u64>,
    pub ask: Option<f64>,
    pub ask_size: Option<u64>,
    // There are many more fields, but only the top of book matters to the ledger.
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedError {
    pub code: String,
    pub description: String,
}
