use crate::error::ApiError;
use crate::selection::{AssetClass, TimeRange};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

const HISTORICAL_PATH: &str = "/api/historical";
const PREDICT_PATH: &str = "/api/predict";
const UPDATE_MODEL_PATH: &str = "/api/update_model";
const HEALTH_PATH: &str = "/health";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPoint {
    #[serde(alias = "Date", deserialize_with = "de_calendar_date")]
    pub date: NaiveDate,
    #[serde(alias = "Close")]
    pub price: f64,
}

impl HistoricalPoint {
    pub fn new(date: NaiveDate, price: f64) -> Self {
        Self { date, price }
    }
}

/// Accepts `2025-10-18` as well as timestamps like `2025-10-18T00:00:00`.
fn de_calendar_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let day = raw.get(..10).unwrap_or(raw.as_str());
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(serde::de::Error::custom)
}

#[derive(Debug, Deserialize)]
struct HistoricalResponse {
    data: Vec<HistoricalPoint>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub symbol: String,
    pub current_price: f64,
    pub predicted_price: f64,
    /// Absolute change, predicted minus current.
    pub change: f64,
    pub change_percent: f64,
    pub rmse: f64,
    pub mae: f64,
}

impl PredictionResult {
    pub fn is_up(&self) -> bool {
        self.change >= 0.0
    }
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    symbol: &'a str,
    #[serde(rename = "type")]
    asset_class: AssetClass,
}

#[derive(Clone, Debug, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: Option<String>,
    pub service: Option<String>,
}

/// The external prediction service.
#[async_trait]
pub trait PredictionApi: Send + Sync {
    async fn historical(&self, symbol: &str, range: TimeRange) -> Result<Vec<HistoricalPoint>, ApiError>;

    async fn predict(&self, symbol: &str, asset_class: AssetClass) -> Result<PredictionResult, ApiError>;

    /// Any 2xx counts as success; the body is ignored.
    async fn update_model(&self, symbol: &str, period: &str, epochs: u32) -> Result<(), ApiError>;

    async fn health(&self) -> Result<HealthStatus, ApiError>;
}

#[derive(Clone, Debug)]
pub struct HttpPredictionApi {
    client: Client,
    base_url: String,
}

impl HttpPredictionApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(
        &self,
        endpoint: &'static str,
        req: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ApiError> {
        let res = req
            .send()
            .await
            .map_err(|source| ApiError::Transport { endpoint, source })?;
        if !res.status().is_success() {
            return Err(ApiError::Status { endpoint, status: res.status() });
        }
        Ok(res)
    }

    async fn read_json<T: DeserializeOwned>(
        endpoint: &'static str,
        res: reqwest::Response,
    ) -> Result<T, ApiError> {
        let body = res
            .bytes()
            .await
            .map_err(|source| ApiError::Transport { endpoint, source })?;
        serde_json::from_slice(&body).map_err(|source| ApiError::Decode { endpoint, source })
    }
}

#[async_trait]
impl PredictionApi for HttpPredictionApi {
    async fn historical(&self, symbol: &str, range: TimeRange) -> Result<Vec<HistoricalPoint>, ApiError> {
        let token = range.token();
        debug!("GET {} symbol={} range={}", HISTORICAL_PATH, symbol, token);
        let req = self
            .client
            .get(self.endpoint(HISTORICAL_PATH))
            .query(&[("symbol", symbol), ("range", token.as_str())]);
        let res = self.send(HISTORICAL_PATH, req).await?;
        let parsed: HistoricalResponse = Self::read_json(HISTORICAL_PATH, res).await?;
        Ok(parsed.data)
    }

    async fn predict(&self, symbol: &str, asset_class: AssetClass) -> Result<PredictionResult, ApiError> {
        debug!("POST {} symbol={} type={}", PREDICT_PATH, symbol, asset_class.as_str());
        let payload = PredictRequest { symbol, asset_class };
        let req = self.client.post(self.endpoint(PREDICT_PATH)).json(&payload);
        let res = self.send(PREDICT_PATH, req).await?;
        Self::read_json(PREDICT_PATH, res).await
    }

    async fn update_model(&self, symbol: &str, period: &str, epochs: u32) -> Result<(), ApiError> {
        debug!("POST {} symbol={} period={} epochs={}", UPDATE_MODEL_PATH, symbol, period, epochs);
        let req = self.client.post(self.endpoint(UPDATE_MODEL_PATH)).query(&[
            ("symbol", symbol.to_string()),
            ("period", period.to_string()),
            ("epochs", epochs.to_string()),
        ]);
        self.send(UPDATE_MODEL_PATH, req).await?;
        Ok(())
    }

    async fn health(&self) -> Result<HealthStatus, ApiError> {
        let req = self.client.get(self.endpoint(HEALTH_PATH));
        let res = self.send(HEALTH_PATH, req).await?;
        Self::read_json(HEALTH_PATH, res).await
    }
}
