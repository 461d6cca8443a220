use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use interface::{ApiError, EquityPoint, MutationAck, Position, Status, Trade};

use crate::{Method, Mutation, TradingService};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// reqwest 기반 트레이딩 서비스 클라이언트
#[derive(Clone)]
pub struct HttpTradingClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTradingClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request<T: DeserializeOwned>(&self, method: Method, path: &str) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("{:?} {}", method, url);

        let request = match method {
            Method::Get => self.http.get(&url),
            Method::Post => self.http.post(&url),
        };

        let response = request.send().await?;
        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::server(status.as_u16(), &response_text));
        }

        serde_json::from_str(&response_text).map_err(|e| {
            ApiError::Decode(format!(
                "{} {}: {}, response: {}",
                path,
                status,
                e,
                response_text.chars().take(200).collect::<String>()
            ))
        })
    }
}

#[async_trait]
impl TradingService for HttpTradingClient {
    async fn status(&self) -> Result<Status, ApiError> {
        self.request(Method::Get, "/status").await
    }

    async fn portfolio(&self) -> Result<Vec<Position>, ApiError> {
        self.request(Method::Get, "/portfolio").await
    }

    async fn trades(&self) -> Result<Vec<Trade>, ApiError> {
        self.request(Method::Get, "/trades").await
    }

    async fn equity(&self) -> Result<Vec<EquityPoint>, ApiError> {
        self.request(Method::Get, "/equity").await
    }

    async fn refresh_prices(&self) -> Result<MutationAck, ApiError> {
        self.request(Method::Get, "/refresh_prices").await
    }

    async fn mutate(&self, mutation: &Mutation) -> Result<MutationAck, ApiError> {
        mutation.validate()?;
        self.request(mutation.method(), &mutation.path()).await
    }
}
