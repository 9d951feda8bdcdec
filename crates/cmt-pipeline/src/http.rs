//! HTTP binding of the sizing service
//!
//! Endpoints of the cost-estimator backend:
//! - `POST /optimize` `{cpu_cores, ram_gb}` → best pick
//! - `GET /debug/eligibles?cpu=&ram=` → `{first_20: [...]}`
//! - `POST /price_instances` `{instance_types: [...]}` → `{prices: [...]}`
//!
//! Bare arrays are accepted for the list endpoints as well.

use crate::error::LookupError;
use crate::service::{BestPick, EligibleSpec, PriceQuote, SizingRequest, SizingService};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct OptimizeBody {
    cpu_cores: u32,
    ram_gb: f64,
}

#[derive(Debug, Serialize)]
struct PriceBody<'a> {
    instance_types: &'a [String],
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EligibleResponse {
    Wrapped { first_20: Vec<EligibleSpec> },
    Bare(Vec<EligibleSpec>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PriceResponse {
    Wrapped { prices: Vec<PriceQuote> },
    Bare(Vec<PriceQuote>),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    details: Option<String>,
}

/// `reqwest`-backed [`SizingService`]
#[derive(Debug, Clone)]
pub struct HttpSizingService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSizingService {
    /// Client for `base_url` with a per-request timeout
    ///
    /// # Errors
    /// [`LookupError::Transport`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl SizingService for HttpSizingService {
    async fn best_pick(&self, request: &SizingRequest) -> Result<BestPick, LookupError> {
        let body = OptimizeBody {
            cpu_cores: request.cpu_cores(),
            ram_gb: request.ram_gb(),
        };
        let response = self.client.post(self.url("/optimize")).json(&body).send().await?;
        decode(response).await
    }

    async fn eligible(&self, request: &SizingRequest) -> Result<Vec<EligibleSpec>, LookupError> {
        let response = self
            .client
            .get(self.url("/debug/eligibles"))
            .query(&[
                ("cpu", request.cpu_cores().to_string()),
                ("ram", request.ram_gb().to_string()),
            ])
            .send()
            .await?;
        Ok(match decode::<EligibleResponse>(response).await? {
            EligibleResponse::Wrapped { first_20 } => first_20,
            EligibleResponse::Bare(specs) => specs,
        })
    }

    async fn batch_prices(&self, instance_types: &[String]) -> Result<Vec<PriceQuote>, LookupError> {
        let response = self
            .client
            .post(self.url("/price_instances"))
            .json(&PriceBody { instance_types })
            .send()
            .await?;
        Ok(match decode::<PriceResponse>(response).await? {
            PriceResponse::Wrapped { prices } => prices,
            PriceResponse::Bare(quotes) => quotes,
        })
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, LookupError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let message = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(ErrorBody {
                error,
                details: Some(details),
            }) => format!("{error} ({details})"),
            Ok(ErrorBody { error, .. }) => error,
            Err(_) => text,
        };
        return Err(LookupError::Status {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&text).map_err(|e| LookupError::Decode(e.to_string()))
}
