//! Sizing service contract
//!
//! The pipeline depends only on the shapes below; request/response bodies
//! beyond these fields belong to the external cost service.

use crate::error::{LookupError, PipelineError};
use async_trait::async_trait;
use cmt_types::{normalize_price, EligibleCandidate};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Debug;

fn deserialize_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(normalize_price(Option::<f64>::deserialize(deserializer)?))
}

/// Validated resource requirement
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SizingRequest {
    cpu_cores: u32,
    ram_gb: f64,
}

impl SizingRequest {
    /// Build a request; both figures must be positive
    ///
    /// # Errors
    /// [`PipelineError::InvalidRequest`] for zero cores or non-positive RAM.
    pub fn new(cpu_cores: u32, ram_gb: f64) -> Result<Self, PipelineError> {
        if cpu_cores == 0 {
            return Err(PipelineError::InvalidRequest(
                "cpu_cores must be positive".to_string(),
            ));
        }
        if !ram_gb.is_finite() || ram_gb <= 0.0 {
            return Err(PipelineError::InvalidRequest(format!(
                "ram_gb must be a positive number, got {ram_gb}"
            )));
        }
        Ok(Self { cpu_cores, ram_gb })
    }

    #[inline]
    #[must_use]
    pub fn cpu_cores(&self) -> u32 {
        self.cpu_cores
    }

    #[inline]
    #[must_use]
    pub fn ram_gb(&self) -> f64 {
        self.ram_gb
    }
}

/// The service's single cheapest pick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestPick {
    pub instance_type: String,
    #[serde(default, deserialize_with = "deserialize_price")]
    pub price_per_hour: Option<f64>,
    #[serde(rename = "vCPU", default, skip_serializing_if = "Option::is_none")]
    pub vcpu: Option<u32>,
    #[serde(rename = "memory_GB", default, skip_serializing_if = "Option::is_none")]
    pub memory_gb: Option<f64>,
}

/// An eligible instance shape, before pricing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibleSpec {
    pub instance_type: String,
    #[serde(rename = "vCPU")]
    pub vcpu: u32,
    #[serde(rename = "memory_GB")]
    pub memory_gb: f64,
}

impl EligibleSpec {
    #[must_use]
    pub fn new(instance_type: impl Into<String>, vcpu: u32, memory_gb: f64) -> Self {
        Self {
            instance_type: instance_type.into(),
            vcpu,
            memory_gb,
        }
    }

    /// Attach a looked-up price
    #[must_use]
    pub fn into_candidate(self, price: Option<f64>) -> EligibleCandidate {
        EligibleCandidate::new(self.instance_type, self.vcpu, self.memory_gb).with_price(price)
    }
}

/// One entry of a batch price response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub instance_type: String,
    #[serde(default, deserialize_with = "deserialize_price")]
    pub price_per_hour: Option<f64>,
}

impl PriceQuote {
    #[must_use]
    pub fn new(instance_type: impl Into<String>, price_per_hour: f64) -> Self {
        Self {
            instance_type: instance_type.into(),
            price_per_hour: normalize_price(Some(price_per_hour)),
        }
    }
}

/// Remote lookups the pipeline consumes
#[async_trait]
pub trait SizingService: Send + Sync + Debug {
    /// Cheapest single configuration meeting the requirement
    async fn best_pick(&self, request: &SizingRequest) -> Result<BestPick, LookupError>;

    /// Configurations meeting or exceeding the requirement, smallest first
    async fn eligible(&self, request: &SizingRequest) -> Result<Vec<EligibleSpec>, LookupError>;

    /// Hourly prices for the given instance types; unknown types may be omitted
    async fn batch_prices(&self, instance_types: &[String]) -> Result<Vec<PriceQuote>, LookupError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_validation() {
        assert!(SizingRequest::new(2, 4.0).is_ok());
        assert!(SizingRequest::new(0, 4.0).is_err());
        assert!(SizingRequest::new(2, 0.0).is_err());
        assert!(SizingRequest::new(2, -1.0).is_err());
        assert!(SizingRequest::new(2, f64::INFINITY).is_err());
    }

    #[test]
    fn best_pick_parses_optimize_response() {
        let json = r#"{"instance_type": "t3.medium", "vCPU": 2, "memory_GB": 4.0, "price_per_hour": 0.0416}"#;
        let pick: BestPick = serde_json::from_str(json).unwrap();
        assert_eq!(pick.instance_type, "t3.medium");
        assert_eq!(pick.price_per_hour, Some(0.0416));
        assert_eq!(pick.vcpu, Some(2));
    }

    #[test]
    fn price_quote_normalizes_zero() {
        let quote: PriceQuote =
            serde_json::from_str(r#"{"instance_type": "x", "price_per_hour": 0}"#).unwrap();
        assert_eq!(quote.price_per_hour, None);
        assert_eq!(PriceQuote::new("y", -2.0).price_per_hour, None);
    }
}
