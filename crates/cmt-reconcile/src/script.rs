//! Infrastructure-script generator
//!
//! Turns the current selection into the request body sent to the external
//! script-generation service.

use crate::error::ReconcileError;
use crate::reconciler::Reconciler;
use cmt_store::CandidateStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Body of a script-generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptRequest {
    pub instance_type: String,
    pub region: String,
    #[serde(rename = "vCPU")]
    pub vcpu: u32,
    #[serde(rename = "memory_GB")]
    pub memory_gb: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_per_hour: Option<f64>,
}

/// Script-generation view over the candidate store
#[derive(Debug)]
pub struct ScriptGenerator {
    reconciler: Reconciler,
    region: String,
}

impl ScriptGenerator {
    #[must_use]
    pub fn mount(store: Arc<CandidateStore>, region: impl Into<String>) -> Self {
        Self {
            reconciler: Reconciler::mount("script-generator", store),
            region: region.into(),
        }
    }

    /// Request for the selected candidate
    ///
    /// # Errors
    /// [`ReconcileError::NoSelection`] when the candidate list is empty.
    pub fn request(&self) -> Result<ScriptRequest, ReconcileError> {
        let candidate = self
            .reconciler
            .selected_candidate()
            .ok_or(ReconcileError::NoSelection)?;
        Ok(ScriptRequest {
            instance_type: candidate.instance_type,
            region: self.region.clone(),
            vcpu: candidate.vcpu,
            memory_gb: candidate.memory_gb,
            price_per_hour: candidate.price_per_hour,
        })
    }

    #[inline]
    #[must_use]
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    #[inline]
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }
}
