//! Provisioning form
//!
//! Builds `{instance_type, region}` provision requests from its own
//! selection and records what the provisioning backend did in the
//! activity log.

use crate::error::ReconcileError;
use crate::reconciler::Reconciler;
use cmt_store::{ActivityLog, CandidateStore};
use cmt_types::{ActivityEvent, ActivityKind, NetworkRef, NewActivity};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Body of a provision request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionRequest {
    pub instance_type: String,
    pub region: String,
}

/// Network stack ids as returned by the provisioning backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackIds {
    #[serde(default)]
    pub vpc_id: Option<String>,
    #[serde(default)]
    pub subnet_id: Option<String>,
    #[serde(default, alias = "security_group_id")]
    pub sg_id: Option<String>,
}

impl From<StackIds> for NetworkRef {
    fn from(stack: StackIds) -> Self {
        Self {
            vpc_id: stack.vpc_id,
            subnet_id: stack.subnet_id,
            security_group_id: stack.sg_id,
        }
    }
}

/// Successful provision response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionReceipt {
    pub region: String,
    pub instance_id: String,
    pub instance_type: String,
    #[serde(default)]
    pub public_ip: Option<String>,
    #[serde(default)]
    pub ami: Option<String>,
    #[serde(default)]
    pub stack: Option<StackIds>,
}

/// Provisioning view over the candidate store
#[derive(Debug)]
pub struct ProvisionForm {
    reconciler: Reconciler,
    activity: Arc<ActivityLog>,
    region: String,
}

impl ProvisionForm {
    #[must_use]
    pub fn mount(
        store: Arc<CandidateStore>,
        activity: Arc<ActivityLog>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            reconciler: Reconciler::mount("provision-form", store),
            activity,
            region: region.into(),
        }
    }

    /// Request for the currently selected instance type
    ///
    /// # Errors
    /// [`ReconcileError::NoSelection`] when nothing is selected.
    pub fn request(&self) -> Result<ProvisionRequest, ReconcileError> {
        let instance_type = self
            .reconciler
            .selection()
            .ok_or(ReconcileError::NoSelection)?;
        Ok(ProvisionRequest {
            instance_type,
            region: self.region.clone(),
        })
    }

    /// Log a created instance
    ///
    /// # Errors
    /// [`ReconcileError::MissingField`] for a receipt without an instance id.
    pub fn record_created(&self, receipt: ProvisionReceipt) -> Result<ActivityEvent, ReconcileError> {
        if receipt.instance_id.is_empty() {
            return Err(ReconcileError::MissingField("instance_id"));
        }

        let details = serde_json::json!({
            "public_ip": receipt.public_ip,
            "ami": receipt.ami,
        });
        let mut activity = NewActivity::new(ActivityKind::Create)
            .region(receipt.region)
            .instance_id(receipt.instance_id)
            .instance_type(receipt.instance_type)
            .details(details);
        if let Some(stack) = receipt.stack {
            activity = activity.network(stack.into());
        }

        let event = self.activity.append(activity);
        tracing::info!(id = %event.id, instance_id = ?event.instance_id, "instance created");
        Ok(event)
    }

    /// Log a terminated instance
    ///
    /// # Errors
    /// [`ReconcileError::MissingField`] for an empty instance id.
    pub fn record_destroyed(&self, instance_id: &str) -> Result<ActivityEvent, ReconcileError> {
        if instance_id.is_empty() {
            return Err(ReconcileError::MissingField("instance_id"));
        }
        let event = self.activity.append(
            NewActivity::new(ActivityKind::Destroy)
                .region(self.region.as_str())
                .instance_id(instance_id),
        );
        tracing::info!(id = %event.id, instance_id, "instance terminated");
        Ok(event)
    }

    /// Log removal of every provisioned resource in the region
    pub fn record_teardown(&self) -> ActivityEvent {
        let event = self.activity.append(
            NewActivity::new(ActivityKind::Teardown)
                .region(self.region.as_str())
                .details(serde_json::Value::from("All cmtool resources deleted")),
        );
        tracing::info!(id = %event.id, region = %self.region, "stack torn down");
        event
    }

    #[inline]
    #[must_use]
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    #[inline]
    #[must_use]
    pub fn activity(&self) -> &Arc<ActivityLog> {
        &self.activity
    }
}
