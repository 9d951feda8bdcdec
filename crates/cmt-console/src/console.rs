//! Console wiring
//!
//! Builds the explicit service objects (snapshot backend, candidate store,
//! activity log, sizing service, pipeline) once and hands out views over
//! them.

use crate::config::ConsoleConfig;
use cmt_pipeline::{
    HttpSizingService, LookupError, PipelineError, RecommendationPipeline, RunReport,
    SizingRequest, SizingService,
};
use cmt_reconcile::{ProvisionForm, ScriptGenerator};
use cmt_store::{ActivityLog, CandidateStore, JsonFileSnapshot, SnapshotBackend};
use cmt_types::{ActivityEvent, CandidateList, NewActivity};
use std::sync::Arc;

/// Process-wide console state
#[derive(Debug)]
pub struct Console {
    config: ConsoleConfig,
    store: Arc<CandidateStore>,
    activity: Arc<ActivityLog>,
    pipeline: RecommendationPipeline,
}

impl Console {
    /// Console backed by JSON snapshots in `state_dir` and the HTTP service
    ///
    /// # Errors
    /// [`LookupError::Transport`] if the HTTP client cannot be built.
    pub fn open(config: ConsoleConfig) -> Result<Self, LookupError> {
        let service = HttpSizingService::new(&config.service_url, config.request_timeout())?;
        let backend = Arc::new(JsonFileSnapshot::new(&config.state_dir));
        Ok(Self::with_parts(config, Arc::new(service), backend))
    }

    /// Console over caller-supplied service and backend
    #[must_use]
    pub fn with_parts(
        config: ConsoleConfig,
        service: Arc<dyn SizingService>,
        backend: Arc<dyn SnapshotBackend>,
    ) -> Self {
        let store = Arc::new(CandidateStore::open_candidates(Arc::clone(&backend)));
        let activity = Arc::new(ActivityLog::persistent(config.activity_capacity, backend));
        let pipeline = RecommendationPipeline::new(service, Arc::clone(&store), config.pipeline());
        tracing::debug!(
            state_dir = %config.state_dir.display(),
            restored = ?store.restore_status(),
            activity = activity.len(),
            "console opened"
        );

        Self {
            config,
            store,
            activity,
            pipeline,
        }
    }

    /// Run one recommendation for `cpu_cores` / `ram_gb`
    ///
    /// # Errors
    /// [`PipelineError::InvalidRequest`] for non-positive requirements.
    pub async fn recommend(&self, cpu_cores: u32, ram_gb: f64) -> Result<RunReport, PipelineError> {
        let request = SizingRequest::new(cpu_cores, ram_gb)?;
        Ok(self.pipeline.run(request).await)
    }

    /// Append an activity event; the configured region fills a missing one
    pub fn record(&self, mut activity: NewActivity) -> ActivityEvent {
        if activity.region.is_none() {
            activity.region = Some(self.config.region.clone());
        }
        self.activity.append(activity)
    }

    #[must_use]
    pub fn script_generator(&self) -> ScriptGenerator {
        ScriptGenerator::mount(Arc::clone(&self.store), self.config.region.as_str())
    }

    #[must_use]
    pub fn provision_form(&self) -> ProvisionForm {
        ProvisionForm::mount(
            Arc::clone(&self.store),
            Arc::clone(&self.activity),
            self.config.region.as_str(),
        )
    }

    #[must_use]
    pub fn candidates(&self) -> Arc<CandidateList> {
        self.store.read()
    }

    #[must_use]
    pub fn activity(&self) -> Arc<Vec<ActivityEvent>> {
        self.activity.read()
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<CandidateStore> {
        &self.store
    }

    #[inline]
    #[must_use]
    pub fn pipeline(&self) -> &RecommendationPipeline {
        &self.pipeline
    }
}
