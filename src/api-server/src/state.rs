use crate::auth::TokenVerifier;
use cofund_workflow::notify::FanoutNotifier;
use cofund_workflow::{
    EngineConfig, InAppNotifier, LogNotifier, Notifier, PermissionSource, WorkflowOrchestrator,
    WorkflowStore,
};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Workflow orchestrator
    pub orchestrator: Arc<WorkflowOrchestrator>,

    /// Role to permission resolution for incoming identities
    pub permissions: Arc<dyn PermissionSource>,

    /// In-app notification inbox
    pub inbox: Arc<InAppNotifier>,

    pub tokens: TokenVerifier,

    /// Server start time for uptime calculation
    pub start_time: Instant,

    /// Application version
    pub version: String,
}

impl AppState {
    /// Wire an orchestrator over `store`, delivering notifications to the
    /// log and the in-app inbox
    pub fn build(
        config: EngineConfig,
        store: Arc<dyn WorkflowStore>,
        permissions: Arc<dyn PermissionSource>,
        tokens: TokenVerifier,
    ) -> cofund_workflow::Result<Self> {
        let inbox = Arc::new(InAppNotifier::new());
        let notifier: Arc<dyn Notifier> = Arc::new(FanoutNotifier::new(vec![
            Arc::new(LogNotifier),
            inbox.clone(),
        ]));

        let orchestrator =
            WorkflowOrchestrator::new(config, store, permissions.clone(), notifier)?;

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            permissions,
            inbox,
            tokens,
            start_time: Instant::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
