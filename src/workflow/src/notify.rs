//! Status-change notifications
//!
//! Notifications are sent after commit on a spawned task. A failed delivery
//! is retried a bounded number of times, then logged and counted; it never
//! affects the committed change.

use crate::engine::metrics::WorkflowMetrics;
use crate::error::{Result, WorkflowError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cofund_core::{ActingUser, EntityId, EntityKind, MemberId, Status, UserId};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

/// Who receives a notification
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Recipient {
    User(UserId),
    Role(String),
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recipient::User(id) => write!(f, "user:{}", id),
            Recipient::Role(role) => write!(f, "role:{}", role),
        }
    }
}

/// A committed change worth telling someone about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowEvent {
    pub kind: EntityKind,
    pub entity_id: EntityId,
    pub member_id: MemberId,
    /// Transition or operation name
    pub action: String,
    pub from: Option<Status>,
    pub to: Status,
    pub actor: UserId,
    pub at: DateTime<Utc>,
}

impl WorkflowEvent {
    pub fn summary(&self) -> String {
        match self.from {
            Some(from) => format!(
                "{} {} moved from {} to {} ({})",
                self.kind, self.entity_id, from, self.to, self.action
            ),
            None => format!("{} {} {} as {}", self.kind, self.entity_id, self.action, self.to),
        }
    }
}

/// Notification channel
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipients: &[Recipient], event: &WorkflowEvent) -> Result<()>;
}

/// Writes notifications to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, recipients: &[Recipient], event: &WorkflowEvent) -> Result<()> {
        for recipient in recipients {
            info!(
                recipient = %recipient,
                kind = %event.kind,
                entity = %event.entity_id,
                action = %event.action,
                to = %event.to,
                "Notification"
            );
        }
        Ok(())
    }
}

/// A stored in-app notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InAppNotification {
    pub id: Uuid,
    pub recipient: Recipient,
    pub message: String,
    pub event: WorkflowEvent,
}

/// Notifications kept per recipient before the oldest are dropped
pub const DEFAULT_INBOX_CAPACITY: usize = 100;

/// Keeps the most recent notifications per recipient for retrieval by the user
#[derive(Debug)]
pub struct InAppNotifier {
    inbox: DashMap<Recipient, VecDeque<InAppNotification>>,
    capacity: usize,
}

impl Default for InAppNotifier {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_INBOX_CAPACITY)
    }
}

impl InAppNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inbox keeping at most `capacity` notifications per recipient
    /// (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inbox: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Notifications addressed to the user directly or to their role
    pub fn notifications_for(&self, user: &ActingUser) -> Vec<InAppNotification> {
        let mut keys = vec![Recipient::User(user.id.clone())];
        if let Some(role) = &user.role {
            keys.push(Recipient::Role(role.clone()));
        }

        let mut out: Vec<_> = keys
            .iter()
            .filter_map(|k| self.inbox.get(k).map(|v| v.iter().cloned().collect::<Vec<_>>()))
            .flatten()
            .collect();
        out.sort_by(|a, b| a.event.at.cmp(&b.event.at).then(a.id.cmp(&b.id)));
        out
    }

    pub fn len(&self) -> usize {
        self.inbox.iter().map(|e| e.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Notifier for InAppNotifier {
    async fn send(&self, recipients: &[Recipient], event: &WorkflowEvent) -> Result<()> {
        let message = event.summary();
        for recipient in recipients {
            let mut queue = self.inbox.entry(recipient.clone()).or_default();
            if queue.len() >= self.capacity {
                queue.pop_front();
            }
            queue.push_back(InAppNotification {
                id: Uuid::new_v4(),
                recipient: recipient.clone(),
                message: message.clone(),
                event: event.clone(),
            });
        }
        Ok(())
    }
}

/// Sends to several notifiers; fails if any of them fails
pub struct FanoutNotifier {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new(notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        Self { notifiers }
    }
}

#[async_trait]
impl Notifier for FanoutNotifier {
    async fn send(&self, recipients: &[Recipient], event: &WorkflowEvent) -> Result<()> {
        let mut failures = Vec::new();
        for notifier in &self.notifiers {
            if let Err(e) = notifier.send(recipients, event).await {
                failures.push(e.to_string());
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(WorkflowError::Notification(failures.join("; ")))
        }
    }
}

/// Retrying, fire-and-forget delivery
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    max_attempts: u32,
    backoff: Duration,
    metrics: Option<Arc<WorkflowMetrics>>,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, max_attempts: u32, backoff: Duration) -> Self {
        Self {
            notifier,
            max_attempts: max_attempts.max(1),
            backoff,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<WorkflowMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Deliver on a background task.
    ///
    /// The handle resolves to whether delivery eventually succeeded; callers
    /// are free to drop it.
    pub fn dispatch(&self, recipients: Vec<Recipient>, event: WorkflowEvent) -> JoinHandle<bool> {
        let dispatcher = self.clone();
        tokio::spawn(async move { dispatcher.deliver(&recipients, &event).await })
    }

    async fn deliver(&self, recipients: &[Recipient], event: &WorkflowEvent) -> bool {
        if recipients.is_empty() {
            return true;
        }

        for attempt in 1..=self.max_attempts {
            match self.notifier.send(recipients, event).await {
                Ok(()) => return true,
                Err(e) => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        entity = %event.entity_id,
                        action = %event.action,
                        error = %e,
                        "Notification delivery failed"
                    );
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.backoff * attempt).await;
                    }
                }
            }
        }

        warn!(
            entity = %event.entity_id,
            action = %event.action,
            recipients = recipients.len(),
            "Giving up on notification"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_notification_failure();
        }
        false
    }
}
