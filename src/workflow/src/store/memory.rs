//! In-memory workflow store
//!
//! A transaction holds the store-wide mutex from `begin` until it is
//! committed or dropped, so units of work are fully serialized. Writes are
//! staged and applied only on commit.

use super::{ListFilter, StoreTransaction, WorkflowStore};
use crate::audit::{AuditEntry, AuditQuery};
use crate::error::{Result, WorkflowError};
use crate::types::EntityRecord;
use async_trait::async_trait;
use cofund_core::{EntityId, EntityKind};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Key = (EntityKind, EntityId);

#[derive(Debug, Default)]
struct MemoryState {
    entities: HashMap<Key, EntityRecord>,
    audit: Vec<AuditEntry>,
}

/// In-memory store for tests and single-process deployments
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, deleted ones included
    pub async fn len(&self) -> usize {
        self.state.lock().await.entities.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl WorkflowStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        Ok(Box::new(MemoryTransaction {
            guard,
            staged: HashMap::new(),
            audit: Vec::new(),
        }))
    }

    async fn get(&self, kind: EntityKind, id: EntityId) -> Result<Option<EntityRecord>> {
        Ok(self.state.lock().await.entities.get(&(kind, id)).cloned())
    }

    async fn list(&self, kind: EntityKind, filter: ListFilter) -> Result<Vec<EntityRecord>> {
        let state = self.state.lock().await;
        let mut records: Vec<_> = state
            .entities
            .values()
            .filter(|r| r.kind == kind && filter.matches(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(records)
    }

    async fn audit_entries(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>> {
        let state = self.state.lock().await;
        let matching = state.audit.iter().filter(|e| query.matches(e)).cloned();
        Ok(if query.limit > 0 {
            matching.take(query.limit).collect()
        } else {
            matching.collect()
        })
    }
}

struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    /// `None` marks a staged removal
    staged: HashMap<Key, Option<EntityRecord>>,
    audit: Vec<AuditEntry>,
}

impl MemoryTransaction {
    fn current(&self, key: &Key) -> Option<&EntityRecord> {
        match self.staged.get(key) {
            Some(staged) => staged.as_ref(),
            None => self.guard.entities.get(key),
        }
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn lock(&mut self, kind: EntityKind, id: EntityId) -> Result<Option<EntityRecord>> {
        Ok(self.current(&(kind, id)).cloned())
    }

    async fn insert(&mut self, record: &EntityRecord) -> Result<()> {
        let key = (record.kind, record.id);
        if self.current(&key).is_some() {
            return Err(WorkflowError::Persistence(format!(
                "{} {} already exists",
                record.kind, record.id
            )));
        }
        self.staged.insert(key, Some(record.clone()));
        Ok(())
    }

    async fn update(&mut self, record: &EntityRecord) -> Result<()> {
        let key = (record.kind, record.id);
        let stored = self.current(&key).map(|r| r.version).ok_or_else(|| {
            WorkflowError::Persistence(format!("{} {} does not exist", record.kind, record.id))
        })?;

        if stored + 1 != record.version {
            return Err(WorkflowError::Persistence(format!(
                "version conflict on {} {}: stored {}, got {}",
                record.kind, record.id, stored, record.version
            )));
        }

        self.staged.insert(key, Some(record.clone()));
        Ok(())
    }

    async fn remove(&mut self, kind: EntityKind, id: EntityId) -> Result<()> {
        let key = (kind, id);
        if self.current(&key).is_none() {
            return Err(WorkflowError::Persistence(format!("{} {} does not exist", kind, id)));
        }
        self.staged.insert(key, None);
        Ok(())
    }

    async fn append_audit(&mut self, entry: &AuditEntry) -> Result<()> {
        self.audit.push(entry.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTransaction {
            mut guard,
            staged,
            audit,
        } = *self;

        for (key, record) in staged {
            match record {
                Some(record) => {
                    guard.entities.insert(key, record);
                }
                None => {
                    guard.entities.remove(&key);
                }
            }
        }
        guard.audit.extend(audit);
        Ok(())
    }
}
