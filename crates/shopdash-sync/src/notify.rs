//! Per-tenant broadcast of sync progress.
//!
//! Each tenant has its own room, created on first subscribe and dropped
//! once its last subscriber goes away. Publishing never blocks and never
//! fails: events for a room with no listeners are discarded.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

const DEFAULT_ROOM_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Started,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    Customers,
    Products,
    Orders,
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncPhase::Customers => write!(f, "customers"),
            SyncPhase::Products => write!(f, "products"),
            SyncPhase::Orders => write!(f, "orders"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SyncEvent {
    SyncStatus {
        tenant_id: Uuid,
        status: SyncStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        timestamp: DateTime<Utc>,
    },
    DataUpdate {
        tenant_id: Uuid,
        phase: SyncPhase,
        count: usize,
        timestamp: DateTime<Utc>,
    },
}

impl SyncEvent {
    #[must_use]
    pub fn status(tenant_id: Uuid, status: SyncStatus, message: Option<String>) -> Self {
        SyncEvent::SyncStatus {
            tenant_id,
            status,
            message,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn data_update(tenant_id: Uuid, phase: SyncPhase, count: usize) -> Self {
        SyncEvent::DataUpdate {
            tenant_id,
            phase,
            count,
            timestamp: Utc::now(),
        }
    }

    /// Event name on the wire: `sync-status` or `data-update`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            SyncEvent::SyncStatus { .. } => "sync-status",
            SyncEvent::DataUpdate { .. } => "data-update",
        }
    }

    #[must_use]
    pub fn tenant_id(&self) -> Uuid {
        match self {
            SyncEvent::SyncStatus { tenant_id, .. } | SyncEvent::DataUpdate { tenant_id, .. } => {
                *tenant_id
            }
        }
    }
}

/// Cheap to clone; all clones share the same rooms.
#[derive(Debug, Clone)]
pub struct SyncNotifier {
    rooms: Arc<Mutex<HashMap<Uuid, broadcast::Sender<SyncEvent>>>>,
    capacity: usize,
}

impl Default for SyncNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_ROOM_CAPACITY)
    }
}

impl SyncNotifier {
    /// `capacity` is the per-room backlog; slower subscribers skip ahead
    /// once it is exceeded.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            rooms: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Join a tenant's room.
    #[must_use]
    pub fn subscribe(&self, tenant_id: Uuid) -> broadcast::Receiver<SyncEvent> {
        let mut rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        rooms
            .entry(tenant_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Deliver an event to the tenant's current subscribers.
    pub fn publish(&self, event: SyncEvent) {
        let tenant_id = event.tenant_id();
        let mut rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = rooms.get(&tenant_id) else {
            return;
        };
        if sender.send(event).is_err() {
            rooms.remove(&tenant_id);
        }
    }

    /// Number of live subscribers in a tenant's room.
    #[must_use]
    pub fn subscriber_count(&self, tenant_id: Uuid) -> usize {
        let rooms = self.rooms.lock().unwrap_or_else(PoisonError::into_inner);
        rooms.get(&tenant_id).map_or(0, broadcast::Sender::receiver_count)
    }
}
