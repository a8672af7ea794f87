use crate::config::ServiceType;
use crate::server_id::ServerId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerStatus {
    Up,
    Crashed,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEntry {
    pub server_id: ServerId,
    pub service_locator: String,
    pub services: Vec<ServiceType>,
    pub status: ServerStatus,
    pub expected_read_mbytes_per_sec: u32,
    pub replication_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    /// Replaces the whole list.
    Full,
    /// Applies on top of the previous version.
    Update,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerListUpdate {
    pub version: u64,
    pub kind: ListKind,
    pub servers: Vec<ServerEntry>,
}

/// The cluster membership list as seen by the membership service.
///
/// Ordering, deduplication and full-vs-incremental semantics belong to the
/// implementor; callers only hand over what they received. Implementations
/// must serialize concurrent calls themselves.
pub trait ServerListView: Send + Sync {
    /// Applies `update` and returns the list version now in effect.
    fn apply_server_list(&self, update: ServerListUpdate) -> u64;
}

#[derive(Debug, Default)]
struct ListState {
    version: u64,
    servers: BTreeMap<u32, ServerEntry>,
}

/// In-memory server list.
///
/// Full lists replace the contents when newer than the current version.
/// Incremental updates are only accepted as the direct successor of the
/// current version; anything else is dropped and the holder is expected
/// to be sent a full list.
#[derive(Debug, Default)]
pub struct MemServerList {
    state: Mutex<ListState>,
}

impl MemServerList {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ListState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn version(&self) -> u64 {
        self.lock().version
    }

    pub fn len(&self) -> usize {
        self.lock().servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().servers.is_empty()
    }

    pub fn get(&self, id: ServerId) -> Option<ServerEntry> {
        self.lock()
            .servers
            .get(&id.index())
            .filter(|entry| entry.server_id == id)
            .cloned()
    }

    pub fn is_up(&self, id: ServerId) -> bool {
        self.get(id)
            .map(|entry| entry.status == ServerStatus::Up)
            .unwrap_or(false)
    }
}

impl ServerListView for MemServerList {
    fn apply_server_list(&self, update: ServerListUpdate) -> u64 {
        let mut state = self.lock();

        match update.kind {
            ListKind::Full => {
                if update.version < state.version {
                    tracing::debug!(
                        current = state.version,
                        received = update.version,
                        "Ignoring stale full server list"
                    );
                    return state.version;
                }
                state.servers = update
                    .servers
                    .into_iter()
                    .filter(|entry| entry.status != ServerStatus::Remove)
                    .map(|entry| (entry.server_id.index(), entry))
                    .collect();
            }
            ListKind::Update => {
                if state.version.checked_add(1) != Some(update.version) {
                    tracing::warn!(
                        current = state.version,
                        received = update.version,
                        "Dropping out-of-order server list update"
                    );
                    return state.version;
                }
                for entry in update.servers {
                    let index = entry.server_id.index();
                    match entry.status {
                        ServerStatus::Remove => {
                            state.servers.remove(&index);
                        }
                        ServerStatus::Up | ServerStatus::Crashed => {
                            state.servers.insert(index, entry);
                        }
                    }
                }
            }
        }

        state.version = update.version;
        tracing::info!(
            version = state.version,
            servers = state.servers.len(),
            "Server list applied"
        );
        state.version
    }
}
