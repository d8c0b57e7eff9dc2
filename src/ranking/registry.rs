use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use parking_lot::{Mutex, RwLock};
use crate::ranking::resolver::IndexRangeResolver;
use crate::ranking::worker::WorkerHandle;

/// Lifecycle of one ranking shard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShardState {
    Unloaded,
    Loading,
    Ready,
    Failed(String),
}

/// A shard that can serve queries
#[derive(Clone)]
pub struct ReadyShard {
    pub id: String,
    pub worker: Arc<WorkerHandle>,
    pub resolver: Arc<IndexRangeResolver>,
}

struct ShardEntry {
    state: ShardState,
    device: Option<u32>,
    worker: Option<Arc<WorkerHandle>>,
    resolver: Option<Arc<IndexRangeResolver>>,
}

/// Owns worker handles, shard states and per-device shard counts.
///
/// Every attach and detach goes through these methods; the maps are never
/// handed out. A shard's device stays reserved for as long as its entry
/// holds it.
pub struct ShardRegistry {
    entries: RwLock<BTreeMap<String, ShardEntry>>,
    loading: Mutex<BTreeSet<String>>,
    devices: Vec<u32>,
    device_load: Mutex<BTreeMap<u32, usize>>,
}

impl ShardRegistry {
    pub fn new(devices: Vec<u32>) -> Self {
        let device_load = devices.iter().map(|&d| (d, 0)).collect();
        ShardRegistry {
            entries: RwLock::new(BTreeMap::new()),
            loading: Mutex::new(BTreeSet::new()),
            devices,
            device_load: Mutex::new(device_load),
        }
    }

    /// Reserve the device with the fewest shards (lowest id on ties), or
    /// `None` when no devices are configured
    pub fn assign_device(&self) -> Option<u32> {
        if self.devices.is_empty() {
            return None;
        }
        let mut load = self.device_load.lock();
        let (&device, count) = load.iter_mut().min_by_key(|(device, count)| (**count, **device))?;
        *count += 1;
        Some(device)
    }

    pub fn release_device(&self, device: Option<u32>) {
        if let Some(device) = device {
            if let Some(count) = self.device_load.lock().get_mut(&device) {
                *count = count.saturating_sub(1);
            }
        }
    }

    pub fn device_load(&self, device: u32) -> usize {
        self.device_load.lock().get(&device).copied().unwrap_or(0)
    }

    /// Flag a shard as loading. Only visible while no entry exists yet, so
    /// a shard being replaced keeps serving until the swap.
    pub fn begin_loading(&self, id: &str) {
        self.loading.lock().insert(id.to_string());
    }

    /// Swap in a loaded shard, returning the worker it replaces
    pub fn install_ready(&self, id: &str, device: Option<u32>, worker: Arc<WorkerHandle>,
                         resolver: Arc<IndexRangeResolver>) -> Option<Arc<WorkerHandle>> {
        self.replace(id, ShardEntry {
            state: ShardState::Ready,
            device,
            worker: Some(worker),
            resolver: Some(resolver),
        })
    }

    /// Record a failed load. Any previous shard under the id is evicted and
    /// its worker returned for shutdown.
    pub fn install_failed(&self, id: &str, reason: String) -> Option<Arc<WorkerHandle>> {
        self.replace(id, ShardEntry {
            state: ShardState::Failed(reason),
            device: None,
            worker: None,
            resolver: None,
        })
    }

    fn replace(&self, id: &str, entry: ShardEntry) -> Option<Arc<WorkerHandle>> {
        self.loading.lock().remove(id);
        let previous = self.entries.write().insert(id.to_string(), entry)?;
        self.release_device(previous.device);
        previous.worker
    }

    /// Forget a shard entirely, returning its worker for shutdown
    pub fn remove(&self, id: &str) -> Option<Arc<WorkerHandle>> {
        self.loading.lock().remove(id);
        let entry = self.entries.write().remove(id)?;
        self.release_device(entry.device);
        entry.worker
    }

    pub fn state(&self, id: &str) -> ShardState {
        if let Some(entry) = self.entries.read().get(id) {
            return entry.state.clone();
        }
        if self.loading.lock().contains(id) {
            return ShardState::Loading;
        }
        ShardState::Unloaded
    }

    /// Ready shards, optionally restricted to `subset`, in id order
    pub fn ready_shards(&self, subset: Option<&[String]>) -> Vec<ReadyShard> {
        self.entries.read()
            .iter()
            .filter(|(id, _)| subset.is_none_or(|ids| ids.contains(id)))
            .filter_map(|(id, entry)| match (&entry.state, &entry.worker, &entry.resolver) {
                (ShardState::Ready, Some(worker), Some(resolver)) => Some(ReadyShard {
                    id: id.clone(),
                    worker: Arc::clone(worker),
                    resolver: Arc::clone(resolver),
                }),
                _ => None,
            })
            .collect()
    }

    pub fn ready_count(&self) -> usize {
        self.entries.read()
            .values()
            .filter(|entry| entry.state == ShardState::Ready)
            .count()
    }

    pub fn shard_ids(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }
}
