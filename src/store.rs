use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info, warn};

use crate::error::StoreError;
use crate::models::SubscriberId;

/// Durable set of subscribed chats, flushed to a JSON array on every mutation.
///
/// The lock covers both the in-memory change and the file write, so a
/// subscribe arriving mid-dispatch can neither lose an update nor see a
/// half-written file. If a flush fails the in-memory set stays authoritative
/// and the next mutation tries again.
///
/// Every `add` stamps the id with a fresh generation. Removal is conditional
/// on a [`Snapshot`] generation, so a chat that subscribes again after the
/// snapshot was taken is never dropped by a stale batch.
pub struct SubscriberStore {
    path: PathBuf,
    state: Mutex<StoreState>,
}

#[derive(Default)]
struct StoreState {
    subscribers: BTreeSet<SubscriberId>,
    // Generation of the last add per id; ids loaded from disk have none
    stamps: HashMap<SubscriberId, u64>,
    generation: u64,
    dirty: bool,
}

/// Subscribers as of one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub subscribers: BTreeSet<SubscriberId>,
    pub generation: u64,
}

impl SubscriberStore {
    // Load subscribers from file, starting empty if it's missing or unreadable
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let subscribers = Self::read_file(&path);
        info!(path = %path.display(), subscribers = subscribers.len(), "Loaded subscriber store");
        SubscriberStore {
            path,
            state: Mutex::new(StoreState {
                subscribers,
                ..Default::default()
            }),
        }
    }

    fn read_file(path: &Path) -> BTreeSet<SubscriberId> {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeSet::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot read subscribers, starting empty");
                return BTreeSet::new();
            }
        };

        match serde_json::from_str::<Vec<SubscriberId>>(&data) {
            Ok(ids) => ids.into_iter().collect(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Malformed subscriber file, starting empty");
                BTreeSet::new()
            }
        }
    }

    /// Returns `Ok(true)` if `id` was not subscribed before.
    ///
    /// On `Err` the id is still held in memory; only the file is behind.
    pub fn add(&self, id: SubscriberId) -> Result<bool, StoreError> {
        let mut state = self.lock();
        state.generation += 1;
        let generation = state.generation;
        state.stamps.insert(id, generation);
        let inserted = state.subscribers.insert(id);
        if inserted || state.dirty {
            self.flush(&mut state)?;
        }
        if inserted {
            debug!(%id, "Subscriber added");
        }
        Ok(inserted)
    }

    // Drop chats that can no longer receive messages, unless they were
    // added again after `since`
    pub fn remove_all(&self, ids: &[SubscriberId], since: u64) -> Result<usize, StoreError> {
        let mut state = self.lock();
        let before = state.subscribers.len();
        for id in ids {
            if state.stamps.get(id).is_some_and(|&stamp| stamp > since) {
                debug!(%id, "Subscribed again during dispatch, keeping");
                continue;
            }
            state.subscribers.remove(id);
            state.stamps.remove(id);
        }
        let removed = before - state.subscribers.len();
        if removed > 0 || state.dirty {
            self.flush(&mut state)?;
        }
        Ok(removed)
    }

    pub fn all(&self) -> BTreeSet<SubscriberId> {
        self.lock().subscribers.clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.lock();
        Snapshot {
            subscribers: state.subscribers.clone(),
            generation: state.generation,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().subscribers.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn flush(&self, state: &mut StoreState) -> Result<(), StoreError> {
        match Self::write_atomically(&self.path, &state.subscribers) {
            Ok(()) => {
                state.dirty = false;
                Ok(())
            }
            Err(e) => {
                state.dirty = true;
                error!(path = %self.path.display(), error = %e, "Failed to persist subscribers");
                Err(e)
            }
        }
    }

    // Write to a sibling temp file and rename over the original
    fn write_atomically(path: &Path, subscribers: &BTreeSet<SubscriberId>) -> Result<(), StoreError> {
        let io_err = |source: std::io::Error| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(io_err)?;
        }

        let data = serde_json::to_string_pretty(subscribers)?;
        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let mut file = fs::File::create(&tmp_path).map_err(io_err)?;
        file.write_all(data.as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);

        fs::rename(&tmp_path, path).map_err(io_err)
    }
}
