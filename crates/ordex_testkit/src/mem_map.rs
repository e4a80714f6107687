//! In-memory MVCC transactional map.
//!
//! A deliberately small implementation of the `ordex_core` map contract,
//! good enough to exercise the index engine: per-transaction uncommitted
//! writes, entry locks with waiter resolution on commit/rollback, and
//! comparator-defined key order. Each slot holds at most a committed
//! version plus one pending change (an insert/replace or a delete) owned by
//! a single transaction; commits become visible immediately rather than
//! per-snapshot, which the engine under test never observes within a
//! single-threaded scan.
//!
//! Key identity is whatever the comparator says it is. Under unique key
//! identity two non-null keys with equal column prefixes share one slot,
//! so a duplicate insert collides here the way it would in a real unique
//! index map.

use ordex_core::future::{completion, OpFuture, OpPromise};
use ordex_core::{
    IndexError, IndexKey, IndexResult, KeyComparator, MutationStatus, TransactionId,
    TransactionMap, TransactionStore, Value, VersionDescriptor,
};
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

/// Key wrapper ordering a `BTreeMap` by the index comparator.
#[derive(Clone)]
struct OrdKey {
    key: IndexKey,
    comparator: KeyComparator,
}

impl OrdKey {
    fn new(key: IndexKey, comparator: KeyComparator) -> Self {
        Self { key, comparator }
    }
}

impl PartialEq for OrdKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OrdKey {}

impl PartialOrd for OrdKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrdKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.comparator.compare(&self.key, &other.key)
    }
}

/// Version bookkeeping exposed through the opaque descriptor.
struct VersionTag {
    owner: Option<TransactionId>,
}

/// One transaction's uncommitted change to a slot.
struct Pending {
    owner: TransactionId,
    /// `Some` is an insert or replacement, `None` a delete.
    key: Option<IndexKey>,
}

/// One slot of the map: a committed version, at most one pending change,
/// and removals waiting for the pending owner's transaction to resolve.
struct Entry {
    committed: Option<IndexKey>,
    pending: Option<Pending>,
    waiters: Vec<OpPromise<MutationStatus>>,
}

impl Entry {
    fn visible_key(&self, txn: Option<TransactionId>) -> Option<&IndexKey> {
        match (&self.pending, txn) {
            (Some(p), Some(t)) if p.owner == t => p.key.as_ref(),
            _ => self.committed.as_ref(),
        }
    }

    fn locked_against(&self, txn: Option<TransactionId>) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|p| Some(p.owner) != txn)
    }
}

struct MapState {
    entries: BTreeMap<OrdKey, Entry>,
    closed: bool,
}

struct Shared {
    name: String,
    comparator: KeyComparator,
    state: Mutex<MapState>,
}

type Resolution = (OpPromise<MutationStatus>, IndexResult<MutationStatus>);

impl Shared {
    /// Applies a transaction's resolution to this map, returning the waiter
    /// promises to resolve once the state lock is released.
    fn finish_transaction(&self, txn: TransactionId, commit: bool) -> Vec<Resolution> {
        let mut resolutions = Vec::new();
        let mut state = self.state.lock();
        let owned: Vec<OrdKey> = state
            .entries
            .iter()
            .filter(|(_, e)| e.pending.as_ref().is_some_and(|p| p.owner == txn))
            .map(|(k, _)| k.clone())
            .collect();
        for ord in owned {
            let Some(mut entry) = state.entries.remove(&ord) else {
                continue;
            };
            let pending = entry.pending.take();
            if commit {
                if let Some(p) = pending {
                    entry.committed = p.key;
                }
            }
            // Retried waiting removals: the first one that finds a surviving
            // version removes it, the rest find the slot already empty
            for waiter in std::mem::take(&mut entry.waiters) {
                let status = if entry.committed.is_some() {
                    entry.committed = None;
                    MutationStatus::Complete
                } else {
                    MutationStatus::AlreadyAbsent
                };
                resolutions.push((waiter, Ok(status)));
            }
            // Re-key the slot: a committed replacement may carry a different
            // trailing row ID than the key the slot was stored under
            if let Some(key) = entry.committed.clone() {
                state
                    .entries
                    .insert(OrdKey::new(key, self.comparator.clone()), entry);
            }
        }
        resolutions
    }
}

/// Handle to an in-memory map, optionally scoped to a transaction.
pub struct MemoryMap {
    shared: Arc<Shared>,
    txn: Option<TransactionId>,
}

impl MemoryMap {
    fn ord(&self, key: &IndexKey) -> OrdKey {
        OrdKey::new(key.clone(), self.shared.comparator.clone())
    }

    fn visible_keys(&self, from: Option<&IndexKey>, inclusive: bool) -> Vec<IndexKey> {
        let state = self.shared.state.lock();
        if state.closed {
            return Vec::new();
        }
        let range: Box<dyn Iterator<Item = (&OrdKey, &Entry)>> = match from {
            None => Box::new(state.entries.iter()),
            Some(key) => {
                let probe = self.ord(key);
                let lower = if inclusive {
                    Bound::Included(probe)
                } else {
                    Bound::Excluded(probe)
                };
                Box::new(state.entries.range((lower, Bound::Unbounded)))
            }
        };
        range
            .filter_map(|(_, e)| e.visible_key(self.txn).cloned())
            .collect()
    }
}

impl TransactionMap for MemoryMap {
    fn name(&self) -> &str {
        &self.shared.name
    }

    fn view(&self, txn: TransactionId) -> Arc<dyn TransactionMap> {
        Arc::new(MemoryMap {
            shared: Arc::clone(&self.shared),
            txn: Some(txn),
        })
    }

    fn insert_if_absent(&self, key: IndexKey) -> OpFuture<MutationStatus> {
        let rendered = key.to_string();
        let ord = self.ord(&key);
        let mut state = self.shared.state.lock();
        if state.closed {
            return OpFuture::failed(IndexError::StorageClosed);
        }
        match state.entries.get_mut(&ord) {
            None => {
                let entry = match self.txn {
                    Some(owner) => Entry {
                        committed: None,
                        pending: Some(Pending {
                            owner,
                            key: Some(key),
                        }),
                        waiters: Vec::new(),
                    },
                    None => Entry {
                        committed: Some(key),
                        pending: None,
                        waiters: Vec::new(),
                    },
                };
                state.entries.insert(ord, entry);
                OpFuture::succeeded(MutationStatus::Complete)
            }
            Some(entry)
                if entry.visible_key(self.txn).is_some() || entry.locked_against(self.txn) =>
            {
                OpFuture::failed(IndexError::duplicate_key(rendered))
            }
            Some(entry) => match self.txn {
                // Own pending delete: re-inserting revives the slot, possibly
                // under a different trailing row ID
                Some(owner) => {
                    entry.pending = Some(Pending {
                        owner,
                        key: Some(key),
                    });
                    OpFuture::succeeded(MutationStatus::Complete)
                }
                None => OpFuture::failed(IndexError::internal(
                    "empty slot reached through the committed view",
                )),
            },
        }
    }

    fn get(&self, key: &IndexKey) -> Option<Value> {
        let state = self.shared.state.lock();
        state
            .entries
            .get(&self.ord(key))
            .and_then(|e| e.visible_key(self.txn))
            .map(|_| Value::Null)
    }

    fn version_descriptor(&self, key: &IndexKey) -> Option<VersionDescriptor> {
        let state = self.shared.state.lock();
        state.entries.get(&self.ord(key)).map(|e| {
            Arc::new(VersionTag {
                owner: e.pending.as_ref().map(|p| p.owner),
            }) as VersionDescriptor
        })
    }

    fn is_locked(&self, descriptor: &VersionDescriptor) -> bool {
        descriptor
            .downcast_ref::<VersionTag>()
            .is_some_and(|tag| tag.owner.is_some() && tag.owner != self.txn)
    }

    fn wait_for_lock(
        &self,
        key: &IndexKey,
        _descriptor: &VersionDescriptor,
    ) -> OpFuture<MutationStatus> {
        let ord = self.ord(key);
        let mut state = self.shared.state.lock();
        match state.entries.get_mut(&ord) {
            Some(entry) if entry.locked_against(self.txn) => {
                let (promise, future) = completion();
                entry.waiters.push(promise);
                future
            }
            _ => {
                // Lock already released; retry the removal directly
                drop(state);
                OpFuture::ready(self.try_remove(key, None, false))
            }
        }
    }

    fn try_remove(
        &self,
        key: &IndexKey,
        _descriptor: Option<VersionDescriptor>,
        own_lock: bool,
    ) -> IndexResult<MutationStatus> {
        let ord = self.ord(key);
        let mut orphaned = Vec::new();
        let status = {
            let mut state = self.shared.state.lock();
            if state.closed {
                return Err(IndexError::StorageClosed);
            }
            let Some(entry) = state.entries.get_mut(&ord) else {
                return Ok(MutationStatus::AlreadyAbsent);
            };
            if entry.visible_key(self.txn).is_none() {
                return Ok(MutationStatus::AlreadyAbsent);
            }
            if entry.locked_against(self.txn) && !own_lock {
                return Err(IndexError::internal(
                    "direct removal of an entry locked by another transaction",
                ));
            }
            match self.txn {
                None => {
                    entry.committed = None;
                    if entry.pending.is_none() {
                        orphaned = std::mem::take(&mut entry.waiters);
                        state.entries.remove(&ord);
                    }
                }
                Some(owner) => {
                    let own_insert = entry
                        .pending
                        .as_ref()
                        .is_some_and(|p| p.owner == owner && p.key.is_some());
                    if own_insert && entry.committed.is_none() {
                        // Own uncommitted insert cancels out entirely
                        orphaned = std::mem::take(&mut entry.waiters);
                        state.entries.remove(&ord);
                    } else {
                        entry.pending = Some(Pending { owner, key: None });
                    }
                }
            }
            MutationStatus::Complete
        };
        // Anyone who was waiting on this slot's lock retries against an
        // empty slot; resolved outside the state lock
        for waiter in orphaned {
            waiter.succeed(MutationStatus::AlreadyAbsent);
        }
        Ok(status)
    }

    fn put_committed(&self, key: IndexKey) {
        let ord = self.ord(&key);
        let mut state = self.shared.state.lock();
        // Re-keyed insert: replace the whole slot so the stored key is the
        // one written, not whatever equal key occupied the slot before
        state.entries.remove(&ord);
        state.entries.insert(
            ord,
            Entry {
                committed: Some(key),
                pending: None,
                waiters: Vec::new(),
            },
        );
    }

    fn first_key(&self) -> Option<IndexKey> {
        self.visible_keys(None, true).into_iter().next()
    }

    fn last_key(&self) -> Option<IndexKey> {
        self.visible_keys(None, true).into_iter().next_back()
    }

    fn higher_key(&self, key: &IndexKey) -> Option<IndexKey> {
        self.visible_keys(Some(key), false).into_iter().next()
    }

    fn lower_key(&self, key: &IndexKey) -> Option<IndexKey> {
        let state = self.shared.state.lock();
        if state.closed {
            return None;
        }
        let probe = self.ord(key);
        state
            .entries
            .range((Bound::Unbounded, Bound::Excluded(probe)))
            .rev()
            .find_map(|(_, e)| e.visible_key(self.txn).cloned())
    }

    fn key_iterator(
        &self,
        from: Option<&IndexKey>,
        inclusive: bool,
    ) -> Box<dyn Iterator<Item = IndexKey> + Send> {
        Box::new(self.visible_keys(from, inclusive).into_iter())
    }

    fn len(&self) -> IndexResult<u64> {
        let state = self.shared.state.lock();
        if state.closed {
            return Err(IndexError::StorageClosed);
        }
        Ok(state
            .entries
            .values()
            .filter(|e| e.visible_key(self.txn).is_some())
            .count() as u64)
    }

    fn approximate_len(&self) -> IndexResult<u64> {
        let state = self.shared.state.lock();
        if state.closed {
            return Err(IndexError::StorageClosed);
        }
        Ok(state.entries.len() as u64)
    }

    fn disk_usage(&self) -> IndexResult<u64> {
        Ok(0)
    }

    fn memory_usage(&self) -> IndexResult<u64> {
        let state = self.shared.state.lock();
        if state.closed {
            return Err(IndexError::StorageClosed);
        }
        let per_entry: u64 = state
            .entries
            .keys()
            .next()
            .map_or(0, |k| 16 * k.key.arity() as u64);
        Ok(state.entries.len() as u64 * per_entry)
    }

    fn clear(&self) {
        let mut state = self.shared.state.lock();
        state.entries.clear();
    }

    fn drop_map(&self) {
        let mut state = self.shared.state.lock();
        state.entries.clear();
        state.closed = true;
    }

    fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }
}

/// In-memory store: a registry of named maps plus transaction bookkeeping.
#[derive(Default)]
pub struct MemoryStore {
    maps: Mutex<HashMap<String, Arc<Shared>>>,
    next_txn: AtomicU64,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            maps: Mutex::new(HashMap::new()),
            next_txn: AtomicU64::new(1),
        }
    }

    /// Starts a transaction.
    pub fn begin(&self) -> TransactionId {
        TransactionId::new(self.next_txn.fetch_add(1, AtomicOrdering::SeqCst))
    }

    /// Commits a transaction across every map, resolving waiting removals.
    pub fn commit(&self, txn: TransactionId) {
        self.finish(txn, true);
    }

    /// Rolls a transaction back across every map, resolving waiting
    /// removals against the reverted state.
    pub fn rollback(&self, txn: TransactionId) {
        self.finish(txn, false);
    }

    fn finish(&self, txn: TransactionId, commit: bool) {
        let shareds: Vec<Arc<Shared>> = self.maps.lock().values().cloned().collect();
        for shared in shareds {
            // Waiters resolve outside the map lock; their callbacks may
            // re-enter this map
            for (promise, result) in shared.finish_transaction(txn, commit) {
                promise.complete(result);
            }
        }
    }

    /// Returns true if a live (non-dropped) map with this name exists.
    #[must_use]
    pub fn contains_map(&self, name: &str) -> bool {
        self.maps
            .lock()
            .get(name)
            .is_some_and(|shared| !shared.state.lock().closed)
    }
}

impl TransactionStore for MemoryStore {
    fn open_map(
        &self,
        name: &str,
        comparator: KeyComparator,
    ) -> IndexResult<Arc<dyn TransactionMap>> {
        let fresh = || {
            Arc::new(Shared {
                name: name.to_string(),
                comparator: comparator.clone(),
                state: Mutex::new(MapState {
                    entries: BTreeMap::new(),
                    closed: false,
                }),
            })
        };
        let mut maps = self.maps.lock();
        match maps.get_mut(name) {
            // A dropped map reopens as a fresh one
            Some(existing) if existing.state.lock().closed => *existing = fresh(),
            Some(_) => {}
            None => {
                maps.insert(name.to_string(), fresh());
            }
        }
        Ok(Arc::new(MemoryMap {
            shared: Arc::clone(&maps[name]),
            txn: None,
        }))
    }
}
