//! The product store: one collection, one backing JSON document.
//!
//! The store hands out snapshots ([`load`](ProductStore::load)), takes them
//! back ([`save`](ProductStore::save)) and knows how to number new records.
//! Callers that need load-modify-save to be atomic go through
//! [`transact`](ProductStore::transact), which serializes all such scopes.

use crate::error::{Error, Result};
use crate::flush::{AsyncFlushWorker, FlushPolicy};
use crate::persist::{atomic_write, load};
use crate::record::{Collection, Record};
use crate::serializer::{JsonSerializer, Serializer};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::SyncSender;
use std::sync::Arc;

/// How new records get their `id`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum IdStrategy {
    /// One past the largest id in the collection. Never reuses an id that is
    /// still present, even after deletes.
    #[default]
    MaxPlusOne,
    /// `len(collection) + 1`. Compatible with older deployments, but a delete
    /// followed by a create can hand out an id that is already taken.
    Length,
}

/// What a [`transact`](ProductStore::transact) body wants done with the
/// collection it was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commit<T> {
    /// The collection changed; persist it.
    Save(T),
    /// Nothing to persist.
    Skip(T),
}

impl<T> Commit<T> {
    fn into_parts(self) -> (T, bool) {
        match self {
            Commit::Save(v) => (v, true),
            Commit::Skip(v) => (v, false),
        }
    }
}

/// File-backed product collection.
///
/// Use [`builder`](Self::builder) to configure and open one. Reads and writes
/// are safe to call from many threads, but plain `load` + `save` pairs can
/// still interleave and lose updates; use [`transact`](Self::transact) when
/// that matters.
pub struct ProductStore {
    pub(crate) records: Arc<Mutex<Collection>>,
    pub(crate) doc: Arc<Document>,
    pub(crate) policy: FlushPolicy,
    pub(crate) ids: IdStrategy,
    pub(crate) trigger: Option<SyncSender<()>>,
    txn: Mutex<()>,
}

impl ProductStore {
    /// Open (or create) a store at `path` with the default settings:
    /// immediate writes, indented JSON, max-plus-one ids.
    pub fn open(path: impl AsRef<Path>) -> Result<StoreHandle> {
        Self::builder(path).build()
    }

    /// Open with a specific flush policy. Shorthand for
    /// `builder(path).policy(p).build()`.
    pub fn open_with_policy(
        path: impl AsRef<Path>,
        policy: FlushPolicy,
    ) -> Result<StoreHandle> {
        Self::builder(path).policy(policy).build()
    }

    /// Start configuring a new store. Call [`.build()`](StoreBuilder::build)
    /// when ready.
    pub fn builder(path: impl AsRef<Path>) -> StoreBuilder {
        StoreBuilder::new(path)
    }

    /// Current snapshot of the collection.
    ///
    /// Never fails: a missing, unreadable or corrupt document is replaced
    /// with an empty array and an empty collection is returned.
    #[must_use]
    pub fn load(&self) -> Collection {
        if !self.policy.reads_from_disk() {
            return self.records.lock().clone();
        }
        match self.doc.read() {
            Ok(Some(records)) => {
                *self.records.lock() = records.clone();
                records
            }
            // Resetting happens inside the write scope, after a second read,
            // so a create committed in between is never replaced by `[]`.
            _ => {
                let _scope = self.txn.lock();
                self.current()
            }
        }
    }

    /// Snapshot for a caller already holding `txn`.
    fn current(&self) -> Collection {
        if !self.policy.reads_from_disk() {
            return self.records.lock().clone();
        }
        let fresh = self.doc.read_or_reset();
        *self.records.lock() = fresh.clone();
        fresh
    }

    /// Replace the collection with `records` and persist it according to the
    /// flush policy. The in-memory copy is updated even if the write fails.
    pub fn save(&self, records: &Collection) -> Result<()> {
        *self.records.lock() = records.clone();
        match &self.policy {
            FlushPolicy::Immediate => self.doc.write(records),
            FlushPolicy::Async(_) => {
                if let Some(t) = &self.trigger {
                    let _ = t.try_send(());
                }
                Ok(())
            }
            FlushPolicy::Manual => Ok(()),
        }
    }

    /// Identifier for the next record created in `records`.
    ///
    /// Under [`IdStrategy::MaxPlusOne`], once `u64::MAX` is taken the
    /// smallest unused positive id is handed out instead.
    #[must_use]
    pub fn next_id(&self, records: &[Record]) -> u64 {
        match self.ids {
            IdStrategy::Length => records.len() as u64 + 1,
            IdStrategy::MaxPlusOne => {
                let max = records.iter().filter_map(Record::id).max().unwrap_or(0);
                max.checked_add(1).unwrap_or_else(|| lowest_free_id(records))
            }
        }
    }

    /// Index of the first record whose `id` equals `id`.
    #[must_use]
    pub fn find(records: &[Record], id: u64) -> Option<usize> {
        records.iter().position(|r| r.id() == Some(id))
    }

    /// Run `f` against a fresh snapshot while holding the store's write scope,
    /// then persist if `f` returns [`Commit::Save`].
    ///
    /// Persistence is best-effort: a failed write is logged and `f`'s result
    /// is returned anyway.
    pub fn transact<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&mut Collection) -> Commit<T>,
    {
        let _scope = self.txn.lock();
        let mut records = self.current();
        let (out, dirty) = f(&mut records).into_parts();
        if dirty {
            if let Err(e) = self.save(&records) {
                tracing::error!(
                    path = %self.doc.path.display(),
                    "failed to persist products: {e}"
                );
            }
        }
        out
    }

    /// Write the in-memory collection to disk now, regardless of policy.
    pub fn flush(&self) -> Result<()> {
        let records = self.records.lock().clone();
        self.doc.write(&records)
    }

    /// Path to the backing JSON document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.doc.path
    }

    /// The flush policy this store was opened with.
    #[must_use]
    pub fn policy(&self) -> &FlushPolicy {
        &self.policy
    }

    /// The identifier strategy this store was opened with.
    #[must_use]
    pub fn id_strategy(&self) -> IdStrategy {
        self.ids
    }
}

impl std::fmt::Debug for ProductStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductStore")
            .field("path", &self.doc.path)
            .field("policy", &self.policy)
            .field("ids", &self.ids)
            .finish_non_exhaustive()
    }
}

fn lowest_free_id(records: &[Record]) -> u64 {
    let taken: HashSet<u64> = records.iter().filter_map(Record::id).collect();
    // len + 1 candidates for at most len taken ids, so one is always free.
    (1..=records.len() as u64 + 1)
        .find(|id| !taken.contains(id))
        .unwrap_or(1)
}

/// The backing document. Every write to it, including resets, goes through
/// `write_lock`, so writers never share `<file>.tmp` at the same time.
pub(crate) struct Document {
    pub(crate) path: PathBuf,
    serializer: JsonSerializer,
    write_lock: Mutex<()>,
}

impl Document {
    fn new(path: PathBuf, serializer: JsonSerializer) -> Self {
        Self {
            path,
            serializer,
            write_lock: Mutex::new(()),
        }
    }

    fn read(&self) -> Result<Option<Collection>> {
        load(&self.path, &self.serializer)
    }

    /// Read the document; a missing or corrupt one is replaced with `[]`.
    fn read_or_reset(&self) -> Collection {
        match self.read() {
            Ok(Some(records)) => records,
            Ok(None) => {
                tracing::info!(
                    path = %self.path.display(),
                    "no product document yet, creating an empty one"
                );
                self.reset();
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    "unreadable product document, resetting to empty: {e}"
                );
                self.reset();
                Vec::new()
            }
        }
    }

    fn reset(&self) {
        if let Err(e) = self.write(&[]) {
            tracing::error!(
                path = %self.path.display(),
                "failed to initialize product document: {e}"
            );
        }
    }

    fn write(&self, records: &[Record]) -> Result<()> {
        let bytes = self.serializer.serialize(records)?;
        let _guard = self.write_lock.lock();
        atomic_write(&self.path, &bytes)
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures and opens a [`ProductStore`].
///
/// ```rust,no_run
/// use json_products::{FlushPolicy, IdStrategy, ProductStore};
///
/// let store = ProductStore::builder("data.json")
///     .policy(FlushPolicy::Immediate)
///     .id_strategy(IdStrategy::MaxPlusOne)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug)]
pub struct StoreBuilder {
    path: PathBuf,
    policy: FlushPolicy,
    pretty: bool,
    ids: IdStrategy,
}

impl StoreBuilder {
    fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            policy: FlushPolicy::Immediate,
            pretty: true,
            ids: IdStrategy::MaxPlusOne,
        }
    }

    /// Set the flush policy (default: [`FlushPolicy::Immediate`]).
    pub fn policy(mut self, policy: FlushPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Write indented JSON (default: `true`).
    pub fn pretty(mut self, yes: bool) -> Self {
        self.pretty = yes;
        self
    }

    /// Choose how new ids are assigned (default: [`IdStrategy::MaxPlusOne`]).
    pub fn id_strategy(mut self, ids: IdStrategy) -> Self {
        self.ids = ids;
        self
    }

    /// Load (or create) the backing document and return a handle.
    pub fn build(self) -> Result<StoreHandle> {
        if self.path.as_os_str().is_empty() {
            return Err(Error::Config("store path is empty".into()));
        }
        if let FlushPolicy::Async(interval) = &self.policy {
            if interval.is_zero() {
                return Err(Error::Config("async flush interval must be non-zero".into()));
            }
        }

        let serializer = if self.pretty {
            JsonSerializer::pretty()
        } else {
            JsonSerializer::new()
        };

        let doc = Arc::new(Document::new(self.path, serializer));
        let records = Arc::new(Mutex::new(doc.read_or_reset()));

        let (worker, trigger) = match &self.policy {
            FlushPolicy::Async(interval) => {
                let (tx, rx) = std::sync::mpsc::sync_channel(0);
                let records = Arc::clone(&records);
                let doc = Arc::clone(&doc);
                let w = AsyncFlushWorker::spawn(
                    *interval,
                    move || {
                        let snapshot = records.lock().clone();
                        if let Err(e) = doc.write(&snapshot) {
                            tracing::error!(
                                path = %doc.path.display(),
                                "background flush failed: {e}"
                            );
                        }
                    },
                    rx,
                );
                (Some(w), Some(tx))
            }
            _ => (None, None),
        };

        tracing::debug!(
            path = %doc.path.display(),
            policy = ?self.policy,
            ids = ?self.ids,
            "product store opened"
        );

        let store = ProductStore {
            records,
            doc,
            policy: self.policy,
            ids: self.ids,
            trigger,
            txn: Mutex::new(()),
        };

        Ok(StoreHandle {
            inner: Arc::new(store),
            worker,
        })
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Owns the store and (for async policy) the background flush thread.
///
/// Derefs to [`ProductStore`]. Dropping it stops the background thread after
/// one last flush.
pub struct StoreHandle {
    pub(crate) inner: Arc<ProductStore>,
    #[allow(dead_code)]
    pub(crate) worker: Option<AsyncFlushWorker>,
}

impl std::ops::Deref for StoreHandle {
    type Target = ProductStore;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&*self.inner, f)
    }
}
