use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

use crate::error::Result;
use crate::outcome::Outcome;
use crate::stats::Totals;

/// Durable cumulative counters.
///
/// Requests are returned as futures so the caller decides when (and whether)
/// to wait for them. `subscribe` yields the current totals and every change.
pub trait StatsStore: Send + Sync {
    fn increment(&self, outcome: Outcome) -> BoxFuture<'static, Result<()>>;

    /// Sets every counter back to zero.
    fn reset(&self) -> BoxFuture<'static, Result<()>>;

    fn subscribe(&self) -> watch::Receiver<Totals>;
}

/// Totals that live as long as the process.
#[derive(Clone)]
pub struct MemoryStore {
    totals: Arc<watch::Sender<Totals>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_totals(Totals::default())
    }

    pub fn with_totals(totals: Totals) -> Self {
        let (sender, _) = watch::channel(totals);
        Self {
            totals: Arc::new(sender),
        }
    }

    pub fn totals(&self) -> Totals {
        *self.totals.borrow()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsStore for MemoryStore {
    fn increment(&self, outcome: Outcome) -> BoxFuture<'static, Result<()>> {
        let totals = self.totals.clone();
        async move {
            totals.send_modify(|t| t.record(outcome));
            Ok(())
        }
        .boxed()
    }

    fn reset(&self) -> BoxFuture<'static, Result<()>> {
        let totals = self.totals.clone();
        async move {
            totals.send_replace(Totals::default());
            Ok(())
        }
        .boxed()
    }

    fn subscribe(&self) -> watch::Receiver<Totals> {
        self.totals.subscribe()
    }
}

/// Totals persisted as a small JSON document, rewritten on every change.
#[derive(Clone)]
pub struct JsonFileStore {
    path: Arc<PathBuf>,
    totals: Arc<watch::Sender<Totals>>,
    // Serializes read-modify-write so concurrent increments are not lost.
    write_lock: Arc<Mutex<()>>,
}

impl JsonFileStore {
    /// Loads existing totals from `path`; a missing file starts from zero.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let totals = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == ErrorKind::NotFound => Totals::default(),
            Err(err) => return Err(err.into()),
        };
        debug!(path = %path.display(), ?totals, "opened stats file");
        let (sender, _) = watch::channel(totals);
        Ok(Self {
            path: Arc::new(path),
            totals: Arc::new(sender),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn update<F>(&self, apply: F) -> BoxFuture<'static, Result<()>>
    where
        F: FnOnce(&mut Totals) + Send + 'static,
    {
        let path = self.path.clone();
        let totals = self.totals.clone();
        let write_lock = self.write_lock.clone();
        async move {
            let _guard = write_lock.lock().await;
            let mut next = *totals.borrow();
            apply(&mut next);
            let bytes = serde_json::to_vec_pretty(&next)?;
            // Write beside the target and swap it in, so a torn write never
            // replaces a good file.
            let staging = staging_path(&path);
            tokio::fs::write(&staging, bytes).await?;
            tokio::fs::rename(&staging, path.as_path()).await?;
            totals.send_replace(next);
            Ok(())
        }
        .boxed()
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    PathBuf::from(staging)
}

/// Opens the stats file at `path`, or keeps totals in memory when there is
/// no path or the file cannot be loaded. Saved totals are best-effort.
pub async fn open_or_memory(path: Option<&Path>) -> Arc<dyn StatsStore> {
    let Some(path) = path else {
        return Arc::new(MemoryStore::new());
    };
    match JsonFileStore::open(path).await {
        Ok(store) => Arc::new(store),
        Err(err) => {
            warn!(path = %path.display(), %err, "saved stats unavailable, keeping totals in memory");
            Arc::new(MemoryStore::new())
        }
    }
}

impl StatsStore for JsonFileStore {
    fn increment(&self, outcome: Outcome) -> BoxFuture<'static, Result<()>> {
        self.update(move |t| t.record(outcome))
    }

    fn reset(&self) -> BoxFuture<'static, Result<()>> {
        self.update(|t| *t = Totals::default())
    }

    fn subscribe(&self) -> watch::Receiver<Totals> {
        self.totals.subscribe()
    }
}
