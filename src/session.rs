//! Render session state.
//!
//! Several expansions of one render may run on different threads. They share
//! three things: the master-node registry used to detect instances, the set
//! of node names already handed out, and the cache of open archives. All
//! three live behind one `parking_lot::Mutex` owned by a [`RenderSession`];
//! everything else a shape builder does is local to its call.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::scene::SceneGraph;
use crate::util::{Chrono, Result};

/// Key identifying a shape's data across instances.
pub fn shape_key(archive: &Path, object_path: &str, render_time: Chrono) -> String {
    format!("{}:{object_path}@{render_time}", archive.display())
}

struct CachedArchive {
    graph: Arc<SceneGraph>,
    refs: usize,
}

#[derive(Default)]
struct Registry {
    masters: HashMap<String, String>,
    names: HashSet<String>,
    archives: HashMap<PathBuf, CachedArchive>,
}

/// Cross-expansion state of one render.
#[derive(Default)]
pub struct RenderSession {
    registry: Mutex<Registry>,
}

impl RenderSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node name already emitted for `key`, if any.
    pub fn master_node(&self, key: &str) -> Option<String> {
        self.registry.lock().masters.get(key).cloned()
    }

    /// Record `name` as the master node of `key`.
    ///
    /// The first registration wins; the registered name is returned so a
    /// thread that lost the race can instance the winner.
    pub fn register_master(&self, key: &str, name: &str) -> String {
        self.registry
            .lock()
            .masters
            .entry(key.to_owned())
            .or_insert_with(|| name.to_owned())
            .clone()
    }

    /// `base`, or `base_N` with the first free N.
    pub fn unique_name(&self, base: &str) -> String {
        let mut reg = self.registry.lock();
        if reg.names.insert(base.to_owned()) {
            return base.to_owned();
        }
        let mut n = 1usize;
        loop {
            let candidate = format!("{base}_{n}");
            if reg.names.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Shared handle on the archive at `path`, opening it on first use.
    ///
    /// `open` runs under the session lock so an archive is only ever opened
    /// once. Every successful call must be paired with [`release_archive`].
    ///
    /// [`release_archive`]: Self::release_archive
    pub fn acquire_archive<F>(&self, path: impl AsRef<Path>, open: F) -> Result<Arc<SceneGraph>>
    where
        F: FnOnce(&Path) -> Result<SceneGraph>,
    {
        let path = path.as_ref();
        let mut reg = self.registry.lock();
        if let Some(entry) = reg.archives.get_mut(path) {
            entry.refs += 1;
            return Ok(Arc::clone(&entry.graph));
        }
        let graph = Arc::new(open(path)?);
        tracing::debug!("Opened archive {}", path.display());
        reg.archives.insert(
            path.to_path_buf(),
            CachedArchive {
                graph: Arc::clone(&graph),
                refs: 1,
            },
        );
        Ok(graph)
    }

    /// Drop one reference; the archive is closed when none are left.
    ///
    /// Returns `true` when this call closed it.
    pub fn release_archive(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let mut reg = self.registry.lock();
        let Some(entry) = reg.archives.get_mut(path) else {
            tracing::warn!("Releasing archive {} that is not open", path.display());
            return false;
        };
        entry.refs -= 1;
        if entry.refs == 0 {
            reg.archives.remove(path);
            tracing::debug!("Closed archive {}", path.display());
            true
        } else {
            false
        }
    }

    /// Current reference count of an archive (0 when closed).
    pub fn archive_refs(&self, path: impl AsRef<Path>) -> usize {
        self.registry
            .lock()
            .archives
            .get(path.as_ref())
            .map_or(0, |e| e.refs)
    }

    /// Forget everything, e.g. at the end of a render.
    pub fn clear(&self) {
        let mut reg = self.registry.lock();
        if !reg.archives.is_empty() {
            tracing::warn!("{} archive(s) still open at session end", reg.archives.len());
        }
        *reg = Registry::default();
    }
}

/// Shapes already emitted during one traversal.
///
/// A master shape referenced by several instances is built once; later
/// visits get the node name it was emitted as.
#[derive(Debug, Default)]
pub struct FrameMemo {
    frame: Option<Chrono>,
    processed: HashMap<String, String>,
}

impl FrameMemo {
    pub fn new(frame: Chrono) -> Self {
        Self {
            frame: Some(frame),
            processed: HashMap::new(),
        }
    }

    /// Start over for `frame` when it differs from the current one.
    pub fn begin_frame(&mut self, frame: Chrono) {
        if self.frame != Some(frame) {
            self.frame = Some(frame);
            self.processed.clear();
        }
    }

    /// Node name `path` was emitted as this frame.
    pub fn processed(&self, path: &str) -> Option<&str> {
        self.processed.get(path).map(String::as_str)
    }

    /// Record `path` as emitted; `false` when it already was.
    pub fn mark(&mut self, path: &str, node_name: &str) -> bool {
        if self.processed.contains_key(path) {
            return false;
        }
        self.processed.insert(path.to_owned(), node_name.to_owned());
        true
    }

    pub fn len(&self) -> usize {
        self.processed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }
}
