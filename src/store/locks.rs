use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per document path.
///
/// Holding the guard across read -> modify -> write keeps two overlapping
/// mutations in this process from clobbering each other. Other processes are
/// not covered.
#[derive(Default)]
pub struct DocumentLocks {
    inner: Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>,
}

impl DocumentLocks {
    pub async fn acquire(&self, path: &Path) -> OwnedMutexGuard<()> {
        let lock = {
            let mut guard = match self.inner.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard
                .entry(path.to_path_buf())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
