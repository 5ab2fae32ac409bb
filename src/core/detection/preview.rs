use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

/// Registry of live image previews (the local object URLs the view shows).
#[derive(Clone, Default)]
pub struct PreviewStore {
    live: Arc<Mutex<HashSet<Uuid>>>,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a preview. It is revoked when the handle is dropped.
    pub fn allocate(&self, file_name: &str) -> PreviewHandle {
        let id = Uuid::new_v4();
        lock(&self.live).insert(id);
        tracing::debug!(%id, "[PreviewStore] allocated preview for {}", file_name);
        PreviewHandle {
            id,
            live: self.live.clone(),
        }
    }

    pub fn live_count(&self) -> usize {
        lock(&self.live).len()
    }

    pub fn is_live(&self, id: Uuid) -> bool {
        lock(&self.live).contains(&id)
    }
}

/// Owned preview resource.
#[derive(Debug)]
pub struct PreviewHandle {
    id: Uuid,
    live: Arc<Mutex<HashSet<Uuid>>>,
}

impl PreviewHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Address the view layer renders the preview from
    pub fn url(&self) -> String {
        format!("preview://{}", self.id)
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        lock(&self.live).remove(&self.id);
        tracing::debug!(id = %self.id, "[PreviewStore] revoked preview");
    }
}

fn lock(live: &Mutex<HashSet<Uuid>>) -> MutexGuard<'_, HashSet<Uuid>> {
    match live.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("[PreviewStore] mutex poisoned, recovering...");
            poisoned.into_inner()
        }
    }
}
