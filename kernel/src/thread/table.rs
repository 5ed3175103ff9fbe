//! Thread table

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};

use spin::RwLock;

use crate::error::{Result, ScoreError};

use super::{ThreadControl, ThreadId};

/// All threads of the system, idle threads included
pub struct ThreadTable {
    threads: RwLock<BTreeMap<ThreadId, Arc<ThreadControl>>>,
    next_id: AtomicU32,
    /// Limit on non-idle threads
    maximum: usize,
}

impl ThreadTable {
    pub fn new(maximum: usize) -> Self {
        Self {
            threads: RwLock::new(BTreeMap::new()),
            next_id: AtomicU32::new(1),
            maximum,
        }
    }

    pub(crate) fn allocate_id(&self) -> ThreadId {
        loop {
            let raw = self.next_id.fetch_add(1, Ordering::Relaxed);
            if let Some(id) = ThreadId::from_raw(raw) {
                if !self.threads.read().contains_key(&id) {
                    return id;
                }
            }
        }
    }

    /// Number of non-idle threads
    pub fn user_count(&self) -> usize {
        self.threads.read().values().filter(|thread| !thread.is_idle()).count()
    }

    pub fn has_room(&self) -> bool {
        self.user_count() < self.maximum
    }

    pub(crate) fn insert(&self, thread: Arc<ThreadControl>) -> Result<()> {
        let mut threads = self.threads.write();
        let users = threads.values().filter(|thread| !thread.is_idle()).count();
        if !thread.is_idle() && users >= self.maximum {
            return Err(ScoreError::TooMany);
        }
        threads.insert(thread.id(), thread);
        Ok(())
    }

    pub(crate) fn remove(&self, id: ThreadId) -> Option<Arc<ThreadControl>> {
        self.threads.write().remove(&id)
    }

    /// Any thread, idle threads included
    pub fn get(&self, id: ThreadId) -> Result<Arc<ThreadControl>> {
        self.threads.read().get(&id).cloned().ok_or(ScoreError::InvalidId)
    }

    /// A thread directives may act on (idle threads are not)
    pub fn get_user(&self, id: ThreadId) -> Result<Arc<ThreadControl>> {
        let thread = self.get(id)?;
        if thread.is_idle() {
            return Err(ScoreError::InvalidId);
        }
        Ok(thread)
    }

    pub fn snapshot(&self) -> Vec<Arc<ThreadControl>> {
        self.threads.read().values().cloned().collect()
    }

    /// Visit every thread until `visitor` returns `true`
    ///
    /// The table lock is not held while visiting, so the visitor may take
    /// the thread locks. Returns whether the walk stopped early.
    pub fn iterate<F>(&self, mut visitor: F) -> bool
    where
        F: FnMut(&ThreadControl) -> bool,
    {
        self.snapshot().iter().any(|thread| visitor(thread))
    }

    pub fn len(&self) -> usize {
        self.threads.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
