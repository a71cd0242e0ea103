use std::collections::HashSet;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use uuid::Uuid;

use crate::errors::{LedgerError, Result};

/// single-writer-per-entity lock table.
///
/// A caller takes every entity it touches at once, or none of them, so two
/// callers can never hold a lock the other waits on.
#[derive(Debug, Default)]
pub struct EntityLocks {
    held: Mutex<HashSet<Uuid>>,
    released: Condvar,
}

/// releases its entities when dropped
#[derive(Debug)]
pub struct EntityGuard<'a> {
    locks: &'a EntityLocks,
    ids: Vec<Uuid>,
}

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, ids: &[Uuid], timeout: Duration) -> Result<EntityGuard<'_>> {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let deadline = Instant::now() + timeout;
        let mut held = self.held.lock();
        loop {
            let busy = ids.iter().copied().find(|id| held.contains(id));
            match busy {
                None => {
                    held.extend(ids.iter().copied());
                    return Ok(EntityGuard { locks: self, ids });
                }
                Some(entity) => {
                    if self.released.wait_until(&mut held, deadline).timed_out() {
                        return Err(LedgerError::ConcurrentMutation {
                            entity,
                            message: format!("lock not released within {:?}", timeout),
                        });
                    }
                }
            }
        }
    }

    pub fn is_held(&self, id: Uuid) -> bool {
        self.held.lock().contains(&id)
    }
}

impl EntityGuard<'_> {
    pub fn entities(&self) -> &[Uuid] {
        &self.ids
    }
}

impl Drop for EntityGuard<'_> {
    fn drop(&mut self) {
        let mut held = self.locks.held.lock();
        for id in &self.ids {
            held.remove(id);
        }
        drop(held);
        self.locks.released.notify_all();
    }
}
