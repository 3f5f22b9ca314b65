//! Bounded pool of exclusively owned network clones.

use angmon_core::{AngmonError, AngmonResult, Network};
use parking_lot::{Condvar, Mutex};
use std::ops::{Deref, DerefMut};

/// Hands out network clones one task at a time.
///
/// Every clone is reset to the template when acquired, so a task always
/// starts from the pristine input network whatever the previous holder did
/// to it. Clones go back to the pool when the guard is dropped, including
/// while unwinding from a panic.
pub struct NetworkPool {
    template: Network,
    idle: Mutex<Vec<Network>>,
    returned: Condvar,
    capacity: usize,
}

impl NetworkPool {
    pub fn new(template: &Network, capacity: usize) -> AngmonResult<Self> {
        if capacity == 0 {
            return Err(AngmonError::Config(
                "network pool needs at least one clone".to_string(),
            ));
        }
        let clones = (0..capacity).map(|_| template.clone()).collect();
        Ok(Self {
            template: template.clone(),
            idle: Mutex::new(clones),
            returned: Condvar::new(),
            capacity,
        })
    }

    /// Block until a clone is free.
    pub fn acquire(&self) -> PooledNetwork<'_> {
        let mut idle = self.idle.lock();
        let mut network = loop {
            if let Some(network) = idle.pop() {
                break network;
            }
            self.returned.wait(&mut idle);
        };
        drop(idle);
        network.clone_from(&self.template);
        PooledNetwork {
            pool: self,
            network: Some(network),
        }
    }

    pub fn try_acquire(&self) -> Option<PooledNetwork<'_>> {
        let mut network = self.idle.lock().pop()?;
        network.clone_from(&self.template);
        Some(PooledNetwork {
            pool: self,
            network: Some(network),
        })
    }

    /// Clones currently not borrowed.
    pub fn available(&self) -> usize {
        self.idle.lock().len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn release(&self, network: Network) {
        self.idle.lock().push(network);
        self.returned.notify_one();
    }
}

/// Scoped borrow of a pooled clone.
pub struct PooledNetwork<'a> {
    pool: &'a NetworkPool,
    network: Option<Network>,
}

impl PooledNetwork<'_> {
    /// Bring the clone back to the template between two uses.
    pub fn reset(&mut self) {
        let pool = self.pool;
        match self.network.as_mut() {
            Some(network) => network.clone_from(&pool.template),
            None => self.network = Some(pool.template.clone()),
        }
    }
}

impl Deref for PooledNetwork<'_> {
    type Target = Network;

    fn deref(&self) -> &Network {
        // only emptied in drop
        self.network.as_ref().unwrap_or(&self.pool.template)
    }
}

impl DerefMut for PooledNetwork<'_> {
    fn deref_mut(&mut self) -> &mut Network {
        let pool = self.pool;
        self.network.get_or_insert_with(|| pool.template.clone())
    }
}

impl Drop for PooledNetwork<'_> {
    fn drop(&mut self) {
        if let Some(network) = self.network.take() {
            self.pool.release(network);
        }
    }
}
