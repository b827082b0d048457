//! Background task spawning.
//!
//! The cache hands every new in-flight request to a [`Spawner`] so the
//! request settles into the cache even when all of its callers went away.

use futures::future::LocalBoxFuture;

pub trait Spawner {
    /// Run `task` to completion on the current thread.
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);
}

/// Spawns onto the browser's microtask queue.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserSpawner;

impl Spawner for BrowserSpawner {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(task);
    }
}

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    //! Spawner whose tasks run only when the test drives them.

    use std::cell::RefCell;

    use futures::executor::{LocalPool, LocalSpawner};
    use futures::future::LocalBoxFuture;
    use futures::task::LocalSpawnExt;
    use tracing::warn;

    use super::Spawner;

    pub struct PoolSpawner {
        pool: RefCell<LocalPool>,
        spawner: LocalSpawner,
    }

    impl Default for PoolSpawner {
        fn default() -> Self {
            let pool = LocalPool::new();
            let spawner = pool.spawner();
            Self {
                pool: RefCell::new(pool),
                spawner,
            }
        }
    }

    impl PoolSpawner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Poll every spawned task until none can make progress.
        pub fn run_until_stalled(&self) {
            self.pool.borrow_mut().run_until_stalled();
        }
    }

    impl Spawner for PoolSpawner {
        fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
            if let Err(err) = self.spawner.spawn_local(task) {
                warn!(error = %err, "background task not spawned");
            }
        }
    }
}
