//! De-duplication of concurrent requests for the same key.
//!
//! The first caller for a key starts the request; callers arriving while it is
//! pending await the same shared future. The request runs on its own task, so
//! it settles and populates caches even if every waiter goes away. Nothing is
//! retained once the request settles, so the next call always starts fresh.

use crate::sync::lock;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, Weak};

/// Type alias for a request future shared between waiters.
type SharedRequest<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

struct Pending<T, E> {
    /// Distinguishes this request from a later one under the same key
    generation: u64,
    future: SharedRequest<T, E>,
}

struct Registry<K, T, E> {
    pending: HashMap<K, Pending<T, E>>,
    next_generation: u64,
}

/// At most one in-flight request per key.
pub struct Coalescer<K, T, E> {
    registry: Arc<Mutex<Registry<K, T, E>>>,
}

impl<K, T, E> std::fmt::Debug for Coalescer<K, T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coalescer")
            .field("pending", &lock(&self.registry).pending.len())
            .finish()
    }
}

impl<K, T, E> Default for Coalescer<K, T, E> {
    fn default() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                pending: HashMap::new(),
                next_generation: 0,
            })),
        }
    }
}

impl<K, T, E> Coalescer<K, T, E>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `factory` for `key`, or join the request already in flight.
    ///
    /// `factory` is only invoked when no request for `key` is pending. Every
    /// waiter observes the same value or the same error. The pending entry is
    /// removed as soon as the request settles, before any waiter resumes.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn run<F, Fut>(&self, key: K, factory: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let request = {
            let mut registry = lock(&self.registry);

            if let Some(pending) = registry.pending.get(&key) {
                tracing::trace!("Joining in-flight request");
                pending.future.clone()
            } else {
                let generation = registry.next_generation;
                registry.next_generation += 1;

                let request = settle_then_forget(
                    factory(),
                    Arc::downgrade(&self.registry),
                    key.clone(),
                    generation,
                )
                .boxed()
                .shared();

                // Drive the request to completion even if every waiter is dropped
                let driver = request.clone();
                tokio::spawn(async move {
                    let _ = driver.await;
                });

                registry.pending.insert(
                    key,
                    Pending {
                        generation,
                        future: request.clone(),
                    },
                );
                request
            }
        };

        request.await
    }

    /// Whether a request for `key` is currently in flight.
    pub fn is_pending(&self, key: &K) -> bool {
        lock(&self.registry).pending.contains_key(key)
    }

    /// Number of keys with a request in flight.
    pub fn pending_count(&self) -> usize {
        lock(&self.registry).pending.len()
    }
}

/// Await the request, then drop its registry entry if it is still ours.
async fn settle_then_forget<K, T, E, Fut>(
    request: Fut,
    registry: Weak<Mutex<Registry<K, T, E>>>,
    key: K,
    generation: u64,
) -> Result<T, E>
where
    K: Hash + Eq,
    Fut: Future<Output = Result<T, E>>,
{
    let result = request.await;

    if let Some(registry) = registry.upgrade() {
        let mut registry = lock(&registry);
        if registry
            .pending
            .get(&key)
            .is_some_and(|pending| pending.generation == generation)
        {
            registry.pending.remove(&key);
        }
    }

    result
}
