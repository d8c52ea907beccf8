//! Correlation of outstanding requests with their replies.
//!
//! Every request gets a session-unique, strictly increasing id. The
//! registry remembers how each id wants to be completed, and hands the
//! completion back exactly once when the reply (or teardown) arrives.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use ensign_sexp::Sexp;
use tokio::sync::oneshot;
use tracing::debug;

/// What a finished call delivers to its caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completed {
    /// False for server-side abort/error and for teardown.
    pub success: bool,
    /// The `:ok` payload on success, a detail form otherwise.
    pub payload: Sexp,
}

/// Callback flavour of completion.
pub type AsyncCallback = Box<dyn FnOnce(Completed) + Send>;

/// Where asynchronous callbacks run.
///
/// Editor frontends usually require UI work on a particular thread;
/// they hand in an executor that re-queues the callback there.
pub trait Executor: Send + Sync {
    fn execute(&self, job: Box<dyn FnOnce() + Send>);
}

/// Runs callbacks inline on the delivering task.
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, job: Box<dyn FnOnce() + Send>) {
        job();
    }
}

/// How a pending request wants its result delivered.
pub enum Completion {
    /// A caller blocked on a oneshot receiver.
    Sync(oneshot::Sender<Completed>),
    /// A callback, optionally re-queued onto an executor.
    Async {
        callback: AsyncCallback,
        executor: Option<Arc<dyn Executor>>,
    },
}

impl Completion {
    /// Deliver the result, consuming the completion.
    pub fn complete(self, result: Completed) {
        match self {
            Completion::Sync(tx) => {
                // Receiver may have timed out and gone away.
                let _ = tx.send(result);
            }
            Completion::Async { callback, executor } => match executor {
                Some(executor) => executor.execute(Box::new(move || callback(result))),
                None => callback(result),
            },
        }
    }
}

/// A registered, not-yet-answered request.
pub struct Pending {
    pub method: String,
    pub completion: Completion,
    pub issued_at: Instant,
}

struct Inner {
    next_id: i64,
    pending: HashMap<i64, Pending>,
}

/// The per-session request table.
pub struct Registry {
    inner: Mutex<Inner>,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            inner: Mutex::new(Inner {
                next_id: 1,
                pending: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Assign the next id and file the completion under it.
    pub fn register(&self, method: &str, completion: Completion) -> i64 {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.pending.insert(
            id,
            Pending {
                method: method.to_string(),
                completion,
                issued_at: Instant::now(),
            },
        );
        id
    }

    /// Take the pending entry for a reply. A second take for the same
    /// id returns nothing, which keeps delivery at-most-once.
    pub fn take(&self, id: i64) -> Option<Pending> {
        let entry = self.lock().pending.remove(&id);
        if let Some(ref pending) = entry {
            debug!(
                id,
                method = %pending.method,
                elapsed_ms = pending.issued_at.elapsed().as_millis() as u64,
                "request completed"
            );
        }
        entry
    }

    /// Remove and return every pending entry, for teardown.
    pub fn drain(&self) -> Vec<Pending> {
        self.lock().pending.drain().map(|(_, p)| p).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// The first two requests of a session are its handshake; an abort
    /// for either means the server cannot serve this session at all.
    pub fn is_handshake_id(id: i64) -> bool {
        id <= 2
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ok_result() -> Completed {
        Completed {
            success: true,
            payload: Sexp::Nil,
        }
    }

    #[test]
    fn ids_strictly_increase() {
        let registry = Registry::new();
        let (tx1, _rx1) = oneshot::channel();
        let (tx2, _rx2) = oneshot::channel();
        let a = registry.register("swank:connection-info", Completion::Sync(tx1));
        let b = registry.register("swank:init-project", Completion::Sync(tx2));
        assert!(b > a);
        assert_eq!(registry.pending_count(), 2);
    }

    #[test]
    fn take_is_at_most_once() {
        let registry = Registry::new();
        let (tx, _rx) = oneshot::channel();
        let id = registry.register("swank:typecheck-file", Completion::Sync(tx));
        assert!(registry.take(id).is_some());
        assert!(registry.take(id).is_none());
    }

    #[test]
    fn sync_completion_delivers() {
        let registry = Registry::new();
        let (tx, mut rx) = oneshot::channel();
        let id = registry.register("swank:typecheck-file", Completion::Sync(tx));
        registry.take(id).unwrap().completion.complete(ok_result());
        assert_eq!(rx.try_recv().unwrap(), ok_result());
    }

    #[test]
    fn async_completion_runs_on_executor() {
        struct Counting(AtomicUsize);
        impl Executor for Counting {
            fn execute(&self, job: Box<dyn FnOnce() + Send>) {
                self.0.fetch_add(1, Ordering::SeqCst);
                job();
            }
        }

        let registry = Registry::new();
        let executor = Arc::new(Counting(AtomicUsize::new(0)));
        let delivered = Arc::new(AtomicUsize::new(0));
        let delivered2 = delivered.clone();
        let id = registry.register(
            "swank:debug-attach",
            Completion::Async {
                callback: Box::new(move |result| {
                    assert!(result.success);
                    delivered2.fetch_add(1, Ordering::SeqCst);
                }),
                executor: Some(executor.clone()),
            },
        );
        registry.take(id).unwrap().completion.complete(ok_result());
        assert_eq!(executor.0.load(Ordering::SeqCst), 1);
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drain_empties_table() {
        let registry = Registry::new();
        let (tx1, _rx1) = oneshot::channel();
        let (tx2, _rx2) = oneshot::channel();
        registry.register("a", Completion::Sync(tx1));
        registry.register("b", Completion::Sync(tx2));
        assert_eq!(registry.drain().len(), 2);
        assert_eq!(registry.pending_count(), 0);
    }

    #[test]
    fn concurrent_registration_yields_unique_ids() {
        let registry = Arc::new(Registry::new());
        let mut workers = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            workers.push(std::thread::spawn(move || {
                (0..100)
                    .map(|_| {
                        let (tx, _rx) = oneshot::channel();
                        registry.register("swank:typecheck-file", Completion::Sync(tx))
                    })
                    .collect::<Vec<i64>>()
            }));
        }
        let mut ids: Vec<i64> = workers
            .into_iter()
            .flat_map(|w| w.join().unwrap())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 800);
        assert_eq!(registry.pending_count(), 800);
    }

    #[test]
    fn handshake_ids() {
        assert!(Registry::is_handshake_id(1));
        assert!(Registry::is_handshake_id(2));
        assert!(!Registry::is_handshake_id(3));
    }
}
