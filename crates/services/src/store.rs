//! # Store
//!
//! An injectable state container with subscribe/notify semantics. Views
//! subscribe to a [`tokio::sync::watch`] receiver and re-render on change;
//! tests read [`Store::snapshot`] without any rendering tree.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

#[derive(Debug)]
struct Shared<S> {
    tx: watch::Sender<S>,
    /// Serializes writers so a working copy is never replaced by a stale one.
    writer: Mutex<()>,
}

#[derive(Debug)]
pub struct Store<S> {
    shared: Arc<Shared<S>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<S: Clone + Send + Sync + 'static> Store<S> {
    pub fn new(initial: S) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            shared: Arc::new(Shared { tx, writer: Mutex::new(()) }),
        }
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> S {
        self.shared.tx.borrow().clone()
    }

    /// Reads the current state without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.shared.tx.borrow())
    }

    /// Mutates a working copy, publishes it and notifies every subscriber.
    pub fn update<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let _writer = self.lock_writer();
        let mut next = self.snapshot();
        let out = f(&mut next);
        self.shared.tx.send_replace(next);
        out
    }

    /// Mutates the state, notifying subscribers only when `f` reports a change.
    pub fn update_if(&self, f: impl FnOnce(&mut S) -> bool) -> bool {
        let _writer = self.lock_writer();
        self.shared.tx.send_if_modified(f)
    }

    fn lock_writer(&self) -> MutexGuard<'_, ()> {
        match self.shared.writer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.shared.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_updates() {
        let store = Store::new(0u32);
        let mut rx = store.subscribe();

        let returned = store.update(|n| {
            *n += 2;
            *n
        });
        assert_eq!(returned, 2);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 2);
        assert_eq!(store.snapshot(), 2);
    }

    #[tokio::test]
    async fn unchanged_update_does_not_notify() {
        let store = Store::new(String::from("a"));
        let mut rx = store.subscribe();
        assert!(!store.update_if(|_| false));
        assert!(!rx.has_changed().unwrap());
        assert!(store.update_if(|s| {
            s.push('b');
            true
        }));
        assert!(rx.has_changed().unwrap());
        assert_eq!(store.read(|s| s.len()), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_updates_are_never_lost() {
        let store = Store::new(0u64);
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    for _ in 0..250 {
                        store.update(|n| *n += 1);
                        store.update_if(|n| {
                            *n += 1;
                            true
                        });
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.await.unwrap();
        }
        assert_eq!(store.snapshot(), 4_000);
    }
}
