//! Observable state cell.
//!
//! A value behind a mutex plus listeners that are called with the new value
//! after every replacement. Listeners run outside the lock, so they may read
//! or write the cell again.
//!
//! Delivery is serialized: one caller at a time runs listeners, and keeps
//! going until the latest version has been delivered. Writers that land
//! while someone else is delivering return at once and leave their value to
//! that caller, so every listener's last notification is the current value.
//! Under contention intermediate values may be skipped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub type SubscriptionId = u64;

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Inner<T> {
    value: T,
    /// Bumped by every write.
    version: u64,
    /// Last version handed to all listeners.
    delivered: u64,
    /// Someone is running listeners.
    delivering: bool,
    listeners: Vec<(SubscriptionId, Listener<T>)>,
    /// Subscribed since the last delivery, still owed the current value.
    fresh: Vec<(SubscriptionId, Listener<T>)>,
    next_id: SubscriptionId,
}

pub struct Observable<T> {
    inner: Mutex<Inner<T>>,
}

// Clears `delivering` if a listener panics.
struct DeliveryGuard<'a, T: Clone> {
    cell: &'a Observable<T>,
    armed: bool,
}

impl<T: Clone> Drop for DeliveryGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            self.cell.lock().delivering = false;
        }
    }
}

impl<T: Clone> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(Inner {
                value,
                version: 0,
                delivered: 0,
                delivering: false,
                listeners: Vec::new(),
                fresh: Vec::new(),
                next_id: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self) -> T {
        self.lock().value.clone()
    }

    /// Read without cloning the whole value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.lock().value)
    }

    pub fn set(&self, value: T) {
        self.update(|v| *v = value);
    }

    /// Mutate in place, then notify.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let out = {
            let mut guard = self.lock();
            let out = f(&mut guard.value);
            guard.version += 1;
            out
        };
        self.deliver();
        out
    }

    /// Register a listener. It is called once right away with the current
    /// value, or by the caller already delivering when there is one.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let listener: Listener<T> = Arc::new(listener);
        let id = {
            let mut guard = self.lock();
            let id = guard.next_id;
            guard.next_id += 1;
            guard.listeners.push((id, Arc::clone(&listener)));
            guard.fresh.push((id, listener));
            id
        };
        self.deliver();
        id
    }

    /// Returns false when `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut guard = self.lock();
        guard.fresh.retain(|(lid, _)| *lid != id);
        let before = guard.listeners.len();
        guard.listeners.retain(|(lid, _)| *lid != id);
        guard.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    // Run listeners until nothing is owed. Returns at once if another caller
    // is already doing it; that caller picks up whatever we wrote.
    fn deliver(&self) {
        {
            let mut guard = self.lock();
            if guard.delivering {
                return;
            }
            guard.delivering = true;
        }
        let mut reset = DeliveryGuard { cell: self, armed: true };

        loop {
            let (value, targets) = {
                let mut guard = self.lock();
                if guard.delivered < guard.version {
                    guard.delivered = guard.version;
                    guard.fresh.clear();
                    let targets: Vec<Listener<T>> =
                        guard.listeners.iter().map(|(_, l)| Arc::clone(l)).collect();
                    (guard.value.clone(), targets)
                } else if !guard.fresh.is_empty() {
                    let targets = std::mem::take(&mut guard.fresh)
                        .into_iter()
                        .map(|(_, l)| l)
                        .collect();
                    (guard.value.clone(), targets)
                } else {
                    // Cleared under the same lock as the check, so a write
                    // that raced us either was seen above or will deliver.
                    guard.delivering = false;
                    reset.armed = false;
                    return;
                }
            };

            for l in targets {
                l(&value);
            }
        }
    }
}

impl<T: Clone + Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("value", &self.lock().value)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn listeners_see_every_replacement() {
        let cell = Arc::new(Observable::new(0_u32));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let id = cell.subscribe(move |v| sink.lock().unwrap().push(*v));

        cell.set(3);
        cell.update(|v| *v += 1);
        assert!(cell.unsubscribe(id));
        cell.set(9);

        assert_eq!(*seen.lock().unwrap(), vec![0, 3, 4]);
        assert!(!cell.unsubscribe(id));
        assert_eq!(cell.get(), 9);
    }

    #[test]
    fn listener_may_read_the_cell() {
        let cell = Arc::new(Observable::new(String::from("a")));
        let hits = Arc::new(AtomicUsize::new(0));

        let reader = Arc::clone(&cell);
        let counter = Arc::clone(&hits);
        cell.subscribe(move |v| {
            assert_eq!(&reader.get(), v);
            counter.fetch_add(1, Ordering::SeqCst);
        });
        cell.set("b".to_string());

        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concurrent_writer_does_not_overtake_slow_delivery() {
        let cell = Arc::new(Observable::new(0_u32));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (entered_tx, entered_rx) = mpsc::channel();
        let entered_tx = Mutex::new(entered_tx);

        let sink = Arc::clone(&seen);
        cell.subscribe(move |v| {
            sink.lock().unwrap().push(*v);
            if *v == 1 {
                entered_tx.lock().unwrap().send(()).unwrap();
                thread::sleep(Duration::from_millis(100));
            }
        });

        let writer = {
            let cell = Arc::clone(&cell);
            thread::spawn(move || cell.set(1))
        };
        entered_rx.recv().unwrap();
        cell.set(2);
        writer.join().unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![0, 1, 2]);
        assert_eq!(seen.last().copied(), Some(cell.get()));
    }

    #[test]
    fn listener_may_write_the_cell() {
        let cell = Arc::new(Observable::new(0_u32));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let writer = Arc::clone(&cell);
        let sink = Arc::clone(&seen);
        cell.subscribe(move |v| {
            sink.lock().unwrap().push(*v);
            if *v < 3 {
                writer.set(*v + 1);
            }
        });

        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(cell.get(), 3);
        assert_eq!(cell.listener_count(), 1);
    }

    #[test]
    fn unsubscribe_drops_listener() {
        let cell = Observable::new(());
        let a = cell.subscribe(|_| {});
        let b = cell.subscribe(|_| {});
        assert_eq!(cell.listener_count(), 2);

        assert!(cell.unsubscribe(a));
        assert_eq!(cell.listener_count(), 1);
        assert!(cell.unsubscribe(b));
        assert_eq!(cell.listener_count(), 0);
    }
}
