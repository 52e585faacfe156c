//! "Texture changed" notification fan-out.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Identifies a registered callback for later removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<T> = Arc<dyn Fn(Option<T>) + Send + Sync>;

/// Observer list shared between a session and its worker.
///
/// Callbacks run on the capture worker thread and receive the new texture, or
/// `None` when the window collapsed and there is no longer anything to show.
pub struct Subscribers<T> {
    next_id: Arc<AtomicU64>,
    callbacks: Arc<Mutex<Vec<(SubscriptionId, Callback<T>)>>>,
}

impl<T> Clone for Subscribers<T> {
    fn clone(&self) -> Self {
        Self {
            next_id: self.next_id.clone(),
            callbacks: self.callbacks.clone(),
        }
    }
}

impl<T> Default for Subscribers<T> {
    fn default() -> Self {
        Self {
            next_id: Arc::new(AtomicU64::new(1)),
            callbacks: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T: Clone> Subscribers<T> {
    pub fn subscribe(&self, callback: impl Fn(Option<T>) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, Arc::new(callback)));
        id
    }

    /// Removes a callback. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut callbacks = self.lock();
        let before = callbacks.len();
        callbacks.retain(|(existing, _)| *existing != id);
        callbacks.len() != before
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Calls every registered callback with `texture`.
    ///
    /// The list is copied first so callbacks may subscribe or unsubscribe.
    pub fn emit(&self, texture: Option<T>) {
        let callbacks: Vec<Callback<T>> = self.lock().iter().map(|(_, cb)| cb.clone()).collect();
        for callback in callbacks {
            callback(texture.clone());
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriptionId, Callback<T>)>> {
        self.callbacks.lock().unwrap_or_else(|e| e.into_inner())
    }
}
