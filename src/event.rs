//! Per-instance change notification.
//!
//! Every curve and spline owns its own [`Event`] registries; there is no
//! global bus. Listeners run synchronously, in subscription order, when
//! the owner fires the event.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Handle returned by [`Event::add_listener`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// What a listener wants after being notified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listening {
    /// Stay subscribed.
    Keep,
    /// Unsubscribe now.
    Stop,
}

type Listener<T> = Box<dyn FnMut(&T) -> Listening + Send + Sync>;

/// A callback registry with subscribe / unsubscribe / fire.
pub struct Event<T> {
    listeners: Vec<(ListenerId, Listener<T>)>,
    next_id: u64,
}

impl<T> Default for Event<T> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
        }
    }
}

impl<T> fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<T> Event<T> {
    /// Create an event with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a listener.
    pub fn add_listener<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&T) -> Listening + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Unsubscribe a listener. Returns false if it was not subscribed.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Notify every listener, dropping those that answer [`Listening::Stop`].
    pub fn invoke(&mut self, args: &T) {
        self.listeners
            .retain_mut(|(_, listener)| listener(args) == Listening::Keep);
    }

    /// Number of subscribed listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Remove every listener.
    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

/// A shared "needs recompute" flag that can be subscribed to any [`Event`].
///
/// Subscriptions hold only a weak reference: once every clone of the flag
/// is dropped (or [`DirtyFlag::detach`] replaced it), the listener
/// unsubscribes itself the next time the event fires.
#[derive(Debug, Clone)]
pub struct DirtyFlag(Arc<AtomicBool>);

impl Default for DirtyFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

impl DirtyFlag {
    /// Create a flag with the given initial state.
    pub fn new(dirty: bool) -> Self {
        Self(Arc::new(AtomicBool::new(dirty)))
    }

    /// Mark as dirty.
    pub fn set(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether the flag is raised.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Clear the flag, returning its previous state.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::Relaxed)
    }

    /// Subscribe this flag to an event: every notification raises it.
    pub fn subscribe<T>(&self, event: &mut Event<T>) -> ListenerId {
        let weak: Weak<AtomicBool> = Arc::downgrade(&self.0);
        event.add_listener(move |_| match weak.upgrade() {
            Some(flag) => {
                flag.store(true, Ordering::Relaxed);
                Listening::Keep
            }
            None => Listening::Stop,
        })
    }

    /// Replace this flag with a fresh one, orphaning every existing subscription.
    ///
    /// The new flag keeps the current dirty state.
    pub fn detach(&mut self) {
        *self = Self::new(self.is_set());
    }
}
