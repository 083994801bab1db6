//! Subscription handle types.

use crossbeam_channel::Receiver;
use std::time::Duration;

/// Active registration of a listener on a store.
///
/// Calling [`unsubscribe`](Subscription::unsubscribe) removes one
/// occurrence of the listener from wherever it was registered. Dropping
/// the handle without calling it leaves the listener active.
pub struct Subscription {
    cancel: Box<dyn FnOnce() + Send>,
}

impl Subscription {
    pub(crate) fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Subscription {
            cancel: Box::new(cancel),
        }
    }

    /// A subscription with nothing behind it, handed out by views that
    /// track no fields.
    pub(crate) fn inert() -> Self {
        Subscription::new(|| {})
    }

    /// Release the registration.
    pub fn unsubscribe(self) {
        (self.cancel)();
    }
}

/// Channel-backed view of a store's change notifications.
///
/// One tick is buffered; notifications arriving while a tick is pending
/// coalesce into it. Lets a thread wait for changes without installing
/// its own callback.
pub struct Watch {
    receiver: Receiver<()>,
    subscription: Subscription,
}

impl Watch {
    pub(crate) fn new(receiver: Receiver<()>, subscription: Subscription) -> Self {
        Watch {
            receiver,
            subscription,
        }
    }

    /// Wait for the next change tick (blocking).
    pub fn wait(&self) -> bool {
        self.receiver.recv().is_ok()
    }

    /// Wait for the next change tick, up to `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.receiver.recv_timeout(timeout).is_ok()
    }

    /// Take the pending change tick, if any (non-blocking).
    pub fn changed(&self) -> bool {
        self.receiver.try_recv().is_ok()
    }

    /// Stop watching.
    pub fn unsubscribe(self) {
        self.subscription.unsubscribe();
    }
}
