//! Synchronous change-notification channels.
//!
//! A [`Signal`] is an ordered subscriber list with immediate, same-thread
//! dispatch. Groups emit on their signals the moment a membership transition
//! is known, before the backing container is mutated at the flush point.
//! There is no threading here; callbacks run on the caller's stack.

use std::fmt;

/// Token identifying one subscription, for later disconnect.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SubscriptionToken(u64);

type Callback<A> = Box<dyn FnMut(A)>;

/// An ordered list of subscribers invoked synchronously on emit.
pub struct Signal<A> {
    subscribers: Vec<(SubscriptionToken, Callback<A>)>,
    next_token: u64,
}

impl<A: Copy> Signal<A> {
    /// Create a signal with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            next_token: 0,
        }
    }

    /// Subscribe a callback; returns a token for [`disconnect`](Self::disconnect).
    pub fn connect(&mut self, callback: impl FnMut(A) + 'static) -> SubscriptionToken {
        let token = SubscriptionToken(self.next_token);
        self.next_token += 1;
        self.subscribers.push((token, Box::new(callback)));
        token
    }

    /// Remove a subscription. Returns whether the token was known.
    pub fn disconnect(&mut self, token: SubscriptionToken) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(t, _)| *t != token);
        self.subscribers.len() != before
    }

    /// Invoke every subscriber with `arg`, in connect order.
    pub fn emit(&mut self, arg: A) {
        for (_, callback) in &mut self.subscribers {
            callback(arg);
        }
    }

    /// Check whether anyone is listening.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }
}

impl<A: Copy> Default for Signal<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for Signal<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
