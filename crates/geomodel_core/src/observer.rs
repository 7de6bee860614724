//! Named-channel publish/subscribe used by topology and assembler.
//!
//! # Responsibility
//! - Register listeners per event channel and dispatch synchronously.
//! - Isolate listener failures so one broken view cannot break the publisher.
//!
//! # Invariants
//! - Listeners for one channel run in registration order.
//! - A listener returning an error or panicking is logged and skipped; the
//!   remaining listeners still run and the publisher state is untouched.
//! - Listener tokens are never reused within one publisher.

use crate::logging::panic_payload_summary;
use log::warn;
use std::error::Error;
use std::fmt::{Debug, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Error type listeners may return to signal a failed refresh.
pub type ListenerError = Box<dyn Error + Send + Sync>;

/// Listener callback receiving the publishing object and the event.
pub type Listener<S, E> = Box<dyn Fn(&S, &E) -> Result<(), ListenerError>>;

/// Events routed through a [`Publisher`] expose their channel name.
pub trait ChannelEvent {
    fn channel(&self) -> &'static str;
}

/// Handle returned by `attach`, used to detach one listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerToken(u64);

/// Outcome of one publish call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Listeners that completed successfully.
    pub delivered: usize,
    /// Listeners that returned an error or panicked.
    pub failed: usize,
}

struct Subscription<S, E> {
    token: ListenerToken,
    channel: String,
    callback: Listener<S, E>,
}

/// Synchronous event dispatcher owned by the publishing object `S`.
pub struct Publisher<S, E> {
    subscriptions: Vec<Subscription<S, E>>,
    next_token: u64,
}

impl<S, E> Default for Publisher<S, E> {
    fn default() -> Self {
        Self {
            subscriptions: Vec::new(),
            next_token: 0,
        }
    }
}

impl<S, E> Debug for Publisher<S, E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field(
                "channels",
                &self
                    .subscriptions
                    .iter()
                    .map(|sub| sub.channel.as_str())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<S, E: ChannelEvent> Publisher<S, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for events whose channel equals `channel`.
    pub fn attach<F>(&mut self, channel: impl Into<String>, callback: F) -> ListenerToken
    where
        F: Fn(&S, &E) -> Result<(), ListenerError> + 'static,
    {
        let token = ListenerToken(self.next_token);
        self.next_token += 1;
        self.subscriptions.push(Subscription {
            token,
            channel: channel.into(),
            callback: Box::new(callback),
        });
        token
    }

    /// Removes one listener. Returns whether the token was registered.
    pub fn detach(&mut self, token: ListenerToken) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|sub| sub.token != token);
        before != self.subscriptions.len()
    }

    pub fn listener_count(&self, channel: &str) -> usize {
        self.subscriptions
            .iter()
            .filter(|sub| sub.channel == channel)
            .count()
    }

    /// Delivers `event` to every listener on its channel.
    pub fn publish(&self, source: &S, event: &E) -> DispatchReport {
        let channel = event.channel();
        let mut report = DispatchReport::default();
        for sub in self.subscriptions.iter().filter(|sub| sub.channel == channel) {
            match catch_unwind(AssertUnwindSafe(|| (sub.callback)(source, event))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(err)) => {
                    report.failed += 1;
                    warn!(
                        "event=listener_failed module=observer status=error channel={} token={} error={}",
                        channel, sub.token.0, err
                    );
                }
                Err(payload) => {
                    report.failed += 1;
                    warn!(
                        "event=listener_panicked module=observer status=error channel={} token={} payload={}",
                        channel,
                        sub.token.0,
                        panic_payload_summary(payload.as_ref())
                    );
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::{ChannelEvent, DispatchReport, Publisher};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Ping(&'static str);

    impl ChannelEvent for Ping {
        fn channel(&self) -> &'static str {
            self.0
        }
    }

    #[test]
    fn dispatches_in_registration_order_per_channel() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut publisher: Publisher<(), Ping> = Publisher::new();
        for label in ["first", "second"] {
            let seen = Rc::clone(&seen);
            publisher.attach("a", move |_, _| {
                seen.borrow_mut().push(label);
                Ok(())
            });
        }
        let other = Rc::clone(&seen);
        publisher.attach("b", move |_, _| {
            other.borrow_mut().push("other");
            Ok(())
        });

        let report = publisher.publish(&(), &Ping("a"));
        assert_eq!(report, DispatchReport { delivered: 2, failed: 0 });
        assert_eq!(*seen.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn failing_and_panicking_listeners_do_not_stop_dispatch() {
        let hits = Rc::new(RefCell::new(0));
        let mut publisher: Publisher<(), Ping> = Publisher::new();
        publisher.attach("a", |_, _| Err("refresh failed".into()));
        publisher.attach("a", |_, _| panic!("listener bug"));
        let counter = Rc::clone(&hits);
        publisher.attach("a", move |_, _| {
            *counter.borrow_mut() += 1;
            Ok(())
        });

        let report = publisher.publish(&(), &Ping("a"));
        assert_eq!(report.failed, 2);
        assert_eq!(report.delivered, 1);
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn detach_removes_only_that_listener() {
        let mut publisher: Publisher<(), Ping> = Publisher::new();
        let first = publisher.attach("a", |_, _| Ok(()));
        publisher.attach("a", |_, _| Ok(()));

        assert!(publisher.detach(first));
        assert!(!publisher.detach(first));
        assert_eq!(publisher.listener_count("a"), 1);
        assert_eq!(publisher.publish(&(), &Ping("a")).delivered, 1);
    }
}
