//! Multi-subscriber event streams.
//!
//! [`Subject`] is a minimal publish-subscribe primitive: values pushed with
//! [`Subject::next`] fan out synchronously to every registered observer, in
//! subscription order. A stream terminates exactly once, through
//! [`Subject::error`] or [`Subject::complete`]; after that it accepts no
//! further signals and late subscribers receive the terminal signal
//! immediately.
//!
//! [`FilteredSubject`] derives a predicate-filtered view of a subject. Views
//! are lazy: a view holds a subscription on its parent only while it has at
//! least one subscriber of its own.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Error signal carried by a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamError {
    message: String,
}

impl StreamError {
    /// Creates a stream error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for StreamError {}

type NextFn<T> = Box<dyn Fn(&T) -> Result<(), StreamError> + Send + Sync>;
type ErrorFn = Box<dyn Fn(&StreamError) + Send + Sync>;
type CompleteFn = Box<dyn Fn() + Send + Sync>;

/// A bundle of optional callbacks registered with a stream.
///
/// An `Err` returned from the `next` callback is redirected to this
/// observer's `error` callback (when present) and never interrupts dispatch
/// to other observers.
pub struct Observer<T> {
    next: Option<NextFn<T>>,
    error: Option<ErrorFn>,
    complete: Option<CompleteFn>,
}

impl<T> Observer<T> {
    /// Creates an observer with no callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next: None,
            error: None,
            complete: None,
        }
    }

    /// Sets the value callback.
    #[must_use]
    pub fn on_next(
        mut self,
        f: impl Fn(&T) -> Result<(), StreamError> + Send + Sync + 'static,
    ) -> Self {
        self.next = Some(Box::new(f));
        self
    }

    /// Sets the error callback.
    #[must_use]
    pub fn on_error(mut self, f: impl Fn(&StreamError) + Send + Sync + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }

    /// Sets the completion callback.
    #[must_use]
    pub fn on_complete(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.complete = Some(Box::new(f));
        self
    }

    fn deliver_next(&self, value: &T) {
        if let Some(next) = &self.next {
            if let Err(err) = next(value) {
                if let Some(error) = &self.error {
                    error(&err);
                }
            }
        }
    }

    fn deliver_error(&self, err: &StreamError) {
        if let Some(error) = &self.error {
            error(err);
        }
    }

    fn deliver_complete(&self) {
        if let Some(complete) = &self.complete {
            complete();
        }
    }
}

impl<T> Default for Observer<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Anything that can be subscribed to.
pub trait Observable<T> {
    /// Registers an observer and returns its subscription handle.
    fn subscribe(&self, observer: Observer<T>) -> Subscription;
}

/// Handle for a registered observer.
///
/// `unsubscribe` is idempotent. A handle returned from subscribing to an
/// already-terminated stream starts out inactive. Dropping a handle without
/// unsubscribing leaves the observer registered.
pub struct Subscription {
    cancel: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Mutex::new(Some(Box::new(cancel))),
        }
    }

    fn closed() -> Self {
        Self {
            cancel: Mutex::new(None),
        }
    }

    /// Removes the observer from future dispatch.
    pub fn unsubscribe(&self) {
        let cancel = self.cancel.lock().take();
        if let Some(cancel) = cancel {
            cancel();
        }
    }

    /// Returns whether the observer is still registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.cancel.lock().is_some()
    }
}

enum Terminal {
    Errored(StreamError),
    Completed,
}

struct SubjectInner<T> {
    observers: Vec<(u64, Arc<Observer<T>>)>,
    next_id: u64,
    terminal: Option<Terminal>,
}

/// A multi-subscriber event stream.
///
/// Clones share the same stream.
pub struct Subject<T> {
    inner: Arc<Mutex<SubjectInner<T>>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for Subject<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Subject<T> {
    /// Creates a new, active stream.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SubjectInner {
                observers: Vec::new(),
                next_id: 0,
                terminal: None,
            })),
        }
    }

    /// Publishes a value to every registered observer, in subscription
    /// order. No-op once the stream has terminated.
    ///
    /// Dispatch happens outside the stream's lock, so observers may freely
    /// subscribe or unsubscribe from their callbacks; such changes take
    /// effect from the next publish.
    pub fn next(&self, value: &T) {
        let snapshot: Vec<Arc<Observer<T>>> = {
            let inner = self.inner.lock();
            if inner.terminal.is_some() {
                return;
            }
            inner
                .observers
                .iter()
                .map(|(_, observer)| Arc::clone(observer))
                .collect()
        };
        for observer in snapshot {
            observer.deliver_next(value);
        }
    }

    /// Terminates the stream with an error.
    ///
    /// Every registered observer receives the error and is removed; later
    /// subscribers receive it immediately. No-op if already terminated.
    pub fn error(&self, err: StreamError) {
        let observers = {
            let mut inner = self.inner.lock();
            if inner.terminal.is_some() {
                return;
            }
            inner.terminal = Some(Terminal::Errored(err.clone()));
            std::mem::take(&mut inner.observers)
        };
        for (_, observer) in observers {
            observer.deliver_error(&err);
        }
    }

    /// Terminates the stream normally.
    ///
    /// Every registered observer receives the completion and is removed;
    /// later subscribers receive it immediately. No-op if already
    /// terminated.
    pub fn complete(&self) {
        let observers = {
            let mut inner = self.inner.lock();
            if inner.terminal.is_some() {
                return;
            }
            inner.terminal = Some(Terminal::Completed);
            std::mem::take(&mut inner.observers)
        };
        for (_, observer) in observers {
            observer.deliver_complete();
        }
    }

    /// Returns whether the stream has terminated.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.inner.lock().terminal.is_some()
    }

    /// Returns the number of registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.inner.lock().observers.len()
    }
}

impl<T: Send + Sync + 'static> Observable<T> for Subject<T> {
    fn subscribe(&self, observer: Observer<T>) -> Subscription {
        let observer = Arc::new(observer);
        let id = {
            let mut inner = self.inner.lock();
            match &inner.terminal {
                Some(Terminal::Errored(err)) => {
                    let err = err.clone();
                    drop(inner);
                    observer.deliver_error(&err);
                    return Subscription::closed();
                }
                Some(Terminal::Completed) => {
                    drop(inner);
                    observer.deliver_complete();
                    return Subscription::closed();
                }
                None => {
                    let id = inner.next_id;
                    inner.next_id += 1;
                    inner.observers.push((id, observer));
                    id
                }
            }
        };
        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.lock().observers.retain(|(oid, _)| *oid != id);
            }
        })
    }
}

struct FilterLink {
    subscribers: usize,
    parent_subscription: Option<Subscription>,
}

struct FilteredInner<T> {
    parent: Subject<T>,
    predicate: Arc<dyn Fn(&T) -> bool + Send + Sync>,
    out: Subject<T>,
    link: Mutex<FilterLink>,
}

/// A lazy, predicate-filtered view of a [`Subject`].
///
/// The view subscribes to its parent when it gains its first subscriber and
/// releases that subscription when its last subscriber unsubscribes. The
/// parent's terminal signals propagate through an attached view.
pub struct FilteredSubject<T> {
    inner: Arc<FilteredInner<T>>,
}

impl<T> Clone for FilteredSubject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + Sync + 'static> FilteredSubject<T> {
    /// Creates a view of `parent` forwarding only values that satisfy
    /// `predicate`.
    pub fn new(parent: &Subject<T>, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(FilteredInner {
                parent: parent.clone(),
                predicate: Arc::new(predicate),
                out: Subject::new(),
                link: Mutex::new(FilterLink {
                    subscribers: 0,
                    parent_subscription: None,
                }),
            }),
        }
    }

    /// Returns whether the view currently holds a subscription on its
    /// parent.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.inner.link.lock().parent_subscription.is_some()
    }

    fn attach(inner: &Arc<FilteredInner<T>>) {
        let out = inner.out.clone();
        let predicate = Arc::clone(&inner.predicate);
        let error_out = inner.out.clone();
        let complete_out = inner.out.clone();
        let forwarder = Observer::new()
            .on_next(move |value: &T| {
                if predicate(value) {
                    out.next(value);
                }
                Ok(())
            })
            .on_error(move |err| error_out.error(err.clone()))
            .on_complete(move || complete_out.complete());
        let subscription = inner.parent.subscribe(forwarder);
        inner.link.lock().parent_subscription = Some(subscription);
    }
}

impl<T: Send + Sync + 'static> Observable<T> for FilteredSubject<T> {
    fn subscribe(&self, observer: Observer<T>) -> Subscription {
        // A terminated parent terminates the view on attach; subscribing to
        // the out subject then delivers the terminal signal immediately.
        let attach_now = {
            let mut link = self.inner.link.lock();
            link.subscribers += 1;
            link.subscribers == 1 && link.parent_subscription.is_none()
        };
        if attach_now {
            Self::attach(&self.inner);
        }

        let downstream = self.inner.out.subscribe(observer);
        let inner = Arc::clone(&self.inner);
        Subscription::new(move || {
            downstream.unsubscribe();
            let mut link = inner.link.lock();
            link.subscribers = link.subscribers.saturating_sub(1);
            if link.subscribers == 0 {
                if let Some(parent_subscription) = link.parent_subscription.take() {
                    parent_subscription.unsubscribe();
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collector<T: Clone + Send + 'static>() -> (Arc<Mutex<Vec<T>>>, Observer<T>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer = Observer::new().on_next(move |value: &T| {
            sink.lock().push(value.clone());
            Ok(())
        });
        (seen, observer)
    }

    #[test]
    fn fan_out_in_subscription_order() {
        let subject = Subject::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&order);
        subject.subscribe(Observer::new().on_next(move |v: &i32| {
            sink.lock().push(("first", *v));
            Ok(())
        }));
        let sink = Arc::clone(&order);
        subject.subscribe(Observer::new().on_next(move |v: &i32| {
            sink.lock().push(("second", *v));
            Ok(())
        }));

        subject.next(&1);
        subject.next(&2);

        assert_eq!(
            *order.lock(),
            vec![("first", 1), ("second", 1), ("first", 2), ("second", 2)]
        );
    }

    #[test]
    fn unsubscribe_stops_delivery_to_one_observer() {
        let subject = Subject::new();
        let (first, observer) = collector::<i32>();
        let subscription = subject.subscribe(observer);
        let (second, observer) = collector::<i32>();
        subject.subscribe(observer);

        subject.next(&1);
        subscription.unsubscribe();
        subject.next(&2);

        assert_eq!(*first.lock(), vec![1]);
        assert_eq!(*second.lock(), vec![1, 2]);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let subject = Subject::new();
        let (_, observer) = collector::<i32>();
        let subscription = subject.subscribe(observer);

        assert!(subscription.is_active());
        subscription.unsubscribe();
        subscription.unsubscribe();
        assert!(!subscription.is_active());
        assert_eq!(subject.observer_count(), 0);
    }

    #[test]
    fn observer_failure_redirects_to_its_error_callback() {
        let subject = Subject::new();

        let failures = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&failures);
        subject.subscribe(
            Observer::new()
                .on_next(|_: &i32| Err(StreamError::new("observer failed")))
                .on_error(move |err| sink.lock().push(err.message().to_string())),
        );

        let (survivor, observer) = collector::<i32>();
        subject.subscribe(observer);

        subject.next(&1);
        subject.next(&2);

        // The failing observer's errors never abort dispatch to the second.
        assert_eq!(*survivor.lock(), vec![1, 2]);
        assert_eq!(failures.lock().len(), 2);
        // The stream itself is still active.
        assert!(!subject.is_terminated());
    }

    #[test]
    fn observer_failure_without_error_callback_is_dropped() {
        let subject = Subject::new();
        subject.subscribe(Observer::new().on_next(|_: &i32| Err(StreamError::new("lost"))));
        let (second, observer) = collector::<i32>();
        subject.subscribe(observer);

        subject.next(&7);
        assert_eq!(*second.lock(), vec![7]);
    }

    #[test]
    fn complete_is_terminal() {
        let subject = Subject::new();
        let completions = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&completions);
        subject.subscribe(Observer::new().on_complete(move || *sink.lock() += 1));

        subject.complete();
        assert_eq!(*completions.lock(), 1);
        assert!(subject.is_terminated());
        assert_eq!(subject.observer_count(), 0);

        // Further signals are no-ops.
        subject.next(&1);
        subject.complete();
        subject.error(StreamError::new("late"));
        assert_eq!(*completions.lock(), 1);
    }

    #[test]
    fn late_subscriber_to_completed_stream_completes_immediately() {
        let subject = Subject::<i32>::new();
        subject.complete();

        let completions = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&completions);
        let subscription = subject.subscribe(Observer::new().on_complete(move || *sink.lock() += 1));

        assert_eq!(*completions.lock(), 1);
        assert!(!subscription.is_active());
    }

    #[test]
    fn error_is_terminal_and_replays_to_late_subscribers() {
        let subject = Subject::<i32>::new();
        let (seen, observer) = collector::<i32>();
        subject.subscribe(observer);

        subject.next(&1);
        subject.error(StreamError::new("boom"));
        subject.next(&2);

        assert_eq!(*seen.lock(), vec![1]);

        let late = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&late);
        subject.subscribe(Observer::new().on_error(move |err| {
            sink.lock().push(err.message().to_string());
        }));
        assert_eq!(*late.lock(), vec!["boom"]);
    }

    #[test]
    fn filtered_view_forwards_matching_values() {
        let subject = Subject::new();
        let evens = FilteredSubject::new(&subject, |v: &i32| v % 2 == 0);

        let (seen, observer) = collector::<i32>();
        evens.subscribe(observer);

        for v in 1..=6 {
            subject.next(&v);
        }
        assert_eq!(*seen.lock(), vec![2, 4, 6]);
    }

    #[test]
    fn filtered_view_attaches_lazily_and_releases() {
        let subject = Subject::<i32>::new();
        let view = FilteredSubject::new(&subject, |_| true);

        // No subscribers: the view holds nothing on the parent.
        assert_eq!(subject.observer_count(), 0);
        assert!(!view.is_attached());

        let (_, observer) = collector::<i32>();
        let first = view.subscribe(observer);
        let (_, observer) = collector::<i32>();
        let second = view.subscribe(observer);

        assert_eq!(subject.observer_count(), 1);
        assert!(view.is_attached());

        first.unsubscribe();
        assert!(view.is_attached());
        second.unsubscribe();
        assert!(!view.is_attached());
        assert_eq!(subject.observer_count(), 0);
    }

    #[test]
    fn filtered_view_reattaches_after_release() {
        let subject = Subject::new();
        let view = FilteredSubject::new(&subject, |v: &i32| *v > 0);

        let (first, observer) = collector::<i32>();
        let subscription = view.subscribe(observer);
        subject.next(&1);
        subscription.unsubscribe();

        // Published while detached: not seen by anyone.
        subject.next(&2);

        let (second, observer) = collector::<i32>();
        view.subscribe(observer);
        subject.next(&3);

        assert_eq!(*first.lock(), vec![1]);
        assert_eq!(*second.lock(), vec![3]);
    }

    #[test]
    fn parent_completion_terminates_attached_view() {
        let subject = Subject::<i32>::new();
        let view = FilteredSubject::new(&subject, |_| true);

        let completions = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&completions);
        view.subscribe(Observer::new().on_complete(move || *sink.lock() += 1));

        subject.complete();
        assert_eq!(*completions.lock(), 1);
    }
}
