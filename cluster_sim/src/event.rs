use crate::{JobId, Time};
use std::collections::BinaryHeap;
use std::{cmp::Reverse, fmt};

/// The closed set of things that can happen to a job, declared in dispatch
/// order. At equal timestamps a termination is processed before a start, so
/// capacity freed by an ending job is visible to start decisions in the
/// same instant; submissions come last. Prediction expiries go first of
/// all: every scheduling decision made in the instant must already see the
/// restored reservation, or it could hand out processors the overrun job
/// still holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    PredictionExpiry,
    Termination,
    Start,
    Submission,
}

impl EventKind {
    pub(crate) const COUNT: usize = 4;

    fn index(self) -> usize {
        self as usize
    }
}

/// A timestamped occurrence on one job. Events are plain values; the job
/// record itself lives in the [`JobTable`](crate::JobTable).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Event {
    pub timestamp: Time,
    pub kind: EventKind,
    pub job: JobId,
}

impl Event {
    pub fn submission(timestamp: Time, job: JobId) -> Self {
        Self { timestamp, kind: EventKind::Submission, job }
    }

    pub fn start(timestamp: Time, job: JobId) -> Self {
        Self { timestamp, kind: EventKind::Start, job }
    }

    pub fn termination(timestamp: Time, job: JobId) -> Self {
        Self { timestamp, kind: EventKind::Termination, job }
    }

    pub fn prediction_expiry(timestamp: Time, job: JobId) -> Self {
        Self { timestamp, kind: EventKind::PredictionExpiry, job }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}<t={}, job={}>", self.kind, self.timestamp, self.job)
    }
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct Scheduled {
    event: Event,
    seq: u64,
}

/// A handler reacts to one event and returns whatever new events it wants
/// enqueued. Handlers never see the queue itself.
pub type Handler<C> = Box<dyn FnMut(&mut C, Event) -> Vec<Event>>;

/// Priority queue of timestamped events with typed-handler dispatch.
///
/// Events are dispatched in ascending (timestamp, kind, job id) order;
/// events equal on all three dequeue in insertion order. `advance` pops the
/// least event and runs every handler registered for its kind, in
/// registration order, against the caller-supplied context; events the
/// handlers return are enqueued once the whole handler list has run.
pub struct EventQueue<C> {
    heap: BinaryHeap<Reverse<Scheduled>>,
    handlers: [Vec<Handler<C>>; EventKind::COUNT],
    next_seq: u64,
    clock: Time,
}

impl<C> EventQueue<C> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            handlers: std::array::from_fn(|_| Vec::new()),
            next_seq: 0,
            clock: 0,
        }
    }

    /// Timestamp of the most recently dispatched event.
    pub fn clock(&self) -> Time {
        self.clock
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Enqueues an event. The simulation clock only moves forward; asking
    /// for an event in the past is a bug in whoever produced it.
    pub fn add_event(&mut self, event: Event) {
        assert!(
            event.timestamp >= self.clock,
            "event {event} scheduled before the current clock {}",
            self.clock
        );
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Scheduled { event, seq }));
    }

    pub fn add_handler<F>(&mut self, kind: EventKind, handler: F)
    where
        F: FnMut(&mut C, Event) -> Vec<Event> + 'static,
    {
        self.handlers[kind.index()].push(Box::new(handler));
    }

    /// Dispatches the least event, returning it, or `None` on an empty
    /// queue.
    pub fn advance(&mut self, ctx: &mut C) -> Option<Event> {
        let Reverse(Scheduled { event, .. }) = self.heap.pop()?;
        self.clock = event.timestamp;
        log::trace!(target: "event_queue", "dispatching {event}");

        // The slot is taken out for the duration of the dispatch; handlers
        // have no path back to the queue, so it cannot change underneath us.
        let mut handlers = std::mem::take(&mut self.handlers[event.kind.index()]);
        let mut produced = Vec::new();
        for handler in handlers.iter_mut() {
            produced.extend(handler(ctx, event));
        }
        self.handlers[event.kind.index()] = handlers;

        for event in produced {
            self.add_event(event);
        }
        Some(event)
    }
}

impl<C> Default for EventQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}
