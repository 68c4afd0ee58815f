//! Update queues.
//!
//! A queue holds the state transitions requested for one piece of state (a
//! root's element tree, or one state hook) since it was last rendered. Both
//! buffers of a node share the same queue, so an update enqueued against
//! either one is seen by the next render.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use super::lanes::Lanes;
use crate::hooks::Dispatch;

/// A requested state transition.
pub enum Action<S> {
    /// Replace the state outright.
    Replace(S),
    /// Compute the next state from the accumulated one.
    Reduce(Box<dyn FnOnce(&S) -> S>),
}

impl<S> Action<S> {
    pub fn reduce<F>(f: F) -> Self
    where
        F: FnOnce(&S) -> S + 'static,
    {
        Action::Reduce(Box::new(f))
    }

    fn apply(self, state: S) -> S {
        match self {
            Action::Replace(next) => next,
            Action::Reduce(f) => f(&state),
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for Action<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Replace(value) => f.debug_tuple("Replace").field(value).finish(),
            Action::Reduce(_) => f.write_str("Reduce(..)"),
        }
    }
}

/// One enqueued transition and the lane it was requested under.
#[derive(Debug)]
pub struct Update<S> {
    pub action: Action<S>,
    pub lane: Lanes,
}

impl<S> Update<S> {
    pub fn new(action: Action<S>, lane: Lanes) -> Self {
        Self { action, lane }
    }
}

/// Pending updates in insertion order, plus the dispatch handle bound to the
/// queue when it belongs to a state hook.
pub struct UpdateQueue<S> {
    pending: VecDeque<Update<S>>,
    pub(crate) dispatch: Option<Dispatch<S>>,
}

/// A queue shared between both buffers of a node.
pub type SharedQueue<S> = Rc<RefCell<UpdateQueue<S>>>;

impl<S> UpdateQueue<S> {
    /// An empty queue with no dispatch handle.
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            dispatch: None,
        }
    }

    pub fn shared() -> SharedQueue<S> {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Append `update` after every update already pending.
    pub fn enqueue(&mut self, update: Update<S>) {
        self.pending.push_back(update);
    }

    /// Take every pending update, leaving the queue empty.
    pub fn take_pending(&mut self) -> VecDeque<Update<S>> {
        std::mem::take(&mut self.pending)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<S> Default for UpdateQueue<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Fold `pending` over `base_state` in insertion order.
///
/// Every update is applied whatever its lane; the render lane is accepted so
/// lane filtering can be added without changing callers.
pub fn process_update_queue<S>(
    base_state: S,
    pending: impl IntoIterator<Item = Update<S>>,
    _render_lane: Lanes,
) -> S {
    pending
        .into_iter()
        .fold(base_state, |state, update| update.action.apply(state))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_queue_is_empty() {
        let queue: UpdateQueue<i32> = UpdateQueue::new();
        assert!(queue.is_empty());
        assert!(queue.dispatch.is_none());
    }

    #[test]
    fn updates_apply_in_enqueue_order() {
        let mut queue = UpdateQueue::new();
        queue.enqueue(Update::new(Action::reduce(|s: &i32| s + 1), Lanes::SYNC));
        queue.enqueue(Update::new(Action::reduce(|s: &i32| s * 10), Lanes::SYNC));
        queue.enqueue(Update::new(Action::reduce(|s: &i32| s + 2), Lanes::SYNC));

        let state = process_update_queue(1, queue.take_pending(), Lanes::SYNC);

        assert_eq!(state, 22);
        assert!(queue.is_empty());
    }

    #[test]
    fn replace_discards_accumulated_state() {
        let mut queue = UpdateQueue::new();
        queue.enqueue(Update::new(Action::reduce(|s: &i32| s + 1), Lanes::SYNC));
        queue.enqueue(Update::new(Action::Replace(7), Lanes::SYNC));
        queue.enqueue(Update::new(Action::reduce(|s: &i32| s + 1), Lanes::SYNC));

        assert_eq!(process_update_queue(100, queue.take_pending(), Lanes::SYNC), 8);
    }

    #[test]
    fn empty_pending_returns_base_state() {
        let state = process_update_queue("base", Vec::new(), Lanes::SYNC);
        assert_eq!(state, "base");
    }
}
