//! State Hooks
//!
//! `use_state` gives a component a value that survives re-renders, plus a
//! [`Dispatch`] handle that requests a new value.
//!
//! # How State Works
//!
//! 1. On mount, the hook stores the initial value and a fresh update queue
//!    in its slot.
//!
//! 2. Calling the dispatch handle appends an update to that queue and asks
//!    the root to schedule a render. Nothing is computed at dispatch time.
//!
//! 3. On the next render, the hook folds every pending update over the
//!    stored value, in the order they were dispatched.

use std::any::type_name;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::debug;

use super::context::{Dispatcher, RenderContext};
use super::runtime::{Hook, ScheduleUpdate};
use crate::error::HookError;
use crate::fiber::FiberId;
use crate::reconciler::lanes::request_update_lane;
use crate::reconciler::update_queue::{
    process_update_queue, Action, SharedQueue, Update, UpdateQueue,
};

/// What a state hook keeps in its slot.
pub(crate) struct StateCell<T> {
    pub value: T,
    pub queue: SharedQueue<T>,
}

/// Handle for requesting state changes.
///
/// Cloning is cheap. The handle holds its queue weakly: once the component
/// is removed from the tree, dispatching does nothing.
pub struct Dispatch<T> {
    queue: Weak<RefCell<UpdateQueue<T>>>,
    fiber: FiberId,
    scheduler: Weak<dyn ScheduleUpdate>,
}

impl<T: 'static> Dispatch<T> {
    fn new(queue: &SharedQueue<T>, fiber: FiberId, scheduler: Weak<dyn ScheduleUpdate>) -> Self {
        Self {
            queue: Rc::downgrade(queue),
            fiber,
            scheduler,
        }
    }

    /// Replace the state with `value` on the next render.
    pub fn set(&self, value: T) {
        self.dispatch(Action::Replace(value));
    }

    /// Compute the next state from the previous one on the next render.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T + 'static,
    {
        self.dispatch(Action::reduce(f));
    }

    /// Enqueue `action` and schedule a render of the owning root.
    pub fn dispatch(&self, action: Action<T>) {
        let Some(queue) = self.queue.upgrade() else {
            debug!(fiber = self.fiber.raw(), "dispatch to unmounted component ignored");
            return;
        };

        let lane = request_update_lane();
        queue.borrow_mut().enqueue(Update::new(action, lane));

        match self.scheduler.upgrade() {
            Some(root) => root.schedule_update_on_fiber(self.fiber, lane),
            None => debug!(fiber = self.fiber.raw(), "dispatch after root was dropped"),
        }
    }
}

impl<T> Clone for Dispatch<T> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
            fiber: self.fiber,
            scheduler: self.scheduler.clone(),
        }
    }
}

impl<T> fmt::Debug for Dispatch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch")
            .field("fiber", &self.fiber)
            .field("type", &type_name::<T>())
            .finish()
    }
}

/// Declare a piece of state initialised to `initial`.
///
/// Returns the state for this render and a handle to change it.
pub fn use_state<T>(initial: T) -> Result<(T, Dispatch<T>), HookError>
where
    T: Clone + 'static,
{
    use_lazy_state(move || initial)
}

/// Like [`use_state`], but the initial value is only computed on mount.
pub fn use_lazy_state<T, F>(init: F) -> Result<(T, Dispatch<T>), HookError>
where
    T: Clone + 'static,
    F: FnOnce() -> T,
{
    match RenderContext::with_frame(|frame| frame.dispatcher)? {
        Dispatcher::Mount => mount_state(init()),
        Dispatcher::Update => update_state(),
    }
}

fn mount_state<T: Clone + 'static>(value: T) -> Result<(T, Dispatch<T>), HookError> {
    RenderContext::with_frame(|frame| {
        let queue = UpdateQueue::shared();
        let dispatch = Dispatch::new(&queue, frame.fiber, frame.scheduler.clone());
        queue.borrow_mut().dispatch = Some(dispatch.clone());

        let cell = StateCell {
            value: value.clone(),
            queue,
        };
        frame.hooks.push(Hook::State(Rc::new(cell)));
        (value, dispatch)
    })
}

fn update_state<T: Clone + 'static>() -> Result<(T, Dispatch<T>), HookError> {
    let (prev, lane) = RenderContext::with_frame(|frame| {
        let Hook::State(slot) = frame.next_current_hook()? else {
            return Err(frame.slot_mismatch(type_name::<T>()));
        };
        let cell = slot
            .downcast::<StateCell<T>>()
            .map_err(|_| frame.slot_mismatch(type_name::<T>()))?;
        Ok((cell, frame.lane))
    })??;

    // Reducers are user code, so they run with no frame borrowed.
    let pending = prev.queue.borrow_mut().take_pending();
    let value = process_update_queue(prev.value.clone(), pending, lane);

    let queue = prev.queue.clone();
    let dispatch = queue.borrow().dispatch.clone();

    RenderContext::with_frame(|frame| {
        let dispatch =
            dispatch.unwrap_or_else(|| Dispatch::new(&queue, frame.fiber, frame.scheduler.clone()));
        let cell = StateCell {
            value: value.clone(),
            queue,
        };
        frame.hooks.push(Hook::State(Rc::new(cell)));
        (value, dispatch)
    })
}
