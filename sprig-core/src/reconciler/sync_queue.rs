//! Synchronous task queue.
//!
//! Render callbacks requested during one synchronous turn are collected here
//! and run together when the host's microtask fires, so several dispatches
//! in a row produce a single render pass.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use tracing::error;

use crate::error::RenderResult;

pub type SyncCallback = Box<dyn FnOnce() -> RenderResult<()>>;

#[derive(Default)]
pub struct SyncTaskQueue {
    queue: RefCell<VecDeque<SyncCallback>>,
    is_flushing: Cell<bool>,
}

/// Clears the flushing flag even if a callback panics.
struct FlushGuard<'a>(&'a Cell<bool>);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl SyncTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&self, callback: SyncCallback) {
        self.queue.borrow_mut().push_back(callback);
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    pub fn is_flushing(&self) -> bool {
        self.is_flushing.get()
    }

    /// Run every queued callback, including callbacks queued while flushing.
    /// A nested call while a flush is running does nothing. Returns how many
    /// callbacks ran.
    pub fn flush(&self) -> usize {
        if self.is_flushing.get() {
            return 0;
        }
        self.is_flushing.set(true);
        let _guard = FlushGuard(&self.is_flushing);

        let mut ran = 0;
        loop {
            let next = self.queue.borrow_mut().pop_front();
            let Some(callback) = next else {
                break;
            };
            ran += 1;
            if let Err(err) = callback() {
                error!(%err, "sync callback failed");
            }
        }
        ran
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use std::rc::Rc;

    #[test]
    fn flush_runs_callbacks_in_order() {
        let queue = SyncTaskQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for n in 0..3 {
            let log = log.clone();
            queue.schedule(Box::new(move || {
                log.borrow_mut().push(n);
                Ok(())
            }));
        }

        assert_eq!(queue.flush(), 3);
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
        assert!(queue.is_empty());
    }

    #[test]
    fn callbacks_queued_while_flushing_run_in_same_flush() {
        let queue = Rc::new(SyncTaskQueue::new());
        let ran_nested = Rc::new(Cell::new(false));

        let (inner_queue, flag) = (queue.clone(), ran_nested.clone());
        queue.schedule(Box::new(move || {
            assert!(inner_queue.is_flushing());
            // Re-entrant flush is a no-op.
            assert_eq!(inner_queue.flush(), 0);
            inner_queue.schedule(Box::new(move || {
                flag.set(true);
                Ok(())
            }));
            Ok(())
        }));

        assert_eq!(queue.flush(), 2);
        assert!(ran_nested.get());
        assert!(!queue.is_flushing());
    }

    #[test]
    fn failing_callback_does_not_stop_the_flush() {
        let queue = SyncTaskQueue::new();
        let ran = Rc::new(Cell::new(false));

        queue.schedule(Box::new(|| Err(RenderError::component("App", "boom"))));
        let flag = ran.clone();
        queue.schedule(Box::new(move || {
            flag.set(true);
            Ok(())
        }));

        assert_eq!(queue.flush(), 2);
        assert!(ran.get());
    }
}
