//! Render Context
//!
//! The render context tracks which component is currently rendering so that
//! hooks, which are plain function calls, can find the hook list they belong
//! to.
//!
//! # Implementation
//!
//! We use a thread-local stack of frames. The work loop pushes a frame
//! before calling a component and pops it when the component returns. A
//! render pass always runs to completion on one thread, so the frame is
//! never observed by another render.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::effect::Effect;
use super::runtime::{Hook, ScheduleUpdate};
use crate::error::HookError;
use crate::fiber::FiberId;
use crate::reconciler::lanes::Lanes;

thread_local! {
    static FRAME_STACK: RefCell<Vec<RenderFrame>> = RefCell::new(Vec::new());
}

/// Which hook implementations are in effect for the rendering component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatcher {
    /// First render of this position: hooks allocate their slots.
    Mount,
    /// Re-render: hooks walk the slots from the previous render.
    Update,
}

/// Everything a hook call needs while one component renders.
pub(crate) struct RenderFrame {
    pub fiber: FiberId,
    pub component: Rc<str>,
    pub dispatcher: Dispatcher,
    pub lane: Lanes,
    pub scheduler: Weak<dyn ScheduleUpdate>,

    /// Hooks of the committed node, read during an update render.
    pub current_hooks: Vec<Hook>,
    /// Hooks built by this render, in call order.
    pub hooks: Vec<Hook>,
    /// Effects registered by this render, in call order.
    pub effects: Vec<Rc<Effect>>,
    /// Some effect must run after commit.
    pub needs_passive: bool,
}

impl RenderFrame {
    /// The previous render's hook at the position about to be filled.
    pub fn next_current_hook(&self) -> Result<Hook, HookError> {
        self.current_hooks
            .get(self.hooks.len())
            .cloned()
            .ok_or_else(|| HookError::MoreHooks {
                component: self.component.to_string(),
            })
    }

    pub fn slot_mismatch(&self, expected: &'static str) -> HookError {
        HookError::SlotMismatch {
            component: self.component.to_string(),
            index: self.hooks.len(),
            expected,
        }
    }
}

/// Guard for an active render frame.
///
/// Dropping the guard without calling [`finish`](Self::finish) still pops
/// the frame, so a panicking component does not leave a stale frame behind.
pub(crate) struct RenderContext {
    fiber: FiberId,
    finished: bool,
}

impl RenderContext {
    /// Make `frame` the target of hook calls until the guard is finished.
    pub fn enter(frame: RenderFrame) -> Self {
        let fiber = frame.fiber;
        FRAME_STACK.with(|stack| stack.borrow_mut().push(frame));
        Self {
            fiber,
            finished: false,
        }
    }

    /// Check if a component is rendering.
    #[cfg(test)]
    pub fn is_active() -> bool {
        FRAME_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// The node of the component that is rendering, if any.
    pub fn current_fiber() -> Option<FiberId> {
        FRAME_STACK.with(|stack| stack.borrow().last().map(|frame| frame.fiber))
    }

    /// Run `f` against the active frame.
    ///
    /// `f` must not call back into user code: the frame stack is borrowed
    /// for its duration.
    pub fn with_frame<R>(f: impl FnOnce(&mut RenderFrame) -> R) -> Result<R, HookError> {
        FRAME_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            let frame = stack.last_mut().ok_or(HookError::OutsideRender)?;
            Ok(f(frame))
        })
    }

    /// Pop the frame and hand back what the component's hooks built.
    pub fn finish(mut self) -> RenderFrame {
        self.finished = true;
        let frame = FRAME_STACK.with(|stack| stack.borrow_mut().pop());
        match frame {
            Some(frame) => {
                debug_assert_eq!(frame.fiber, self.fiber, "render frame mismatch");
                frame
            }
            None => panic!("render frame for {:?} already popped", self.fiber),
        }
    }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        FRAME_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();
            if let Some(frame) = popped {
                debug_assert_eq!(
                    frame.fiber, self.fiber,
                    "RenderContext mismatch: expected {:?}, got {:?}",
                    self.fiber, frame.fiber
                );
            }
        });
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    struct NoopScheduler;

    impl ScheduleUpdate for NoopScheduler {
        fn schedule_update_on_fiber(&self, _fiber: FiberId, _lane: Lanes) {}
    }

    pub(crate) fn frame(fiber: FiberId, dispatcher: Dispatcher, current_hooks: Vec<Hook>) -> RenderFrame {
        let scheduler: Weak<dyn ScheduleUpdate> = Weak::<NoopScheduler>::new();
        RenderFrame {
            fiber,
            component: Rc::from("Test"),
            dispatcher,
            lane: Lanes::SYNC,
            scheduler,
            current_hooks,
            hooks: Vec::new(),
            effects: Vec::new(),
            needs_passive: false,
        }
    }

    #[test]
    fn context_tracks_fiber() {
        let id = FiberId::new();

        assert!(!RenderContext::is_active());
        assert!(RenderContext::current_fiber().is_none());

        {
            let _ctx = RenderContext::enter(frame(id, Dispatcher::Mount, Vec::new()));

            assert!(RenderContext::is_active());
            assert_eq!(RenderContext::current_fiber(), Some(id));
        }

        // Context should be cleaned up after drop
        assert!(!RenderContext::is_active());
    }

    #[test]
    fn with_frame_outside_render_is_an_error() {
        let result = RenderContext::with_frame(|frame| frame.fiber);
        assert_eq!(result, Err(HookError::OutsideRender));
    }

    #[test]
    fn finish_returns_the_frame() {
        let id = FiberId::new();
        let ctx = RenderContext::enter(frame(id, Dispatcher::Update, Vec::new()));

        RenderContext::with_frame(|frame| frame.needs_passive = true).unwrap();
        let frame = ctx.finish();

        assert!(frame.needs_passive);
        assert_eq!(frame.dispatcher, Dispatcher::Update);
        assert!(!RenderContext::is_active());
    }

    #[test]
    fn update_frame_without_previous_hooks_reports_more_hooks() {
        let f = frame(FiberId::new(), Dispatcher::Update, Vec::new());
        assert_eq!(
            f.next_current_hook().err(),
            Some(HookError::MoreHooks {
                component: "Test".into()
            })
        );
    }
}
