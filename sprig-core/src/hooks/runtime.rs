//! Hook Runtime
//!
//! Connects the work loop to the hook functions. The work loop calls
//! [`render_with_hooks`] for every function component it visits; that sets
//! up a render frame, runs the component, checks the hook count, and stores
//! the resulting hook and effect lists on the work node.

use std::any::Any;
use std::rc::{Rc, Weak};

use super::context::{Dispatcher, RenderContext, RenderFrame};
use super::effect::Effect;
use crate::element::{ElementType, VNode};
use crate::error::{HookError, RenderError, RenderResult};
use crate::fiber::{FiberArena, FiberId, FiberQueue, Flags, MemoizedState};
use crate::reconciler::lanes::Lanes;

/// Something that can be told a node has pending state updates.
///
/// Implemented by the root; dispatch handles hold it weakly.
pub(crate) trait ScheduleUpdate {
    fn schedule_update_on_fiber(&self, fiber: FiberId, lane: Lanes);
}

/// One hook slot.
#[derive(Clone)]
pub(crate) enum Hook {
    /// A `StateCell<T>` for the slot's state type.
    State(Rc<dyn Any>),
    Effect(Rc<Effect>),
}

impl std::fmt::Debug for Hook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Hook::State(_) => f.write_str("State"),
            Hook::Effect(effect) => f.debug_tuple("Effect").field(effect).finish(),
        }
    }
}

/// Render the function component at `wip` and record its hooks.
///
/// The node renders with update semantics when it has a committed
/// counterpart, and with mount semantics otherwise.
pub(crate) fn render_with_hooks<I: Clone>(
    arena: &mut FiberArena<I>,
    wip: FiberId,
    lane: Lanes,
    scheduler: Weak<dyn ScheduleUpdate>,
) -> RenderResult<VNode> {
    let fiber = &mut arena[wip];
    fiber.memoized_state = MemoizedState::None;
    fiber.update_queue = FiberQueue::None;

    let Some(ElementType::Component(component)) = fiber.ty.clone() else {
        return Err(RenderError::component(
            fiber.display_name(),
            "function component node has no component",
        ));
    };
    let props = fiber.pending_props.as_element().cloned().unwrap_or_default();
    let alternate = fiber.alternate;

    let (dispatcher, current_hooks) = match alternate {
        Some(current) => (Dispatcher::Update, arena[current].memoized_state.hooks().to_vec()),
        None => (Dispatcher::Mount, Vec::new()),
    };

    let ctx = RenderContext::enter(RenderFrame {
        fiber: wip,
        component: Rc::from(component.name()),
        dispatcher,
        lane,
        scheduler,
        current_hooks,
        hooks: Vec::new(),
        effects: Vec::new(),
        needs_passive: false,
    });
    debug_assert_eq!(RenderContext::current_fiber(), Some(wip));
    let result = component.render(&props);
    let frame = ctx.finish();
    let children = result?;

    if dispatcher == Dispatcher::Update && frame.hooks.len() != frame.current_hooks.len() {
        let component = component.name().to_owned();
        let err = if frame.hooks.len() > frame.current_hooks.len() {
            HookError::MoreHooks { component }
        } else {
            HookError::FewerHooks {
                component,
                expected: frame.current_hooks.len(),
                actual: frame.hooks.len(),
            }
        };
        return Err(err.into());
    }

    let fiber = &mut arena[wip];
    fiber.memoized_state = MemoizedState::Hooks(frame.hooks);
    fiber.update_queue = FiberQueue::Effects(frame.effects);
    if frame.needs_passive {
        fiber.flags.mark(Flags::PASSIVE);
    }

    Ok(children)
}
