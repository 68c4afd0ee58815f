//! Begin phase: compute a node's children on the way down.

use std::rc::Weak;

use tracing::{trace, warn};

use super::child_fiber::ChildReconciler;
use super::lanes::Lanes;
use super::update_queue::process_update_queue;
use crate::config::RootConfig;
use crate::element::VNode;
use crate::error::RenderResult;
use crate::fiber::{FiberArena, FiberId, FiberProps, FiberQueue, MemoizedState, WorkTag};
use crate::hooks::{render_with_hooks, ScheduleUpdate};

/// What the begin phase needs besides the arena.
pub(crate) struct BeginContext<'a> {
    pub lane: Lanes,
    pub scheduler: &'a Weak<dyn ScheduleUpdate>,
    pub config: &'a RootConfig,
}

/// Reconcile the children of `wip` and return its first child, if any.
pub(crate) fn begin_work<I: Clone>(
    arena: &mut FiberArena<I>,
    wip: FiberId,
    ctx: &BeginContext<'_>,
) -> RenderResult<Option<FiberId>> {
    trace!(fiber = wip.raw(), name = arena[wip].display_name(), "begin work");

    match arena[wip].tag {
        WorkTag::HostRoot => Ok(update_host_root(arena, wip, ctx)),
        WorkTag::HostComponent => {
            let children = match &arena[wip].pending_props {
                FiberProps::Element(props) => props.children().clone(),
                _ => VNode::Empty,
            };
            Ok(reconcile_children(arena, wip, &children, ctx))
        }
        WorkTag::HostText => Ok(None),
        WorkTag::FunctionComponent => {
            let children = render_with_hooks(arena, wip, ctx.lane, ctx.scheduler.clone())?;
            Ok(reconcile_children(arena, wip, &children, ctx))
        }
        WorkTag::Fragment => {
            let children = match &arena[wip].pending_props {
                FiberProps::Fragment(children) => children.clone(),
                _ => VNode::Empty,
            };
            Ok(reconcile_children(arena, wip, &children, ctx))
        }
    }
}

/// Drain the root's element queue into its memoized element tree and
/// reconcile that tree.
fn update_host_root<I: Clone>(
    arena: &mut FiberArena<I>,
    wip: FiberId,
    ctx: &BeginContext<'_>,
) -> Option<FiberId> {
    let fiber = &arena[wip];
    let base = match &fiber.memoized_state {
        MemoizedState::Root(element) => element.clone(),
        _ => VNode::Empty,
    };
    let FiberQueue::Root(queue) = &fiber.update_queue else {
        warn!(fiber = wip.raw(), "root node has no element queue");
        return None;
    };

    let pending = queue.borrow_mut().take_pending();
    let next = process_update_queue(base, pending, ctx.lane);
    arena[wip].memoized_state = MemoizedState::Root(next.clone());

    reconcile_children(arena, wip, &next, ctx)
}

/// Diff `children` against the committed children of `wip`. A node with no
/// committed counterpart is mounting, and its children are built without
/// side effects.
fn reconcile_children<I: Clone>(
    arena: &mut FiberArena<I>,
    wip: FiberId,
    children: &VNode,
    ctx: &BeginContext<'_>,
) -> Option<FiberId> {
    let current_first = arena[wip].alternate.map(|current| arena[current].child);
    let track_side_effects = current_first.is_some();

    let child = ChildReconciler::new(arena, track_side_effects)
        .warn_on_duplicate_keys(ctx.config.warn_on_duplicate_keys)
        .reconcile(wip, current_first.flatten(), children);
    arena[wip].child = child;
    child
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{h, Props};
    use crate::fiber::{Fiber, Flags};
    use crate::reconciler::update_queue::{Action, Update, UpdateQueue};

    struct NoopScheduler;

    impl ScheduleUpdate for NoopScheduler {
        fn schedule_update_on_fiber(&self, _fiber: FiberId, _lane: Lanes) {}
    }

    fn with_ctx<R>(f: impl FnOnce(&BeginContext<'_>) -> R) -> R {
        let scheduler: Weak<dyn ScheduleUpdate> = Weak::<NoopScheduler>::new();
        let config = RootConfig::default();
        f(&BeginContext {
            lane: Lanes::SYNC,
            scheduler: &scheduler,
            config: &config,
        })
    }

    #[test]
    fn root_drains_its_queue_and_places_the_tree() {
        let mut arena: FiberArena<()> = FiberArena::new();
        let queue = UpdateQueue::shared();
        let mut root = Fiber::new(WorkTag::HostRoot, FiberProps::Root, None);
        root.update_queue = FiberQueue::Root(queue.clone());
        let current = arena.add(root);
        let wip = arena.create_work_in_progress(current, FiberProps::Root);

        queue
            .borrow_mut()
            .enqueue(Update::new(Action::Replace(h("div").into()), Lanes::SYNC));
        let child = with_ctx(|ctx| begin_work(&mut arena, wip, ctx)).unwrap().unwrap();

        assert!(queue.borrow().is_empty());
        assert_eq!(arena[child].tag(), WorkTag::HostComponent);
        assert!(arena[child].flags().contains(Flags::PLACEMENT));
        assert!(matches!(arena[wip].memoized_state, MemoizedState::Root(VNode::Element(_))));
    }

    #[test]
    fn mounting_host_builds_children_without_flags() {
        let mut arena: FiberArena<()> = FiberArena::new();
        let mut props = Props::new();
        props.set_children(VNode::List(vec![h("li").into(), h("li").into()]));
        let ul = arena.add(Fiber::new(WorkTag::HostComponent, FiberProps::Element(props), None));

        let first = with_ctx(|ctx| begin_work(&mut arena, ul, ctx)).unwrap().unwrap();

        assert!(arena[first].flags().is_empty());
        assert_eq!(arena.child_ids(ul).len(), 2);
    }

    #[test]
    fn text_has_no_children() {
        let mut arena: FiberArena<()> = FiberArena::new();
        let text = arena.add(Fiber::text("hi"));

        assert_eq!(with_ctx(|ctx| begin_work(&mut arena, text, ctx)).unwrap(), None);
    }
}
