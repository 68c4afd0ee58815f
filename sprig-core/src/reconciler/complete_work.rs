//! Complete phase: materialise host instances on the way back up.
//!
//! Host nodes that are mounting get a detached instance with every host
//! descendant already attached, so a single placement later inserts the
//! whole subtree. Host nodes that are updating are only compared; the host
//! is not touched until the commit.

use tracing::{trace, warn};

use crate::element::ElementType;
use crate::fiber::{FiberArena, FiberId, FiberProps, Flags, WorkTag};
use crate::host::HostConfig;

pub(crate) fn complete_work<H: HostConfig>(
    arena: &mut FiberArena<H::Instance>,
    host: &H,
    wip: FiberId,
) {
    let fiber = &arena[wip];
    let updating = fiber.alternate.is_some() && fiber.state_node.is_some();
    trace!(fiber = wip.raw(), name = fiber.display_name(), updating, "complete work");

    match fiber.tag {
        WorkTag::HostComponent if updating => {
            let changed = match (previous_props(arena, wip), &fiber.pending_props) {
                (Some(FiberProps::Element(old)), FiberProps::Element(new)) => old.attrs_differ(new),
                _ => true,
            };
            if changed {
                arena[wip].flags.mark(Flags::UPDATE);
            }
        }
        WorkTag::HostComponent => {
            let (Some(ElementType::Host(tag)), FiberProps::Element(props)) =
                (&fiber.ty, &fiber.pending_props)
            else {
                warn!(fiber = wip.raw(), "host node without a tag");
                bubble_properties(arena, wip);
                return;
            };
            let instance = host.create_instance(tag, props);
            append_all_children(arena, host, &instance, wip);
            arena[wip].state_node = Some(instance);
        }
        WorkTag::HostText if updating => {
            let changed = match (previous_props(arena, wip), &fiber.pending_props) {
                (Some(FiberProps::Text(old)), FiberProps::Text(new)) => old != new,
                _ => true,
            };
            if changed {
                arena[wip].flags.mark(Flags::UPDATE);
            }
        }
        WorkTag::HostText => {
            let content = fiber.pending_props.as_text().unwrap_or_default();
            let instance = host.create_text_instance(content);
            arena[wip].state_node = Some(instance);
        }
        WorkTag::HostRoot | WorkTag::FunctionComponent | WorkTag::Fragment => {}
    }

    bubble_properties(arena, wip);
}

/// Props the committed counterpart of `wip` last rendered with.
fn previous_props<I>(arena: &FiberArena<I>, wip: FiberId) -> Option<&FiberProps> {
    let current = arena[wip].alternate?;
    arena[current].memoized_props.as_ref()
}

/// Attach the top-level host instances below `wip` to `parent`, looking
/// through components and fragments.
fn append_all_children<H: HostConfig>(
    arena: &FiberArena<H::Instance>,
    host: &H,
    parent: &H::Instance,
    wip: FiberId,
) {
    let Some(mut node) = arena[wip].child else {
        return;
    };

    loop {
        let fiber = &arena[node];
        if fiber.tag.is_host() {
            if let Some(instance) = &fiber.state_node {
                host.append_initial_child(parent, instance);
            }
        } else if let Some(child) = fiber.child {
            node = child;
            continue;
        }

        loop {
            if let Some(sibling) = arena[node].sibling {
                node = sibling;
                break;
            }
            match arena[node].return_fiber {
                Some(up) if up != wip => node = up,
                _ => return,
            }
        }
    }
}

/// Union every child's flags and subtree flags into `wip.subtree_flags`.
fn bubble_properties<I>(arena: &mut FiberArena<I>, wip: FiberId) {
    let mut subtree = Flags::empty();
    let mut next = arena[wip].child;
    while let Some(child) = next {
        let fiber = &mut arena[child];
        subtree |= fiber.subtree_flags | fiber.flags;
        fiber.return_fiber = Some(wip);
        next = fiber.sibling;
    }
    arena[wip].subtree_flags |= subtree;
}
