//! Commit Engine
//!
//! Applies a finished work-in-progress tree to the host.
//!
//! # How the Sweep Works
//!
//! The sweep walks the finished tree depth first, descending only into
//! subtrees whose `subtree_flags` carry mutation or passive work, and
//! commits each node after its children. On every visited node it handles,
//! in order: placement, update, child deletion, and passive effects.
//!
//! Passive effects are not run here. They are collected into
//! [`PendingPassiveEffects`] and flushed later by the root, once the host
//! tree is fully up to date.

use std::rc::Rc;

use serde::Serialize;
use tracing::{trace, warn};

use crate::fiber::{FiberArena, FiberId, FiberProps, Flags, WorkTag};
use crate::hooks::{
    commit_hook_effect_list_create, commit_hook_effect_list_destroy,
    commit_hook_effect_list_unmount, Effect, HookEffectTags,
};
use crate::host::HostConfig;

/// Effects collected by a commit, waiting to be flushed.
#[derive(Default)]
pub(crate) struct PendingPassiveEffects {
    /// Effects of removed components, child before parent.
    pub unmount: Vec<Rc<Effect>>,
    /// Effects of updated or mounted components, child before parent.
    pub update: Vec<Rc<Effect>>,
}

impl PendingPassiveEffects {
    pub fn is_empty(&self) -> bool {
        self.unmount.is_empty() && self.update.is_empty()
    }
}

/// What a single commit did, counted per work node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommitStats {
    pub placements: usize,
    pub updates: usize,
    /// Subtrees removed, counted at their top node.
    pub deletions: usize,
    /// Components whose effects were queued to run.
    pub passive: usize,
}

impl CommitStats {
    /// Nothing was placed, updated or removed.
    pub fn is_clean(&self) -> bool {
        self.placements == 0 && self.updates == 0 && self.deletions == 0
    }
}

enum PassiveKind {
    Update,
    Unmount,
}

/// Sweep the finished tree rooted at `finished_work`.
pub(crate) fn commit_mutation_effects<H: HostConfig>(
    arena: &mut FiberArena<H::Instance>,
    host: &H,
    finished_work: FiberId,
    pending: &mut PendingPassiveEffects,
) -> CommitStats {
    let mut stats = CommitStats::default();
    let mut next = Some(finished_work);

    while let Some(node) = next {
        let fiber = &arena[node];
        let descend = fiber
            .subtree_flags
            .intersects(Flags::MUTATION_MASK | Flags::PASSIVE_MASK);
        if let (true, Some(child)) = (descend, fiber.child) {
            next = Some(child);
            continue;
        }

        let mut up = Some(node);
        next = None;
        while let Some(node) = up {
            commit_mutation_effects_on_fiber(arena, host, node, pending, &mut stats);
            if node == finished_work {
                break;
            }
            if let Some(sibling) = arena[node].sibling {
                next = Some(sibling);
                break;
            }
            up = arena[node].return_fiber;
        }
    }

    stats
}

fn commit_mutation_effects_on_fiber<H: HostConfig>(
    arena: &mut FiberArena<H::Instance>,
    host: &H,
    id: FiberId,
    pending: &mut PendingPassiveEffects,
    stats: &mut CommitStats,
) {
    let flags = arena[id].flags;

    if flags.contains(Flags::PLACEMENT) {
        commit_placement(arena, host, id);
        arena[id].flags.clear(Flags::PLACEMENT);
        stats.placements += 1;
    }
    if flags.contains(Flags::UPDATE) {
        commit_update(arena, host, id);
        arena[id].flags.clear(Flags::UPDATE);
        stats.updates += 1;
    }
    if flags.contains(Flags::CHILD_DELETION) {
        let deletions = std::mem::take(&mut arena[id].deletions);
        for child in deletions {
            commit_deletion(arena, host, child, pending);
            stats.deletions += 1;
        }
        arena[id].flags.clear(Flags::CHILD_DELETION);
    }
    if flags.contains(Flags::PASSIVE) {
        commit_passive_effect(arena, id, pending, PassiveKind::Update);
        arena[id].flags.clear(Flags::PASSIVE);
        stats.passive += 1;
    }
}

// ----------------------------------------------------------------------------
// Placement
// ----------------------------------------------------------------------------

fn commit_placement<H: HostConfig>(arena: &FiberArena<H::Instance>, host: &H, id: FiberId) {
    trace!(fiber = id.raw(), name = arena[id].display_name(), "placement");
    let Some(parent) = get_host_parent(arena, id) else {
        warn!(fiber = id.raw(), "no host parent for placed node");
        return;
    };
    let before = get_host_sibling(arena, id);
    insert_or_append_placement_node(arena, host, id, &parent, before.as_ref());
}

/// The instance of the nearest host ancestor, or the container.
fn get_host_parent<I: Clone>(arena: &FiberArena<I>, id: FiberId) -> Option<I> {
    let mut parent = arena[id].return_fiber;
    while let Some(p) = parent {
        let fiber = &arena[p];
        if fiber.tag.is_host_parent() {
            return fiber.state_node.clone();
        }
        parent = fiber.return_fiber;
    }
    None
}

/// The host instance `id`'s instances must be inserted before: the first
/// host node after `id` in tree order under the same host parent that is
/// not itself waiting to be placed.
fn get_host_sibling<I: Clone>(arena: &FiberArena<I>, id: FiberId) -> Option<I> {
    let mut node = id;

    'siblings: loop {
        let sibling = loop {
            let fiber = &arena[node];
            if let Some(sibling) = fiber.sibling {
                break sibling;
            }
            match fiber.return_fiber {
                Some(parent) if !arena[parent].tag.is_host_parent() => node = parent,
                _ => return None,
            }
        };
        node = sibling;

        while !arena[node].tag.is_host() {
            let fiber = &arena[node];
            if fiber.flags.contains(Flags::PLACEMENT) {
                continue 'siblings;
            }
            match fiber.child {
                Some(child) => node = child,
                None => continue 'siblings,
            }
        }

        let fiber = &arena[node];
        if !fiber.flags.contains(Flags::PLACEMENT) {
            return fiber.state_node.clone();
        }
    }
}

fn insert_or_append_placement_node<H: HostConfig>(
    arena: &FiberArena<H::Instance>,
    host: &H,
    id: FiberId,
    parent: &H::Instance,
    before: Option<&H::Instance>,
) {
    let fiber = &arena[id];
    if fiber.tag.is_host() {
        if let Some(instance) = &fiber.state_node {
            match before {
                Some(before) => host.insert_child_before(instance, parent, before),
                None => host.append_child_to_container(parent, instance),
            }
        }
        return;
    }

    let mut child = fiber.child;
    while let Some(c) = child {
        insert_or_append_placement_node(arena, host, c, parent, before);
        child = arena[c].sibling;
    }
}

// ----------------------------------------------------------------------------
// Update
// ----------------------------------------------------------------------------

fn commit_update<H: HostConfig>(arena: &FiberArena<H::Instance>, host: &H, id: FiberId) {
    let fiber = &arena[id];
    let Some(instance) = &fiber.state_node else {
        warn!(fiber = id.raw(), "update on a node without a host instance");
        return;
    };
    match (&fiber.tag, &fiber.memoized_props) {
        (WorkTag::HostComponent, Some(FiberProps::Element(props))) => {
            host.update_host_props(instance, props);
        }
        (WorkTag::HostText, Some(FiberProps::Text(content))) => {
            host.update_text_content(instance, content);
        }
        (tag, _) => warn!(fiber = id.raw(), ?tag, "unexpected update"),
    }
}

// ----------------------------------------------------------------------------
// Deletion
// ----------------------------------------------------------------------------

/// Remove the subtree rooted at `child_to_delete` from the host and from
/// the arena, queuing the unmount effects of every component inside it.
fn commit_deletion<H: HostConfig>(
    arena: &mut FiberArena<H::Instance>,
    host: &H,
    child_to_delete: FiberId,
    pending: &mut PendingPassiveEffects,
) {
    trace!(
        fiber = child_to_delete.raw(),
        name = arena[child_to_delete].display_name(),
        "deletion"
    );

    let mut host_children = Vec::new();
    collect_deleted_subtree(arena, child_to_delete, false, &mut host_children, pending);

    if !host_children.is_empty() {
        match get_host_parent(arena, child_to_delete) {
            Some(parent) => {
                for instance in &host_children {
                    host.remove_child(instance, &parent);
                }
            }
            None => warn!(fiber = child_to_delete.raw(), "no host parent for deleted node"),
        }
    }

    arena.remove_subtree(child_to_delete);
}

/// Post-order walk of a deleted subtree. Host instances are recorded only
/// when no host ancestor inside the subtree will take them along.
fn collect_deleted_subtree<I: Clone>(
    arena: &FiberArena<I>,
    id: FiberId,
    inside_host: bool,
    host_children: &mut Vec<I>,
    pending: &mut PendingPassiveEffects,
) {
    let fiber = &arena[id];
    let is_host = fiber.tag.is_host();
    if is_host && !inside_host {
        if let Some(instance) = &fiber.state_node {
            host_children.push(instance.clone());
        }
    }

    let mut child = fiber.child;
    while let Some(c) = child {
        collect_deleted_subtree(arena, c, inside_host || is_host, host_children, pending);
        child = arena[c].sibling;
    }

    if fiber.tag == WorkTag::FunctionComponent {
        commit_passive_effect(arena, id, pending, PassiveKind::Unmount);
    }
}

// ----------------------------------------------------------------------------
// Passive effects
// ----------------------------------------------------------------------------

fn commit_passive_effect<I>(
    arena: &FiberArena<I>,
    id: FiberId,
    pending: &mut PendingPassiveEffects,
    kind: PassiveKind,
) {
    let fiber = &arena[id];
    if fiber.tag != WorkTag::FunctionComponent {
        return;
    }
    let effects = fiber.update_queue.effects();
    match kind {
        PassiveKind::Update => {
            if fiber.flags.contains(Flags::PASSIVE) {
                pending.update.extend(effects.iter().cloned());
            }
        }
        PassiveKind::Unmount => pending.unmount.extend(effects.iter().cloned()),
    }
}

/// Run collected effects: every unmount teardown, then every teardown of a
/// firing effect, then every create.
pub(crate) fn flush_passive_effects(pending: PendingPassiveEffects) {
    let firing = HookEffectTags::PASSIVE | HookEffectTags::HAS_EFFECT;

    commit_hook_effect_list_unmount(HookEffectTags::PASSIVE, &pending.unmount);
    commit_hook_effect_list_destroy(firing, &pending.update);
    commit_hook_effect_list_create(firing, &pending.update);
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::VNode;
    use crate::fiber::Fiber;

    fn node(arena: &mut FiberArena<u32>, tag: WorkTag, instance: Option<u32>) -> FiberId {
        let props = match tag {
            WorkTag::Fragment => FiberProps::Fragment(VNode::Empty),
            WorkTag::HostRoot => FiberProps::Root,
            _ => FiberProps::Text(String::new()),
        };
        let mut fiber = Fiber::new(tag, props, None);
        fiber.state_node = instance;
        arena.add(fiber)
    }

    fn link(arena: &mut FiberArena<u32>, parent: FiberId, children: &[FiberId]) {
        arena[parent].child = children.first().copied();
        for pair in children.windows(2) {
            arena[pair[0]].sibling = Some(pair[1]);
        }
        for &child in children {
            arena[child].return_fiber = Some(parent);
        }
    }

    #[test]
    fn host_parent_skips_fragments() {
        let mut arena = FiberArena::new();
        let root = node(&mut arena, WorkTag::HostRoot, Some(0));
        let frag = node(&mut arena, WorkTag::Fragment, None);
        let text = node(&mut arena, WorkTag::HostText, Some(1));
        link(&mut arena, root, &[frag]);
        link(&mut arena, frag, &[text]);

        assert_eq!(get_host_parent(&arena, text), Some(0));
    }

    #[test]
    fn host_sibling_skips_pending_placements_and_enters_fragments() {
        let mut arena = FiberArena::new();
        let root = node(&mut arena, WorkTag::HostRoot, Some(0));
        let placed = node(&mut arena, WorkTag::HostText, Some(1));
        let moving = node(&mut arena, WorkTag::HostText, Some(2));
        let frag = node(&mut arena, WorkTag::Fragment, None);
        let inner = node(&mut arena, WorkTag::HostText, Some(3));
        link(&mut arena, root, &[placed, moving, frag]);
        link(&mut arena, frag, &[inner]);
        arena[moving].flags.mark(Flags::PLACEMENT);

        assert_eq!(get_host_sibling(&arena, placed), Some(3));
        assert_eq!(get_host_sibling(&arena, inner), None);
    }

    #[test]
    fn host_sibling_climbs_out_of_fragments() {
        let mut arena = FiberArena::new();
        let root = node(&mut arena, WorkTag::HostRoot, Some(0));
        let frag = node(&mut arena, WorkTag::Fragment, None);
        let inner = node(&mut arena, WorkTag::HostText, Some(1));
        let after = node(&mut arena, WorkTag::HostText, Some(2));
        link(&mut arena, root, &[frag, after]);
        link(&mut arena, frag, &[inner]);

        assert_eq!(get_host_sibling(&arena, inner), Some(2));
    }

    #[test]
    fn empty_stats_are_clean() {
        let stats = CommitStats {
            passive: 2,
            ..CommitStats::default()
        };
        assert!(stats.is_clean());
    }
}
