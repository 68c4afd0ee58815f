//! Fiber Arena
//!
//! Owns every work node of one root, in both buffers. Nodes refer to each
//! other by [`FiberId`], so the parent/sibling/alternate back-links never
//! form ownership cycles.

use std::collections::{HashMap, HashSet};
use std::ops::{Index, IndexMut};

use super::flags::Flags;
use super::node::{Fiber, FiberId, FiberProps};

/// Storage for the work nodes of one root.
pub struct FiberArena<I> {
    /// All nodes, indexed by ID.
    nodes: HashMap<FiberId, Fiber<I>>,
}

impl<I: Clone> FiberArena<I> {
    /// Create a new empty arena.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// Add a node to the arena.
    pub fn add(&mut self, fiber: Fiber<I>) -> FiberId {
        let id = fiber.id();
        self.nodes.insert(id, fiber);
        id
    }

    /// Remove a single node. Links pointing at it are left to the caller.
    pub fn remove(&mut self, id: FiberId) -> Option<Fiber<I>> {
        self.nodes.remove(&id)
    }

    pub fn get(&self, id: FiberId) -> Option<&Fiber<I>> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: FiberId) -> Option<&mut Fiber<I>> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: FiberId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Get the total number of nodes across both buffers.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// IDs of `id`'s children, following the sibling chain.
    pub fn child_ids(&self, id: FiberId) -> Vec<FiberId> {
        let mut out = Vec::new();
        let mut next = self.get(id).and_then(|fiber| fiber.child);
        while let Some(child) = next {
            out.push(child);
            next = self.get(child).and_then(|fiber| fiber.sibling);
        }
        out
    }

    /// The work-in-progress counterpart of `current`, for rendering with
    /// `pending_props`.
    ///
    /// The first time a position updates, a new node is allocated and linked
    /// as the alternate. After that the existing alternate is recycled: its
    /// flags and deletions are reset and its props overwritten. Either way,
    /// the shared queue, child pointer and last committed props/state are
    /// copied across from `current` as the starting point for diffing.
    pub fn create_work_in_progress(&mut self, current: FiberId, pending_props: FiberProps) -> FiberId {
        let cur = &self[current];
        let ty = cur.ty.clone();
        let update_queue = cur.update_queue.clone();
        let child = cur.child;
        let memoized_props = cur.memoized_props.clone();
        let memoized_state = cur.memoized_state.clone();
        let (tag, key, state_node) = (cur.tag, cur.key.clone(), cur.state_node.clone());

        let wip = match cur.alternate {
            Some(alternate) => {
                let wip = &mut self[alternate];
                wip.pending_props = pending_props;
                wip.flags = Flags::empty();
                wip.subtree_flags = Flags::empty();
                wip.deletions.clear();
                alternate
            }
            None => {
                let mut wip = Fiber::new(tag, pending_props, key);
                wip.state_node = state_node;
                wip.alternate = Some(current);
                let id = self.add(wip);
                self[current].alternate = Some(id);
                id
            }
        };

        let fiber = &mut self[wip];
        fiber.ty = ty;
        fiber.update_queue = update_queue;
        fiber.child = child;
        fiber.memoized_props = memoized_props;
        fiber.memoized_state = memoized_state;
        wip
    }

    /// Release a deleted subtree: every node below `id` (inclusive) and the
    /// alternates of those nodes. Returns how many nodes were released.
    pub fn remove_subtree(&mut self, id: FiberId) -> usize {
        let mut stack = vec![id];
        let mut removed = 0;

        while let Some(next) = stack.pop() {
            let Some(fiber) = self.nodes.remove(&next) else {
                continue;
            };
            removed += 1;

            let mut child = fiber.child;
            while let Some(c) = child {
                stack.push(c);
                child = self.get(c).and_then(|f| f.sibling);
            }
            if let Some(alternate) = fiber.alternate {
                stack.push(alternate);
            }
        }

        removed
    }

    /// Drop every node that is neither part of the tree rooted at `root` nor
    /// the alternate of such a node. Used to discard an abandoned render.
    pub fn retain_reachable(&mut self, root: FiberId) -> usize {
        let mut keep = HashSet::new();
        let mut stack = vec![root];

        while let Some(id) = stack.pop() {
            let Some(fiber) = self.get(id) else {
                continue;
            };
            if !keep.insert(id) {
                continue;
            }
            if let Some(alternate) = fiber.alternate {
                keep.insert(alternate);
            }
            if let Some(child) = fiber.child {
                stack.push(child);
            }
            if id != root {
                if let Some(sibling) = fiber.sibling {
                    stack.push(sibling);
                }
            }
        }

        let before = self.nodes.len();
        self.nodes.retain(|id, _| keep.contains(id));
        before - self.nodes.len()
    }
}

impl<I: Clone> Default for FiberArena<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> Index<FiberId> for FiberArena<I> {
    type Output = Fiber<I>;

    fn index(&self, id: FiberId) -> &Fiber<I> {
        match self.nodes.get(&id) {
            Some(fiber) => fiber,
            None => panic!("dangling fiber id {id:?}"),
        }
    }
}

impl<I> IndexMut<FiberId> for FiberArena<I> {
    fn index_mut(&mut self, id: FiberId) -> &mut Fiber<I> {
        match self.nodes.get_mut(&id) {
            Some(fiber) => fiber,
            None => panic!("dangling fiber id {id:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Props;
    use crate::fiber::WorkTag;

    fn host(arena: &mut FiberArena<u32>, instance: u32) -> FiberId {
        let mut fiber = Fiber::new(WorkTag::HostComponent, FiberProps::Element(Props::new()), None);
        fiber.state_node = Some(instance);
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
    fn add_and_remove_nodes() {
        let mut arena = FiberArena::new();
        let a = host(&mut arena, 1);
        let b = host(&mut arena, 2);

        assert_eq!(arena.len(), 2);
        arena.remove(a);
        assert_eq!(arena.len(), 1);
        assert!(arena.get(a).is_none());
        assert!(arena.get(b).is_some());
    }

    #[test]
    fn first_work_in_progress_allocates_and_links() {
        let mut arena = FiberArena::new();
        let current = host(&mut arena, 7);

        let wip = arena.create_work_in_progress(current, FiberProps::Element(Props::new()));

        assert_ne!(wip, current);
        assert_eq!(arena[current].alternate(), Some(wip));
        assert_eq!(arena[wip].alternate(), Some(current));
        assert_eq!(arena[wip].state_node(), Some(&7));
    }

    #[test]
    fn later_work_in_progress_recycles_the_alternate() {
        let mut arena = FiberArena::new();
        let current = host(&mut arena, 7);
        let wip = arena.create_work_in_progress(current, FiberProps::Element(Props::new()));
        arena[wip].flags.mark(Flags::PLACEMENT);
        arena[wip].deletions.push(FiberId::new());

        let mut props = Props::new();
        props.set("id", "next");
        let again = arena.create_work_in_progress(current, FiberProps::Element(props.clone()));

        assert_eq!(again, wip);
        assert_eq!(arena.len(), 2);
        assert!(arena[wip].flags().is_empty());
        assert!(arena[wip].deletions.is_empty());
        assert_eq!(arena[wip].pending_props, FiberProps::Element(props));
    }

    #[test]
    fn remove_subtree_releases_descendants_and_alternates() {
        let mut arena = FiberArena::new();
        let root = host(&mut arena, 0);
        let parent = host(&mut arena, 1);
        let a = host(&mut arena, 2);
        let b = host(&mut arena, 3);
        link(&mut arena, root, &[parent]);
        link(&mut arena, parent, &[a, b]);
        arena.create_work_in_progress(a, FiberProps::Element(Props::new()));

        let removed = arena.remove_subtree(parent);

        assert_eq!(removed, 4);
        assert_eq!(arena.len(), 1);
        assert!(arena.contains(root));
    }

    #[test]
    fn retain_reachable_drops_orphans() {
        let mut arena = FiberArena::new();
        let root = host(&mut arena, 0);
        let child = host(&mut arena, 1);
        link(&mut arena, root, &[child]);
        let root_wip = arena.create_work_in_progress(root, FiberProps::Root);
        let orphan = host(&mut arena, 9);
        arena[root_wip].child = Some(orphan);

        let dropped = arena.retain_reachable(root);

        assert_eq!(dropped, 1);
        assert!(arena.contains(root_wip));
        assert!(arena.contains(child));
        assert!(!arena.contains(orphan));
    }
}
