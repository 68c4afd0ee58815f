//! Child Reconciliation
//!
//! Compares the children a node rendered last time (a sibling chain of work
//! nodes) with the children it renders now (a [`VNode`]) and produces the new
//! sibling chain, reusing nodes where key and type allow.
//!
//! # Side Effects
//!
//! The reconciler runs in one of two modes:
//!
//! - **Mounting** (`track_side_effects == false`): the parent is new, so
//!   there is nothing to delete and nothing to move. The whole new subtree
//!   is attached by a single placement higher up.
//! - **Updating**: deletions are recorded on the parent, and new or moved
//!   nodes are flagged for placement.
//!
//! # Move Detection
//!
//! For lists, `last_placed_index` is the highest previous index among the
//! reused nodes seen so far. A reused node whose previous index is lower
//! moved left past one of them and needs placing; every other reused node
//! stays put. One pass, no subsequence computation.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use crate::element::{Element, Key, VNode};
use crate::fiber::{Fiber, FiberArena, FiberId, FiberProps, Flags, WorkTag};

/// How an old child is looked up while reconciling a list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ChildKey {
    Key(Key),
    Index(usize),
}

pub(crate) struct ChildReconciler<'a, I> {
    arena: &'a mut FiberArena<I>,
    track_side_effects: bool,
    warn_on_duplicate_keys: bool,
}

impl<'a, I: Clone> ChildReconciler<'a, I> {
    pub fn new(arena: &'a mut FiberArena<I>, track_side_effects: bool) -> Self {
        Self {
            arena,
            track_side_effects,
            warn_on_duplicate_keys: true,
        }
    }

    pub fn warn_on_duplicate_keys(mut self, enabled: bool) -> Self {
        self.warn_on_duplicate_keys = enabled;
        self
    }

    /// Reconcile `new_child` against the chain starting at `current_first`
    /// and return the first node of the new chain.
    pub fn reconcile(
        &mut self,
        return_fiber: FiberId,
        current_first: Option<FiberId>,
        new_child: &VNode,
    ) -> Option<FiberId> {
        match new_child {
            VNode::Element(element) => {
                let fiber = self.reconcile_single_element(return_fiber, current_first, element);
                Some(self.place_single_child(fiber))
            }
            VNode::Text(content) => {
                let fiber = self.reconcile_single_text(return_fiber, current_first, content);
                Some(self.place_single_child(fiber))
            }
            VNode::List(children) => {
                self.reconcile_children_array(return_fiber, current_first, children)
            }
            VNode::Empty => {
                if current_first.is_some() {
                    debug!(
                        parent = self.arena[return_fiber].display_name(),
                        "children removed"
                    );
                }
                self.delete_remaining_children(return_fiber, current_first);
                None
            }
        }
    }

    // ------------------------------------------------------------------------
    // Deletion
    // ------------------------------------------------------------------------

    fn delete_child(&mut self, return_fiber: FiberId, child: FiberId) {
        if !self.track_side_effects {
            return;
        }
        let parent = &mut self.arena[return_fiber];
        parent.deletions.push(child);
        parent.flags.mark(Flags::CHILD_DELETION);
    }

    fn delete_remaining_children(&mut self, return_fiber: FiberId, first: Option<FiberId>) {
        if !self.track_side_effects {
            return;
        }
        let mut next = first;
        while let Some(child) = next {
            next = self.arena[child].sibling;
            self.delete_child(return_fiber, child);
        }
    }

    // ------------------------------------------------------------------------
    // Single child
    // ------------------------------------------------------------------------

    /// Recycle `current`'s alternate as the first and only child for now.
    fn use_fiber(&mut self, current: FiberId, pending_props: FiberProps) -> FiberId {
        let clone = self.arena.create_work_in_progress(current, pending_props);
        let fiber = &mut self.arena[clone];
        fiber.index = 0;
        fiber.sibling = None;
        clone
    }

    fn create_child(&mut self, return_fiber: FiberId, mut fiber: Fiber<I>) -> FiberId {
        trace!(name = fiber.display_name(), "creating node");
        fiber.return_fiber = Some(return_fiber);
        self.arena.add(fiber)
    }

    fn same_type(&self, current: FiberId, element: &Element) -> bool {
        self.arena[current].ty.as_ref() == Some(element.ty())
    }

    fn reconcile_single_element(
        &mut self,
        return_fiber: FiberId,
        current_first: Option<FiberId>,
        element: &Element,
    ) -> FiberId {
        let mut current = current_first;
        while let Some(cur) = current {
            let sibling = self.arena[cur].sibling;
            if self.arena[cur].key.as_ref() != element.key_ref() {
                self.delete_child(return_fiber, cur);
                current = sibling;
                continue;
            }

            if self.same_type(cur, element) {
                let existing = self.use_fiber(cur, FiberProps::from_element(element));
                self.arena[existing].return_fiber = Some(return_fiber);
                self.delete_remaining_children(return_fiber, sibling);
                return existing;
            }

            // Same key, different type: nothing left can be reused.
            self.delete_remaining_children(return_fiber, Some(cur));
            break;
        }

        self.create_child(return_fiber, Fiber::from_element(element))
    }

    fn reconcile_single_text(
        &mut self,
        return_fiber: FiberId,
        current_first: Option<FiberId>,
        content: &str,
    ) -> FiberId {
        let mut current = current_first;
        while let Some(cur) = current {
            let sibling = self.arena[cur].sibling;
            if self.arena[cur].tag == WorkTag::HostText {
                let existing = self.use_fiber(cur, FiberProps::Text(content.to_owned()));
                self.arena[existing].return_fiber = Some(return_fiber);
                self.delete_remaining_children(return_fiber, sibling);
                return existing;
            }
            self.delete_child(return_fiber, cur);
            current = sibling;
        }

        self.create_child(return_fiber, Fiber::text(content))
    }

    /// A brand-new single child is placed; a reused one stays where it is.
    fn place_single_child(&mut self, fiber: FiberId) -> FiberId {
        let node = &mut self.arena[fiber];
        if self.track_side_effects && node.alternate.is_none() {
            node.flags.mark(Flags::PLACEMENT);
        }
        fiber
    }

    // ------------------------------------------------------------------------
    // Lists
    // ------------------------------------------------------------------------

    fn reconcile_children_array(
        &mut self,
        return_fiber: FiberId,
        current_first: Option<FiberId>,
        new_children: &[VNode],
    ) -> Option<FiberId> {
        let mut existing = IndexMap::new();
        let mut shadowed = Vec::new();
        let mut current = current_first;
        while let Some(cur) = current {
            let fiber = &self.arena[cur];
            let key = match &fiber.key {
                Some(key) => ChildKey::Key(key.clone()),
                None => ChildKey::Index(fiber.index),
            };
            current = fiber.sibling;
            if let Some(previous) = existing.insert(key, cur) {
                shadowed.push(previous);
            }
        }

        let mut seen_keys: HashSet<Key> = HashSet::new();
        let mut last_placed_index = 0;
        let mut first_new: Option<FiberId> = None;
        let mut previous_new: Option<FiberId> = None;

        for (index, child) in new_children.iter().enumerate() {
            let duplicate = match child {
                VNode::Element(element) => element
                    .key_ref()
                    .is_some_and(|key| !seen_keys.insert(key.clone())),
                _ => false,
            };
            if duplicate && self.warn_on_duplicate_keys {
                warn!(
                    parent = self.arena[return_fiber].display_name(),
                    key = ?child.as_element().and_then(Element::key_ref),
                    "encountered two children with the same key"
                );
            }

            let Some(new_fiber) =
                self.update_from_map(&mut existing, return_fiber, index, child, duplicate)
            else {
                continue;
            };

            let fiber = &mut self.arena[new_fiber];
            fiber.index = index;
            fiber.return_fiber = Some(return_fiber);
            let alternate = fiber.alternate;

            match previous_new {
                Some(previous) => self.arena[previous].sibling = Some(new_fiber),
                None => first_new = Some(new_fiber),
            }
            previous_new = Some(new_fiber);

            if !self.track_side_effects {
                continue;
            }
            match alternate {
                Some(current) => {
                    let old_index = self.arena[current].index;
                    if old_index < last_placed_index {
                        self.arena[new_fiber].flags.mark(Flags::PLACEMENT);
                    } else {
                        last_placed_index = old_index;
                    }
                }
                None => self.arena[new_fiber].flags.mark(Flags::PLACEMENT),
            }
        }

        if let Some(last) = previous_new {
            self.arena[last].sibling = None;
        }

        for stale in existing.into_values().chain(shadowed) {
            self.delete_child(return_fiber, stale);
        }

        first_new
    }

    /// Reuse the old child matching `child` if there is one, otherwise
    /// create a new node. `Empty` produces nothing.
    fn update_from_map(
        &mut self,
        existing: &mut IndexMap<ChildKey, FiberId>,
        return_fiber: FiberId,
        index: usize,
        child: &VNode,
        fresh: bool,
    ) -> Option<FiberId> {
        match child {
            VNode::Text(content) => {
                let slot = ChildKey::Index(index);
                if let Some(&before) = existing.get(&slot) {
                    if self.arena[before].tag == WorkTag::HostText {
                        existing.shift_remove(&slot);
                        return Some(self.use_fiber(before, FiberProps::Text(content.clone())));
                    }
                }
                Some(self.create_child(return_fiber, Fiber::text(content)))
            }
            VNode::Element(element) => {
                let slot = match element.key_ref() {
                    Some(key) => ChildKey::Key(key.clone()),
                    None => ChildKey::Index(index),
                };
                if !fresh {
                    if let Some(&before) = existing.get(&slot) {
                        if self.same_type(before, element) {
                            existing.shift_remove(&slot);
                            let props = FiberProps::from_element(element);
                            return Some(self.use_fiber(before, props));
                        }
                    }
                }
                Some(self.create_child(return_fiber, Fiber::from_element(element)))
            }
            VNode::List(children) => {
                let slot = ChildKey::Index(index);
                let props = VNode::List(children.clone());
                if let Some(&before) = existing.get(&slot) {
                    if self.arena[before].tag == WorkTag::Fragment && self.arena[before].key.is_none() {
                        existing.shift_remove(&slot);
                        return Some(self.use_fiber(before, FiberProps::Fragment(props)));
                    }
                }
                Some(self.create_child(return_fiber, Fiber::fragment(props, None)))
            }
            VNode::Empty => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{h, text};

    fn parent(arena: &mut FiberArena<()>) -> FiberId {
        arena.add(Fiber::new(WorkTag::HostRoot, FiberProps::Root, None))
    }

    /// The chain starting at `first`, with each node's flags.
    fn chain(arena: &FiberArena<()>, first: Option<FiberId>) -> Vec<(FiberId, Flags)> {
        let mut out = Vec::new();
        let mut next = first;
        while let Some(id) = next {
            out.push((id, arena[id].flags()));
            next = arena[id].sibling;
        }
        out
    }

    /// Clear the flags of a freshly reconciled chain, as a commit would.
    fn settle(arena: &mut FiberArena<()>, first: Option<FiberId>) -> Vec<FiberId> {
        let ids: Vec<_> = chain(arena, first).into_iter().map(|(id, _)| id).collect();
        for &id in &ids {
            arena[id].flags = Flags::empty();
        }
        ids
    }

    fn keyed(keys: &[&str]) -> VNode {
        VNode::List(keys.iter().map(|k| h("li").key(k).into()).collect())
    }

    fn placed_keys(arena: &FiberArena<()>, chain: &[(FiberId, Flags)]) -> Vec<String> {
        chain
            .iter()
            .filter(|(_, flags)| flags.contains(Flags::PLACEMENT))
            .filter_map(|(id, _)| arena[*id].key().map(|k| k.to_string()))
            .collect()
    }

    #[test]
    fn mount_list_places_nothing() {
        let mut arena = FiberArena::new();
        let root = parent(&mut arena);

        let first = ChildReconciler::new(&mut arena, false).reconcile(root, None, &keyed(&["a", "b"]));
        let children = settle(&mut arena, first);

        assert_eq!(children.len(), 2);
        assert_eq!(arena[children[1]].index(), 1);
        assert!(arena[root].deletions.is_empty());
    }

    #[test]
    fn new_single_child_is_placed_when_tracking() {
        let mut arena = FiberArena::new();
        let root = parent(&mut arena);

        let child = ChildReconciler::new(&mut arena, true)
            .reconcile(root, None, &h("div").into())
            .unwrap();

        assert!(arena[child].flags().contains(Flags::PLACEMENT));
        assert_eq!(arena[child].return_fiber, Some(root));
    }

    #[test]
    fn moving_the_first_item_to_the_end_places_it_alone() {
        let mut arena = FiberArena::new();
        let root = parent(&mut arena);
        let first = ChildReconciler::new(&mut arena, false).reconcile(root, None, &keyed(&["1", "2", "3"]));
        let old = settle(&mut arena, first);

        let first = ChildReconciler::new(&mut arena, true).reconcile(root, first, &keyed(&["2", "3", "1"]));
        let new = chain(&arena, first);

        assert_eq!(placed_keys(&arena, &new), vec!["1"]);
        assert!(arena[root].deletions.is_empty());
        for (id, _) in &new {
            assert!(old.contains(&arena[*id].alternate().unwrap()));
        }
    }

    #[test]
    fn nodes_left_of_the_running_maximum_are_placed() {
        let mut arena = FiberArena::new();
        let root = parent(&mut arena);
        let first = ChildReconciler::new(&mut arena, false).reconcile(root, None, &keyed(&["1", "2", "3"]));
        settle(&mut arena, first);

        let first = ChildReconciler::new(&mut arena, true).reconcile(root, first, &keyed(&["3", "1", "2"]));
        let new = chain(&arena, first);

        // "3" keeps its slot and raises the maximum to 2; both others fall
        // below it.
        assert_eq!(placed_keys(&arena, &new), vec!["1", "2"]);
        assert!(new.iter().all(|(id, _)| arena[*id].alternate().is_some()));
        assert!(arena[root].deletions.is_empty());
    }

    #[test]
    fn same_key_different_type_remounts() {
        let mut arena = FiberArena::new();
        let root = parent(&mut arena);
        let first = ChildReconciler::new(&mut arena, false)
            .reconcile(root, None, &VNode::List(vec![h("div").key(1).into()]));
        let old = settle(&mut arena, first);

        let next = VNode::List(vec![h("span").key(1).into()]);
        let first = ChildReconciler::new(&mut arena, true).reconcile(root, first, &next).unwrap();

        assert!(arena[first].alternate().is_none());
        assert!(arena[first].flags().contains(Flags::PLACEMENT));
        assert_eq!(arena[root].deletions.as_slice(), &[old[0]]);
        assert!(arena[root].flags().contains(Flags::CHILD_DELETION));
    }

    #[test]
    fn single_element_deletes_unmatched_siblings() {
        let mut arena = FiberArena::new();
        let root = parent(&mut arena);
        let first = ChildReconciler::new(&mut arena, false).reconcile(root, None, &keyed(&["a", "b", "c"]));
        let old = settle(&mut arena, first);

        let child = ChildReconciler::new(&mut arena, true)
            .reconcile(root, first, &h("li").key("b").into())
            .unwrap();

        assert_eq!(arena[child].alternate(), Some(old[1]));
        assert!(!arena[child].flags().contains(Flags::PLACEMENT));
        assert_eq!(arena[root].deletions.as_slice(), &[old[0], old[2]]);
    }

    #[test]
    fn text_reuses_any_text_node() {
        let mut arena = FiberArena::new();
        let root = parent(&mut arena);
        let first = ChildReconciler::new(&mut arena, false).reconcile(root, None, &text("old"));
        let old = settle(&mut arena, first);

        let child = ChildReconciler::new(&mut arena, true)
            .reconcile(root, first, &text("new"))
            .unwrap();

        assert_eq!(arena[child].alternate(), Some(old[0]));
        assert_eq!(arena[child].pending_props.as_text(), Some("new"));
    }

    #[test]
    fn empty_child_deletes_everything() {
        let mut arena = FiberArena::new();
        let root = parent(&mut arena);
        let first = ChildReconciler::new(&mut arena, false).reconcile(root, None, &keyed(&["a", "b"]));
        settle(&mut arena, first);

        let result = ChildReconciler::new(&mut arena, true).reconcile(root, first, &VNode::Empty);

        assert!(result.is_none());
        assert_eq!(arena[root].deletions.len(), 2);
    }

    #[test]
    fn empty_entries_keep_positions() {
        let mut arena = FiberArena::new();
        let root = parent(&mut arena);
        let list = VNode::List(vec![VNode::Empty, text("x"), h("b").into()]);

        let first = ChildReconciler::new(&mut arena, false).reconcile(root, None, &list);
        let children = settle(&mut arena, first);

        assert_eq!(children.len(), 2);
        assert_eq!(arena[children[0]].index(), 1);
        assert_eq!(arena[children[1]].index(), 2);
    }

    #[test]
    fn nested_list_becomes_fragment() {
        let mut arena = FiberArena::new();
        let root = parent(&mut arena);
        let list = VNode::List(vec![h("li").into(), keyed(&["x", "y"])]);

        let first = ChildReconciler::new(&mut arena, false).reconcile(root, None, &list);
        let children = settle(&mut arena, first);

        assert_eq!(arena[children[1]].tag(), WorkTag::Fragment);
        assert!(arena[children[1]].key().is_none());

        let first = ChildReconciler::new(&mut arena, true).reconcile(root, first, &list);
        let again = chain(&arena, first);
        assert_eq!(arena[again[1].0].alternate(), Some(children[1]));
        assert!(again.iter().all(|(_, flags)| flags.is_empty()));
    }

    #[test]
    fn duplicate_key_is_created_fresh() {
        let mut arena = FiberArena::new();
        let root = parent(&mut arena);
        let first = ChildReconciler::new(&mut arena, false).reconcile(root, None, &keyed(&["a"]));
        let old = settle(&mut arena, first);

        let first = ChildReconciler::new(&mut arena, true)
            .warn_on_duplicate_keys(false)
            .reconcile(root, first, &keyed(&["a", "a"]));
        let new = chain(&arena, first);

        assert_eq!(arena[new[0].0].alternate(), Some(old[0]));
        assert!(arena[new[1].0].alternate().is_none());
        assert!(new[1].1.contains(Flags::PLACEMENT));
    }
}
