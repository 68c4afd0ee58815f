//! Effect flags.
//!
//! Every work node carries the mutations it needs (`flags`) and the union of
//! everything its descendants need (`subtree_flags`). The commit phase reads
//! the latter to skip clean subtrees without visiting them.

use bitflags::bitflags;

bitflags! {
    /// Pending work recorded on a node during render.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u8 {
        /// Insert (or move) the node's host instances.
        const PLACEMENT = 1 << 0;
        /// Push changed props or text to the host instance.
        const UPDATE = 1 << 1;
        /// Some children were staged for deletion.
        const CHILD_DELETION = 1 << 2;
        /// A component registered effects that must run after commit.
        const PASSIVE = 1 << 3;
    }
}

impl Flags {
    /// Flags the mutation sweep acts on.
    pub const MUTATION_MASK: Flags = Flags::PLACEMENT
        .union(Flags::UPDATE)
        .union(Flags::CHILD_DELETION);

    /// Flags that require a passive-effect flush after commit. Deletions are
    /// included because unmounted components run their destroy callbacks.
    pub const PASSIVE_MASK: Flags = Flags::PASSIVE.union(Flags::CHILD_DELETION);

    pub fn mark(&mut self, flags: Flags) {
        self.insert(flags);
    }

    pub fn clear(&mut self, flags: Flags) {
        self.remove(flags);
    }

    /// Whether any of `flags` is set.
    pub fn has_any(&self, flags: Flags) -> bool {
        self.intersects(flags)
    }
}
