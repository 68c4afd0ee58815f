//! Work Nodes and the Dual Buffer
//!
//! Every position in the rendered tree is represented by up to two work
//! nodes ("fibers"): the one reachable from the root's `current` pointer,
//! which describes what is on screen, and its `alternate`, which the next
//! render builds into. A commit swaps the two by repointing `current`.
//!
//! # Design Decisions
//!
//! 1. Nodes live in a [`FiberArena`] and refer to each other by ID. Parents
//!    own their children through `child`/`sibling`; `return_fiber` and
//!    `alternate` are lookups only, so no reference cycles form.
//!
//! 2. Once a position has rendered twice, its two nodes are recycled for
//!    every later render instead of being reallocated.
//!
//! 3. Pending work is recorded as [`Flags`] on each node and unioned into
//!    ancestors while completing, so the commit can skip clean subtrees.

mod arena;
mod flags;
mod node;

pub use arena::FiberArena;
pub use flags::Flags;
pub use node::{Fiber, FiberId, FiberProps, WorkTag};

pub(crate) use node::{FiberQueue, MemoizedState};
