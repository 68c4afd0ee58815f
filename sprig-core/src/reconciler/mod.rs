//! Reconciler
//!
//! Turns element trees into host mutations. A render pass builds a
//! work-in-progress tree next to the committed one, diffing children as it
//! goes; the commit then applies the recorded flags to the host in one
//! sweep.
//!
//! - [`root`]: roots and the public [`RootHandle`]
//! - `work_loop`: scheduling, the render loop and the commit entry point
//! - `begin_work` / `complete_work`: the two halves of a unit of work
//! - `child_fiber`: keyed child reconciliation
//! - `commit_work`: the mutation sweep and passive effect flushing
//! - [`lanes`], [`update_queue`], [`sync_queue`]: update plumbing

pub mod lanes;
pub mod root;
pub mod sync_queue;
pub mod update_queue;

mod begin_work;
mod child_fiber;
mod commit_work;
mod complete_work;
mod work_loop;

pub use commit_work::CommitStats;
pub use lanes::{request_update_lane, Lanes};
pub use root::{create_root, create_root_with_config, RootHandle};
pub use update_queue::{Action, Update, UpdateQueue};
