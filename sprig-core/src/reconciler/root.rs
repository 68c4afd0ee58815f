//! Roots
//!
//! A root ties one host container to one tree of work nodes. Applications
//! create a root with [`create_root`] and drive it with
//! [`RootHandle::render`]; everything after that happens on the host's task
//! queues.
//!
//! # Example
//!
//! ```rust
//! use sprig_core::{create_root, h, MemoryHost};
//!
//! let host = MemoryHost::new();
//! let container = host.create_container();
//! let root = create_root(container, host.clone());
//!
//! root.render(h("p").child("hello"));
//! host.run_until_idle();
//!
//! assert_eq!(host.markup(root.container()), "<p>hello</p>");
//! ```

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::debug;

use super::commit_work::{CommitStats, PendingPassiveEffects};
use super::lanes::{request_update_lane, Lanes};
use super::sync_queue::SyncTaskQueue;
use super::update_queue::{Action, SharedQueue, Update, UpdateQueue};
use crate::config::RootConfig;
use crate::element::VNode;
use crate::error::RenderError;
use crate::fiber::{Fiber, FiberArena, FiberId, FiberProps, FiberQueue, WorkTag};
use crate::hooks::ScheduleUpdate;
use crate::host::HostConfig;

/// The work-node side of a root. Only the work loop touches it, and only
/// while no component is running user code that could re-enter the root.
pub(crate) struct FiberRoot<I> {
    pub arena: FiberArena<I>,
    /// The committed root node.
    pub current: FiberId,
    /// A rendered tree waiting to be committed.
    pub finished_work: Option<FiberId>,
    pub finished_lane: Lanes,
    pub pending_passive: PendingPassiveEffects,
    pub last_commit: CommitStats,
}

/// Everything one root owns. Dispatch handles and scheduled tasks hold it
/// weakly; the [`RootHandle`] holds the only strong reference.
pub(crate) struct RootShared<H: HostConfig> {
    pub host: H,
    pub container: H::Instance,
    pub config: RootConfig,
    pub tree: RefCell<FiberRoot<H::Instance>>,
    /// The root node's element queue, shared by both root buffers.
    pub element_queue: SharedQueue<VNode>,

    pub pending_lanes: Cell<Lanes>,
    pub sync_queue: SyncTaskQueue,
    /// A render callback is queued and has not started yet.
    pub callback_scheduled: Cell<bool>,
    pub passive_scheduled: Cell<bool>,
    /// Passive callbacks are running right now.
    pub flushing_passive: Cell<bool>,
    /// Some pending work was scheduled by a passive callback.
    pub passive_update: Cell<bool>,
    /// Consecutive render passes scheduled by passive callbacks.
    pub nested_update_count: Cell<u32>,
    pub last_error: RefCell<Option<RenderError>>,

    pub this: Weak<RootShared<H>>,
}

impl<H: HostConfig> RootShared<H> {
    fn new(container: H::Instance, host: H, config: RootConfig) -> Rc<Self> {
        let element_queue = UpdateQueue::shared();

        let mut root = Fiber::new(WorkTag::HostRoot, FiberProps::Root, None);
        root.state_node = Some(container.clone());
        root.update_queue = FiberQueue::Root(element_queue.clone());

        let mut arena = FiberArena::new();
        let current = arena.add(root);

        Rc::new_cyclic(|this| Self {
            host,
            container,
            config,
            tree: RefCell::new(FiberRoot {
                arena,
                current,
                finished_work: None,
                finished_lane: Lanes::NO_LANES,
                pending_passive: PendingPassiveEffects::default(),
                last_commit: CommitStats::default(),
            }),
            element_queue,
            pending_lanes: Cell::new(Lanes::NO_LANES),
            sync_queue: SyncTaskQueue::new(),
            callback_scheduled: Cell::new(false),
            passive_scheduled: Cell::new(false),
            flushing_passive: Cell::new(false),
            passive_update: Cell::new(false),
            nested_update_count: Cell::new(0),
            last_error: RefCell::new(None),
            this: this.clone(),
        })
    }

    pub fn scheduler(&self) -> Weak<dyn ScheduleUpdate> {
        self.this.clone()
    }
}

/// Create a root rendering into `container` with default options.
pub fn create_root<H: HostConfig>(container: H::Instance, host: H) -> RootHandle<H> {
    create_root_with_config(container, host, RootConfig::default())
}

pub fn create_root_with_config<H: HostConfig>(
    container: H::Instance,
    host: H,
    config: RootConfig,
) -> RootHandle<H> {
    let shared = RootShared::new(container, host, config);
    debug!(root = shared.tree.borrow().current.raw(), "root created");
    RootHandle { shared }
}

/// Owning handle to a root. Dropping it stops all further rendering; any
/// tasks still queued on the host become no-ops.
pub struct RootHandle<H: HostConfig> {
    shared: Rc<RootShared<H>>,
}

impl<H: HostConfig> RootHandle<H> {
    /// Replace the root's element tree. The render happens when the host
    /// runs its next microtask, or on [`flush_sync`](Self::flush_sync).
    pub fn render(&self, element: impl Into<VNode>) {
        let lane = request_update_lane();
        self.shared
            .element_queue
            .borrow_mut()
            .enqueue(Update::new(Action::Replace(element.into()), lane));

        let root = self.shared.tree.borrow().current;
        self.shared.schedule_update_on_fiber(root, lane);
    }

    /// Run all queued render work now instead of waiting for the host.
    pub fn flush_sync(&self) {
        self.shared.flush_sync_callbacks();
    }

    /// The error of the most recent failed render pass, if any.
    pub fn take_error(&self) -> Option<RenderError> {
        self.shared.last_error.borrow_mut().take()
    }

    pub fn host(&self) -> &H {
        &self.shared.host
    }

    pub fn container(&self) -> &H::Instance {
        &self.shared.container
    }

    pub fn config(&self) -> &RootConfig {
        &self.shared.config
    }

    /// What the most recent commit did.
    pub fn last_commit(&self) -> CommitStats {
        self.shared.tree.borrow().last_commit
    }

    /// Number of work nodes held across both buffers.
    pub fn node_count(&self) -> usize {
        self.shared.tree.borrow().arena.len()
    }

    /// Whether a render is queued and has not run yet.
    pub fn has_pending_work(&self) -> bool {
        !self.shared.pending_lanes.get().is_empty()
    }
}

impl<H: HostConfig> std::fmt::Debug for RootHandle<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootHandle")
            .field("pending_lanes", &self.shared.pending_lanes.get())
            .field("nodes", &self.node_count())
            .finish()
    }
}
