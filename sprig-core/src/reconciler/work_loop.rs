//! Work Loop
//!
//! Drives a root from "an update was scheduled" to "the host shows the new
//! tree".
//!
//! # Phases
//!
//! 1. **Schedule.** An update marks its lane pending on the root and makes
//!    sure one render callback sits on the root's sync queue, with a host
//!    microtask queued to flush it.
//! 2. **Render.** Starting from a fresh work-in-progress root, each node is
//!    begun on the way down and completed on the way back up. Nothing the
//!    user can see changes here, and a failure discards the whole pass.
//! 3. **Commit.** The finished tree is swept once to apply host mutations
//!    and collect passive effects, and then becomes the current tree.
//! 4. **Passive flush.** A host task runs the collected effect callbacks,
//!    then any sync work they scheduled.

use tracing::{debug, error, trace};

use super::begin_work::{begin_work, BeginContext};
use super::commit_work::{commit_mutation_effects, flush_passive_effects, CommitStats};
use super::complete_work::complete_work;
use super::lanes::Lanes;
use super::root::RootShared;
use crate::error::{RenderError, RenderResult};
use crate::fiber::{FiberArena, FiberId, FiberProps, Flags};
use crate::hooks::ScheduleUpdate;
use crate::host::HostConfig;

impl<H: HostConfig> ScheduleUpdate for RootShared<H> {
    fn schedule_update_on_fiber(&self, fiber: FiberId, lane: Lanes) {
        trace!(fiber = fiber.raw(), ?lane, "update scheduled");
        if self.flushing_passive.get() {
            self.passive_update.set(true);
        }
        self.pending_lanes.set(self.pending_lanes.get().merge(lane));
        self.ensure_root_is_scheduled();
    }
}

impl<H: HostConfig> RootShared<H> {
    /// Queue a render callback for the most urgent pending lane, unless one
    /// is already queued.
    pub(crate) fn ensure_root_is_scheduled(&self) {
        let lane = self.pending_lanes.get().highest_priority();
        if lane != Lanes::SYNC || self.callback_scheduled.replace(true) {
            return;
        }

        let root = self.this.clone();
        self.sync_queue.schedule(Box::new(move || match root.upgrade() {
            Some(root) => root.perform_sync_work_on_root(),
            None => Ok(()),
        }));

        let root = self.this.clone();
        self.host.schedule_microtask(Box::new(move || {
            if let Some(root) = root.upgrade() {
                root.flush_sync_callbacks();
            }
        }));
    }

    pub(crate) fn flush_sync_callbacks(&self) {
        self.sync_queue.flush();
    }

    /// Render and commit every pending synchronous update.
    fn perform_sync_work_on_root(&self) -> RenderResult<()> {
        // Effects of the previous commit run before the next render.
        self.flush_pending_passive();
        self.callback_scheduled.set(false);

        // Only renders scheduled from passive callbacks extend the chain;
        // work from anywhere else starts a new one.
        let chained = self.passive_update.replace(false);

        let lane = self.pending_lanes.get().highest_priority();
        if lane != Lanes::SYNC {
            trace!(?lane, "no synchronous work on root");
            return Ok(());
        }

        let count = if chained {
            self.nested_update_count.get() + 1
        } else {
            1
        };
        if count > self.config.nested_update_limit {
            self.nested_update_count.set(0);
            self.pending_lanes.set(Lanes::NO_LANES);
            return Err(self.fail(RenderError::NestedUpdateLimit {
                limit: self.config.nested_update_limit,
            }));
        }
        self.nested_update_count.set(count);
        self.pending_lanes.set(self.pending_lanes.get().difference(lane));

        match self.render_root(lane) {
            Ok(()) => {
                self.commit_root();
                Ok(())
            }
            Err(err) => {
                let mut tree = self.tree.borrow_mut();
                let current = tree.current;
                let released = tree.arena.retain_reachable(current);
                tree.finished_work = None;
                drop(tree);
                debug!(released, "discarded work-in-progress tree");
                Err(self.fail(err))
            }
        }
    }

    fn fail(&self, err: RenderError) -> RenderError {
        error!(%err, "render pass failed");
        *self.last_error.borrow_mut() = Some(err.clone());
        err
    }

    fn render_root(&self, lane: Lanes) -> RenderResult<()> {
        let mut tree = self.tree.borrow_mut();
        let tree = &mut *tree;
        debug!(root = tree.current.raw(), ?lane, "render started");

        let wip_root = tree.arena.create_work_in_progress(tree.current, FiberProps::Root);
        let scheduler = self.scheduler();
        let ctx = BeginContext {
            lane,
            scheduler: &scheduler,
            config: &self.config,
        };

        let mut next = Some(wip_root);
        while let Some(unit) = next {
            next = perform_unit_of_work(&mut tree.arena, &self.host, unit, wip_root, &ctx)?;
        }

        tree.finished_work = Some(wip_root);
        tree.finished_lane = lane;
        Ok(())
    }

    fn commit_root(&self) {
        let mut tree = self.tree.borrow_mut();
        let tree = &mut *tree;
        let Some(finished) = tree.finished_work.take() else {
            return;
        };
        let lane = std::mem::replace(&mut tree.finished_lane, Lanes::NO_LANES);

        let root = &tree.arena[finished];
        let pending = root.flags | root.subtree_flags;
        debug!(root = finished.raw(), ?lane, ?pending, "commit started");

        if pending.intersects(Flags::PASSIVE_MASK) && !self.passive_scheduled.replace(true) {
            let root = self.this.clone();
            self.host.schedule_task(Box::new(move || {
                if let Some(root) = root.upgrade() {
                    root.flush_passive_task();
                }
            }));
        }

        tree.last_commit = if pending.intersects(Flags::MUTATION_MASK | Flags::PASSIVE_MASK) {
            commit_mutation_effects(&mut tree.arena, &self.host, finished, &mut tree.pending_passive)
        } else {
            CommitStats::default()
        };
        tree.current = finished;
        debug!(stats = ?tree.last_commit, nodes = tree.arena.len(), "commit finished");
    }

    fn flush_passive_task(&self) {
        self.passive_scheduled.set(false);
        self.flush_pending_passive();
        self.flush_sync_callbacks();
    }

    /// Run the effects collected by the last commit, if any are waiting.
    /// The tree is not borrowed while callbacks run.
    fn flush_pending_passive(&self) {
        let pending = std::mem::take(&mut self.tree.borrow_mut().pending_passive);
        if pending.is_empty() {
            return;
        }
        debug!(
            unmount = pending.unmount.len(),
            update = pending.update.len(),
            "flushing passive effects"
        );
        self.flushing_passive.set(true);
        flush_passive_effects(pending);
        self.flushing_passive.set(false);
    }
}

/// Begin `unit`; when it has no children, complete it and its ancestors
/// until a sibling turns up. Returns the next unit of work.
fn perform_unit_of_work<H: HostConfig>(
    arena: &mut FiberArena<H::Instance>,
    host: &H,
    unit: FiberId,
    wip_root: FiberId,
    ctx: &BeginContext<'_>,
) -> RenderResult<Option<FiberId>> {
    let child = begin_work(arena, unit, ctx)?;
    let fiber = &mut arena[unit];
    fiber.memoized_props = Some(fiber.pending_props.clone());

    match child {
        Some(child) => Ok(Some(child)),
        None => Ok(complete_unit_of_work(arena, host, unit, wip_root)),
    }
}

fn complete_unit_of_work<H: HostConfig>(
    arena: &mut FiberArena<H::Instance>,
    host: &H,
    unit: FiberId,
    wip_root: FiberId,
) -> Option<FiberId> {
    let mut node = unit;
    loop {
        complete_work(arena, host, node);
        if node == wip_root {
            return None;
        }
        if let Some(sibling) = arena[node].sibling {
            return Some(sibling);
        }
        node = arena[node].return_fiber?;
    }
}
