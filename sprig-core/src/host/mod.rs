//! Host Platform
//!
//! The engine never touches a concrete UI toolkit. Everything it needs from
//! the platform goes through [`HostConfig`]: creating instances, wiring them
//! into parents, updating them, and deferring work onto the platform's task
//! queues.
//!
//! Host operations are only ever invoked from complete-work (instance
//! creation and initial child wiring of detached instances) and from the
//! commit phase (everything that touches the attached tree).

mod memory;

pub use memory::{HostOp, HostSnapshot, MemoryHost, MemoryInstance};

use crate::element::Props;

/// Deferred unit of work handed to the host scheduler.
pub type Task = Box<dyn FnOnce()>;

/// Operations the reconciler consumes from a host platform.
///
/// Receivers are shared references: hosts are expected to behave like a DOM,
/// where instances are handles into a tree the host mutates internally.
pub trait HostConfig: 'static {
    /// A handle to a host node. Containers are instances too.
    type Instance: Clone + 'static;

    fn create_instance(&self, tag: &str, props: &Props) -> Self::Instance;

    fn create_text_instance(&self, content: &str) -> Self::Instance;

    /// Attach `child` to a parent that is not yet part of the visible tree.
    fn append_initial_child(&self, parent: &Self::Instance, child: &Self::Instance);

    fn append_child_to_container(&self, container: &Self::Instance, child: &Self::Instance);

    fn insert_child_before(
        &self,
        child: &Self::Instance,
        container: &Self::Instance,
        before: &Self::Instance,
    );

    fn remove_child(&self, child: &Self::Instance, container: &Self::Instance);

    /// Apply a changed set of attributes to an element instance.
    fn update_host_props(&self, instance: &Self::Instance, props: &Props);

    fn update_text_content(&self, instance: &Self::Instance, content: &str);

    /// Run `task` once the current synchronous work has finished.
    fn schedule_microtask(&self, task: Task);

    /// Run `task` at some later point. Hosts with a macrotask queue should
    /// override this; the default shares the microtask queue.
    fn schedule_task(&self, task: Task) {
        self.schedule_microtask(task);
    }
}
