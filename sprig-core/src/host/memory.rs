//! In-memory host.
//!
//! A DOM-shaped tree kept in a map, a log of every mutation the reconciler
//! asked for, and a FIFO task queue that stands in for the platform's event
//! loop. Tests drive it with [`MemoryHost::run_until_idle`].

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fmt::Write as _;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::{HostConfig, Task};
use crate::element::Props;

/// Handle to a node owned by a [`MemoryHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MemoryInstance(u32);

impl MemoryInstance {
    pub fn raw(&self) -> u32 {
        self.0
    }
}

/// One mutation requested by the reconciler.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HostOp {
    CreateInstance { id: u32, tag: String },
    CreateText { id: u32, content: String },
    AppendInitialChild { parent: u32, child: u32 },
    AppendChild { parent: u32, child: u32 },
    InsertBefore { parent: u32, child: u32, before: u32 },
    RemoveChild { parent: u32, child: u32 },
    UpdateProps { id: u32 },
    UpdateText { id: u32, content: String },
}

impl HostOp {
    /// Whether this operation changed the attached tree.
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            HostOp::CreateInstance { .. }
                | HostOp::CreateText { .. }
                | HostOp::AppendInitialChild { .. }
        )
    }
}

/// Serialisable view of a host subtree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HostSnapshot {
    Element {
        tag: String,
        #[serde(skip_serializing_if = "IndexMap::is_empty")]
        attrs: IndexMap<String, Value>,
        children: Vec<HostSnapshot>,
    },
    Text(String),
}

#[derive(Debug)]
enum NodeKind {
    Element {
        tag: String,
        attrs: IndexMap<String, Value>,
    },
    Text(String),
}

#[derive(Debug)]
struct HostNode {
    kind: NodeKind,
    parent: Option<MemoryInstance>,
    children: Vec<MemoryInstance>,
}

#[derive(Default)]
struct Inner {
    nodes: RefCell<HashMap<MemoryInstance, HostNode>>,
    ops: RefCell<Vec<HostOp>>,
    tasks: RefCell<VecDeque<Task>>,
    next_id: Cell<u32>,
}

/// An in-memory host platform. Cloning shares the same tree.
#[derive(Clone, Default)]
pub struct MemoryHost {
    inner: Rc<Inner>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A detached element to use as a root container.
    pub fn create_container(&self) -> MemoryInstance {
        self.insert(NodeKind::Element {
            tag: "#root".into(),
            attrs: IndexMap::new(),
        })
    }

    /// Run queued tasks, including ones they queue, until none are left.
    /// Returns how many ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        loop {
            // The borrow must end before the task runs: tasks schedule tasks.
            let next = self.inner.tasks.borrow_mut().pop_front();
            match next {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    /// Nodes the host still owns, containers included.
    pub fn node_count(&self) -> usize {
        self.inner.nodes.borrow().len()
    }

    pub fn pending_tasks(&self) -> usize {
        self.inner.tasks.borrow().len()
    }

    /// Drain the mutation log.
    pub fn take_ops(&self) -> Vec<HostOp> {
        std::mem::take(&mut *self.inner.ops.borrow_mut())
    }

    /// Children of `instance`, in order.
    pub fn children(&self, instance: &MemoryInstance) -> Vec<MemoryInstance> {
        self.inner
            .nodes
            .borrow()
            .get(instance)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    pub fn parent(&self, instance: &MemoryInstance) -> Option<MemoryInstance> {
        self.inner.nodes.borrow().get(instance).and_then(|node| node.parent)
    }

    pub fn snapshot(&self, container: &MemoryInstance) -> Vec<HostSnapshot> {
        let nodes = self.inner.nodes.borrow();
        self.children(container)
            .iter()
            .map(|child| snapshot_node(&nodes, child))
            .collect()
    }

    /// Compact markup for the children of `container`, e.g.
    /// `<ul><li key="a">a</li></ul>`.
    pub fn markup(&self, container: &MemoryInstance) -> String {
        let nodes = self.inner.nodes.borrow();
        let mut out = String::new();
        for child in self.children(container) {
            write_markup(&nodes, &child, &mut out);
        }
        out
    }

    fn insert(&self, kind: NodeKind) -> MemoryInstance {
        let id = MemoryInstance(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);
        self.inner.nodes.borrow_mut().insert(
            id,
            HostNode {
                kind,
                parent: None,
                children: Vec::new(),
            },
        );
        id
    }

    fn record(&self, op: HostOp) {
        self.inner.ops.borrow_mut().push(op);
    }

    /// Detach `child` from its current parent, if any.
    fn detach(nodes: &mut HashMap<MemoryInstance, HostNode>, child: MemoryInstance) {
        let parent = nodes.get(&child).and_then(|node| node.parent);
        if let Some(parent) = parent {
            if let Some(parent_node) = nodes.get_mut(&parent) {
                parent_node.children.retain(|c| *c != child);
            }
        }
        if let Some(node) = nodes.get_mut(&child) {
            node.parent = None;
        }
    }

    /// Forget `id` and everything below it.
    fn drop_subtree(nodes: &mut HashMap<MemoryInstance, HostNode>, id: MemoryInstance) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if let Some(node) = nodes.remove(&id) {
                stack.extend(node.children);
            }
        }
    }

    fn append(&self, parent: MemoryInstance, child: MemoryInstance) {
        let mut nodes = self.inner.nodes.borrow_mut();
        Self::detach(&mut nodes, child);
        if let Some(parent_node) = nodes.get_mut(&parent) {
            parent_node.children.push(child);
        }
        if let Some(node) = nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
    }
}

impl HostConfig for MemoryHost {
    type Instance = MemoryInstance;

    fn create_instance(&self, tag: &str, props: &Props) -> MemoryInstance {
        let id = self.insert(NodeKind::Element {
            tag: tag.to_owned(),
            attrs: props.attrs().clone(),
        });
        self.record(HostOp::CreateInstance {
            id: id.0,
            tag: tag.to_owned(),
        });
        id
    }

    fn create_text_instance(&self, content: &str) -> MemoryInstance {
        let id = self.insert(NodeKind::Text(content.to_owned()));
        self.record(HostOp::CreateText {
            id: id.0,
            content: content.to_owned(),
        });
        id
    }

    fn append_initial_child(&self, parent: &MemoryInstance, child: &MemoryInstance) {
        self.append(*parent, *child);
        self.record(HostOp::AppendInitialChild {
            parent: parent.0,
            child: child.0,
        });
    }

    fn append_child_to_container(&self, container: &MemoryInstance, child: &MemoryInstance) {
        self.append(*container, *child);
        self.record(HostOp::AppendChild {
            parent: container.0,
            child: child.0,
        });
    }

    fn insert_child_before(
        &self,
        child: &MemoryInstance,
        container: &MemoryInstance,
        before: &MemoryInstance,
    ) {
        {
            let mut nodes = self.inner.nodes.borrow_mut();
            Self::detach(&mut nodes, *child);
            if let Some(parent_node) = nodes.get_mut(container) {
                match parent_node.children.iter().position(|c| c == before) {
                    Some(index) => parent_node.children.insert(index, *child),
                    None => {
                        warn!(?before, ?container, "insert anchor is not a child; appending");
                        parent_node.children.push(*child);
                    }
                }
            }
            if let Some(node) = nodes.get_mut(child) {
                node.parent = Some(*container);
            }
        }
        self.record(HostOp::InsertBefore {
            parent: container.0,
            child: child.0,
            before: before.0,
        });
    }

    fn remove_child(&self, child: &MemoryInstance, container: &MemoryInstance) {
        {
            let mut nodes = self.inner.nodes.borrow_mut();
            let attached = nodes
                .get(child)
                .map_or(false, |node| node.parent == Some(*container));
            if attached {
                Self::detach(&mut nodes, *child);
                Self::drop_subtree(&mut nodes, *child);
            } else {
                warn!(?child, ?container, "remove_child: not a child of container");
            }
        }
        self.record(HostOp::RemoveChild {
            parent: container.0,
            child: child.0,
        });
    }

    fn update_host_props(&self, instance: &MemoryInstance, props: &Props) {
        if let Some(HostNode {
            kind: NodeKind::Element { attrs, .. },
            ..
        }) = self.inner.nodes.borrow_mut().get_mut(instance)
        {
            *attrs = props.attrs().clone();
        }
        self.record(HostOp::UpdateProps { id: instance.0 });
    }

    fn update_text_content(&self, instance: &MemoryInstance, content: &str) {
        if let Some(HostNode {
            kind: NodeKind::Text(text),
            ..
        }) = self.inner.nodes.borrow_mut().get_mut(instance)
        {
            *text = content.to_owned();
        }
        self.record(HostOp::UpdateText {
            id: instance.0,
            content: content.to_owned(),
        });
    }

    fn schedule_microtask(&self, task: Task) {
        self.inner.tasks.borrow_mut().push_back(task);
    }
}

fn snapshot_node(nodes: &HashMap<MemoryInstance, HostNode>, id: &MemoryInstance) -> HostSnapshot {
    match nodes.get(id) {
        Some(HostNode {
            kind: NodeKind::Element { tag, attrs },
            children,
            ..
        }) => HostSnapshot::Element {
            tag: tag.clone(),
            attrs: attrs.clone(),
            children: children.iter().map(|c| snapshot_node(nodes, c)).collect(),
        },
        Some(HostNode {
            kind: NodeKind::Text(text),
            ..
        }) => HostSnapshot::Text(text.clone()),
        None => HostSnapshot::Text(String::new()),
    }
}

fn write_markup(nodes: &HashMap<MemoryInstance, HostNode>, id: &MemoryInstance, out: &mut String) {
    match nodes.get(id) {
        Some(HostNode {
            kind: NodeKind::Element { tag, attrs },
            children,
            ..
        }) => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in attrs {
                match value {
                    Value::String(s) => {
                        let _ = write!(out, " {name}=\"{s}\"");
                    }
                    other => {
                        let _ = write!(out, " {name}={other}");
                    }
                }
            }
            out.push('>');
            for child in children {
                write_markup(nodes, child, out);
            }
            let _ = write!(out, "</{tag}>");
        }
        Some(HostNode {
            kind: NodeKind::Text(text),
            ..
        }) => out.push_str(text),
        None => {}
    }
}
