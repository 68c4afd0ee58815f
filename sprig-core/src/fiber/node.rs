//! Work Nodes
//!
//! This module defines the node type the work loop operates on.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

use super::flags::Flags;
use crate::element::{Element, ElementType, Key, Props, VNode};
use crate::hooks::{Effect, Hook};
use crate::reconciler::update_queue::SharedQueue;

/// Unique identifier for a work node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FiberId(u64);

impl FiberId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for FiberId {
    fn default() -> Self {
        Self::new()
    }
}

/// The kind of position a node occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkTag {
    /// The root of a tree. Its host instance is the container.
    HostRoot,
    /// A host element such as `div`.
    HostComponent,
    /// A host text node.
    HostText,
    /// A function component.
    FunctionComponent,
    /// A grouping node with no host instance.
    Fragment,
}

impl WorkTag {
    /// Whether nodes of this kind own a host instance.
    pub fn is_host(&self) -> bool {
        matches!(self, WorkTag::HostComponent | WorkTag::HostText)
    }

    /// Whether nodes of this kind can act as a host parent.
    pub fn is_host_parent(&self) -> bool {
        matches!(self, WorkTag::HostComponent | WorkTag::HostRoot)
    }
}

/// Input a node renders from.
#[derive(Debug, Clone, PartialEq)]
pub enum FiberProps {
    Root,
    /// Host elements and components.
    Element(Props),
    Text(String),
    /// A fragment's children.
    Fragment(VNode),
}

impl FiberProps {
    /// The props a node rendering `element` works from.
    pub fn from_element(element: &Element) -> Self {
        match element.ty() {
            ElementType::Fragment => FiberProps::Fragment(element.props().children().clone()),
            ElementType::Host(_) | ElementType::Component(_) => {
                FiberProps::Element(element.props().clone())
            }
        }
    }

    pub fn as_element(&self) -> Option<&Props> {
        match self {
            FiberProps::Element(props) => Some(props),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FiberProps::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// What a node remembers between renders.
#[derive(Clone, Default)]
pub(crate) enum MemoizedState {
    #[default]
    None,
    /// The element tree last computed by the root.
    Root(VNode),
    /// A component's hook list, in call order.
    Hooks(Vec<Hook>),
}

impl MemoizedState {
    pub(crate) fn hooks(&self) -> &[Hook] {
        match self {
            MemoizedState::Hooks(hooks) => hooks,
            _ => &[],
        }
    }
}

/// Queue shared by both buffers of a node.
#[derive(Clone, Default)]
pub(crate) enum FiberQueue {
    #[default]
    None,
    /// The root's pending element updates.
    Root(SharedQueue<VNode>),
    /// Effects a component registered on its last render.
    Effects(Vec<Rc<Effect>>),
}

impl FiberQueue {
    pub(crate) fn effects(&self) -> &[Rc<Effect>] {
        match self {
            FiberQueue::Effects(effects) => effects,
            _ => &[],
        }
    }
}

/// One position in the component tree, in one of the two buffers.
///
/// Links are IDs into the owning [`FiberArena`](super::FiberArena): `child`
/// and `sibling` describe ownership, `return_fiber` and `alternate` are
/// lookups only.
pub struct Fiber<I> {
    id: FiberId,
    pub(crate) tag: WorkTag,
    pub(crate) key: Option<Key>,
    pub(crate) ty: Option<ElementType>,

    pub(crate) pending_props: FiberProps,
    pub(crate) memoized_props: Option<FiberProps>,
    pub(crate) memoized_state: MemoizedState,
    pub(crate) update_queue: FiberQueue,

    /// Host instance for host nodes, container for the root.
    pub(crate) state_node: Option<I>,

    pub(crate) return_fiber: Option<FiberId>,
    pub(crate) sibling: Option<FiberId>,
    pub(crate) child: Option<FiberId>,
    pub(crate) index: usize,

    pub(crate) flags: Flags,
    pub(crate) subtree_flags: Flags,
    pub(crate) deletions: SmallVec<[FiberId; 2]>,

    pub(crate) alternate: Option<FiberId>,
}

impl<I> Fiber<I> {
    pub fn new(tag: WorkTag, pending_props: FiberProps, key: Option<Key>) -> Self {
        Self {
            id: FiberId::new(),
            tag,
            key,
            ty: None,
            pending_props,
            memoized_props: None,
            memoized_state: MemoizedState::None,
            update_queue: FiberQueue::None,
            state_node: None,
            return_fiber: None,
            sibling: None,
            child: None,
            index: 0,
            flags: Flags::empty(),
            subtree_flags: Flags::empty(),
            deletions: SmallVec::new(),
            alternate: None,
        }
    }

    /// Create the node an element describes. Fresh nodes have no alternate.
    pub fn from_element(element: &Element) -> Self {
        let tag = match element.ty() {
            ElementType::Host(_) => WorkTag::HostComponent,
            ElementType::Component(_) => WorkTag::FunctionComponent,
            ElementType::Fragment => WorkTag::Fragment,
        };
        let props = FiberProps::from_element(element);
        let mut fiber = Self::new(tag, props, element.key_ref().cloned());
        fiber.ty = Some(element.ty().clone());
        fiber
    }

    pub fn text(content: &str) -> Self {
        Self::new(WorkTag::HostText, FiberProps::Text(content.to_owned()), None)
    }

    /// A keyless fragment wrapping a nested child list.
    pub fn fragment(children: VNode, key: Option<Key>) -> Self {
        let mut fiber = Self::new(WorkTag::Fragment, FiberProps::Fragment(children), key);
        fiber.ty = Some(ElementType::Fragment);
        fiber
    }

    pub fn id(&self) -> FiberId {
        self.id
    }

    pub fn tag(&self) -> WorkTag {
        self.tag
    }

    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn subtree_flags(&self) -> Flags {
        self.subtree_flags
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn alternate(&self) -> Option<FiberId> {
        self.alternate
    }

    pub fn state_node(&self) -> Option<&I> {
        self.state_node.as_ref()
    }

    /// Name used in diagnostics.
    pub fn display_name(&self) -> &str {
        match (&self.ty, self.tag) {
            (Some(ElementType::Host(tag)), _) => &**tag,
            (Some(ElementType::Component(component)), _) => component.name(),
            (_, WorkTag::HostRoot) => "#root",
            (_, WorkTag::HostText) => "#text",
            _ => "#fragment",
        }
    }
}

impl<I> std::fmt::Debug for Fiber<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fiber")
            .field("id", &self.id)
            .field("name", &self.display_name())
            .field("key", &self.key)
            .field("index", &self.index)
            .field("flags", &self.flags)
            .field("subtree_flags", &self.subtree_flags)
            .finish()
    }
}
