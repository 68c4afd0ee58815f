//! Element Descriptions
//!
//! Elements are the declarative input to the engine: cheap, immutable
//! descriptions of what the tree should look like. A render pass compares
//! them against the committed work nodes and turns the difference into host
//! mutations.
//!
//! # Building Trees
//!
//! ```rust
//! use sprig_core::element::{h, VNode};
//!
//! let list = h("ul").children((1..=3).map(|n| {
//!     VNode::from(h("li").key(n).child(n))
//! }));
//!
//! assert_eq!(list.tag(), Some("ul"));
//! ```
//!
//! A builder given exactly one child stores it as that child; several
//! children are stored as a [`VNode::List`]. Numbers become text.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::RenderResult;

/// Identity of a child among its siblings.
pub type Key = Rc<str>;

/// One child description.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum VNode {
    /// A host element, component or fragment.
    Element(Element),
    /// A text run. Numbers are stored in their display form.
    Text(String),
    /// An ordered list of children, reconciled by key or position.
    List(Vec<VNode>),
    /// Renders nothing.
    #[default]
    Empty,
}

impl VNode {
    pub fn is_empty(&self) -> bool {
        matches!(self, VNode::Empty)
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            VNode::Element(element) => Some(element),
            _ => None,
        }
    }
}

impl From<Element> for VNode {
    fn from(element: Element) -> Self {
        VNode::Element(element)
    }
}

impl From<String> for VNode {
    fn from(text: String) -> Self {
        VNode::Text(text)
    }
}

impl From<&str> for VNode {
    fn from(text: &str) -> Self {
        VNode::Text(text.to_owned())
    }
}

impl From<Vec<VNode>> for VNode {
    fn from(children: Vec<VNode>) -> Self {
        VNode::List(children)
    }
}

impl<T: Into<VNode>> From<Option<T>> for VNode {
    fn from(child: Option<T>) -> Self {
        child.map_or(VNode::Empty, Into::into)
    }
}

macro_rules! impl_number_child {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for VNode {
                fn from(n: $ty) -> Self {
                    VNode::Text(n.to_string())
                }
            }
        )*
    };
}

impl_number_child!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

/// Text child helper, mostly for readability inside `children([...])`.
pub fn text(content: impl fmt::Display) -> VNode {
    VNode::Text(content.to_string())
}

// ----------------------------------------------------------------------------
// Components
// ----------------------------------------------------------------------------

type RenderFn = dyn Fn(&Props) -> RenderResult<VNode>;

/// A function component.
///
/// Two components are the same type only when they share the same render
/// function allocation, so create a component once and clone the handle.
#[derive(Clone)]
pub struct Component {
    name: Rc<str>,
    render: Rc<RenderFn>,
}

impl Component {
    pub fn new<F>(name: &str, render: F) -> Self
    where
        F: Fn(&Props) -> RenderResult<VNode> + 'static,
    {
        Self {
            name: Rc::from(name),
            render: Rc::new(render),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn render(&self, props: &Props) -> RenderResult<VNode> {
        (self.render)(props)
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.render, &other.render)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({})", self.name)
    }
}

// ----------------------------------------------------------------------------
// Elements
// ----------------------------------------------------------------------------

/// What an element renders as.
#[derive(Clone, Debug, PartialEq)]
pub enum ElementType {
    /// A host-platform element such as `div`.
    Host(Rc<str>),
    /// A function component.
    Component(Component),
    /// Groups its children without a host element of its own.
    Fragment,
}

/// Attributes plus children.
///
/// Both halves are reference counted, so handing props to a work node is a
/// pair of pointer copies however large the subtree below is.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Props {
    attrs: Rc<IndexMap<String, Value>>,
    children: Rc<VNode>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    pub fn attrs(&self) -> &IndexMap<String, Value> {
        &self.attrs
    }

    pub fn children(&self) -> &VNode {
        &self.children
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        Rc::make_mut(&mut self.attrs).insert(name.into(), value.into());
    }

    pub fn set_children(&mut self, children: VNode) {
        self.children = Rc::new(children);
    }

    /// Whether the host-visible part of two prop sets differs. Children are
    /// reconciled separately and are ignored here.
    pub(crate) fn attrs_differ(&self, other: &Props) -> bool {
        !Rc::ptr_eq(&self.attrs, &other.attrs) && self.attrs != other.attrs
    }
}

/// A description of one node to render.
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    ty: ElementType,
    key: Option<Key>,
    props: Props,
}

impl Element {
    pub fn new(ty: ElementType) -> Self {
        Self {
            ty,
            key: None,
            props: Props::default(),
        }
    }

    pub fn ty(&self) -> &ElementType {
        &self.ty
    }

    pub fn key_ref(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    /// The tag of a host element.
    pub fn tag(&self) -> Option<&str> {
        match &self.ty {
            ElementType::Host(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn key(mut self, key: impl fmt::Display) -> Self {
        self.key = Some(Rc::from(key.to_string()));
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.set(name, value);
        self
    }

    /// Replace the children with a single child.
    pub fn child(mut self, child: impl Into<VNode>) -> Self {
        self.props.set_children(child.into());
        self
    }

    /// Replace the children with a list: none is stored as empty, one is
    /// stored bare.
    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<VNode>,
    {
        let mut children: Vec<VNode> = children.into_iter().map(Into::into).collect();
        self.props.set_children(match children.len() {
            0 => VNode::Empty,
            1 => children.remove(0),
            _ => VNode::List(children),
        });
        self
    }
}

/// A host element.
pub fn h(tag: &str) -> Element {
    Element::new(ElementType::Host(Rc::from(tag)))
}

/// An element rendering `component`.
pub fn component(component: &Component) -> Element {
    Element::new(ElementType::Component(component.clone()))
}

/// A fragment grouping `children`.
pub fn fragment<I>(children: I) -> Element
where
    I: IntoIterator,
    I::Item: Into<VNode>,
{
    Element::new(ElementType::Fragment).children(children)
}
