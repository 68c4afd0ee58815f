//! Error types.
//!
//! Two families of failure can reach a caller:
//!
//! - [`HookError`]: a component broke the rules of hooks. These are raised at
//!   the hook call site and travel out of the component through `?`.
//! - [`RenderError`]: a render pass failed. The work-in-progress tree is
//!   discarded and the previously committed host tree stays on screen.
//!
//! Structural oddities in the element tree are not errors; they are logged
//! as diagnostics and rendering carries on.

use thiserror::Error;

/// A violation of the hook contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    /// A hook was called while no component was rendering.
    #[error("hooks can only be called inside the body of a function component")]
    OutsideRender,

    /// The component called more hooks than it did on its previous render.
    #[error("component `{component}` rendered more hooks than during the previous render")]
    MoreHooks { component: String },

    /// The component returned after calling fewer hooks than last time.
    #[error(
        "component `{component}` rendered fewer hooks than expected: \
         {actual} this render, {expected} previously"
    )]
    FewerHooks {
        component: String,
        expected: usize,
        actual: usize,
    },

    /// The hook at `index` is a different kind (or holds a different state
    /// type) than the hook at the same position on the previous render.
    #[error("hook #{index} of component `{component}` changed between renders: expected {expected}")]
    SlotMismatch {
        component: String,
        index: usize,
        expected: &'static str,
    },
}

/// A failed render pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error(transparent)]
    Hook(#[from] HookError),

    /// A component reported its own failure.
    #[error("component `{component}` failed to render: {message}")]
    Component { component: String, message: String },

    /// Effects kept scheduling synchronous work without yielding to the host.
    #[error("maximum update depth exceeded ({limit} nested render passes)")]
    NestedUpdateLimit { limit: u32 },
}

impl RenderError {
    /// Build a component failure from inside a render function.
    pub fn component(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Result of rendering a component.
pub type RenderResult<T> = Result<T, RenderError>;
