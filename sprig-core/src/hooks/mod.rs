//! Hooks
//!
//! Hooks let function components keep state and register effects. They are
//! ordinary functions that must be called while a component renders, in the
//! same order on every render of that component.
//!
//! # Design Decisions
//!
//! 1. Hook calls find their component through a thread-local render frame
//!    pushed by the work loop, so components keep a plain `Fn(&Props)`
//!    signature.
//!
//! 2. Every hook returns a `Result`. Calling a hook outside a render, or
//!    calling a different sequence of hooks than the previous render, is a
//!    [`HookError`](crate::HookError) that aborts the render pass.
//!
//! 3. State updates are queued and applied on the next render. Several
//!    dispatches in one turn produce a single render.

mod context;
mod effect;
mod runtime;
mod state;

pub use context::Dispatcher;
pub use effect::{use_effect, use_effect_with, Destroy, Effect, EffectInstance, HookEffectTags, Teardown};
pub use state::{use_lazy_state, use_state, Dispatch};

pub(crate) use effect::{
    commit_hook_effect_list_create, commit_hook_effect_list_destroy,
    commit_hook_effect_list_unmount,
};
pub(crate) use runtime::{render_with_hooks, Hook, ScheduleUpdate};
