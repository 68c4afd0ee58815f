//! Sprig Core
//!
//! This crate provides the reconciliation engine for the Sprig declarative
//! UI framework. It implements:
//!
//! - Element descriptions built with [`h`], [`text`] and [`fragment`]
//! - A double-buffered tree of work nodes and a begin/complete render loop
//! - Keyed child reconciliation that reuses host instances across moves
//! - A single-sweep commit phase and deferred passive effects
//! - Function components with [`use_state`] and [`use_effect`]
//!
//! The engine is host agnostic: it drives any platform that implements
//! [`HostConfig`]. [`MemoryHost`] is an in-memory implementation used by
//! the tests and handy for server-side snapshots.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `element`: element descriptions and component definitions
//! - `fiber`: work nodes, their flags, and the arena that owns both buffers
//! - `reconciler`: scheduling, render, diffing and commit
//! - `hooks`: per-component state and effects
//! - `host`: the host platform contract and the in-memory host
//!
//! # Example
//!
//! ```rust
//! use sprig_core::{component, create_root, h, use_effect_with, use_state, Component, MemoryHost};
//!
//! let counter = Component::new("Counter", |_props| {
//!     let (count, set_count) = use_state(0)?;
//!     use_effect_with(count, move || {
//!         if count < 3 {
//!             set_count.set(count + 1);
//!         }
//!     })?;
//!     Ok(h("span").child(count).into())
//! });
//!
//! let host = MemoryHost::new();
//! let root = create_root(host.create_container(), host.clone());
//! root.render(component(&counter));
//! host.run_until_idle();
//!
//! assert_eq!(host.markup(root.container()), "<span>3</span>");
//! ```

pub mod config;
pub mod element;
pub mod error;
pub mod fiber;
pub mod hooks;
pub mod host;
pub mod reconciler;

pub use config::RootConfig;
pub use element::{component, fragment, h, text, Component, Element, ElementType, Key, Props, VNode};
pub use error::{HookError, RenderError, RenderResult};
pub use hooks::{use_effect, use_effect_with, use_lazy_state, use_state, Dispatch, Teardown};
pub use host::{HostConfig, HostOp, HostSnapshot, MemoryHost, MemoryInstance};
pub use reconciler::{create_root, create_root_with_config, Action, CommitStats, Lanes, RootHandle};
