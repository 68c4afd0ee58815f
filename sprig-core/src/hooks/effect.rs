//! Effect Hooks
//!
//! An effect is a callback a component asks to run after its output has been
//! committed to the host.
//!
//! # How Effects Work
//!
//! 1. Each render, `use_effect` records an [`Effect`] on the component's
//!    effect list. Whether it will fire is decided right there: always for
//!    [`use_effect`], only when the dependencies changed for
//!    [`use_effect_with`].
//!
//! 2. After the commit, the root runs the destroy callbacks left by the
//!    previous run of every firing effect, then the create callbacks.
//!
//! 3. A create callback may return a teardown. It is stored on the effect's
//!    [`EffectInstance`], which is shared across renders of the same hook
//!    slot, so the next render can reach it.
//!
//! # Cleanup
//!
//! When a component is removed from the tree, the destroy callbacks of all
//! its effects run, whatever their dependencies.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;

use super::context::{Dispatcher, RenderContext};
use super::runtime::Hook;
use crate::error::HookError;

bitflags! {
    /// What an effect record asks the commit to do.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HookEffectTags: u8 {
        /// The effect fires this commit.
        const HAS_EFFECT = 1 << 0;
        /// Runs after the commit, outside the mutation sweep.
        const PASSIVE = 1 << 1;
    }
}

/// Teardown callback returned by an effect.
pub type Destroy = Box<dyn FnOnce()>;

type Create = Box<dyn FnOnce() -> Option<Destroy>>;

/// Values an effect callback may return: nothing, or a teardown closure.
pub trait Teardown: 'static {
    fn into_destroy(self) -> Option<Destroy>;
}

impl Teardown for () {
    fn into_destroy(self) -> Option<Destroy> {
        None
    }
}

impl<F: FnOnce() + 'static> Teardown for F {
    fn into_destroy(self) -> Option<Destroy> {
        Some(Box::new(self))
    }
}

/// Dependency values compared between renders.
pub(crate) trait Deps {
    fn as_any(&self) -> &dyn Any;
    fn same_as(&self, other: &dyn Deps) -> bool;
}

impl<T: PartialEq + 'static> Deps for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn same_as(&self, other: &dyn Deps) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| other == self)
    }
}

/// Both renders supplied dependencies and they compare equal.
fn are_hook_inputs_equal(next: Option<&Rc<dyn Deps>>, prev: Option<&Rc<dyn Deps>>) -> bool {
    match (next, prev) {
        (Some(next), Some(prev)) => next.same_as(&**prev),
        _ => false,
    }
}

/// State that outlives a single render of an effect hook.
#[derive(Default)]
pub struct EffectInstance {
    destroy: RefCell<Option<Destroy>>,
}

impl EffectInstance {
    pub fn has_destroy(&self) -> bool {
        self.destroy.borrow().is_some()
    }
}

/// One effect registered during one render.
pub struct Effect {
    tags: Cell<HookEffectTags>,
    create: RefCell<Option<Create>>,
    instance: Rc<EffectInstance>,
    deps: Option<Rc<dyn Deps>>,
}

impl Effect {
    fn new(
        tags: HookEffectTags,
        create: Create,
        instance: Rc<EffectInstance>,
        deps: Option<Rc<dyn Deps>>,
    ) -> Self {
        Self {
            tags: Cell::new(tags),
            create: RefCell::new(Some(create)),
            instance,
            deps,
        }
    }

    pub fn tags(&self) -> HookEffectTags {
        self.tags.get()
    }

    pub fn instance(&self) -> &Rc<EffectInstance> {
        &self.instance
    }

    fn matches(&self, tags: HookEffectTags) -> bool {
        self.tags.get().contains(tags)
    }

    /// Run and clear the stored teardown, if any.
    fn run_destroy(&self) {
        let destroy = self.instance.destroy.borrow_mut().take();
        if let Some(destroy) = destroy {
            destroy();
        }
    }

    /// Run the create callback once and keep its teardown.
    fn run_create(&self) {
        let create = self.create.borrow_mut().take();
        if let Some(create) = create {
            let destroy = create();
            *self.instance.destroy.borrow_mut() = destroy;
        }
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("tags", &self.tags.get())
            .field("has_deps", &self.deps.is_some())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Commit helpers
// ----------------------------------------------------------------------------

/// Run the teardowns of effects whose owner is being removed. Matching
/// effects lose `HAS_EFFECT` so they cannot fire afterwards.
pub(crate) fn commit_hook_effect_list_unmount(tags: HookEffectTags, effects: &[Rc<Effect>]) {
    for effect in effects.iter().filter(|effect| effect.matches(tags)) {
        effect.run_destroy();
        effect
            .tags
            .set(effect.tags.get().difference(HookEffectTags::HAS_EFFECT));
    }
}

/// Run the teardowns of matching effects ahead of their next create.
pub(crate) fn commit_hook_effect_list_destroy(tags: HookEffectTags, effects: &[Rc<Effect>]) {
    for effect in effects.iter().filter(|effect| effect.matches(tags)) {
        effect.run_destroy();
    }
}

/// Run the create callbacks of matching effects.
pub(crate) fn commit_hook_effect_list_create(tags: HookEffectTags, effects: &[Rc<Effect>]) {
    for effect in effects.iter().filter(|effect| effect.matches(tags)) {
        effect.run_create();
    }
}

// ----------------------------------------------------------------------------
// Hooks
// ----------------------------------------------------------------------------

/// Run `create` after every commit of the calling component.
///
/// `create` may return a closure, which runs before the next `create` and
/// when the component is removed.
pub fn use_effect<F, D>(create: F) -> Result<(), HookError>
where
    F: FnOnce() -> D + 'static,
    D: Teardown,
{
    push_effect_hook(Box::new(move || create().into_destroy()), None)
}

/// Run `create` after the first commit and after every commit whose `deps`
/// differ from the previous render's.
///
/// ```rust
/// use sprig_core::{h, use_effect_with, use_state, Component};
///
/// let counter = Component::new("Counter", |_| {
///     let (count, _set) = use_state(0)?;
///     use_effect_with(count, move || {
///         println!("count is {count}");
///     })?;
///     Ok(h("span").child(count).into())
/// });
/// # let _ = counter;
/// ```
pub fn use_effect_with<T, F, D>(deps: T, create: F) -> Result<(), HookError>
where
    T: PartialEq + 'static,
    F: FnOnce() -> D + 'static,
    D: Teardown,
{
    let deps: Rc<dyn Deps> = Rc::new(deps);
    push_effect_hook(Box::new(move || create().into_destroy()), Some(deps))
}

fn push_effect_hook(create: Create, deps: Option<Rc<dyn Deps>>) -> Result<(), HookError> {
    RenderContext::with_frame(|frame| {
        let (tags, instance) = match frame.dispatcher {
            Dispatcher::Mount => (
                HookEffectTags::PASSIVE | HookEffectTags::HAS_EFFECT,
                Rc::new(EffectInstance::default()),
            ),
            Dispatcher::Update => {
                let Hook::Effect(prev) = frame.next_current_hook()? else {
                    return Err(frame.slot_mismatch("an effect hook"));
                };
                let tags = if are_hook_inputs_equal(deps.as_ref(), prev.deps.as_ref()) {
                    HookEffectTags::PASSIVE
                } else {
                    HookEffectTags::PASSIVE | HookEffectTags::HAS_EFFECT
                };
                (tags, prev.instance.clone())
            }
        };

        if tags.contains(HookEffectTags::HAS_EFFECT) {
            frame.needs_passive = true;
        }
        let effect = Rc::new(Effect::new(tags, create, instance, deps));
        frame.effects.push(effect.clone());
        frame.hooks.push(Hook::Effect(effect));
        Ok(())
    })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fiber::FiberId;
    use crate::hooks::context::tests::frame;
    use crate::hooks::context::RenderFrame;

    fn mount_effects(f: impl FnOnce()) -> RenderFrame {
        let ctx = RenderContext::enter(frame(FiberId::new(), Dispatcher::Mount, Vec::new()));
        f();
        ctx.finish()
    }

    #[test]
    fn mount_marks_every_effect_as_firing() {
        let frame = mount_effects(|| {
            use_effect(|| ()).unwrap();
            use_effect_with(1, || ()).unwrap();
        });

        assert!(frame.needs_passive);
        assert_eq!(frame.effects.len(), 2);
        assert!(frame
            .effects
            .iter()
            .all(|e| e.tags() == HookEffectTags::PASSIVE | HookEffectTags::HAS_EFFECT));
    }

    #[test]
    fn unchanged_deps_do_not_fire() {
        let first = mount_effects(|| use_effect_with("a", || ()).unwrap());

        let ctx = RenderContext::enter(frame(FiberId::new(), Dispatcher::Update, first.hooks));
        use_effect_with("a", || ()).unwrap();
        let second = ctx.finish();

        assert!(!second.needs_passive);
        assert_eq!(second.effects[0].tags(), HookEffectTags::PASSIVE);
        assert!(Rc::ptr_eq(
            second.effects[0].instance(),
            first.effects[0].instance()
        ));
    }

    #[test]
    fn changed_deps_fire() {
        let first = mount_effects(|| use_effect_with(1, || ()).unwrap());

        let ctx = RenderContext::enter(frame(FiberId::new(), Dispatcher::Update, first.hooks));
        use_effect_with(2, || ()).unwrap();
        let second = ctx.finish();

        assert!(second.needs_passive);
        assert!(second.effects[0].tags().contains(HookEffectTags::HAS_EFFECT));
    }

    #[test]
    fn create_stores_teardown_and_destroy_runs_it_once() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = log.clone();
        let frame = mount_effects(move || {
            use_effect(move || {
                l.borrow_mut().push("create");
                move || l.borrow_mut().push("destroy")
            })
            .unwrap();
        });

        let tags = HookEffectTags::PASSIVE | HookEffectTags::HAS_EFFECT;
        commit_hook_effect_list_create(tags, &frame.effects);
        assert!(frame.effects[0].instance().has_destroy());

        commit_hook_effect_list_destroy(tags, &frame.effects);
        commit_hook_effect_list_destroy(tags, &frame.effects);

        assert_eq!(*log.borrow(), vec!["create", "destroy"]);
    }

    #[test]
    fn unmount_clears_has_effect() {
        let frame = mount_effects(|| use_effect(|| ()).unwrap());

        commit_hook_effect_list_unmount(HookEffectTags::PASSIVE, &frame.effects);

        assert_eq!(frame.effects[0].tags(), HookEffectTags::PASSIVE);
    }

    #[test]
    fn deps_of_different_types_are_unequal() {
        let a: Rc<dyn Deps> = Rc::new(1_i32);
        let b: Rc<dyn Deps> = Rc::new(1_i64);
        let c: Rc<dyn Deps> = Rc::new(1_i32);

        assert!(!are_hook_inputs_equal(Some(&a), Some(&b)));
        assert!(are_hook_inputs_equal(Some(&a), Some(&c)));
        assert!(!are_hook_inputs_equal(None, None));
    }
}
