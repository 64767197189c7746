//! The public, typed front-end (spec §5/§6): `MethodInfo<F>` and `SpecInfo<F>` wrap the
//! type-erased [`crate::registry`] so hosts never see a [`crate::erase::RawFn`] directly.
//!
//! Grounded on the source design's per-method/per-specialization static descriptor objects; here
//! they're ordinary structs returned from `register_method`/`register_specialization` rather than
//! process-wide statics, since Rust has no per-call-site static initialization hook to lean on.

use crate::class::ClassId;
use crate::erase::{erase, unerase};
use crate::error::{self, MethodError};
use crate::registry::{self, MethodId, SpecId};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A registered open method over virtual parameter classes `vp_classes`, callable through
/// [`MethodInfo::resolve`] once at least one specialization is registered and [`crate::update`]
/// has run.
pub struct MethodInfo<F> {
    id: MethodId,
    arity: usize,
    _marker: PhantomData<fn() -> F>,
}

impl<F: Copy> MethodInfo<F> {
    /// Registers a new method. `vp_classes` must have the same length as every specialization's
    /// `vp_classes` that will later be registered against it.
    pub fn new(name: &str, vp_classes: &[ClassId]) -> Self {
        let id = registry::register_method(name, vp_classes);
        MethodInfo { id, arity: vp_classes.len(), _marker: PhantomData }
    }

    pub fn id(&self) -> MethodId {
        self.id
    }

    /// Removes this method and every specialization registered against it. Takes `self` by value
    /// since the handle is meaningless afterwards.
    pub fn unregister(self) {
        registry::unregister_method(self.id);
    }

    /// Resolves `args` (one [`ClassId`] per virtual parameter, in declaration order) to a
    /// callable specialization, or reports the failure through the installed
    /// [`crate::error::ErrorHandler`] and returns `None` if the handler recovers.
    ///
    /// # Panics
    /// Panics if `args.len()` doesn't match the method's declared arity; this is a programming
    /// error at the call site, not a dispatch failure.
    pub fn resolve(&self, args: &[ClassId]) -> Option<F> {
        assert_eq!(args.len(), self.arity, "argument count doesn't match method arity");
        match registry::resolve_method(self.id, args) {
            Ok(raw) => Some(unsafe { unerase(raw) }),
            Err(err) => {
                report_and_recover(err);
                None
            }
        }
    }
}

fn report_and_recover(err: MethodError) {
    error::report(err);
}

/// One override of a [`MethodInfo`], narrowing one or more of its virtual parameters to a more
/// derived class.
pub struct SpecInfo<F> {
    id: SpecId,
    next: Arc<AtomicUsize>,
    _marker: PhantomData<fn() -> F>,
}

impl<F: Copy> SpecInfo<F> {
    /// Registers `function` as a specialization of `method`, narrowing its virtual parameters to
    /// `vp_classes` (a subclass, at each position, of the method's declared root).
    pub fn new(method: &MethodInfo<F>, vp_classes: &[ClassId], function: F) -> Self {
        assert_eq!(vp_classes.len(), method.arity, "argument count doesn't match method arity");
        let (id, next) = registry::register_specialization(method.id, vp_classes, erase(function));
        SpecInfo { id, next, _marker: PhantomData }
    }

    pub fn id(&self) -> SpecId {
        self.id
    }

    pub fn unregister(self) {
        registry::unregister_specialization(self.id);
    }

    /// Calls the next most specific specialization of the same method, as computed by the last
    /// [`crate::update`] (spec §4.8). Returns `None` if this is already the least specific
    /// override, or if `update()` hasn't run since this specialization was registered.
    pub fn next(&self) -> Option<F> {
        match self.next.load(Ordering::SeqCst) {
            registry::NOT_IMPLEMENTED => None,
            raw => Some(unsafe { unerase(raw) }),
        }
    }
}

/// Recompiles the dispatch tables from every currently-registered method and specialization.
/// Must be called at least once before any [`MethodInfo::resolve`] call can succeed, and again
/// after any registration or unregistration.
pub fn update() -> Result<registry::UpdateReport, crate::error::UpdateError> {
    registry::update()
}

pub fn need_update() -> bool {
    registry::need_update()
}

pub fn register_class(name: &str, bases: &[ClassId]) -> ClassId {
    registry::register_class(name, bases)
}

pub fn register_interface(name: &str, bases: &[ClassId]) -> ClassId {
    registry::register_interface(name, bases)
}

/// Renders the full registered class lattice as Graphviz DOT, for manual inspection.
pub fn lattice_dot() -> Result<String, crate::error::UpdateError> {
    registry::lattice_dot()
}

/// Selects how the next `update()` publishes its per-class mtbl lookup (spec §4.4/§4.7).
pub fn set_hash_strategy(strategy: crate::tables::HashStrategy) {
    registry::set_hash_strategy(strategy);
}
