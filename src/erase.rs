//! Type erasure for specialization function pointers.
//!
//! The dispatch tensor is a flat `Vec<Word>` shared across every method regardless of its Rust
//! signature, so a specialization's `fn(A, B) -> C` has to be stored as something uniform. This
//! is the one place in the crate that reaches for `unsafe`: every other module works with plain
//! `ClassId`s, slots and indices.

use std::mem;

/// A type-erased function pointer, same size as a `usize` on every platform Rust supports
/// (function pointers are a single machine word; this crate never deals with fat pointers here
/// since specializations are always plain `fn`, never `dyn Trait` methods).
pub type RawFn = usize;

/// Erases an `fn` pointer's type, keeping only its bit pattern.
///
/// # Safety
/// The caller must later [`unerase`] with the exact same `F`, or a compatible one (same
/// signature), that was passed here. [`crate::api`]'s `MethodInfo<F>`/`SpecInfo<F>` uphold this by
/// construction: every specialization registered against a method shares that method's `F`.
pub fn erase<F: Copy>(f: F) -> RawFn {
    debug_assert_eq!(mem::size_of::<F>(), mem::size_of::<RawFn>());
    // SAFETY: `F` is a bare `fn(...) -> ...` pointer type, verified same-sized as `RawFn` above.
    unsafe { mem::transmute_copy(&f) }
}

/// Recovers a typed function pointer from its erased form.
///
/// # Safety
/// `raw` must have been produced by [`erase`] with exactly this `F`.
pub unsafe fn unerase<F: Copy>(raw: RawFn) -> F {
    debug_assert_eq!(mem::size_of::<F>(), mem::size_of::<RawFn>());
    mem::transmute_copy(&raw)
}
