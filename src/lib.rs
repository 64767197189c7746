//! Open multi-methods: free-standing polymorphic functions dispatched on the dynamic types of
//! more than one argument.
//!
//! A host embeds this crate by:
//! 1. Declaring its class lattice with [`api::register_class`]/[`api::register_interface`].
//! 2. Declaring each open method's virtual parameter dimensions with [`api::MethodInfo::new`].
//! 3. Registering one or more overrides with [`api::SpecInfo::new`].
//! 4. Calling [`api::update`] to compile the dispatch tables.
//! 5. Calling [`api::MethodInfo::resolve`] per call site.
//!
//! The engine is organized the way the source design separates concerns: [`lattice`] builds the
//! participating class sublattice and its conforming sets; [`slots`] and [`groups`] turn that
//! lattice into a compressed table layout; [`specialization`] and [`linking`] decide, for a given
//! signature, which override wins; [`tables`] and [`dispatch`] are the compiled, call-time-fast
//! representation of all of that; [`registry`] ties it together behind a process-wide singleton,
//! and [`api`] gives it a typed face.

pub mod api;
pub mod class;
pub mod dispatch;
pub mod erase;
pub mod error;
pub mod graph;
pub mod groups;
pub mod hash;
pub mod lattice;
pub mod linking;
pub mod registry;
pub mod slots;
pub mod specialization;
pub mod tables;

pub use api::{
    lattice_dot, need_update, register_class, register_interface, set_hash_strategy, update,
    MethodInfo, SpecInfo,
};
pub use class::ClassId;
pub use error::{set_error_handler, ErrorHandler, ErrorReason, MethodError, UpdateError};
pub use registry::{MethodId, SpecId, UpdateReport};
pub use tables::HashStrategy;
