//! Error taxonomy (spec §7) and the process-wide, per-call error handler (spec §4.10).

use crate::class::ClassId;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Structural failures raised by [`crate::registry::update`]. These halt the update pass and
/// leave the previously published tables untouched.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum UpdateError {
    /// Under the stolen-field strategy, a participating class's field was already claimed.
    DeallocatorInUse { class: String },
    /// The perfect-hash search exhausted its budget at every tried table size.
    HashSearchFailed { attempts: u32 },
    /// Layering could not proceed: the class lattice contains a cycle.
    LatticeCycle,
    /// `update()` was re-entered while an update was already running.
    ConcurrentUpdate,
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateError::DeallocatorInUse { class } => {
                write!(f, "stolen mtbl field already in use on class {}", class)
            }
            UpdateError::HashSearchFailed { attempts } => {
                write!(f, "perfect hash search failed after {} attempts", attempts)
            }
            UpdateError::LatticeCycle => write!(f, "class lattice contains a cycle"),
            UpdateError::ConcurrentUpdate => write!(f, "update() called concurrently"),
        }
    }
}

impl std::error::Error for UpdateError {}

/// Why a per-call dispatch failed to find a single, unambiguous implementation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorReason {
    NotImplemented,
    AmbiguousCall,
}

/// Raised by a method's error thunk when dispatch can't select exactly one specialization.
///
/// `arg_classes` is populated (per spec §9's decided-for-this-implementation open question) with
/// the actual dynamic types of the call, since they're already cheap `ClassId`s rather than raw
/// pointers that would need a runtime lookup to describe.
#[derive(Debug, Clone)]
pub struct MethodError {
    pub method_name: String,
    pub reason: ErrorReason,
    pub arg_classes: Vec<ClassId>,
}

impl fmt::Display for MethodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            ErrorReason::NotImplemented => {
                write!(f, "no specialization of `{}` applies", self.method_name)
            }
            ErrorReason::AmbiguousCall => write!(
                f,
                "ambiguous call to `{}`: multiple incomparable specializations apply",
                self.method_name
            ),
        }
    }
}

impl std::error::Error for MethodError {}

/// A replaceable handler for per-call dispatch failures.
///
/// The default handler logs at `error!` and aborts the process, matching the source design's
/// "do not return on failure policy" default. Installing a handler that returns lets callers
/// recover: return-typed methods get a zero-initialized value, void methods simply return.
pub trait ErrorHandler: Send + Sync {
    /// Returning normally means "recover"; the caller gets a default-initialized result.
    /// Implementations that want abort-on-error semantics should panic or exit here.
    fn handle(&self, error: &MethodError);
}

struct DefaultHandler;

impl ErrorHandler for DefaultHandler {
    fn handle(&self, error: &MethodError) {
        log::error!("{}", error);
        std::process::abort();
    }
}

static HANDLER: Mutex<Option<Box<dyn ErrorHandler>>> = Mutex::new(None);
/// Monotonic counter bumped by `set_error_handler`, exposed for tests that want to observe a
/// replacement happened without being able to compare trait objects.
static HANDLER_GENERATION: AtomicUsize = AtomicUsize::new(0);

/// Invokes the currently-installed handler, falling back to [`DefaultHandler`] if none was set.
pub fn report(error: MethodError) {
    let guard = HANDLER.lock().unwrap();
    match guard.as_deref() {
        Some(handler) => handler.handle(&error),
        None => DefaultHandler.handle(&error),
    }
}

/// Installs a new process-wide error handler, returning whatever was installed before (`None` if
/// this is the first call and the default handler was still in effect).
pub fn set_error_handler(handler: Box<dyn ErrorHandler>) -> Option<Box<dyn ErrorHandler>> {
    HANDLER_GENERATION.fetch_add(1, Ordering::SeqCst);
    let mut guard = HANDLER.lock().unwrap();
    guard.replace(handler)
}

pub fn handler_generation() -> usize {
    HANDLER_GENERATION.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    struct RecordingHandler(Arc<AtomicBool>);

    impl ErrorHandler for RecordingHandler {
        fn handle(&self, _error: &MethodError) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn replaced_handler_is_invoked_and_recovers() {
        let called = Arc::new(AtomicBool::new(false));
        set_error_handler(Box::new(RecordingHandler(Arc::clone(&called))));
        report(MethodError {
            method_name: "kick".into(),
            reason: ErrorReason::NotImplemented,
            arg_classes: vec![],
        });
        assert!(called.load(Ordering::SeqCst));
    }
}
