//! Scenario 3 (spec §8): diamond inheritance produces an ambiguous call until a spec on the
//! join point resolves it.

mod common;

use omm::{register_class, update, ClassId, ErrorHandler, MethodError, MethodInfo, SpecInfo};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct RecordingHandler {
    ambiguous: Arc<AtomicBool>,
}

impl ErrorHandler for RecordingHandler {
    fn handle(&self, error: &MethodError) {
        if error.reason == omm::ErrorReason::AmbiguousCall {
            self.ambiguous.store(true, Ordering::SeqCst);
        }
    }
}

#[test]
fn diamond_is_ambiguous_until_the_join_point_is_overridden() {
    let _guard = common::TEST_LOCK.lock().unwrap();

    let ambiguous = Arc::new(AtomicBool::new(false));
    omm::set_error_handler(Box::new(RecordingHandler { ambiguous: Arc::clone(&ambiguous) }));

    let a = register_class("DiamondA", &[]);
    let b = register_class("DiamondB", &[a]);
    let c = register_class("DiamondC", &[a]);
    let d = register_class("DiamondD", &[b, c]);

    let f: MethodInfo<fn(ClassId) -> i32> = MethodInfo::new("diamond_f", &[a]);
    let _b_spec = SpecInfo::new(&f, &[b], (|_| 1) as fn(ClassId) -> i32);
    let _c_spec = SpecInfo::new(&f, &[c], (|_| 2) as fn(ClassId) -> i32);

    update().unwrap();

    assert!(f.resolve(&[d]).is_none());
    assert!(ambiguous.load(Ordering::SeqCst));

    let _d_spec = SpecInfo::new(&f, &[d], (|_| 3) as fn(ClassId) -> i32);
    update().unwrap();

    assert_eq!(f.resolve(&[d]).map(|g| g(d)), Some(3));
}
