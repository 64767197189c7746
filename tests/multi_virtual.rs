//! Scenario 6 (spec §8): three virtual parameters whose groups land at sizes (2, 3, 4). Exercises
//! every cell of the resulting dispatch tensor, not just the ones with specializations.

mod common;

use omm::{register_class, update, ClassId, MethodInfo, SpecInfo};

#[test]
fn three_virtual_params_resolve_through_a_two_by_three_by_four_tensor() {
    let _guard = common::TEST_LOCK.lock().unwrap();

    let root_a = register_class("TripletRootA", &[]);
    let a0 = register_class("TripletA0", &[root_a]);
    let a1 = register_class("TripletA1", &[root_a]);

    let root_b = register_class("TripletRootB", &[]);
    let b0 = register_class("TripletB0", &[root_b]);
    let b1 = register_class("TripletB1", &[root_b]);
    let b2 = register_class("TripletB2", &[root_b]);

    let root_c = register_class("TripletRootC", &[]);
    let c0 = register_class("TripletC0", &[root_c]);
    let c1 = register_class("TripletC1", &[root_c]);
    let c2 = register_class("TripletC2", &[root_c]);
    let c3 = register_class("TripletC3", &[root_c]);

    // Every specialization narrows dimension A to a0, so A splits into exactly 2 groups ({a0} vs.
    // everything else). Dimension B is narrowed to b0 by three specs and to b1 by one, giving 3
    // groups. Dimension C is narrowed to a different leaf by each spec, giving 4 groups.
    let triplet: MethodInfo<fn(ClassId, ClassId, ClassId) -> i32> =
        MethodInfo::new("triplet", &[root_a, root_b, root_c]);
    let _s0 = SpecInfo::new(&triplet, &[a0, b0, c0], (|_, _, _| 0) as fn(ClassId, ClassId, ClassId) -> i32);
    let _s1 = SpecInfo::new(&triplet, &[a0, b1, c0], (|_, _, _| 1) as fn(ClassId, ClassId, ClassId) -> i32);
    let _s2 = SpecInfo::new(&triplet, &[a0, b0, c1], (|_, _, _| 2) as fn(ClassId, ClassId, ClassId) -> i32);
    let _s3 = SpecInfo::new(&triplet, &[a0, b0, c2], (|_, _, _| 3) as fn(ClassId, ClassId, ClassId) -> i32);

    update().unwrap();

    let expect = |a: ClassId, b: ClassId, c: ClassId| -> Option<i32> {
        if a != a0 {
            return None;
        }
        if b == b0 {
            match c {
                x if x == c0 => Some(0),
                x if x == c1 => Some(2),
                x if x == c2 => Some(3),
                _ => None,
            }
        } else if b == b1 {
            if c == c0 {
                Some(1)
            } else {
                None
            }
        } else {
            None
        }
    };

    for &a in &[root_a, a0, a1] {
        for &b in &[root_b, b0, b1, b2] {
            for &c in &[root_c, c0, c1, c2, c3] {
                let resolved = triplet.resolve(&[a, b, c]).map(|f| f(a, b, c));
                assert_eq!(resolved, expect(a, b, c), "triplet({:?}, {:?}, {:?})", a, b, c);
            }
        }
    }
}
