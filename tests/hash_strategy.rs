//! Scenario 5 (spec §8): 1000 classes resolved through the perfect-hash mtbl strategy, with no
//! collisions and stable (idempotent) results across repeated calls.

mod common;

use omm::{register_class, set_hash_strategy, update, ClassId, HashStrategy, MethodInfo, SpecInfo};

fn touch_index(c: ClassId) -> u32 {
    c.index() as u32
}

#[test]
fn perfect_hash_resolves_every_one_of_a_thousand_classes_distinctly() {
    let _guard = common::TEST_LOCK.lock().unwrap();

    let root = register_class("HashRoot", &[]);
    let leaves: Vec<ClassId> =
        (0..999).map(|i| register_class(&format!("HashLeaf{}", i), &[root])).collect();

    let touch: MethodInfo<fn(ClassId) -> u32> = MethodInfo::new("hash_touch", &[root]);
    let _specs: Vec<SpecInfo<fn(ClassId) -> u32>> =
        leaves.iter().map(|&leaf| SpecInfo::new(&touch, &[leaf], touch_index as fn(ClassId) -> u32)).collect();

    set_hash_strategy(HashStrategy::PerfectHash);
    update().unwrap();

    for &leaf in &leaves {
        let f = touch.resolve(&[leaf]).unwrap_or_else(|| panic!("class {:?} has no mtbl entry", leaf));
        assert_eq!(f(leaf), leaf.index() as u32);

        // Dispatch idempotence: resolving the same class twice yields the same function pointer.
        let f_again = touch.resolve(&[leaf]).unwrap();
        assert_eq!(f as usize, f_again as usize);
    }

    // Root has no specialization of its own: not implemented, distinct from every leaf.
    assert!(touch.resolve(&[root]).is_none());
}
