//! Scenario 4 (spec §8): a next() chain at least two overrides deep.

mod common;

use omm::{register_class, update, ClassId, MethodInfo, SpecInfo};

#[test]
fn next_chain_walks_down_to_the_base_override() {
    let _guard = common::TEST_LOCK.lock().unwrap();

    let vehicle = register_class("ChainVehicle", &[]);
    let car = register_class("ChainCar", &[vehicle]);
    let inspector = register_class("ChainInspector", &[]);
    let state_inspector = register_class("ChainStateInspector", &[inspector]);

    let inspect: MethodInfo<fn(ClassId, ClassId) -> &'static str> =
        MethodInfo::new("chain_inspect", &[vehicle, inspector]);
    let base = SpecInfo::new(
        &inspect,
        &[vehicle, inspector],
        (|_, _| "base") as fn(ClassId, ClassId) -> &'static str,
    );
    let mid = SpecInfo::new(
        &inspect,
        &[car, inspector],
        (|_, _| "mid") as fn(ClassId, ClassId) -> &'static str,
    );
    let top = SpecInfo::new(
        &inspect,
        &[car, state_inspector],
        (|_, _| "top") as fn(ClassId, ClassId) -> &'static str,
    );

    update().unwrap();

    let resolved = inspect.resolve(&[car, state_inspector]).unwrap();
    assert_eq!(resolved(car, state_inspector), "top");

    let to_mid = top.next().expect("top overrides mid");
    assert_eq!(to_mid(car, state_inspector), "mid");

    let to_base = mid.next().expect("mid overrides base");
    assert_eq!(to_base(car, state_inspector), "base");

    assert!(base.next().is_none());
}
