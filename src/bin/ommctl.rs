//! A small binary for manually exercising the engine: builds one of the named end-to-end
//! scenarios against the public registration API, runs `update()`, and dumps the result.
//!
//! Not part of the dispatch contract - this is a diagnostic tool, grounded on the teacher's own
//! `main.rs` (an ordered pipeline of named stages) and `options.rs` (`clap`-derived `Options`).

#[macro_use]
extern crate log;

use anyhow::{Context, Result};
use clap::Parser;
use omm::{
    register_class, set_error_handler, set_hash_strategy, update, ClassId, ErrorHandler, HashStrategy,
    MethodError, MethodInfo, SpecInfo,
};
use std::fs;
use std::path::PathBuf;
use std::process::exit;

/// The default handler aborts the process (spec §7's decided failure policy for embedders that
/// never install their own). That's the wrong choice for a binary whose whole job is to show a
/// NotImplemented/AmbiguousCall outcome and keep going, so ommctl installs its own that just logs.
struct LoggingHandler;

impl ErrorHandler for LoggingHandler {
    fn handle(&self, error: &MethodError) {
        warn!("{}", error);
    }
}

#[derive(clap::ArgEnum, Clone, Debug)]
enum Scenario {
    /// Single dispatch: Animal <: Dog <: Pitbull, Animal <: Cat, Animal <: Dolphin.
    Single,
    /// Double dispatch: meet(Animal, Animal).
    Double,
    /// Ambiguity: diamond A, B <: A, C <: A, D <: B, C.
    Ambiguity,
    /// Next-chain depth >= 2: inspect(Vehicle, Inspector).
    NextChain,
    /// Perfect hash strategy over 1000 classes.
    Hash,
    /// Multi-virtual ordering with group sizes (2, 3, 4).
    MultiVirtual,
}

#[derive(Parser, Debug)]
#[clap(version, about)]
struct Options {
    /// Which built-in scenario to build and run
    #[clap(short = 's', long = "scenario", arg_enum, value_name = "NAME")]
    scenario: Scenario,

    /// Write the registered class lattice to a Graphviz .dot file
    #[clap(short = 'g', long = "graph", value_name = "PATH", parse(from_os_str))]
    graph_path: Option<PathBuf>,
}

// Plain `fn` pointers carry no environment, so a specialization that calls `next()` needs
// somewhere else to find its own `SpecInfo` handle. A `OnceLock` set right after registration
// plays that role here; a real embedding would typically hang it off its own per-method module.
static KICK_PITBULL: std::sync::OnceLock<SpecInfo<fn(ClassId) -> String>> = std::sync::OnceLock::new();

fn kick_dog(_: ClassId) -> String {
    "bark".to_string()
}

fn kick_pitbull(arg: ClassId) -> String {
    match KICK_PITBULL.get().and_then(|spec| spec.next()) {
        Some(next) => format!("{} and bite", next(arg)),
        None => "bite".to_string(),
    }
}

fn run_single() {
    let animal = register_class("Animal", &[]);
    let dog = register_class("Dog", &[animal]);
    let pitbull = register_class("Pitbull", &[dog]);
    let cat = register_class("Cat", &[animal]);

    let kick: MethodInfo<fn(ClassId) -> String> = MethodInfo::new("kick", &[animal]);
    let _kick_dog = SpecInfo::new(&kick, &[dog], kick_dog as fn(ClassId) -> String);
    let kick_pitbull_spec = SpecInfo::new(&kick, &[pitbull], kick_pitbull as fn(ClassId) -> String);
    KICK_PITBULL.set(kick_pitbull_spec).ok();

    info!("updating...");
    let report = update().expect("update failed");
    debug!("{:?}", report);

    info!("kick(Dog) = {:?}", kick.resolve(&[dog]).map(|f| f(dog)));
    info!("kick(Pitbull) = {:?}", kick.resolve(&[pitbull]).map(|f| f(pitbull)));
    info!("kick(Cat) = {:?}", kick.resolve(&[cat]).map(|f| f(cat)));
}

fn run_double() {
    let animal = register_class("Animal", &[]);
    let dog = register_class("Dog", &[animal]);
    let cat = register_class("Cat", &[animal]);
    let pitbull = register_class("Pitbull", &[dog]);
    let dolphin = register_class("Dolphin", &[animal]);

    let meet: MethodInfo<fn(ClassId, ClassId) -> &'static str> =
        MethodInfo::new("meet", &[animal, animal]);
    let _any_any = SpecInfo::new(&meet, &[animal, animal], (|_, _| "ignore") as fn(ClassId, ClassId) -> &'static str);
    let _dog_dog = SpecInfo::new(&meet, &[dog, dog], (|_, _| "wag tail") as fn(ClassId, ClassId) -> &'static str);
    let _dog_cat = SpecInfo::new(&meet, &[dog, cat], (|_, _| "chase") as fn(ClassId, ClassId) -> &'static str);

    update().expect("update failed");
    info!("meet(Pitbull, Cat) = {:?}", meet.resolve(&[pitbull, cat]).map(|f| f(pitbull, cat)));
    info!("meet(Pitbull, Dog) = {:?}", meet.resolve(&[pitbull, dog]).map(|f| f(pitbull, dog)));
    info!("meet(Pitbull, Dolphin) = {:?}", meet.resolve(&[pitbull, dolphin]).map(|f| f(pitbull, dolphin)));
}

fn run_ambiguity() {
    let a = register_class("A", &[]);
    let b = register_class("B", &[a]);
    let c = register_class("C", &[a]);
    let d = register_class("D", &[b, c]);

    let f: MethodInfo<fn(ClassId) -> i32> = MethodInfo::new("f", &[a]);
    let _b_spec = SpecInfo::new(&f, &[b], (|_| 1) as fn(ClassId) -> i32);
    let _c_spec = SpecInfo::new(&f, &[c], (|_| 2) as fn(ClassId) -> i32);

    update().expect("update failed");
    info!("f(D) before D-override = {:?}", f.resolve(&[d]).map(|g| g(d)));

    let _d_spec = SpecInfo::new(&f, &[d], (|_| 3) as fn(ClassId) -> i32);
    update().expect("update failed");
    info!("f(D) after D-override = {:?}", f.resolve(&[d]).map(|g| g(d)));
}

fn run_next_chain() {
    let vehicle = register_class("Vehicle", &[]);
    let car = register_class("Car", &[vehicle]);
    let inspector = register_class("Inspector", &[]);
    let state_inspector = register_class("StateInspector", &[inspector]);

    let inspect: MethodInfo<fn(ClassId, ClassId) -> &'static str> =
        MethodInfo::new("inspect", &[vehicle, inspector]);
    let _base = SpecInfo::new(&inspect, &[vehicle, inspector], (|_, _| "base") as fn(ClassId, ClassId) -> &'static str);
    let _mid = SpecInfo::new(&inspect, &[car, inspector], (|_, _| "mid") as fn(ClassId, ClassId) -> &'static str);
    let top = SpecInfo::new(&inspect, &[car, state_inspector], (|_, _| "top") as fn(ClassId, ClassId) -> &'static str);

    update().expect("update failed");
    info!(
        "inspect(Car, StateInspector) = {:?}",
        inspect.resolve(&[car, state_inspector]).map(|g| g(car, state_inspector))
    );
    info!("top.next() is_some = {}", top.next().is_some());
}

fn run_hash() {
    let mut leaves = Vec::with_capacity(1000);
    let root = register_class("HashRoot", &[]);
    leaves.push(root);
    for i in 0..999 {
        leaves.push(register_class(&format!("HashLeaf{}", i), &[root]));
    }

    let touch: MethodInfo<fn(ClassId) -> u32> = MethodInfo::new("touch", &[root]);
    let _base = SpecInfo::new(&touch, &[root], (|c: ClassId| c.index() as u32) as fn(ClassId) -> u32);

    set_hash_strategy(HashStrategy::PerfectHash);
    update().expect("update failed");
    let resolved = leaves.iter().filter(|&&c| touch.resolve(&[c]).is_some()).count();
    info!("touch() resolved for {}/{} classes", resolved, leaves.len());
}

fn run_multi_virtual() {
    let root_a = register_class("RootA", &[]);
    let a0 = register_class("A0", &[root_a]);
    let a1 = register_class("A1", &[root_a]);

    let root_b = register_class("RootB", &[]);
    let b0 = register_class("B0", &[root_b]);
    let b1 = register_class("B1", &[root_b]);
    let b2 = register_class("B2", &[root_b]);

    let root_c = register_class("RootC", &[]);
    let c0 = register_class("C0", &[root_c]);
    let c1 = register_class("C1", &[root_c]);
    let c2 = register_class("C2", &[root_c]);
    let c3 = register_class("C3", &[root_c]);

    // Four specializations, each narrowing a different combination of dimensions, so the group
    // finder actually produces the advertised (2, 3, 4) group-count split per dimension rather
    // than one trivial "specialized vs. everything else" group everywhere.
    let triplet: MethodInfo<fn(ClassId, ClassId, ClassId) -> i32> =
        MethodInfo::new("triplet", &[root_a, root_b, root_c]);
    let _s0 = SpecInfo::new(&triplet, &[a0, b0, c0], (|_, _, _| 0) as fn(ClassId, ClassId, ClassId) -> i32);
    let _s1 = SpecInfo::new(&triplet, &[a0, b1, c0], (|_, _, _| 1) as fn(ClassId, ClassId, ClassId) -> i32);
    let _s2 = SpecInfo::new(&triplet, &[a0, b0, c1], (|_, _, _| 2) as fn(ClassId, ClassId, ClassId) -> i32);
    let _s3 = SpecInfo::new(&triplet, &[a0, b0, c2], (|_, _, _| 3) as fn(ClassId, ClassId, ClassId) -> i32);

    update().expect("update failed");
    for &a in &[a0, a1] {
        for &b in &[b0, b1, b2] {
            for &c in &[c0, c1, c2, c3] {
                let resolved = triplet.resolve(&[a, b, c]).is_some();
                trace!("triplet({:?}, {:?}, {:?}) resolved = {}", a, b, c, resolved);
            }
        }
    }
    info!("built a (2, 3, 4) dispatch tensor over RootA/RootB/RootC");
}

fn try_main() -> Result<()> {
    let opts = Options::parse();
    set_error_handler(Box::new(LoggingHandler));

    match opts.scenario {
        Scenario::Single => run_single(),
        Scenario::Double => run_double(),
        Scenario::Ambiguity => run_ambiguity(),
        Scenario::NextChain => run_next_chain(),
        Scenario::Hash => run_hash(),
        Scenario::MultiVirtual => run_multi_virtual(),
    }

    if let Some(path) = opts.graph_path {
        let dot = omm::lattice_dot().context("unable to render class lattice")?;
        fs::write(&path, dot).with_context(|| format!("unable to write {}", path.display()))?;
        info!("wrote class lattice to {}", path.display());
    }

    Ok(())
}

fn main() {
    env_logger::builder().format_timestamp(None).init();

    try_main().unwrap_or_else(|e| {
        error!("{:?}", e);
        exit(1);
    })
}
