//! The process-wide method/specialization registry and the `update()` pass that compiles it into
//! dispatch tables (spec §5/§6).
//!
//! Grounded on `src/class/constants.rs`'s single `lazy_static!` constant pool: one process-wide
//! mutable table behind a `Mutex`, mutated freely at registration time and compiled in one shot.
//! The published, dispatch-time-readable copy is kept separate (`PUBLISHED`, an `RwLock<Arc<_>>`)
//! so calls never contend with registration, matching the source design's requirement that
//! `update()` be the only thing that can block a call out.

use crate::class::{ClassId, ClassTable};
use crate::dispatch::{self, MethodTables};
use crate::erase::RawFn;
use crate::error::{ErrorReason, MethodError, UpdateError};
use crate::graph::NodeId;
use crate::groups::{find_groups, Group};
use crate::lattice::{Lattice, NodeSet0};
use crate::linking::link_next;
use crate::slots::allocate_slots;
use crate::specialization::{select_best, Selection};
use crate::tables::{assemble_gdtbl, assemble_gmtbl, row_major_strides, GlobalDispatchTable, GlobalMtbl, HashStrategy, MtblIndex, Word};
use itertools::Itertools;
use lazy_static::lazy_static;
use log::{debug, info, log_enabled, trace, Level};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// Sentinel stored in place of a real function pointer: no specialization applies.
pub const NOT_IMPLEMENTED: RawFn = 0;
/// Sentinel stored in place of a real function pointer: more than one applies, incomparably.
pub const AMBIGUOUS: RawFn = 1;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct MethodId(pub(crate) u32);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct SpecId(pub(crate) u32);

struct MethodDescriptor {
    name: String,
    vp_classes: Vec<ClassId>,
}

struct SpecDescriptor {
    method: MethodId,
    vp_classes: Vec<ClassId>,
    function: RawFn,
    /// Shared with the public `SpecInfo` handle so `next()` reads are lock-free.
    next: Arc<AtomicUsize>,
}

struct Registry {
    classes: ClassTable,
    methods: Vec<Option<MethodDescriptor>>,
    specs: Vec<Option<SpecDescriptor>>,
    dirty: bool,
    hash_strategy: HashStrategy,
}

impl Registry {
    fn new() -> Self {
        Registry {
            classes: ClassTable::new(),
            methods: Vec::new(),
            specs: Vec::new(),
            dirty: false,
            hash_strategy: HashStrategy::Dense,
        }
    }
}

struct CompiledTables {
    gmtbl: GlobalMtbl,
    gdtbl: GlobalDispatchTable,
    methods: HashMap<MethodId, MethodTables>,
    method_names: HashMap<MethodId, String>,
}

impl CompiledTables {
    fn empty() -> Self {
        CompiledTables {
            gmtbl: GlobalMtbl { words: Vec::new(), index: MtblIndex::Dense(Vec::new()) },
            gdtbl: GlobalDispatchTable { words: Vec::new() },
            methods: HashMap::new(),
            method_names: HashMap::new(),
        }
    }
}

lazy_static! {
    static ref REGISTRY: Mutex<Registry> = Mutex::new(Registry::new());
    static ref PUBLISHED: RwLock<Arc<CompiledTables>> = RwLock::new(Arc::new(CompiledTables::empty()));
}

static UPDATING: AtomicBool = AtomicBool::new(false);

pub fn register_class(name: &str, bases: &[ClassId]) -> ClassId {
    let mut reg = REGISTRY.lock().unwrap();
    reg.classes.register_class(name, bases)
}

pub fn register_interface(name: &str, bases: &[ClassId]) -> ClassId {
    let mut reg = REGISTRY.lock().unwrap();
    reg.classes.register_interface(name, bases)
}

/// Registers a method's virtual parameter dimensions, returning its id. `vp_classes` are the
/// dimension roots: every specialization of this method must declare exactly this many virtual
/// parameters, each a subclass of the corresponding root.
pub fn register_method(name: &str, vp_classes: &[ClassId]) -> MethodId {
    let mut reg = REGISTRY.lock().unwrap();
    let id = MethodId(reg.methods.len() as u32);
    reg.methods
        .push(Some(MethodDescriptor { name: name.to_string(), vp_classes: vp_classes.to_vec() }));
    reg.dirty = true;
    trace!("registered method {} ({:?}, arity={})", name, id, vp_classes.len());
    id
}

/// Removes a method and every specialization registered against it.
pub fn unregister_method(id: MethodId) {
    let mut reg = REGISTRY.lock().unwrap();
    if let Some(slot) = reg.methods.get_mut(id.0 as usize) {
        *slot = None;
    }
    for spec in &mut reg.specs {
        if spec.as_ref().is_some_and(|s| s.method == id) {
            *spec = None;
        }
    }
    reg.dirty = true;
}

pub fn register_specialization(
    method: MethodId,
    vp_classes: &[ClassId],
    function: RawFn,
) -> (SpecId, Arc<AtomicUsize>) {
    let mut reg = REGISTRY.lock().unwrap();
    let next = Arc::new(AtomicUsize::new(NOT_IMPLEMENTED));
    let id = SpecId(reg.specs.len() as u32);
    reg.specs.push(Some(SpecDescriptor {
        method,
        vp_classes: vp_classes.to_vec(),
        function,
        next: Arc::clone(&next),
    }));
    reg.dirty = true;
    trace!("registered specialization {:?} of method {:?}", id, method);
    (id, next)
}

pub fn unregister_specialization(id: SpecId) {
    let mut reg = REGISTRY.lock().unwrap();
    if let Some(slot) = reg.specs.get_mut(id.0 as usize) {
        *slot = None;
    }
    reg.dirty = true;
}

pub fn set_hash_strategy(strategy: HashStrategy) {
    REGISTRY.lock().unwrap().hash_strategy = strategy;
}

pub fn need_update() -> bool {
    REGISTRY.lock().unwrap().dirty
}

/// Renders every registered class (not just those participating in a method) as Graphviz DOT,
/// for `ommctl --graph` (spec §4.11). Unlike `run_update`'s lattice, this one seeds every class in
/// the table so the full inheritance picture is visible even before any method is registered.
pub fn lattice_dot() -> Result<String, UpdateError> {
    let reg = REGISTRY.lock().unwrap();
    let mut seeds = NodeSet0::new(reg.classes.len());
    for id in reg.classes.iter() {
        seeds.insert(id);
    }
    let lattice = Lattice::build(&reg.classes, &seeds)?;
    Ok(crate::lattice::lattice_as_dot(&lattice, &reg.classes))
}

#[derive(Debug, Default)]
pub struct UpdateReport {
    pub methods_compiled: usize,
    pub specializations_linked: usize,
    pub ambiguous: Vec<(MethodId, Vec<SpecId>)>,
}

/// Recompiles the dispatch tables from every currently-registered method and specialization
/// (spec §4/§6). Rejects re-entrant calls outright (spec §9's decided concurrent-update
/// question) rather than queuing or blocking.
pub fn update() -> Result<UpdateReport, UpdateError> {
    if UPDATING.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
        return Err(UpdateError::ConcurrentUpdate);
    }
    let result = run_update();
    UPDATING.store(false, Ordering::SeqCst);
    result
}

fn run_update() -> Result<UpdateReport, UpdateError> {
    let mut reg = REGISTRY.lock().unwrap();
    let method_count = reg.methods.iter().flatten().count();
    let spec_count = reg.specs.iter().flatten().count();
    info!("update: starting ({} methods, {} specializations)", method_count, spec_count);

    let mut seeds = NodeSet0::new(reg.classes.len());
    for m in reg.methods.iter().flatten() {
        for &c in &m.vp_classes {
            seeds.insert(c);
        }
    }
    for s in reg.specs.iter().flatten() {
        for &c in &s.vp_classes {
            seeds.insert(c);
        }
    }
    let lattice = Lattice::build(&reg.classes, &seeds)?;
    info!("update: lattice built ({} participating classes)", lattice.layered.len());
    if log_enabled!(Level::Debug) {
        for (position, &node) in lattice.layered.iter().enumerate() {
            debug!("  [{}] class {}", position, reg.classes.name(lattice.class_of(node)));
        }
    }

    // One appearance per (method, dimension), seeded at the method's own declared vp class
    // (spec §4.1/§4.3): a SpecInfo's vp classes only upgrade classes for lattice participation,
    // they never record their own slot appearance.
    let mut appearances: Vec<(NodeId, Vec<(MethodId, usize)>)> = Vec::new();
    for (mi, m) in reg.methods.iter().enumerate() {
        let Some(m) = m else { continue };
        let method_id = MethodId(mi as u32);
        for (dim, &vp) in m.vp_classes.iter().enumerate() {
            let Some(node) = lattice.node(vp) else { continue };
            match appearances.iter_mut().find(|(n, _)| *n == node) {
                Some((_, v)) => v.push((method_id, dim)),
                None => appearances.push((node, vec![(method_id, dim)])),
            }
        }
    }
    let (slot_table, method_slots, _arities) = allocate_slots(&lattice, &appearances);
    info!("update: slots allocated ({} dimension appearances)", appearances.len());

    let mut cells: HashMap<(NodeId, u32), Word> = HashMap::new();
    let mut method_tables: HashMap<MethodId, MethodTables> = HashMap::new();
    let mut tensor_inputs: Vec<(Vec<u32>, Vec<RawFn>)> = Vec::new();
    let mut tensor_methods: Vec<MethodId> = Vec::new();
    let mut report = UpdateReport::default();

    let spec_functions: HashMap<SpecId, RawFn> = reg
        .specs
        .iter()
        .enumerate()
        .filter_map(|(si, s)| s.as_ref().map(|s| (SpecId(si as u32), s.function)))
        .collect();

    for (mi, m) in reg.methods.iter().enumerate() {
        let Some(m) = m else { continue };
        let method_id = MethodId(mi as u32);
        let arity = m.vp_classes.len();
        if log_enabled!(Level::Debug) {
            debug!("update: compiling method {} ({:?}, arity={})", m.name, method_id, arity);
        }
        let specs_of_method: Vec<(SpecId, Vec<ClassId>)> = reg
            .specs
            .iter()
            .enumerate()
            .filter_map(|(si, s)| {
                s.as_ref()
                    .filter(|s| s.method == method_id)
                    .map(|s| (SpecId(si as u32), s.vp_classes.clone()))
            })
            .collect();

        // Link every specialization's next() target before groups are even considered: linking
        // only needs the specialization's own declared signature, not which group it lands in.
        for (sid, next_id) in link_next(&lattice, &specs_of_method) {
            let next_raw = next_id
                .and_then(|nid| reg.specs[nid.0 as usize].as_ref().map(|s| s.function))
                .unwrap_or(NOT_IMPLEMENTED);
            if let Some(spec) = &reg.specs[sid.0 as usize] {
                spec.next.store(next_raw, Ordering::SeqCst);
                report.specializations_linked += 1;
                trace!("  linked {:?}.next -> {:?}", sid, next_id);
            }
        }

        let slots: Vec<u32> = (0..arity)
            .map(|dim| method_slots.get(mi).and_then(|row| row.get(dim)).copied().unwrap_or(0))
            .collect();

        if arity == 1 {
            let dim_root = m.vp_classes[0];
            let specs_at_dim: Vec<(SpecId, ClassId)> =
                specs_of_method.iter().map(|(id, vp)| (*id, vp[0])).collect();
            let groups = find_groups(&lattice, &reg.classes, dim_root, &specs_at_dim);
            trace!("  {} group(s) on slot {}", groups.len(), slots[0]);
            for group in &groups {
                let raw = resolve_group_winner(
                    &lattice,
                    &specs_of_method,
                    group,
                    method_id,
                    &spec_functions,
                    &mut report,
                );
                let word = Word::Fn(raw);
                for &member in &group.members {
                    cells.insert((NodeId(member), slots[0]), word);
                }
            }
            method_tables.insert(method_id, MethodTables { slots, tensor: None });
        } else {
            let dims_groups: Vec<Vec<Group>> = m
                .vp_classes
                .iter()
                .enumerate()
                .map(|(dim, &vp)| {
                    let specs_at_dim: Vec<(SpecId, ClassId)> =
                        specs_of_method.iter().map(|(id, vpc)| (*id, vpc[dim])).collect();
                    find_groups(&lattice, &reg.classes, vp, &specs_at_dim)
                })
                .collect();
            if log_enabled!(Level::Debug) {
                for (dim, groups) in dims_groups.iter().enumerate() {
                    debug!("  dimension {}: {} group(s)", dim, groups.len());
                }
            }

            for (dim, groups) in dims_groups.iter().enumerate() {
                for (gi, group) in groups.iter().enumerate() {
                    for &member in &group.members {
                        cells.insert((NodeId(member), slots[dim]), Word::Int(gi as u32));
                    }
                }
            }

            let dims: Vec<u32> = dims_groups.iter().map(|g| g.len() as u32).collect();
            let strides = row_major_strides(&dims);
            let total: usize = dims.iter().map(|&d| d as usize).product();
            let mut flat = vec![NOT_IMPLEMENTED; total];

            if total > 0 {
                for combo in dims_groups.iter().map(|g| 0..g.len()).multi_cartesian_product() {
                    let mask = combo
                        .iter()
                        .enumerate()
                        .fold(None, |acc: Option<crate::groups::SpecMask>, (dim, &gi)| {
                            let m = dims_groups[dim][gi].mask.clone();
                            Some(match acc {
                                Some(a) => a.intersect(&m),
                                None => m,
                            })
                        })
                        .expect("at least one dimension");
                    let applicable: Vec<(SpecId, Vec<ClassId>)> = specs_of_method
                        .iter()
                        .filter(|(id, _)| mask.contains(*id))
                        .cloned()
                        .collect();
                    let raw = resolve_selection(&lattice, &applicable, method_id, &spec_functions, &mut report);
                    let index: usize = combo
                        .iter()
                        .zip(&strides)
                        .map(|(&gi, &st)| gi * st as usize)
                        .sum();
                    trace!("  tensor cell {:?} -> index {} = {:#x}", combo, index, raw);
                    flat[index] = raw;
                }
            }

            tensor_inputs.push((dims, flat));
            tensor_methods.push(method_id);
            method_tables.insert(method_id, MethodTables { slots, tensor: None });
        }
    }

    info!("update: assembling gmtbl/gdtbl ({:?} strategy)", reg.hash_strategy);
    let gmtbl = assemble_gmtbl(&lattice, &slot_table, &cells, reg.hash_strategy)?;
    let (gdtbl, tensors) = assemble_gdtbl(tensor_inputs);
    for (method_id, tensor) in tensor_methods.into_iter().zip(tensors) {
        if let Some(entry) = method_tables.get_mut(&method_id) {
            entry.tensor = Some(tensor);
        }
    }
    info!(
        "update: tables assembled (gmtbl={} words, gdtbl={} words)",
        gmtbl.words.len(),
        gdtbl.words.len()
    );

    let method_names: HashMap<MethodId, String> = reg
        .methods
        .iter()
        .enumerate()
        .filter_map(|(mi, m)| m.as_ref().map(|m| (MethodId(mi as u32), m.name.clone())))
        .collect();

    report.methods_compiled = method_names.len();

    let compiled = CompiledTables { gmtbl, gdtbl, methods: method_tables, method_names };
    *PUBLISHED.write().unwrap() = Arc::new(compiled);
    reg.dirty = false;

    info!(
        "update: published ({} methods compiled, {} specializations linked, {} ambiguous)",
        report.methods_compiled,
        report.specializations_linked,
        report.ambiguous.len()
    );
    Ok(report)
}

fn resolve_group_winner(
    lattice: &Lattice,
    specs_of_method: &[(SpecId, Vec<ClassId>)],
    group: &Group,
    method_id: MethodId,
    spec_functions: &HashMap<SpecId, RawFn>,
    report: &mut UpdateReport,
) -> RawFn {
    let applicable: Vec<(SpecId, Vec<ClassId>)> = specs_of_method
        .iter()
        .filter(|(id, _)| group.mask.contains(*id))
        .cloned()
        .collect();
    resolve_selection(lattice, &applicable, method_id, spec_functions, report)
}

fn resolve_selection(
    lattice: &Lattice,
    applicable: &[(SpecId, Vec<ClassId>)],
    method_id: MethodId,
    spec_functions: &HashMap<SpecId, RawFn>,
    report: &mut UpdateReport,
) -> RawFn {
    match select_best(lattice, applicable) {
        Selection::Unique(sid) => spec_functions.get(&sid).copied().unwrap_or(NOT_IMPLEMENTED),
        Selection::Ambiguous(ids) => {
            debug!("  method {:?}: ambiguous among {:?}", method_id, ids);
            report.ambiguous.push((method_id, ids));
            AMBIGUOUS
        }
        Selection::NotImplemented => NOT_IMPLEMENTED,
    }
}

/// Resolves one call, reading the currently published tables without taking the registration
/// lock (spec §4.9, §4.10).
pub fn resolve_method(method: MethodId, args: &[ClassId]) -> Result<RawFn, MethodError> {
    let published = PUBLISHED.read().unwrap().clone();
    let name = published.method_names.get(&method).cloned().unwrap_or_default();
    let not_implemented = || MethodError {
        method_name: name.clone(),
        reason: ErrorReason::NotImplemented,
        arg_classes: args.to_vec(),
    };

    let Some(tables) = published.methods.get(&method) else {
        trace!("dispatch: {} never compiled (update() not run yet?)", name);
        return Err(not_implemented());
    };
    match dispatch::resolve(&published.gmtbl, &published.gdtbl, tables, args) {
        Some(AMBIGUOUS) => {
            trace!("dispatch: {}{:?} ambiguous", name, args);
            Err(MethodError {
                method_name: name,
                reason: ErrorReason::AmbiguousCall,
                arg_classes: args.to_vec(),
            })
        }
        Some(NOT_IMPLEMENTED) | None => {
            trace!("dispatch: {}{:?} not implemented", name, args);
            Err(not_implemented())
        }
        Some(raw) => Ok(raw),
    }
}
