//! Table assembly (spec §4.7): the flat buffers that back per-class method tables (`gmtbl`) and
//! per-method dispatch tensors (`gdtbl`), plus the two supported strategies for resolving a
//! runtime [`ClassId`] to its slice of `gmtbl`.
//!
//! The source design describes `gmtbl`/`gdtbl` as arrays of machine words addressed through raw
//! pointer arithmetic, with a tagged "Word" that's sometimes a pointer, sometimes an integer,
//! sometimes a pointer-to-Word. Rust has no safe way to alias a `*mut Word` as a `*mut fn()`, so
//! [`Word`] is a proper enum and every "pointer-to-Word" is replaced with a plain index into the
//! owning `Vec<Word>` (see `DESIGN.md`); the layout and addressing math are otherwise unchanged.

use crate::class::ClassId;
use crate::error::UpdateError;
use crate::erase::RawFn;
use crate::graph::NodeId;
use crate::hash::{search_perfect_hash, HashInfo};
use crate::lattice::Lattice;
use crate::slots::SlotTable;
use std::collections::HashMap;

/// A single cell of `gmtbl` or `gdtbl`.
#[derive(Debug, Clone, Copy)]
pub enum Word {
    /// A resolved, type-erased specialization or next-pointer.
    Fn(RawFn),
    /// A group index, used by a multi-virtual method's `gmtbl` cell to select a `gdtbl` stride.
    Int(u32),
}

/// A contiguous slice of `gmtbl` belonging to one class: `words[offset + (slot - first_slot)]`
/// reads the cell for absolute dimension-slot `slot`.
#[derive(Debug, Clone, Copy)]
pub struct Mtbl {
    pub offset: u32,
    pub len: u32,
    pub first_slot: u32,
}

/// How a runtime [`ClassId`] is resolved to its [`Mtbl`] (spec §4.7 "publication strategies").
///
/// `Dense` is the default: since this crate's [`ClassId`] is already a small dense integer (no
/// foreign object layout to steal a field from), a plain array indexed by id is strictly better
/// than a hash table. `Hashed` is kept and exercised for hosts that can't guarantee a dense id
/// space — e.g. ids sourced from a foreign object's address rather than a registration counter.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum HashStrategy {
    Dense,
    PerfectHash,
}

pub enum MtblIndex {
    Dense(Vec<Option<Mtbl>>),
    Hashed {
        info: HashInfo,
        slots: Vec<Option<(ClassId, Mtbl)>>,
    },
}

impl MtblIndex {
    pub fn lookup(&self, id: ClassId) -> Option<Mtbl> {
        match self {
            MtblIndex::Dense(v) => v.get(id.index()).copied().flatten(),
            MtblIndex::Hashed { info, slots } => {
                let bucket = info.bucket(id);
                match slots.get(bucket) {
                    Some(Some((key, mtbl))) if *key == id => Some(*mtbl),
                    _ => None,
                }
            }
        }
    }
}

pub struct GlobalMtbl {
    pub words: Vec<Word>,
    pub index: MtblIndex,
}

/// Assembles `gmtbl`: one contiguous slice per class that uses at least one slot, each cell
/// filled from `cells` (keyed by lattice node and absolute slot number) or `Word::Int(0)` if a
/// class conforms to a slot's declaring class but no specialization ever populated that cell.
pub fn assemble_gmtbl(
    lattice: &Lattice,
    slots: &SlotTable,
    cells: &HashMap<(NodeId, u32), Word>,
    strategy: HashStrategy,
) -> Result<GlobalMtbl, UpdateError> {
    let mut words = Vec::new();
    let mut per_node: HashMap<NodeId, Mtbl> = HashMap::new();

    for &node in &lattice.layered {
        let len = slots.mtbl_len(node);
        if len == 0 {
            continue;
        }
        let first = slots.first_used_slot(node).unwrap();
        let offset = words.len() as u32;
        for slot in first..first + len {
            words.push(*cells.get(&(node, slot)).unwrap_or(&Word::Int(0)));
        }
        per_node.insert(node, Mtbl { offset, len, first_slot: first });
    }

    let index = match strategy {
        HashStrategy::Dense => {
            let mut dense = Vec::new();
            for (&node, &mtbl) in &per_node {
                let class = lattice.class_of(node);
                if dense.len() <= class.index() {
                    dense.resize(class.index() + 1, None);
                }
                dense[class.index()] = Some(mtbl);
            }
            MtblIndex::Dense(dense)
        }
        HashStrategy::PerfectHash => {
            let keys: Vec<ClassId> = per_node.keys().map(|&n| lattice.class_of(n)).collect();
            let info = search_perfect_hash(&keys)?;
            let mut buckets = vec![None; info.size as usize];
            for (&node, &mtbl) in &per_node {
                let class = lattice.class_of(node);
                buckets[info.bucket(class)] = Some((class, mtbl));
            }
            MtblIndex::Hashed { info, slots: buckets }
        }
    };

    Ok(GlobalMtbl { words, index })
}

/// One method's dispatch tensor within `gdtbl`: a `Vec<Word::Fn>` of shape `dims` with dimension 0
/// varying fastest, addressed by `offset + sum(group_index[d] * strides[d])` (spec §4.9).
#[derive(Debug, Clone)]
pub struct Tensor {
    pub offset: u32,
    pub dims: Vec<u32>,
    pub strides: Vec<u32>,
}

pub struct GlobalDispatchTable {
    pub words: Vec<Word>,
}

/// Assembles `gdtbl` from each multi-virtual method's flattened, row-major cell list.
pub fn assemble_gdtbl(tensors_in: Vec<(Vec<u32>, Vec<RawFn>)>) -> (GlobalDispatchTable, Vec<Tensor>) {
    let mut words = Vec::new();
    let mut tensors = Vec::with_capacity(tensors_in.len());
    for (dims, cells) in tensors_in {
        debug_assert_eq!(dims.iter().product::<u32>() as usize, cells.len());
        let offset = words.len() as u32;
        let strides = row_major_strides(&dims);
        words.extend(cells.into_iter().map(Word::Fn));
        tensors.push(Tensor { offset, dims, strides });
    }
    (GlobalDispatchTable { words }, tensors)
}

/// Dimension 0 gets implicit stride 1; each later dimension's stride is the product of every
/// dimension size before it (spec §4.7/§4.9: `index = g0 + g1*dims[0] + g2*dims[0]*dims[1] + ...`).
/// This is the reverse of C's row-major convention (which puts stride 1 on the last dimension);
/// the name is kept for its spec §4.7 provenance, not because the layout is C row-major.
pub(crate) fn row_major_strides(dims: &[u32]) -> Vec<u32> {
    let mut strides = vec![0u32; dims.len()];
    let mut acc = 1u32;
    for (i, &dim) in dims.iter().enumerate() {
        strides[i] = acc;
        acc *= dim;
    }
    strides
}
