//! The dispatcher (spec §4.9): turns a tuple of runtime [`ClassId`]s into a resolved, type-erased
//! function pointer by walking `gmtbl` and, for multi-virtual methods, `gdtbl`.
//!
//! Grounded on the source design's "N-virtual" dispatch sequence: look up each argument's mtbl
//! slot, and either call straight through it (one virtual parameter) or treat each cell as a
//! group index and accumulate a strided offset into the method's dispatch tensor (more than one).

use crate::class::ClassId;
use crate::erase::RawFn;
use crate::tables::{GlobalDispatchTable, GlobalMtbl, Tensor, Word};
use log::trace;

/// Everything [`resolve`] needs about one method's placement in the compiled tables: its
/// per-dimension absolute slot numbers (one per virtual parameter, in declaration order) and,
/// for arity > 1, the tensor holding its resolved specializations.
#[derive(Debug, Clone)]
pub struct MethodTables {
    pub slots: Vec<u32>,
    pub tensor: Option<Tensor>,
}

/// Resolves `args` (one [`ClassId`] per virtual parameter, in the method's declared order)
/// against the compiled tables. Returns `None` if any argument's class never registered an mtbl
/// entry (an unregistered or non-participating runtime type) or a gmtbl cell was never filled
/// (no applicable specialization).
pub fn resolve(
    gmtbl: &GlobalMtbl,
    gdtbl: &GlobalDispatchTable,
    method: &MethodTables,
    args: &[ClassId],
) -> Option<RawFn> {
    debug_assert_eq!(args.len(), method.slots.len());

    if method.slots.len() == 1 {
        let cell = read_cell(gmtbl, args[0], method.slots[0])?;
        return match cell {
            Word::Fn(f) => Some(f),
            Word::Int(_) => None,
        };
    }

    let tensor = method.tensor.as_ref()?;
    let mut index = 0usize;
    for (dim, (&slot, &stride)) in method.slots.iter().zip(&tensor.strides).enumerate() {
        let cell = read_cell(gmtbl, args[dim], slot)?;
        let group = match cell {
            Word::Int(g) => g,
            Word::Fn(_) => return None,
        };
        index += group as usize * stride as usize;
    }
    trace!("dispatch: tensor offset {} + index {}", tensor.offset, index);
    match gdtbl.words.get(tensor.offset as usize + index)? {
        Word::Fn(f) => Some(*f),
        Word::Int(_) => None,
    }
}

fn read_cell(gmtbl: &GlobalMtbl, class: ClassId, slot: u32) -> Option<Word> {
    let mtbl = gmtbl.index.lookup(class)?;
    if slot < mtbl.first_slot || slot >= mtbl.first_slot + mtbl.len {
        return None;
    }
    let local = (slot - mtbl.first_slot) as usize;
    gmtbl.words.get(mtbl.offset as usize + local).copied()
}
