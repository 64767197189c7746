//! Explicit class/interface registry.
//!
//! The engine needs, per class, an identity suitable for hashing and use as a key, plus the list
//! of direct bases/interfaces (see spec §9 "Class metadata access"). Rust has no RTTI to lean on,
//! so the host registers this metadata explicitly, the way the source design recommends for
//! target languages without reflective class descriptors: one declaration per participating
//! class, assigned a stable identity by a small, process-wide table.

use std::fmt;
use std::sync::Arc;

/// Interned identity for a registered class or interface.
///
/// This is the Rust stand-in for a foreign "class descriptor handle" or vtable pointer: cheap to
/// copy, hash and use as an array index, and stable for the process's lifetime.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ClassId(pub(crate) u32);

impl ClassId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct ClassDef {
    pub name: Arc<String>,
    /// Direct bases and/or interfaces, as declared by the host. May be empty (a root class).
    pub bases: Vec<ClassId>,
    /// Interfaces are conformance sources but never dispatch targets (spec §4.1, §4.3): no
    /// runtime value is ever *exactly* of an interface type, so they never receive slots of
    /// their own or appear in a dispatch tensor's groups.
    pub is_interface: bool,
}

/// Process-wide table of every class and interface the host has declared.
///
/// This is populated once, at start-up, by the embedding program — the equivalent of the
/// per-class static initializers the source design relies on in languages with real RTTI. The
/// [`crate::lattice`] module then seeds and scoops a sublattice of *this* table down to only the
/// classes that participate in some registered method (spec §4.1).
#[derive(Debug, Default)]
pub struct ClassTable {
    defs: Vec<ClassDef>,
    by_name: std::collections::HashMap<String, ClassId>,
}

impl ClassTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&mut self, name: &str, bases: &[ClassId], is_interface: bool) -> ClassId {
        if let Some(&existing) = self.by_name.get(name) {
            return existing;
        }
        let name = Arc::new(name.to_string());
        let id = ClassId(self.defs.len() as u32);
        self.defs.push(ClassDef {
            name: Arc::clone(&name),
            bases: bases.to_vec(),
            is_interface,
        });
        self.by_name.insert(name.as_str().to_string(), id);
        id
    }

    /// Registers a concrete class with the given direct bases/interfaces, returning its id.
    ///
    /// Calling this again with the same name returns the existing id; this mirrors the teacher's
    /// `HashMap::entry`-style idempotent construction used when loading duplicate JVM constant
    /// pool entries.
    pub fn register_class(&mut self, name: &str, bases: &[ClassId]) -> ClassId {
        self.register(name, bases, false)
    }

    /// Registers an interface, which may itself extend other interfaces.
    pub fn register_interface(&mut self, name: &str, bases: &[ClassId]) -> ClassId {
        self.register(name, bases, true)
    }

    pub fn def(&self, id: ClassId) -> &ClassDef {
        &self.defs[id.index()]
    }

    pub fn name(&self, id: ClassId) -> &Arc<String> {
        &self.def(id).name
    }

    pub fn bases(&self, id: ClassId) -> &[ClassId] {
        &self.def(id).bases
    }

    pub fn is_interface(&self, id: ClassId) -> bool {
        self.def(id).is_interface
    }

    pub fn id_of(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ClassId> + '_ {
        (0..self.defs.len()).map(|i| ClassId(i as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent() {
        let mut t = ClassTable::new();
        let a1 = t.register_class("A", &[]);
        let a2 = t.register_class("A", &[]);
        assert_eq!(a1, a2);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn bases_and_interfaces() {
        let mut t = ClassTable::new();
        let animal = t.register_class("Animal", &[]);
        let dog = t.register_class("Dog", &[animal]);
        assert_eq!(t.bases(dog), &[animal]);
        assert!(!t.is_interface(dog));

        let comparable = t.register_interface("Comparable", &[]);
        assert!(t.is_interface(comparable));
    }
}
