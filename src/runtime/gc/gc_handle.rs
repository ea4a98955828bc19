/// Generational handle into the GC heap.
///
/// A `GcHandle` is a lightweight, copyable `(index, generation)` pair naming a
/// heap slot. Freeing a slot bumps its generation, so a handle that outlived
/// its object never resolves to whatever later reuses the slot. It is the
/// runtime representation used inside `Value::Obj`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GcHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl GcHandle {
    /// Returns the raw heap slot index backing this handle.
    pub fn index(self) -> u32 {
        self.index
    }

    /// Returns the slot generation this handle was issued for.
    pub fn generation(self) -> u32 {
        self.generation
    }
}
