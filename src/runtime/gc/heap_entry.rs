use crate::runtime::gc::heap_object::HeapObject;

/// A live heap slot's payload plus collector bookkeeping.
pub struct HeapEntry {
    pub(crate) object: HeapObject,
    pub(crate) marked: bool,
    /// Survived at least one collection.
    pub(crate) mature: bool,
    /// Already queued in the remembered set.
    pub(crate) remembered: bool,
}

impl HeapEntry {
    pub(crate) fn new(object: HeapObject) -> Self {
        Self {
            object,
            marked: false,
            mature: false,
            remembered: false,
        }
    }
}

/// One arena slot. The generation survives the entry so stale handles can be
/// detected after the slot is freed and reused.
pub(crate) struct Slot {
    pub(crate) generation: u32,
    pub(crate) entry: Option<HeapEntry>,
}
