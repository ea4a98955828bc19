use tracing::debug;

use crate::runtime::{
    error::{Error, Result},
    gc::{
        gc_handle::GcHandle,
        heap_entry::{HeapEntry, Slot},
        heap_object::HeapObject,
    },
    value::{TypeTag, Value},
};

const DEFAULT_GC_THRESHOLD: usize = 10_000;
const MIN_GC_THRESHOLD: usize = 1024;
const MAX_GC_THRESHOLD: usize = 1_000_000;

/// A field of a published object that [`GcHeap::set`] can store into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Place {
    /// Head of an ordinary or lazy pair.
    Head,
    /// Rest of an ordinary or lazy pair.
    Rest,
    /// Element of a vector.
    Index(usize),
    /// Lower endpoint of a range.
    From,
    /// Upper endpoint of a range.
    To,
    /// Captured environment of a callable.
    Env,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectKind {
    /// Traces everything reachable and may free any unreachable object.
    Full,
    /// Frees only objects allocated since the previous collection.
    Young,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectStats {
    pub kind: CollectKind,
    pub live_before: usize,
    pub live_after: usize,
}

impl CollectStats {
    pub fn freed(&self) -> usize {
        self.live_before.saturating_sub(self.live_after)
    }
}

/// Generational-handle arena with a mark-and-sweep collector.
///
/// Every heap object is allocated here. Objects that survive a collection
/// are promoted to *mature*; a young collection then only frees objects
/// allocated since, tracing from the roots, the anchors and the remembered
/// set. The remembered set is fed by the write barrier: a mature object that
/// is made to reference a young one after publication is recorded so its
/// young referents survive a young collection.
///
/// Collection only happens when [`Self::collect`] or [`Self::collect_young`]
/// is called. Callers decide where their safe points are.
pub struct GcHeap {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    remembered: Vec<GcHandle>,
    roots: Vec<Value>,
    anchors: Vec<Value>,
    allocation_count: usize,
    gc_threshold: usize,
    gc_enabled: bool,
    total_collections: usize,
    total_allocations: usize,
}

impl Default for GcHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl GcHeap {
    /// Creates a new heap with default collection settings.
    ///
    /// Defaults:
    /// - threshold: `10_000` allocations
    /// - GC enabled: `true`
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            remembered: Vec::new(),
            roots: Vec::new(),
            anchors: Vec::new(),
            allocation_count: 0,
            gc_threshold: DEFAULT_GC_THRESHOLD,
            gc_enabled: true,
            total_collections: 0,
            total_allocations: 0,
        }
    }

    /// Creates a new heap with a custom allocation threshold.
    ///
    /// Unlike [`Self::set_threshold`], this does not clamp to `MIN_GC_THRESHOLD`.
    pub fn with_threshold(threshold: usize) -> Self {
        let mut heap = Self::new();
        heap.gc_threshold = threshold;
        heap
    }

    /// Enables or disables automatic collection checks.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.gc_enabled = enabled
    }

    /// Sets the allocation threshold that triggers collection.
    ///
    /// Values below `MIN_GC_THRESHOLD` are clamped upward.
    pub fn set_threshold(&mut self, threshold: usize) {
        self.gc_threshold = threshold.max(MIN_GC_THRESHOLD)
    }

    pub fn threshold(&self) -> usize {
        self.gc_threshold
    }

    /// Returns `true` when GC is enabled and the threshold was reached.
    pub fn should_collect(&self) -> bool {
        self.gc_enabled && self.allocation_count >= self.gc_threshold
    }

    /// Allocates a new heap object and returns a handle to it.
    ///
    /// Freed slots are reused through the free list before the storage grows.
    /// A reused slot keeps the generation it was given when it was freed.
    pub fn alloc(&mut self, object: HeapObject) -> GcHandle {
        self.allocation_count += 1;
        self.total_allocations += 1;

        let entry = HeapEntry::new(object);

        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(entry);
            GcHandle {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                entry: Some(entry),
            });
            GcHandle {
                index,
                generation: 0,
            }
        }
    }

    fn entry(&self, handle: GcHandle) -> Option<&HeapEntry> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    fn entry_mut(&mut self, handle: GcHandle) -> Option<&mut HeapEntry> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entry.as_mut()
    }

    /// Returns `true` if `handle` still names a live object.
    pub fn is_live(&self, handle: GcHandle) -> bool {
        self.entry(handle).is_some()
    }

    /// Returns an immutable reference to a live object by handle.
    ///
    /// Panics if the handle is stale or out of bounds; a value layer that keeps
    /// its roots and anchors never produces one.
    pub fn get(&self, handle: GcHandle) -> &HeapObject {
        match self.entry(handle) {
            Some(entry) => &entry.object,
            None => panic!("GcHeap::get: stale or free handle {:?}", handle),
        }
    }

    /// Mutable access for stores that do not involve values (characters,
    /// lengths, capacities) and for writes that are immediately followed by
    /// [`Self::write_barrier`].
    ///
    /// Panics under the same conditions as [`Self::get`].
    pub(crate) fn get_mut(&mut self, handle: GcHandle) -> &mut HeapObject {
        match self.entry_mut(handle) {
            Some(entry) => &mut entry.object,
            None => panic!("GcHeap::get_mut: stale or free handle {:?}", handle),
        }
    }

    /// Tag of the object behind `handle`.
    pub fn tag(&self, handle: GcHandle) -> TypeTag {
        self.get(handle).tag()
    }

    /// Records that `holder` now references `stored`.
    ///
    /// Must be called after every post-publication store of a value into a
    /// heap object. Only mature holders referencing young objects are queued.
    pub fn write_barrier(&mut self, holder: GcHandle, stored: Value) {
        let Value::Obj(target) = stored else {
            return;
        };
        let young_target = match self.entry(target) {
            Some(entry) => !entry.mature,
            None => return,
        };
        if !young_target {
            return;
        }
        if let Some(entry) = self.entry_mut(holder)
            && entry.mature
            && !entry.remembered
        {
            entry.remembered = true;
            self.remembered.push(holder);
        }
    }

    /// Stores `value` into `place` of the published object `holder`,
    /// running the write barrier.
    pub fn set(&mut self, holder: GcHandle, place: Place, value: Value) -> Result<()> {
        let object = self.get_mut(holder);
        let tag = object.tag();
        let slot = match (object, place) {
            (HeapObject::Cons(cons), Place::Head) => &mut cons.head,
            (HeapObject::Cons(cons), Place::Rest) => &mut cons.rest,
            (HeapObject::LazyCons(lcons), Place::Head) => &mut lcons.head,
            (HeapObject::LazyCons(lcons), Place::Rest) => &mut lcons.rest,
            (HeapObject::Vector(vec), Place::Index(index)) => {
                let len = vec.items.len();
                match vec.items.get_mut(index) {
                    Some(slot) => slot,
                    None => {
                        return Err(Error::range(
                            "vec-set",
                            format!("index {} is out of range for length {}", index, len),
                        ));
                    }
                }
            }
            (HeapObject::Range(range), Place::From) => &mut range.from,
            (HeapObject::Range(range), Place::To) => &mut range.to,
            (HeapObject::Function(fun), Place::Env) => &mut fun.env,
            (_, place) => {
                return Err(Error::type_mismatch(
                    "set",
                    format!("{:?} is not a field of a {} object", place, tag),
                ));
            }
        };
        *slot = value;
        self.write_barrier(holder, value);
        Ok(())
    }

    /// Registers process-wide state as a permanent root.
    pub fn register_root(&mut self, value: Value) {
        self.roots.push(value);
    }

    /// Removes one registration of `value` from the root set.
    pub fn unregister_root(&mut self, value: Value) -> bool {
        match self.roots.iter().position(|root| *root == value) {
            Some(pos) => {
                self.roots.swap_remove(pos);
                true
            }
            None => false,
        }
    }

    /// Keeps `value` alive until the anchor stack is truncated below it.
    pub fn anchor(&mut self, value: Value) {
        if value.is_heap() {
            self.anchors.push(value);
        }
    }

    /// Current anchor stack depth, for later [`Self::release_anchors`].
    pub fn anchor_depth(&self) -> usize {
        self.anchors.len()
    }

    /// Drops every anchor pushed since the stack was `depth` deep.
    pub fn release_anchors(&mut self, depth: usize) {
        self.anchors.truncate(depth);
    }

    /// Returns the number of currently live heap entries.
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.entry.is_some()).count()
    }

    /// Returns the number of live objects that have survived a collection.
    pub fn mature_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.entry.as_ref().is_some_and(|entry| entry.mature))
            .count()
    }

    pub fn remembered_count(&self) -> usize {
        self.remembered.len()
    }

    /// Returns the total number of allocations performed by this heap.
    pub fn total_allocations(&self) -> usize {
        self.total_allocations
    }

    /// Returns the total number of completed GC cycles.
    pub fn total_collections(&self) -> usize {
        self.total_collections
    }

    /// Runs a full stop-the-world mark-and-sweep collection.
    ///
    /// Roots are the registered roots, the anchor stack and `extra_roots`.
    pub fn collect(&mut self, extra_roots: &[Value]) -> CollectStats {
        self.run(CollectKind::Full, extra_roots)
    }

    /// Collects only objects allocated since the last collection.
    pub fn collect_young(&mut self, extra_roots: &[Value]) -> CollectStats {
        self.run(CollectKind::Young, extra_roots)
    }

    fn run(&mut self, kind: CollectKind, extra_roots: &[Value]) -> CollectStats {
        let live_before = self.live_count();
        let mut worklist: Vec<Value> = Vec::with_capacity(64);
        worklist.extend_from_slice(&self.roots);
        worklist.extend_from_slice(&self.anchors);
        worklist.extend_from_slice(extra_roots);

        if kind == CollectKind::Young {
            let remembered = std::mem::take(&mut self.remembered);
            for holder in remembered {
                if let Some(entry) = self.entry(holder) {
                    entry.object.trace(&mut worklist);
                }
            }
        }

        self.mark(kind, worklist);
        self.sweep(kind);
        self.remembered.clear();

        let live_after = self.live_count();
        self.total_collections += 1;
        self.allocation_count = 0;
        self.adapt_threshold(live_before.saturating_sub(live_after), live_before);

        let stats = CollectStats {
            kind,
            live_before,
            live_after,
        };
        debug!(
            kind = ?kind,
            live_before,
            live_after,
            threshold = self.gc_threshold,
            "gc cycle complete"
        );
        stats
    }

    fn mark(&mut self, kind: CollectKind, mut worklist: Vec<Value>) {
        let mut children = Vec::with_capacity(16);
        while let Some(value) = worklist.pop() {
            let Value::Obj(handle) = value else {
                continue;
            };
            let Some(entry) = self.entry_mut(handle) else {
                continue;
            };
            if entry.marked {
                continue;
            }
            // Mature objects are assumed live during a young collection; their
            // young referents arrive through the remembered set.
            if kind == CollectKind::Young && entry.mature {
                continue;
            }
            entry.marked = true;
            children.clear();
            entry.object.trace(&mut children);
            worklist.extend_from_slice(&children);
        }
    }

    fn sweep(&mut self, kind: CollectKind) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Some(entry) = slot.entry.as_mut() else {
                continue;
            };
            if entry.marked {
                entry.marked = false;
                entry.mature = true;
                entry.remembered = false;
            } else if kind == CollectKind::Full || !entry.mature {
                slot.entry = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free_list.push(index as u32);
            } else {
                entry.remembered = false;
            }
        }
    }

    fn adapt_threshold(&mut self, collected: usize, total_before: usize) {
        if total_before == 0 {
            return;
        }

        let ratio = collected as f64 / total_before as f64;
        if ratio < 0.25 {
            self.gc_threshold = (self.gc_threshold * 2).min(MAX_GC_THRESHOLD);
        } else if ratio > 0.75 {
            self.gc_threshold = (self.gc_threshold / 2).max(MIN_GC_THRESHOLD)
        }
    }
}
