use std::rc::Rc;

use rand::{SeedableRng, rngs::StdRng};
use tracing::trace;

use crate::runtime::{
    config::RuntimeConfig,
    error::Result,
    function::Interpreter,
    gc::{CollectStats, GcHandle, GcHeap, HeapObject},
    number::{Arithmetic, StandardArithmetic},
    value::{TypeTag, Value},
};

/// Process-wide state of the value layer.
///
/// Everything that would otherwise be a global lives here and is passed
/// explicitly: the heap, the pair free list, the numeric comparison
/// interface, the interpreter hook and the shuffle generator. The runtime is
/// single-threaded; a `Runtime` is created at startup and dropped at shutdown.
pub struct Runtime {
    pub heap: GcHeap,
    pub(crate) pair_free_list: Vec<GcHandle>,
    config: RuntimeConfig,
    arith: Rc<dyn Arithmetic>,
    interpreter: Option<Rc<dyn Interpreter>>,
    rng: StdRng,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let mut heap = GcHeap::with_threshold(config.gc_threshold);
        heap.set_enabled(config.gc_enabled);
        let rng = match config.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            heap,
            pair_free_list: Vec::new(),
            config,
            arith: Rc::new(StandardArithmetic),
            interpreter: None,
            rng,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn set_arithmetic(&mut self, arith: Rc<dyn Arithmetic>) {
        self.arith = arith;
    }

    pub fn arithmetic(&self) -> Rc<dyn Arithmetic> {
        Rc::clone(&self.arith)
    }

    pub fn set_interpreter(&mut self, interpreter: Rc<dyn Interpreter>) {
        self.interpreter = Some(interpreter);
    }

    pub fn interpreter(&self) -> Option<Rc<dyn Interpreter>> {
        self.interpreter.clone()
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Discriminant of any value. Constant time and allocation-free.
    pub fn classify(&self, value: Value) -> TypeTag {
        match value {
            Value::Obj(handle) => self.heap.tag(handle),
            other => other.immediate_tag().unwrap_or(TypeTag::Nil),
        }
    }

    /// Allocates a fully built object. The object is unpublished until the
    /// returned value is stored somewhere.
    pub fn alloc(&mut self, object: HeapObject) -> Value {
        Value::Obj(self.heap.alloc(object))
    }

    /// Heap payload behind `value`, if it is a reference.
    pub fn object(&self, value: Value) -> Option<&HeapObject> {
        value.as_handle().map(|handle| self.heap.get(handle))
    }

    pub fn anchor(&mut self, value: Value) {
        self.heap.anchor(value);
    }

    /// Runs `f` with a fresh anchor scope; anchors pushed inside are released
    /// when `f` returns, successfully or not.
    pub fn anchored<R>(&mut self, f: impl FnOnce(&mut Runtime) -> Result<R>) -> Result<R> {
        let depth = self.heap.anchor_depth();
        let result = f(self);
        self.heap.release_anchors(depth);
        result
    }

    pub fn register_root(&mut self, value: Value) {
        self.heap.register_root(value);
    }

    /// Full collection. The pair free list is emptied first: recycled cells
    /// are unreachable by definition.
    pub fn collect(&mut self, extra_roots: &[Value]) -> CollectStats {
        self.drop_recycled();
        self.heap.collect(extra_roots)
    }

    pub fn collect_young(&mut self, extra_roots: &[Value]) -> CollectStats {
        self.drop_recycled();
        self.heap.collect_young(extra_roots)
    }

    /// Safe point: collects if the allocation threshold was reached.
    pub fn maybe_collect(&mut self, extra_roots: &[Value]) -> Option<CollectStats> {
        if !self.heap.should_collect() {
            return None;
        }
        Some(if self.config.minor_collections {
            self.collect_young(extra_roots)
        } else {
            self.collect(extra_roots)
        })
    }

    fn drop_recycled(&mut self) {
        if !self.pair_free_list.is_empty() {
            trace!(count = self.pair_free_list.len(), "dropping recycled pairs");
            self.pair_free_list.clear();
        }
    }
}
