//! Generational-handle heap and the collector cooperation contract.
//!
//! Objects are owned by [`GcHeap`] and named by [`GcHandle`]s. The value layer
//! promises the collector three things:
//!
//! - every store of a value into an object that has already been published goes
//!   through [`GcHeap::set`] or [`GcHeap::write_barrier`], so mature objects that
//!   start referencing young ones are remembered;
//! - process-wide state is registered with [`GcHeap::register_root`];
//! - a native loop that keeps the only reference to a structure in a local while
//!   calling back into code that may collect anchors it first
//!   ([`GcHeap::anchor`], or the scoped `Runtime::anchored`).
pub mod gc_handle;
pub mod gc_heap;
pub mod heap_entry;
pub mod heap_object;

pub use gc_handle::GcHandle;
pub use gc_heap::{CollectKind, CollectStats, GcHeap, Place};
pub use heap_object::HeapObject;
