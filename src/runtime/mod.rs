//! Value model and generic operations.
//!
//! # Heap Ownership
//! Every heap object is owned by the [`gc::GcHeap`] inside a [`Runtime`] and
//! named by a generational [`gc::GcHandle`]. A [`Value`] is `Copy`; holding
//! one keeps nothing alive on its own.
//!
//! The rules native code follows:
//! - Stores into an object that is already reachable go through
//!   [`gc::GcHeap::set`] (or [`gc::GcHeap::write_barrier`] for stores made
//!   some other way).
//! - Values held only in Rust locals across a call that may allocate or run
//!   user code are anchored first, usually inside `Runtime::anchored`.
//! - Allocation never collects. Collections happen at [`Runtime::maybe_collect`]
//!   or an explicit [`Runtime::collect`].
//!
//! Structures may be cyclic; the collector traces, so cycles are reclaimed.
pub mod call;
pub mod compare;
pub mod config;
pub mod context;
pub mod error;
pub mod foreign;
pub mod function;
pub mod gc;
pub mod lazy;
pub mod map;
pub mod number;
pub mod pair;
pub mod range;
pub mod render;
pub mod seq;
pub mod string;
pub mod symbol;
pub mod value;
pub mod vector;

pub use config::RuntimeConfig;
pub use context::Runtime;
pub use error::{Error, Result};
pub use value::{TypeTag, Value};
