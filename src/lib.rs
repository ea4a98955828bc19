pub mod runtime;

pub use runtime::{Error, Result, Runtime, RuntimeConfig, TypeTag, Value};
