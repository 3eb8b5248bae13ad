//! Runtime core: the GC heap, values, contexts and series mutation.
//!
//! # Scratch state
//! Key collection needs a symbol to slot table and a buffer of pending keys.
//! Both live in a [`context::Collector`] that the caller creates and passes
//! down, so nested or concurrent collection passes each get their own.
//! A pass must leave the bind table empty when it returns, whether it
//! succeeded or failed.
pub mod action;
pub mod config;
pub mod context;
pub mod error;
pub mod gc;
pub mod modify;
pub mod mold;
pub mod series;
pub mod stats;
pub mod symbol;
pub mod typeset;
pub mod value;

pub use config::RuntimeConfig;
pub use error::{Result, RuntimeError};
