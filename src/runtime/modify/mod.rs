//! INSERT, APPEND and CHANGE for arrays, strings and binaries.
//!
//! Both entry points return the index the caller's series value should be
//! left at: the head (0) for APPEND, the tail of the inserted material for
//! INSERT and CHANGE.
pub mod array;
pub mod string;

use bitflags::bitflags;

pub use array::modify_array;
pub use string::modify_string_or_binary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Insert,
    /// Always at the tail, regardless of the index passed.
    Append,
    Change,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ModifyFlags: u8 {
        /// Splice the elements of an array source rather than the array itself.
        const SPLICE = 1 << 0;
        /// The part length was given explicitly.
        const PART = 1 << 1;
        /// Terminate each inserted copy with a line break.
        const LINE = 1 << 2;
    }
}

/// Index a no-op modification leaves the series at.
fn natural_index(verb: Verb, index: usize) -> usize {
    match verb {
        Verb::Append => 0,
        Verb::Insert | Verb::Change => index,
    }
}
