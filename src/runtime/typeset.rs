use bitflags::bitflags;

use crate::runtime::{symbol::Symbol, value::Kind};

/// 64-bit membership set over [`Kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeBits(u64);

impl TypeBits {
    pub const EMPTY: TypeBits = TypeBits(0);
    pub const ALL: TypeBits = TypeBits(u64::MAX);

    pub fn of(kinds: &[Kind]) -> Self {
        kinds.iter().fold(Self::EMPTY, |bits, kind| bits.with(*kind))
    }

    #[inline]
    pub fn contains(self, kind: Kind) -> bool {
        self.0 & (1u64 << kind as u8) != 0
    }

    #[inline]
    pub fn with(self, kind: Kind) -> Self {
        TypeBits(self.0 | (1u64 << kind as u8))
    }

    #[inline]
    pub fn without(self, kind: Kind) -> Self {
        TypeBits(self.0 & !(1u64 << kind as u8))
    }

    pub fn bits(self) -> u64 {
        self.0
    }
}

bitflags! {
    /// Per-key flags carried by a [`Typeset`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct KeyFlags: u8 {
        /// Not shown by reflection and not found by ordinary lookup.
        const HIDDEN = 1 << 0;
        /// The variable may not be overwritten.
        const LOCKED = 1 << 1;
        /// The bound action takes its first argument from the left.
        const LOOKBACK = 1 << 2;
    }
}

/// A key list entry: which symbol a slot is named by, and which kinds of
/// value it admits.
///
/// Keys are copied by value between key lists; once a key list is shared
/// its entries are never edited in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Typeset {
    pub symbol: Symbol,
    pub canon: Symbol,
    pub bits: TypeBits,
    pub flags: KeyFlags,
}

impl Typeset {
    pub fn new(symbol: Symbol, canon: Symbol, bits: TypeBits) -> Self {
        Self {
            symbol,
            canon,
            bits,
            flags: KeyFlags::empty(),
        }
    }

    /// The slot-0 key of every key list.
    pub fn root() -> Self {
        Self::new(Symbol::NONE, Symbol::NONE, TypeBits::ALL)
    }

    /// The hidden `self` key of selfish contexts.
    pub fn self_key() -> Self {
        let mut key = Self::new(Symbol::SELF, Symbol::SELF, TypeBits::ALL);
        key.flags.insert(KeyFlags::HIDDEN);
        key
    }

    pub fn is_hidden(&self) -> bool {
        self.flags.contains(KeyFlags::HIDDEN)
    }

    pub fn is_locked(&self) -> bool {
        self.flags.contains(KeyFlags::LOCKED)
    }

    pub fn is_lookback(&self) -> bool {
        self.flags.contains(KeyFlags::LOOKBACK)
    }
}
