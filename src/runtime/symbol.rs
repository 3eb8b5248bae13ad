use std::{
    collections::HashMap,
    hash::{BuildHasher, Hash, Hasher, RandomState},
};

/// A unique identifier for an interned word spelling.
///
/// Symbols are cheap to copy and compare. Two spellings that differ only by
/// case are distinct symbols but share a canon symbol (see [`Interner::canon`]),
/// which is what binding and key lookup compare against.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    /// The empty spelling used for the root key of every key list.
    pub const NONE: Symbol = Symbol(0);
    /// The hidden `self` key added to selfish contexts.
    pub const SELF: Symbol = Symbol(1);

    #[inline]
    pub(crate) fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index of this symbol.
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Byte range of an interned spelling inside the shared storage buffer.
#[derive(Debug, Clone, Copy)]
struct Entry {
    start: usize,
    end: usize,
    canon: Symbol,
}

/// Symbol table for word spellings.
///
/// Spellings are stored once in a contiguous buffer. Each spelling records
/// its canon: the symbol of its lowercase form. A spelling that is already
/// lowercase is its own canon.
///
/// ```
/// use bindery::runtime::symbol::{Interner, Symbol};
///
/// let mut symbols = Interner::new();
/// let upper = symbols.intern("Foo");
/// let lower = symbols.intern("foo");
///
/// assert_ne!(upper, lower);
/// assert_eq!(symbols.canon(upper), lower);
/// assert_eq!(symbols.intern("self"), Symbol::SELF);
/// ```
#[derive(Debug, Clone)]
pub struct Interner {
    hasher: RandomState,
    buckets: HashMap<u64, Vec<Symbol>>,
    entries: Vec<Entry>,
    storage: String,
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl Interner {
    /// Creates a symbol table holding the well-known spellings at their
    /// fixed ids.
    pub fn new() -> Self {
        let mut interner = Self {
            hasher: RandomState::new(),
            buckets: HashMap::default(),
            entries: Vec::new(),
            storage: String::new(),
        };
        let none = interner.intern("");
        let this = interner.intern("self");
        assert_eq!(none, Symbol::NONE);
        assert_eq!(this, Symbol::SELF);
        interner
    }

    /// Number of distinct spellings, which bounds every symbol index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if `sym` was produced by this table.
    pub fn contains(&self, sym: Symbol) -> bool {
        sym.index() < self.entries.len()
    }

    /// Interns a spelling and returns its symbol.
    ///
    /// # Panics
    ///
    /// Panics if the number of unique spellings exceeds `u32::MAX`.
    pub fn intern(&mut self, s: &str) -> Symbol {
        if let Some(sym) = self.lookup(s) {
            return sym;
        }

        let lowered = s.to_lowercase();
        let canon = if lowered == s {
            None
        } else {
            Some(self.intern(&lowered))
        };

        let index = self.entries.len();
        assert!(
            index <= u32::MAX as usize,
            "symbol table overflow: cannot intern more than {} unique spellings",
            u32::MAX
        );
        let sym = Symbol::new(index as u32);

        let start = self.storage.len();
        self.storage.push_str(s);
        let end = self.storage.len();

        self.entries.push(Entry {
            start,
            end,
            canon: canon.unwrap_or(sym),
        });
        let hash = self.hash_str(s);
        self.buckets.entry(hash).or_default().push(sym);
        sym
    }

    /// Finds an already-interned spelling without adding it.
    pub fn lookup(&self, s: &str) -> Option<Symbol> {
        let hash = self.hash_str(s);
        self.buckets
            .get(&hash)?
            .iter()
            .copied()
            .find(|candidate| self.try_resolve(*candidate) == Some(s))
    }

    /// Returns the canonical (case-folded) symbol for `sym`.
    ///
    /// # Panics
    ///
    /// Panics if the symbol was not produced by this table.
    #[inline]
    pub fn canon(&self, sym: Symbol) -> Symbol {
        self.entries
            .get(sym.index())
            .unwrap_or_else(|| panic!("invalid symbol: {:?}", sym))
            .canon
    }

    /// Resolves a symbol to its spelling.
    ///
    /// # Panics
    ///
    /// Panics if the symbol was not produced by this table.
    #[inline]
    pub fn resolve(&self, sym: Symbol) -> &str {
        self.try_resolve(sym)
            .unwrap_or_else(|| panic!("invalid symbol: {:?}", sym))
    }

    pub fn try_resolve(&self, sym: Symbol) -> Option<&str> {
        let entry = self.entries.get(sym.index())?;
        self.storage.get(entry.start..entry.end)
    }

    fn hash_str(&self, s: &str) -> u64 {
        let mut h = self.hasher.build_hasher();
        s.hash(&mut h);
        h.finish()
    }
}
