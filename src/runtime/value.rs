use std::fmt;

use bitflags::bitflags;

use crate::runtime::{gc::GcHandle, symbol::Symbol, typeset::TypeBits};

/// Type tag of a [`Value`].
///
/// The discriminants double as bit positions in [`TypeBits`], so there must
/// never be more than 64 of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Kind {
    Nulled = 0,
    Void,
    Blank,
    Logic,
    Integer,
    Decimal,
    Percent,
    Char,
    Pair,
    Tuple,
    Time,
    Date,
    Datatype,
    Typeset,
    Bitset,
    Map,
    Handle,
    Binary,
    Text,
    File,
    Email,
    Url,
    Tag,
    Issue,
    Object,
    Module,
    Error,
    Frame,
    Port,
    Varargs,
    Block,
    SetBlock,
    GetBlock,
    Group,
    SetGroup,
    GetGroup,
    Path,
    SetPath,
    GetPath,
    Word,
    SetWord,
    GetWord,
    Action,
    Quoted,
    Param,
}

impl Kind {
    /// Every tag, in discriminant order.
    pub const ALL: [Kind; 45] = [
        Kind::Nulled,
        Kind::Void,
        Kind::Blank,
        Kind::Logic,
        Kind::Integer,
        Kind::Decimal,
        Kind::Percent,
        Kind::Char,
        Kind::Pair,
        Kind::Tuple,
        Kind::Time,
        Kind::Date,
        Kind::Datatype,
        Kind::Typeset,
        Kind::Bitset,
        Kind::Map,
        Kind::Handle,
        Kind::Binary,
        Kind::Text,
        Kind::File,
        Kind::Email,
        Kind::Url,
        Kind::Tag,
        Kind::Issue,
        Kind::Object,
        Kind::Module,
        Kind::Error,
        Kind::Frame,
        Kind::Port,
        Kind::Varargs,
        Kind::Block,
        Kind::SetBlock,
        Kind::GetBlock,
        Kind::Group,
        Kind::SetGroup,
        Kind::GetGroup,
        Kind::Path,
        Kind::SetPath,
        Kind::GetPath,
        Kind::Word,
        Kind::SetWord,
        Kind::GetWord,
        Kind::Action,
        Kind::Quoted,
        Kind::Param,
    ];

    /// User-visible datatype name.
    pub fn name(self) -> &'static str {
        match self {
            Kind::Nulled => "null",
            Kind::Void => "void!",
            Kind::Blank => "blank!",
            Kind::Logic => "logic!",
            Kind::Integer => "integer!",
            Kind::Decimal => "decimal!",
            Kind::Percent => "percent!",
            Kind::Char => "char!",
            Kind::Pair => "pair!",
            Kind::Tuple => "tuple!",
            Kind::Time => "time!",
            Kind::Date => "date!",
            Kind::Datatype => "datatype!",
            Kind::Typeset => "typeset!",
            Kind::Bitset => "bitset!",
            Kind::Map => "map!",
            Kind::Handle => "handle!",
            Kind::Binary => "binary!",
            Kind::Text => "text!",
            Kind::File => "file!",
            Kind::Email => "email!",
            Kind::Url => "url!",
            Kind::Tag => "tag!",
            Kind::Issue => "issue!",
            Kind::Object => "object!",
            Kind::Module => "module!",
            Kind::Error => "error!",
            Kind::Frame => "frame!",
            Kind::Port => "port!",
            Kind::Varargs => "varargs!",
            Kind::Block => "block!",
            Kind::SetBlock => "set-block!",
            Kind::GetBlock => "get-block!",
            Kind::Group => "group!",
            Kind::SetGroup => "set-group!",
            Kind::GetGroup => "get-group!",
            Kind::Path => "path!",
            Kind::SetPath => "set-path!",
            Kind::GetPath => "get-path!",
            Kind::Word => "word!",
            Kind::SetWord => "set-word!",
            Kind::GetWord => "get-word!",
            Kind::Action => "action!",
            Kind::Quoted => "quoted!",
            Kind::Param => "param!",
        }
    }

    pub fn is_path(self) -> bool {
        matches!(self, Kind::Path | Kind::SetPath | Kind::GetPath)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringKind {
    Text,
    File,
    Email,
    Url,
    Tag,
}

/// Which flavor of context a varlist's archetype declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
    Object,
    Module,
    Error,
    Frame,
    Port,
}

impl ContextKind {
    pub fn kind(self) -> Kind {
        match self {
            ContextKind::Object => Kind::Object,
            ContextKind::Module => Kind::Module,
            ContextKind::Error => Kind::Error,
            ContextKind::Frame => Kind::Frame,
            ContextKind::Port => Kind::Port,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayKind {
    Block,
    SetBlock,
    GetBlock,
    Group,
    SetGroup,
    GetGroup,
}

impl ArrayKind {
    /// Blocks and groups are scanned when collecting words deeply.
    pub fn is_eval_block(self) -> bool {
        matches!(self, ArrayKind::Block | ArrayKind::Group)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathKind {
    Path,
    SetPath,
    GetPath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WordKind {
    Word,
    SetWord,
    GetWord,
    Issue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamClass {
    Normal,
    HardQuote,
    SoftQuote,
    Refinement,
    Local,
    Return,
}

/// A series reference plus the position the value is "at".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeriesAt {
    pub series: GcHandle,
    pub index: usize,
}

impl SeriesAt {
    pub fn head(series: GcHandle) -> Self {
        Self { series, index: 0 }
    }

    pub fn at(series: GcHandle, index: usize) -> Self {
        Self { series, index }
    }
}

/// Index stored in a word that has no binding.
pub const UNBOUND_INDEX: i32 = -1;

/// Payload of an ANY-WORD! value.
///
/// A bound word caches the 1-based slot of its variable in `binding`'s
/// varlist; an unbound word carries [`UNBOUND_INDEX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Word {
    pub symbol: Symbol,
    pub binding: Option<GcHandle>,
    pub index: i32,
}

impl Word {
    pub fn unbound(symbol: Symbol) -> Self {
        Self {
            symbol,
            binding: None,
            index: UNBOUND_INDEX,
        }
    }

    pub fn bound(symbol: Symbol, varlist: GcHandle, index: usize) -> Self {
        let mut word = Self::unbound(symbol);
        word.bind(varlist, index);
        word
    }

    pub fn bind(&mut self, varlist: GcHandle, index: usize) {
        assert!(index > 0, "words bind to 1-based context slots");
        self.binding = Some(varlist);
        self.index = index as i32;
    }

    pub fn unbind(&mut self) {
        self.binding = None;
        self.index = UNBOUND_INDEX;
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }
}

/// Payload of an ANY-CONTEXT! value.
///
/// `phase` is present exactly when `kind` is [`ContextKind::Frame`]; the
/// optional `binding` is likewise only meaningful for frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextValue {
    pub kind: ContextKind,
    pub varlist: GcHandle,
    pub phase: Option<GcHandle>,
    pub binding: Option<GcHandle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tuple {
    pub len: u8,
    pub bytes: [u8; 7],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Date {
    pub year: i32,
    pub month: u8,
    pub day: u8,
}

/// Runtime value stored in arrays, varlists, and pairings.
///
/// Scalars are held inline. Everything with variable size lives on the
/// [`GcHeap`](crate::runtime::gc::GcHeap) and is referenced by handle, so
/// cloning a value never copies series content.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The "no value" sentinel.
    Nulled,
    /// Unset.
    Void,
    Blank,
    Logic(bool),
    Integer(i64),
    Decimal(f64),
    Percent(f64),
    Char(char),
    Pair(GcHandle),
    Tuple(Tuple),
    /// Nanoseconds.
    Time(i64),
    Date(Date),
    Datatype {
        kind: Kind,
        spec: Option<GcHandle>,
    },
    Typeset(TypeBits),
    Bitset(GcHandle),
    Map(GcHandle),
    /// `None` for a simple handle with no shared node.
    Handle(Option<GcHandle>),
    Binary(SeriesAt),
    String(StringKind, SeriesAt),
    Context(ContextValue),
    Varargs {
        binding: GcHandle,
        phase: Option<GcHandle>,
    },
    Array(ArrayKind, SeriesAt),
    Path(PathKind, SeriesAt),
    Word(WordKind, Word),
    Action(GcHandle),
    /// Escaped value; nested quoting bumps `depth` rather than nesting.
    Quoted {
        depth: u32,
        cell: Box<Value>,
    },
    Param(ParamClass, Symbol),
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Nulled => Kind::Nulled,
            Value::Void => Kind::Void,
            Value::Blank => Kind::Blank,
            Value::Logic(_) => Kind::Logic,
            Value::Integer(_) => Kind::Integer,
            Value::Decimal(_) => Kind::Decimal,
            Value::Percent(_) => Kind::Percent,
            Value::Char(_) => Kind::Char,
            Value::Pair(_) => Kind::Pair,
            Value::Tuple(_) => Kind::Tuple,
            Value::Time(_) => Kind::Time,
            Value::Date(_) => Kind::Date,
            Value::Datatype { .. } => Kind::Datatype,
            Value::Typeset(_) => Kind::Typeset,
            Value::Bitset(_) => Kind::Bitset,
            Value::Map(_) => Kind::Map,
            Value::Handle(_) => Kind::Handle,
            Value::Binary(_) => Kind::Binary,
            Value::String(kind, _) => match kind {
                StringKind::Text => Kind::Text,
                StringKind::File => Kind::File,
                StringKind::Email => Kind::Email,
                StringKind::Url => Kind::Url,
                StringKind::Tag => Kind::Tag,
            },
            Value::Context(ctx) => ctx.kind.kind(),
            Value::Varargs { .. } => Kind::Varargs,
            Value::Array(kind, _) => match kind {
                ArrayKind::Block => Kind::Block,
                ArrayKind::SetBlock => Kind::SetBlock,
                ArrayKind::GetBlock => Kind::GetBlock,
                ArrayKind::Group => Kind::Group,
                ArrayKind::SetGroup => Kind::SetGroup,
                ArrayKind::GetGroup => Kind::GetGroup,
            },
            Value::Path(kind, _) => match kind {
                PathKind::Path => Kind::Path,
                PathKind::SetPath => Kind::SetPath,
                PathKind::GetPath => Kind::GetPath,
            },
            Value::Word(kind, _) => match kind {
                WordKind::Word => Kind::Word,
                WordKind::SetWord => Kind::SetWord,
                WordKind::GetWord => Kind::GetWord,
                WordKind::Issue => Kind::Issue,
            },
            Value::Action(_) => Kind::Action,
            Value::Quoted { .. } => Kind::Quoted,
            Value::Param(..) => Kind::Param,
        }
    }

    pub fn block(series: GcHandle) -> Self {
        Value::Array(ArrayKind::Block, SeriesAt::head(series))
    }

    pub fn text(series: GcHandle) -> Self {
        Value::String(StringKind::Text, SeriesAt::head(series))
    }

    pub fn word(symbol: Symbol) -> Self {
        Value::Word(WordKind::Word, Word::unbound(symbol))
    }

    pub fn set_word(symbol: Symbol) -> Self {
        Value::Word(WordKind::SetWord, Word::unbound(symbol))
    }

    pub fn is_nulled(&self) -> bool {
        matches!(self, Value::Nulled)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Value::Void)
    }

    pub fn is_set_word(&self) -> bool {
        matches!(self, Value::Word(WordKind::SetWord, _))
    }

    /// Word payload of any word-like value (including ISSUE!).
    pub fn as_word(&self) -> Option<&Word> {
        match self {
            Value::Word(_, word) => Some(word),
            _ => None,
        }
    }

    pub fn as_word_mut(&mut self) -> Option<&mut Word> {
        match self {
            Value::Word(_, word) => Some(word),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<SeriesAt> {
        match self {
            Value::Array(_, at) | Value::Path(_, at) => Some(*at),
            _ => None,
        }
    }

    pub fn as_context(&self) -> Option<&ContextValue> {
        match self {
            Value::Context(ctx) => Some(ctx),
            _ => None,
        }
    }

    /// Series handle for values cloned when a context inherits them.
    pub fn clonable_series(&self) -> Option<GcHandle> {
        match self {
            Value::Array(_, at) | Value::Path(_, at) => Some(at.series),
            Value::String(_, at) | Value::Binary(at) => Some(at.series),
            _ => None,
        }
    }

    /// Whether the value carries a binding that the binder may touch.
    pub fn is_bindable(&self) -> bool {
        matches!(
            self,
            Value::Word(..)
                | Value::Array(..)
                | Value::Path(..)
                | Value::Context(_)
                | Value::Varargs { .. }
                | Value::Action(_)
        )
    }
}

bitflags! {
    /// Formatting metadata carried alongside a value in an array slot.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CellFlags: u8 {
        /// A line break precedes this element when rendered.
        const NEWLINE_BEFORE = 1 << 0;
    }
}

/// One slot of an array: a value plus per-slot metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: Value,
    pub flags: CellFlags,
}

impl Cell {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            flags: CellFlags::empty(),
        }
    }

    pub fn with_newline(value: Value) -> Self {
        Self {
            value,
            flags: CellFlags::NEWLINE_BEFORE,
        }
    }

    pub fn newline_before(&self) -> bool {
        self.flags.contains(CellFlags::NEWLINE_BEFORE)
    }

    pub fn set_newline_before(&mut self, on: bool) {
        self.flags.set(CellFlags::NEWLINE_BEFORE, on);
    }
}

impl From<Value> for Cell {
    fn from(value: Value) -> Self {
        Cell::new(value)
    }
}
