//! FORM and MOLD rendering into a reusable buffer.
//!
//! FORM is the "display" rendering: strings appear without delimiters and a
//! block's elements are joined by spaces without brackets. MOLD is the
//! "source" rendering that could be loaded back. The text splice path
//! renders any source it cannot copy bytes from directly through here.

use crate::runtime::{
    context::Context,
    error::{Result, RuntimeError},
    gc::{GcHandle, GcHeap, HeapObject},
    series::{Array, ArrayFlags},
    typeset::TypeBits,
    value::{ArrayKind, Date, Kind, ParamClass, PathKind, SeriesAt, StringKind, Value, WordKind},
};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Rendering buffer.
///
/// Arrays and varlists currently being rendered are kept on a stack so a
/// series that contains itself renders as `...` instead of recursing.
pub struct Mold<'h> {
    heap: &'h GcHeap,
    buf: String,
    stack: Vec<GcHandle>,
}

impl<'h> Mold<'h> {
    pub fn new(heap: &'h GcHeap) -> Self {
        Self {
            heap,
            buf: String::new(),
            stack: Vec::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// Codepoints rendered so far.
    pub fn len(&self) -> usize {
        self.buf.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(self) -> String {
        self.buf
    }

    pub fn form_value(&mut self, value: &Value) {
        self.mold_or_form(value, true);
    }

    pub fn mold_value(&mut self, value: &Value) {
        self.mold_or_form(value, false);
    }

    pub fn mold_or_form(&mut self, value: &Value, form: bool) {
        let heap = self.heap;
        match value {
            Value::Nulled => {
                if !form {
                    self.buf.push_str("~null~");
                }
            }
            Value::Void => {
                if !form {
                    self.buf.push_str("~void~");
                }
            }
            Value::Blank => self.buf.push('_'),
            Value::Logic(flag) => self.buf.push_str(if *flag { "true" } else { "false" }),
            Value::Integer(i) => self.buf.push_str(&i.to_string()),
            Value::Decimal(d) => self.buf.push_str(&format_decimal(*d)),
            Value::Percent(p) => {
                self.buf.push_str(&format_decimal(p * 100.0));
                self.buf.push('%');
            }
            Value::Char(c) => {
                if form {
                    self.buf.push(*c);
                } else {
                    self.buf.push_str("#\"");
                    self.push_escaped(*c);
                    self.buf.push('"');
                }
            }
            Value::Pair(handle) => {
                if let HeapObject::Pairing { first, second } = heap.get(*handle) {
                    self.mold_or_form(first, form);
                    self.buf.push('x');
                    self.mold_or_form(second, form);
                }
            }
            Value::Tuple(tuple) => {
                let len = usize::from(tuple.len).min(tuple.bytes.len());
                let parts: Vec<String> = tuple.bytes[..len].iter().map(u8::to_string).collect();
                self.buf.push_str(&parts.join("."));
            }
            Value::Time(nanos) => self.buf.push_str(&format_time(*nanos)),
            Value::Date(date) => self.buf.push_str(&format_date(*date)),
            Value::Datatype { kind, .. } => self.buf.push_str(kind.name()),
            Value::Typeset(bits) => self.mold_typeset(*bits),
            Value::Bitset(handle) => {
                if let HeapObject::Bitset { bits, negated } = heap.get(*handle) {
                    self.buf.push_str("make bitset! ");
                    if *negated {
                        self.buf.push_str("[not bits ");
                    }
                    self.push_hex(bits);
                    if *negated {
                        self.buf.push(']');
                    }
                }
            }
            Value::Map(handle) => {
                if let HeapObject::Map { pairlist } = heap.get(*handle) {
                    self.buf.push_str("make map! ");
                    self.mold_array(ArrayKind::Block, SeriesAt::head(*pairlist), false);
                }
            }
            Value::Handle(_) => self.buf.push_str("#[handle!]"),
            Value::Binary(at) => {
                let data = heap.bytes(at.series).data();
                self.push_hex(data.get(at.index..).unwrap_or(&[]));
            }
            Value::String(kind, at) => self.mold_string(*kind, *at, form),
            Value::Context(ctx) => self.mold_context(Context::from_varlist(ctx.varlist), form),
            Value::Varargs { .. } => self.buf.push_str("make varargs! [...]"),
            Value::Array(kind, at) => self.mold_array(*kind, *at, form),
            Value::Path(kind, at) => self.mold_path(*kind, *at),
            Value::Word(kind, word) => {
                let spelling = heap.symbols().resolve(word.symbol);
                match kind {
                    WordKind::Word => self.buf.push_str(spelling),
                    WordKind::SetWord => {
                        self.buf.push_str(spelling);
                        self.buf.push(':');
                    }
                    WordKind::GetWord => {
                        self.buf.push(':');
                        self.buf.push_str(spelling);
                    }
                    WordKind::Issue => {
                        self.buf.push('#');
                        self.buf.push_str(spelling);
                    }
                }
            }
            Value::Action(action) => self.mold_action(*action),
            Value::Quoted { depth, cell } => {
                for _ in 0..*depth {
                    self.buf.push('\'');
                }
                self.mold_value(cell);
            }
            Value::Param(class, symbol) => {
                let spelling = heap.symbols().resolve(*symbol);
                match class {
                    ParamClass::Normal => self.buf.push_str(spelling),
                    ParamClass::HardQuote => {
                        self.buf.push(':');
                        self.buf.push_str(spelling);
                    }
                    ParamClass::SoftQuote => {
                        self.buf.push('\'');
                        self.buf.push_str(spelling);
                    }
                    ParamClass::Refinement => {
                        self.buf.push('/');
                        self.buf.push_str(spelling);
                    }
                    ParamClass::Local => {
                        self.buf.push('.');
                        self.buf.push_str(spelling);
                    }
                    ParamClass::Return => {
                        self.buf.push_str(spelling);
                        self.buf.push(':');
                    }
                }
            }
        }
    }

    fn push_hex(&mut self, bytes: &[u8]) {
        self.buf.push_str("#{");
        for byte in bytes {
            self.buf.push_str(&format!("{byte:02X}"));
        }
        self.buf.push('}');
    }

    fn push_escaped(&mut self, c: char) {
        match c {
            '"' => self.buf.push_str("^\""),
            '^' => self.buf.push_str("^^"),
            '\n' => self.buf.push_str("^/"),
            '\t' => self.buf.push_str("^-"),
            _ => self.buf.push(c),
        }
    }

    fn mold_string(&mut self, kind: StringKind, at: SeriesAt, form: bool) {
        let heap = self.heap;
        let bytes = heap.bytes(at.series);
        let Some(text) = bytes.as_str() else {
            return;
        };
        let text = &text[bytes.seek(at.index)..];

        match kind {
            StringKind::Tag => {
                self.buf.push('<');
                self.buf.push_str(text);
                self.buf.push('>');
            }
            StringKind::Email | StringKind::Url => self.buf.push_str(text),
            _ if form => self.buf.push_str(text),
            StringKind::File => {
                self.buf.push('%');
                self.buf.push_str(text);
            }
            StringKind::Text => {
                self.buf.push('"');
                for c in text.chars() {
                    self.push_escaped(c);
                }
                self.buf.push('"');
            }
        }
    }

    fn mold_typeset(&mut self, bits: TypeBits) {
        let names: Vec<&str> = Kind::ALL
            .iter()
            .filter(|kind| bits.contains(**kind))
            .map(|kind| kind.name())
            .collect();
        self.buf.push_str("make typeset! [");
        self.buf.push_str(&names.join(" "));
        self.buf.push(']');
    }

    fn mold_array(&mut self, kind: ArrayKind, at: SeriesAt, form: bool) {
        if self.stack.contains(&at.series) {
            self.buf.push_str(if form { "..." } else { "[...]" });
            return;
        }
        self.stack.push(at.series);

        let heap = self.heap;
        let array: &Array = heap.array(at.series);
        if form {
            for (i, cell) in array.cells_at(at.index).iter().enumerate() {
                if i > 0 {
                    self.buf.push(' ');
                }
                self.form_value(&cell.value);
            }
        } else {
            let (open, close) = match kind {
                ArrayKind::Block | ArrayKind::SetBlock | ArrayKind::GetBlock => ('[', ']'),
                ArrayKind::Group | ArrayKind::SetGroup | ArrayKind::GetGroup => ('(', ')'),
            };
            if matches!(kind, ArrayKind::GetBlock | ArrayKind::GetGroup) {
                self.buf.push(':');
            }
            self.buf.push(open);
            for (i, cell) in array.cells_at(at.index).iter().enumerate() {
                if cell.newline_before() {
                    self.buf.push('\n');
                } else if i > 0 {
                    self.buf.push(' ');
                }
                self.mold_value(&cell.value);
            }
            if array.has_flag(ArrayFlags::NEWLINE_AT_TAIL) {
                self.buf.push('\n');
            }
            self.buf.push(close);
            if matches!(kind, ArrayKind::SetBlock | ArrayKind::SetGroup) {
                self.buf.push(':');
            }
        }

        self.stack.pop();
    }

    fn mold_path(&mut self, kind: PathKind, at: SeriesAt) {
        if self.stack.contains(&at.series) {
            self.buf.push_str("...");
            return;
        }
        self.stack.push(at.series);

        if kind == PathKind::GetPath {
            self.buf.push(':');
        }
        let heap = self.heap;
        for (i, cell) in heap.array(at.series).cells_at(at.index).iter().enumerate() {
            if i > 0 {
                self.buf.push('/');
            }
            self.mold_value(&cell.value);
        }
        if kind == PathKind::SetPath {
            self.buf.push(':');
        }

        self.stack.pop();
    }

    fn mold_context(&mut self, ctx: Context, form: bool) {
        let heap = self.heap;
        let kind = ctx.kind(heap).kind();
        if self.stack.contains(&ctx.varlist()) {
            self.buf.push_str("make ");
            self.buf.push_str(kind.name());
            self.buf.push_str(" [...]");
            return;
        }
        self.stack.push(ctx.varlist());

        if !form {
            self.buf.push_str("make ");
            self.buf.push_str(kind.name());
            self.buf.push_str(" [");
        }
        let mut first = true;
        for (key, var) in ctx.keys(heap).iter().zip(ctx.vars(heap)).skip(1) {
            if key.is_hidden() {
                continue;
            }
            if !first {
                self.buf.push(if form { '\n' } else { ' ' });
            }
            first = false;
            self.buf.push_str(heap.symbols().resolve(key.symbol));
            self.buf.push_str(": ");
            self.mold_value(var);
        }
        if !form {
            self.buf.push(']');
        }

        self.stack.pop();
    }

    fn mold_action(&mut self, action: GcHandle) {
        let heap = self.heap;
        let paramlist = heap.action(action).paramlist;
        let names: Vec<&str> = heap
            .keylist(paramlist)
            .keys()
            .iter()
            .skip(1)
            .map(|key| heap.symbols().resolve(key.symbol))
            .collect();
        self.buf.push_str("#[action! [");
        self.buf.push_str(&names.join(" "));
        self.buf.push_str("]]");
    }
}

fn format_decimal(d: f64) -> String {
    if d.is_finite() && d.fract() == 0.0 && d.abs() < 1e15 {
        format!("{d:.1}")
    } else {
        format!("{d}")
    }
}

fn format_time(nanos: i64) -> String {
    let sign = if nanos < 0 { "-" } else { "" };
    let nanos = nanos.unsigned_abs();
    let per_second = NANOS_PER_SECOND.unsigned_abs();
    let seconds = nanos / per_second;
    let fraction = nanos % per_second;

    let mut out = format!(
        "{sign}{}:{:02}:{:02}",
        seconds / 3600,
        (seconds / 60) % 60,
        seconds % 60
    );
    if fraction != 0 {
        let digits = format!("{fraction:09}");
        out.push('.');
        out.push_str(digits.trim_end_matches('0'));
    }
    out
}

fn format_date(date: Date) -> String {
    let month = MONTHS
        .get(usize::from(date.month).saturating_sub(1))
        .copied()
        .unwrap_or("???");
    format!("{}-{}-{}", date.day, month, date.year)
}

pub fn form(heap: &GcHeap, value: &Value) -> String {
    let mut mold = Mold::new(heap);
    mold.form_value(value);
    mold.finish()
}

pub fn mold(heap: &GcHeap, value: &Value) -> String {
    let mut mold = Mold::new(heap);
    mold.mold_value(value);
    mold.finish()
}

/// Joins the elements of a block at `at` as raw bytes, for splicing into a
/// BINARY!.
///
/// Integers contribute one byte each, characters and strings their UTF-8
/// encoding, binaries their bytes. Nothing else has a byte rendering.
pub fn join_binary(heap: &GcHeap, at: SeriesAt) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for cell in heap.array(at.series).cells_at(at.index) {
        match &cell.value {
            Value::Integer(i) => {
                let byte =
                    u8::try_from(*i).map_err(|_| RuntimeError::ByteOutOfRange { value: *i })?;
                out.push(byte);
            }
            Value::Char(c) => {
                let mut encoded = [0; 4];
                out.extend_from_slice(c.encode_utf8(&mut encoded).as_bytes());
            }
            Value::Binary(bin) => {
                let data = heap.bytes(bin.series).data();
                out.extend_from_slice(data.get(bin.index..).unwrap_or(&[]));
            }
            value @ Value::String(..) => out.extend_from_slice(form(heap, value).as_bytes()),
            other => return Err(RuntimeError::InvalidType { got: other.kind() }),
        }
    }
    Ok(out)
}
