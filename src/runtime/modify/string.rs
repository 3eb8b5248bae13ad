use tracing::trace;

use crate::runtime::{
    error::{Result, RuntimeError},
    gc::{GcHandle, GcHeap},
    modify::{ModifyFlags, Verb, natural_index},
    mold::{Mold, join_binary},
    series::Bookmark,
    value::{ArrayKind, StringKind, Value},
};

/// Inserts, appends or changes `src` into the string or binary `dst`.
///
/// A BINARY! is indexed by byte and a string by codepoint, even when both
/// view the same storage. Once storage is text every edit has to keep it
/// valid UTF-8, so a binary edit that starts or ends inside a codepoint
/// fails with [`RuntimeError::MidCodepoint`].
///
/// `part` limits how many source units INSERT/APPEND take when
/// [`ModifyFlags::PART`] is set; for CHANGE it is how many destination
/// units are replaced. Units are bytes for binary storage and codepoints
/// for text. Returns the tail of the insertion (in the destination's units)
/// or 0 for APPEND.
pub fn modify_string_or_binary(
    heap: &mut GcHeap,
    dst: &Value,
    verb: Verb,
    src: &Value,
    flags: ModifyFlags,
    part: usize,
    dups: i64,
) -> Result<usize> {
    let (series, index, is_binary) = match dst {
        Value::Binary(at) => (at.series, at.index, true),
        Value::String(_, at) => (at.series, at.index, false),
        other => panic!("modify target must be a string or binary, got {}", other.kind()),
    };
    let bookmark_min_len = heap.config().bookmark_min_len;

    let bytes = heap.bytes(series);
    if bytes.is_read_only() {
        return Err(RuntimeError::ReadOnly);
    }
    let is_text = bytes.is_text();
    assert!(is_binary || is_text, "string value over non-text storage");
    if is_binary && is_text && index < bytes.size() && !bytes.is_char_boundary(index) {
        return Err(RuntimeError::MidCodepoint { index });
    }

    let tail = if is_binary { bytes.size() } else { bytes.len() };

    if src.is_nulled() && verb != Verb::Change {
        return Ok(natural_index(verb, index));
    }
    let limit = (verb != Verb::Change && flags.contains(ModifyFlags::PART)).then_some(part);
    if limit == Some(0) || dups <= 0 {
        return Ok(natural_index(verb, index));
    }
    let dups = usize::try_from(dups).unwrap_or(0);

    let (index, dst_off) = if verb == Verb::Append || index > tail {
        (tail, heap.bytes(series).size())
    } else if is_binary {
        (index, index)
    } else {
        (index, heap.bytes_mut(series).offset_for_index(index, bookmark_min_len))
    };

    let mut source = source_bytes(heap, series, is_binary, src)?;
    let mut src_cps = if is_text {
        std::str::from_utf8(&source)
            .map_err(|_| RuntimeError::InvalidUtf8)?
            .chars()
            .count()
    } else {
        source.len()
    };

    if let Some(limit) = limit {
        if is_text && !is_binary {
            let cut = codepoint_prefix_size(&source, limit);
            source.truncate(cut);
            src_cps = src_cps.min(limit);
        } else {
            source.truncate(limit);
            if is_text {
                // A byte limit may cut a codepoint in half.
                src_cps = std::str::from_utf8(&source)
                    .map_err(|_| RuntimeError::InvalidUtf8)?
                    .chars()
                    .count();
            } else {
                src_cps = source.len();
            }
        }
    }

    let line = usize::from(flags.contains(ModifyFlags::LINE));
    let size_total = (source.len() + line) * dups;
    let cps_total = (src_cps + line) * dups;
    let units_total = if is_binary { size_total } else { cps_total };

    let mut payload = Vec::with_capacity(size_total);
    for _ in 0..dups {
        payload.extend_from_slice(&source);
        if line == 1 {
            payload.push(b'\n');
        }
    }

    let bytes = heap.bytes_mut(series);
    // A string index already counts codepoints.
    let cp_index = if is_binary && is_text {
        bytes.index_for_offset(dst_off)
    } else {
        index
    };
    let mut bookmark = bytes.bookmark();

    match verb {
        Verb::Insert | Verb::Append => {
            bytes.data_vec_mut().splice(dst_off..dst_off, payload);
            if is_text {
                let len = bytes.len() + cps_total;
                bytes.set_text_len(len);
                if let Some(mark) = &mut bookmark {
                    if mark.index >= cp_index {
                        mark.index += cps_total;
                        mark.offset += size_total;
                    }
                }
            }
        }
        Verb::Change => {
            let part_units = if flags.contains(ModifyFlags::PART) {
                part
            } else {
                units_total
            };
            let part_units = part_units.min(tail - index);
            let part_size = if is_binary {
                part_units
            } else {
                bytes.size_of_codepoints(dst_off, part_units)
            };
            let end = dst_off + part_size;
            if is_binary && is_text && !bytes.is_char_boundary(end) {
                return Err(RuntimeError::MidCodepoint { index: end });
            }

            let removed_cps = if is_binary && is_text {
                bytes.index_for_offset(end) - cp_index
            } else {
                part_units
            };
            bytes.data_vec_mut().splice(dst_off..end, payload);
            if is_text {
                let len = bytes.len() - removed_cps + cps_total;
                bytes.set_text_len(len);
                if let Some(mark) = &mut bookmark {
                    if mark.index > cp_index {
                        *mark = Bookmark {
                            index: cp_index,
                            offset: dst_off,
                        };
                    }
                }
            }
        }
    }

    if let Some(mark) = bookmark {
        let len = bytes.len();
        if mark.index > len || len < bookmark_min_len {
            trace!(series = ?series, index = mark.index, len, "dropped string bookmark");
            bookmark = None;
        }
    }
    bytes.set_bookmark(bookmark);

    Ok(match verb {
        Verb::Append => 0,
        Verb::Insert | Verb::Change => index + units_total,
    })
}

/// Flat bytes for `src` as it should appear in the destination.
fn source_bytes(
    heap: &GcHeap,
    dst_series: GcHandle,
    dst_is_binary: bool,
    src: &Value,
) -> Result<Vec<u8>> {
    match src {
        Value::Nulled => Ok(Vec::new()),
        Value::Char(c) => {
            let mut encoded = [0; 4];
            Ok(c.encode_utf8(&mut encoded).as_bytes().to_vec())
        }
        Value::Integer(i) if dst_is_binary => {
            let byte = u8::try_from(*i).map_err(|_| RuntimeError::ByteOutOfRange { value: *i })?;
            Ok(vec![byte])
        }
        Value::Binary(at) => {
            let bin = heap.bytes(at.series);
            if bin.is_text() && at.index < bin.size() && !bin.is_char_boundary(at.index) {
                return Err(RuntimeError::MidCodepoint { index: at.index });
            }
            Ok(bin.data().get(at.index..).unwrap_or(&[]).to_vec())
        }
        Value::Array(ArrayKind::Block, at) => {
            if dst_is_binary {
                return join_binary(heap, *at);
            }
            let mut mold = Mold::new(heap);
            for cell in heap.array(at.series).cells_at(at.index) {
                mold.form_value(&cell.value);
            }
            Ok(mold.finish().into_bytes())
        }
        Value::String(kind, at) if *kind != StringKind::Tag && at.series != dst_series => {
            let text = heap.bytes(at.series);
            Ok(text.data()[text.seek(at.index)..].to_vec())
        }
        other => {
            let mut mold = Mold::new(heap);
            mold.form_value(other);
            Ok(mold.finish().into_bytes())
        }
    }
}

/// Byte size of the first `count` codepoints of UTF-8 `data`.
fn codepoint_prefix_size(data: &[u8], count: usize) -> usize {
    let mut seen = 0;
    for (offset, byte) in data.iter().enumerate() {
        if byte & 0xC0 != 0x80 {
            if seen == count {
                return offset;
            }
            seen += 1;
        }
    }
    data.len()
}
