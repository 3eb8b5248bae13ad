use tracing::trace;

use crate::runtime::{
    error::{Result, RuntimeError},
    gc::{GcHandle, GcHeap},
    modify::{ModifyFlags, Verb, natural_index},
    series::ArrayFlags,
    stats,
    value::{Cell, Value},
};

/// Inserts, appends or changes `src` into the array `dst` at `index`.
///
/// With [`ModifyFlags::SPLICE`] the elements of the array `src` are spliced
/// in, otherwise `src` goes in as a single element. `part` is the number of
/// source elements to take for INSERT/APPEND with [`ModifyFlags::PART`], and
/// the number of destination elements replaced for CHANGE with it; without
/// it CHANGE overwrites as many elements as it inserts. The material is
/// repeated `dups` times.
///
/// A null source is a no-op, except for CHANGE where it deletes the
/// replaced span. So is a non-positive `dups`.
#[allow(clippy::too_many_arguments)]
pub fn modify_array(
    heap: &mut GcHeap,
    verb: Verb,
    dst: GcHandle,
    index: usize,
    src: &Value,
    flags: ModifyFlags,
    part: usize,
    dups: i64,
) -> Result<usize> {
    if heap.array(dst).is_read_only() {
        return Err(RuntimeError::ReadOnly);
    }

    let deleting = src.is_nulled() && verb == Verb::Change;
    if (src.is_nulled() && !deleting) || dups <= 0 {
        return Ok(natural_index(verb, index));
    }
    let dups = usize::try_from(dups).unwrap_or(0);

    let tail = heap.array(dst).len();
    let mut index = if verb == Verb::Append || index > tail {
        tail
    } else {
        index
    };

    let mut tail_newline = flags.contains(ModifyFlags::LINE);
    let source: Vec<Cell> = if deleting {
        Vec::new()
    } else if flags.contains(ModifyFlags::SPLICE) {
        let at = match src {
            Value::Quoted { cell, .. } => cell.as_array(),
            other => other.as_array(),
        };
        let Some(at) = at else {
            panic!("splice source must be an array, got {}", src.kind());
        };

        let array = heap.array(at.series);
        let available = array.cells_at(at.index);
        let ilen = if verb != Verb::Change && flags.contains(ModifyFlags::PART) {
            part.min(available.len())
        } else {
            available.len()
        };

        if !tail_newline {
            tail_newline = match available.get(ilen) {
                None => array.has_flag(ArrayFlags::NEWLINE_AT_TAIL),
                Some(_) if ilen == 0 => false,
                Some(cell) => cell.newline_before(),
            };
        }

        if at.series == dst {
            stats::record_self_splice();
            trace!(series = ?dst, len = ilen, "splicing array into itself, copying source");
        }
        available[..ilen].to_vec()
    } else {
        vec![Cell::new(src.clone())]
    };

    let ilen = source.len();
    let size = dups * ilen;
    let head_newline = index == tail && heap.array(dst).has_flag(ArrayFlags::NEWLINE_AT_TAIL);

    let array = heap.array_mut(dst);
    match verb {
        Verb::Insert | Verb::Append => array.expand_at(index, size),
        Verb::Change => {
            let part = if flags.contains(ModifyFlags::PART) {
                part
            } else {
                size
            };
            let part = part.min(tail - index);
            if size > part {
                array.expand_at(index + part, size - part);
            } else if size < part && flags.contains(ModifyFlags::PART) {
                array.remove_at(index + size, part - size);
            }
        }
    }

    let result = match verb {
        Verb::Append => 0,
        Verb::Insert | Verb::Change => index + size,
    };

    let mut carried_tail_newline = false;
    let cells = array.cells_mut();
    for dup in 0..dups {
        for (i, cell) in source.iter().enumerate() {
            cells[index] = cell.clone();
            if dup == 0 && i == 0 && head_newline {
                cells[index].set_newline_before(true);
                carried_tail_newline = true;
            } else if dup > 0 && i == 0 && tail_newline {
                cells[index].set_newline_before(true);
            }
            index += 1;
        }
    }

    // The tail flag moves onto the first inserted element once one exists.
    if carried_tail_newline {
        array.set_flag(ArrayFlags::NEWLINE_AT_TAIL, false);
    }

    // The loop marks the start of every copy but the first; the break after
    // the last copy lands on the following element or the array tail.
    if tail_newline {
        if index == array.len() {
            array.set_flag(ArrayFlags::NEWLINE_AT_TAIL, true);
        } else {
            array.cells_mut()[index].set_newline_before(true);
        }
    }

    if flags.contains(ModifyFlags::LINE) {
        if let Some(head) = array.cells_mut().first_mut() {
            head.set_newline_before(true);
        }
    }

    Ok(result)
}
