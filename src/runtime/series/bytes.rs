/// Cached position in UTF-8 storage: codepoint `index` starts at byte
/// `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bookmark {
    pub index: usize,
    pub offset: usize,
}

/// Present on storage that is valid UTF-8 and may be viewed as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextInfo {
    /// Length in codepoints.
    pub len: usize,
    pub bookmark: Option<Bookmark>,
}

/// Byte storage shared by BINARY! and ANY-STRING! values.
///
/// A BINARY! may alias storage that also backs a string. Once `text` is
/// present every mutation must keep the bytes valid UTF-8 and keep the
/// codepoint length in step with the byte size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bytes {
    data: Vec<u8>,
    text: Option<TextInfo>,
    read_only: bool,
}

/// Width of the UTF-8 sequence introduced by `lead`.
#[inline]
pub fn utf8_width(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        _ => 4,
    }
}

#[inline]
pub fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

impl Bytes {
    pub fn binary(data: Vec<u8>) -> Self {
        Self {
            data,
            text: None,
            read_only: false,
        }
    }

    pub fn text(s: &str) -> Self {
        Self {
            data: s.as_bytes().to_vec(),
            text: Some(TextInfo {
                len: s.chars().count(),
                bookmark: None,
            }),
            read_only: false,
        }
    }

    pub fn is_text(&self) -> bool {
        self.text.is_some()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Codepoint length for text storage, byte size otherwise.
    pub fn len(&self) -> usize {
        match &self.text {
            Some(info) => info.len,
            None => self.data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_str(&self) -> Option<&str> {
        self.text?;
        std::str::from_utf8(&self.data).ok()
    }

    pub fn bookmark(&self) -> Option<Bookmark> {
        self.text.and_then(|info| info.bookmark)
    }

    pub fn set_bookmark(&mut self, bookmark: Option<Bookmark>) {
        if let Some(info) = &mut self.text {
            info.bookmark = bookmark;
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn set_read_only(&mut self, on: bool) {
        self.read_only = on;
    }

    pub fn is_char_boundary(&self, offset: usize) -> bool {
        match self.data.get(offset) {
            Some(byte) => !is_continuation(*byte),
            None => offset == self.data.len(),
        }
    }

    /// Byte offset of codepoint `index`, walking from the bookmark when it
    /// lies at or before `index`. Does not update the bookmark.
    pub fn seek(&self, index: usize) -> usize {
        let Some(info) = &self.text else {
            return index.min(self.data.len());
        };
        if index >= info.len {
            return self.data.len();
        }

        let (mut at, mut offset) = match info.bookmark {
            Some(mark) if mark.index <= index => (mark.index, mark.offset),
            _ => (0, 0),
        };
        while at < index {
            offset += utf8_width(self.data[offset]);
            at += 1;
        }
        offset
    }

    /// Like [`Self::seek`], but remembers the answer as the bookmark when the
    /// text is at least `bookmark_min_len` codepoints long.
    pub fn offset_for_index(&mut self, index: usize, bookmark_min_len: usize) -> usize {
        let offset = self.seek(index);
        if let Some(info) = &mut self.text {
            if info.len >= bookmark_min_len && index < info.len {
                info.bookmark = Some(Bookmark { index, offset });
            }
        }
        offset
    }

    /// Number of codepoints that start within `data[..offset]`.
    pub fn index_for_offset(&self, offset: usize) -> usize {
        let end = offset.min(self.data.len());
        self.data[..end].iter().filter(|b| !is_continuation(**b)).count()
    }

    /// Byte size of the `count` codepoints starting at byte `offset`,
    /// clamped to the tail.
    pub fn size_of_codepoints(&self, offset: usize, count: usize) -> usize {
        let mut end = offset;
        let mut seen = 0;
        while seen < count && end < self.data.len() {
            end += utf8_width(self.data[end]);
            seen += 1;
        }
        end.min(self.data.len()) - offset
    }

    pub(crate) fn data_vec_mut(&mut self) -> &mut Vec<u8> {
        &mut self.data
    }

    pub(crate) fn set_text_len(&mut self, len: usize) {
        if let Some(info) = &mut self.text {
            info.len = len;
        }
    }
}
