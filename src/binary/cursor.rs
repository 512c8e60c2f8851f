//! Seekable big-endian reader over an immutable byte slice.
//!
//! A [`Cursor`] never owns or aliases a moving stream: it borrows a slice
//! (usually one item's [`ByteRange`] inside the package buffer) and keeps its
//! own position, so any number of cursors can read the same package
//! concurrently.

use byteorder::{BigEndian, ByteOrder};

use super::format::{STRING_REF_EMPTY, STRING_REF_NULL};
use crate::util::{Color, Error, Result};

/// An `(offset, len)` window into a package buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ByteRange {
    /// Absolute offset in the package buffer.
    pub offset: usize,
    /// Length in bytes.
    pub len: usize,
}

impl ByteRange {
    #[inline]
    pub const fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    /// One past the last byte.
    #[inline]
    pub const fn end(&self) -> usize {
        self.offset + self.len
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether two ranges share at least one byte.
    #[inline]
    pub fn overlaps(&self, other: &ByteRange) -> bool {
        !self.is_empty() && !other.is_empty()
            && self.offset < other.end() && other.offset < self.end()
    }

    /// Resolve this range against the buffer it points into.
    pub fn slice<'a>(&self, data: &'a [u8]) -> Result<&'a [u8]> {
        data.get(self.offset..self.end()).ok_or(Error::Truncated {
            pos: self.offset,
            needed: self.len,
            len: data.len(),
        })
    }
}

/// Big-endian cursor with string-table aware reads.
#[derive(Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    /// Absolute offset of `data[0]` in the package buffer.
    base: usize,
    pos: usize,
    strings: &'a [String],
    version: i32,
}

impl<'a> Cursor<'a> {
    /// Create a cursor over a whole buffer with no string table.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, base: 0, pos: 0, strings: &[], version: 0 }
    }

    /// Create a cursor over `range` of `package`.
    pub fn over(package: &'a [u8], range: ByteRange, strings: &'a [String], version: i32) -> Result<Self> {
        Ok(Self {
            data: range.slice(package)?,
            base: range.offset,
            pos: 0,
            strings,
            version,
        })
    }

    /// Attach a string table for string-ref reads.
    pub fn with_strings(mut self, strings: &'a [String]) -> Self {
        self.strings = strings;
        self
    }

    /// Set the format version used for version-gated fields.
    pub fn with_version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    #[inline]
    pub fn version(&self) -> i32 {
        self.version
    }

    /// Position relative to the start of this cursor's slice.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Absolute position in the package buffer.
    #[inline]
    pub fn abs_pos(&self) -> usize {
        self.base + self.pos
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Absolute range covering `start..end` of this cursor's slice.
    #[inline]
    pub fn range(&self, start: usize, end: usize) -> ByteRange {
        ByteRange::new(self.base + start, end.saturating_sub(start))
    }

    fn truncated(&self, needed: usize) -> Error {
        Error::Truncated { pos: self.abs_pos(), needed, len: self.base + self.data.len() }
    }

    /// Move to an absolute position within the slice.
    pub fn set_pos(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(Error::Truncated {
                pos: self.base + pos,
                needed: 0,
                len: self.base + self.data.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.take(count).map(|_| ())
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(count).ok_or_else(|| self.truncated(count))?;
        let bytes = self.data.get(self.pos..end).ok_or_else(|| self.truncated(count))?;
        self.pos = end;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? == 1)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(BigEndian::read_i16(self.take(2)?))
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(BigEndian::read_i32(self.take(4)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u32(self.take(4)?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(BigEndian::read_f32(self.take(4)?))
    }

    /// RGBA color, one byte per channel.
    pub fn read_color(&mut self) -> Result<Color> {
        let b = self.take(4)?;
        Ok(Color::rgba(b[0], b[1], b[2], b[3]))
    }

    /// UTF-16 code unit stored as u16.
    pub fn read_char(&mut self) -> Result<char> {
        let unit = self.read_u16()?;
        Ok(char::from_u32(unit as u32).unwrap_or(char::REPLACEMENT_CHARACTER))
    }

    /// u16 length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_u16()? as usize;
        self.read_string_len(len)
    }

    /// UTF-8 string of a known byte length.
    pub fn read_string_len(&mut self, len: usize) -> Result<String> {
        let bytes = self.take(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// String-table reference.
    pub fn read_s(&mut self) -> Result<Option<&'a str>> {
        let index = self.read_u16()?;
        match index {
            STRING_REF_NULL => Ok(None),
            STRING_REF_EMPTY => Ok(Some("")),
            i => self.strings
                .get(i as usize)
                .map(|s| Some(s.as_str()))
                .ok_or_else(|| Error::invalid(format!(
                    "string ref {} out of range (table size {})", i, self.strings.len()
                ))),
        }
    }

    /// String-table reference, owned.
    pub fn read_s_owned(&mut self) -> Result<Option<String>> {
        Ok(self.read_s()?.map(str::to_owned))
    }

    /// `count` consecutive string refs.
    pub fn read_s_array(&mut self, count: usize) -> Result<Vec<Option<String>>> {
        (0..count).map(|_| self.read_s_owned()).collect()
    }

    /// i32 length-prefixed sub-buffer, returned as an absolute range.
    pub fn read_buffer(&mut self) -> Result<ByteRange> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(Error::invalid(format!("negative buffer length {}", len)));
        }
        let start = self.pos;
        self.skip(len as usize)?;
        Ok(self.range(start, self.pos))
    }

    /// Cursor over `pos..end` of this slice, sharing strings and version.
    ///
    /// Ranges produced by the sub-cursor stay in this cursor's coordinates.
    pub fn sub_cursor(&self, end: usize) -> Result<Cursor<'a>> {
        let data = self.data
            .get(self.pos..end)
            .ok_or_else(|| self.truncated(end.saturating_sub(self.pos)))?;
        Ok(Cursor {
            data,
            base: self.base + self.pos,
            pos: 0,
            strings: self.strings,
            version: self.version,
        })
    }

    /// Read an i16 record prefix and return the position of the next record.
    pub fn record_end_i16(&mut self) -> Result<usize> {
        let len = self.read_i16()?;
        self.record_end(len as i64)
    }

    /// Read an i32 record prefix and return the position of the next record.
    pub fn record_end_i32(&mut self) -> Result<usize> {
        let len = self.read_i32()?;
        self.record_end(len as i64)
    }

    fn record_end(&self, len: i64) -> Result<usize> {
        let end = self.pos as i64 + len;
        if len < 0 || end as usize > self.data.len() {
            return Err(Error::Truncated {
                pos: self.abs_pos(),
                needed: len.max(0) as usize,
                len: self.base + self.data.len(),
            });
        }
        Ok(end as usize)
    }

    /// Position the cursor at section `index` of the index table at `table_pos`.
    ///
    /// Returns `Ok(false)` and leaves the position unchanged when the table
    /// has fewer sections or the section offset is zero.
    pub fn seek_section(&mut self, table_pos: usize, index: usize) -> Result<bool> {
        let saved = self.pos;
        self.set_pos(table_pos)?;
        let count = self.read_u8()? as usize;
        if index >= count {
            self.pos = saved;
            return Ok(false);
        }
        let use_short = self.read_u8()? == 1;
        let offset = if use_short {
            self.skip(2 * index)?;
            self.read_i16()? as i64
        } else {
            self.skip(4 * index)?;
            self.read_i32()? as i64
        };
        if offset > 0 {
            self.set_pos(table_pos + offset as usize)?;
            Ok(true)
        } else {
            self.pos = saved;
            Ok(false)
        }
    }

    /// Absolute range of section `index`, ending where the next section
    /// starts (or at the end of the slice). Leaves the position unchanged.
    pub fn section_range(&mut self, table_pos: usize, index: usize) -> Result<Option<ByteRange>> {
        let saved = self.pos;
        let result = self.read_section_offsets(table_pos);
        self.pos = saved;
        let offsets = result?;
        let start = match offsets.get(index) {
            Some(&o) if o > 0 => table_pos + o as usize,
            _ => return Ok(None),
        };
        let end = offsets
            .iter()
            .filter(|&&o| o > 0)
            .map(|&o| table_pos + o as usize)
            .filter(|&p| p > start)
            .min()
            .unwrap_or(self.data.len());
        if end > self.data.len() {
            return Err(self.truncated(end - start));
        }
        Ok(Some(self.range(start, end)))
    }

    fn read_section_offsets(&mut self, table_pos: usize) -> Result<Vec<i64>> {
        self.set_pos(table_pos)?;
        let count = self.read_u8()? as usize;
        if count == 0 {
            return Ok(Vec::new());
        }
        let use_short = self.read_u8()? == 1;
        (0..count)
            .map(|_| if use_short {
                self.read_i16().map(i64::from)
            } else {
                self.read_i32().map(i64::from)
            })
            .collect()
    }
}
