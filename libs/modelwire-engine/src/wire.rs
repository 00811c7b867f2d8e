//! Binary protocol primitives.
//!
//! All integers are big-endian. Strings and collections carry a signed
//! 32-bit length or count prefix. A field header is a one-byte wire tag
//! followed by a two-byte id; a struct ends with a single STOP byte.

use bytes::{Buf, BufMut};
use modelwire_api::error::CodecError;
use modelwire_api::schema::{STOP, WireType};

use crate::config::Limits;

/// Bytes taken by a field header.
pub const FIELD_HEADER_LEN: usize = 3;
/// Bytes taken by a list header: element tag + count.
pub const LIST_HEADER_LEN: usize = 5;
/// Bytes taken by a map header: key tag + value tag + count.
pub const MAP_HEADER_LEN: usize = 6;

/// Convert a length to its wire prefix.
pub fn len_prefix(len: usize) -> Result<i32, CodecError> {
    i32::try_from(len).map_err(|_| CodecError::LengthOverflow(len))
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn write_field_header(&mut self, wire: WireType, id: u16) {
        self.buf.put_u8(wire.tag());
        self.buf.put_u16(id);
    }

    pub fn write_stop(&mut self) {
        self.buf.put_u8(STOP);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.buf.put_u8(u8::from(v));
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.put_i32(v);
    }

    pub fn write_i64(&mut self, v: i64) {
        self.buf.put_i64(v);
    }

    pub fn write_double(&mut self, v: f64) {
        self.buf.put_f64(v);
    }

    pub fn write_string(&mut self, v: &str) -> Result<(), CodecError> {
        self.buf.put_i32(len_prefix(v.len())?);
        self.buf.put_slice(v.as_bytes());
        Ok(())
    }

    pub fn write_list_header(&mut self, element: WireType, count: usize) -> Result<(), CodecError> {
        let count = len_prefix(count)?;
        self.buf.put_u8(element.tag());
        self.buf.put_i32(count);
        Ok(())
    }

    pub fn write_map_header(
        &mut self,
        key: WireType,
        value: WireType,
        count: usize,
    ) -> Result<(), CodecError> {
        let count = len_prefix(count)?;
        self.buf.put_u8(key.tag());
        self.buf.put_u8(value.tag());
        self.buf.put_i32(count);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Cursor over an encoded buffer.
///
/// Every read checks the remaining length first; a short buffer yields
/// [`CodecError::TruncatedBuffer`] and never a panic.
#[derive(Debug)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    limits: Limits,
    depth: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8], limits: Limits) -> Self {
        Self {
            buf,
            limits,
            depth: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn ensure(&self, needed: usize) -> Result<(), CodecError> {
        let remaining = self.buf.remaining();
        if remaining < needed {
            return Err(CodecError::TruncatedBuffer { needed, remaining });
        }
        Ok(())
    }

    /// Enter one nesting level (struct, list or map).
    pub fn enter(&mut self) -> Result<(), CodecError> {
        if self.depth >= self.limits.max_depth {
            return Err(CodecError::DepthExceeded {
                limit: self.limits.max_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_wire_type(&mut self) -> Result<WireType, CodecError> {
        let tag = self.read_u8()?;
        WireType::from_tag(tag).ok_or(CodecError::UnknownWireType(tag))
    }

    /// Next field header, or `None` at the struct's STOP byte.
    pub fn read_field_header(&mut self) -> Result<Option<(WireType, u16)>, CodecError> {
        let tag = self.read_u8()?;
        if tag == STOP {
            return Ok(None);
        }
        let wire = WireType::from_tag(tag).ok_or(CodecError::UnknownWireType(tag))?;
        self.ensure(2)?;
        Ok(Some((wire, self.buf.get_u16())))
    }

    pub fn read_bool(&mut self) -> Result<bool, CodecError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_i32(&mut self) -> Result<i32, CodecError> {
        self.ensure(4)?;
        Ok(self.buf.get_i32())
    }

    pub fn read_i64(&mut self) -> Result<i64, CodecError> {
        self.ensure(8)?;
        Ok(self.buf.get_i64())
    }

    pub fn read_double(&mut self) -> Result<f64, CodecError> {
        self.ensure(8)?;
        Ok(self.buf.get_f64())
    }

    /// Read a length or count prefix and check that `len * min_item` bytes
    /// can still follow. Nothing is allocated before this passes.
    fn read_len(&mut self, min_item: usize) -> Result<usize, CodecError> {
        let raw = self.read_i32()?;
        let len = usize::try_from(raw).map_err(|_| CodecError::NegativeLength(raw))?;
        if len > self.limits.max_collection_len {
            return Err(CodecError::LengthLimit {
                len,
                limit: self.limits.max_collection_len,
            });
        }
        self.ensure(len.saturating_mul(min_item))?;
        Ok(len)
    }

    pub fn read_string(&mut self) -> Result<String, CodecError> {
        let len = self.read_len(1)?;
        let bytes = self.buf[..len].to_vec();
        self.buf.advance(len);
        String::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)
    }

    pub fn skip_string(&mut self) -> Result<(), CodecError> {
        let len = self.read_len(1)?;
        self.buf.advance(len);
        Ok(())
    }

    pub fn skip(&mut self, n: usize) -> Result<(), CodecError> {
        self.ensure(n)?;
        self.buf.advance(n);
        Ok(())
    }

    /// Element type and count of a list.
    pub fn read_list_header(&mut self) -> Result<(WireType, usize), CodecError> {
        let element = self.read_wire_type()?;
        let count = self.read_len(element.min_payload_len())?;
        Ok((element, count))
    }

    /// Key type, value type and count of a map.
    pub fn read_map_header(&mut self) -> Result<(WireType, WireType, usize), CodecError> {
        let key = self.read_wire_type()?;
        let value = self.read_wire_type()?;
        let count = self.read_len(key.min_payload_len() + value.min_payload_len())?;
        Ok((key, value, count))
    }
}
