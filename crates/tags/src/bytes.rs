//! Bounds-checked cursor and writer helpers for the length-prefixed payloads.
//!
//! Comment payloads use little-endian `u32` lengths, picture payloads use
//! big-endian ones; both share the same cursor.

use crate::error::{Result, TagError};

/// Byte order of the `u32` fields in a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Endian {
    Little,
    Big,
}

/// Read cursor over a borrowed payload.
pub(crate) struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
    endian: Endian,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(buf: &'a [u8], endian: Endian) -> Self {
        Self {
            buf,
            pos: 0,
            endian,
        }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    /// Take exactly `len` bytes or fail with [`TagError::TruncatedInput`].
    pub(crate) fn take(&mut self, len: usize, what: &'static str) -> Result<&'a [u8]> {
        let truncated = || TagError::TruncatedInput {
            what,
            needed: len,
            remaining: self.remaining(),
        };
        let end = self.pos.checked_add(len).ok_or_else(truncated)?;
        let slice = self.buf.get(self.pos..end).ok_or_else(truncated)?;
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn u32(&mut self, what: &'static str) -> Result<u32> {
        let raw: [u8; 4] = self
            .take(4, what)?
            .try_into()
            .map_err(|_| TagError::TruncatedInput {
                what,
                needed: 4,
                remaining: 0,
            })?;
        Ok(match self.endian {
            Endian::Little => u32::from_le_bytes(raw),
            Endian::Big => u32::from_be_bytes(raw),
        })
    }

    /// A `u32` length followed by that many bytes.
    pub(crate) fn prefixed(&mut self, what: &'static str) -> Result<&'a [u8]> {
        let len = self.u32(what)?;
        self.take(len as usize, what)
    }

    /// A length-prefixed UTF-8 string.
    pub(crate) fn text(&mut self, what: &'static str) -> Result<String> {
        let raw = self.prefixed(what)?;
        String::from_utf8(raw.to_vec()).map_err(|_| TagError::InvalidText { field: what })
    }
}

/// Convert a length to its `u32` prefix, rejecting anything that would truncate.
pub(crate) fn length_prefix(len: usize, field: &'static str) -> Result<u32> {
    u32::try_from(len).map_err(|_| TagError::LengthOverflow { field, len })
}

/// Append `value` in the given byte order.
pub(crate) fn put_u32(out: &mut Vec<u8>, value: u32, endian: Endian) {
    match endian {
        Endian::Little => out.extend_from_slice(&value.to_le_bytes()),
        Endian::Big => out.extend_from_slice(&value.to_be_bytes()),
    }
}

/// Append a `u32` length prefix followed by the raw bytes.
pub(crate) fn put_prefixed(
    out: &mut Vec<u8>,
    bytes: &[u8],
    endian: Endian,
    field: &'static str,
) -> Result<()> {
    put_u32(out, length_prefix(bytes.len(), field)?, endian);
    out.extend_from_slice(bytes);
    Ok(())
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn cursor_reads_both_byte_orders() {
        let bytes = [0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02];
        let mut le = Cursor::new(&bytes, Endian::Little);
        assert_eq!(le.u32("a").unwrap(), 1);
        let mut be = Cursor::new(&bytes[4..], Endian::Big);
        assert_eq!(be.u32("b").unwrap(), 2);
    }

    #[test]
    fn take_past_end_is_truncated() {
        let bytes = [0u8; 3];
        let mut c = Cursor::new(&bytes, Endian::Little);
        match c.take(5, "field") {
            Err(TagError::TruncatedInput {
                what,
                needed,
                remaining,
            }) => {
                assert_eq!(what, "field");
                assert_eq!(needed, 5);
                assert_eq!(remaining, 3);
            }
            other => panic!("expected TruncatedInput, got {other:?}"),
        }
    }

    #[test]
    fn prefixed_rejects_length_beyond_payload() {
        let mut bytes = vec![];
        put_u32(&mut bytes, 10, Endian::Big);
        bytes.extend_from_slice(b"short");
        let mut c = Cursor::new(&bytes, Endian::Big);
        assert!(matches!(
            c.prefixed("data"),
            Err(TagError::TruncatedInput { needed: 10, .. })
        ));
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let mut bytes = vec![];
        put_prefixed(&mut bytes, &[0xFF, 0xFE], Endian::Little, "vendor").unwrap();
        let mut c = Cursor::new(&bytes, Endian::Little);
        assert!(matches!(
            c.text("vendor"),
            Err(TagError::InvalidText { field: "vendor" })
        ));
    }
}
