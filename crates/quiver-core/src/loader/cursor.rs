//! Bounds-checked reads over a bulk payload blob.
//!
//! Every advance validates against the payload end and reports a decode
//! error naming the offset instead of reading past the slice. Integers
//! and doubles are read in native byte order; the producer and consumer
//! of a bulk payload share the machine.

use crate::error::{Error, Result};

/// Read cursor over one payload blob.
#[derive(Debug)]
pub(crate) struct Cursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Current position, for error reporting
    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    /// True once the whole blob has been consumed
    pub(crate) fn is_empty(&self) -> bool {
        self.offset >= self.data.len()
    }

    fn take(&mut self, size: usize) -> Result<&'a [u8]> {
        if self.data.len() - self.offset < size {
            return Err(Error::decode(format!(
                "read beyond payload end: offset={}, need={}, payload_size={}",
                self.offset,
                size,
                self.data.len()
            )));
        }
        let bytes = &self.data[self.offset..self.offset + size];
        self.offset += size;
        Ok(bytes)
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        let mut buf = [0u8; 4];
        buf.copy_from_slice(bytes);
        Ok(u32::from_ne_bytes(buf))
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64> {
        let bytes = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_ne_bytes(buf))
    }

    pub(crate) fn read_f64(&mut self) -> Result<f64> {
        let bytes = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(f64::from_ne_bytes(buf))
    }

    /// Read a NUL-terminated UTF-8 string, consuming the terminator.
    pub(crate) fn read_cstr(&mut self) -> Result<&'a str> {
        let start = self.offset;
        let rest = &self.data[self.offset.min(self.data.len())..];
        let Some(len) = rest.iter().position(|b| *b == 0) else {
            return Err(Error::decode(format!(
                "unterminated string at offset {start}"
            )));
        };
        let text = std::str::from_utf8(&rest[..len]).map_err(|_| {
            Error::decode(format!("invalid UTF-8 in string at offset {start}"))
        })?;
        self.offset += len + 1;
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_advance_in_order() -> Result<()> {
        let mut payload = Vec::new();
        payload.extend_from_slice(b"label\0");
        payload.extend_from_slice(&2u32.to_ne_bytes());
        payload.push(7);
        payload.extend_from_slice(&1.5f64.to_ne_bytes());
        payload.extend_from_slice(&99u64.to_ne_bytes());

        let mut cursor = Cursor::new(&payload);
        assert_eq!(cursor.read_cstr()?, "label");
        assert_eq!(cursor.read_u32()?, 2);
        assert_eq!(cursor.read_u8()?, 7);
        assert_eq!(cursor.read_f64()?, 1.5);
        assert_eq!(cursor.read_u64()?, 99);
        assert!(cursor.is_empty());
        Ok(())
    }

    #[test]
    fn test_truncated_read_names_offset() {
        let mut cursor = Cursor::new(&[1, 2]);
        let err = cursor.read_u32().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("offset=0"), "got: {msg}");
        assert!(msg.contains("payload_size=2"), "got: {msg}");
        // A failed read must not advance the cursor.
        assert_eq!(cursor.offset(), 0);
    }

    #[test]
    fn test_unterminated_string() {
        let mut cursor = Cursor::new(b"abc");
        let err = cursor.read_cstr().unwrap_err();
        assert!(err.to_string().contains("unterminated"));
    }

    #[test]
    fn test_invalid_utf8() {
        let mut cursor = Cursor::new(&[0xff, 0xfe, 0x00]);
        let err = cursor.read_cstr().unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn test_empty_string_is_valid() -> Result<()> {
        let mut cursor = Cursor::new(&[0x00, 0x41]);
        assert_eq!(cursor.read_cstr()?, "");
        assert_eq!(cursor.offset(), 1);
        Ok(())
    }
}
