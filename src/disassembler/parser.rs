//! Low-level byte stream parser for CIL bytecode decoding.
//!
//! This module provides the [`Parser`] type, a cursor-based binary reader used by the
//! instruction decoder. It offers bounds-checked little-endian access to a raw bytecode
//! buffer; any read that would cross the end of the buffer is a fatal corruption error,
//! never a recoverable condition.
//!
//! # Usage
//!
//! ```rust
//! use cilshader::disassembler::Parser;
//!
//! let data = [0x01, 0x02, 0x03, 0x04];
//! let mut parser = Parser::new(&data);
//!
//! let value = parser.read_le::<u16>()?;
//! assert_eq!(value, 0x0201);
//! # Ok::<(), cilshader::Error>(())
//! ```

use crate::Result;

mod sealed {
    /// Primitive types the parser knows how to read little-endian.
    pub trait ReadLe: Sized {
        const SIZE: usize;
        fn from_le(bytes: &[u8]) -> Self;
    }

    macro_rules! impl_read_le {
        ($($ty:ty),*) => {
            $(impl ReadLe for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();
                fn from_le(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(buf)
                }
            })*
        };
    }

    impl_read_le!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);
}

pub(crate) use sealed::ReadLe;

/// A bounds-checked cursor over a method's raw bytecode.
///
/// `Parser` maintains a position within a byte slice and validates every read
/// against the buffer length. It is deliberately minimal: the instruction
/// decoder is its only consumer, and bytecode decoding needs nothing beyond
/// sequential little-endian reads and seeking.
///
/// # Examples
///
/// ```rust
/// use cilshader::disassembler::Parser;
///
/// let data = [0x2A]; // ret
/// let mut parser = Parser::new(&data);
/// assert!(parser.has_more_data());
/// let opcode = parser.read_le::<u8>()?;
/// assert_eq!(opcode, 0x2A);
/// assert!(!parser.has_more_data());
/// # Ok::<(), cilshader::Error>(())
/// ```
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`Parser`] from a byte slice.
    ///
    /// # Arguments
    /// * `data` - The byte slice to read from
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the current cursor position.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Returns `true` if there is more data available to parse.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Move the current position to the specified index.
    ///
    /// # Arguments
    /// * `pos` - The position to move the cursor to
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if position is beyond the data length.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos >= self.data.len() {
            return Err(crate::Error::OutOfBounds);
        }

        self.position = pos;
        Ok(())
    }

    /// Read a little-endian primitive at the current position and advance past it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the value would cross the end of
    /// the buffer. A truncated operand is a fatal corruption invariant violation.
    pub fn read_le<T: ReadLe>(&mut self) -> Result<T> {
        let end = self
            .position
            .checked_add(T::SIZE)
            .ok_or(crate::Error::OutOfBounds)?;
        if end > self.data.len() {
            return Err(crate::Error::OutOfBounds);
        }

        let value = T::from_le(&self.data[self.position..end]);
        self.position = end;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_le_sequential() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.read_le::<u32>().unwrap(), 0x04030201);
        assert_eq!(parser.pos(), 4);
        assert_eq!(parser.read_le::<u16>().unwrap(), 0x0605);
    }

    #[test]
    fn read_le_signed() {
        let data = [0xFF];
        let mut parser = Parser::new(&data);
        assert_eq!(parser.read_le::<i8>().unwrap(), -1);
    }

    #[test]
    fn read_le_float() {
        let data = 1.5f32.to_le_bytes();
        let mut parser = Parser::new(&data);
        assert_eq!(parser.read_le::<f32>().unwrap(), 1.5);
    }

    #[test]
    fn read_past_end_fails() {
        let data = [0x01, 0x02];
        let mut parser = Parser::new(&data);
        assert!(parser.read_le::<u32>().is_err());
    }

    #[test]
    fn seek_and_bounds() {
        let data = [0x01, 0x02, 0x03, 0x04];
        let mut parser = Parser::new(&data);

        parser.seek(2).unwrap();
        assert_eq!(parser.read_le::<u8>().unwrap(), 0x03);
        assert!(parser.seek(10).is_err());
    }

    #[test]
    fn empty_parser() {
        let data = [];
        let parser = Parser::new(&data);
        assert!(parser.is_empty());
        assert!(!parser.has_more_data());
    }
}
