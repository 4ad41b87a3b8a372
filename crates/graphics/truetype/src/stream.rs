//! Bounds-checked big-endian reads over font data.

use crate::{Error, Result};

/// A cursor over a byte slice.
///
/// Every read is checked against the end of the slice, running out of data
/// produces [Error::TruncatedFile] instead of a panic.
#[derive(Clone, Copy, Debug)]
pub struct Stream<'a> {
    bytes: &'a [u8],
    ptr: usize,
}

impl<'a> Stream<'a> {
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, ptr: 0 }
    }

    /// Create a stream that starts reading at `offset`
    #[must_use]
    pub fn new_at(bytes: &'a [u8], offset: usize) -> Self {
        Self { bytes, ptr: offset }
    }

    pub fn read<T: Readable>(&mut self) -> Result<T> {
        let value = read_at(self.bytes, self.ptr)?;
        self.ptr += T::SIZE;
        Ok(value)
    }

    pub fn read_bytes(&mut self, num_bytes: usize) -> Result<&'a [u8]> {
        let bytes = slice_at(self.bytes, self.ptr, num_bytes)?;
        self.ptr += num_bytes;
        Ok(bytes)
    }

    pub fn skip_bytes(&mut self, num_bytes: usize) -> Result<()> {
        let target = self.ptr + num_bytes;
        if self.bytes.len() < target {
            return Err(Error::TruncatedFile { offset: self.ptr });
        }
        self.ptr = target;
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn offset(&self) -> usize {
        self.ptr
    }

    #[inline]
    #[must_use]
    pub fn is_at_end(&self) -> bool {
        self.bytes.len() <= self.ptr
    }
}

/// Trait for things that can be read from a byte stream
pub trait Readable: Sized {
    const SIZE: usize = std::mem::size_of::<Self>();

    /// Decode `Self` from the first [Self::SIZE] bytes of `bytes`.
    ///
    /// Callers guarantee that `bytes` is exactly [Self::SIZE] bytes long.
    fn from_be_slice(bytes: &[u8]) -> Self;
}

macro_rules! impl_readable {
    ($($t: ty),*) => {
        $(
            impl Readable for $t {
                fn from_be_slice(bytes: &[u8]) -> Self {
                    let mut buffer = [0; std::mem::size_of::<$t>()];
                    buffer.copy_from_slice(bytes);
                    <$t>::from_be_bytes(buffer)
                }
            }
        )*
    };
}

impl_readable!(u8, i8, u16, i16, u32, i32);

/// Read a `T` at `offset` without moving a cursor around
pub fn read_at<T: Readable>(data: &[u8], offset: usize) -> Result<T> {
    slice_at(data, offset, T::SIZE).map(T::from_be_slice)
}

/// Borrow `length` bytes starting at `offset`
pub fn slice_at(data: &[u8], offset: usize, length: usize) -> Result<&[u8]> {
    offset
        .checked_add(length)
        .and_then(|end| data.get(offset..end))
        .ok_or(Error::TruncatedFile { offset })
}

#[inline]
pub fn read_u16_at(data: &[u8], offset: usize) -> Result<u16> {
    read_at(data, offset)
}

#[inline]
pub fn read_i16_at(data: &[u8], offset: usize) -> Result<i16> {
    read_at(data, offset)
}

#[inline]
pub fn read_u32_at(data: &[u8], offset: usize) -> Result<u32> {
    read_at(data, offset)
}
