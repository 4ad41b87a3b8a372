//! [Control Value Table](https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6cvt.html) implementation

use crate::{stream::read_i16_at, Error, Result};

/// A list of `FWord` distances referenced by the hinting instructions
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CvtTable {
    values: Vec<i16>,
}

impl CvtTable {
    pub fn new(data: &[u8]) -> Result<Self> {
        if data.len() % 2 != 0 {
            return Err(Error::MalformedHeader("cvt table has an odd length"));
        }

        let values = (0..data.len() / 2)
            .map(|index| read_i16_at(data, index * 2))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { values })
    }

    #[inline]
    #[must_use]
    pub fn values(&self) -> &[i16] {
        &self.values
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
