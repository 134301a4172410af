use super::error::DecodeError;

/// Bounds-checked access to link-layer header fields.
pub struct FrameReader<'a> {
    frame: &'a [u8],
}

impl<'a> FrameReader<'a> {
    pub fn new(frame: &'a [u8]) -> Self {
        Self { frame }
    }

    pub fn require_len(&self, needed: usize) -> Result<(), DecodeError> {
        if self.frame.len() < needed {
            return Err(DecodeError::TooShort {
                needed,
                actual: self.frame.len(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8, DecodeError> {
        self.frame
            .get(offset)
            .copied()
            .ok_or(DecodeError::TooShort {
                needed: offset + 1,
                actual: self.frame.len(),
            })
    }

    pub fn read_u16_be(&self, range: std::ops::Range<usize>) -> Result<u16, DecodeError> {
        self.require_len(range.end)?;
        let bytes = &self.frame[range];
        if bytes.len() != 2 {
            return Err(DecodeError::TooShort {
                needed: 2,
                actual: bytes.len(),
            });
        }
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn rest(&self, offset: usize) -> Result<&'a [u8], DecodeError> {
        self.frame.get(offset..).ok_or(DecodeError::TooShort {
            needed: offset,
            actual: self.frame.len(),
        })
    }
}
