//! Bounds-checked integer extraction.

use thiserror::Error;

/// A read extending past the end of a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Reading {width} bytes at offset {offset} overruns a slice of {len} bytes.")]
pub struct OutOfBounds {
    pub offset: usize,
    pub width: usize,
    pub len: usize,
}

/// Take an exact number of bytes from an offset in a slice.
pub fn take<const N: usize>(r: &[u8], offset: usize) -> Result<[u8; N], OutOfBounds> {
    let error = OutOfBounds {
        offset,
        width: N,
        len: r.len(),
    };

    let end = offset.checked_add(N).ok_or(error)?;
    let bytes = r.get(offset..end).ok_or(error)?;

    // The range is exactly `N` bytes long.
    let mut buf = [0; N];
    buf.copy_from_slice(bytes);
    Ok(buf)
}

pub fn u8_at(r: &[u8], offset: usize) -> Result<u8, OutOfBounds> {
    take::<1>(r, offset).map(|[b]| b)
}

pub fn u16_le(r: &[u8], offset: usize) -> Result<u16, OutOfBounds> {
    take(r, offset).map(u16::from_le_bytes)
}

pub fn u16_be(r: &[u8], offset: usize) -> Result<u16, OutOfBounds> {
    take(r, offset).map(u16::from_be_bytes)
}

pub fn u32_le(r: &[u8], offset: usize) -> Result<u32, OutOfBounds> {
    take(r, offset).map(u32::from_le_bytes)
}

pub fn u32_be(r: &[u8], offset: usize) -> Result<u32, OutOfBounds> {
    take(r, offset).map(u32::from_be_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: [u8; 6] = [0x44, 0x50, 0x52, 0x53, 0x01, 0x02];

    #[test]
    fn reads_both_byte_orders() {
        assert_eq!(u32_be(&DATA, 0), Ok(0x4450_5253));
        assert_eq!(u32_le(&DATA, 0), Ok(0x5352_5044));
        assert_eq!(u16_le(&DATA, 4), Ok(0x0201));
        assert_eq!(u16_be(&DATA, 4), Ok(0x0102));
        assert_eq!(u8_at(&DATA, 5), Ok(0x02));
    }

    #[test]
    fn rejects_reads_past_the_end() {
        assert_eq!(
            u32_le(&DATA, 4),
            Err(OutOfBounds {
                offset: 4,
                width: 4,
                len: 6
            })
        );
        assert!(u16_le(&DATA, 5).is_err());
        assert!(u8_at(&DATA, 6).is_err());
        assert!(take::<2>(&DATA, usize::MAX).is_err());
    }
}
