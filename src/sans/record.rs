//! Framed records of the Genius profile stream.
//!
//! Each record is laid out as a big-endian type tag, a payload, a
//! little-endian CRC-16/CCITT over the payload, and a repeat of the type tag.
//! Record sizes are fixed per kind.

use thiserror::Error;

use super::{bytes, check::compute_crc};

/// Bytes taken by the leading type tag.
pub const MARKER: usize = 4;

/// The kinds of record found in a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Dive start (`DSTR`).
    DiveStart,
    /// Tissue loading (`TISS`).
    Tissue,
    /// Sample (`DPRS`).
    Sample,
    /// Air integration (`AIRS`).
    AirIntegration,
    /// Dive end (`DEND`).
    DiveEnd,
}

impl RecordKind {
    /// The type tag, as read big-endian from the first four bytes.
    pub const fn tag(self) -> u32 {
        match self {
            Self::DiveStart => 0x4453_5452,
            Self::Tissue => 0x5449_5353,
            Self::Sample => 0x4450_5253,
            Self::AirIntegration => 0x4149_5253,
            Self::DiveEnd => 0x4445_4E44,
        }
    }

    /// The total size of the record, including framing.
    pub const fn size(self) -> usize {
        match self {
            Self::DiveStart => 58,
            Self::Tissue => 138,
            Self::Sample => 34,
            Self::AirIntegration => 16,
            Self::DiveEnd => 162,
        }
    }
}

/// An error validating a framed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecordError {
    /// The record runs past the end of the data.
    #[error("{kind:?} record at offset {offset} is truncated.")]
    Truncated { kind: RecordKind, offset: usize },
    /// Leading or trailing type tag is wrong.
    #[error("{kind:?} record at offset {offset} has tags {head:#010X}/{tail:#010X}.")]
    Tag {
        kind: RecordKind,
        offset: usize,
        head: u32,
        tail: u32,
    },
    /// Calculated and found CRC values do not match.
    #[error(
        "{kind:?} record at offset {offset}: calculated ({calculated:#06X}) and found ({found:#06X}) CRC values do not match."
    )]
    CyclicRedundancyCheck {
        kind: RecordKind,
        offset: usize,
        found: u16,
        calculated: u16,
    },
}

/// Validate the record of a given kind starting at an offset in a slice.
///
/// Returns the whole record, framing included.
pub fn validate(r: &[u8], offset: usize, kind: RecordKind) -> Result<&[u8], RecordError> {
    let size = kind.size();

    let record = offset
        .checked_add(size)
        .and_then(|end| r.get(offset..end))
        .ok_or(RecordError::Truncated { kind, offset })?;

    let truncated = |_| RecordError::Truncated { kind, offset };
    let head = bytes::u32_be(record, 0).map_err(truncated)?;
    let tail = bytes::u32_be(record, size - 4).map_err(truncated)?;

    if head != kind.tag() || tail != kind.tag() {
        Err(RecordError::Tag {
            kind,
            offset,
            head,
            tail,
        })?;
    }

    let found = bytes::u16_le(record, size - 6).map_err(truncated)?;
    let calculated = compute_crc(0, &record[MARKER..size - 6]);

    if found != calculated {
        Err(RecordError::CyclicRedundancyCheck {
            kind,
            offset,
            found,
            calculated,
        })?;
    }

    log::trace!("Valid {kind:?} record at offset {offset}.");

    Ok(record)
}
