// Copyright 2021-2026 Colin Finck <colin@reactos.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use core::ops::Range;

use thiserror::Error;

use crate::attribute::{NtfsAttributeType, NtfsAttributeTypeCode};
use crate::types::{Lcn, Vcn};

/// Central result type of ntfs-mft.
pub type Result<T, E = NtfsError> = core::result::Result<T, E>;

/// Coarse classification of an [`NtfsError`].
///
/// The kind tells how far the damage reaches:
///
/// * [`OutOfBounds`](Self::OutOfBounds) aborts the structure that was being decoded.
/// * [`MalformedHeader`](Self::MalformedHeader) aborts the entire record.
/// * [`MalformedAttribute`](Self::MalformedAttribute) ends the attribute stream, previously decoded
///   attributes stay usable.
/// * [`FixupMismatch`](Self::FixupMismatch) is an integrity warning, only fatal under
///   [`NtfsFixupPolicy::Strict`](crate::NtfsFixupPolicy::Strict).
/// * [`UnsupportedForm`](Self::UnsupportedForm) is fatal for a single attribute only.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum NtfsErrorKind {
    OutOfBounds,
    MalformedHeader,
    MalformedAttribute,
    FixupMismatch,
    UnsupportedForm,
}

/// Central error type of ntfs-mft.
///
/// All positions are absolute byte positions, based on the `position` passed to the decoder.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum NtfsError {
    #[error("The {length} bytes at byte position {position:#06x} exceed the buffer size of {size} bytes")]
    OutOfBounds {
        position: usize,
        length: usize,
        size: usize,
    },
    #[error("The NTFS Attribute at byte position {position:#06x} should have type {expected}, but it actually has type {actual:?}")]
    AttributeOfDifferentType {
        position: usize,
        expected: NtfsAttributeType,
        actual: NtfsAttributeTypeCode,
    },
    #[error("The NTFS Attribute at byte position {position:#06x} has a length of {actual} bytes, which is not a positive multiple of 8")]
    InvalidAttributeLength { position: usize, actual: u32 },
    #[error("The NTFS Attribute at byte position {position:#06x} has a length of {actual} bytes, but only {remaining} bytes of the record are in use")]
    AttributeExceedsUsedSize {
        position: usize,
        actual: u32,
        remaining: usize,
    },
    #[error("The NTFS Attribute List entry at byte position {position:#06x} has a length of {actual} bytes, which is either smaller than its header or larger than the remaining {remaining} bytes")]
    InvalidAttributeListEntryLength {
        position: usize,
        actual: u16,
        remaining: usize,
    },
    #[error("The NTFS Attribute at byte position {position:#06x} indicates a name in the range {range:?}, but the attribute only has a size of {size} bytes")]
    InvalidAttributeNameRange {
        position: usize,
        range: Range<usize>,
        size: u32,
    },
    #[error("The NTFS Data Run header at byte position {position:#06x} indicates a byte count of {actual}, but {expected} is the limit")]
    InvalidByteCountInDataRunHeader {
        position: usize,
        expected: u8,
        actual: u8,
    },
    #[error("The NTFS File Record at byte position {position:#06x} has signature {actual:?}, which is not a valid File Record signature")]
    InvalidFileSignature { position: usize, actual: [u8; 4] },
    #[error("The NTFS File Record at byte position {position:#06x} indicates a total size of {total_size} bytes, but the buffer only has {buffer_size} bytes")]
    InvalidFileTotalSize {
        position: usize,
        total_size: u32,
        buffer_size: usize,
    },
    #[error("The NTFS File Record at byte position {position:#06x} indicates a used size of {used_size} bytes, but its total size is only {total_size} bytes")]
    InvalidFileUsedSize {
        position: usize,
        used_size: u32,
        total_size: u32,
    },
    #[error("The NTFS File Record at byte position {position:#06x} has its first attribute at offset {actual}, which is outside the range {expected:?}")]
    InvalidFirstAttributeOffset {
        position: usize,
        expected: Range<u32>,
        actual: u16,
    },
    #[error("The NTFS Index Record at byte position {position:#06x} indicates an allocated size of {actual} bytes, but the record only has a size of {expected} bytes")]
    InvalidIndexAllocatedSize {
        position: usize,
        expected: usize,
        actual: usize,
    },
    #[error("The NTFS Index Entry at byte position {position:#06x} reports a size of {actual} bytes, but at least {expected} bytes are required")]
    InvalidIndexEntrySize {
        position: usize,
        expected: usize,
        actual: u16,
    },
    #[error("The NTFS Index Entry at byte position {position:#06x} reports a size of {actual} bytes, but only {remaining} bytes of the index node are left")]
    IndexEntryExceedsNode {
        position: usize,
        actual: u16,
        remaining: usize,
    },
    #[error("The NTFS Index Entry at byte position {position:#06x} indicates a key of {key_length} bytes, but the entry only has a size of {entry_length} bytes")]
    InvalidIndexEntryKeyLength {
        position: usize,
        key_length: u16,
        entry_length: u16,
    },
    #[error("The NTFS Index Node at byte position {position:#06x} indicates that its entries start at offset {entries_offset}, which is either inside its header or beyond its used size of {used_size} bytes")]
    InvalidIndexEntriesOffset {
        position: usize,
        entries_offset: u32,
        used_size: u32,
    },
    #[error("The NTFS Index Record at byte position {position:#06x} has signature {actual:?}, but it should be \"INDX\"")]
    InvalidIndexSignature { position: usize, actual: [u8; 4] },
    #[error("The NTFS Index Node at byte position {position:#06x} indicates a used size of {actual} bytes, but only {expected} bytes are allocated")]
    InvalidIndexUsedSize {
        position: usize,
        expected: usize,
        actual: usize,
    },
    #[error("The resident NTFS Attribute at byte position {position:#06x} indicates a value in the range {range:?}, but the attribute only has a size of {size} bytes")]
    InvalidResidentValueRange {
        position: usize,
        range: Range<usize>,
        size: u32,
    },
    #[error("The non-resident NTFS Attribute at byte position {position:#06x} indicates mapping pairs at offset {offset}, but the attribute only has a size of {size} bytes")]
    InvalidMappingPairsOffset {
        position: usize,
        offset: u16,
        size: u32,
    },
    #[error("The NTFS structured value at byte position {position:#06x} of type {ty:?} has {actual} bytes where {expected} bytes were expected")]
    InvalidStructuredValueSize {
        position: usize,
        ty: NtfsAttributeTypeCode,
        expected: usize,
        actual: usize,
    },
    #[error("The given time can't be represented as an NtfsTime")]
    InvalidTime,
    #[error("The Update Sequence Array of the record at byte position {position:#06x} has an invalid count of {update_sequence_count}")]
    InvalidUpdateSequenceCount {
        position: usize,
        update_sequence_count: u16,
    },
    #[error("The LCN {previous_lcn} cannot be moved by the VCN delta {vcn} read from the NTFS Data Run header at byte position {position:#06x}")]
    InvalidVcnInDataRunHeader {
        position: usize,
        vcn: Vcn,
        previous_lcn: Lcn,
    },
    #[error("The NTFS Attribute at byte position {position:#06x} has the form code {actual}, but only 0 (resident) and 1 (non-resident) are defined")]
    UnsupportedFormCode { position: usize, actual: u8 },
    #[error("The NTFS Attribute at byte position {position:#06x} should be resident, but it is non-resident")]
    UnexpectedNonResidentAttribute { position: usize },
    #[error("The Update Sequence Array of the record at byte position {position:#06x} protects {array_count} sectors of {sector_size} bytes, but the record is only {record_size} bytes long")]
    UpdateSequenceArrayExceedsRecordSize {
        position: usize,
        array_count: u16,
        sector_size: usize,
        record_size: usize,
    },
    #[error("Sector corruption: The 2 bytes at byte position {position:#06x} should match the Update Sequence Number {expected:?}, but they are {actual:?}")]
    UpdateSequenceNumberMismatch {
        position: usize,
        expected: [u8; 2],
        actual: [u8; 2],
    },
}

impl NtfsError {
    /// Returns the [`NtfsErrorKind`] this error belongs to.
    pub fn kind(&self) -> NtfsErrorKind {
        match self {
            Self::OutOfBounds { .. }
            | Self::InvalidAttributeNameRange { .. }
            | Self::InvalidResidentValueRange { .. }
            | Self::InvalidMappingPairsOffset { .. } => NtfsErrorKind::OutOfBounds,
            Self::InvalidFileSignature { .. }
            | Self::InvalidFileTotalSize { .. }
            | Self::InvalidFileUsedSize { .. }
            | Self::InvalidFirstAttributeOffset { .. }
            | Self::InvalidIndexAllocatedSize { .. }
            | Self::InvalidIndexEntriesOffset { .. }
            | Self::InvalidIndexSignature { .. }
            | Self::InvalidIndexUsedSize { .. }
            | Self::InvalidUpdateSequenceCount { .. }
            | Self::UpdateSequenceArrayExceedsRecordSize { .. } => NtfsErrorKind::MalformedHeader,
            Self::InvalidAttributeLength { .. }
            | Self::AttributeExceedsUsedSize { .. }
            | Self::InvalidAttributeListEntryLength { .. }
            | Self::InvalidIndexEntrySize { .. }
            | Self::IndexEntryExceedsNode { .. }
            | Self::InvalidIndexEntryKeyLength { .. } => NtfsErrorKind::MalformedAttribute,
            Self::UpdateSequenceNumberMismatch { .. } => NtfsErrorKind::FixupMismatch,
            Self::AttributeOfDifferentType { .. }
            | Self::InvalidByteCountInDataRunHeader { .. }
            | Self::InvalidStructuredValueSize { .. }
            | Self::InvalidTime
            | Self::InvalidVcnInDataRunHeader { .. }
            | Self::UnexpectedNonResidentAttribute { .. }
            | Self::UnsupportedFormCode { .. } => NtfsErrorKind::UnsupportedForm,
        }
    }

    /// Returns the byte position where the problem was detected, if the error has one.
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::InvalidTime => None,
            Self::OutOfBounds { position, .. }
            | Self::AttributeOfDifferentType { position, .. }
            | Self::InvalidAttributeLength { position, .. }
            | Self::AttributeExceedsUsedSize { position, .. }
            | Self::InvalidAttributeListEntryLength { position, .. }
            | Self::InvalidAttributeNameRange { position, .. }
            | Self::InvalidByteCountInDataRunHeader { position, .. }
            | Self::InvalidFileSignature { position, .. }
            | Self::InvalidFileTotalSize { position, .. }
            | Self::InvalidFileUsedSize { position, .. }
            | Self::InvalidFirstAttributeOffset { position, .. }
            | Self::InvalidIndexAllocatedSize { position, .. }
            | Self::InvalidIndexEntrySize { position, .. }
            | Self::IndexEntryExceedsNode { position, .. }
            | Self::InvalidIndexEntryKeyLength { position, .. }
            | Self::InvalidIndexEntriesOffset { position, .. }
            | Self::InvalidIndexSignature { position, .. }
            | Self::InvalidIndexUsedSize { position, .. }
            | Self::InvalidResidentValueRange { position, .. }
            | Self::InvalidMappingPairsOffset { position, .. }
            | Self::InvalidStructuredValueSize { position, .. }
            | Self::InvalidUpdateSequenceCount { position, .. }
            | Self::InvalidVcnInDataRunHeader { position, .. }
            | Self::UnexpectedNonResidentAttribute { position }
            | Self::UnsupportedFormCode { position, .. }
            | Self::UpdateSequenceArrayExceedsRecordSize { position, .. }
            | Self::UpdateSequenceNumberMismatch { position, .. } => Some(*position),
        }
    }
}
