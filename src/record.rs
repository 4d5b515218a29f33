// Copyright 2021-2026 Colin Finck <colin@reactos.org>
// SPDX-License-Identifier: MIT OR Apache-2.0
//
//! Multi-sector header and Update Sequence Array ("fixup") handling shared by
//! File Records and Index Records.

use alloc::vec::Vec;
use core::mem;

use strum_macros::Display;
use zerocopy::{FromBytes, Immutable, KnownLayout, LittleEndian, Unaligned, U16};

use crate::codec::{read_struct, NtfsEnum, NtfsEnumValue};
use crate::error::{NtfsError, Result};

/// Every protected record is divided into sectors of this size, no matter what the actual
/// sector size of the underlying device is.
pub(crate) const NTFS_BLOCK_SIZE: usize = 512;

/// On-disk structure at the beginning of every File Record and Index Record.
#[derive(Clone, Copy, Debug, FromBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub(crate) struct MultiSectorHeader {
    pub(crate) signature: [u8; 4],
    /// Offset of the Update Sequence Number, in bytes from the beginning of the record.
    /// The Update Sequence Array follows right after it.
    pub(crate) update_sequence_offset: U16<LittleEndian>,
    /// Number of `u16` elements of the Update Sequence Number plus the Update Sequence Array.
    pub(crate) update_sequence_count: U16<LittleEndian>,
}

/// All known 4-byte signatures of NTFS multi-sector records.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum NtfsRecordSignature {
    /// "FILE", an MFT entry.
    File,
    /// "BAAD", a record that failed its multi-sector transfer check and was marked by `chkdsk`.
    Baad,
    /// "INDX", an index allocation node.
    Indx,
    /// "RSTR", a $LogFile restart page.
    Rstr,
    /// "RCRD", a $LogFile record page.
    Rcrd,
    /// "CHKD", a record modified by `chkdsk`.
    Chkd,
    /// "HOLE", a record of a sparse $LogFile region.
    Hole,
}

impl NtfsEnum for NtfsRecordSignature {
    type Raw = [u8; 4];

    fn from_raw(raw: [u8; 4]) -> Option<Self> {
        match &raw {
            b"FILE" => Some(Self::File),
            b"BAAD" => Some(Self::Baad),
            b"INDX" => Some(Self::Indx),
            b"RSTR" => Some(Self::Rstr),
            b"RCRD" => Some(Self::Rcrd),
            b"CHKD" => Some(Self::Chkd),
            b"HOLE" => Some(Self::Hole),
            _ => None,
        }
    }

    fn to_raw(self) -> [u8; 4] {
        let bytes = match self {
            Self::File => b"FILE",
            Self::Baad => b"BAAD",
            Self::Indx => b"INDX",
            Self::Rstr => b"RSTR",
            Self::Rcrd => b"RCRD",
            Self::Chkd => b"CHKD",
            Self::Hole => b"HOLE",
        };
        *bytes
    }
}

/// Decoded signature of a multi-sector record.
pub type NtfsRecordSignatureValue = NtfsEnumValue<NtfsRecordSignature, [u8; 4]>;

/// How to react when the last 2 bytes of a sector neither match the Update Sequence Number
/// nor the saved value from the Update Sequence Array.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum NtfsFixupPolicy {
    /// Leave the sector untouched, record an [`NtfsFixupMismatch`] in the [`NtfsFixupReport`]
    /// and continue decoding.
    #[default]
    Lenient,
    /// Fail with [`NtfsError::UpdateSequenceNumberMismatch`] before modifying any byte.
    Strict,
}

/// A sector whose fixup could not be verified.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct NtfsFixupMismatch {
    position: usize,
    update_sequence_number: [u8; 2],
    saved_value: [u8; 2],
    actual: [u8; 2],
}

impl NtfsFixupMismatch {
    /// Returns the 2 bytes found at the end of the sector.
    pub fn actual(&self) -> [u8; 2] {
        self.actual
    }

    /// Returns the position of the last 2 bytes of the affected sector.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns the value from the Update Sequence Array that should have replaced the
    /// Update Sequence Number.
    pub fn saved_value(&self) -> [u8; 2] {
        self.saved_value
    }

    /// Returns the Update Sequence Number that was expected at the end of the sector.
    pub fn update_sequence_number(&self) -> [u8; 2] {
        self.update_sequence_number
    }
}

impl From<&NtfsFixupMismatch> for NtfsError {
    fn from(mismatch: &NtfsFixupMismatch) -> Self {
        Self::UpdateSequenceNumberMismatch {
            position: mismatch.position,
            expected: mismatch.update_sequence_number,
            actual: mismatch.actual,
        }
    }
}

/// Outcome of applying the Update Sequence Array to a record.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NtfsFixupReport {
    sector_count: u16,
    applied_count: u16,
    already_applied_count: u16,
    mismatches: Vec<NtfsFixupMismatch>,
}

impl NtfsFixupReport {
    /// Returns the number of sectors whose last 2 bytes still held a restored value,
    /// meaning that the fixup had been applied before.
    pub fn already_applied_count(&self) -> u16 {
        self.already_applied_count
    }

    /// Returns the number of sectors whose last 2 bytes were restored during this fixup.
    pub fn applied_count(&self) -> u16 {
        self.applied_count
    }

    /// Returns `true` if every protected sector was either restored or found already restored.
    pub fn is_verified(&self) -> bool {
        self.mismatches.is_empty()
    }

    /// Returns all sectors that failed the check and were left untouched.
    pub fn mismatches(&self) -> &[NtfsFixupMismatch] {
        &self.mismatches
    }

    /// Returns the number of sectors protected by the Update Sequence Array.
    pub fn sector_count(&self) -> u16 {
        self.sector_count
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum SectorState {
    NeedsFixup,
    AlreadyApplied,
    Mismatch,
}

/// Validates and repairs the Update Sequence Array protection of a multi-sector record in place.
///
/// NTFS replaces the last 2 bytes of every 512-byte sector of a record by the Update Sequence
/// Number before writing it and saves the original bytes in the Update Sequence Array.
/// This function puts the saved bytes back wherever a sector still ends with the
/// Update Sequence Number.
/// Sectors that already end with their saved value are left alone, which makes applying the
/// fixup twice a no-op.
///
/// `position` is the absolute position of `data` and only used for error reporting.
pub fn apply_fixups(
    data: &mut [u8],
    position: usize,
    policy: NtfsFixupPolicy,
) -> Result<NtfsFixupReport> {
    let header = read_struct::<MultiSectorHeader>(data, 0, position)?;
    let update_sequence_offset = header.update_sequence_offset.get() as usize;
    let update_sequence_count = header.update_sequence_count.get();

    // Subtract the Update Sequence Number (USN) element, so that only the number of array elements remains.
    let array_count =
        update_sequence_count
            .checked_sub(1)
            .ok_or(NtfsError::InvalidUpdateSequenceCount {
                position,
                update_sequence_count,
            })?;

    let array_start = update_sequence_offset + mem::size_of::<u16>();
    let array_end = update_sequence_offset + update_sequence_count as usize * mem::size_of::<u16>();
    let sectors_end = array_count as usize * NTFS_BLOCK_SIZE;

    if array_end > data.len() || sectors_end > data.len() {
        return Err(NtfsError::UpdateSequenceArrayExceedsRecordSize {
            position,
            array_count,
            sector_size: NTFS_BLOCK_SIZE,
            record_size: data.len(),
        });
    }

    let update_sequence_number = [
        data[update_sequence_offset],
        data[update_sequence_offset + 1],
    ];

    let mut report = NtfsFixupReport {
        sector_count: array_count,
        ..Default::default()
    };
    let mut states = Vec::with_capacity(array_count as usize);

    // First pass: classify every sector without touching the data.
    for sector in 0..array_count as usize {
        let array_position = array_start + sector * mem::size_of::<u16>();
        let sector_position = (sector + 1) * NTFS_BLOCK_SIZE - mem::size_of::<u16>();

        let saved_value = [data[array_position], data[array_position + 1]];
        let actual = [data[sector_position], data[sector_position + 1]];

        let state = if actual == update_sequence_number {
            SectorState::NeedsFixup
        } else if actual == saved_value {
            SectorState::AlreadyApplied
        } else {
            let mismatch = NtfsFixupMismatch {
                position: position + sector_position,
                update_sequence_number,
                saved_value,
                actual,
            };

            if policy == NtfsFixupPolicy::Strict {
                return Err(NtfsError::from(&mismatch));
            }

            log::warn!(
                "Incomplete multi-sector transfer: sector {} of the record at {:#x} ends with {:02x?} instead of {:02x?}",
                sector,
                position,
                actual,
                update_sequence_number
            );
            report.mismatches.push(mismatch);
            SectorState::Mismatch
        };

        states.push(state);
    }

    // Second pass: perform the actual fixup.
    for (sector, state) in states.into_iter().enumerate() {
        match state {
            SectorState::NeedsFixup => {
                let array_position = array_start + sector * mem::size_of::<u16>();
                let sector_position = (sector + 1) * NTFS_BLOCK_SIZE - mem::size_of::<u16>();

                data[sector_position] = data[array_position];
                data[sector_position + 1] = data[array_position + 1];
                report.applied_count += 1;
            }
            SectorState::AlreadyApplied => report.already_applied_count += 1,
            SectorState::Mismatch => (),
        }
    }

    if report.sector_count > 0 && report.already_applied_count == report.sector_count {
        log::debug!("Fixup of the record at {:#x} had already been applied", position);
    }

    Ok(report)
}

/// Returns the signature of the multi-sector record in `data`.
pub(crate) fn read_signature(data: &[u8], position: usize) -> Result<[u8; 4]> {
    read_struct::<MultiSectorHeader>(data, 0, position).map(|header| header.signature)
}

/// A multi-sector record after its fixup has been applied.
#[derive(Clone, Debug)]
pub(crate) struct Record<'d> {
    data: &'d [u8],
    position: usize,
    fixup_report: NtfsFixupReport,
}

impl<'d> Record<'d> {
    /// Applies the fixup to `data` and freezes it.
    ///
    /// The signature must have been validated by the caller.
    pub(crate) fn new(data: &'d mut [u8], position: usize, policy: NtfsFixupPolicy) -> Result<Self> {
        let fixup_report = apply_fixups(data, position, policy)?;
        let data: &'d [u8] = data;

        Ok(Self {
            data,
            position,
            fixup_report,
        })
    }

    pub(crate) fn data(&self) -> &'d [u8] {
        self.data
    }

    pub(crate) fn fixup_report(&self) -> &NtfsFixupReport {
        &self.fixup_report
    }

    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }

    pub(crate) fn position(&self) -> usize {
        self.position
    }

    pub(crate) fn signature(&self) -> NtfsRecordSignatureValue {
        // `read_signature` has succeeded before the fixup, so the header is there.
        let signature = read_signature(self.data, self.position).unwrap_or_default();
        NtfsRecordSignatureValue::decode(signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    /// Builds a protected 1024-byte record with the Update Sequence Array at offset 0x30
    /// and the given Update Sequence Number.
    fn protected_record(update_sequence_number: [u8; 2]) -> Vec<u8> {
        let mut data = vec![0u8; 1024];
        data[..4].copy_from_slice(b"FILE");
        data[4..6].copy_from_slice(&0x30u16.to_le_bytes());
        data[6..8].copy_from_slice(&3u16.to_le_bytes());
        data[0x30..0x32].copy_from_slice(&update_sequence_number);

        // Original sector tails.
        data[510..512].copy_from_slice(&[0xaa, 0xbb]);
        data[1022..1024].copy_from_slice(&[0xcc, 0xdd]);

        // Save them and replace them by the Update Sequence Number.
        data[0x32..0x34].copy_from_slice(&[0xaa, 0xbb]);
        data[0x34..0x36].copy_from_slice(&[0xcc, 0xdd]);
        data[510..512].copy_from_slice(&update_sequence_number);
        data[1022..1024].copy_from_slice(&update_sequence_number);

        data
    }

    #[test]
    fn test_fixup() {
        let mut data = protected_record([0x07, 0x00]);
        let report = apply_fixups(&mut data, 0, NtfsFixupPolicy::Lenient).unwrap();

        assert_eq!(report.sector_count(), 2);
        assert_eq!(report.applied_count(), 2);
        assert_eq!(report.already_applied_count(), 0);
        assert!(report.is_verified());
        assert_eq!(&data[510..512], &[0xaa, 0xbb]);
        assert_eq!(&data[1022..1024], &[0xcc, 0xdd]);
    }

    #[test]
    fn test_fixup_idempotence() {
        let mut data = protected_record([0x07, 0x00]);
        apply_fixups(&mut data, 0, NtfsFixupPolicy::Lenient).unwrap();
        let fixed_up = data.clone();

        let report = apply_fixups(&mut data, 0, NtfsFixupPolicy::Strict).unwrap();
        assert_eq!(data, fixed_up);
        assert_eq!(report.applied_count(), 0);
        assert_eq!(report.already_applied_count(), 2);
        assert!(report.is_verified());
    }

    #[test]
    fn test_fixup_mismatch() {
        let mut data = protected_record([0x07, 0x00]);
        data[510..512].copy_from_slice(&[0x12, 0x34]);

        let mut strict_data = data.clone();
        let error = apply_fixups(&mut strict_data, 0x4000, NtfsFixupPolicy::Strict).unwrap_err();
        assert_eq!(
            error,
            NtfsError::UpdateSequenceNumberMismatch {
                position: 0x4000 + 510,
                expected: [0x07, 0x00],
                actual: [0x12, 0x34],
            }
        );
        assert_eq!(strict_data, data, "strict mode must not modify anything");

        let report = apply_fixups(&mut data, 0x4000, NtfsFixupPolicy::Lenient).unwrap();
        assert!(!report.is_verified());
        assert_eq!(report.applied_count(), 1);
        assert_eq!(report.mismatches().len(), 1);

        let mismatch = &report.mismatches()[0];
        assert_eq!(mismatch.position(), 0x4000 + 510);
        assert_eq!(mismatch.saved_value(), [0xaa, 0xbb]);
        assert_eq!(mismatch.actual(), [0x12, 0x34]);
        assert_eq!(&data[510..512], &[0x12, 0x34]);
        assert_eq!(&data[1022..1024], &[0xcc, 0xdd]);
    }

    #[test]
    fn test_invalid_update_sequence_array() {
        let mut data = protected_record([0x07, 0x00]);
        data[6..8].copy_from_slice(&0u16.to_le_bytes());
        assert!(matches!(
            apply_fixups(&mut data, 0, NtfsFixupPolicy::Lenient),
            Err(NtfsError::InvalidUpdateSequenceCount { .. })
        ));

        // 3 sectors don't fit into 1024 bytes.
        let mut data = protected_record([0x07, 0x00]);
        data[6..8].copy_from_slice(&4u16.to_le_bytes());
        assert_eq!(
            apply_fixups(&mut data, 0, NtfsFixupPolicy::Lenient),
            Err(NtfsError::UpdateSequenceArrayExceedsRecordSize {
                position: 0,
                array_count: 3,
                sector_size: NTFS_BLOCK_SIZE,
                record_size: 1024,
            })
        );

        let mut data = [0u8; 6];
        assert!(matches!(
            apply_fixups(&mut data, 0, NtfsFixupPolicy::Lenient),
            Err(NtfsError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_signature() {
        assert_eq!(
            NtfsRecordSignatureValue::decode(*b"INDX"),
            NtfsEnumValue::Known(NtfsRecordSignature::Indx)
        );
        assert_eq!(
            NtfsRecordSignatureValue::decode(*b"ABCD"),
            NtfsEnumValue::Unrecognized(*b"ABCD")
        );
        assert_eq!(NtfsRecordSignature::Baad.to_raw(), *b"BAAD");
    }
}
