// Copyright 2021-2026 Colin Finck <colin@reactos.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use core::fmt;

use zerocopy::{FromBytes, Immutable, KnownLayout, Unaligned};

/// Mask of the 48-bit File Record Number within a file reference.
const FILE_RECORD_NUMBER_MASK: u64 = 0xffff_ffff_ffff;

/// Absolute reference to an MFT entry.
///
/// An 8-byte value packing the 48-bit File Record Number (the index of the entry within the MFT)
/// and the 16-bit sequence number that entry had when the reference was created.
/// NTFS increments an entry's sequence number whenever the entry is freed, so a reference
/// whose sequence number differs from the one of the current entry points to an older file.
#[derive(Clone, Copy, Default, Eq, FromBytes, Hash, Immutable, KnownLayout, PartialEq, Unaligned)]
#[repr(transparent)]
pub struct NtfsFileReference([u8; 8]);

impl NtfsFileReference {
    /// Creates a file reference from a File Record Number and a sequence number.
    ///
    /// The File Record Number is truncated to 48 bits.
    pub const fn new(file_record_number: u64, sequence_number: u16) -> Self {
        let value = (file_record_number & FILE_RECORD_NUMBER_MASK) | (sequence_number as u64) << 48;
        Self(value.to_le_bytes())
    }

    /// Returns the 48-bit File Record Number of the referenced entry.
    pub fn file_record_number(&self) -> u64 {
        u64::from_le_bytes(self.0) & FILE_RECORD_NUMBER_MASK
    }

    /// Returns `true` if the referenced entry has been reused since this reference was created,
    /// i.e. its current sequence number doesn't match the one stored here.
    ///
    /// A stored sequence number of zero is never considered stale, as NTFS doesn't track
    /// sequence numbers for some system file references.
    pub fn is_stale(&self, current_sequence_number: u16) -> bool {
        self.sequence_number() != 0 && self.sequence_number() != current_sequence_number
    }

    /// Returns the raw 8-byte value.
    pub fn to_bytes(&self) -> [u8; 8] {
        self.0
    }

    /// Returns the sequence number the referenced entry had when this reference was created.
    pub fn sequence_number(&self) -> u16 {
        (u64::from_le_bytes(self.0) >> 48) as u16
    }
}

impl fmt::Debug for NtfsFileReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NtfsFileReference")
            .field("file_record_number", &self.file_record_number())
            .field("sequence_number", &self.sequence_number())
            .finish()
    }
}

/// File Record Numbers of the system files that every NTFS volume has.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u64)]
pub enum KnownNtfsFileRecordNumber {
    MFT = 0,
    MFTMirr = 1,
    LogFile = 2,
    Volume = 3,
    AttrDef = 4,
    RootDirectory = 5,
    Bitmap = 6,
    Boot = 7,
    BadClus = 8,
    Secure = 9,
    UpCase = 10,
    Extend = 11,
}
