// Copyright 2021-2026 Colin Finck <colin@reactos.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use core::mem;

use enumn::N;
use nt_string::u16strle::U16StrLe;
use strum_macros::Display;
use zerocopy::{FromBytes, Immutable, KnownLayout, LittleEndian, Unaligned, U32, U64};

use crate::attribute::NtfsAttributeType;
use crate::codec::{read_bytes, read_struct, NtfsEnum, NtfsEnumValue};
use crate::error::Result;
use crate::file_reference::NtfsFileReference;
use crate::structured_values::{ensure_min_size, NtfsFileAttributeFlags, NtfsResidentStructuredValue};
use crate::time::NtfsTime;

/// Size of all [`FileNameHeader`] fields.
const FILE_NAME_HEADER_SIZE: usize = 66;

/// The smallest FileName attribute has a name containing just a single character.
const FILE_NAME_MIN_SIZE: usize = FILE_NAME_HEADER_SIZE + mem::size_of::<u16>();

#[derive(Clone, Copy, Debug, FromBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
struct FileNameHeader {
    parent_directory_reference: NtfsFileReference,
    creation_time: NtfsTime,
    modification_time: NtfsTime,
    mft_record_modification_time: NtfsTime,
    access_time: NtfsTime,
    allocated_size: U64<LittleEndian>,
    data_size: U64<LittleEndian>,
    file_attributes: U32<LittleEndian>,
    extended_data: U32<LittleEndian>,
    name_length: u8,
    namespace: u8,
}

/// Character set constraint of the filename, returned by [`NtfsFileName::namespace`].
///
/// Reference: <https://flatcap.github.io/linux-ntfs/ntfs/concepts/filename_namespace.html>
#[derive(Clone, Copy, Debug, Display, Eq, Hash, N, PartialEq)]
#[repr(u8)]
pub enum NtfsFileNamespace {
    /// A POSIX-compatible filename, which is case-sensitive and supports all Unicode
    /// characters except for the forward slash (/) and the NUL character.
    Posix = 0,
    /// A long filename for Windows, which is case-insensitive and supports all Unicode
    /// characters except for " * < > ? \ | / : (and doesn't end with a dot or a space).
    Win32 = 1,
    /// An MS-DOS 8+3 filename (8 uppercase characters with a 3-letter uppercase extension)
    /// that consists entirely of printable ASCII characters (except for " * < > ? \ | / : ; . , + = [ ]).
    Dos = 2,
    /// A Windows filename that also fulfills all requirements of an MS-DOS 8+3 filename,
    /// so it is stored only once.
    Win32AndDos = 3,
}

impl NtfsEnum for NtfsFileNamespace {
    type Raw = u8;

    fn from_raw(raw: u8) -> Option<Self> {
        Self::n(raw)
    }

    fn to_raw(self) -> u8 {
        self as u8
    }
}

/// Decoded namespace code of an [`NtfsFileName`].
pub type NtfsFileNamespaceValue = NtfsEnumValue<NtfsFileNamespace, u8>;

/// Structure of a $FILE_NAME attribute.
///
/// NTFS creates a $FILE_NAME attribute for every hard link.
/// Its valuable information is the actual file name and whether this file represents a directory.
/// Apart from that, it duplicates several fields of $STANDARD_INFORMATION, but these are only updated when
/// the file name changes.
/// You usually want to use the corresponding fields from [`NtfsStandardInformation`] instead.
///
/// The same structure is used as the key of every entry of a filename index.
///
/// A $FILE_NAME attribute is always resident.
///
/// Reference: <https://flatcap.github.io/linux-ntfs/ntfs/attributes/file_name.html>
///
/// [`NtfsStandardInformation`]: crate::structured_values::NtfsStandardInformation
#[derive(Clone, Debug)]
pub struct NtfsFileName<'d> {
    header: FileNameHeader,
    name: &'d [u8],
}

impl<'d> NtfsFileName<'d> {
    /// Returns the last access time stored in this $FILE_NAME record.
    ///
    /// **Note that NTFS only updates it when the file name is changed!**
    /// Check [`NtfsStandardInformation::access_time`] for a last access time that is always up to date.
    ///
    /// [`NtfsStandardInformation::access_time`]: crate::structured_values::NtfsStandardInformation::access_time
    pub fn access_time(&self) -> NtfsTime {
        self.header.access_time
    }

    /// Returns the allocated size of the file data, in bytes.
    /// "Data" refers to the unnamed $DATA attribute of the file ("the" file data).
    ///
    /// **Note that NTFS only updates it when the file name is changed!**
    pub fn allocated_size(&self) -> u64 {
        self.header.allocated_size.get()
    }

    /// Returns the creation time stored in this $FILE_NAME record.
    pub fn creation_time(&self) -> NtfsTime {
        self.header.creation_time
    }

    /// Returns the size actually used by the file data, in bytes.
    ///
    /// **Note that NTFS only updates it when the file name is changed!**
    pub fn data_size(&self) -> u64 {
        self.header.data_size.get()
    }

    /// Returns the extended data field, which holds the reparse point tag for reparse points
    /// and the extended attribute size otherwise.
    pub fn extended_data(&self) -> u32 {
        self.header.extended_data.get()
    }

    /// Returns flags that a user can set for a file (Read-Only, Hidden, System, Archive, etc.).
    /// Commonly called "File Attributes" in Windows Explorer.
    pub fn file_attributes(&self) -> NtfsFileAttributeFlags {
        NtfsFileAttributeFlags::from_bits_retain(self.header.file_attributes.get())
    }

    /// Returns whether this file is a directory.
    pub fn is_directory(&self) -> bool {
        self.file_attributes()
            .contains(NtfsFileAttributeFlags::IS_DIRECTORY)
    }

    /// Returns the MFT record modification time stored in this $FILE_NAME record.
    pub fn mft_record_modification_time(&self) -> NtfsTime {
        self.header.mft_record_modification_time
    }

    /// Returns the modification time stored in this $FILE_NAME record.
    pub fn modification_time(&self) -> NtfsTime {
        self.header.modification_time
    }

    /// Returns the file name.
    pub fn name(&self) -> U16StrLe<'d> {
        U16StrLe(self.name)
    }

    /// Returns the file name length, in bytes.
    ///
    /// A file name has a maximum length of 255 UTF-16 code points (510 bytes).
    pub fn name_length(&self) -> usize {
        self.header.name_length as usize * mem::size_of::<u16>()
    }

    /// Returns the namespace this name belongs to.
    pub fn namespace(&self) -> NtfsFileNamespaceValue {
        NtfsFileNamespaceValue::decode(self.header.namespace)
    }

    /// Returns a reference to the File Record of the parent directory.
    pub fn parent_directory_reference(&self) -> NtfsFileReference {
        self.header.parent_directory_reference
    }
}

impl<'d> NtfsResidentStructuredValue<'d> for NtfsFileName<'d> {
    const TY: NtfsAttributeType = NtfsAttributeType::FileName;

    fn from_resident_value(value: &'d [u8], position: usize) -> Result<Self> {
        ensure_min_size(value, position, Self::TY, FILE_NAME_MIN_SIZE)?;

        let header = *read_struct::<FileNameHeader>(value, 0, position)?;
        let name_length = header.name_length as usize * mem::size_of::<u16>();
        let name = read_bytes(value, FILE_NAME_HEADER_SIZE, name_length, position)?;

        Ok(Self { header, name })
    }
}
