// Copyright 2021-2026 Colin Finck <colin@reactos.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use core::mem;

use zerocopy::{FromBytes, Immutable, KnownLayout, LittleEndian, Unaligned, U32, U64};

use crate::attribute::NtfsAttributeType;
use crate::codec::read_struct;
use crate::error::Result;
use crate::structured_values::{ensure_min_size, NtfsFileAttributeFlags, NtfsResidentStructuredValue};
use crate::time::NtfsTime;

/// Size of all [`StandardInformationDataNtfs1`] fields plus some reserved bytes.
const STANDARD_INFORMATION_SIZE_NTFS1: usize = 48;

/// Size of all [`StandardInformationDataNtfs1`] plus [`StandardInformationDataNtfs3`] fields.
const STANDARD_INFORMATION_SIZE_NTFS3: usize = 72;

#[derive(Clone, Copy, Debug, FromBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
struct StandardInformationDataNtfs1 {
    creation_time: NtfsTime,
    modification_time: NtfsTime,
    mft_record_modification_time: NtfsTime,
    access_time: NtfsTime,
    file_attributes: U32<LittleEndian>,
    maximum_versions: U32<LittleEndian>,
    version: U32<LittleEndian>,
    class_id: U32<LittleEndian>,
}

#[derive(Clone, Copy, Debug, FromBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
struct StandardInformationDataNtfs3 {
    owner_id: U32<LittleEndian>,
    security_id: U32<LittleEndian>,
    quota_charged: U64<LittleEndian>,
    usn: U64<LittleEndian>,
}

/// Structure of a $STANDARD_INFORMATION attribute.
///
/// Among other things, this is the place where the file times and "File Attributes"
/// (Read-Only, Hidden, System, Archive, etc.) are stored.
/// NTFS 1.2 only wrote the first 48 bytes, NTFS 3.x appends owner, security and journal information.
///
/// A $STANDARD_INFORMATION attribute is always resident.
///
/// Reference: <https://flatcap.github.io/linux-ntfs/ntfs/attributes/standard_information.html>
#[derive(Clone, Debug)]
pub struct NtfsStandardInformation {
    ntfs1_data: StandardInformationDataNtfs1,
    ntfs3_data: Option<StandardInformationDataNtfs3>,
}

impl NtfsStandardInformation {
    /// Returns the time this file was last accessed.
    pub fn access_time(&self) -> NtfsTime {
        self.ntfs1_data.access_time
    }

    /// Returns the Class ID of the file.
    pub fn class_id(&self) -> u32 {
        self.ntfs1_data.class_id.get()
    }

    /// Returns the time this file was created.
    pub fn creation_time(&self) -> NtfsTime {
        self.ntfs1_data.creation_time
    }

    /// Returns flags that a user can set for a file (Read-Only, Hidden, System, Archive, etc.).
    /// Commonly called "File Attributes" in Windows Explorer.
    pub fn file_attributes(&self) -> NtfsFileAttributeFlags {
        NtfsFileAttributeFlags::from_bits_retain(self.ntfs1_data.file_attributes.get())
    }

    /// Returns the maximum allowed versions for this file.
    ///
    /// A value of zero means that versioning is disabled for this file.
    pub fn maximum_versions(&self) -> u32 {
        self.ntfs1_data.maximum_versions.get()
    }

    /// Returns the time the MFT record of this file was last modified.
    pub fn mft_record_modification_time(&self) -> NtfsTime {
        self.ntfs1_data.mft_record_modification_time
    }

    /// Returns the time this file was last modified.
    pub fn modification_time(&self) -> NtfsTime {
        self.ntfs1_data.modification_time
    }

    /// Returns the Owner ID of the file, if stored via NTFS 3.x file information.
    pub fn owner_id(&self) -> Option<u32> {
        self.ntfs3_data.as_ref().map(|x| x.owner_id.get())
    }

    /// Returns the quota charged by this file, if stored via NTFS 3.x file information.
    pub fn quota_charged(&self) -> Option<u64> {
        self.ntfs3_data.as_ref().map(|x| x.quota_charged.get())
    }

    /// Returns the Security ID of the file, if stored via NTFS 3.x file information.
    pub fn security_id(&self) -> Option<u32> {
        self.ntfs3_data.as_ref().map(|x| x.security_id.get())
    }

    /// Returns the Update Sequence Number (USN) of the file, if stored via NTFS 3.x file information.
    pub fn usn(&self) -> Option<u64> {
        self.ntfs3_data.as_ref().map(|x| x.usn.get())
    }

    /// Returns the version of the file.
    ///
    /// This will be zero if versioning is disabled for this file.
    pub fn version(&self) -> u32 {
        self.ntfs1_data.version.get()
    }
}

impl<'d> NtfsResidentStructuredValue<'d> for NtfsStandardInformation {
    const TY: NtfsAttributeType = NtfsAttributeType::StandardInformation;

    fn from_resident_value(value: &'d [u8], position: usize) -> Result<Self> {
        ensure_min_size(value, position, Self::TY, STANDARD_INFORMATION_SIZE_NTFS1)?;

        let ntfs1_data = *read_struct::<StandardInformationDataNtfs1>(value, 0, position)?;

        let ntfs3_data = if value.len() >= STANDARD_INFORMATION_SIZE_NTFS3 {
            Some(*read_struct::<StandardInformationDataNtfs3>(
                value,
                mem::size_of::<StandardInformationDataNtfs1>(),
                position,
            )?)
        } else {
            None
        };

        Ok(Self {
            ntfs1_data,
            ntfs3_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NtfsError;
    use crate::helpers::tests::standard_information_value;
    use crate::time::tests::NT_TIMESTAMP_2021_01_01;

    #[test]
    fn test_standard_information() {
        let value = standard_information_value(NT_TIMESTAMP_2021_01_01, 0x26);
        assert_eq!(value.len(), STANDARD_INFORMATION_SIZE_NTFS3);

        let standard_info = NtfsStandardInformation::from_resident_value(&value, 0x58).unwrap();
        assert_eq!(
            standard_info.creation_time().nt_timestamp(),
            NT_TIMESTAMP_2021_01_01
        );
        assert_eq!(standard_info.creation_time(), standard_info.modification_time());
        assert_eq!(
            standard_info.creation_time(),
            standard_info.mft_record_modification_time()
        );
        assert_eq!(standard_info.creation_time(), standard_info.access_time());
        assert_eq!(
            standard_info.file_attributes(),
            NtfsFileAttributeFlags::HIDDEN
                | NtfsFileAttributeFlags::SYSTEM
                | NtfsFileAttributeFlags::ARCHIVE
        );
        assert_eq!(standard_info.security_id(), Some(0x100));
        assert_eq!(standard_info.usn(), Some(0));
    }

    #[test]
    fn test_ntfs1_standard_information() {
        let value = standard_information_value(NT_TIMESTAMP_2021_01_01, 0x80);
        let standard_info =
            NtfsStandardInformation::from_resident_value(&value[..STANDARD_INFORMATION_SIZE_NTFS1], 0)
                .unwrap();
        assert_eq!(standard_info.file_attributes(), NtfsFileAttributeFlags::NORMAL);
        assert_eq!(standard_info.owner_id(), None);
        assert_eq!(standard_info.security_id(), None);

        assert_eq!(
            NtfsStandardInformation::from_resident_value(&value[..40], 0x58).unwrap_err(),
            NtfsError::InvalidStructuredValueSize {
                position: 0x58,
                ty: NtfsAttributeType::StandardInformation.into(),
                expected: STANDARD_INFORMATION_SIZE_NTFS1,
                actual: 40,
            }
        );
    }
}
