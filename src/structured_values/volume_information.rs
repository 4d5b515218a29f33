// Copyright 2021-2026 Colin Finck <colin@reactos.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use core::mem;

use bitflags::bitflags;
use zerocopy::{FromBytes, Immutable, KnownLayout, LittleEndian, Unaligned, U16};

use crate::attribute::NtfsAttributeType;
use crate::codec::read_struct;
use crate::error::Result;
use crate::structured_values::{ensure_min_size, NtfsResidentStructuredValue};

#[derive(Clone, Copy, Debug, FromBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
struct VolumeInformationData {
    reserved: [u8; 8],
    major_version: u8,
    minor_version: u8,
    flags: U16<LittleEndian>,
}

bitflags! {
    /// Flags that can be set for an NTFS Volume.
    #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
    pub struct NtfsVolumeFlags: u16 {
        /// The volume needs to be checked by `chkdsk`.
        const IS_DIRTY = 0x0001;
        const RESIZE_LOG_FILE = 0x0002;
        const UPGRADE_ON_MOUNT = 0x0004;
        const MOUNTED_ON_NT4 = 0x0008;
        const DELETE_USN_UNDERWAY = 0x0010;
        const REPAIR_OBJECT_ID = 0x0020;
        const CHKDSK_UNDERWAY = 0x4000;
        const MODIFIED_BY_CHKDSK = 0x8000;
    }
}

/// Structure of a $VOLUME_INFORMATION attribute.
///
/// This attribute is only used by the top-level $Volume file and contains general information about the filesystem.
///
/// A $VOLUME_INFORMATION attribute is always resident.
///
/// Reference: <https://flatcap.github.io/linux-ntfs/ntfs/attributes/volume_information.html>
#[derive(Clone, Debug)]
pub struct NtfsVolumeInformation {
    data: VolumeInformationData,
}

impl NtfsVolumeInformation {
    /// Returns flags that have been set for this NTFS Volume.
    pub fn flags(&self) -> NtfsVolumeFlags {
        NtfsVolumeFlags::from_bits_retain(self.data.flags.get())
    }

    /// Returns the major NTFS version of this filesystem (e.g. `3` for NTFS 3.1).
    pub fn major_version(&self) -> u8 {
        self.data.major_version
    }

    /// Returns the minor NTFS version of this filesystem (e.g. `1` for NTFS 3.1).
    pub fn minor_version(&self) -> u8 {
        self.data.minor_version
    }
}

impl<'d> NtfsResidentStructuredValue<'d> for NtfsVolumeInformation {
    const TY: NtfsAttributeType = NtfsAttributeType::VolumeInformation;

    fn from_resident_value(value: &'d [u8], position: usize) -> Result<Self> {
        ensure_min_size(
            value,
            position,
            Self::TY,
            mem::size_of::<VolumeInformationData>(),
        )?;

        let data = *read_struct::<VolumeInformationData>(value, 0, position)?;
        Ok(Self { data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_information() {
        let value = [0, 0, 0, 0, 0, 0, 0, 0, 3, 1, 0x01, 0x80];
        let volume_info = NtfsVolumeInformation::from_resident_value(&value, 0).unwrap();
        assert_eq!(volume_info.major_version(), 3);
        assert_eq!(volume_info.minor_version(), 1);
        assert_eq!(
            volume_info.flags(),
            NtfsVolumeFlags::IS_DIRTY | NtfsVolumeFlags::MODIFIED_BY_CHKDSK
        );
    }
}
