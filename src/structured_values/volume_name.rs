// Copyright 2021-2026 Colin Finck <colin@reactos.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use core::mem;

use nt_string::u16strle::U16StrLe;

use crate::attribute::NtfsAttributeType;
use crate::error::{NtfsError, Result};
use crate::structured_values::{ensure_min_size, NtfsResidentStructuredValue};

/// The smallest VolumeName attribute has a name containing just a single character.
const VOLUME_NAME_MIN_SIZE: usize = mem::size_of::<u16>();

/// The largest VolumeName attribute has a name containing 128 UTF-16 code points (256 bytes).
const VOLUME_NAME_MAX_SIZE: usize = 128 * mem::size_of::<u16>();

/// Structure of a $VOLUME_NAME attribute.
///
/// This attribute is only used by the top-level $Volume file and contains the user-defined name of this filesystem.
///
/// A $VOLUME_NAME attribute is always resident.
///
/// Reference: <https://flatcap.github.io/linux-ntfs/ntfs/attributes/volume_name.html>
#[derive(Clone, Debug)]
pub struct NtfsVolumeName<'d> {
    name: &'d [u8],
}

impl<'d> NtfsVolumeName<'d> {
    /// Returns the volume name.
    pub fn name(&self) -> U16StrLe<'d> {
        U16StrLe(self.name)
    }

    /// Returns the volume name length, in bytes.
    ///
    /// A volume name has a maximum length of 128 UTF-16 code points (256 bytes).
    pub fn name_length(&self) -> usize {
        self.name.len()
    }
}

impl<'d> NtfsResidentStructuredValue<'d> for NtfsVolumeName<'d> {
    const TY: NtfsAttributeType = NtfsAttributeType::VolumeName;

    fn from_resident_value(value: &'d [u8], position: usize) -> Result<Self> {
        ensure_min_size(value, position, Self::TY, VOLUME_NAME_MIN_SIZE)?;

        if value.len() > VOLUME_NAME_MAX_SIZE {
            return Err(NtfsError::InvalidStructuredValueSize {
                position,
                ty: Self::TY.into(),
                expected: VOLUME_NAME_MAX_SIZE,
                actual: value.len(),
            });
        }

        Ok(Self { name: value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn test_volume_name() {
        let value = "mylabel"
            .encode_utf16()
            .flat_map(u16::to_le_bytes)
            .collect::<Vec<u8>>();

        let volume_name = NtfsVolumeName::from_resident_value(&value, 0).unwrap();
        assert_eq!(volume_name.name_length(), 14);
        assert_eq!(volume_name.name().to_string_lossy(), "mylabel");

        assert!(NtfsVolumeName::from_resident_value(&[], 0).is_err());
        assert!(NtfsVolumeName::from_resident_value(&[0u8; 258], 0).is_err());
    }
}
