// Copyright 2021-2026 Colin Finck <colin@reactos.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use core::mem;

use crate::attribute::NtfsAttributeType;
use crate::codec::read_struct;
use crate::error::Result;
use crate::guid::NtfsGuid;
use crate::structured_values::{ensure_min_size, NtfsResidentStructuredValue};

const GUID_SIZE: usize = mem::size_of::<NtfsGuid>();

/// Structure of an $OBJECT_ID attribute.
///
/// This optional attribute contains a globally unique identifier of the file.
///
/// An $OBJECT_ID attribute is always resident.
///
/// Reference: <https://flatcap.github.io/linux-ntfs/ntfs/attributes/object_id.html>
#[derive(Clone, Debug)]
pub struct NtfsObjectId {
    object_id: NtfsGuid,
    birth_volume_id: Option<NtfsGuid>,
    birth_object_id: Option<NtfsGuid>,
    domain_id: Option<NtfsGuid>,
}

impl NtfsObjectId {
    /// Returns the (optional) first Object ID that has ever been assigned to this file.
    pub fn birth_object_id(&self) -> Option<&NtfsGuid> {
        self.birth_object_id.as_ref()
    }

    /// Returns the (optional) Object ID of the $Volume file of the partition where this file was created.
    pub fn birth_volume_id(&self) -> Option<&NtfsGuid> {
        self.birth_volume_id.as_ref()
    }

    /// Returns the (optional) Domain ID of this file.
    pub fn domain_id(&self) -> Option<&NtfsGuid> {
        self.domain_id.as_ref()
    }

    /// Returns the Object ID, a globally unique identifier of the file.
    pub fn object_id(&self) -> &NtfsGuid {
        &self.object_id
    }
}

impl<'d> NtfsResidentStructuredValue<'d> for NtfsObjectId {
    const TY: NtfsAttributeType = NtfsAttributeType::ObjectId;

    fn from_resident_value(value: &'d [u8], position: usize) -> Result<Self> {
        ensure_min_size(value, position, Self::TY, GUID_SIZE)?;

        // Every further GUID is optional and only present if the value is long enough.
        let guid = |index: usize| -> Result<Option<NtfsGuid>> {
            let offset = index * GUID_SIZE;
            if value.len() < offset + GUID_SIZE {
                return Ok(None);
            }

            read_struct::<NtfsGuid>(value, offset, position).map(|guid| Some(*guid))
        };

        let object_id = *read_struct::<NtfsGuid>(value, 0, position)?;

        Ok(Self {
            object_id,
            birth_volume_id: guid(1)?,
            birth_object_id: guid(2)?,
            domain_id: guid(3)?,
        })
    }
}
