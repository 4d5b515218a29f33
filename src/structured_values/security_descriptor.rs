// Copyright 2021-2026 Colin Finck <colin@reactos.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use core::mem;

use bitflags::bitflags;
use zerocopy::{FromBytes, Immutable, KnownLayout, LittleEndian, Unaligned, U16, U32};

use crate::attribute::NtfsAttributeType;
use crate::codec::read_struct;
use crate::error::Result;
use crate::structured_values::{ensure_min_size, NtfsResidentStructuredValue};

#[derive(Clone, Copy, Debug, FromBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
struct SecurityDescriptorHeader {
    revision: u8,
    sbz1: u8,
    control: U16<LittleEndian>,
    owner_sid_offset: U32<LittleEndian>,
    group_sid_offset: U32<LittleEndian>,
    sacl_offset: U32<LittleEndian>,
    dacl_offset: U32<LittleEndian>,
}

/// Size of all [`SecurityDescriptorHeader`] fields.
const SECURITY_DESCRIPTOR_HEADER_SIZE: usize = mem::size_of::<SecurityDescriptorHeader>();

bitflags! {
    /// Control flags of a security descriptor, returned by [`NtfsSecurityDescriptor::control`].
    ///
    /// Reference: <https://learn.microsoft.com/en-us/windows/win32/secauthz/security-descriptor-control>
    #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
    pub struct NtfsSecurityDescriptorControl: u16 {
        /// The owner SID was set by a default mechanism.
        const SE_OWNER_DEFAULTED = 0x0001;
        /// The group SID was set by a default mechanism.
        const SE_GROUP_DEFAULTED = 0x0002;
        /// The security descriptor has a DACL.
        /// A missing DACL offset in combination with this flag grants full access to everyone.
        const SE_DACL_PRESENT = 0x0004;
        /// The DACL was set by a default mechanism.
        const SE_DACL_DEFAULTED = 0x0008;
        /// The security descriptor has a SACL.
        const SE_SACL_PRESENT = 0x0010;
        /// The SACL was set by a default mechanism.
        const SE_SACL_DEFAULTED = 0x0020;
        const SE_DACL_AUTO_INHERIT_REQ = 0x0100;
        const SE_SACL_AUTO_INHERIT_REQ = 0x0200;
        const SE_DACL_AUTO_INHERITED = 0x0400;
        const SE_SACL_AUTO_INHERITED = 0x0800;
        /// The DACL cannot be modified by inheritable ACEs.
        const SE_DACL_PROTECTED = 0x1000;
        /// The SACL cannot be modified by inheritable ACEs.
        const SE_SACL_PROTECTED = 0x2000;
        const SE_RM_CONTROL_VALID = 0x4000;
        /// All offsets are relative to the beginning of the security descriptor.
        const SE_SELF_RELATIVE = 0x8000;
    }
}

/// Header of a $SECURITY_DESCRIPTOR attribute.
///
/// Only the fixed header is decoded.
/// The owner and group SIDs as well as the SACL and DACL are located via their byte offsets,
/// which are exposed as they are stored and never checked against the length of the descriptor.
/// An offset of zero means that the respective item is absent.
///
/// Windows 2000 and later store most security descriptors centrally in $Secure.
/// A $SECURITY_DESCRIPTOR attribute is found in older volumes and in a few system files.
/// It may be non-resident, in which case its value bytes can be passed to [`NtfsSecurityDescriptor::new`].
///
/// Reference: <https://flatcap.github.io/linux-ntfs/ntfs/attributes/security_descriptor.html>
#[derive(Clone, Debug)]
pub struct NtfsSecurityDescriptor<'d> {
    header: SecurityDescriptorHeader,
    data: &'d [u8],
    position: usize,
}

impl<'d> NtfsSecurityDescriptor<'d> {
    /// Decodes the header of a security descriptor from its value bytes.
    ///
    /// `position` is the absolute position of `data`, only used for error reporting.
    pub fn new(data: &'d [u8], position: usize) -> Result<Self> {
        ensure_min_size(
            data,
            position,
            NtfsAttributeType::SecurityDescriptor,
            SECURITY_DESCRIPTOR_HEADER_SIZE,
        )?;

        let header = *read_struct::<SecurityDescriptorHeader>(data, 0, position)?;

        Ok(Self {
            header,
            data,
            position,
        })
    }

    /// Returns the control flags of this security descriptor.
    pub fn control(&self) -> NtfsSecurityDescriptorControl {
        NtfsSecurityDescriptorControl::from_bits_retain(self.header.control.get())
    }

    /// Returns all bytes of this security descriptor, including the header and the undecoded
    /// SIDs and ACLs.
    pub fn data(&self) -> &'d [u8] {
        self.data
    }

    /// Returns the byte offset of the DACL, or zero if there is none.
    pub fn dacl_offset(&self) -> u32 {
        self.header.dacl_offset.get()
    }

    /// Returns the byte offset of the group SID, or zero if there is none.
    pub fn group_sid_offset(&self) -> u32 {
        self.header.group_sid_offset.get()
    }

    /// Returns whether all offsets are relative to the beginning of this security descriptor.
    pub fn is_self_relative(&self) -> bool {
        self.control()
            .contains(NtfsSecurityDescriptorControl::SE_SELF_RELATIVE)
    }

    /// Returns the byte offset of the owner SID, or zero if there is none.
    pub fn owner_sid_offset(&self) -> u32 {
        self.header.owner_sid_offset.get()
    }

    /// Returns the absolute position of this security descriptor, in bytes.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns the revision of the security descriptor format (usually `1`).
    pub fn revision(&self) -> u8 {
        self.header.revision
    }

    /// Returns the byte offset of the SACL, or zero if there is none.
    pub fn sacl_offset(&self) -> u32 {
        self.header.sacl_offset.get()
    }

    /// Returns the raw value of the byte following the revision.
    /// It is zero in all descriptors created by Windows.
    pub fn sbz1(&self) -> u8 {
        self.header.sbz1
    }
}

impl<'d> NtfsResidentStructuredValue<'d> for NtfsSecurityDescriptor<'d> {
    const TY: NtfsAttributeType = NtfsAttributeType::SecurityDescriptor;

    fn from_resident_value(value: &'d [u8], position: usize) -> Result<Self> {
        Self::new(value, position)
    }
}
