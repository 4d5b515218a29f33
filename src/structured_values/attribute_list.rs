// Copyright 2021-2026 Colin Finck <colin@reactos.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use core::iter::FusedIterator;
use core::mem;

use nt_string::u16strle::U16StrLe;
use zerocopy::{FromBytes, Immutable, KnownLayout, LittleEndian, Unaligned, I64, U16, U32};

use crate::attribute::{NtfsAttributeType, NtfsAttributeTypeCode};
use crate::codec::read_struct;
use crate::error::{NtfsError, Result};
use crate::file_reference::NtfsFileReference;
use crate::structured_values::NtfsResidentStructuredValue;
use crate::types::Vcn;

#[derive(Clone, Copy, Debug, FromBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
struct AttributeListEntryHeader {
    /// Type of the attribute, known types are in [`NtfsAttributeType`].
    ty: U32<LittleEndian>,
    /// Length of this attribute list entry, in bytes.
    list_entry_length: U16<LittleEndian>,
    /// Length of the name, in UTF-16 code points (every code point is 2 bytes).
    name_length: u8,
    /// Offset to the beginning of the name, in bytes from the beginning of this header.
    name_offset: u8,
    /// Lower boundary of Virtual Cluster Numbers (VCNs) referenced by this attribute.
    /// This becomes relevant when file data is split over multiple attributes.
    /// Otherwise, it's zero.
    lowest_vcn: I64<LittleEndian>,
    /// Reference to the File Record where this attribute is stored.
    base_file_reference: NtfsFileReference,
    /// Identifier of this attribute that is unique within the File Record.
    instance: U16<LittleEndian>,
}

/// Size of all [`AttributeListEntryHeader`] fields.
const ATTRIBUTE_LIST_ENTRY_HEADER_SIZE: usize = mem::size_of::<AttributeListEntryHeader>();

/// Structure of an $ATTRIBUTE_LIST attribute.
///
/// When a file needs more attributes than can fit into its File Record, NTFS moves some of them into
/// further File Records and creates an $ATTRIBUTE_LIST telling where each attribute is stored.
/// This structure only lists those entries, looking up the referenced File Records is up to the caller.
///
/// An $ATTRIBUTE_LIST attribute may also be non-resident.
/// Pass its value bytes to [`NtfsAttributeList::new`] in that case.
///
/// Reference: <https://flatcap.github.io/linux-ntfs/ntfs/attributes/attribute_list.html>
#[derive(Clone, Debug)]
pub struct NtfsAttributeList<'d> {
    data: &'d [u8],
    position: usize,
}

impl<'d> NtfsAttributeList<'d> {
    /// Creates an attribute list from its value bytes.
    ///
    /// `position` is the absolute position of `data`, only used for error reporting.
    pub fn new(data: &'d [u8], position: usize) -> Self {
        Self { data, position }
    }

    /// Returns an iterator over all entries of this Attribute List.
    pub fn entries(&self) -> NtfsAttributeListEntries<'d> {
        NtfsAttributeListEntries {
            data: self.data,
            position: self.position,
            offset: 0,
        }
    }

    /// Returns the absolute position of this Attribute List value, in bytes.
    pub fn position(&self) -> usize {
        self.position
    }
}

impl<'d> NtfsResidentStructuredValue<'d> for NtfsAttributeList<'d> {
    const TY: NtfsAttributeType = NtfsAttributeType::AttributeList;

    fn from_resident_value(value: &'d [u8], position: usize) -> Result<Self> {
        Ok(Self::new(value, position))
    }
}

/// Iterator over
///   all entries of an [`NtfsAttributeList`],
///   returning an [`NtfsAttributeListEntry`] for each entry,
///   implementing [`Iterator`] and [`FusedIterator`].
///
/// This iterator is returned from the [`NtfsAttributeList::entries`] function.
#[derive(Clone, Debug)]
pub struct NtfsAttributeListEntries<'d> {
    data: &'d [u8],
    position: usize,
    offset: usize,
}

impl<'d> NtfsAttributeListEntries<'d> {
    fn read_entry(&mut self) -> Result<NtfsAttributeListEntry<'d>> {
        let position = self.position + self.offset;
        let header = *read_struct::<AttributeListEntryHeader>(self.data, self.offset, self.position)?;

        let list_entry_length = header.list_entry_length.get();
        let remaining = self.data.len() - self.offset;
        if (list_entry_length as usize) < ATTRIBUTE_LIST_ENTRY_HEADER_SIZE
            || list_entry_length as usize > remaining
        {
            return Err(NtfsError::InvalidAttributeListEntryLength {
                position,
                actual: list_entry_length,
                remaining,
            });
        }

        let entry_data = &self.data[self.offset..self.offset + list_entry_length as usize];
        let start = header.name_offset as usize;
        let end = start + header.name_length as usize * mem::size_of::<u16>();
        let name = entry_data
            .get(start..end)
            .ok_or(NtfsError::InvalidAttributeNameRange {
                position,
                range: start..end,
                size: list_entry_length as u32,
            })?;

        self.offset += list_entry_length as usize;

        Ok(NtfsAttributeListEntry {
            header,
            name,
            position,
        })
    }
}

impl<'d> Iterator for NtfsAttributeListEntries<'d> {
    type Item = Result<NtfsAttributeListEntry<'d>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.data.len() {
            return None;
        }

        let result = self.read_entry();
        if result.is_err() {
            // The next entry can't be located anymore.
            self.offset = self.data.len();
        }

        Some(result)
    }
}

impl<'d> FusedIterator for NtfsAttributeListEntries<'d> {}

/// A single entry of an [`NtfsAttributeList`].
#[derive(Clone, Debug)]
pub struct NtfsAttributeListEntry<'d> {
    header: AttributeListEntryHeader,
    name: &'d [u8],
    position: usize,
}

impl<'d> NtfsAttributeListEntry<'d> {
    /// Returns a reference to the File Record where the attribute is stored.
    pub fn base_file_reference(&self) -> NtfsFileReference {
        self.header.base_file_reference
    }

    /// Returns the instance number of this attribute, which is unique within the referenced File Record.
    pub fn instance(&self) -> u16 {
        self.header.instance.get()
    }

    /// Returns the length of this Attribute List entry, in bytes.
    pub fn list_entry_length(&self) -> u16 {
        self.header.list_entry_length.get()
    }

    /// Returns the lower boundary of Virtual Cluster Numbers (VCNs) referenced by this attribute.
    pub fn lowest_vcn(&self) -> Vcn {
        Vcn::from(self.header.lowest_vcn.get())
    }

    /// Returns the name of this attribute (if any).
    pub fn name(&self) -> U16StrLe<'d> {
        U16StrLe(self.name)
    }

    /// Returns the length of the name of this attribute, in bytes.
    pub fn name_length(&self) -> usize {
        self.name.len()
    }

    /// Returns the absolute position of this Attribute List entry, in bytes.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns the type of this attribute.
    pub fn ty(&self) -> NtfsAttributeTypeCode {
        NtfsAttributeTypeCode::decode(self.header.ty.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn entry(ty: u32, name: &str, lowest_vcn: i64, reference: NtfsFileReference) -> Vec<u8> {
        let name = name
            .encode_utf16()
            .flat_map(u16::to_le_bytes)
            .collect::<Vec<u8>>();
        let length = (ATTRIBUTE_LIST_ENTRY_HEADER_SIZE + name.len() + 7) & !7;

        let mut data = Vec::new();
        data.extend_from_slice(&ty.to_le_bytes());
        data.extend_from_slice(&(length as u16).to_le_bytes());
        data.push((name.len() / 2) as u8);
        data.push(ATTRIBUTE_LIST_ENTRY_HEADER_SIZE as u8);
        data.extend_from_slice(&lowest_vcn.to_le_bytes());
        data.extend_from_slice(&reference.to_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&name);
        data.resize(length, 0);
        data
    }

    #[test]
    fn test_attribute_list() {
        let base = NtfsFileReference::new(0x1234, 3);
        let extension = NtfsFileReference::new(0x1240, 1);

        let mut value = entry(0x10, "", 0, base);
        value.extend(entry(0x80, "", 0, extension));
        value.extend(entry(0x80, "", 0x200, extension));
        value.extend(entry(0x80, "Zone.Identifier", 0, base));

        let list = NtfsAttributeList::from_resident_value(&value, 0x2000).unwrap();
        let entries = list.entries().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(entries.len(), 4);

        assert!(entries[0].ty().is(NtfsAttributeType::StandardInformation));
        assert_eq!(entries[0].position(), 0x2000);
        assert_eq!(entries[0].list_entry_length(), 32);
        assert_eq!(entries[0].base_file_reference(), base);

        assert_eq!(entries[2].lowest_vcn(), Vcn::from(0x200));
        assert_eq!(entries[2].base_file_reference().file_record_number(), 0x1240);

        assert_eq!(entries[3].name().to_string_lossy(), "Zone.Identifier");
        assert_eq!(entries[3].name_length(), 30);
    }

    #[test]
    fn test_invalid_attribute_list_entry() {
        let mut value = entry(0x10, "", 0, NtfsFileReference::new(5, 5));
        value[4..6].copy_from_slice(&8u16.to_le_bytes());

        let mut entries = NtfsAttributeList::new(&value, 0).entries();
        assert!(matches!(
            entries.next(),
            Some(Err(NtfsError::InvalidAttributeListEntryLength { actual: 8, .. }))
        ));
        assert!(entries.next().is_none());
    }
}
