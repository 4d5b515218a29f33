// Copyright 2021-2026 Colin Finck <colin@reactos.org>
// SPDX-License-Identifier: MIT OR Apache-2.0
//
//! Index nodes and their entries, shared by $INDEX_ROOT and Index Records.

use core::iter::FusedIterator;
use core::mem;

use bitflags::bitflags;
use memoffset::offset_of;
use zerocopy::{FromBytes, Immutable, KnownLayout, LittleEndian, Unaligned, U16, U32};

use crate::codec::{read_struct, read_u64};
use crate::error::{NtfsError, Result};
use crate::file_reference::NtfsFileReference;
use crate::structured_values::{NtfsFileName, NtfsResidentStructuredValue};
use crate::types::Vcn;

#[derive(FromBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
struct IndexEntryHeader {
    file_reference: NtfsFileReference,
    index_entry_length: U16<LittleEndian>,
    key_length: U16<LittleEndian>,
    flags: U32<LittleEndian>,
}

/// Size of all [`IndexEntryHeader`] fields.
const INDEX_ENTRY_HEADER_SIZE: usize = mem::size_of::<IndexEntryHeader>();

bitflags! {
    /// Flags returned by [`NtfsIndexEntry::flags`].
    #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
    pub struct NtfsIndexEntryFlags: u32 {
        /// This index entry points to a sub-node.
        const HAS_SUBNODE = 0x01;
        /// This is the last index entry in the list.
        const LAST_ENTRY = 0x02;
    }
}

/// On-disk structure of the header of an index node.
/// All offsets are relative to the beginning of this header.
#[derive(FromBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub(crate) struct IndexNodeHeader {
    pub(crate) entries_offset: U32<LittleEndian>,
    pub(crate) index_size: U32<LittleEndian>,
    pub(crate) allocated_size: U32<LittleEndian>,
    pub(crate) flags: u8,
    reserved: [u8; 3],
}

bitflags! {
    /// Flags returned by [`NtfsIndexNode::flags`].
    #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
    pub struct NtfsIndexNodeFlags: u8 {
        /// The entries of this node have sub-nodes in the $INDEX_ALLOCATION attribute.
        const HAS_SUBNODES = 0x01;
    }
}

/// A B-tree node of an NTFS index, consisting of a node header and a packed list of [`NtfsIndexEntry`]s.
///
/// The root node is stored in the $INDEX_ROOT attribute, all further nodes are [`NtfsIndexRecord`]s.
///
/// [`NtfsIndexRecord`]: crate::index_record::NtfsIndexRecord
#[derive(Clone, Debug)]
pub struct NtfsIndexNode<'d> {
    /// Node data, beginning with the node header and ending at the used size.
    data: &'d [u8],
    position: usize,
    allocated_size: u32,
    flags: u8,
    entries_offset: u32,
}

impl<'d> NtfsIndexNode<'d> {
    /// Validates the node header at the beginning of `data` and limits the node to its used size.
    pub(crate) fn new(data: &'d [u8], position: usize) -> Result<Self> {
        let header = read_struct::<IndexNodeHeader>(data, 0, position)?;
        let entries_offset = header.entries_offset.get();
        let index_size = header.index_size.get();

        if index_size as usize > data.len() {
            return Err(NtfsError::InvalidIndexUsedSize {
                position,
                expected: data.len(),
                actual: index_size as usize,
            });
        }

        if (entries_offset as usize) < mem::size_of::<IndexNodeHeader>() || entries_offset > index_size
        {
            return Err(NtfsError::InvalidIndexEntriesOffset {
                position: position + offset_of!(IndexNodeHeader, entries_offset),
                entries_offset,
                used_size: index_size,
            });
        }

        Ok(Self {
            data: &data[..index_size as usize],
            position,
            allocated_size: header.allocated_size.get(),
            flags: header.flags,
            entries_offset,
        })
    }

    /// Returns the number of bytes allocated for this node, counted from the node header.
    pub fn allocated_size(&self) -> u32 {
        self.allocated_size
    }

    /// Returns an iterator over all entries of this node.
    pub fn entries(&self) -> NtfsIndexNodeEntries<'d> {
        let start = self.entries_offset as usize;
        NtfsIndexNodeEntries::new(&self.data[start..], self.position + start)
    }

    /// Returns the flags of this node.
    pub fn flags(&self) -> NtfsIndexNodeFlags {
        NtfsIndexNodeFlags::from_bits_retain(self.flags)
    }

    /// Returns whether this index node has sub-nodes.
    /// Otherwise, this index node is a leaf node.
    pub fn has_subnodes(&self) -> bool {
        self.flags().contains(NtfsIndexNodeFlags::HAS_SUBNODES)
    }

    /// Returns the number of bytes used by this node, counted from the node header.
    pub fn index_size(&self) -> u32 {
        self.data.len() as u32
    }

    /// Returns the absolute position of the node header, in bytes.
    pub fn position(&self) -> usize {
        self.position
    }
}

/// A single entry of an index node.
///
/// Every entry but the last one carries a key, which for filename indexes is a $FILE_NAME structure.
/// The last entry only terminates the node and may point to a sub-node with keys greater than all
/// keys of this node.
#[derive(Clone, Debug)]
pub struct NtfsIndexEntry<'d> {
    /// All bytes of this entry, as given by its length field.
    data: &'d [u8],
    position: usize,
}

impl<'d> NtfsIndexEntry<'d> {
    fn header(&self) -> Result<&'d IndexEntryHeader> {
        read_struct::<IndexEntryHeader>(self.data, 0, self.position)
    }

    /// Returns a reference to the File Record this entry is about.
    ///
    /// This field is meaningless for the last entry.
    pub fn file_reference(&self) -> NtfsFileReference {
        self.header()
            .map(|header| header.file_reference)
            .unwrap_or_default()
    }

    /// Returns the flags of this entry.
    pub fn flags(&self) -> NtfsIndexEntryFlags {
        let flags = self.header().map(|header| header.flags.get()).unwrap_or(0);
        NtfsIndexEntryFlags::from_bits_retain(flags)
    }

    /// Returns the length of this entry, in bytes.
    pub fn index_entry_length(&self) -> u16 {
        self.data.len() as u16
    }

    /// Returns `true` if this entry terminates its node.
    pub fn is_last(&self) -> bool {
        self.flags().contains(NtfsIndexEntryFlags::LAST_ENTRY)
    }

    /// Returns the raw key of this entry, or `None` if this entry has no key.
    /// The last entry never has a key.
    pub fn key(&self) -> Option<&'d [u8]> {
        // The key is only set when the last entry flag is not set.
        // https://flatcap.github.io/linux-ntfs/ntfs/concepts/index_entry.html
        let key_length = self.key_length() as usize;
        if key_length == 0 || self.is_last() {
            return None;
        }

        // `NtfsIndexNodeEntries` has already checked that the key fits into the entry.
        self.data
            .get(INDEX_ENTRY_HEADER_SIZE..INDEX_ENTRY_HEADER_SIZE + key_length)
    }

    /// Decodes the key of this entry as a $FILE_NAME structure, as found in every filename index
    /// (collation rule [`NtfsCollationRule::FileName`]).
    ///
    /// Returns `None` if this entry has no key.
    ///
    /// [`NtfsCollationRule::FileName`]: crate::structured_values::NtfsCollationRule::FileName
    pub fn key_file_name(&self) -> Option<Result<NtfsFileName<'d>>> {
        let key = self.key()?;
        let position = self.position + INDEX_ENTRY_HEADER_SIZE;
        Some(NtfsFileName::from_resident_value(key, position))
    }

    /// Returns the length of the key of this entry, in bytes.
    pub fn key_length(&self) -> u16 {
        self.header()
            .map(|header| header.key_length.get())
            .unwrap_or(0)
    }

    /// Returns the absolute position of this entry, in bytes.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns the Virtual Cluster Number (VCN) of the sub-node of this entry,
    /// or `None` if this entry has no sub-node.
    ///
    /// Turning the VCN into a byte offset within the $INDEX_ALLOCATION attribute is described at
    /// [`NtfsIndexRoot::index_record_byte_offset`].
    ///
    /// [`NtfsIndexRoot::index_record_byte_offset`]: crate::structured_values::NtfsIndexRoot::index_record_byte_offset
    pub fn subnode_vcn(&self) -> Option<Vcn> {
        if !self.flags().contains(NtfsIndexEntryFlags::HAS_SUBNODE) {
            return None;
        }

        // Get the subnode VCN from the very end of the Index Entry.
        let start = self.data.len().checked_sub(mem::size_of::<u64>())?;
        let vcn = read_u64(self.data, start, self.position).ok()?;

        Some(Vcn::from(vcn as i64))
    }
}

/// Iterator over
///   all entries of an [`NtfsIndexNode`],
///   returning an [`NtfsIndexEntry`] for each entry,
///   implementing [`Iterator`] and [`FusedIterator`].
///
/// Iteration ends after the entry flagged as the last one or when the node is exhausted.
/// An entry with inconsistent sizes ends the iteration after the error has been returned.
///
/// This iterator is returned from the [`NtfsIndexNode::entries`] function.
#[derive(Clone, Debug)]
pub struct NtfsIndexNodeEntries<'d> {
    data: &'d [u8],
    position: usize,
}

impl<'d> NtfsIndexNodeEntries<'d> {
    pub(crate) fn new(data: &'d [u8], position: usize) -> Self {
        Self { data, position }
    }

    fn read_entry(&self) -> Result<NtfsIndexEntry<'d>> {
        let header = read_struct::<IndexEntryHeader>(self.data, 0, self.position)?;
        let index_entry_length = header.index_entry_length.get();
        let key_length = header.key_length.get();
        let flags = NtfsIndexEntryFlags::from_bits_retain(header.flags.get());

        let mut expected = INDEX_ENTRY_HEADER_SIZE;
        if flags.contains(NtfsIndexEntryFlags::HAS_SUBNODE) {
            expected += mem::size_of::<u64>();
        }

        if (index_entry_length as usize) < expected {
            return Err(NtfsError::InvalidIndexEntrySize {
                position: self.position,
                expected,
                actual: index_entry_length,
            });
        }

        if index_entry_length as usize > self.data.len() {
            return Err(NtfsError::IndexEntryExceedsNode {
                position: self.position,
                actual: index_entry_length,
                remaining: self.data.len(),
            });
        }

        if !flags.contains(NtfsIndexEntryFlags::LAST_ENTRY)
            && INDEX_ENTRY_HEADER_SIZE + key_length as usize > index_entry_length as usize
        {
            return Err(NtfsError::InvalidIndexEntryKeyLength {
                position: self.position,
                key_length,
                entry_length: index_entry_length,
            });
        }

        Ok(NtfsIndexEntry {
            data: &self.data[..index_entry_length as usize],
            position: self.position,
        })
    }
}

impl<'d> Iterator for NtfsIndexNodeEntries<'d> {
    type Item = Result<NtfsIndexEntry<'d>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.is_empty() {
            return None;
        }

        let entry = match self.read_entry() {
            Ok(entry) => entry,
            Err(e) => {
                // Ensure that we don't read any other entries by emptying the slice.
                self.data = &[];
                return Some(Err(e));
            }
        };

        if entry.is_last() {
            // This is the last entry.
            self.data = &[];
        } else {
            // This is not the last entry.
            // Advance our iterator to the next entry.
            let bytes_to_advance = entry.index_entry_length() as usize;
            self.data = &self.data[bytes_to_advance..];
            self.position += bytes_to_advance;
        }

        Some(Ok(entry))
    }
}

impl<'d> FusedIterator for NtfsIndexNodeEntries<'d> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::tests::{file_name_value, index_entry, index_node};
    use crate::structured_values::NtfsFileNamespace;
    use alloc::vec::Vec;

    #[test]
    fn test_index_node() {
        let key = file_name_value(NtfsFileReference::new(5, 5), "file.txt", 1, 0);
        let node = index_node(
            &[
                index_entry(NtfsFileReference::new(64, 2), &key, None, false),
                index_entry(NtfsFileReference::default(), &[], Some(7), true),
            ],
            false,
            0,
        );

        let node = NtfsIndexNode::new(&node, 0x100).unwrap();
        assert!(!node.has_subnodes());
        assert_eq!(node.position(), 0x100);

        let entries = node.entries().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].position(), 0x110);
        assert_eq!(entries[0].file_reference(), NtfsFileReference::new(64, 2));
        assert_eq!(entries[0].key_length() as usize, key.len());
        assert_eq!(entries[0].subnode_vcn(), None);

        let file_name = entries[0].key_file_name().unwrap().unwrap();
        assert_eq!(file_name.name().to_string_lossy(), "file.txt");
        assert!(file_name.namespace().is(NtfsFileNamespace::Win32));

        assert!(entries[1].is_last());
        assert_eq!(entries[1].key(), None);
        assert!(entries[1].key_file_name().is_none());
        assert_eq!(entries[1].subnode_vcn(), Some(Vcn::from(7)));
    }

    #[test]
    fn test_entries_stop_at_last_entry() {
        // Anything behind the last entry is slack space and must not be returned.
        let node = index_node(
            &[
                index_entry(NtfsFileReference::default(), &[], None, true),
                index_entry(NtfsFileReference::new(64, 2), &[0u8; 8], None, false),
            ],
            false,
            0,
        );

        let node = NtfsIndexNode::new(&node, 0).unwrap();
        assert_eq!(node.entries().count(), 1);
    }

    #[test]
    fn test_invalid_index_entries() {
        let mut entry = index_entry(NtfsFileReference::new(64, 2), &[0u8; 8], None, false);
        entry[8..10].copy_from_slice(&8u16.to_le_bytes());
        let node = index_node(&[entry], false, 0);

        let node = NtfsIndexNode::new(&node, 0).unwrap();
        let mut entries = node.entries();
        assert!(matches!(
            entries.next(),
            Some(Err(NtfsError::InvalidIndexEntrySize {
                expected: INDEX_ENTRY_HEADER_SIZE,
                actual: 8,
                ..
            }))
        ));
        assert!(entries.next().is_none());

        let mut entry = index_entry(NtfsFileReference::new(64, 2), &[0u8; 8], None, false);
        entry[10..12].copy_from_slice(&100u16.to_le_bytes());
        let node = index_node(&[entry], false, 0);

        let node = NtfsIndexNode::new(&node, 0).unwrap();
        assert!(matches!(
            node.entries().next(),
            Some(Err(NtfsError::InvalidIndexEntryKeyLength { key_length: 100, .. }))
        ));
    }

    #[test]
    fn test_invalid_index_node() {
        let mut node = index_node(
            &[index_entry(NtfsFileReference::default(), &[], None, true)],
            false,
            0,
        );
        node[4..8].copy_from_slice(&0x1000u32.to_le_bytes());
        assert!(matches!(
            NtfsIndexNode::new(&node, 0),
            Err(NtfsError::InvalidIndexUsedSize { actual: 0x1000, .. })
        ));

        let mut node = index_node(
            &[index_entry(NtfsFileReference::default(), &[], None, true)],
            false,
            0,
        );
        node[0..4].copy_from_slice(&4u32.to_le_bytes());
        assert!(matches!(
            NtfsIndexNode::new(&node, 0),
            Err(NtfsError::InvalidIndexEntriesOffset { entries_offset: 4, .. })
        ));
    }
}
