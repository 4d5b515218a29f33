// Copyright 2021-2026 Colin Finck <colin@reactos.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use core::mem;

use memoffset::offset_of;
use zerocopy::{FromBytes, Immutable, KnownLayout, LittleEndian, Unaligned, I64, U64};

use crate::codec::read_struct;
use crate::error::{NtfsError, Result};
use crate::index_entry::{IndexNodeHeader, NtfsIndexNode, NtfsIndexNodeEntries};
use crate::record::{
    read_signature, MultiSectorHeader, NtfsFixupPolicy, NtfsFixupReport, NtfsRecordSignature,
    NtfsRecordSignatureValue, Record,
};
use crate::types::Vcn;

#[derive(FromBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
struct IndexRecordHeader {
    multi_sector_header: MultiSectorHeader,
    lsn: U64<LittleEndian>,
    vcn: I64<LittleEndian>,
}

/// Size of all [`IndexRecordHeader`] fields.
const INDEX_RECORD_HEADER_SIZE: usize = mem::size_of::<IndexRecordHeader>();

/// A single NTFS Index Record.
///
/// These records are denoted via an `INDX` signature on the filesystem.
/// They are stored in the $INDEX_ALLOCATION attribute of an index and form the sub-nodes of the
/// B-tree whose top-level node is stored in $INDEX_ROOT.
///
/// Locating an Index Record (e.g. via [`NtfsIndexEntry::subnode_vcn`] and
/// [`NtfsIndexRoot::index_record_byte_offset`]) and reading its bytes is up to the caller.
///
/// Reference: <https://flatcap.github.io/linux-ntfs/ntfs/concepts/index_record.html>
///
/// [`NtfsIndexEntry::subnode_vcn`]: crate::index_entry::NtfsIndexEntry::subnode_vcn
/// [`NtfsIndexRoot::index_record_byte_offset`]: crate::structured_values::NtfsIndexRoot::index_record_byte_offset
#[derive(Clone, Debug)]
pub struct NtfsIndexRecord<'d> {
    record: Record<'d>,
    node: NtfsIndexNode<'d>,
}

impl<'d> NtfsIndexRecord<'d> {
    /// Decodes the Index Record in `data`, applying its fixup in place with the default
    /// [`NtfsFixupPolicy::Lenient`].
    ///
    /// `position` is the absolute position of `data`, only used for error reporting.
    pub fn new(data: &'d mut [u8], position: usize) -> Result<Self> {
        Self::new_with_policy(data, position, NtfsFixupPolicy::default())
    }

    /// Decodes the Index Record in `data`, applying its fixup in place with the given policy.
    pub fn new_with_policy(
        data: &'d mut [u8],
        position: usize,
        policy: NtfsFixupPolicy,
    ) -> Result<Self> {
        Self::validate_signature(data, position)?;
        read_struct::<IndexRecordHeader>(data, 0, position)?;

        let record = Record::new(data, position, policy)?;
        let node = Self::validate_sizes(&record)?;

        Ok(Self { record, node })
    }

    /// Returns an iterator over all entries of this Index Record.
    pub fn entries(&self) -> NtfsIndexNodeEntries<'d> {
        self.node.entries()
    }

    /// Returns the report of the fixup applied to this Index Record.
    pub fn fixup_report(&self) -> &NtfsFixupReport {
        self.record.fixup_report()
    }

    /// Returns whether this index node has sub-nodes.
    /// Otherwise, this index node is a leaf node.
    pub fn has_subnodes(&self) -> bool {
        self.node.has_subnodes()
    }

    fn header(&self) -> Result<&'d IndexRecordHeader> {
        read_struct::<IndexRecordHeader>(self.record.data(), 0, self.record.position())
    }

    /// Returns the $LogFile Sequence Number (LSN) of the last change to this Index Record.
    pub fn lsn(&self) -> u64 {
        self.header().map(|header| header.lsn.get()).unwrap_or(0)
    }

    /// Returns the index node of this Index Record.
    pub fn node(&self) -> &NtfsIndexNode<'d> {
        &self.node
    }

    /// Returns the absolute position of this Index Record, in bytes.
    pub fn position(&self) -> usize {
        self.record.position()
    }

    /// Returns the signature of this record, which is always `INDX`.
    pub fn signature(&self) -> NtfsRecordSignatureValue {
        self.record.signature()
    }

    fn validate_signature(data: &[u8], position: usize) -> Result<()> {
        let signature = read_signature(data, position)?;

        if NtfsRecordSignatureValue::decode(signature).is(NtfsRecordSignature::Indx) {
            Ok(())
        } else {
            Err(NtfsError::InvalidIndexSignature {
                position,
                actual: signature,
            })
        }
    }

    fn validate_sizes(record: &Record<'d>) -> Result<NtfsIndexNode<'d>> {
        let index_record_size = record.len();
        let node_position = record.position() + INDEX_RECORD_HEADER_SIZE;
        let node_header =
            read_struct::<IndexNodeHeader>(record.data(), INDEX_RECORD_HEADER_SIZE, record.position())?;

        // The total size allocated for this index record must not be larger than
        // the size of the buffer holding it.
        let total_allocated_size =
            INDEX_RECORD_HEADER_SIZE + node_header.allocated_size.get() as usize;
        if total_allocated_size > index_record_size {
            return Err(NtfsError::InvalidIndexAllocatedSize {
                position: node_position + offset_of!(IndexNodeHeader, allocated_size),
                expected: index_record_size,
                actual: total_allocated_size,
            });
        }

        // Furthermore, the total used size for this index record must not be
        // larger than the total allocated size.
        let total_used_size = INDEX_RECORD_HEADER_SIZE + node_header.index_size.get() as usize;
        if total_used_size > total_allocated_size {
            return Err(NtfsError::InvalidIndexUsedSize {
                position: node_position + offset_of!(IndexNodeHeader, index_size),
                expected: total_allocated_size,
                actual: total_used_size,
            });
        }

        let node_data = &record.data()[INDEX_RECORD_HEADER_SIZE..total_allocated_size];
        NtfsIndexNode::new(node_data, node_position)
    }

    /// Returns the Virtual Cluster Number (VCN) of this Index Record, as referenced by the
    /// [`NtfsIndexEntry::subnode_vcn`] of its parent node.
    ///
    /// [`NtfsIndexEntry::subnode_vcn`]: crate::index_entry::NtfsIndexEntry::subnode_vcn
    pub fn vcn(&self) -> Vcn {
        let vcn = self.header().map(|header| header.vcn.get()).unwrap_or(0);
        Vcn::from(vcn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_reference::NtfsFileReference;
    use crate::helpers::tests::{file_name_value, index_entry, index_node, index_record};
    use alloc::vec::Vec;

    fn sample_index_record() -> Vec<u8> {
        let first = file_name_value(NtfsFileReference::new(5, 5), "alpha.txt", 1, 0);
        let second = file_name_value(NtfsFileReference::new(5, 5), "beta.txt", 1, 0);
        let node = index_node(
            &[
                index_entry(NtfsFileReference::new(64, 1), &first, None, false),
                index_entry(NtfsFileReference::new(65, 1), &second, None, false),
                index_entry(NtfsFileReference::default(), &[], None, true),
            ],
            false,
            0x18,
        );

        index_record(4, &node, 4096)
    }

    #[test]
    fn test_index_record() {
        let mut data = sample_index_record();
        let index_record = NtfsIndexRecord::new(&mut data, 0x8000).unwrap();

        assert!(index_record.signature().is(NtfsRecordSignature::Indx));
        assert_eq!(index_record.vcn(), Vcn::from(4));
        assert_eq!(index_record.position(), 0x8000);
        assert!(!index_record.has_subnodes());
        assert_eq!(index_record.node().allocated_size(), 4096 - 0x18);

        let report = index_record.fixup_report();
        assert_eq!(report.sector_count(), 8);
        assert_eq!(report.applied_count(), 8);
        assert!(report.is_verified());

        let names = index_record
            .entries()
            .filter_map(|entry| {
                let entry = entry.unwrap();
                let file_name = entry.key_file_name()?.unwrap();
                Some(file_name.name().to_string_lossy())
            })
            .collect::<Vec<_>>();
        assert_eq!(names, ["alpha.txt", "beta.txt"]);
    }

    #[test]
    fn test_invalid_index_signature() {
        let mut data = sample_index_record();
        data[..4].copy_from_slice(b"FILE");

        assert!(matches!(
            NtfsIndexRecord::new(&mut data, 0),
            Err(NtfsError::InvalidIndexSignature {
                actual: [b'F', b'I', b'L', b'E'],
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_index_allocated_size() {
        let mut data = sample_index_record();
        let start = INDEX_RECORD_HEADER_SIZE + offset_of!(IndexNodeHeader, allocated_size);
        data[start..start + 4].copy_from_slice(&0x2000u32.to_le_bytes());

        assert!(matches!(
            NtfsIndexRecord::new(&mut data, 0),
            Err(NtfsError::InvalidIndexAllocatedSize {
                expected: 4096,
                actual: 0x2018,
                ..
            })
        ));
    }

    #[test]
    fn test_strict_index_record() {
        let mut data = sample_index_record();

        // Damage the tail of the last sector.
        data[4094..4096].copy_from_slice(&[0xAB, 0xCD]);
        let pristine = data.clone();

        assert!(matches!(
            NtfsIndexRecord::new_with_policy(&mut data, 0, NtfsFixupPolicy::Strict),
            Err(NtfsError::UpdateSequenceNumberMismatch { .. })
        ));
        assert_eq!(data, pristine);

        let index_record = NtfsIndexRecord::new(&mut data, 0).unwrap();
        assert_eq!(index_record.fixup_report().mismatches().len(), 1);
        assert_eq!(index_record.entries().count(), 3);
    }
}
