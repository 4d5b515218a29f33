// Copyright 2021-2026 Colin Finck <colin@reactos.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use core::mem;

use enumn::N;
use strum_macros::Display;
use zerocopy::{FromBytes, Immutable, KnownLayout, LittleEndian, Unaligned, U32};

use crate::attribute::{NtfsAttributeType, NtfsAttributeTypeCode};
use crate::codec::{read_struct, NtfsEnum, NtfsEnumValue};
use crate::error::Result;
use crate::index_entry::{IndexNodeHeader, NtfsIndexNode, NtfsIndexNodeEntries};
use crate::record::NTFS_BLOCK_SIZE;
use crate::structured_values::{ensure_min_size, NtfsResidentStructuredValue};
use crate::types::Vcn;

#[derive(Clone, Copy, Debug, FromBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
struct IndexRootHeader {
    ty: U32<LittleEndian>,
    collation_rule: U32<LittleEndian>,
    index_record_size: U32<LittleEndian>,
    clusters_per_index_record: i8,
    reserved: [u8; 3],
}

/// Size of all [`IndexRootHeader`] fields.
const INDEX_ROOT_HEADER_SIZE: usize = mem::size_of::<IndexRootHeader>();

/// Rule used to sort the keys of an index, returned by [`NtfsIndexRoot::collation_rule`].
///
/// Reference: <https://flatcap.github.io/linux-ntfs/ntfs/attributes/index_root.html>
#[derive(Clone, Copy, Debug, Display, Eq, Hash, N, PartialEq)]
#[repr(u32)]
pub enum NtfsCollationRule {
    /// Byte-wise comparison.
    Binary = 0x00,
    /// Case-insensitive comparison of filenames, as used by every directory index.
    FileName = 0x01,
    /// Comparison of UTF-16 strings.
    UnicodeString = 0x02,
    /// Comparison of a single little-endian 32-bit integer.
    NtofsUlong = 0x10,
    /// Comparison of Security Identifiers.
    NtofsSid = 0x11,
    /// Comparison of a security hash followed by a security identifier ($Secure:$SDH).
    NtofsSecurityHash = 0x12,
    /// Comparison of multiple little-endian 32-bit integers.
    NtofsUlongs = 0x13,
}

impl NtfsEnum for NtfsCollationRule {
    type Raw = u32;

    fn from_raw(raw: u32) -> Option<Self> {
        Self::n(raw)
    }

    fn to_raw(self) -> u32 {
        self as u32
    }
}

/// Decoded collation rule of an [`NtfsIndexRoot`].
pub type NtfsCollationRuleValue = NtfsEnumValue<NtfsCollationRule, u32>;

/// Structure of an $INDEX_ROOT attribute.
///
/// This attribute describes the top-level nodes of a B-tree.
/// The sub-nodes are managed via [`NtfsIndexRecord`]s stored in the $INDEX_ALLOCATION attribute
/// of the same name.
///
/// NTFS uses B-trees for describing directories (as indexes of [`NtfsFileName`]s), looking up Object IDs,
/// Reparse Points, and Security Descriptors, to just name a few.
///
/// An $INDEX_ROOT attribute is always resident.
///
/// Reference: <https://flatcap.github.io/linux-ntfs/ntfs/attributes/index_root.html>
///
/// [`NtfsFileName`]: crate::structured_values::NtfsFileName
/// [`NtfsIndexRecord`]: crate::index_record::NtfsIndexRecord
#[derive(Clone, Debug)]
pub struct NtfsIndexRoot<'d> {
    header: IndexRootHeader,
    node: NtfsIndexNode<'d>,
}

impl<'d> NtfsIndexRoot<'d> {
    /// Returns the number of clusters allocated for every [`NtfsIndexRecord`] of this index.
    /// A negative value `-n` denotes `2^n` bytes instead.
    ///
    /// [`NtfsIndexRecord`]: crate::index_record::NtfsIndexRecord
    pub fn clusters_per_index_record(&self) -> i8 {
        self.header.clusters_per_index_record
    }

    /// Returns the rule used to sort the keys of this index.
    pub fn collation_rule(&self) -> NtfsCollationRuleValue {
        NtfsCollationRuleValue::decode(self.header.collation_rule.get())
    }

    /// Returns an iterator over all top-level entries of this index.
    pub fn entries(&self) -> NtfsIndexNodeEntries<'d> {
        self.node.entries()
    }

    /// Returns the byte offset of the [`NtfsIndexRecord`] with the given VCN within the
    /// $INDEX_ALLOCATION attribute, or `None` if the offset cannot be represented.
    ///
    /// Index records smaller than a cluster are addressed in units of 512 bytes,
    /// all others in units of clusters.
    ///
    /// [`NtfsIndexRecord`]: crate::index_record::NtfsIndexRecord
    pub fn index_record_byte_offset(&self, vcn: Vcn, cluster_size: u32) -> Option<u64> {
        if self.index_record_size() >= cluster_size {
            vcn.offset(cluster_size)
        } else {
            vcn.offset(NTFS_BLOCK_SIZE as u32)
        }
    }

    /// Returns the size of a single [`NtfsIndexRecord`] of this index, in bytes.
    ///
    /// [`NtfsIndexRecord`]: crate::index_record::NtfsIndexRecord
    pub fn index_record_size(&self) -> u32 {
        self.header.index_record_size.get()
    }

    /// Returns whether the index belonging to this Index Root is large enough
    /// to need an extra Index Allocation attribute.
    /// Otherwise, the entire index information is stored in this Index Root.
    pub fn is_large_index(&self) -> bool {
        self.node.has_subnodes()
    }

    /// Returns the index node stored in this Index Root.
    pub fn node(&self) -> &NtfsIndexNode<'d> {
        &self.node
    }

    /// Returns the type of the attribute that is indexed, or [`NtfsAttributeTypeCode::Unrecognized`]
    /// with a zero value for indexes that are not about attribute values (e.g. $Secure:$SDH).
    pub fn ty(&self) -> NtfsAttributeTypeCode {
        NtfsAttributeTypeCode::decode(self.header.ty.get())
    }
}

impl<'d> NtfsResidentStructuredValue<'d> for NtfsIndexRoot<'d> {
    const TY: NtfsAttributeType = NtfsAttributeType::IndexRoot;

    fn from_resident_value(value: &'d [u8], position: usize) -> Result<Self> {
        ensure_min_size(
            value,
            position,
            Self::TY,
            INDEX_ROOT_HEADER_SIZE + mem::size_of::<IndexNodeHeader>(),
        )?;

        let header = *read_struct::<IndexRootHeader>(value, 0, position)?;
        let node = NtfsIndexNode::new(
            &value[INDEX_ROOT_HEADER_SIZE..],
            position + INDEX_ROOT_HEADER_SIZE,
        )?;

        Ok(Self { header, node })
    }
}
