// Copyright 2021-2026 Colin Finck <colin@reactos.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use alloc::vec::Vec;
use core::mem;

use bitflags::bitflags;
use memoffset::offset_of;
use zerocopy::{FromBytes, Immutable, KnownLayout, LittleEndian, Unaligned, U16, U32, U64};

use crate::attribute::{NtfsAttribute, NtfsAttributeType, NtfsAttributes};
use crate::codec::read_struct;
use crate::error::{NtfsError, Result};
use crate::file_reference::NtfsFileReference;
use crate::record::{
    read_signature, MultiSectorHeader, NtfsFixupPolicy, NtfsFixupReport, NtfsRecordSignature,
    NtfsRecordSignatureValue, Record,
};
use crate::structured_values::{NtfsFileName, NtfsStandardInformation};

#[derive(Clone, Copy, Debug, FromBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
struct FileRecordHeader {
    multi_sector_header: MultiSectorHeader,
    lsn: U64<LittleEndian>,
    sequence_number: U16<LittleEndian>,
    reference_count: U16<LittleEndian>,
    first_attribute_offset: U16<LittleEndian>,
    flags: U16<LittleEndian>,
    used_size: U32<LittleEndian>,
    total_size: U32<LittleEndian>,
    base_file_record: NtfsFileReference,
    first_attribute_id: U16<LittleEndian>,
    reserved: [u8; 2],
    record_number: U32<LittleEndian>,
}

/// Size of all [`FileRecordHeader`] fields.
const FILE_RECORD_HEADER_SIZE: usize = mem::size_of::<FileRecordHeader>();

bitflags! {
    /// Flags returned by [`NtfsMftRecord::flags`].
    #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
    pub struct NtfsFileRecordFlags: u16 {
        /// Record is in use.
        /// Records without this flag belong to deleted files and are only interesting for recovery.
        const IN_USE = 0x0001;
        /// Record has an index, which usually means that it is a directory.
        const HAS_INDEX = 0x0002;
    }
}

/// A single decoded entry of the Master File Table (MFT), also known as a File Record.
///
/// Decoding happens in one go:
/// The fixup is applied in place, the header is validated and all attributes are decoded
/// in the order they are stored.
/// An attribute that fails to decode doesn't prevent decoding the others.
/// Such failures are collected and returned by [`NtfsMftRecord::errors`].
///
/// Reference: <https://flatcap.github.io/linux-ntfs/ntfs/concepts/file_record.html>
#[derive(Clone, Debug)]
pub struct NtfsMftRecord<'d> {
    record: Record<'d>,
    header: FileRecordHeader,
    attributes: Vec<NtfsAttribute<'d>>,
    errors: Vec<NtfsError>,
}

impl<'d> NtfsMftRecord<'d> {
    /// Decodes the MFT entry in `data`, applying its fixup in place with the default
    /// [`NtfsFixupPolicy::Lenient`].
    ///
    /// `position` is the absolute position of `data`, only used for error reporting.
    pub fn new(data: &'d mut [u8], position: usize) -> Result<Self> {
        Self::new_with_policy(data, position, NtfsFixupPolicy::default())
    }

    /// Decodes the MFT entry in `data`, applying its fixup in place with the given policy.
    ///
    /// With [`NtfsFixupPolicy::Strict`], a failed fixup check returns an error and leaves `data` untouched.
    pub fn new_with_policy(
        data: &'d mut [u8],
        position: usize,
        policy: NtfsFixupPolicy,
    ) -> Result<Self> {
        read_struct::<FileRecordHeader>(data, 0, position)?;
        Self::validate_signature(data, position)?;

        let record = Record::new(data, position, policy)?;
        let header = *read_struct::<FileRecordHeader>(record.data(), 0, position)?;
        Self::validate_sizes(&record, &header)?;

        let mut mft_record = Self {
            record,
            header,
            attributes: Vec::new(),
            errors: Vec::new(),
        };

        for attribute in mft_record.attribute_stream() {
            match attribute {
                Ok(attribute) => mft_record.attributes.push(attribute),
                Err(e) => mft_record.errors.push(e),
            }
        }

        Ok(mft_record)
    }

    /// Returns the first attribute of the given type, if any.
    pub fn attribute_by_ty(&self, ty: NtfsAttributeType) -> Option<&NtfsAttribute<'d>> {
        self.attributes_by_ty(ty).next()
    }

    /// Returns all decoded attributes in the order they are stored.
    pub fn attributes(&self) -> &[NtfsAttribute<'d>] {
        &self.attributes
    }

    /// Returns an iterator over all attributes of the given type, in the order they are stored.
    pub fn attributes_by_ty(
        &self,
        ty: NtfsAttributeType,
    ) -> impl Iterator<Item = &NtfsAttribute<'d>> + '_ {
        self.attributes
            .iter()
            .filter(move |attribute| attribute.ty().is(ty))
    }

    /// Returns a fresh iterator over the attribute stream of this MFT entry.
    ///
    /// This is the iterator that [`NtfsMftRecord::attributes`] and [`NtfsMftRecord::errors`]
    /// have been built from.
    pub fn attribute_stream(&self) -> NtfsAttributes<'d> {
        let used_size = self.used_size() as usize;
        NtfsAttributes::new(
            &self.record.data()[..used_size],
            self.record.position(),
            self.first_attribute_offset() as usize,
        )
    }

    /// Returns a reference to the base MFT entry if this is an extension entry,
    /// or a zero reference if this is a base entry itself.
    pub fn base_file_record(&self) -> NtfsFileReference {
        self.header.base_file_record
    }

    /// Returns the unnamed $DATA attribute if `name` is empty, otherwise the $DATA attribute
    /// of the Alternate Data Stream (ADS) with the given name.
    ///
    /// Names are compared case-sensitively.
    pub fn data(&self, name: &str) -> Option<&NtfsAttribute<'d>> {
        self.attributes_by_ty(NtfsAttributeType::Data)
            .find(|attribute| attribute.name().u16_iter().eq(name.encode_utf16()))
    }

    /// Returns the errors of all attributes that could not be decoded.
    ///
    /// If the attribute stream itself was broken, its error is the last one.
    /// All attributes before it are still available via [`NtfsMftRecord::attributes`].
    pub fn errors(&self) -> &[NtfsError] {
        &self.errors
    }

    /// Returns the first $FILE_NAME attribute, which describes the primary hard link of this file.
    ///
    /// Returns `None` if there is no such attribute or an error if it cannot be decoded.
    pub fn file_name(&self) -> Option<Result<NtfsFileName<'d>>> {
        self.file_names().next()
    }

    /// Returns the decoded $FILE_NAME attributes of all hard links and short names of this file.
    pub fn file_names(&self) -> impl Iterator<Item = Result<NtfsFileName<'d>>> + '_ {
        self.attributes_by_ty(NtfsAttributeType::FileName)
            .map(|attribute| attribute.resident_structured_value::<NtfsFileName>())
    }

    /// Returns the identifier that the next new attribute of this MFT entry will get.
    pub fn first_attribute_id(&self) -> u16 {
        self.header.first_attribute_id.get()
    }

    /// Returns the offset of the first attribute, in bytes from the beginning of this MFT entry.
    pub fn first_attribute_offset(&self) -> u16 {
        self.header.first_attribute_offset.get()
    }

    /// Returns the report of the fixup applied to this MFT entry.
    pub fn fixup_report(&self) -> &NtfsFixupReport {
        self.record.fixup_report()
    }

    /// Returns the flags of this MFT entry.
    pub fn flags(&self) -> NtfsFileRecordFlags {
        NtfsFileRecordFlags::from_bits_retain(self.header.flags.get())
    }

    /// Returns `true` if this is a base entry and not an extension entry of another file.
    pub fn is_base_record(&self) -> bool {
        self.base_file_record() == NtfsFileReference::default()
    }

    /// Returns `true` if all attributes could be decoded.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns `true` if this MFT entry has an index, which is the case for directories.
    pub fn is_directory(&self) -> bool {
        self.flags().contains(NtfsFileRecordFlags::HAS_INDEX)
    }

    /// Returns `true` if this MFT entry belongs to an existing file.
    pub fn is_in_use(&self) -> bool {
        self.flags().contains(NtfsFileRecordFlags::IN_USE)
    }

    /// Returns `true` if every sector of this MFT entry passed the fixup check.
    pub fn is_verified(&self) -> bool {
        self.fixup_report().is_verified()
    }

    /// Returns the $LogFile Sequence Number (LSN) of the last change to this MFT entry.
    pub fn lsn(&self) -> u64 {
        self.header.lsn.get()
    }

    /// Returns the absolute position of this MFT entry, in bytes.
    pub fn position(&self) -> usize {
        self.record.position()
    }

    /// Returns the raw value of the record number field.
    ///
    /// NTFS 3.1 stores the File Record Number of the entry here, but older versions leave it undefined.
    pub fn record_number(&self) -> u32 {
        self.header.record_number.get()
    }

    /// Returns the raw value of the reference count field, which usually equals the number of hard links.
    pub fn reference_count(&self) -> u16 {
        self.header.reference_count.get()
    }

    /// Returns the sequence number of this MFT entry.
    ///
    /// See [`NtfsFileReference::is_stale`] for its purpose.
    pub fn sequence_number(&self) -> u16 {
        self.header.sequence_number.get()
    }

    /// Returns the signature of this MFT entry, either `FILE` or `BAAD`.
    pub fn signature(&self) -> NtfsRecordSignatureValue {
        NtfsRecordSignatureValue::decode(self.header.multi_sector_header.signature)
    }

    /// Returns the $STANDARD_INFORMATION attribute of this file.
    ///
    /// Returns `None` if there is no such attribute or an error if it cannot be decoded.
    pub fn standard_information(&self) -> Option<Result<NtfsStandardInformation>> {
        self.attribute_by_ty(NtfsAttributeType::StandardInformation)
            .map(|attribute| attribute.resident_structured_value::<NtfsStandardInformation>())
    }

    /// Returns the number of bytes allocated for this MFT entry.
    pub fn total_size(&self) -> u32 {
        self.header.total_size.get()
    }

    /// Returns the number of bytes actually used by this MFT entry.
    pub fn used_size(&self) -> u32 {
        self.header.used_size.get()
    }

    fn validate_signature(data: &[u8], position: usize) -> Result<()> {
        let signature = read_signature(data, position)?;
        let signature_value = NtfsRecordSignatureValue::decode(signature);

        if signature_value.is(NtfsRecordSignature::File) {
            Ok(())
        } else if signature_value.is(NtfsRecordSignature::Baad) {
            log::warn!(
                "The File Record at {:#x} has been marked as bad, decoding it anyway",
                position
            );
            Ok(())
        } else {
            Err(NtfsError::InvalidFileSignature {
                position,
                actual: signature,
            })
        }
    }

    fn validate_sizes(record: &Record<'d>, header: &FileRecordHeader) -> Result<()> {
        let position = record.position();
        let total_size = header.total_size.get();
        let used_size = header.used_size.get();
        let first_attribute_offset = header.first_attribute_offset.get();

        if total_size as usize > record.len() {
            return Err(NtfsError::InvalidFileTotalSize {
                position: position + offset_of!(FileRecordHeader, total_size),
                total_size,
                buffer_size: record.len(),
            });
        }

        if used_size > total_size {
            return Err(NtfsError::InvalidFileUsedSize {
                position: position + offset_of!(FileRecordHeader, used_size),
                used_size,
                total_size,
            });
        }

        let expected = FILE_RECORD_HEADER_SIZE as u32..used_size + 1;
        if !expected.contains(&u32::from(first_attribute_offset)) {
            return Err(NtfsError::InvalidFirstAttributeOffset {
                position: position + offset_of!(FileRecordHeader, first_attribute_offset),
                expected,
                actual: first_attribute_offset,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NtfsErrorKind;
    use crate::helpers::tests::{
        file_name_value, mft_record, named_resident_attribute, non_resident_attribute,
        resident_attribute, standard_information_value, MftRecordBuilder,
    };
    use crate::structured_values::NtfsFileNamespace;
    use crate::time::tests::NT_TIMESTAMP_2021_01_01;
    use alloc::vec;

    fn sample_record() -> Vec<u8> {
        let parent = NtfsFileReference::new(5, 5);
        mft_record(&[
            resident_attribute(0x10, &standard_information_value(NT_TIMESTAMP_2021_01_01, 0x20)),
            resident_attribute(
                0x30,
                &file_name_value(parent, "document.txt", 1, NT_TIMESTAMP_2021_01_01),
            ),
            resident_attribute(0x80, b"Hello, NTFS!"),
        ])
    }

    #[test]
    fn test_mft_record() {
        let mut data = sample_record();
        let mft_record = NtfsMftRecord::new(&mut data, 0x4_0000).unwrap();

        assert!(mft_record.signature().is(NtfsRecordSignature::File));
        assert_eq!(mft_record.position(), 0x4_0000);
        assert_eq!(mft_record.total_size(), 1024);
        assert_eq!(mft_record.first_attribute_offset(), 0x38);
        assert!(mft_record.is_in_use());
        assert!(!mft_record.is_directory());
        assert!(mft_record.is_base_record());
        assert!(mft_record.is_verified());
        assert!(mft_record.is_complete());
        assert_eq!(mft_record.fixup_report().applied_count(), 2);

        let attributes = mft_record.attributes();
        assert_eq!(attributes.len(), 3);
        assert!(attributes[0].ty().is(NtfsAttributeType::StandardInformation));
        assert!(attributes[1].ty().is(NtfsAttributeType::FileName));
        assert!(attributes[2].ty().is(NtfsAttributeType::Data));

        let standard_information = mft_record.standard_information().unwrap().unwrap();
        assert_eq!(
            standard_information.creation_time().nt_timestamp(),
            NT_TIMESTAMP_2021_01_01
        );

        let file_name = mft_record.file_name().unwrap().unwrap();
        assert_eq!(file_name.name().to_string_lossy(), "document.txt");
        assert!(file_name.namespace().is(NtfsFileNamespace::Win32));
        assert_eq!(file_name.parent_directory_reference().file_record_number(), 5);

        let data_attribute = mft_record.data("").unwrap();
        assert_eq!(data_attribute.resident_value(), Some(&b"Hello, NTFS!"[..]));
        assert!(mft_record.data("Zone.Identifier").is_none());
    }

    #[test]
    fn test_header_fields() {
        let mut data = MftRecordBuilder::new()
            .sequence_number(7)
            .reference_count(2)
            .flags(0x0003)
            .lsn(0x1234_5678)
            .base_file_record(NtfsFileReference::new(0x40, 3))
            .record_number(0x41)
            .build(&[]);
        let mft_record = NtfsMftRecord::new(&mut data, 0).unwrap();

        assert_eq!(mft_record.sequence_number(), 7);
        assert_eq!(mft_record.reference_count(), 2);
        assert_eq!(mft_record.lsn(), 0x1234_5678);
        assert!(mft_record.is_in_use());
        assert!(mft_record.is_directory());
        assert!(!mft_record.is_base_record());
        assert_eq!(mft_record.base_file_record().file_record_number(), 0x40);
        assert_eq!(mft_record.record_number(), 0x41);
        assert!(mft_record.attributes().is_empty());
        assert!(mft_record.file_name().is_none());
    }

    #[test]
    fn test_named_data_stream() {
        let mut data = mft_record(&[
            resident_attribute(0x80, b"unnamed"),
            named_resident_attribute(0x80, "Zone.Identifier", b"[ZoneTransfer]"),
        ]);
        let mft_record = NtfsMftRecord::new(&mut data, 0).unwrap();

        let ads = mft_record.data("Zone.Identifier").unwrap();
        assert_eq!(ads.resident_value(), Some(&b"[ZoneTransfer]"[..]));
        assert_eq!(
            mft_record.data("").unwrap().resident_value(),
            Some(&b"unnamed"[..])
        );
        assert_eq!(mft_record.attributes_by_ty(NtfsAttributeType::Data).count(), 2);
    }

    #[test]
    fn test_non_resident_attribute() {
        let mut data = mft_record(&[non_resident_attribute(
            0x80,
            0,
            0x0F,
            0,
            Some((0x10000, 0xF123, 0xF123)),
            &[0x11, 0x10, 0x20, 0x00],
        )]);
        let mft_record = NtfsMftRecord::new(&mut data, 0).unwrap();

        let attribute = mft_record.data("").unwrap();
        assert!(!attribute.is_resident());
        assert_eq!(attribute.value_length(), Some(0xF123));
        assert_eq!(attribute.data_runs().unwrap().count(), 1);
    }

    #[test]
    fn test_malformed_attribute_keeps_previous_attributes() {
        let mut broken = resident_attribute(0x80, b"broken");
        broken[4..8].copy_from_slice(&0x1Cu32.to_le_bytes());

        let mut data = mft_record(&[
            resident_attribute(0x10, &standard_information_value(0, 0)),
            broken,
            resident_attribute(0x80, b"unreachable"),
        ]);
        let mft_record = NtfsMftRecord::new(&mut data, 0).unwrap();

        assert_eq!(mft_record.attributes().len(), 1);
        assert_eq!(mft_record.errors().len(), 1);
        assert!(!mft_record.is_complete());
        assert_eq!(
            mft_record.errors()[0].kind(),
            NtfsErrorKind::MalformedAttribute
        );
    }

    #[test]
    fn test_invalid_signature() {
        let mut data = sample_record();
        data[..4].copy_from_slice(b"INDX");

        assert!(matches!(
            NtfsMftRecord::new(&mut data, 0),
            Err(NtfsError::InvalidFileSignature { .. })
        ));
    }

    #[test]
    fn test_baad_signature() {
        let mut data = sample_record();
        data[..4].copy_from_slice(b"BAAD");

        let mft_record = NtfsMftRecord::new(&mut data, 0).unwrap();
        assert!(mft_record.signature().is(NtfsRecordSignature::Baad));
        assert_eq!(mft_record.attributes().len(), 3);
    }

    #[test]
    fn test_truncated_header() {
        let mut data = vec![0u8; 40];
        data[..4].copy_from_slice(b"FILE");

        assert!(matches!(
            NtfsMftRecord::new(&mut data, 0),
            Err(NtfsError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_invalid_sizes() {
        let total_size_offset = offset_of!(FileRecordHeader, total_size);
        let used_size_offset = offset_of!(FileRecordHeader, used_size);
        let first_attribute_offset = offset_of!(FileRecordHeader, first_attribute_offset);

        let mut data = sample_record();
        data[total_size_offset..total_size_offset + 4].copy_from_slice(&2048u32.to_le_bytes());
        let error = NtfsMftRecord::new(&mut data, 0).unwrap_err();
        assert!(matches!(
            error,
            NtfsError::InvalidFileTotalSize {
                total_size: 2048,
                buffer_size: 1024,
                ..
            }
        ));
        assert_eq!(error.kind(), NtfsErrorKind::MalformedHeader);

        let mut data = sample_record();
        data[used_size_offset..used_size_offset + 4].copy_from_slice(&1028u32.to_le_bytes());
        assert!(matches!(
            NtfsMftRecord::new(&mut data, 0),
            Err(NtfsError::InvalidFileUsedSize { used_size: 1028, .. })
        ));

        let mut data = sample_record();
        data[first_attribute_offset..first_attribute_offset + 2]
            .copy_from_slice(&0x20u16.to_le_bytes());
        assert!(matches!(
            NtfsMftRecord::new(&mut data, 0),
            Err(NtfsError::InvalidFirstAttributeOffset { actual: 0x20, .. })
        ));
    }
}
