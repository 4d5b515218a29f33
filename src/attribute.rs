// Copyright 2021-2026 Colin Finck <colin@reactos.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use core::iter::FusedIterator;
use core::mem;

use bitflags::bitflags;
use enumn::N;
use memoffset::offset_of;
use nt_string::u16strle::U16StrLe;
use strum_macros::Display;
use zerocopy::{FromBytes, Immutable, KnownLayout, LittleEndian, Unaligned, I64, U16, U32, U64};

use crate::codec::{read_bytes, read_struct, read_u32, read_u64, NtfsEnum, NtfsEnumValue};
use crate::data_runs::NtfsDataRuns;
use crate::error::{NtfsError, Result};
use crate::structured_values::{
    NtfsAttributeList, NtfsFileName, NtfsIndexRoot, NtfsObjectId, NtfsResidentStructuredValue,
    NtfsSecurityDescriptor, NtfsStandardInformation, NtfsStructuredValue, NtfsVolumeInformation,
    NtfsVolumeName,
};
use crate::types::Vcn;

/// On-disk structure of the generic header of an NTFS Attribute.
#[derive(FromBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
struct NtfsAttributeHeader {
    /// Type of the attribute, known types are in [`NtfsAttributeType`].
    ty: U32<LittleEndian>,
    /// Length of this attribute record, in bytes.
    length: U32<LittleEndian>,
    /// 0 if this attribute has a resident value, 1 if this attribute has a non-resident value.
    form_code: u8,
    /// Length of the name, in UTF-16 code points (every code point is 2 bytes).
    name_length: u8,
    /// Offset to the beginning of the name, in bytes from the beginning of this header.
    name_offset: U16<LittleEndian>,
    /// Flags of the attribute, known flags are in [`NtfsAttributeFlags`].
    flags: U16<LittleEndian>,
    /// Identifier of this attribute that is unique within the File Record.
    instance: U16<LittleEndian>,
}

/// On-disk structure of the extra header of an NTFS Attribute that has a resident value.
#[derive(FromBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
struct NtfsResidentAttributeHeader {
    attribute_header: NtfsAttributeHeader,
    /// Length of the value, in bytes.
    value_length: U32<LittleEndian>,
    /// Offset to the beginning of the value, in bytes from the beginning of the [`NtfsAttributeHeader`].
    value_offset: U16<LittleEndian>,
    index_flag: u8,
    reserved: u8,
}

/// On-disk structure of the extra header of an NTFS Attribute that has a non-resident value.
#[derive(FromBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
struct NtfsNonResidentAttributeHeader {
    attribute_header: NtfsAttributeHeader,
    /// Lower boundary of Virtual Cluster Numbers (VCNs) referenced by this attribute.
    /// This becomes relevant when file data is split over multiple attributes.
    /// Otherwise, it's zero.
    lowest_vcn: I64<LittleEndian>,
    /// Upper boundary of Virtual Cluster Numbers (VCNs) referenced by this attribute.
    /// This may even be -1 for zero-length values.
    highest_vcn: I64<LittleEndian>,
    /// Offset to the beginning of the mapping pairs, in bytes from the beginning of the [`NtfsAttributeHeader`].
    mapping_pairs_offset: U16<LittleEndian>,
    /// Binary exponent denoting the number of clusters in a compression unit.
    /// A typical value is 4, meaning that 2^4 = 16 clusters are part of a compression unit.
    compression_unit_size: U16<LittleEndian>,
    reserved: [u8; 4],
}

/// Size fields following [`NtfsNonResidentAttributeHeader`].
///
/// They are only meaningful in the attribute holding the lowest VCN 0.
#[derive(FromBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
struct NtfsNonResidentAttributeSizes {
    /// Allocated space for the attribute value, in bytes. This is always a multiple of the cluster size.
    allocated_length: U64<LittleEndian>,
    /// Size of the attribute value, in bytes.
    file_size: U64<LittleEndian>,
    /// Size of the initialized part of the attribute value, in bytes.
    valid_data_length: U64<LittleEndian>,
}

const NON_RESIDENT_SIZES_OFFSET: usize = mem::size_of::<NtfsNonResidentAttributeHeader>();
const TOTAL_ALLOCATED_OFFSET: usize =
    NON_RESIDENT_SIZES_OFFSET + mem::size_of::<NtfsNonResidentAttributeSizes>();

bitflags! {
    /// Flags returned by [`NtfsAttribute::flags`].
    #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
    pub struct NtfsAttributeFlags: u16 {
        /// Mask of the compression method bits.
        const COMPRESSION_MASK = 0x00FF;
        /// The attribute value is encrypted.
        const ENCRYPTED = 0x4000;
        /// The attribute value is stored sparsely.
        const SPARSE = 0x8000;
    }
}

impl NtfsAttributeFlags {
    /// Returns `true` if any compression method bit is set.
    pub fn is_compressed(&self) -> bool {
        self.intersects(Self::COMPRESSION_MASK)
    }
}

/// All known NTFS Attribute types.
///
/// Reference: <https://flatcap.github.io/linux-ntfs/ntfs/attributes/index.html>
#[derive(Clone, Copy, Debug, Display, Eq, Hash, N, PartialEq)]
#[repr(u32)]
pub enum NtfsAttributeType {
    /// $STANDARD_INFORMATION, see [`NtfsStandardInformation`].
    StandardInformation = 0x10,
    /// $ATTRIBUTE_LIST, see [`NtfsAttributeList`].
    AttributeList = 0x20,
    /// $FILE_NAME, see [`NtfsFileName`].
    FileName = 0x30,
    /// $OBJECT_ID, see [`NtfsObjectId`].
    ObjectId = 0x40,
    /// $SECURITY_DESCRIPTOR, see [`NtfsSecurityDescriptor`].
    SecurityDescriptor = 0x50,
    /// $VOLUME_NAME, see [`NtfsVolumeName`].
    VolumeName = 0x60,
    /// $VOLUME_INFORMATION, see [`NtfsVolumeInformation`].
    VolumeInformation = 0x70,
    /// $DATA
    Data = 0x80,
    /// $INDEX_ROOT, see [`NtfsIndexRoot`].
    IndexRoot = 0x90,
    /// $INDEX_ALLOCATION, a non-resident stream of [`NtfsIndexRecord`]s.
    ///
    /// [`NtfsIndexRecord`]: crate::index_record::NtfsIndexRecord
    IndexAllocation = 0xA0,
    /// $BITMAP
    Bitmap = 0xB0,
    /// $REPARSE_POINT
    ReparsePoint = 0xC0,
    /// $EA_INFORMATION
    EAInformation = 0xD0,
    /// $EA
    EA = 0xE0,
    /// $PROPERTY_SET
    PropertySet = 0xF0,
    /// $LOGGED_UTILITY_STREAM
    LoggedUtilityStream = 0x100,
    /// Marks the end of the valid attributes.
    End = 0xFFFF_FFFF,
}

impl NtfsEnum for NtfsAttributeType {
    type Raw = u32;

    fn from_raw(raw: u32) -> Option<Self> {
        Self::n(raw)
    }

    fn to_raw(self) -> u32 {
        self as u32
    }
}

/// Decoded type code of an NTFS Attribute.
///
/// Vendor-specific type codes are retained as [`NtfsEnumValue::Unrecognized`].
pub type NtfsAttributeTypeCode = NtfsEnumValue<NtfsAttributeType, u32>;

/// Form-specific header fields of an NTFS Attribute.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NtfsAttributeForm {
    /// The value is stored inside the attribute record.
    Resident {
        value_length: u32,
        /// Offset of the value, in bytes from the beginning of the attribute.
        value_offset: u16,
        /// Raw byte without assigned meaning.
        index_flag: u8,
    },
    /// The value is stored in clusters described by mapping pairs.
    NonResident {
        lowest_vcn: Vcn,
        highest_vcn: Vcn,
        /// Offset of the mapping pairs, in bytes from the beginning of the attribute.
        mapping_pairs_offset: u16,
        /// Compression unit size as a binary exponent of clusters.
        compression_unit_size: u16,
        /// Only present if `lowest_vcn` is 0.
        allocated_length: Option<u64>,
        /// Only present if `lowest_vcn` is 0.
        file_size: Option<u64>,
        /// Only present if `lowest_vcn` is 0.
        valid_data_length: Option<u64>,
        /// Only present if `compression_unit_size` is nonzero.
        total_allocated: Option<u64>,
    },
}

impl NtfsAttributeForm {
    fn decode(data: &[u8], position: usize, form_code: u8) -> Result<Self> {
        match form_code {
            0 => {
                let header = read_struct::<NtfsResidentAttributeHeader>(data, 0, position)?;
                Ok(Self::Resident {
                    value_length: header.value_length.get(),
                    value_offset: header.value_offset.get(),
                    index_flag: header.index_flag,
                })
            }
            1 => {
                let header = read_struct::<NtfsNonResidentAttributeHeader>(data, 0, position)?;
                let lowest_vcn = Vcn::from(header.lowest_vcn.get());
                let compression_unit_size = header.compression_unit_size.get();

                let (allocated_length, file_size, valid_data_length) = if lowest_vcn.value() == 0 {
                    let sizes = read_struct::<NtfsNonResidentAttributeSizes>(
                        data,
                        NON_RESIDENT_SIZES_OFFSET,
                        position,
                    )?;
                    (
                        Some(sizes.allocated_length.get()),
                        Some(sizes.file_size.get()),
                        Some(sizes.valid_data_length.get()),
                    )
                } else {
                    (None, None, None)
                };

                let total_allocated = if compression_unit_size > 0 {
                    Some(read_u64(data, TOTAL_ALLOCATED_OFFSET, position)?)
                } else {
                    None
                };

                Ok(Self::NonResident {
                    lowest_vcn,
                    highest_vcn: Vcn::from(header.highest_vcn.get()),
                    mapping_pairs_offset: header.mapping_pairs_offset.get(),
                    compression_unit_size,
                    allocated_length,
                    file_size,
                    valid_data_length,
                    total_allocated,
                })
            }
            actual => Err(NtfsError::UnsupportedFormCode { position, actual }),
        }
    }

    /// Returns `true` for [`NtfsAttributeForm::Resident`].
    pub fn is_resident(&self) -> bool {
        matches!(self, Self::Resident { .. })
    }
}

/// A single NTFS Attribute of an [`NtfsMftRecord`].
///
/// Not to be confused with [`NtfsFileAttributeFlags`].
///
/// All header fields have been validated when this structure is returned by the [`NtfsAttributes`] iterator.
/// Decoding the value is deferred until [`NtfsAttribute::structured_value`] is called, so that a broken value
/// never hides the attribute itself.
///
/// Reference: <https://flatcap.github.io/linux-ntfs/ntfs/concepts/attribute_header.html>
///
/// [`NtfsMftRecord`]: crate::mft_record::NtfsMftRecord
/// [`NtfsFileAttributeFlags`]: crate::structured_values::NtfsFileAttributeFlags
#[derive(Clone, Debug)]
pub struct NtfsAttribute<'d> {
    /// All bytes of this attribute record, as given by its length field.
    data: &'d [u8],
    position: usize,
    ty: u32,
    flags: u16,
    instance: u16,
    name: &'d [u8],
    form: NtfsAttributeForm,
}

impl<'d> NtfsAttribute<'d> {
    pub(crate) fn new(data: &'d [u8], position: usize) -> Result<Self> {
        let header = read_struct::<NtfsAttributeHeader>(data, 0, position)?;
        let form = NtfsAttributeForm::decode(data, position, header.form_code)?;

        let name_length = header.name_length as usize * mem::size_of::<u16>();
        let name = if name_length == 0 {
            &[]
        } else {
            let start = header.name_offset.get() as usize;
            let end = start + name_length;
            data.get(start..end)
                .ok_or(NtfsError::InvalidAttributeNameRange {
                    position,
                    range: start..end,
                    size: data.len() as u32,
                })?
        };

        let attribute = Self {
            data,
            position,
            ty: header.ty.get(),
            flags: header.flags.get(),
            instance: header.instance.get(),
            name,
            form,
        };
        attribute.validate_value_range()?;

        Ok(attribute)
    }

    /// Returns the length of this NTFS Attribute record, in bytes.
    ///
    /// This denotes the length of the attribute structure on disk.
    /// Apart from various headers, this structure also includes the name and,
    /// for resident attributes, the actual value.
    pub fn attribute_length(&self) -> u32 {
        self.data.len() as u32
    }

    /// Returns an iterator over the mapping pairs of a non-resident attribute,
    /// or `None` for a resident one.
    pub fn data_runs(&self) -> Option<NtfsDataRuns<'d>> {
        match self.form {
            NtfsAttributeForm::NonResident {
                lowest_vcn,
                mapping_pairs_offset,
                ..
            } => {
                let start = mapping_pairs_offset as usize;
                let data = &self.data[start..];
                Some(NtfsDataRuns::new(data, self.position + start, lowest_vcn))
            }
            NtfsAttributeForm::Resident { .. } => None,
        }
    }

    pub(crate) fn ensure_ty(&self, expected: NtfsAttributeType) -> Result<()> {
        let ty = self.ty();
        if !ty.is(expected) {
            return Err(NtfsError::AttributeOfDifferentType {
                position: self.position,
                expected,
                actual: ty,
            });
        }

        Ok(())
    }

    /// Returns flags set for this attribute as specified by [`NtfsAttributeFlags`].
    ///
    /// Unknown bits are retained.
    pub fn flags(&self) -> NtfsAttributeFlags {
        NtfsAttributeFlags::from_bits_retain(self.flags)
    }

    /// Returns the form-specific header fields of this attribute.
    pub fn form(&self) -> &NtfsAttributeForm {
        &self.form
    }

    /// Returns the identifier of this attribute that is unique within the File Record.
    pub fn instance(&self) -> u16 {
        self.instance
    }

    /// Returns `true` if this is a resident attribute, i.e. one where its value
    /// is part of the attribute structure.
    pub fn is_resident(&self) -> bool {
        self.form.is_resident()
    }

    /// Returns the name of this NTFS Attribute (if any).
    ///
    /// Note that most NTFS attributes have no name and are distinguished by their types.
    /// The name is empty in that case.
    pub fn name(&self) -> U16StrLe<'d> {
        U16StrLe(self.name)
    }

    /// Returns the length of the name of this NTFS Attribute, in bytes.
    ///
    /// An attribute name has a maximum length of 255 UTF-16 code points (510 bytes).
    pub fn name_length(&self) -> usize {
        self.name.len()
    }

    /// Returns the absolute position of this NTFS Attribute, in bytes.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Attempts to decode the value as the given structured value type and returns that.
    ///
    /// This function first checks that the attribute is of the required type for that structured value
    /// and that it is resident.
    /// It returns with an error if that is not the case.
    pub fn resident_structured_value<S>(&self) -> Result<S>
    where
        S: NtfsResidentStructuredValue<'d>,
    {
        self.ensure_ty(S::TY)?;

        let value = self
            .resident_value()
            .ok_or(NtfsError::UnexpectedNonResidentAttribute {
                position: self.position,
            })?;

        S::from_resident_value(value, self.value_position())
    }

    /// Returns the value bytes of a resident attribute, or `None` for a non-resident one.
    pub fn resident_value(&self) -> Option<&'d [u8]> {
        match self.form {
            NtfsAttributeForm::Resident {
                value_length,
                value_offset,
                ..
            } => {
                let start = value_offset as usize;
                let end = start + value_length as usize;
                Some(&self.data[start..end])
            }
            NtfsAttributeForm::NonResident { .. } => None,
        }
    }

    /// Decodes the value of this attribute according to its type.
    ///
    /// Non-resident attributes yield their mapping pairs and resident attributes of a type without a
    /// dedicated decoder yield their raw bytes.
    /// An error only concerns this attribute. Other attributes of the same File Record are unaffected.
    pub fn structured_value(&self) -> Result<NtfsStructuredValue<'d>> {
        if let Some(data_runs) = self.data_runs() {
            return Ok(NtfsStructuredValue::NonResident(data_runs));
        }

        let value = self.resident_value().unwrap_or_default();
        let position = self.value_position();

        let ty = match self.ty() {
            NtfsEnumValue::Known(ty) => ty,
            NtfsEnumValue::Unrecognized(_) => return Ok(NtfsStructuredValue::Raw(value)),
        };

        let structured_value = match ty {
            NtfsAttributeType::StandardInformation => NtfsStructuredValue::StandardInformation(
                NtfsStandardInformation::from_resident_value(value, position)?,
            ),
            NtfsAttributeType::AttributeList => NtfsStructuredValue::AttributeList(
                NtfsAttributeList::from_resident_value(value, position)?,
            ),
            NtfsAttributeType::FileName => {
                NtfsStructuredValue::FileName(NtfsFileName::from_resident_value(value, position)?)
            }
            NtfsAttributeType::ObjectId => {
                NtfsStructuredValue::ObjectId(NtfsObjectId::from_resident_value(value, position)?)
            }
            NtfsAttributeType::SecurityDescriptor => NtfsStructuredValue::SecurityDescriptor(
                NtfsSecurityDescriptor::from_resident_value(value, position)?,
            ),
            NtfsAttributeType::VolumeName => NtfsStructuredValue::VolumeName(
                NtfsVolumeName::from_resident_value(value, position)?,
            ),
            NtfsAttributeType::VolumeInformation => NtfsStructuredValue::VolumeInformation(
                NtfsVolumeInformation::from_resident_value(value, position)?,
            ),
            NtfsAttributeType::IndexRoot => {
                NtfsStructuredValue::IndexRoot(NtfsIndexRoot::from_resident_value(value, position)?)
            }
            _ => NtfsStructuredValue::Raw(value),
        };

        Ok(structured_value)
    }

    /// Returns the type of this NTFS Attribute.
    pub fn ty(&self) -> NtfsAttributeTypeCode {
        NtfsAttributeTypeCode::decode(self.ty)
    }

    fn validate_value_range(&self) -> Result<()> {
        match self.form {
            NtfsAttributeForm::Resident {
                value_length,
                value_offset,
                ..
            } => {
                let start = value_offset as usize;
                let end = start + value_length as usize;
                if end > self.data.len() {
                    return Err(NtfsError::InvalidResidentValueRange {
                        position: self.position,
                        range: start..end,
                        size: self.attribute_length(),
                    });
                }
            }
            NtfsAttributeForm::NonResident {
                mapping_pairs_offset,
                ..
            } => {
                if mapping_pairs_offset as usize > self.data.len() {
                    return Err(NtfsError::InvalidMappingPairsOffset {
                        position: self.position,
                        offset: mapping_pairs_offset,
                        size: self.attribute_length(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Returns the length of the value data of this NTFS Attribute, in bytes.
    ///
    /// This is `None` for a non-resident attribute that doesn't start at VCN 0,
    /// because only that one knows the size of the entire value.
    pub fn value_length(&self) -> Option<u64> {
        match self.form {
            NtfsAttributeForm::Resident { value_length, .. } => Some(value_length as u64),
            NtfsAttributeForm::NonResident { file_size, .. } => file_size,
        }
    }

    fn value_position(&self) -> usize {
        match self.form {
            NtfsAttributeForm::Resident { value_offset, .. } => {
                self.position + value_offset as usize
            }
            NtfsAttributeForm::NonResident {
                mapping_pairs_offset,
                ..
            } => self.position + mapping_pairs_offset as usize,
        }
    }
}

/// Iterator over
///   all attributes of a File Record,
///   returning an [`NtfsAttribute`] for each entry,
///   implementing [`Iterator`] and [`FusedIterator`].
///
/// The iterator stops at the end marker or when reaching the used size of the File Record, whichever comes
/// first.
/// An attribute with a broken length field ends the iteration after the error has been returned, because the
/// position of the next attribute is unknown.
/// Any other error only affects the attribute at hand and iteration continues with the next one.
///
/// This iterator is returned from the [`NtfsMftRecord::attribute_stream`] function.
///
/// [`NtfsMftRecord::attribute_stream`]: crate::mft_record::NtfsMftRecord::attribute_stream
#[derive(Clone, Debug)]
pub struct NtfsAttributes<'d> {
    /// File Record data up to its used size.
    data: &'d [u8],
    position: usize,
    offset: usize,
}

impl<'d> NtfsAttributes<'d> {
    pub(crate) fn new(data: &'d [u8], position: usize, first_attribute_offset: usize) -> Self {
        Self {
            data,
            position,
            offset: first_attribute_offset,
        }
    }

    fn finish(&mut self) {
        self.offset = self.data.len();
    }

    fn read_attribute(&mut self) -> Result<Option<NtfsAttribute<'d>>> {
        // This may be an entire attribute or just the 4-byte end marker.
        // Check if this marks the end of the attribute list.
        let ty = read_u32(self.data, self.offset, self.position)?;
        if ty == NtfsAttributeType::End as u32 {
            log::debug!(
                "Found the attribute end marker at {:#x}",
                self.position + self.offset
            );
            self.finish();
            return Ok(None);
        }

        // It's a real attribute.
        let position = self.position + self.offset;
        let length = read_u32(
            self.data,
            self.offset + offset_of!(NtfsAttributeHeader, length),
            self.position,
        )?;

        if length == 0 || length % 8 != 0 {
            return Err(NtfsError::InvalidAttributeLength {
                position,
                actual: length,
            });
        }

        let remaining = self.data.len() - self.offset;
        if length as usize > remaining {
            return Err(NtfsError::AttributeExceedsUsedSize {
                position,
                actual: length,
                remaining,
            });
        }

        let data = read_bytes(self.data, self.offset, length as usize, self.position)?;

        // The record length is authoritative, no matter how much the attribute decoder looks at.
        self.offset += length as usize;

        NtfsAttribute::new(data, position).map(Some)
    }
}

impl<'d> Iterator for NtfsAttributes<'d> {
    type Item = Result<NtfsAttribute<'d>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.data.len() {
            return None;
        }

        let start = self.offset;

        match self.read_attribute() {
            Ok(Some(attribute)) => {
                log::trace!(
                    "Decoded attribute of type {:?} with a length of {} bytes at {:#x}",
                    attribute.ty(),
                    attribute.attribute_length(),
                    attribute.position()
                );
                Some(Ok(attribute))
            }
            Ok(None) => None,
            Err(e) => {
                if self.offset == start {
                    // The cursor couldn't be advanced, so this error ends the attribute stream.
                    log::warn!("Attribute stream ends prematurely: {}", e);
                    self.finish();
                } else {
                    log::warn!("Skipping broken attribute: {}", e);
                }

                Some(Err(e))
            }
        }
    }
}

impl<'d> FusedIterator for NtfsAttributes<'d> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NtfsErrorKind;
    use crate::helpers::tests::{non_resident_attribute, resident_attribute};
    use alloc::vec::Vec;

    fn stream(attributes: &[Vec<u8>]) -> Vec<u8> {
        let mut data = Vec::new();
        for attribute in attributes {
            data.extend_from_slice(attribute);
        }
        data.extend_from_slice(&u32::MAX.to_le_bytes());
        data.extend_from_slice(&[0u8; 4]);
        data
    }

    #[test]
    fn test_attribute_stream() {
        let data = stream(&[
            resident_attribute(0x10, &[0u8; 72]),
            resident_attribute(0x80, b"hello"),
            resident_attribute(0x1234, &[1, 2, 3]),
        ]);
        let attributes = NtfsAttributes::new(&data, 0x1000, 0)
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert_eq!(attributes.len(), 3);
        assert!(attributes[0].ty().is(NtfsAttributeType::StandardInformation));
        assert_eq!(attributes[0].attribute_length(), 96);
        assert_eq!(attributes[0].position(), 0x1000);

        assert!(attributes[1].ty().is(NtfsAttributeType::Data));
        assert_eq!(attributes[1].position(), 0x1000 + 96);
        assert_eq!(attributes[1].resident_value(), Some(&b"hello"[..]));
        assert_eq!(attributes[1].value_length(), Some(5));
        assert!(attributes[1].name().is_empty());

        // Unknown type codes are retained with their raw value.
        assert_eq!(attributes[2].ty(), NtfsEnumValue::Unrecognized(0x1234));
        assert!(matches!(
            attributes[2].structured_value(),
            Ok(NtfsStructuredValue::Raw(&[1, 2, 3]))
        ));
    }

    #[test]
    fn test_stream_without_end_marker() {
        let mut data = stream(&[resident_attribute(0x80, &[0u8; 8])]);
        data.truncate(data.len() - 8);

        let attributes = NtfsAttributes::new(&data, 0, 0)
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(attributes.len(), 1);
    }

    #[test]
    fn test_invalid_attribute_length() {
        for invalid_length in [0u32, 0x61] {
            let mut second = resident_attribute(0x30, &[0u8; 66]);
            second[4..8].copy_from_slice(&invalid_length.to_le_bytes());

            let data = stream(&[
                resident_attribute(0x10, &[0u8; 48]),
                second,
                resident_attribute(0x80, &[]),
            ]);
            let mut attributes = NtfsAttributes::new(&data, 0, 0);

            assert!(attributes.next().unwrap().is_ok());
            let error = attributes.next().unwrap().unwrap_err();
            assert_eq!(error.kind(), NtfsErrorKind::MalformedAttribute);
            assert_eq!(
                error,
                NtfsError::InvalidAttributeLength {
                    position: 72,
                    actual: invalid_length,
                }
            );
            assert!(attributes.next().is_none());
        }
    }

    #[test]
    fn test_attribute_exceeds_used_size() {
        let mut data = stream(&[resident_attribute(0x80, &[0u8; 16])]);
        data.truncate(32);

        let mut attributes = NtfsAttributes::new(&data, 0, 0);
        assert!(matches!(
            attributes.next(),
            Some(Err(NtfsError::AttributeExceedsUsedSize {
                position: 0,
                actual: 40,
                remaining: 32,
            }))
        ));
        assert!(attributes.next().is_none());
    }

    #[test]
    fn test_unsupported_form_code() {
        let mut broken = resident_attribute(0x80, &[0u8; 8]);
        broken[8] = 7;

        let data = stream(&[broken, resident_attribute(0x80, b"next")]);
        let mut attributes = NtfsAttributes::new(&data, 0, 0);

        let error = attributes.next().unwrap().unwrap_err();
        assert_eq!(error, NtfsError::UnsupportedFormCode { position: 0, actual: 7 });
        assert_eq!(error.kind(), NtfsErrorKind::UnsupportedForm);

        let attribute = attributes.next().unwrap().unwrap();
        assert_eq!(attribute.resident_value(), Some(&b"next"[..]));
        assert!(attributes.next().is_none());
    }

    #[test]
    fn test_invalid_resident_value_range() {
        let mut broken = resident_attribute(0x80, &[0u8; 8]);
        broken[16..20].copy_from_slice(&100u32.to_le_bytes());

        let data = stream(&[broken, resident_attribute(0x80, b"next")]);
        let mut attributes = NtfsAttributes::new(&data, 0, 0);

        assert!(matches!(
            attributes.next(),
            Some(Err(NtfsError::InvalidResidentValueRange { .. }))
        ));
        assert!(attributes.next().unwrap().is_ok());
    }

    #[test]
    fn test_named_attribute() {
        let mut attribute = resident_attribute(0x80, b"value");
        // Put a 4-character name into the padding behind the 5-byte value.
        let name_offset = attribute.len() as u16;
        attribute[9] = 4;
        attribute[10..12].copy_from_slice(&name_offset.to_le_bytes());
        attribute.extend("$SDS".encode_utf16().flat_map(u16::to_le_bytes));
        let length = attribute.len() as u32;
        attribute[4..8].copy_from_slice(&length.to_le_bytes());

        let data = stream(&[attribute]);
        let attribute = NtfsAttributes::new(&data, 0, 0).next().unwrap().unwrap();
        assert_eq!(attribute.name_length(), 8);
        assert_eq!(attribute.name().to_string_lossy(), "$SDS");
    }

    #[test]
    fn test_non_resident_attribute() {
        let data_runs = [0x11, 0x08, 0x40, 0x00];

        let first = non_resident_attribute(0x80, 0, 7, 0, Some((0x8000, 0x7123, 0x7123)), &data_runs);
        let second = non_resident_attribute(0x80, 8, 15, 0, None, &data_runs);
        let compressed =
            non_resident_attribute(0x80, 0, 15, 4, Some((0x10000, 0x9000, 0x9000)), &data_runs);

        let data = stream(&[first, second, compressed]);
        let attributes = NtfsAttributes::new(&data, 0, 0)
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert_eq!(
            *attributes[0].form(),
            NtfsAttributeForm::NonResident {
                lowest_vcn: Vcn::from(0),
                highest_vcn: Vcn::from(7),
                mapping_pairs_offset: 0x40,
                compression_unit_size: 0,
                allocated_length: Some(0x8000),
                file_size: Some(0x7123),
                valid_data_length: Some(0x7123),
                total_allocated: None,
            }
        );
        assert_eq!(attributes[0].value_length(), Some(0x7123));

        // The size fields must be absent, not zero.
        match *attributes[1].form() {
            NtfsAttributeForm::NonResident {
                lowest_vcn,
                allocated_length,
                file_size,
                valid_data_length,
                ..
            } => {
                assert_eq!(lowest_vcn, Vcn::from(8));
                assert_eq!(allocated_length, None);
                assert_eq!(file_size, None);
                assert_eq!(valid_data_length, None);
            }
            NtfsAttributeForm::Resident { .. } => panic!("expected a non-resident attribute"),
        }
        assert_eq!(attributes[1].value_length(), None);

        let run = attributes[1].data_runs().unwrap().next().unwrap().unwrap();
        assert_eq!(run.vcn(), Vcn::from(8));
        assert_eq!(run.cluster_count(), 8);

        match *attributes[2].form() {
            NtfsAttributeForm::NonResident {
                compression_unit_size,
                total_allocated,
                mapping_pairs_offset,
                ..
            } => {
                assert_eq!(compression_unit_size, 4);
                assert_eq!(total_allocated, Some(0x10000));
                assert_eq!(mapping_pairs_offset, 0x48);
            }
            NtfsAttributeForm::Resident { .. } => panic!("expected a non-resident attribute"),
        }

        assert!(matches!(
            attributes[0].structured_value(),
            Ok(NtfsStructuredValue::NonResident(_))
        ));
        assert!(matches!(
            attributes[0].resident_structured_value::<NtfsFileName>(),
            Err(NtfsError::AttributeOfDifferentType { .. })
        ));
    }

    #[test]
    fn test_attribute_flags() {
        let flags = NtfsAttributeFlags::from_bits_retain(0x8001);
        assert!(flags.is_compressed());
        assert!(flags.contains(NtfsAttributeFlags::SPARSE));
        assert!(!flags.contains(NtfsAttributeFlags::ENCRYPTED));
        assert_eq!(NtfsAttributeFlags::from_bits_retain(0x0100).bits(), 0x0100);
    }
}
