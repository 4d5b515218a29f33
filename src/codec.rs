// Copyright 2021-2026 Colin Finck <colin@reactos.org>
// SPDX-License-Identifier: MIT OR Apache-2.0
//
//! Primitive field codec shared by all decoders.
//!
//! Every on-disk structure is a `#[repr(C)]` type made of unaligned little-endian fields,
//! so it can be borrowed straight out of the record buffer once the requested span has been
//! bounds-checked.

use core::mem;

use zerocopy::{FromBytes, Immutable, KnownLayout, LittleEndian, Unaligned, U32, U64};

use crate::error::{NtfsError, Result};

/// Borrows the on-disk structure `T` starting at `offset` of `data`.
///
/// `position` is the absolute position of `data[0]`, which is only used for error reporting.
pub(crate) fn read_struct<T>(data: &[u8], offset: usize, position: usize) -> Result<&T>
where
    T: FromBytes + Immutable + KnownLayout + Unaligned,
{
    let bytes = read_bytes(data, offset, mem::size_of::<T>(), position)?;

    // `read_bytes` has already ensured the exact size and `Unaligned` rules out alignment errors.
    T::ref_from_bytes(bytes).map_err(|_| NtfsError::OutOfBounds {
        position: position + offset,
        length: mem::size_of::<T>(),
        size: data.len(),
    })
}

/// Returns the `length` bytes starting at `offset` of `data`.
pub(crate) fn read_bytes(data: &[u8], offset: usize, length: usize, position: usize) -> Result<&[u8]> {
    offset
        .checked_add(length)
        .and_then(|end| data.get(offset..end))
        .ok_or(NtfsError::OutOfBounds {
            position: position + offset,
            length,
            size: data.len(),
        })
}

pub(crate) fn read_u8(data: &[u8], offset: usize, position: usize) -> Result<u8> {
    read_bytes(data, offset, 1, position).map(|bytes| bytes[0])
}

pub(crate) fn read_u32(data: &[u8], offset: usize, position: usize) -> Result<u32> {
    read_struct::<U32<LittleEndian>>(data, offset, position).map(|x| x.get())
}

pub(crate) fn read_u64(data: &[u8], offset: usize, position: usize) -> Result<u64> {
    read_struct::<U64<LittleEndian>>(data, offset, position).map(|x| x.get())
}

/// A closed set of on-disk values that this crate knows by name.
///
/// Implemented by all enumerations that are decoded via [`NtfsEnumValue`].
pub trait NtfsEnum: Copy + Sized {
    /// On-disk representation of the enumeration.
    type Raw: Copy;

    /// Returns the variant for the exact raw value, or `None` if the value is unknown.
    fn from_raw(raw: Self::Raw) -> Option<Self>;

    /// Returns the on-disk representation of this variant.
    fn to_raw(self) -> Self::Raw;
}

/// A decoded on-disk enumeration value.
///
/// Vendor-specific and future values don't abort decoding, but end up in
/// [`NtfsEnumValue::Unrecognized`] carrying the raw value.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum NtfsEnumValue<E, R> {
    /// The value is one of the variants of `E`.
    Known(E),
    /// The value is not known to this crate.
    Unrecognized(R),
}

impl<E, R> NtfsEnumValue<E, R>
where
    E: NtfsEnum<Raw = R>,
    R: Copy + PartialEq,
{
    /// Decodes `raw` by exact match against the variants of `E`.
    pub fn decode(raw: R) -> Self {
        match E::from_raw(raw) {
            Some(known) => Self::Known(known),
            None => Self::Unrecognized(raw),
        }
    }

    /// Returns `true` if this is the known variant `expected`.
    pub fn is(&self, expected: E) -> bool {
        self.raw() == expected.to_raw()
    }

    /// Returns the known variant, or `None` for an unrecognized value.
    pub fn known(&self) -> Option<E> {
        match self {
            Self::Known(known) => Some(*known),
            Self::Unrecognized(_) => None,
        }
    }

    /// Returns the on-disk representation, regardless of whether the value is known.
    pub fn raw(&self) -> R {
        match self {
            Self::Known(known) => known.to_raw(),
            Self::Unrecognized(raw) => *raw,
        }
    }
}

impl<E, R> From<E> for NtfsEnumValue<E, R>
where
    E: NtfsEnum<Raw = R>,
{
    fn from(known: E) -> Self {
        Self::Known(known)
    }
}
