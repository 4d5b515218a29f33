// Copyright 2021-2026 Colin Finck <colin@reactos.org>
// SPDX-License-Identifier: MIT OR Apache-2.0
//
//! Decoder for the mapping pairs ("data runs") of a non-resident attribute.

use core::iter::FusedIterator;
use core::mem;

use crate::codec::{read_bytes, read_u8};
use crate::error::{NtfsError, Result};
use crate::types::{Lcn, Vcn};

/// Iterator over
///   all mapping pairs of a non-resident attribute,
///   returning an [`NtfsDataRun`] for each entry,
///   implementing [`Iterator`] and [`FusedIterator`].
///
/// This iterator is returned from the [`NtfsAttribute::data_runs`] function.
///
/// [`NtfsAttribute::data_runs`]: crate::attribute::NtfsAttribute::data_runs
#[derive(Clone, Debug)]
pub struct NtfsDataRuns<'d> {
    data: &'d [u8],
    position: usize,
    offset: usize,
    next_vcn: Vcn,
    previous_lcn: Lcn,
}

impl<'d> NtfsDataRuns<'d> {
    pub(crate) fn new(data: &'d [u8], position: usize, lowest_vcn: Vcn) -> Self {
        Self {
            data,
            position,
            offset: 0,
            next_vcn: lowest_vcn,
            previous_lcn: Lcn::from(0),
        }
    }

    /// Returns the absolute position of the next mapping pair header, in bytes.
    pub fn position(&self) -> usize {
        self.position + self.offset
    }

    fn read_variable_length_bytes(&self, offset: usize, byte_count: u8) -> Result<[u8; 8]> {
        const MAX_BYTE_COUNT: u8 = mem::size_of::<u64>() as u8;

        if byte_count > MAX_BYTE_COUNT {
            return Err(NtfsError::InvalidByteCountInDataRunHeader {
                position: self.position(),
                expected: MAX_BYTE_COUNT,
                actual: byte_count,
            });
        }

        let bytes = read_bytes(self.data, offset, byte_count as usize, self.position)?;
        let mut buf = [0u8; MAX_BYTE_COUNT as usize];
        buf[..bytes.len()].copy_from_slice(bytes);

        Ok(buf)
    }

    fn read_variable_length_signed_integer(&self, offset: usize, byte_count: u8) -> Result<i64> {
        let buf = self.read_variable_length_bytes(offset, byte_count)?;
        let mut integer = i64::from_le_bytes(buf);

        // We have read `byte_count` bytes into a zeroed buffer and just interpreted that as an `i64`.
        // Sign-extend `integer` to make it replicate the proper value.
        let unused_bits = (mem::size_of::<i64>() as u32 - byte_count as u32) * 8;
        integer = integer.wrapping_shl(unused_bits).wrapping_shr(unused_bits);

        Ok(integer)
    }

    fn read_variable_length_unsigned_integer(&self, offset: usize, byte_count: u8) -> Result<u64> {
        let buf = self.read_variable_length_bytes(offset, byte_count)?;
        Ok(u64::from_le_bytes(buf))
    }

    fn read_data_run(&mut self) -> Option<Result<NtfsDataRun>> {
        // Read the single header byte.
        let header = iter_try!(read_u8(self.data, self.offset, self.position));

        // A zero byte marks the end of the data runs.
        if header == 0 {
            // Ensure that any further call uses the fast path.
            self.offset = self.data.len();
            return None;
        }

        let mut offset = self.offset + 1;

        // The lower nibble indicates the length of the following cluster count variable length integer.
        let cluster_count_byte_count = header & 0x0f;
        let cluster_count = iter_try!(
            self.read_variable_length_unsigned_integer(offset, cluster_count_byte_count)
        );
        offset += cluster_count_byte_count as usize;

        // The upper nibble indicates the length of the following LCN delta variable length integer.
        // A zero length denotes a sparse run without any clusters on disk.
        let lcn_byte_count = (header & 0xf0) >> 4;
        let lcn = if lcn_byte_count == 0 {
            None
        } else {
            let delta = Vcn::from(iter_try!(
                self.read_variable_length_signed_integer(offset, lcn_byte_count)
            ));
            offset += lcn_byte_count as usize;

            // Turn the read delta into an absolute LCN.
            let lcn = iter_try!(self.previous_lcn.checked_add(delta).ok_or(
                NtfsError::InvalidVcnInDataRunHeader {
                    position: NtfsDataRuns::position(self),
                    vcn: delta,
                    previous_lcn: self.previous_lcn,
                }
            ));
            self.previous_lcn = lcn;
            Some(lcn)
        };

        let vcn = self.next_vcn;
        let cluster_delta = i64::try_from(cluster_count).unwrap_or(i64::MAX);
        self.next_vcn = Vcn::from(vcn.value().saturating_add(cluster_delta));

        // Only advance after having checked for success.
        self.offset = offset;

        Some(Ok(NtfsDataRun {
            vcn,
            lcn,
            cluster_count,
        }))
    }
}

impl<'d> Iterator for NtfsDataRuns<'d> {
    type Item = Result<NtfsDataRun>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.data.len() {
            return None;
        }

        let result = self.read_data_run();
        if let Some(Err(_)) = result {
            // The remaining pairs can't be located anymore.
            self.offset = self.data.len();
        }

        result
    }
}

impl<'d> FusedIterator for NtfsDataRuns<'d> {}

/// A single mapping pair, describing a contiguous range of clusters of a non-resident value.
///
/// A data run only knows about whole clusters.
/// The attribute's `file_size` tells how much of the last run is actually used by data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NtfsDataRun {
    vcn: Vcn,
    lcn: Option<Lcn>,
    cluster_count: u64,
}

impl NtfsDataRun {
    /// Returns the number of clusters covered by this run.
    pub fn cluster_count(&self) -> u64 {
        self.cluster_count
    }

    /// Returns `true` if this run has no clusters on disk and reads as zeros.
    pub fn is_sparse(&self) -> bool {
        self.lcn.is_none()
    }

    /// Returns the first Logical Cluster Number of this run on the volume,
    /// or `None` for a sparse run.
    pub fn lcn(&self) -> Option<Lcn> {
        self.lcn
    }

    /// Returns the first Virtual Cluster Number of this run within the attribute value.
    pub fn vcn(&self) -> Vcn {
        self.vcn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn test_data_runs() {
        let data = [
            // 0x18 clusters at LCN 0x5634
            0x21, 0x18, 0x34, 0x56,
            // 0x10 sparse clusters
            0x01, 0x10,
            // 0x20 clusters at LCN 0x5634 - 0x100
            0x22, 0x20, 0x00, 0x00, 0xff,
            0x00,
        ];
        let runs = NtfsDataRuns::new(&data, 0x140, Vcn::from(0))
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0].vcn(), Vcn::from(0));
        assert_eq!(runs[0].lcn(), Some(Lcn::from(0x5634)));
        assert_eq!(runs[0].cluster_count(), 0x18);

        assert!(runs[1].is_sparse());
        assert_eq!(runs[1].vcn(), Vcn::from(0x18));
        assert_eq!(runs[1].cluster_count(), 0x10);

        assert_eq!(runs[2].vcn(), Vcn::from(0x28));
        assert_eq!(runs[2].lcn(), Some(Lcn::from(0x5534)));
        assert_eq!(runs[2].cluster_count(), 0x20);
    }

    #[test]
    fn test_lowest_vcn() {
        let data = [0x11, 0x04, 0x20, 0x00];
        let run = NtfsDataRuns::new(&data, 0, Vcn::from(100))
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(run.vcn(), Vcn::from(100));
        assert_eq!(run.lcn(), Some(Lcn::from(0x20)));
    }

    #[test]
    fn test_invalid_data_runs() {
        // A 9-byte cluster count.
        let data = [0x09, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let mut runs = NtfsDataRuns::new(&data, 0x40, Vcn::from(0));
        assert_eq!(
            runs.next(),
            Some(Err(NtfsError::InvalidByteCountInDataRunHeader {
                position: 0x40,
                expected: 8,
                actual: 9,
            }))
        );
        assert_eq!(runs.next(), None);

        // LCN delta moving below cluster 0, after a valid first run.
        let data = [0x11, 0x01, 0x10, 0x11, 0x01, 0xe0, 0x00];
        let mut runs = NtfsDataRuns::new(&data, 0x80, Vcn::from(0));
        assert!(matches!(runs.next(), Some(Ok(_))));
        assert_eq!(
            runs.next(),
            Some(Err(NtfsError::InvalidVcnInDataRunHeader {
                position: 0x83,
                vcn: Vcn::from(-0x20),
                previous_lcn: Lcn::from(0x10),
            }))
        );
        assert_eq!(runs.next(), None);

        // Truncated pair.
        let data = [0x31, 0x01, 0x00];
        let mut runs = NtfsDataRuns::new(&data, 0, Vcn::from(0));
        assert!(matches!(runs.next(), Some(Err(NtfsError::OutOfBounds { .. }))));
    }
}
