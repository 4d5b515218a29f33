// Copyright 2021-2026 Colin Finck <colin@reactos.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use derive_more::{Display, From};

/// A Logical Cluster Number (LCN), counting clusters from the beginning of the volume.
#[derive(Clone, Copy, Debug, Display, Eq, From, Hash, Ord, PartialEq, PartialOrd)]
pub struct Lcn(u64);

impl Lcn {
    /// Moves this LCN by the signed cluster delta of a data run.
    pub fn checked_add(&self, vcn: Vcn) -> Option<Lcn> {
        self.0.checked_add_signed(vcn.0).map(Into::into)
    }

    /// Returns the cluster number as an integer.
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// A Virtual Cluster Number (VCN), counting clusters from the beginning of an attribute value.
#[derive(Clone, Copy, Debug, Display, Eq, From, Hash, Ord, PartialEq, PartialOrd)]
pub struct Vcn(i64);

impl Vcn {
    /// Returns the byte offset of this VCN for the given cluster size,
    /// or `None` if the VCN is negative or the offset would overflow.
    pub fn offset(&self, cluster_size: u32) -> Option<u64> {
        u64::try_from(self.0)
            .ok()?
            .checked_mul(u64::from(cluster_size))
    }

    /// Returns the cluster number as an integer.
    pub fn value(&self) -> i64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lcn_checked_add() {
        let lcn = Lcn::from(100);
        assert_eq!(lcn.checked_add(Vcn::from(28)), Some(Lcn::from(128)));
        assert_eq!(lcn.checked_add(Vcn::from(-100)), Some(Lcn::from(0)));
        assert_eq!(lcn.checked_add(Vcn::from(-101)), None);
    }

    #[test]
    fn test_vcn_offset() {
        assert_eq!(Vcn::from(3).offset(4096), Some(12288));
        assert_eq!(Vcn::from(-1).offset(4096), None);
        assert_eq!(Vcn::from(i64::MAX).offset(4096), None);
    }
}
