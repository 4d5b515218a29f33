// Copyright 2021-2026 Colin Finck <colin@reactos.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use core::fmt;

use zerocopy::{FromBytes, Immutable, KnownLayout, LittleEndian, Unaligned, U16, U32};

/// A Globally Unique Identifier (GUID), used for Object IDs in NTFS.
#[derive(Clone, Copy, Eq, FromBytes, Hash, Immutable, KnownLayout, PartialEq, Unaligned)]
#[repr(C)]
pub struct NtfsGuid {
    data1: U32<LittleEndian>,
    data2: U16<LittleEndian>,
    data3: U16<LittleEndian>,
    data4: [u8; 8],
}

impl NtfsGuid {
    pub fn data1(&self) -> u32 {
        self.data1.get()
    }

    pub fn data2(&self) -> u16 {
        self.data2.get()
    }

    pub fn data3(&self) -> u16 {
        self.data3.get()
    }

    pub fn data4(&self) -> [u8; 8] {
        self.data4
    }
}

impl fmt::Debug for NtfsGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NtfsGuid({self})")
    }
}

impl fmt::Display for NtfsGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.data4;

        write!(
            f,
            "{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
            self.data1(),
            self.data2(),
            self.data3(),
            d[0],
            d[1],
            d[2],
            d[3],
            d[4],
            d[5],
            d[6],
            d[7]
        )
    }
}
