// Copyright 2021-2026 Colin Finck <colin@reactos.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use core::fmt;

use zerocopy::{FromBytes, Immutable, KnownLayout, LittleEndian, Unaligned, U64};

#[cfg(any(feature = "chrono", feature = "time", feature = "std"))]
use crate::error::NtfsError;

/// Number of 100-nanosecond intervals between 1601-01-01 (NT epoch) and 1970-01-01 (Unix epoch).
#[cfg(any(feature = "chrono", feature = "time", feature = "std"))]
const EPOCH_DIFFERENCE_IN_INTERVALS: i128 = 116_444_736_000_000_000;

/// An NTFS file time.
///
/// Stored as the raw unsigned count of 100-nanosecond intervals since 1601-01-01 UTC,
/// so decoding never loses precision.
/// Conversions to calendar types are available via the `chrono` and `time` features.
#[derive(
    Clone,
    Copy,
    Eq,
    FromBytes,
    Hash,
    Immutable,
    KnownLayout,
    Ord,
    PartialEq,
    PartialOrd,
    Unaligned,
)]
#[repr(transparent)]
pub struct NtfsTime(U64<LittleEndian>);

impl NtfsTime {
    /// Returns the stored NT timestamp (number of 100-nanosecond intervals since January 1, 1601).
    pub fn nt_timestamp(&self) -> u64 {
        self.0.get()
    }

    /// Returns the number of nanoseconds since the Unix epoch (negative before 1970).
    #[cfg(any(feature = "chrono", feature = "time"))]
    fn unix_timestamp_nanos(&self) -> i128 {
        (i128::from(self.nt_timestamp()) - EPOCH_DIFFERENCE_IN_INTERVALS) * 100
    }

    /// Creates an `NtfsTime` from nanoseconds since the Unix epoch, truncating to 100ns precision.
    #[cfg(any(feature = "chrono", feature = "time", feature = "std"))]
    fn from_unix_timestamp_nanos(nanos: i128) -> Result<Self, NtfsError> {
        let intervals = nanos.div_euclid(100) + EPOCH_DIFFERENCE_IN_INTERVALS;
        u64::try_from(intervals)
            .map(Self::from)
            .map_err(|_| NtfsError::InvalidTime)
    }
}

impl fmt::Debug for NtfsTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NtfsTime").field(&self.nt_timestamp()).finish()
    }
}

impl From<u64> for NtfsTime {
    fn from(value: u64) -> Self {
        Self(U64::new(value))
    }
}

impl From<NtfsTime> for u64 {
    fn from(time: NtfsTime) -> Self {
        time.nt_timestamp()
    }
}

#[cfg(feature = "chrono")]
#[cfg_attr(docsrs, doc(cfg(feature = "chrono")))]
impl<Tz: chrono::TimeZone> TryFrom<chrono::DateTime<Tz>> for NtfsTime {
    type Error = NtfsError;

    fn try_from(dt: chrono::DateTime<Tz>) -> Result<Self, Self::Error> {
        let nanos = i128::from(dt.timestamp()) * 1_000_000_000
            + i128::from(dt.timestamp_subsec_nanos());
        Self::from_unix_timestamp_nanos(nanos)
    }
}

#[cfg(feature = "chrono")]
#[cfg_attr(docsrs, doc(cfg(feature = "chrono")))]
impl From<NtfsTime> for chrono::DateTime<chrono::Utc> {
    fn from(nt: NtfsTime) -> Self {
        // Every u64 interval count is within chrono's supported range.
        let nanos = nt.unix_timestamp_nanos();
        let seconds = nanos.div_euclid(1_000_000_000) as i64;
        let subsec_nanos = nanos.rem_euclid(1_000_000_000) as u32;
        Self::from_timestamp(seconds, subsec_nanos).unwrap_or_default()
    }
}

#[cfg(feature = "time")]
#[cfg_attr(docsrs, doc(cfg(feature = "time")))]
impl TryFrom<time::OffsetDateTime> for NtfsTime {
    type Error = NtfsError;

    fn try_from(dt: time::OffsetDateTime) -> Result<Self, Self::Error> {
        Self::from_unix_timestamp_nanos(dt.unix_timestamp_nanos())
    }
}

#[cfg(feature = "time")]
#[cfg_attr(docsrs, doc(cfg(feature = "time")))]
impl TryFrom<NtfsTime> for time::OffsetDateTime {
    type Error = NtfsError;

    fn try_from(nt: NtfsTime) -> Result<Self, Self::Error> {
        time::OffsetDateTime::from_unix_timestamp_nanos(nt.unix_timestamp_nanos())
            .map_err(|_| NtfsError::InvalidTime)
    }
}

#[cfg(feature = "std")]
#[cfg_attr(docsrs, doc(cfg(feature = "std")))]
impl TryFrom<std::time::SystemTime> for NtfsTime {
    type Error = NtfsError;

    fn try_from(st: std::time::SystemTime) -> Result<Self, Self::Error> {
        let nanos = match st.duration_since(std::time::SystemTime::UNIX_EPOCH) {
            Ok(after) => i128::try_from(after.as_nanos()).map_err(|_| NtfsError::InvalidTime)?,
            Err(before) => {
                -i128::try_from(before.duration().as_nanos()).map_err(|_| NtfsError::InvalidTime)?
            }
        };
        Self::from_unix_timestamp_nanos(nanos)
    }
}
