// Copyright 2021-2026 Colin Finck <colin@reactos.org>
// SPDX-License-Identifier: MIT OR Apache-2.0
//
//! A decoder for the on-disk structures of NTFS Master File Table (MFT) entries.
//!
//! The entry point is [`NtfsMftRecord`], which takes the bytes of a single MFT entry,
//! applies its Update Sequence Array ("fixup") in place and decodes the header and all attributes.
//! Index Records from $INDEX_ALLOCATION attributes are decoded by [`NtfsIndexRecord`].
//!
//! This crate performs no I/O.
//! Locating MFT entries on a volume, following data runs and resolving attribute lists
//! across several entries is up to the caller.

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

extern crate alloc;

#[macro_use]
mod helpers;

mod attribute;
mod codec;
mod data_runs;
mod error;
mod file_reference;
mod guid;
mod index_entry;
mod index_record;
mod mft_record;
mod record;
pub mod structured_values;
mod time;
mod types;

pub use crate::attribute::*;
pub use crate::codec::{NtfsEnum, NtfsEnumValue};
pub use crate::data_runs::*;
pub use crate::error::*;
pub use crate::file_reference::*;
pub use crate::guid::*;
pub use crate::index_entry::*;
pub use crate::index_record::*;
pub use crate::mft_record::*;
pub use crate::record::*;
pub use crate::structured_values::*;
pub use crate::time::*;
pub use crate::types::*;
