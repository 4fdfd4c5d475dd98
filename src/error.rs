// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::frame::{GroupVariation, QualifierCode};
use core::fmt;

/// dnp3-master-core Error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Invalid buffer size
    BufferSize,
    /// Not enough bytes left for the announced objects (needed, available)
    InsufficientData(usize, usize),
    /// Unsupported qualifier code
    Qualifier(u8),
    /// Unknown group/variation pair
    UnknownObject(u8, u8),
    /// Start index is greater than stop index
    InvalidRange(u16, u16),
    /// Object header not allowed by the active operation
    HeaderRejected(GroupVariation, QualifierCode),
    /// Allowed object type without a registered handler
    MissingHandler(GroupVariation),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Error::*;

        match self {
            BufferSize => write!(f, "Invalid buffer size"),
            InsufficientData(needed, available) => write!(
                f,
                "Insufficient object data: needed = {needed}, available = {available}"
            ),
            Qualifier(code) => write!(f, "Unsupported qualifier code: 0x{code:0>2X}"),
            UnknownObject(group, variation) => {
                write!(f, "Unknown object: g{group}v{variation}")
            }
            InvalidRange(start, stop) => {
                write!(f, "Invalid range: start = {start}, stop = {stop}")
            }
            HeaderRejected(gv, qualifier) => {
                write!(f, "Object header not allowed: {gv} ({qualifier})")
            }
            MissingHandler(gv) => write!(f, "No handler registered for {gv}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
