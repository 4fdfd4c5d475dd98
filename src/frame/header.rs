// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use core::fmt;

/// Selects how the objects following an object header are addressed.
#[cfg_attr(all(feature = "defmt", target_os = "none"), derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualifierCode {
    Uint8StartStop = 0x00,
    Uint16StartStop = 0x01,
    AllObjects = 0x06,
    Uint8Count = 0x07,
    Uint16Count = 0x08,
    Uint8CountUint8Index = 0x17,
    Uint16CountUint16Index = 0x28,
}

impl QualifierCode {
    const fn get_name(self) -> &'static str {
        match self {
            Self::Uint8StartStop => "8-bit start and stop",
            Self::Uint16StartStop => "16-bit start and stop",
            Self::AllObjects => "all objects",
            Self::Uint8Count => "8-bit count",
            Self::Uint16Count => "16-bit count",
            Self::Uint8CountUint8Index => "8-bit count and prefix",
            Self::Uint16CountUint16Index => "16-bit count and prefix",
        }
    }

    /// Size of the index prefix in front of every object.
    #[must_use]
    pub const fn prefix_len(self) -> usize {
        match self {
            Self::Uint8CountUint8Index => 1,
            Self::Uint16CountUint16Index => 2,
            _ => 0,
        }
    }
}

impl fmt::Display for QualifierCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.get_name())
    }
}

/// How the objects of a group/variation are laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectEncoding {
    /// Every object occupies the given number of bytes.
    Fixed(usize),
    /// One bit per object, packed LSB first.
    PackedBits,
    /// The header alone carries the meaning (e.g. class data).
    Empty,
}

/// The object types this crate knows how to walk over.
#[cfg_attr(all(feature = "defmt", target_os = "none"), derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupVariation {
    /// Time and date - absolute time
    Group50Var1,
    /// Time delay - coarse (seconds)
    Group52Var1,
    /// Time delay - fine (milliseconds)
    Group52Var2,
    /// Class objects - class 0 data
    Group60Var1,
    /// Class objects - class 1 data
    Group60Var2,
    /// Class objects - class 2 data
    Group60Var3,
    /// Class objects - class 3 data
    Group60Var4,
    /// Internal indications - packed format
    Group80Var1,
}

impl GroupVariation {
    #[must_use]
    pub const fn lookup(group: u8, variation: u8) -> Option<Self> {
        let gv = match (group, variation) {
            (50, 1) => Self::Group50Var1,
            (52, 1) => Self::Group52Var1,
            (52, 2) => Self::Group52Var2,
            (60, 1) => Self::Group60Var1,
            (60, 2) => Self::Group60Var2,
            (60, 3) => Self::Group60Var3,
            (60, 4) => Self::Group60Var4,
            (80, 1) => Self::Group80Var1,
            _ => return None,
        };
        Some(gv)
    }

    #[must_use]
    pub const fn group(self) -> u8 {
        match self {
            Self::Group50Var1 => 50,
            Self::Group52Var1 | Self::Group52Var2 => 52,
            Self::Group60Var1 | Self::Group60Var2 | Self::Group60Var3 | Self::Group60Var4 => 60,
            Self::Group80Var1 => 80,
        }
    }

    #[must_use]
    pub const fn variation(self) -> u8 {
        match self {
            Self::Group50Var1
            | Self::Group52Var1
            | Self::Group60Var1
            | Self::Group80Var1 => 1,
            Self::Group52Var2 | Self::Group60Var2 => 2,
            Self::Group60Var3 => 3,
            Self::Group60Var4 => 4,
        }
    }

    #[must_use]
    pub const fn encoding(self) -> ObjectEncoding {
        match self {
            Self::Group50Var1 => ObjectEncoding::Fixed(6),
            Self::Group52Var1 | Self::Group52Var2 => ObjectEncoding::Fixed(2),
            Self::Group60Var1 | Self::Group60Var2 | Self::Group60Var3 | Self::Group60Var4 => {
                ObjectEncoding::Empty
            }
            Self::Group80Var1 => ObjectEncoding::PackedBits,
        }
    }
}

impl fmt::Display for GroupVariation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "g{}v{}", self.group(), self.variation())
    }
}

/// Addressing parameters following the qualifier code.
#[cfg_attr(all(feature = "defmt", target_os = "none"), derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Range {
    StartStop(u16, u16),
    All,
    Count(u16),
}

/// Describes one group/variation of objects and how they are addressed.
#[cfg_attr(all(feature = "defmt", target_os = "none"), derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectHeader {
    pub variation: GroupVariation,
    pub qualifier: QualifierCode,
    pub range: Range,
}

impl ObjectHeader {
    /// Address every object of `variation` (qualifier `0x06`).
    #[must_use]
    pub const fn all_objects(variation: GroupVariation) -> Self {
        Self {
            variation,
            qualifier: QualifierCode::AllObjects,
            range: Range::All,
        }
    }

    /// Address the inclusive range `start..=stop` with the narrowest qualifier.
    #[must_use]
    pub const fn start_stop(variation: GroupVariation, start: u16, stop: u16) -> Self {
        let qualifier = if start <= 0xFF && stop <= 0xFF {
            QualifierCode::Uint8StartStop
        } else {
            QualifierCode::Uint16StartStop
        };
        Self {
            variation,
            qualifier,
            range: Range::StartStop(start, stop),
        }
    }

    /// Address `count` objects with the narrowest count qualifier.
    #[must_use]
    pub const fn count(variation: GroupVariation, count: u16) -> Self {
        let qualifier = if count <= 0xFF {
            QualifierCode::Uint8Count
        } else {
            QualifierCode::Uint16Count
        };
        Self {
            variation,
            qualifier,
            range: Range::Count(count),
        }
    }

    /// Number of objects following the header.
    #[must_use]
    pub const fn object_count(&self) -> usize {
        match self.range {
            Range::StartStop(start, stop) if start <= stop => (stop - start) as usize + 1,
            Range::StartStop(_, _) => 0,
            Range::All => 0,
            Range::Count(count) => count as usize,
        }
    }

    /// Number of bytes of the header itself (without objects).
    #[must_use]
    pub const fn encoded_len(&self) -> usize {
        3 + match self.qualifier {
            QualifierCode::AllObjects => 0,
            QualifierCode::Uint8Count | QualifierCode::Uint8CountUint8Index => 1,
            QualifierCode::Uint8StartStop
            | QualifierCode::Uint16Count
            | QualifierCode::Uint16CountUint16Index => 2,
            QualifierCode::Uint16StartStop => 4,
        }
    }
}
