// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use alloc::vec::Vec;
use core::fmt;

mod header;
mod iin;
mod objects;

pub use self::{header::*, iin::*, objects::*};

/// A DNP3 application layer function code.
///
/// It is represented by an unsigned 8 bit integer.
#[cfg_attr(all(feature = "defmt", target_os = "none"), derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionCode {
    /// DNP3 Function Code: `0` (`0x00`).
    Confirm,

    /// DNP3 Function Code: `1` (`0x01`).
    Read,

    /// DNP3 Function Code: `2` (`0x02`).
    Write,

    /// DNP3 Function Code: `3` (`0x03`).
    Select,

    /// DNP3 Function Code: `4` (`0x04`).
    Operate,

    /// DNP3 Function Code: `5` (`0x05`).
    DirectOperate,

    /// DNP3 Function Code: `6` (`0x06`).
    DirectOperateNoResponse,

    /// DNP3 Function Code: `13` (`0x0D`).
    ColdRestart,

    /// DNP3 Function Code: `14` (`0x0E`).
    WarmRestart,

    /// DNP3 Function Code: `20` (`0x14`).
    EnableUnsolicited,

    /// DNP3 Function Code: `21` (`0x15`).
    DisableUnsolicited,

    /// DNP3 Function Code: `23` (`0x17`).
    DelayMeasure,

    /// DNP3 Function Code: `24` (`0x18`).
    RecordCurrentTime,

    /// DNP3 Function Code: `129` (`0x81`).
    Response,

    /// DNP3 Function Code: `130` (`0x82`).
    UnsolicitedResponse,

    // TODO:
    // - Freeze functions (0x07 - 0x0C)
    // - File transfer (0x19 - 0x1E)
    /// Custom DNP3 Function Code.
    Custom(u8),
}

impl FunctionCode {
    /// Create a new [`FunctionCode`] with `value`.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        match value {
            0x00 => Self::Confirm,
            0x01 => Self::Read,
            0x02 => Self::Write,
            0x03 => Self::Select,
            0x04 => Self::Operate,
            0x05 => Self::DirectOperate,
            0x06 => Self::DirectOperateNoResponse,
            0x0D => Self::ColdRestart,
            0x0E => Self::WarmRestart,
            0x14 => Self::EnableUnsolicited,
            0x15 => Self::DisableUnsolicited,
            0x17 => Self::DelayMeasure,
            0x18 => Self::RecordCurrentTime,
            0x81 => Self::Response,
            0x82 => Self::UnsolicitedResponse,
            code => Self::Custom(code),
        }
    }

    /// Get the [`u8`] value of the current [`FunctionCode`].
    #[must_use]
    pub const fn value(self) -> u8 {
        match self {
            Self::Confirm => 0x00,
            Self::Read => 0x01,
            Self::Write => 0x02,
            Self::Select => 0x03,
            Self::Operate => 0x04,
            Self::DirectOperate => 0x05,
            Self::DirectOperateNoResponse => 0x06,
            Self::ColdRestart => 0x0D,
            Self::WarmRestart => 0x0E,
            Self::EnableUnsolicited => 0x14,
            Self::DisableUnsolicited => 0x15,
            Self::DelayMeasure => 0x17,
            Self::RecordCurrentTime => 0x18,
            Self::Response => 0x81,
            Self::UnsolicitedResponse => 0x82,
            Self::Custom(code) => code,
        }
    }

    /// The function code an outstation answers this request with.
    ///
    /// Returns `None` for requests that are never answered.
    #[must_use]
    pub const fn expected_response(self) -> Option<Self> {
        match self {
            Self::Confirm
            | Self::DirectOperateNoResponse
            | Self::Response
            | Self::UnsolicitedResponse => None,
            _ => Some(Self::Response),
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Confirm => "CONFIRM",
            Self::Read => "READ",
            Self::Write => "WRITE",
            Self::Select => "SELECT",
            Self::Operate => "OPERATE",
            Self::DirectOperate => "DIRECT_OPERATE",
            Self::DirectOperateNoResponse => "DIRECT_OPERATE_NR",
            Self::ColdRestart => "COLD_RESTART",
            Self::WarmRestart => "WARM_RESTART",
            Self::EnableUnsolicited => "ENABLE_UNSOLICITED",
            Self::DisableUnsolicited => "DISABLE_UNSOLICITED",
            Self::DelayMeasure => "DELAY_MEASURE",
            Self::RecordCurrentTime => "RECORD_CURRENT_TIME",
            Self::Response => "RESPONSE",
            Self::UnsolicitedResponse => "UNSOLICITED_RESPONSE",
            Self::Custom(_) => "UNKNOWN",
        }
    }
}

impl From<u8> for FunctionCode {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

impl From<FunctionCode> for u8 {
    fn from(code: FunctionCode) -> Self {
        code.value()
    }
}

impl fmt::Display for FunctionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:0>2X})", self.name(), self.value())
    }
}

/// Application layer sequence number (`0` - `15`, wrapping).
#[cfg_attr(all(feature = "defmt", target_os = "none"), derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Sequence(u8);

impl Sequence {
    const MASK: u8 = 0x0F;

    /// Create a sequence number, discarding everything above the lower 4 bits.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self(value & Self::MASK)
    }

    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// The following sequence number, wrapping from 15 to 0.
    #[must_use]
    pub const fn next(self) -> Self {
        Self::new(self.0.wrapping_add(1))
    }
}

impl From<u8> for Sequence {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The application control field (first byte of every fragment).
///
/// ```text
/// bit:  7     6     5     4     3..0
///       FIR   FIN   CON   UNS   SEQ
/// ```
#[cfg_attr(all(feature = "defmt", target_os = "none"), derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlField {
    /// First fragment of a message
    pub fir: bool,
    /// Final fragment of a message
    pub fin: bool,
    /// Confirmation requested
    pub con: bool,
    /// Unsolicited response
    pub uns: bool,
    pub seq: Sequence,
}

impl ControlField {
    const FIR: u8 = 0b1000_0000;
    const FIN: u8 = 0b0100_0000;
    const CON: u8 = 0b0010_0000;
    const UNS: u8 = 0b0001_0000;

    /// Control field of a single fragment request without confirmation.
    #[must_use]
    pub const fn request(seq: Sequence) -> Self {
        Self {
            fir: true,
            fin: true,
            con: false,
            uns: false,
            seq,
        }
    }

    #[must_use]
    pub const fn new(value: u8) -> Self {
        Self {
            fir: value & Self::FIR != 0,
            fin: value & Self::FIN != 0,
            con: value & Self::CON != 0,
            uns: value & Self::UNS != 0,
            seq: Sequence::new(value),
        }
    }

    #[must_use]
    pub const fn value(self) -> u8 {
        let mut value = self.seq.value();
        if self.fir {
            value |= Self::FIR;
        }
        if self.fin {
            value |= Self::FIN;
        }
        if self.con {
            value |= Self::CON;
        }
        if self.uns {
            value |= Self::UNS;
        }
        value
    }

    /// `true` if this fragment is a complete message on its own.
    #[must_use]
    pub const fn is_fir_and_fin(self) -> bool {
        self.fir && self.fin
    }
}

impl From<u8> for ControlField {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

/// An object header together with the encoded objects it describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeader {
    pub header: ObjectHeader,
    pub data: Vec<u8>,
}

/// A request represents a message from the master to the outstation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestApdu {
    pub control: ControlField,
    pub function: FunctionCode,
    pub headers: Vec<RequestHeader>,
}

impl RequestApdu {
    /// An empty single fragment request carrying `seq`.
    #[must_use]
    pub const fn new(seq: Sequence) -> Self {
        Self {
            control: ControlField::request(seq),
            function: FunctionCode::Confirm,
            headers: Vec::new(),
        }
    }

    pub fn set_control(&mut self, control: ControlField) {
        self.control = control;
    }

    pub fn set_function(&mut self, function: FunctionCode) {
        self.function = function;
    }

    /// Append an object header that carries no object data.
    pub fn push_header(&mut self, header: ObjectHeader) {
        self.headers.push(RequestHeader {
            header,
            data: Vec::new(),
        });
    }

    /// Append an object header followed by already encoded objects.
    pub fn push_header_with_data(&mut self, header: ObjectHeader, data: Vec<u8>) {
        self.headers.push(RequestHeader { header, data });
    }

    /// Number of bytes required for a serialized request fragment.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        2 + self
            .headers
            .iter()
            .map(|h| h.header.encoded_len() + h.data.len())
            .sum::<usize>()
    }
}

/// The fixed part of a response fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    pub control: ControlField,
    pub function: FunctionCode,
    pub iin: Iin,
}

/// Represents a message from the outstation to the master.
///
/// The object payload is kept undecoded until dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseApdu<'r> {
    pub header: ResponseHeader,
    pub objects: &'r [u8],
}
