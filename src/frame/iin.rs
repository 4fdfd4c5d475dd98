// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use bitflags::bitflags;

bitflags! {
    /// Internal indications reported by the outstation with every response.
    ///
    /// The low byte is IIN1 and the high byte is IIN2, which matches the
    /// little-endian order in which both octets follow the function code.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Iin: u16 {
        /// IIN1.0: Broadcast message received.
        const ALL_STATIONS = 1 << 0;
        /// IIN1.1: Class 1 events available.
        const CLASS1_EVENTS = 1 << 1;
        /// IIN1.2: Class 2 events available.
        const CLASS2_EVENTS = 1 << 2;
        /// IIN1.3: Class 3 events available.
        const CLASS3_EVENTS = 1 << 3;
        /// IIN1.4: Time synchronization required.
        const NEED_TIME = 1 << 4;
        /// IIN1.5: Some output points are in local mode.
        const LOCAL_CONTROL = 1 << 5;
        /// IIN1.6: Abnormal condition in the device.
        const DEVICE_TROUBLE = 1 << 6;
        /// IIN1.7: The outstation has restarted.
        const DEVICE_RESTART = 1 << 7;
        /// IIN2.0: Function code not implemented.
        const NO_FUNC_CODE_SUPPORT = 1 << 8;
        /// IIN2.1: Requested objects unknown.
        const OBJECT_UNKNOWN = 1 << 9;
        /// IIN2.2: Parameter error in the request.
        const PARAM_ERROR = 1 << 10;
        /// IIN2.3: Event buffer overflow.
        const EVENT_BUFFER_OVERFLOW = 1 << 11;
        /// IIN2.4: Operation already executing.
        const ALREADY_EXECUTING = 1 << 12;
        /// IIN2.5: Configuration corrupt.
        const CONFIG_CORRUPT = 1 << 13;
        const RESERVED2 = 1 << 14;
        const RESERVED1 = 1 << 15;
    }
}

impl Iin {
    /// Bits that fail any transaction, whatever the operation was.
    pub const REQUEST_ERRORS: Self = Self::NO_FUNC_CODE_SUPPORT
        .union(Self::OBJECT_UNKNOWN)
        .union(Self::PARAM_ERROR);

    #[must_use]
    pub const fn from_octets(iin1: u8, iin2: u8) -> Self {
        Self::from_bits_retain(u16::from_le_bytes([iin1, iin2]))
    }

    #[must_use]
    pub const fn iin1(self) -> u8 {
        self.bits().to_le_bytes()[0]
    }

    #[must_use]
    pub const fn iin2(self) -> u8 {
        self.bits().to_le_bytes()[1]
    }

    /// `true` if the outstation rejected the request.
    #[must_use]
    pub const fn has_request_error(self) -> bool {
        self.intersects(Self::REQUEST_ERRORS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn octet_order() {
        let iin = Iin::from_octets(0x80, 0x04);
        assert!(iin.contains(Iin::DEVICE_RESTART));
        assert!(iin.contains(Iin::PARAM_ERROR));
        assert_eq!(iin.iin1(), 0x80);
        assert_eq!(iin.iin2(), 0x04);
    }

    #[test]
    fn request_errors() {
        assert!(!Iin::empty().has_request_error());
        assert!(!Iin::DEVICE_RESTART.has_request_error());
        assert!(!(Iin::NEED_TIME | Iin::CLASS1_EVENTS).has_request_error());
        assert!(Iin::NO_FUNC_CODE_SUPPORT.has_request_error());
        assert!(Iin::OBJECT_UNKNOWN.has_request_error());
        assert!((Iin::DEVICE_RESTART | Iin::PARAM_ERROR).has_request_error());
    }
}
