// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::*;
use byteorder::{ByteOrder, LittleEndian};

impl ObjectHeader {
    /// Parse one object header from the front of `bytes`.
    ///
    /// Returns the header and everything behind it.
    pub(crate) fn parse(bytes: &[u8]) -> Result<(Self, &[u8])> {
        if bytes.len() < 3 {
            return Err(Error::InsufficientData(3, bytes.len()));
        }
        let (group, var) = (bytes[0], bytes[1]);
        let variation =
            GroupVariation::lookup(group, var).ok_or(Error::UnknownObject(group, var))?;
        let qualifier = QualifierCode::try_from(bytes[2])?;
        let rest = &bytes[3..];

        use QualifierCode as q;
        let (range, used) = match qualifier {
            q::AllObjects => (Range::All, 0),
            q::Uint8StartStop => {
                let (start, stop) = read_pair(rest, 1)?;
                (checked_range(start, stop)?, 2)
            }
            q::Uint16StartStop => {
                let (start, stop) = read_pair(rest, 2)?;
                (checked_range(start, stop)?, 4)
            }
            q::Uint8Count | q::Uint8CountUint8Index => {
                let count = read_uint(rest, 1)?;
                (Range::Count(count), 1)
            }
            q::Uint16Count | q::Uint16CountUint16Index => {
                let count = read_uint(rest, 2)?;
                (Range::Count(count), 2)
            }
        };
        let header = ObjectHeader {
            variation,
            qualifier,
            range,
        };
        Ok((header, &rest[used..]))
    }

    /// Encode the header into `buf`, returning the number of bytes written.
    pub(crate) fn encode(&self, buf: &mut [u8]) -> Result<usize> {
        let len = self.encoded_len();
        if buf.len() < len {
            return Err(Error::BufferSize);
        }
        buf[0] = self.variation.group();
        buf[1] = self.variation.variation();
        buf[2] = self.qualifier as u8;

        use QualifierCode as q;
        match (self.qualifier, self.range) {
            (q::AllObjects, Range::All) => {}
            (q::Uint8StartStop, Range::StartStop(start, stop)) => {
                buf[3] = start as u8;
                buf[4] = stop as u8;
            }
            (q::Uint16StartStop, Range::StartStop(start, stop)) => {
                LittleEndian::write_u16(&mut buf[3..5], start);
                LittleEndian::write_u16(&mut buf[5..7], stop);
            }
            (q::Uint8Count | q::Uint8CountUint8Index, Range::Count(count)) => {
                buf[3] = count as u8;
            }
            (q::Uint16Count | q::Uint16CountUint16Index, Range::Count(count)) => {
                LittleEndian::write_u16(&mut buf[3..5], count);
            }
            (qualifier, _) => return Err(Error::Qualifier(qualifier as u8)),
        }
        Ok(len)
    }
}

fn read_uint(bytes: &[u8], width: usize) -> Result<u16> {
    if bytes.len() < width {
        return Err(Error::InsufficientData(width, bytes.len()));
    }
    let value = match width {
        1 => u16::from(bytes[0]),
        _ => LittleEndian::read_u16(bytes),
    };
    Ok(value)
}

fn read_pair(bytes: &[u8], width: usize) -> Result<(u16, u16)> {
    if bytes.len() < 2 * width {
        return Err(Error::InsufficientData(2 * width, bytes.len()));
    }
    Ok((read_uint(bytes, width)?, read_uint(&bytes[width..], width)?))
}

fn checked_range(start: u16, stop: u16) -> Result<Range> {
    if start > stop {
        return Err(Error::InvalidRange(start, stop));
    }
    Ok(Range::StartStop(start, stop))
}
