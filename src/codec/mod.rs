// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{error::*, frame::*};

mod header;
mod objects;

pub use self::objects::{FixedObject, ObjectIter, Objects};

type Result<T> = core::result::Result<T, Error>;

/// Size of the fixed part of a response fragment (control, function, IIN).
pub(crate) const RESPONSE_HEADER_LEN: usize = 4;

impl TryFrom<u8> for QualifierCode {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        use crate::frame::QualifierCode::*;
        let qualifier = match code {
            0x00 => Uint8StartStop,
            0x01 => Uint16StartStop,
            0x06 => AllObjects,
            0x07 => Uint8Count,
            0x08 => Uint16Count,
            0x17 => Uint8CountUint8Index,
            0x28 => Uint16CountUint16Index,
            _ => {
                return Err(Error::Qualifier(code));
            }
        };
        Ok(qualifier)
    }
}

impl RequestApdu {
    /// Encode the request fragment into `buf`.
    ///
    /// Returns the number of bytes written.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize> {
        let len = self.encoded_len();
        if buf.len() < len {
            return Err(Error::BufferSize);
        }
        buf[0] = self.control.value();
        buf[1] = self.function.value();
        let mut pos = 2;
        for RequestHeader { header, data } in &self.headers {
            pos += header.encode(&mut buf[pos..])?;
            buf[pos..pos + data.len()].copy_from_slice(data);
            pos += data.len();
        }
        debug_assert_eq!(pos, len);
        Ok(pos)
    }
}

impl<'r> TryFrom<&'r [u8]> for ResponseApdu<'r> {
    type Error = Error;

    fn try_from(bytes: &'r [u8]) -> Result<Self> {
        if bytes.len() < RESPONSE_HEADER_LEN {
            return Err(Error::BufferSize);
        }
        let header = ResponseHeader {
            control: ControlField::new(bytes[0]),
            function: FunctionCode::new(bytes[1]),
            iin: Iin::from_octets(bytes[2], bytes[3]),
        };
        Ok(ResponseApdu {
            header,
            objects: &bytes[RESPONSE_HEADER_LEN..],
        })
    }
}

/// Walks the object headers of a response payload.
///
/// Every item is a header together with the view on its objects.
/// The iteration stops after the first error.
#[derive(Debug, Clone)]
pub(crate) struct HeaderIter<'a> {
    remaining: &'a [u8],
    failed: bool,
}

impl<'a> HeaderIter<'a> {
    pub(crate) const fn new(payload: &'a [u8]) -> Self {
        Self {
            remaining: payload,
            failed: false,
        }
    }
}

impl<'a> Iterator for HeaderIter<'a> {
    type Item = Result<Objects<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.remaining.is_empty() {
            return None;
        }
        let res = ObjectHeader::parse(self.remaining).and_then(|(header, rest)| {
            let (objects, rest) = Objects::split(header, rest)?;
            self.remaining = rest;
            Ok(objects)
        });
        if res.is_err() {
            self.failed = true;
        }
        Some(res)
    }
}
