// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::*;
use byteorder::{ByteOrder, LittleEndian};
use core::marker::PhantomData;

/// An object type with a fixed size wire encoding.
pub trait FixedObject: Sized + Copy {
    const VARIATION: GroupVariation;
    const SIZE: usize;

    /// Decode from `bytes`, which holds at least [`Self::SIZE`] bytes.
    fn read(bytes: &[u8]) -> Self;

    /// Encode into `buf`, which holds at least [`Self::SIZE`] bytes.
    fn write(&self, buf: &mut [u8]);
}

impl FixedObject for Group50Var1 {
    const VARIATION: GroupVariation = GroupVariation::Group50Var1;
    const SIZE: usize = 6;

    fn read(bytes: &[u8]) -> Self {
        Self {
            time: LittleEndian::read_uint(bytes, Self::SIZE),
        }
    }

    fn write(&self, buf: &mut [u8]) {
        LittleEndian::write_uint(buf, self.time & 0xFFFF_FFFF_FFFF, Self::SIZE);
    }
}

impl FixedObject for Group52Var1 {
    const VARIATION: GroupVariation = GroupVariation::Group52Var1;
    const SIZE: usize = 2;

    fn read(bytes: &[u8]) -> Self {
        Self {
            time: LittleEndian::read_u16(bytes),
        }
    }

    fn write(&self, buf: &mut [u8]) {
        LittleEndian::write_u16(buf, self.time);
    }
}

impl FixedObject for Group52Var2 {
    const VARIATION: GroupVariation = GroupVariation::Group52Var2;
    const SIZE: usize = 2;

    fn read(bytes: &[u8]) -> Self {
        Self {
            time: LittleEndian::read_u16(bytes),
        }
    }

    fn write(&self, buf: &mut [u8]) {
        LittleEndian::write_u16(buf, self.time);
    }
}

/// The objects that belong to one object header.
///
/// Decoding happens lazily when a handler asks for a concrete type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Objects<'a> {
    header: ObjectHeader,
    data: &'a [u8],
}

impl<'a> Objects<'a> {
    /// Split the objects described by `header` off the front of `bytes`.
    pub(crate) fn split(header: ObjectHeader, bytes: &'a [u8]) -> Result<(Self, &'a [u8])> {
        let count = header.object_count();
        let prefix = header.qualifier.prefix_len();
        let len = match header.variation.encoding() {
            ObjectEncoding::Fixed(size) => count * (prefix + size),
            ObjectEncoding::PackedBits if prefix == 0 => count.div_ceil(8),
            ObjectEncoding::PackedBits => return Err(Error::Qualifier(header.qualifier as u8)),
            ObjectEncoding::Empty => 0,
        };
        if bytes.len() < len {
            return Err(Error::InsufficientData(len, bytes.len()));
        }
        let (data, rest) = bytes.split_at(len);
        Ok((Self { header, data }, rest))
    }

    #[must_use]
    pub const fn header(&self) -> &ObjectHeader {
        &self.header
    }

    /// Number of objects
    #[must_use]
    pub const fn len(&self) -> usize {
        self.header.object_count()
    }

    /// Returns `true` if the header carries no objects.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw object bytes including index prefixes.
    #[must_use]
    pub const fn payload(&self) -> &'a [u8] {
        self.data
    }

    /// Iterate over `(index, object)` pairs.
    ///
    /// Yields nothing if `T` is not the type announced by the header.
    #[must_use]
    pub fn iter<T: FixedObject>(&self) -> ObjectIter<'a, T> {
        let remaining = if T::VARIATION == self.header.variation {
            self.len()
        } else {
            0
        };
        ObjectIter {
            header: self.header,
            data: self.data,
            pos: 0,
            remaining,
            _object: PhantomData,
        }
    }

    /// The value if the header carries exactly one object of type `T`.
    #[must_use]
    pub fn single<T: FixedObject>(&self) -> Option<T> {
        if self.len() != 1 {
            return None;
        }
        self.iter::<T>().next().map(|(_, value)| value)
    }
}

/// Iterator over typed objects
#[derive(Debug, Clone)]
pub struct ObjectIter<'a, T> {
    header: ObjectHeader,
    data: &'a [u8],
    pos: usize,
    remaining: usize,
    _object: PhantomData<T>,
}

impl<T: FixedObject> Iterator for ObjectIter<'_, T> {
    type Item = (u16, T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let prefix = self.header.qualifier.prefix_len();
        let bytes = &self.data[self.pos..];
        let index = match (prefix, self.header.range) {
            (1, _) => u16::from(bytes[0]),
            (2, _) => LittleEndian::read_u16(bytes),
            (_, Range::StartStop(start, _)) => start + self.seen() as u16,
            _ => self.seen() as u16,
        };
        let value = T::read(&bytes[prefix..]);
        self.pos += prefix + T::SIZE;
        self.remaining -= 1;
        Some((index, value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ObjectIter<'_, T> {
    fn seen(&self) -> usize {
        self.header.object_count() - self.remaining
    }
}
