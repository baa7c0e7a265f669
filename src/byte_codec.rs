//! Endian-parameterized primitive reads and writes
//!
//! Every read takes the byte order explicitly and is bounds-checked against
//! the slice it reads from. The reader fixes the order once from the TIFF
//! order mark; the writer fixes it at construction.

use crate::{
    error::{Error, Result},
    rational::{CoordinateTriple, Rational, SignedRational},
};
use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Byte order of a TIFF structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Endian {
    /// "II" (Intel)
    Little,
    /// "MM" (Motorola)
    #[default]
    Big,
}

/// Bounds-checked sub-slice
fn slice_at(data: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    offset
        .checked_add(len)
        .and_then(|end| data.get(offset..end))
        .ok_or(Error::OutOfBounds {
            offset,
            len,
            size: data.len(),
        })
}

/// Bounds-checked mutable sub-slice
fn slice_at_mut(data: &mut [u8], offset: usize, len: usize) -> Result<&mut [u8]> {
    let size = data.len();
    offset
        .checked_add(len)
        .and_then(|end| data.get_mut(offset..end))
        .ok_or(Error::OutOfBounds { offset, len, size })
}

impl Endian {
    /// Detect from the 2-byte TIFF order mark
    pub fn from_order_mark(mark: &[u8]) -> Option<Self> {
        match mark {
            b"II" => Some(Endian::Little),
            b"MM" => Some(Endian::Big),
            _ => None,
        }
    }

    /// The 2-byte TIFF order mark for this byte order
    pub fn order_mark(self) -> &'static [u8; 2] {
        match self {
            Endian::Little => b"II",
            Endian::Big => b"MM",
        }
    }

    pub fn is_big(self) -> bool {
        self == Endian::Big
    }

    pub fn read_u8(self, data: &[u8], offset: usize) -> Result<u8> {
        Ok(slice_at(data, offset, 1)?[0])
    }

    pub fn read_u16(self, data: &[u8], offset: usize) -> Result<u16> {
        let bytes = slice_at(data, offset, 2)?;
        Ok(match self {
            Endian::Little => LittleEndian::read_u16(bytes),
            Endian::Big => BigEndian::read_u16(bytes),
        })
    }

    pub fn read_i16(self, data: &[u8], offset: usize) -> Result<i16> {
        let bytes = slice_at(data, offset, 2)?;
        Ok(match self {
            Endian::Little => LittleEndian::read_i16(bytes),
            Endian::Big => BigEndian::read_i16(bytes),
        })
    }

    pub fn read_u32(self, data: &[u8], offset: usize) -> Result<u32> {
        let bytes = slice_at(data, offset, 4)?;
        Ok(match self {
            Endian::Little => LittleEndian::read_u32(bytes),
            Endian::Big => BigEndian::read_u32(bytes),
        })
    }

    pub fn read_i32(self, data: &[u8], offset: usize) -> Result<i32> {
        let bytes = slice_at(data, offset, 4)?;
        Ok(match self {
            Endian::Little => LittleEndian::read_i32(bytes),
            Endian::Big => BigEndian::read_i32(bytes),
        })
    }

    pub fn read_f32(self, data: &[u8], offset: usize) -> Result<f32> {
        let bytes = slice_at(data, offset, 4)?;
        Ok(match self {
            Endian::Little => LittleEndian::read_f32(bytes),
            Endian::Big => BigEndian::read_f32(bytes),
        })
    }

    pub fn read_f64(self, data: &[u8], offset: usize) -> Result<f64> {
        let bytes = slice_at(data, offset, 8)?;
        Ok(match self {
            Endian::Little => LittleEndian::read_f64(bytes),
            Endian::Big => BigEndian::read_f64(bytes),
        })
    }

    pub fn read_rational(self, data: &[u8], offset: usize) -> Result<Rational> {
        slice_at(data, offset, 8)?;
        Ok(Rational::new(
            self.read_u32(data, offset)?,
            self.read_u32(data, offset + 4)?,
        ))
    }

    pub fn read_signed_rational(self, data: &[u8], offset: usize) -> Result<SignedRational> {
        slice_at(data, offset, 8)?;
        Ok(SignedRational::new(
            self.read_i32(data, offset)?,
            self.read_i32(data, offset + 4)?,
        ))
    }

    pub fn read_coordinate_triple(self, data: &[u8], offset: usize) -> Result<CoordinateTriple> {
        slice_at(data, offset, 24)?;
        Ok(CoordinateTriple::new(
            self.read_rational(data, offset)?,
            self.read_rational(data, offset + 8)?,
            self.read_rational(data, offset + 16)?,
        ))
    }

    /// Overwrite two bytes at `offset`
    pub fn write_u16(self, data: &mut [u8], offset: usize, value: u16) -> Result<()> {
        let slot = slice_at_mut(data, offset, 2)?;
        match self {
            Endian::Little => LittleEndian::write_u16(slot, value),
            Endian::Big => BigEndian::write_u16(slot, value),
        }
        Ok(())
    }

    /// Overwrite four bytes at `offset`
    pub fn write_u32(self, data: &mut [u8], offset: usize, value: u32) -> Result<()> {
        let slot = slice_at_mut(data, offset, 4)?;
        match self {
            Endian::Little => LittleEndian::write_u32(slot, value),
            Endian::Big => BigEndian::write_u32(slot, value),
        }
        Ok(())
    }

    /// Bounds-checked copy of `len` bytes
    pub fn read_bytes(self, data: &[u8], offset: usize, len: usize) -> Result<Vec<u8>> {
        Ok(slice_at(data, offset, len)?.to_vec())
    }

    /// Reverse each `width`-byte component of `data` in place when `self`
    /// differs from `target`
    ///
    /// Used to carry opaque entry values between byte orders.
    pub fn convert_components(self, target: Endian, data: &mut [u8], width: usize) {
        if self == target || width < 2 {
            return;
        }
        for chunk in data.chunks_exact_mut(width) {
            chunk.reverse();
        }
    }
}

/// Growable byte buffer with a fixed byte order
#[derive(Debug, Clone)]
pub struct ByteBuilder {
    order: Endian,
    data: Vec<u8>,
}

impl ByteBuilder {
    pub fn new(order: Endian) -> Self {
        Self {
            order,
            data: Vec::new(),
        }
    }

    pub fn order(&self) -> Endian {
        self.order
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    pub fn put_u8(&mut self, value: u8) {
        self.data.push(value);
    }

    pub fn put_u16(&mut self, value: u16) {
        let mut buf = [0u8; 2];
        match self.order {
            Endian::Little => LittleEndian::write_u16(&mut buf, value),
            Endian::Big => BigEndian::write_u16(&mut buf, value),
        }
        self.data.extend_from_slice(&buf);
    }

    pub fn put_u32(&mut self, value: u32) {
        let mut buf = [0u8; 4];
        match self.order {
            Endian::Little => LittleEndian::write_u32(&mut buf, value),
            Endian::Big => BigEndian::write_u32(&mut buf, value),
        }
        self.data.extend_from_slice(&buf);
    }

    pub fn put_i32(&mut self, value: i32) {
        let mut buf = [0u8; 4];
        match self.order {
            Endian::Little => LittleEndian::write_i32(&mut buf, value),
            Endian::Big => BigEndian::write_i32(&mut buf, value),
        }
        self.data.extend_from_slice(&buf);
    }

    pub fn put_rational(&mut self, value: Rational) {
        self.put_u32(value.numerator);
        self.put_u32(value.denominator);
    }

    pub fn put_signed_rational(&mut self, value: SignedRational) {
        self.put_i32(value.numerator);
        self.put_i32(value.denominator);
    }

    pub fn put_coordinate_triple(&mut self, value: CoordinateTriple) {
        self.put_rational(value.degrees);
        self.put_rational(value.minutes);
        self.put_rational(value.seconds);
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Append zero bytes
    pub fn put_zeros(&mut self, count: usize) {
        self.data.resize(self.data.len() + count, 0);
    }

    /// Overwrite a previously reserved 4-byte slot
    pub fn patch_u32(&mut self, position: usize, value: u32) -> Result<()> {
        self.order.write_u32(&mut self.data, position, value)
    }

    /// Overwrite a previously reserved 2-byte slot
    pub fn patch_u16(&mut self, position: usize, value: u16) -> Result<()> {
        self.order.write_u16(&mut self.data, position, value)
    }

    /// Overwrite bytes at `position` with `bytes`
    pub fn patch_bytes(&mut self, position: usize, bytes: &[u8]) -> Result<()> {
        slice_at_mut(&mut self.data, position, bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }
}
