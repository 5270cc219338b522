use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::mem;
use std::ops::{Add, Sub};

use crate::{
    errors::{Error, Result},
    types::wire::{ensure, BoltWireFormat},
    Version,
};

pub const INT_8: u8 = 0xC8;
pub const INT_16: u8 = 0xC9;
pub const INT_32: u8 = 0xCA;
pub const INT_64: u8 = 0xCB;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct BoltInteger {
    pub value: i64,
}

impl BoltInteger {
    pub fn new(value: i64) -> BoltInteger {
        BoltInteger { value }
    }
}

impl Add for BoltInteger {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        (self.value + rhs.value).into()
    }
}

impl Sub for BoltInteger {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        (self.value - rhs.value).into()
    }
}

impl BoltWireFormat for BoltInteger {
    fn can_parse(_: Version, input: &[u8]) -> bool {
        match input.first() {
            Some(&marker) => {
                (-16..=127).contains(&(marker as i8))
                    || marker == INT_8
                    || marker == INT_16
                    || marker == INT_32
                    || marker == INT_64
            }
            None => false,
        }
    }

    fn parse(_: Version, input: &mut Bytes) -> Result<Self> {
        ensure(input, 1)?;
        let value: i64 = match input.get_u8() {
            marker if (-16..=127).contains(&(marker as i8)) => marker as i8 as i64,
            INT_8 => {
                ensure(input, 1)?;
                input.get_i8() as i64
            }
            INT_16 => {
                ensure(input, 2)?;
                input.get_i16() as i64
            }
            INT_32 => {
                ensure(input, 4)?;
                input.get_i32() as i64
            }
            INT_64 => {
                ensure(input, 8)?;
                input.get_i64()
            }
            marker => {
                return Err(Error::InvalidTypeMarker(format!(
                    "invalid integer marker {marker:#04X}"
                )))
            }
        };

        Ok(BoltInteger::new(value))
    }

    fn write_into(&self, _: Version, bytes: &mut BytesMut) -> Result<()> {
        bytes.reserve(mem::size_of::<u8>() + mem::size_of::<i64>());
        match self.value {
            -16..=127 => bytes.put_u8(self.value as u8),
            -128..=-17 => {
                bytes.put_u8(INT_8);
                bytes.put_i8(self.value as i8);
            }
            128..=32_767 | -32_768..=-129 => {
                bytes.put_u8(INT_16);
                bytes.put_i16(self.value as i16);
            }
            32_768..=2_147_483_647 | -2_147_483_648..=-32_769 => {
                bytes.put_u8(INT_32);
                bytes.put_i32(self.value as i32);
            }
            _ => {
                bytes.put_u8(INT_64);
                bytes.put_i64(self.value);
            }
        }
        Ok(())
    }
}

impl From<i64> for BoltInteger {
    fn from(value: i64) -> Self {
        BoltInteger::new(value)
    }
}

impl From<i32> for BoltInteger {
    fn from(value: i32) -> Self {
        BoltInteger::new(value as i64)
    }
}

impl From<BoltInteger> for i64 {
    fn from(value: BoltInteger) -> Self {
        value.value
    }
}
