use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::iter::FromIterator;
use std::mem;

use crate::{
    errors::{Error, Result},
    types::wire::{ensure, BoltWireFormat},
    types::BoltType,
    Version,
};

pub const TINY: u8 = 0x90;
pub const SMALL: u8 = 0xD4;
pub const MEDIUM: u8 = 0xD5;
pub const LARGE: u8 = 0xD6;

#[derive(Debug, PartialEq, Clone, Default)]
pub struct BoltList {
    pub value: Vec<BoltType>,
}

impl BoltList {
    pub fn new() -> Self {
        BoltList { value: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        BoltList {
            value: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn push(&mut self, value: BoltType) {
        self.value.push(value);
    }

    pub fn get(&self, index: usize) -> Option<&BoltType> {
        self.value.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BoltType> {
        self.value.iter()
    }
}

impl FromIterator<BoltType> for BoltList {
    fn from_iter<T: IntoIterator<Item = BoltType>>(iter: T) -> Self {
        BoltList {
            value: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for BoltList {
    type Item = BoltType;
    type IntoIter = std::vec::IntoIter<BoltType>;

    fn into_iter(self) -> Self::IntoIter {
        self.value.into_iter()
    }
}

impl From<Vec<BoltType>> for BoltList {
    fn from(value: Vec<BoltType>) -> Self {
        BoltList { value }
    }
}

impl BoltWireFormat for BoltList {
    fn can_parse(_: Version, input: &[u8]) -> bool {
        match input.first() {
            Some(&marker) => {
                (TINY..=(TINY | 0x0F)).contains(&marker)
                    || marker == SMALL
                    || marker == MEDIUM
                    || marker == LARGE
            }
            None => false,
        }
    }

    fn parse(version: Version, input: &mut Bytes) -> Result<Self> {
        ensure(input, 1)?;
        let marker = input.get_u8();
        let length = match marker {
            0x90..=0x9F => (marker & 0x0F) as usize,
            SMALL => {
                ensure(input, 1)?;
                input.get_u8() as usize
            }
            MEDIUM => {
                ensure(input, 2)?;
                input.get_u16() as usize
            }
            LARGE => {
                ensure(input, 4)?;
                input.get_u32() as usize
            }
            _ => {
                return Err(Error::InvalidTypeMarker(format!(
                    "invalid list marker {marker:#04X}"
                )))
            }
        };

        let mut list = BoltList::with_capacity(length);
        for _ in 0..length {
            list.push(BoltType::parse(version, input)?);
        }
        Ok(list)
    }

    fn write_into(&self, version: Version, bytes: &mut BytesMut) -> Result<()> {
        bytes.reserve(mem::size_of::<u8>() + mem::size_of::<u32>());
        match self.value.len() {
            0..=15 => bytes.put_u8(TINY | self.value.len() as u8),
            16..=255 => {
                bytes.put_u8(SMALL);
                bytes.put_u8(self.value.len() as u8);
            }
            256..=65_535 => {
                bytes.put_u8(MEDIUM);
                bytes.put_u16(self.value.len() as u16);
            }
            65_536..=4_294_967_295 => {
                bytes.put_u8(LARGE);
                bytes.put_u32(self.value.len() as u32);
            }
            _ => return Err(Error::ListTooLong),
        }
        for value in &self.value {
            value.write_into(version, bytes)?;
        }
        Ok(())
    }
}
