use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt::Display;
use std::mem;

use crate::{
    errors::{Error, Result},
    types::wire::{ensure, BoltWireFormat},
    Version,
};

pub const TINY: u8 = 0x80;
pub const SMALL: u8 = 0xD0;
pub const MEDIUM: u8 = 0xD1;
pub const LARGE: u8 = 0xD2;

#[derive(Debug, PartialEq, Eq, Hash, Clone, Default)]
pub struct BoltString {
    pub value: String,
}

impl BoltString {
    pub fn new(value: &str) -> Self {
        BoltString {
            value: value.to_string(),
        }
    }
}

impl Display for BoltString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl From<&str> for BoltString {
    fn from(v: &str) -> Self {
        BoltString::new(v)
    }
}

impl From<String> for BoltString {
    fn from(value: String) -> Self {
        BoltString { value }
    }
}

impl From<BoltString> for String {
    fn from(value: BoltString) -> Self {
        value.value
    }
}

impl BoltWireFormat for BoltString {
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

    fn parse(_: Version, input: &mut Bytes) -> Result<Self> {
        ensure(input, 1)?;
        let marker = input.get_u8();
        let length = match marker {
            0x80..=0x8F => (marker & 0x0F) as usize,
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
                    "invalid string marker {marker:#04X}"
                )))
            }
        };
        ensure(input, length)?;
        let value = String::from_utf8(input.split_to(length).to_vec())?;
        Ok(value.into())
    }

    fn write_into(&self, _: Version, bytes: &mut BytesMut) -> Result<()> {
        bytes.reserve(mem::size_of::<u8>() + mem::size_of::<u32>() + self.value.len());
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
            _ => return Err(Error::StringTooLong),
        }
        bytes.put_slice(self.value.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(value: &str) -> Bytes {
        let bytes = BoltString::new(value).into_bytes(Version::V4_4).unwrap();
        let mut input = bytes.clone();
        let parsed = BoltString::parse(Version::V4_4, &mut input).unwrap();
        assert_eq!(parsed.value, value);
        assert!(input.is_empty());
        bytes
    }

    #[test]
    fn should_serialize_empty_string() {
        assert_eq!(&roundtrip("")[..], &[TINY]);
    }

    #[test]
    fn should_serialize_tiny_string() {
        assert_eq!(&roundtrip("a")[..], &[0x81, 0x61]);
    }

    #[test]
    fn picks_the_size_class_at_every_boundary() {
        for (len, marker, header) in [
            (15, TINY | 15, 1),
            (16, SMALL, 2),
            (255, SMALL, 2),
            (256, MEDIUM, 3),
            (65_535, MEDIUM, 3),
            (65_536, LARGE, 5),
        ] {
            let bytes = roundtrip(&"a".repeat(len));
            assert_eq!(bytes[0], marker, "marker for length {len}");
            assert_eq!(bytes.len(), header + len, "length for {len}");
        }
    }

    #[test]
    fn multi_byte_utf8_roundtrips() {
        roundtrip("grüße, 世界");
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        let mut input = Bytes::from_static(&[0x82, 0xC3, 0x28]);
        assert!(matches!(
            BoltString::parse(Version::V4_4, &mut input),
            Err(Error::BadUtf8(_))
        ));
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let mut input = Bytes::from_static(&[0x84, b'a', b'b']);
        assert!(matches!(
            BoltString::parse(Version::V4_4, &mut input),
            Err(Error::TruncatedInput)
        ));
    }
}
