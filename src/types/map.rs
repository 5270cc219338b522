use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::HashMap;
use std::iter::FromIterator;
use std::mem;

use crate::{
    errors::{Error, Result},
    types::wire::{ensure, BoltWireFormat},
    types::{BoltString, BoltType},
    Version,
};

pub const TINY: u8 = 0xA0;
pub const SMALL: u8 = 0xD8;
pub const MEDIUM: u8 = 0xD9;
pub const LARGE: u8 = 0xDA;

#[derive(Debug, PartialEq, Clone, Default)]
pub struct BoltMap {
    pub value: HashMap<BoltString, BoltType>,
}

impl BoltMap {
    pub fn new() -> Self {
        BoltMap::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        BoltMap {
            value: HashMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn put(&mut self, key: BoltString, value: BoltType) {
        self.value.insert(key, value);
    }

    /// Typed lookup. Returns `None` both for missing keys and for values
    /// that do not convert to `T`.
    pub fn get<T: TryFrom<BoltType>>(&self, key: &str) -> Option<T> {
        self.value
            .get(&BoltString::new(key))
            .and_then(|value| T::try_from(value.clone()).ok())
    }

    pub fn remove(&mut self, key: &str) -> Option<BoltType> {
        self.value.remove(&BoltString::new(key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.value.contains_key(&BoltString::new(key))
    }
}

impl FromIterator<(BoltString, BoltType)> for BoltMap {
    fn from_iter<T: IntoIterator<Item = (BoltString, BoltType)>>(iter: T) -> Self {
        BoltMap {
            value: iter.into_iter().collect(),
        }
    }
}

impl BoltWireFormat for BoltMap {
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
            0xA0..=0xAF => (marker & 0x0F) as usize,
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
                    "invalid map marker {marker:#04X}"
                )))
            }
        };

        let mut map = BoltMap::with_capacity(length);
        for _ in 0..length {
            if !BoltString::can_parse(version, input) {
                let marker = input.first().copied().ok_or(Error::TruncatedInput)?;
                return Err(Error::NonStringMapKey(marker));
            }
            let key = BoltString::parse(version, input)?;
            let value = BoltType::parse(version, input)?;
            map.put(key, value);
        }
        Ok(map)
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
            _ => return Err(Error::MapTooBig),
        }
        for (key, value) in &self.value {
            key.write_into(version, bytes)?;
            value.write_into(version, bytes)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_of(len: usize) -> BoltMap {
        (0..len)
            .map(|i| (i.to_string().into(), BoltType::from(i as i64)))
            .collect()
    }

    fn roundtrip(map: BoltMap) -> Bytes {
        let bytes = map.clone().into_bytes(Version::V4_4).unwrap();
        let mut input = bytes.clone();
        let parsed = BoltMap::parse(Version::V4_4, &mut input).unwrap();
        assert_eq!(parsed, map);
        assert!(input.is_empty());
        bytes
    }

    #[test]
    fn should_serialize_empty_map() {
        assert_eq!(&roundtrip(BoltMap::new())[..], &[TINY]);
    }

    #[test]
    fn should_serialize_map_of_strings() {
        let mut map = BoltMap::new();
        map.put("a".into(), "b".into());
        assert_eq!(&roundtrip(map)[..], &[0xA1, 0x81, 0x61, 0x81, 0x62]);
    }

    #[test]
    fn picks_the_size_class_at_every_boundary() {
        for (len, marker) in [
            (15, TINY | 15),
            (16, SMALL),
            (255, SMALL),
            (256, MEDIUM),
            (65_535, MEDIUM),
            (65_536, LARGE),
        ] {
            let bytes = roundtrip(map_of(len));
            assert_eq!(bytes[0], marker, "marker for length {len}");
        }
    }

    #[test]
    fn typed_get_converts_values() {
        let mut map = BoltMap::new();
        map.put("n".into(), BoltType::from(42));
        map.put("name".into(), BoltType::from("alice"));
        assert_eq!(map.get::<i64>("n"), Some(42));
        assert_eq!(map.get::<String>("name"), Some("alice".to_string()));
        assert_eq!(map.get::<i64>("name"), None);
        assert_eq!(map.get::<i64>("missing"), None);
    }

    #[test]
    fn non_string_keys_are_rejected() {
        // {1: "a"} — an integer where a key should be
        let mut input = Bytes::from_static(&[0xA1, 0x01, 0x81, 0x61]);
        assert!(matches!(
            BoltMap::parse(Version::V4_4, &mut input),
            Err(Error::NonStringMapKey(0x01))
        ));
    }
}
