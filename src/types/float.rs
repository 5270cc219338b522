use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{
    errors::{Error, Result},
    types::wire::{ensure, BoltWireFormat},
    Version,
};

pub const MARKER: u8 = 0xC1;

#[derive(Debug, PartialEq, Clone, Copy)]
pub struct BoltFloat {
    pub value: f64,
}

impl BoltFloat {
    pub fn new(value: f64) -> Self {
        BoltFloat { value }
    }
}

impl From<f64> for BoltFloat {
    fn from(value: f64) -> Self {
        BoltFloat::new(value)
    }
}

impl BoltWireFormat for BoltFloat {
    fn can_parse(_: Version, input: &[u8]) -> bool {
        input.first() == Some(&MARKER)
    }

    fn parse(_: Version, input: &mut Bytes) -> Result<Self> {
        ensure(input, 1)?;
        let marker = input.get_u8();
        if marker != MARKER {
            return Err(Error::InvalidTypeMarker(format!(
                "invalid float marker {marker:#04X}"
            )));
        }
        ensure(input, 8)?;
        Ok(BoltFloat::new(input.get_f64()))
    }

    fn write_into(&self, _: Version, bytes: &mut BytesMut) -> Result<()> {
        bytes.put_u8(MARKER);
        bytes.put_f64(self.value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_serialize_float() {
        let b = BoltFloat::new(1.23).into_bytes(Version::V4_4).unwrap();
        assert_eq!(
            &b[..],
            &[MARKER, 0x3F, 0xF3, 0xAE, 0x14, 0x7A, 0xE1, 0x47, 0xAE]
        );
    }

    #[test]
    fn should_deserialize_float() {
        let mut input =
            Bytes::from_static(&[MARKER, 0x3F, 0xF3, 0xAE, 0x14, 0x7A, 0xE1, 0x47, 0xAE]);
        let parsed = BoltFloat::parse(Version::V4_4, &mut input).unwrap();
        assert_eq!(parsed.value, 1.23);
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let mut input = Bytes::from_static(&[MARKER, 0x3F]);
        assert!(matches!(
            BoltFloat::parse(Version::V4_4, &mut input),
            Err(Error::TruncatedInput)
        ));
    }
}
