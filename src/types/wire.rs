use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{
    errors::{Error, Result},
    Version,
};

pub(crate) trait BoltWireFormat: Sized {
    fn can_parse(version: Version, input: &[u8]) -> bool;

    fn parse(version: Version, input: &mut Bytes) -> Result<Self>;

    fn write_into(&self, version: Version, bytes: &mut BytesMut) -> Result<()>;

    fn into_bytes(self, version: Version) -> Result<Bytes> {
        let mut bytes = BytesMut::new();
        self.write_into(version, &mut bytes)?;
        Ok(bytes.freeze())
    }
}

/// Fails with `TruncatedInput` unless at least `needed` bytes remain.
pub(crate) fn ensure(input: &Bytes, needed: usize) -> Result<()> {
    if input.remaining() < needed {
        return Err(Error::TruncatedInput);
    }
    Ok(())
}

/// PackStream structure headers: a field count and a one-byte signature.
pub(crate) mod structure {
    use super::*;

    pub const TINY: u8 = 0xB0;
    pub const SMALL: u8 = 0xDC;
    pub const MEDIUM: u8 = 0xDD;

    pub(crate) fn write_header(bytes: &mut BytesMut, fields: usize, signature: u8) {
        debug_assert!(fields <= 0x0F, "tiny structs only");
        bytes.reserve(2);
        bytes.put_u8(TINY | fields as u8);
        bytes.put_u8(signature);
    }

    pub(crate) fn read_header(input: &mut Bytes) -> Result<(usize, u8)> {
        ensure(input, 2)?;
        let marker = input.get_u8();
        let fields = match marker {
            0xB0..=0xBF => (marker & 0x0F) as usize,
            SMALL => {
                ensure(input, 2)?;
                input.get_u8() as usize
            }
            MEDIUM => {
                ensure(input, 3)?;
                input.get_u16() as usize
            }
            _ => {
                return Err(Error::InvalidTypeMarker(format!(
                    "invalid struct marker {marker:#04X}"
                )))
            }
        };
        ensure(input, 1)?;
        let signature = input.get_u8();
        Ok((fields, signature))
    }

    /// Peeks the signature without consuming, for `can_parse` dispatch.
    pub(crate) fn peek_signature(input: &[u8]) -> Option<u8> {
        match *input {
            [marker, signature, ..] if (TINY..=0xBF).contains(&marker) => Some(signature),
            [SMALL, _, signature, ..] => Some(signature),
            [MEDIUM, _, _, signature, ..] => Some(signature),
            _ => None,
        }
    }

    pub(crate) fn is_struct_marker(marker: u8) -> bool {
        (TINY..=0xBF).contains(&marker) || marker == SMALL || marker == MEDIUM
    }
}
