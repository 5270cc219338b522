use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{
    errors::{Error, Result},
    types::wire::{ensure, BoltWireFormat},
    Version,
};

pub const MARKER: u8 = 0xC0;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Hash)]
pub struct BoltNull;

impl BoltWireFormat for BoltNull {
    fn can_parse(_: Version, input: &[u8]) -> bool {
        input.first() == Some(&MARKER)
    }

    fn parse(_: Version, input: &mut Bytes) -> Result<Self> {
        ensure(input, 1)?;
        let marker = input.get_u8();
        if marker != MARKER {
            return Err(Error::InvalidTypeMarker(format!(
                "invalid null marker {marker:#04X}"
            )));
        }
        Ok(BoltNull)
    }

    fn write_into(&self, _: Version, bytes: &mut BytesMut) -> Result<()> {
        bytes.put_u8(MARKER);
        Ok(())
    }
}
