use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{
    errors::{Error, Result},
    types::wire::{ensure, BoltWireFormat},
    Version,
};

pub const FALSE: u8 = 0xC2;
pub const TRUE: u8 = 0xC3;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct BoltBoolean {
    pub value: bool,
}

impl BoltBoolean {
    pub fn new(value: bool) -> Self {
        BoltBoolean { value }
    }
}

impl From<bool> for BoltBoolean {
    fn from(value: bool) -> Self {
        BoltBoolean::new(value)
    }
}

impl BoltWireFormat for BoltBoolean {
    fn can_parse(_: Version, input: &[u8]) -> bool {
        matches!(input.first(), Some(&FALSE) | Some(&TRUE))
    }

    fn parse(_: Version, input: &mut Bytes) -> Result<Self> {
        ensure(input, 1)?;
        match input.get_u8() {
            FALSE => Ok(BoltBoolean::new(false)),
            TRUE => Ok(BoltBoolean::new(true)),
            marker => Err(Error::InvalidTypeMarker(format!(
                "invalid boolean marker {marker:#04X}"
            ))),
        }
    }

    fn write_into(&self, _: Version, bytes: &mut BytesMut) -> Result<()> {
        bytes.put_u8(if self.value { TRUE } else { FALSE });
        Ok(())
    }
}
