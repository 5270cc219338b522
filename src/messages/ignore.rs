use bytes::{Bytes, BytesMut};

use crate::{
    errors::{Error, Result},
    types::wire::{structure, BoltWireFormat},
    Version,
};

pub(crate) const SIGNATURE: u8 = 0x7E;

/// IGNORED answers any request that arrives while the server side is in
/// the FAILED state. The pending work was dropped, not executed.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Ignored;

impl BoltWireFormat for Ignored {
    fn can_parse(_version: Version, input: &[u8]) -> bool {
        structure::peek_signature(input) == Some(SIGNATURE)
    }

    fn parse(_version: Version, input: &mut Bytes) -> Result<Self> {
        let (fields, signature) = structure::read_header(input)?;
        if signature != SIGNATURE || fields != 0 {
            return Err(Error::UnexpectedMessage(format!(
                "not an IGNORED message: signature {signature:#04X} with {fields} fields"
            )));
        }
        Ok(Ignored)
    }

    fn write_into(&self, _version: Version, bytes: &mut BytesMut) -> Result<()> {
        structure::write_header(bytes, 0, SIGNATURE);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignored_roundtrips() {
        let mut bytes = Ignored.into_bytes(Version::V4_4).unwrap();
        assert_eq!(&bytes[..], &[0xB0, SIGNATURE]);
        assert_eq!(Ignored::parse(Version::V4_4, &mut bytes).unwrap(), Ignored);
    }
}
