use bytes::{Bytes, BytesMut};

use crate::{
    errors::{Error, Result},
    types::wire::{structure, BoltWireFormat},
    types::BoltList,
    Version,
};

pub(crate) const SIGNATURE: u8 = 0x71;

/// One row of a result stream, positionally matching the `fields` list
/// announced by the RUN success.
#[derive(Debug, PartialEq, Clone)]
pub struct Record {
    pub data: BoltList,
}

impl Record {
    pub fn new(data: BoltList) -> Record {
        Record { data }
    }
}

impl BoltWireFormat for Record {
    fn can_parse(_version: Version, input: &[u8]) -> bool {
        structure::peek_signature(input) == Some(SIGNATURE)
    }

    fn parse(version: Version, input: &mut Bytes) -> Result<Self> {
        let (fields, signature) = structure::read_header(input)?;
        if signature != SIGNATURE || fields != 1 {
            return Err(Error::UnexpectedMessage(format!(
                "not a RECORD message: signature {signature:#04X} with {fields} fields"
            )));
        }
        let data = BoltList::parse(version, input)?;
        Ok(Record { data })
    }

    fn write_into(&self, version: Version, bytes: &mut BytesMut) -> Result<()> {
        structure::write_header(bytes, 1, SIGNATURE);
        self.data.write_into(version, bytes)?;
        Ok(())
    }
}
