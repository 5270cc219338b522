use bytes::{Bytes, BytesMut};

use crate::{
    errors::{Error, Result, ServerError},
    types::wire::{structure, BoltWireFormat},
    types::BoltMap,
    Version,
};

pub(crate) const SIGNATURE: u8 = 0x7F;

/// FAILURE parks the server side of the connection in the FAILED state
/// until it is acknowledged by RESET (or ACK_FAILURE before v4).
#[derive(Debug, PartialEq, Clone)]
pub struct Failure {
    metadata: BoltMap,
}

impl Failure {
    pub fn new(metadata: BoltMap) -> Failure {
        Failure { metadata }
    }

    pub fn code(&self) -> String {
        self.metadata
            .get::<String>("code")
            .unwrap_or_else(|| "Neo.DatabaseError.General.UnknownError".to_string())
    }

    pub fn message(&self) -> String {
        self.metadata.get::<String>("message").unwrap_or_default()
    }

    pub(crate) fn into_error(self) -> Error {
        ServerError::new(self.code(), self.message()).into_error()
    }
}

impl BoltWireFormat for Failure {
    fn can_parse(_version: Version, input: &[u8]) -> bool {
        structure::peek_signature(input) == Some(SIGNATURE)
    }

    fn parse(version: Version, input: &mut Bytes) -> Result<Self> {
        let (fields, signature) = structure::read_header(input)?;
        if signature != SIGNATURE || fields != 1 {
            return Err(Error::UnexpectedMessage(format!(
                "not a FAILURE message: signature {signature:#04X} with {fields} fields"
            )));
        }
        let metadata = BoltMap::parse(version, input)?;
        Ok(Failure { metadata })
    }

    fn write_into(&self, version: Version, bytes: &mut BytesMut) -> Result<()> {
        structure::write_header(bytes, 1, SIGNATURE);
        self.metadata.write_into(version, bytes)?;
        Ok(())
    }
}
