use bytes::{Bytes, BytesMut};

use crate::{
    errors::{Error, Result},
    types::wire::{structure, BoltWireFormat},
    types::{BoltMap, BoltType},
    Version,
};

pub(crate) const SIGNATURE: u8 = 0x70;

/// SUCCESS terminates every request's response sequence, carrying the
/// request's summary metadata.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct Success {
    metadata: BoltMap,
}

impl Success {
    pub fn new(metadata: BoltMap) -> Success {
        Success { metadata }
    }

    pub fn get<T: TryFrom<BoltType>>(&self, key: &str) -> Option<T> {
        self.metadata.get(key)
    }

    pub fn metadata(&self) -> &BoltMap {
        &self.metadata
    }

    /// The column names a RUN success announces.
    pub fn fields(&self) -> Vec<String> {
        self.get::<Vec<String>>("fields").unwrap_or_default()
    }

    /// The query id a RUN success assigns inside explicit transactions.
    pub fn qid(&self) -> i64 {
        self.get::<i64>("qid").unwrap_or(-1)
    }

    /// Whether a PULL/DISCARD success left the stream open.
    pub fn has_more(&self) -> bool {
        self.get::<bool>("has_more").unwrap_or(false)
    }

    pub fn bookmark(&self) -> Option<String> {
        self.get::<String>("bookmark")
    }
}

impl BoltWireFormat for Success {
    fn can_parse(_version: Version, input: &[u8]) -> bool {
        structure::peek_signature(input) == Some(SIGNATURE)
    }

    fn parse(version: Version, input: &mut Bytes) -> Result<Self> {
        let (fields, signature) = structure::read_header(input)?;
        if signature != SIGNATURE || fields != 1 {
            return Err(Error::UnexpectedMessage(format!(
                "not a SUCCESS message: signature {signature:#04X} with {fields} fields"
            )));
        }
        let metadata = BoltMap::parse(version, input)?;
        Ok(Success { metadata })
    }

    fn write_into(&self, version: Version, bytes: &mut BytesMut) -> Result<()> {
        structure::write_header(bytes, 1, SIGNATURE);
        self.metadata.write_into(version, bytes)?;
        Ok(())
    }
}
