use bytes::{Bytes, BytesMut};

use crate::{
    errors::{Error, Result},
    types::wire::{structure, BoltWireFormat},
    types::{BoltInteger, BoltList, BoltMap, BoltString, BoltType},
    Version,
};

pub const SIGNATURE: u8 = 0x4E;

/// A node in the graph. Bolt 5 adds a string `element_id` next to the
/// legacy numeric id; the wire shape is picked by the struct's field count
/// on decode and by the connection version on encode.
#[derive(Debug, PartialEq, Clone)]
pub struct BoltNode {
    pub id: BoltInteger,
    pub labels: BoltList,
    pub properties: BoltMap,
    pub element_id: Option<BoltString>,
}

impl BoltNode {
    pub fn new(id: BoltInteger, labels: BoltList, properties: BoltMap) -> Self {
        BoltNode {
            id,
            labels,
            properties,
            element_id: None,
        }
    }

    pub fn get<T: TryFrom<BoltType>>(&self, key: &str) -> Option<T> {
        self.properties.get(key)
    }

    pub fn labels(&self) -> Vec<String> {
        self.labels
            .iter()
            .filter_map(|l| match l {
                BoltType::String(s) => Some(s.value.clone()),
                _ => None,
            })
            .collect()
    }
}

impl BoltWireFormat for BoltNode {
    fn can_parse(_: Version, input: &[u8]) -> bool {
        structure::peek_signature(input) == Some(SIGNATURE)
    }

    fn parse(version: Version, input: &mut Bytes) -> Result<Self> {
        let (fields, signature) = structure::read_header(input)?;
        if signature != SIGNATURE {
            return Err(Error::UnknownStructSignature(signature));
        }
        if fields != 3 && fields != 4 {
            return Err(Error::UnexpectedMessage(format!(
                "a node has 3 or 4 fields, got {fields}"
            )));
        }
        let id = BoltInteger::parse(version, input)?;
        let labels = BoltList::parse(version, input)?;
        let properties = BoltMap::parse(version, input)?;
        let element_id = if fields == 4 {
            Some(BoltString::parse(version, input)?)
        } else {
            None
        };
        Ok(BoltNode {
            id,
            labels,
            properties,
            element_id,
        })
    }

    fn write_into(&self, version: Version, bytes: &mut BytesMut) -> Result<()> {
        let fields = if version.supports_element_id() { 4 } else { 3 };
        structure::write_header(bytes, fields, SIGNATURE);
        self.id.write_into(version, bytes)?;
        self.labels.write_into(version, bytes)?;
        self.properties.write_into(version, bytes)?;
        if fields == 4 {
            self.element_id
                .clone()
                .unwrap_or_default()
                .write_into(version, bytes)?;
        }
        Ok(())
    }
}

impl From<BoltNode> for BoltType {
    fn from(value: BoltNode) -> Self {
        BoltType::Node(value)
    }
}
