use bytes::{Bytes, BytesMut};

use crate::{
    errors::{Error, Result},
    types::wire::{structure, BoltWireFormat},
    types::{BoltInteger, BoltMap, BoltString, BoltType},
    Version,
};

pub const SIGNATURE: u8 = 0x52;
pub const UNBOUNDED_SIGNATURE: u8 = 0x72;

/// A relationship between two nodes. Bolt 5 adds element ids for the
/// relationship itself and both end nodes (8 fields instead of 5).
#[derive(Debug, PartialEq, Clone)]
pub struct BoltRelation {
    pub id: BoltInteger,
    pub start_node_id: BoltInteger,
    pub end_node_id: BoltInteger,
    pub typ: BoltString,
    pub properties: BoltMap,
    pub element_id: Option<BoltString>,
    pub start_node_element_id: Option<BoltString>,
    pub end_node_element_id: Option<BoltString>,
}

impl BoltRelation {
    pub fn get<T: TryFrom<BoltType>>(&self, key: &str) -> Option<T> {
        self.properties.get(key)
    }
}

impl BoltWireFormat for BoltRelation {
    fn can_parse(_: Version, input: &[u8]) -> bool {
        structure::peek_signature(input) == Some(SIGNATURE)
    }

    fn parse(version: Version, input: &mut Bytes) -> Result<Self> {
        let (fields, signature) = structure::read_header(input)?;
        if signature != SIGNATURE {
            return Err(Error::UnknownStructSignature(signature));
        }
        if fields != 5 && fields != 8 {
            return Err(Error::UnexpectedMessage(format!(
                "a relationship has 5 or 8 fields, got {fields}"
            )));
        }
        let id = BoltInteger::parse(version, input)?;
        let start_node_id = BoltInteger::parse(version, input)?;
        let end_node_id = BoltInteger::parse(version, input)?;
        let typ = BoltString::parse(version, input)?;
        let properties = BoltMap::parse(version, input)?;
        let (element_id, start_node_element_id, end_node_element_id) = if fields == 8 {
            (
                Some(BoltString::parse(version, input)?),
                Some(BoltString::parse(version, input)?),
                Some(BoltString::parse(version, input)?),
            )
        } else {
            (None, None, None)
        };
        Ok(BoltRelation {
            id,
            start_node_id,
            end_node_id,
            typ,
            properties,
            element_id,
            start_node_element_id,
            end_node_element_id,
        })
    }

    fn write_into(&self, version: Version, bytes: &mut BytesMut) -> Result<()> {
        let fields = if version.supports_element_id() { 8 } else { 5 };
        structure::write_header(bytes, fields, SIGNATURE);
        self.id.write_into(version, bytes)?;
        self.start_node_id.write_into(version, bytes)?;
        self.end_node_id.write_into(version, bytes)?;
        self.typ.write_into(version, bytes)?;
        self.properties.write_into(version, bytes)?;
        if fields == 8 {
            for element_id in [
                &self.element_id,
                &self.start_node_element_id,
                &self.end_node_element_id,
            ] {
                element_id
                    .clone()
                    .unwrap_or_default()
                    .write_into(version, bytes)?;
            }
        }
        Ok(())
    }
}

impl From<BoltRelation> for BoltType {
    fn from(value: BoltRelation) -> Self {
        BoltType::Relation(value)
    }
}

/// A relationship inside a Path, without its endpoint ids.
#[derive(Debug, PartialEq, Clone)]
pub struct BoltUnboundedRelation {
    pub id: BoltInteger,
    pub typ: BoltString,
    pub properties: BoltMap,
    pub element_id: Option<BoltString>,
}

impl BoltUnboundedRelation {
    pub fn new(id: BoltInteger, typ: BoltString, properties: BoltMap) -> Self {
        BoltUnboundedRelation {
            id,
            typ,
            properties,
            element_id: None,
        }
    }
}

impl BoltWireFormat for BoltUnboundedRelation {
    fn can_parse(_: Version, input: &[u8]) -> bool {
        structure::peek_signature(input) == Some(UNBOUNDED_SIGNATURE)
    }

    fn parse(version: Version, input: &mut Bytes) -> Result<Self> {
        let (fields, signature) = structure::read_header(input)?;
        if signature != UNBOUNDED_SIGNATURE {
            return Err(Error::UnknownStructSignature(signature));
        }
        if fields != 3 && fields != 4 {
            return Err(Error::UnexpectedMessage(format!(
                "an unbound relationship has 3 or 4 fields, got {fields}"
            )));
        }
        let id = BoltInteger::parse(version, input)?;
        let typ = BoltString::parse(version, input)?;
        let properties = BoltMap::parse(version, input)?;
        let element_id = if fields == 4 {
            Some(BoltString::parse(version, input)?)
        } else {
            None
        };
        Ok(BoltUnboundedRelation {
            id,
            typ,
            properties,
            element_id,
        })
    }

    fn write_into(&self, version: Version, bytes: &mut BytesMut) -> Result<()> {
        let fields = if version.supports_element_id() { 4 } else { 3 };
        structure::write_header(bytes, fields, UNBOUNDED_SIGNATURE);
        self.id.write_into(version, bytes)?;
        self.typ.write_into(version, bytes)?;
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

impl From<BoltUnboundedRelation> for BoltType {
    fn from(value: BoltUnboundedRelation) -> Self {
        BoltType::UnboundedRelation(value)
    }
}
