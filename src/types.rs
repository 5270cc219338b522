pub mod boolean;
pub mod float;
pub mod integer;
pub mod list;
pub mod map;
pub mod node;
pub mod null;
pub mod path;
pub mod relation;
pub mod string;
pub(crate) mod wire;

pub use boolean::BoltBoolean;
pub use float::BoltFloat;
pub use integer::BoltInteger;
pub use list::BoltList;
pub use map::BoltMap;
pub use node::BoltNode;
pub use null::BoltNull;
pub use path::BoltPath;
pub use relation::{BoltRelation, BoltUnboundedRelation};
pub use string::BoltString;

use crate::errors::{Error, Result};
use crate::version::Version;
use bytes::{Bytes, BytesMut};
use wire::{structure, BoltWireFormat};

/// A PackStream value. Values form trees, never cycles; structs with a
/// known signature decode into their typed shape, anything else fails.
#[derive(Debug, PartialEq, Clone)]
pub enum BoltType {
    Null(BoltNull),
    Boolean(BoltBoolean),
    Integer(BoltInteger),
    Float(BoltFloat),
    String(BoltString),
    List(BoltList),
    Map(BoltMap),
    Node(BoltNode),
    Relation(BoltRelation),
    UnboundedRelation(BoltUnboundedRelation),
    Path(BoltPath),
}

impl BoltWireFormat for BoltType {
    fn can_parse(version: Version, input: &[u8]) -> bool {
        BoltNull::can_parse(version, input)
            || BoltBoolean::can_parse(version, input)
            || BoltInteger::can_parse(version, input)
            || BoltFloat::can_parse(version, input)
            || BoltString::can_parse(version, input)
            || BoltList::can_parse(version, input)
            || BoltMap::can_parse(version, input)
            || BoltNode::can_parse(version, input)
            || BoltRelation::can_parse(version, input)
            || BoltUnboundedRelation::can_parse(version, input)
            || BoltPath::can_parse(version, input)
    }

    fn parse(version: Version, input: &mut Bytes) -> Result<Self> {
        let marker = *input.first().ok_or(Error::TruncatedInput)?;
        let value = match marker {
            null::MARKER => BoltType::Null(BoltNull::parse(version, input)?),
            boolean::FALSE | boolean::TRUE => {
                BoltType::Boolean(BoltBoolean::parse(version, input)?)
            }
            float::MARKER => BoltType::Float(BoltFloat::parse(version, input)?),
            integer::INT_8 | integer::INT_16 | integer::INT_32 | integer::INT_64 => {
                BoltType::Integer(BoltInteger::parse(version, input)?)
            }
            marker if (-16..=127).contains(&(marker as i8)) => {
                BoltType::Integer(BoltInteger::parse(version, input)?)
            }
            0x80..=0x8F | string::SMALL | string::MEDIUM | string::LARGE => {
                BoltType::String(BoltString::parse(version, input)?)
            }
            0x90..=0x9F | list::SMALL | list::MEDIUM | list::LARGE => {
                BoltType::List(BoltList::parse(version, input)?)
            }
            0xA0..=0xAF | map::SMALL | map::MEDIUM | map::LARGE => {
                BoltType::Map(BoltMap::parse(version, input)?)
            }
            marker if structure::is_struct_marker(marker) => {
                let signature =
                    structure::peek_signature(input).ok_or(Error::TruncatedInput)?;
                match signature {
                    node::SIGNATURE => BoltType::Node(BoltNode::parse(version, input)?),
                    relation::SIGNATURE => {
                        BoltType::Relation(BoltRelation::parse(version, input)?)
                    }
                    relation::UNBOUNDED_SIGNATURE => {
                        BoltType::UnboundedRelation(BoltUnboundedRelation::parse(version, input)?)
                    }
                    path::SIGNATURE => BoltType::Path(BoltPath::parse(version, input)?),
                    signature => return Err(Error::UnknownStructSignature(signature)),
                }
            }
            marker => {
                return Err(Error::InvalidTypeMarker(format!(
                    "unknown value marker {marker:#04X}"
                )))
            }
        };
        Ok(value)
    }

    fn write_into(&self, version: Version, bytes: &mut BytesMut) -> Result<()> {
        match self {
            BoltType::Null(t) => t.write_into(version, bytes),
            BoltType::Boolean(t) => t.write_into(version, bytes),
            BoltType::Integer(t) => t.write_into(version, bytes),
            BoltType::Float(t) => t.write_into(version, bytes),
            BoltType::String(t) => t.write_into(version, bytes),
            BoltType::List(t) => t.write_into(version, bytes),
            BoltType::Map(t) => t.write_into(version, bytes),
            BoltType::Node(t) => t.write_into(version, bytes),
            BoltType::Relation(t) => t.write_into(version, bytes),
            BoltType::UnboundedRelation(t) => t.write_into(version, bytes),
            BoltType::Path(t) => t.write_into(version, bytes),
        }
    }
}
