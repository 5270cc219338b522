use bytes::{Bytes, BytesMut};

use crate::{
    errors::{Error, Result},
    types::wire::{structure, BoltWireFormat},
    types::{BoltList, BoltNode, BoltType, BoltUnboundedRelation},
    Version,
};

pub const SIGNATURE: u8 = 0x50;

/// An alternating sequence of nodes and relationships. The sequence list
/// holds indices into the other two: positive for a relationship traversed
/// forwards, negative for backwards, interleaved with node indices.
#[derive(Debug, PartialEq, Clone)]
pub struct BoltPath {
    pub nodes: BoltList,
    pub rels: BoltList,
    pub sequence: BoltList,
}

impl BoltPath {
    pub fn nodes(&self) -> Vec<&BoltNode> {
        self.nodes
            .iter()
            .filter_map(|n| match n {
                BoltType::Node(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    pub fn rels(&self) -> Vec<&BoltUnboundedRelation> {
        self.rels
            .iter()
            .filter_map(|r| match r {
                BoltType::UnboundedRelation(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn sequence(&self) -> Vec<i64> {
        self.sequence
            .iter()
            .filter_map(|i| match i {
                BoltType::Integer(i) => Some(i.value),
                _ => None,
            })
            .collect()
    }
}

impl BoltWireFormat for BoltPath {
    fn can_parse(_: Version, input: &[u8]) -> bool {
        structure::peek_signature(input) == Some(SIGNATURE)
    }

    fn parse(version: Version, input: &mut Bytes) -> Result<Self> {
        let (fields, signature) = structure::read_header(input)?;
        if signature != SIGNATURE {
            return Err(Error::UnknownStructSignature(signature));
        }
        if fields != 3 {
            return Err(Error::UnexpectedMessage(format!(
                "a path has 3 fields, got {fields}"
            )));
        }
        let nodes = BoltList::parse(version, input)?;
        let rels = BoltList::parse(version, input)?;
        let sequence = BoltList::parse(version, input)?;
        Ok(BoltPath {
            nodes,
            rels,
            sequence,
        })
    }

    fn write_into(&self, version: Version, bytes: &mut BytesMut) -> Result<()> {
        structure::write_header(bytes, 3, SIGNATURE);
        self.nodes.write_into(version, bytes)?;
        self.rels.write_into(version, bytes)?;
        self.sequence.write_into(version, bytes)?;
        Ok(())
    }
}

impl From<BoltPath> for BoltType {
    fn from(value: BoltPath) -> Self {
        BoltType::Path(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoltMap;

    #[test]
    fn path_roundtrips() {
        let a = BoltNode::new(1.into(), BoltList::new(), BoltMap::new());
        let b = BoltNode::new(2.into(), BoltList::new(), BoltMap::new());
        let r = BoltUnboundedRelation::new(7.into(), "KNOWS".into(), BoltMap::new());

        let path = BoltPath {
            nodes: [BoltType::Node(a), BoltType::Node(b)].into_iter().collect(),
            rels: [BoltType::UnboundedRelation(r)].into_iter().collect(),
            sequence: [BoltType::from(1), BoltType::from(1)].into_iter().collect(),
        };

        let mut bytes = path.clone().into_bytes(Version::V4_4).unwrap();
        assert_eq!(bytes[0], 0xB3);
        assert_eq!(bytes[1], SIGNATURE);

        let parsed = BoltPath::parse(Version::V4_4, &mut bytes).unwrap();
        assert_eq!(parsed, path);
        assert_eq!(parsed.nodes().len(), 2);
        assert_eq!(parsed.rels().len(), 1);
        assert_eq!(parsed.sequence(), vec![1, 1]);
    }
}
