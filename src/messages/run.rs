use bytes::{Bytes, BytesMut};

use crate::{
    errors::Result,
    types::wire::{structure, BoltWireFormat},
    types::{BoltMap, BoltString},
    Version,
};

pub(crate) const SIGNATURE: u8 = 0x10;

/// RUN submits a statement. v1/v2 take two fields, v3+ adds the extra
/// map (db, mode, bookmarks, tx metadata).
#[derive(Debug, PartialEq, Clone)]
pub struct Run {
    query: BoltString,
    parameters: BoltMap,
    extra: BoltMap,
}

impl Run {
    pub fn new(query: BoltString, parameters: BoltMap, extra: BoltMap) -> Run {
        Run {
            query,
            parameters,
            extra,
        }
    }

    pub(crate) fn into_bytes(self, version: Version) -> Result<Bytes> {
        let mut bytes = BytesMut::new();
        let fields = if version.supports_hello() { 3 } else { 2 };
        structure::write_header(&mut bytes, fields, SIGNATURE);
        self.query.write_into(version, &mut bytes)?;
        self.parameters.write_into(version, &mut bytes)?;
        if fields == 3 {
            self.extra.write_into(version, &mut bytes)?;
        }
        Ok(bytes.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoltType;

    #[test]
    fn should_serialize_run() {
        let mut parameters = BoltMap::new();
        parameters.put("k".into(), "v".into());
        let run = Run::new("query".into(), parameters, BoltMap::new());

        let bytes = run.into_bytes(Version::V4_4).unwrap();

        assert_eq!(
            &bytes[..],
            &[
                0xB3, SIGNATURE, //
                0x85, b'q', b'u', b'e', b'r', b'y', //
                0xA1, 0x81, b'k', 0x81, b'v', //
                0xA0,
            ]
        );
    }

    #[test]
    fn v1_run_has_no_extra_field() {
        let mut extra = BoltMap::new();
        extra.put("db".into(), BoltType::from("neo4j"));
        let run = Run::new("q".into(), BoltMap::new(), extra);

        let bytes = run.into_bytes(Version::V1).unwrap();

        assert_eq!(&bytes[..], &[0xB2, SIGNATURE, 0x81, b'q', 0xA0]);
    }
}
