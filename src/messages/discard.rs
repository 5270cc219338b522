use bytes::{Bytes, BytesMut};

use crate::{
    errors::{Error, Result},
    types::wire::{structure, BoltWireFormat},
    Version,
};

pub(crate) const SIGNATURE: u8 = 0x2F;

/// DISCARD drops records from an open result stream without delivering
/// them. Same `{n, qid}` rules as PULL.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Discard {
    n: i64,
    qid: i64,
}

impl Discard {
    pub fn new(n: i64, qid: i64) -> Result<Discard> {
        if n != -1 && n <= 0 {
            return Err(Error::InvalidInteger("n", n));
        }
        if qid < -1 {
            return Err(Error::InvalidInteger("qid", qid));
        }
        Ok(Discard { n, qid })
    }

    pub fn all() -> Discard {
        Discard { n: -1, qid: -1 }
    }

    pub(crate) fn into_bytes(self, version: Version) -> Result<Bytes> {
        let mut bytes = BytesMut::new();
        structure::write_header(&mut bytes, 1, SIGNATURE);
        super::pull::extra(self.n, self.qid).write_into(version, &mut bytes)?;
        Ok(bytes.freeze())
    }
}

/// The v1-v3 form; rewritten to `Discard::all()` on v4+.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct DiscardAll;

impl DiscardAll {
    pub(crate) fn into_bytes(self, _version: Version) -> Result<Bytes> {
        let mut bytes = BytesMut::new();
        structure::write_header(&mut bytes, 0, SIGNATURE);
        Ok(bytes.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoltMap;

    #[test]
    fn should_serialize_discard() {
        let discard = Discard::new(100, 2).unwrap();
        let mut bytes = discard.into_bytes(Version::V4_4).unwrap();
        let marker_signature = bytes.split_to(2);
        assert_eq!(&*marker_signature, &[0xB1, SIGNATURE]);
        let extra = BoltMap::parse(Version::V4_4, &mut bytes).unwrap();
        assert_eq!(extra.get::<i64>("n"), Some(100));
        assert_eq!(extra.get::<i64>("qid"), Some(2));
    }

    #[test]
    fn should_serialize_discard_all() {
        let bytes = DiscardAll.into_bytes(Version::V3).unwrap();
        assert_eq!(&bytes[..], &[0xB0, SIGNATURE]);
    }

    #[test]
    fn rejects_invalid_extras() {
        assert!(Discard::new(0, -1).is_err());
        assert!(Discard::new(-1, -2).is_err());
    }
}
