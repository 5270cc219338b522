use bytes::{Bytes, BytesMut};

use crate::{
    errors::{Error, Result},
    types::wire::{structure, BoltWireFormat},
    types::{BoltMap, BoltType},
    Version,
};

pub(crate) const SIGNATURE: u8 = 0x3F;

/// PULL fetches records from an open result stream. `n` is -1 for
/// everything or a positive batch size; `qid` addresses a statement
/// inside an explicit transaction, -1 meaning the latest.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Pull {
    n: i64,
    qid: i64,
}

impl Pull {
    pub fn new(n: i64, qid: i64) -> Result<Pull> {
        if n != -1 && n <= 0 {
            return Err(Error::InvalidInteger("n", n));
        }
        if qid < -1 {
            return Err(Error::InvalidInteger("qid", qid));
        }
        Ok(Pull { n, qid })
    }

    pub fn all() -> Pull {
        Pull { n: -1, qid: -1 }
    }

    pub(crate) fn into_bytes(self, version: Version) -> Result<Bytes> {
        let mut bytes = BytesMut::new();
        structure::write_header(&mut bytes, 1, SIGNATURE);
        extra(self.n, self.qid).write_into(version, &mut bytes)?;
        Ok(bytes.freeze())
    }
}

/// PULL_ALL is the v1-v3 form without flow control. Rewritten to
/// `Pull::all()` on v4+ connections before encoding.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct PullAll;

impl PullAll {
    pub(crate) fn into_bytes(self, _version: Version) -> Result<Bytes> {
        let mut bytes = BytesMut::new();
        structure::write_header(&mut bytes, 0, SIGNATURE);
        Ok(bytes.freeze())
    }
}

pub(super) fn extra(n: i64, qid: i64) -> BoltMap {
    let mut extra = BoltMap::new();
    extra.put("n".into(), BoltType::from(n));
    if qid != -1 {
        extra.put("qid".into(), BoltType::from(qid));
    }
    extra
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_serialize_pull() {
        let pull = Pull::new(42, 1).unwrap();
        let mut bytes = pull.into_bytes(Version::V4_4).unwrap();
        let marker_signature = bytes.split_to(2);
        assert_eq!(&*marker_signature, &[0xB1, SIGNATURE]);
        let extra = BoltMap::parse(Version::V4_4, &mut bytes).unwrap();
        assert_eq!(extra.get::<i64>("n"), Some(42));
        assert_eq!(extra.get::<i64>("qid"), Some(1));
    }

    #[test]
    fn default_qid_is_omitted() {
        let pull = Pull::all();
        let bytes = pull.into_bytes(Version::V4_4).unwrap();
        assert_eq!(&bytes[..], &[0xB1, SIGNATURE, 0xA1, 0x81, b'n', 0xFF]);
    }

    #[test]
    fn should_serialize_pull_all() {
        let bytes = PullAll.into_bytes(Version::V3).unwrap();
        assert_eq!(&bytes[..], &[0xB0, SIGNATURE]);
    }

    #[test]
    fn rejects_invalid_extras() {
        assert!(matches!(Pull::new(0, -1), Err(Error::InvalidInteger("n", 0))));
        assert!(matches!(
            Pull::new(-2, -1),
            Err(Error::InvalidInteger("n", -2))
        ));
        assert!(matches!(
            Pull::new(1, -7),
            Err(Error::InvalidInteger("qid", -7))
        ));
        assert!(Pull::new(-1, -1).is_ok());
        assert!(Pull::new(100, 0).is_ok());
    }
}
