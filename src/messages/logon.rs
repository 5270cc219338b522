use bytes::{Bytes, BytesMut};

use crate::{
    errors::Result,
    types::wire::{structure, BoltWireFormat},
    types::BoltMap,
    Version,
};

pub(crate) const LOGON_SIGNATURE: u8 = 0x6A;
pub(crate) const LOGOFF_SIGNATURE: u8 = 0x6B;

/// LOGON carries the auth token on v5.1+, where HELLO no longer does.
#[derive(Debug, PartialEq, Clone)]
pub struct Logon {
    auth: BoltMap,
}

impl Logon {
    pub fn new(principal: String, credentials: String) -> Logon {
        let mut auth = BoltMap::new();
        auth.put("scheme".into(), "basic".into());
        auth.put("principal".into(), principal.into());
        auth.put("credentials".into(), credentials.into());
        Logon { auth }
    }

    pub(crate) fn into_bytes(self, version: Version) -> Result<Bytes> {
        let mut bytes = BytesMut::new();
        structure::write_header(&mut bytes, 1, LOGON_SIGNATURE);
        self.auth.write_into(version, &mut bytes)?;
        Ok(bytes.freeze())
    }
}

/// LOGOFF drops the session's authentication without closing the socket.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Logoff;

impl Logoff {
    pub(crate) fn into_bytes(self, _version: Version) -> Result<Bytes> {
        let mut bytes = BytesMut::new();
        structure::write_header(&mut bytes, 0, LOGOFF_SIGNATURE);
        Ok(bytes.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_serialize_logon() {
        let logon = Logon::new("user".into(), "pass".into());
        let bytes = logon.into_bytes(Version::V5_1).unwrap();
        assert_eq!(bytes[0], 0xB1);
        assert_eq!(bytes[1], LOGON_SIGNATURE);
        assert_eq!(bytes[2], 0xA3);
    }

    #[test]
    fn should_serialize_logoff() {
        let bytes = Logoff.into_bytes(Version::V5_1).unwrap();
        assert_eq!(&bytes[..], &[0xB0, LOGOFF_SIGNATURE]);
    }
}
