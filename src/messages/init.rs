use bytes::{Bytes, BytesMut};

use crate::{
    errors::Result,
    types::wire::{structure, BoltWireFormat},
    types::{BoltMap, BoltString},
    Version,
};

pub(crate) const SIGNATURE: u8 = 0x01;

/// INIT is the v1/v2 session opener, replaced by HELLO in v3. It carries
/// the client name and the auth token as two separate fields.
#[derive(Debug, PartialEq, Clone)]
pub struct Init {
    client_name: BoltString,
    auth: BoltMap,
}

impl Init {
    pub fn new(client_name: BoltString, principal: &str, credentials: &str) -> Init {
        let mut auth = BoltMap::new();
        auth.put("scheme".into(), "basic".into());
        auth.put("principal".into(), principal.into());
        auth.put("credentials".into(), credentials.into());
        Init { client_name, auth }
    }

    pub(crate) fn into_bytes(self, version: Version) -> Result<Bytes> {
        let mut bytes = BytesMut::new();
        structure::write_header(&mut bytes, 2, SIGNATURE);
        self.client_name.write_into(version, &mut bytes)?;
        self.auth.write_into(version, &mut bytes)?;
        Ok(bytes.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_serialize_init() {
        let init = Init::new("client".into(), "user", "pass");
        let bytes = init.into_bytes(Version::V1).unwrap();
        assert_eq!(bytes[0], 0xB2);
        assert_eq!(bytes[1], SIGNATURE);
        // client name string directly follows the header
        assert_eq!(bytes[2], 0x86);
        assert_eq!(&bytes[3..9], b"client");
        // auth token is a 3-entry map
        assert_eq!(bytes[9], 0xA3);
    }
}
