use bytes::{Bytes, BytesMut};

use crate::{errors::Result, types::wire::structure, Version};

pub(crate) const SIGNATURE: u8 = 0x02;

/// GOODBYE tells the server the client is closing the connection. Sent
/// best-effort; the server may already be gone.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Goodbye;

impl Goodbye {
    pub(crate) fn into_bytes(self, _version: Version) -> Result<Bytes> {
        let mut bytes = BytesMut::new();
        structure::write_header(&mut bytes, 0, SIGNATURE);
        Ok(bytes.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_serialize_goodbye() {
        let bytes = Goodbye.into_bytes(Version::V4_4).unwrap();
        assert_eq!(&bytes[..], &[0xB0, SIGNATURE]);
    }
}
