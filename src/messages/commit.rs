use bytes::{Bytes, BytesMut};

use crate::{errors::Result, types::wire::structure, Version};

pub(crate) const SIGNATURE: u8 = 0x12;

#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Commit;

impl Commit {
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
    fn should_serialize_commit() {
        let bytes = Commit.into_bytes(Version::V4_4).unwrap();
        assert_eq!(&bytes[..], &[0xB0, SIGNATURE]);
    }
}
